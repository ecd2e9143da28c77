//! expect-platform
//!
//! Build-time rewriter for `@ExpectPlatform` methods in compiled JVM classes.
//!
//! ## Architecture
//!
//! - **codegen**: class file model, reader and writer
//! - **transform**: the `@ExpectPlatform` rewriter and the support class injector
//! - **common**: errors, configuration, build identifier, output sinks, diagnostics
//! - **bin**: command-line driver over directories of `.class` files
//!
//! ## Flow
//!
//! ```text
//! .class bytes → read_class → ExpectPlatformTransformer → writer → OutputInterface
//! injection.tar.gz → rename into <identifier>/ → OutputInterface   (once per build)
//! ```

pub mod codegen;
pub mod common;
pub mod consts;
pub mod transform;

pub use common::{BuildContext, BuildIdentifier, Config, Diagnostic, DiagnosticSink, Diagnostics, Error, Result};
pub use common::{DirectoryOutput, MemoryOutput, OutputError, OutputInterface};
pub use transform::{PlatformMarker, Transformer};
