//! Common utilities and definitions shared across modules
//!
//! This module contains the crate error type, build configuration, the
//! build identifier, output sinks and the diagnostics sink.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod identifier;
pub mod output;

// Re-export commonly used items for convenience
pub use config::{BuildContext, Config};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics};
pub use error::{Error, Result};
pub use identifier::BuildIdentifier;
pub use output::{DirectoryOutput, MemoryOutput, OutputError, OutputInterface};
