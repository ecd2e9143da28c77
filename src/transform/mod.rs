//! Build transforms
//!
//! - **expect_platform**: rewrites `@ExpectPlatform` method bodies into `invokedynamic` stubs
//! - **inject**: copies the embedded support classes into the build's namespace
//! - **remap**: type reference renaming used by the injector
//! - **marker**: recognition of the two `@ExpectPlatform` annotations

pub mod expect_platform;
pub mod inject;
pub mod marker;
pub mod remap;

pub use expect_platform::{BootstrapCallSite, ExpectPlatformTransformer};
pub use marker::PlatformMarker;
pub use remap::{remap_class, PrefixRemapper, Remapper};

use crate::codegen::reader::read_class;
use crate::codegen::writer::ClassfileWritable;
use crate::common::config::BuildContext;
use crate::common::diagnostics::DiagnosticSink;
use crate::common::error::Result;
use crate::common::output::OutputInterface;

/// Drives both transforms for one build
#[derive(Debug, Clone)]
pub struct Transformer {
    context: BuildContext,
}

impl Transformer {
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Rewrite one class. A class without marked static methods comes back
    /// byte-for-byte unchanged.
    pub fn transform_class(
        &self,
        name: &str,
        bytes: &[u8],
        diagnostics: &mut dyn DiagnosticSink,
    ) -> Result<Vec<u8>> {
        let mut class = read_class(bytes)?;
        let rewritten = ExpectPlatformTransformer::new(&self.context.identifier).transform(&mut class, diagnostics)?;
        if rewritten == 0 {
            return Ok(bytes.to_vec());
        }
        log::debug!("{}: rewrote {} @ExpectPlatform methods", name, rewritten);
        Ok(class.to_classfile_bytes()?)
    }

    /// Add the support classes to `output` when injection is enabled and the
    /// output accepts new classes. Returns the injected class names.
    pub fn edit_assets(&self, output: &mut dyn OutputInterface) -> Result<Vec<String>> {
        if !self.context.inject_injectables {
            log::debug!("support class injection disabled");
            return Ok(Vec::new());
        }
        if !output.can_add_classes() {
            log::debug!("output does not accept new classes, skipping support class injection");
            return Ok(Vec::new());
        }
        inject::inject_support_classes(inject::EMBEDDED_ARCHIVE, &self.context.identifier, output)
    }
}
