//! Platform-expectation markers

use crate::codegen::annotation::Annotation;
use crate::codegen::constpool::ConstantPool;
use crate::codegen::method::MethodInfo;
use crate::common::identifier::BuildIdentifier;
use crate::consts::{EXPECT_PLATFORM_LEGACY, EXPECT_PLATFORM_NEW, LEGACY_PLATFORM_METHODS};

/// Which `@ExpectPlatform` annotation a method carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformMarker {
    /// Runtime-visible annotation, resolved through the fixed legacy resolver
    Legacy,
    /// Invisible annotation, resolved through `<identifier>/PlatformMethods`
    Namespaced,
}

impl PlatformMarker {
    /// Legacy wins when a method carries both
    pub fn detect(method: &MethodInfo, constant_pool: &ConstantPool) -> Option<PlatformMarker> {
        if carries(method.visible_annotations(), constant_pool, EXPECT_PLATFORM_LEGACY) {
            Some(PlatformMarker::Legacy)
        } else if carries(method.invisible_annotations(), constant_pool, EXPECT_PLATFORM_NEW) {
            Some(PlatformMarker::Namespaced)
        } else {
            None
        }
    }

    /// Internal name of the class whose `platform` method bootstraps the call site
    pub fn resolver_class(self, identifier: &BuildIdentifier) -> String {
        match self {
            PlatformMarker::Legacy => LEGACY_PLATFORM_METHODS.to_string(),
            PlatformMarker::Namespaced => identifier.resolver_class(),
        }
    }
}

fn carries<'a>(
    mut annotations: impl Iterator<Item = &'a Annotation>,
    constant_pool: &ConstantPool,
    descriptor: &str,
) -> bool {
    annotations.any(|annotation| annotation.type_descriptor(constant_pool).map_or(false, |d| d == descriptor))
}
