//! Rewriting of `@ExpectPlatform` method bodies
//!
//! A marked static method keeps its name, descriptor and annotations, but its
//! body is replaced by a forwarding stub:
//!
//! ```text
//! xLOAD 0 .. xLOAD n        every parameter, long/double taking two slots
//! invokedynamic name desc   bootstrapped by <resolver>.platform
//! xRETURN                   matching the declared return type
//! ```
//!
//! The resolver decides at class-load time which platform class implements
//! the method. Classes are planned in full before anything is mutated, so a
//! bad descriptor anywhere leaves the class untouched.

use crate::codegen::attribute::BootstrapMethod;
use crate::codegen::class::ClassFile;
use crate::codegen::defs::{reference_kinds, MIN_INVOKEDYNAMIC_VERSION};
use crate::codegen::descriptor::MethodDescriptor;
use crate::codegen::error::ConstPoolResult;
use crate::codegen::instruction::{Instruction, InstructionList, LoadKind, ReturnKind};
use crate::common::diagnostics::{Diagnostic, DiagnosticSink};
use crate::common::error::{Error, Result};
use crate::common::identifier::BuildIdentifier;
use crate::consts::{BOOTSTRAP_METHOD_DESCRIPTOR, BOOTSTRAP_METHOD_NAME, USAGE_ERROR_STATIC_ONLY};

use super::marker::PlatformMarker;

/// The `invokestatic` handle every rewritten call site bootstraps through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapCallSite {
    /// Internal name of the resolver class
    pub owner: String,
}

impl BootstrapCallSite {
    pub fn new(owner: impl Into<String>) -> Self {
        Self { owner: owner.into() }
    }

    pub fn name(&self) -> &'static str {
        BOOTSTRAP_METHOD_NAME
    }

    pub fn descriptor(&self) -> &'static str {
        BOOTSTRAP_METHOD_DESCRIPTOR
    }

    /// Add the method handle and bootstrap entry to `class`, returning the
    /// bootstrap method index. Reuses existing entries.
    pub fn install(&self, class: &mut ClassFile) -> ConstPoolResult<u16> {
        // The resolver is a class, never an interface, so this is a plain Methodref
        let method_ref = class.constant_pool.add_method_ref(&self.owner, self.name(), self.descriptor())?;
        let handle = class.constant_pool.add_method_handle(reference_kinds::REF_INVOKE_STATIC, method_ref)?;
        class.add_bootstrap_method(BootstrapMethod { method_ref: handle, arguments: Vec::new() })
    }
}

/// A marked static method found while planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRewrite {
    pub method_index: usize,
    pub name: String,
    pub descriptor: String,
    pub parsed: MethodDescriptor,
    pub marker: PlatformMarker,
}

/// Build the forwarding body for a static method. Returns the instructions and
/// the number of local slots they use.
pub fn synthesize_body(name: &str, descriptor: &MethodDescriptor, call_site_index: u16) -> (InstructionList, u16) {
    let mut instructions = InstructionList::new();
    let mut cursor: u16 = 0;
    for param in &descriptor.params {
        instructions.push(Instruction::Load { kind: LoadKind::for_type(param), index: cursor });
        cursor += param.slot_width();
    }
    instructions.push(Instruction::InvokeDynamic {
        index: call_site_index,
        name: name.to_string(),
        descriptor: descriptor.clone(),
    });
    instructions.push(Instruction::Return(ReturnKind::for_category(descriptor.return_category())));
    (instructions, cursor)
}

pub struct ExpectPlatformTransformer<'a> {
    identifier: &'a BuildIdentifier,
}

impl<'a> ExpectPlatformTransformer<'a> {
    pub fn new(identifier: &'a BuildIdentifier) -> Self {
        Self { identifier }
    }

    /// Find every marked method. Instance methods are reported to `diagnostics`
    /// and skipped; nothing in `class` changes. Reports are only delivered when
    /// planning succeeds.
    pub fn plan(&self, class: &ClassFile, diagnostics: &mut dyn DiagnosticSink) -> Result<Vec<PlannedRewrite>> {
        let constant_pool = &class.constant_pool;
        let class_name = class.name()?;
        let mut planned = Vec::new();
        let mut pending = Vec::new();

        for (method_index, method) in class.methods.iter().enumerate() {
            let Some(marker) = PlatformMarker::detect(method, constant_pool) else {
                continue;
            };
            let name = method.name(constant_pool)?;
            if !method.is_static() {
                pending.push(Diagnostic::new(class_name, name, USAGE_ERROR_STATIC_ONLY));
                continue;
            }
            let descriptor = method.descriptor(constant_pool)?;
            let parsed = MethodDescriptor::parse(descriptor).map_err(|source| Error::Descriptor {
                class: class_name.to_string(),
                method: name.to_string(),
                source,
            })?;
            planned.push(PlannedRewrite {
                method_index,
                name: name.to_string(),
                descriptor: descriptor.to_string(),
                parsed,
                marker,
            });
        }

        if !planned.is_empty() && class.major_version < MIN_INVOKEDYNAMIC_VERSION {
            return Err(Error::UnsupportedClassVersion {
                class: class_name.to_string(),
                major: class.major_version,
                required: MIN_INVOKEDYNAMIC_VERSION,
            });
        }
        for diagnostic in pending {
            diagnostics.report(diagnostic);
        }
        Ok(planned)
    }

    /// Rewrite every marked static method of `class`. Returns how many were rewritten.
    pub fn transform(&self, class: &mut ClassFile, diagnostics: &mut dyn DiagnosticSink) -> Result<usize> {
        let planned = self.plan(class, diagnostics)?;
        for rewrite in &planned {
            let call_site = BootstrapCallSite::new(rewrite.marker.resolver_class(self.identifier));
            let bootstrap_index = call_site.install(class)?;
            let call_site_index =
                class.constant_pool.add_invoke_dynamic(bootstrap_index, &rewrite.name, &rewrite.descriptor)?;
            let (instructions, max_locals) = synthesize_body(&rewrite.name, &rewrite.parsed, call_site_index);
            class.methods[rewrite.method_index].install_body(&mut class.constant_pool, instructions, max_locals)?;
            log::debug!(
                "rewrote {}{} to bootstrap through {}",
                rewrite.name,
                rewrite.descriptor,
                call_site.owner
            );
        }
        Ok(planned.len())
    }
}
