//! MethodInfo structure

use super::annotation::Annotation;
use super::attribute::{self, code_attribute_name_index, AttributeInfo, CodeAttribute, NamedAttribute};
use super::constpool::ConstantPool;
use super::error::ConstPoolResult;
use super::flag::access_flags;
use super::instruction::InstructionList;

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<NamedAttribute>,
}

impl MethodInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> ConstPoolResult<&'a str> {
        constant_pool.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, constant_pool: &'a ConstantPool) -> ConstPoolResult<&'a str> {
        constant_pool.utf8(self.descriptor_index)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & access_flags::ACC_STATIC != 0
    }

    pub fn visible_annotations(&self) -> impl Iterator<Item = &Annotation> {
        attribute::annotations(&self.attributes, true)
    }

    pub fn invisible_annotations(&self) -> impl Iterator<Item = &Annotation> {
        attribute::annotations(&self.attributes, false)
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|attribute| match &attribute.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn code_mut(&mut self) -> Option<&mut CodeAttribute> {
        self.attributes.iter_mut().find_map(|attribute| match &mut attribute.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    /// Replace the method body. A method without a Code attribute gets one and
    /// loses `ACC_NATIVE`/`ACC_ABSTRACT`, which may not coexist with code.
    pub fn install_body(
        &mut self,
        constant_pool: &mut ConstantPool,
        instructions: InstructionList,
        max_locals: u16,
    ) -> ConstPoolResult<()> {
        if let Some(code) = self.code_mut() {
            code.replace_body(instructions, max_locals);
            return Ok(());
        }
        let name_index = code_attribute_name_index(constant_pool)?;
        self.access_flags &= !(access_flags::ACC_NATIVE | access_flags::ACC_ABSTRACT);
        self.attributes.push(NamedAttribute::new(
            name_index,
            AttributeInfo::Code(CodeAttribute::synthesized(instructions, max_locals)),
        ));
        Ok(())
    }
}
