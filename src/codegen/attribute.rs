//! Attributes and exception table structures for Java class files

use std::borrow::Cow;

use super::annotation::{Annotation, ElementValue};
use super::constpool::ConstantPool;
use super::defs::attribute_names;
use super::error::{BytecodeError, BytecodeResult, ConstPoolResult};
use super::instruction::InstructionList;

/// An attribute together with the Utf8 index of its name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedAttribute {
    pub name_index: u16,
    pub info: AttributeInfo,
}

impl NamedAttribute {
    pub fn new(name_index: u16, info: AttributeInfo) -> Self {
        Self { name_index, info }
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> ConstPoolResult<&'a str> {
        constant_pool.utf8(self.name_index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    Code(CodeAttribute),
    BootstrapMethods(Vec<BootstrapMethod>),
    /// Utf8 index of the generic signature
    Signature(u16),
    RuntimeVisibleAnnotations(Vec<Annotation>),
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    RuntimeVisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeInvisibleParameterAnnotations(Vec<Vec<Annotation>>),
    AnnotationDefault(ElementValue),
    LocalVariableTable(Vec<LocalVariableEntry>),
    /// Same layout as `LocalVariableTable`; the descriptor index points at a signature
    LocalVariableTypeTable(Vec<LocalVariableEntry>),
    /// Any attribute the reader does not model, kept verbatim
    Other(Vec<u8>),
}

/// Operand stack depth of a Code attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxStack {
    Fixed(u16),
    /// Computed from the instruction list when the class is written
    Recompute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeBody {
    /// Code array as read from the class file
    Bytecode(Vec<u8>),
    /// Synthesized instructions, encoded at emission
    Instructions(InstructionList),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: MaxStack,
    pub max_locals: u16,
    pub body: CodeBody,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<NamedAttribute>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack: MaxStack::Fixed(max_stack),
            max_locals,
            body: CodeBody::Bytecode(code),
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// A fresh Code attribute around synthesized instructions
    pub fn synthesized(instructions: InstructionList, max_locals: u16) -> Self {
        Self {
            max_stack: MaxStack::Recompute,
            max_locals,
            body: CodeBody::Instructions(instructions),
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Discard the current body and everything describing it
    pub fn replace_body(&mut self, instructions: InstructionList, max_locals: u16) {
        self.max_stack = MaxStack::Recompute;
        self.max_locals = max_locals;
        self.body = CodeBody::Instructions(instructions);
        self.exception_table.clear();
        self.attributes.clear();
    }

    pub fn resolved_max_stack(&self) -> BytecodeResult<u16> {
        match (&self.max_stack, &self.body) {
            (MaxStack::Fixed(depth), _) => Ok(*depth),
            (MaxStack::Recompute, CodeBody::Instructions(list)) => list.max_stack(),
            (MaxStack::Recompute, CodeBody::Bytecode(_)) => Err(BytecodeError::OpaqueRecompute),
        }
    }

    pub fn code_bytes(&self) -> BytecodeResult<Cow<'_, [u8]>> {
        match &self.body {
            CodeBody::Bytecode(code) => Ok(Cow::Borrowed(code)),
            CodeBody::Instructions(list) => list.encode().map(Cow::Owned),
        }
    }

    pub fn instructions(&self) -> Option<&InstructionList> {
        match &self.body {
            CodeBody::Instructions(list) => Some(list),
            CodeBody::Bytecode(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    pub fn new(start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: u16) -> Self {
        Self { start_pc, end_pc, handler_pc, catch_type }
    }
}

/// One entry of the class-level BootstrapMethods attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    /// MethodHandle pool index
    pub method_ref: u16,
    pub arguments: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

/// Annotations of the requested visibility across all matching attributes
pub fn annotations(attributes: &[NamedAttribute], visible: bool) -> impl Iterator<Item = &Annotation> {
    attributes.iter().flat_map(move |attribute| {
        let list: &[Annotation] = match (&attribute.info, visible) {
            (AttributeInfo::RuntimeVisibleAnnotations(list), true) => list,
            (AttributeInfo::RuntimeInvisibleAnnotations(list), false) => list,
            _ => &[],
        };
        list.iter()
    })
}

/// Name used when a Code attribute has to be created from scratch
pub fn code_attribute_name_index(constant_pool: &mut ConstantPool) -> ConstPoolResult<u16> {
    constant_pool.add_utf8(attribute_names::CODE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::instruction::{Instruction, LoadKind, ReturnKind};

    #[test]
    fn test_replace_body_drops_old_metadata() {
        let mut code = CodeAttribute::new(3, 2, vec![0xbb, 0, 1, 0x59, 0xbf]);
        code.exception_table.push(ExceptionTableEntry::new(0, 4, 4, 0));
        code.attributes.push(NamedAttribute::new(9, AttributeInfo::Other(vec![0, 0])));

        let mut list = InstructionList::new();
        list.push(Instruction::Load { kind: LoadKind::Reference, index: 0 });
        list.push(Instruction::Return(ReturnKind::Reference));
        code.replace_body(list, 1);

        assert!(code.exception_table.is_empty());
        assert!(code.attributes.is_empty());
        assert_eq!(code.max_stack, MaxStack::Recompute);
        assert_eq!(code.resolved_max_stack().unwrap(), 1);
        assert_eq!(code.code_bytes().unwrap().as_ref(), &[0x2a, 0xb0]);
    }

    #[test]
    fn test_recompute_requires_instructions() {
        let mut code = CodeAttribute::new(1, 0, vec![0xb1]);
        assert_eq!(code.resolved_max_stack().unwrap(), 1);
        code.max_stack = MaxStack::Recompute;
        assert_eq!(code.resolved_max_stack(), Err(BytecodeError::OpaqueRecompute));
    }

    #[test]
    fn test_annotation_visibility_filter() {
        let attributes = vec![
            NamedAttribute::new(1, AttributeInfo::RuntimeVisibleAnnotations(vec![Annotation::new(10)])),
            NamedAttribute::new(2, AttributeInfo::RuntimeInvisibleAnnotations(vec![Annotation::new(11), Annotation::new(12)])),
        ];
        let visible: Vec<u16> = annotations(&attributes, true).map(|a| a.type_index).collect();
        let invisible: Vec<u16> = annotations(&attributes, false).map(|a| a.type_index).collect();
        assert_eq!(visible, vec![10]);
        assert_eq!(invisible, vec![11, 12]);
    }
}
