//! Symbolic instructions for synthesized method bodies
//!
//! Bodies built by the rewriter are kept as an [`InstructionList`] until the
//! class is written, so the operand stack depth can be computed from the
//! instructions themselves instead of being guessed up front.

use super::descriptor::{JvmType, MethodDescriptor, TypeCategory};
use super::error::{BytecodeError, BytecodeResult};
use super::opcodes;

/// Largest code array a method may carry
pub const MAX_CODE_LENGTH: usize = 65535;

/// Largest operand stack depth representable in a Code attribute
const MAX_STACK_DEPTH: u32 = u16::MAX as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl LoadKind {
    /// Sub-word integral types share the int load
    pub fn for_category(category: TypeCategory) -> Option<LoadKind> {
        match category {
            TypeCategory::Boolean
            | TypeCategory::Byte
            | TypeCategory::Char
            | TypeCategory::Short
            | TypeCategory::Int => Some(LoadKind::Int),
            TypeCategory::Long => Some(LoadKind::Long),
            TypeCategory::Float => Some(LoadKind::Float),
            TypeCategory::Double => Some(LoadKind::Double),
            TypeCategory::Reference => Some(LoadKind::Reference),
            TypeCategory::Void => None,
        }
    }

    /// Arrays load as references whatever their element type
    pub fn for_type(ty: &JvmType) -> LoadKind {
        match ty {
            JvmType::Boolean | JvmType::Byte | JvmType::Char | JvmType::Short | JvmType::Int => LoadKind::Int,
            JvmType::Long => LoadKind::Long,
            JvmType::Float => LoadKind::Float,
            JvmType::Double => LoadKind::Double,
            JvmType::Reference(_) | JvmType::Array(_) => LoadKind::Reference,
        }
    }

    fn opcode(self) -> u8 {
        match self {
            LoadKind::Int => opcodes::ILOAD,
            LoadKind::Long => opcodes::LLOAD,
            LoadKind::Float => opcodes::FLOAD,
            LoadKind::Double => opcodes::DLOAD,
            LoadKind::Reference => opcodes::ALOAD,
        }
    }

    /// `xLOAD_0` for this kind; the four short forms follow it consecutively
    fn short_form_base(self) -> u8 {
        match self {
            LoadKind::Int => opcodes::ILOAD_0,
            LoadKind::Long => opcodes::LLOAD_0,
            LoadKind::Float => opcodes::FLOAD_0,
            LoadKind::Double => opcodes::DLOAD_0,
            LoadKind::Reference => opcodes::ALOAD_0,
        }
    }

    fn slots(self) -> u32 {
        match self {
            LoadKind::Long | LoadKind::Double => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
    Void,
}

impl ReturnKind {
    pub fn for_category(category: TypeCategory) -> ReturnKind {
        match category {
            TypeCategory::Boolean
            | TypeCategory::Byte
            | TypeCategory::Char
            | TypeCategory::Short
            | TypeCategory::Int => ReturnKind::Int,
            TypeCategory::Long => ReturnKind::Long,
            TypeCategory::Float => ReturnKind::Float,
            TypeCategory::Double => ReturnKind::Double,
            TypeCategory::Reference => ReturnKind::Reference,
            TypeCategory::Void => ReturnKind::Void,
        }
    }

    pub fn opcode(self) -> u8 {
        match self {
            ReturnKind::Int => opcodes::IRETURN,
            ReturnKind::Long => opcodes::LRETURN,
            ReturnKind::Float => opcodes::FRETURN,
            ReturnKind::Double => opcodes::DRETURN,
            ReturnKind::Reference => opcodes::ARETURN,
            ReturnKind::Void => opcodes::RETURN,
        }
    }

    fn slots(self) -> u32 {
        match self {
            ReturnKind::Long | ReturnKind::Double => 2,
            ReturnKind::Void => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Load { kind: LoadKind, index: u16 },
    /// `invokedynamic` against the `InvokeDynamic` pool entry `index`
    InvokeDynamic { index: u16, name: String, descriptor: MethodDescriptor },
    Return(ReturnKind),
}

impl Instruction {
    pub fn encoded_len(&self) -> usize {
        match self {
            Instruction::Load { index, .. } => match *index {
                0..=3 => 1,
                4..=255 => 2,
                _ => 4,
            },
            Instruction::InvokeDynamic { .. } => 5,
            Instruction::Return(_) => 1,
        }
    }

    fn encode_into(&self, code: &mut Vec<u8>) {
        match self {
            Instruction::Load { kind, index } => match *index {
                0..=3 => code.push(kind.short_form_base() + *index as u8),
                4..=255 => {
                    code.push(kind.opcode());
                    code.push(*index as u8);
                }
                _ => {
                    code.push(opcodes::WIDE);
                    code.push(kind.opcode());
                    code.extend_from_slice(&index.to_be_bytes());
                }
            },
            Instruction::InvokeDynamic { index, .. } => {
                code.push(opcodes::INVOKEDYNAMIC);
                code.extend_from_slice(&index.to_be_bytes());
                code.extend_from_slice(&[0, 0]);
            }
            Instruction::Return(kind) => code.push(kind.opcode()),
        }
    }

    /// (slots popped, slots pushed)
    fn stack_effect(&self) -> (u32, u32) {
        match self {
            Instruction::Load { kind, .. } => (0, kind.slots()),
            Instruction::InvokeDynamic { descriptor, .. } => {
                (descriptor.param_slots() as u32, descriptor.return_slots() as u32)
            }
            Instruction::Return(kind) => (kind.slots(), 0),
        }
    }
}

/// A straight-line sequence of instructions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionList {
    instructions: Vec<Instruction>,
}

impl InstructionList {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn len(&self) -> usize { self.instructions.len() }
    pub fn is_empty(&self) -> bool { self.instructions.is_empty() }
    pub fn clear(&mut self) { self.instructions.clear(); }

    /// Deepest operand stack reached while executing the list from an empty stack
    pub fn max_stack(&self) -> BytecodeResult<u16> {
        let mut depth: u32 = 0;
        let mut max: u32 = 0;
        for instruction in &self.instructions {
            let (pops, pushes) = instruction.stack_effect();
            depth = depth.checked_sub(pops).ok_or(BytecodeError::StackUnderflow)?;
            depth += pushes;
            if depth > MAX_STACK_DEPTH {
                return Err(BytecodeError::StackOverflow);
            }
            max = max.max(depth);
        }
        Ok(max as u16)
    }

    /// Raw code array for a Code attribute
    pub fn encode(&self) -> BytecodeResult<Vec<u8>> {
        let len: usize = self.instructions.iter().map(Instruction::encoded_len).sum();
        if len > MAX_CODE_LENGTH {
            return Err(BytecodeError::CodeTooLong(len));
        }
        let mut code = Vec::with_capacity(len);
        for instruction in &self.instructions {
            instruction.encode_into(&mut code);
        }
        Ok(code)
    }
}

impl<'a> IntoIterator for &'a InstructionList {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
