//! Class file model for the rewriter
//!
//! This module reads compiled `.class` files into a mutable [`ClassFile`],
//! lets the transform passes edit methods, the constant pool and attributes,
//! and writes the result back out.

pub mod annotation;
pub mod attribute;
pub mod class;
pub mod constpool;
pub mod defs;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod flag;
pub mod instruction;
pub mod method;
pub mod opcodes;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use attribute::{AttributeInfo, CodeAttribute, MaxStack, NamedAttribute};
pub use class::ClassFile;
pub use constpool::{Constant, ConstantPool};
pub use descriptor::{JvmType, MethodDescriptor, TypeCategory};
pub use error::{BytecodeError, ClassReadError, ConstPoolError, DescriptorError};
pub use field::FieldInfo;
pub use instruction::{Instruction, InstructionList};
pub use method::MethodInfo;
pub use reader::read_class;
pub use writer::{class_file_to_bytes, ClassfileWritable};
