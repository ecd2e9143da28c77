//! Annotation structures (JVMS 4.7.16)

use super::constpool::ConstantPool;
use super::error::ConstPoolResult;

/// One `annotation` structure: a type descriptor plus element/value pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Utf8 index of the annotation's field descriptor, e.g. `Lfoo/Bar;`
    pub type_index: u16,
    /// (element name Utf8 index, value)
    pub elements: Vec<(u16, ElementValue)>,
}

impl Annotation {
    pub fn new(type_index: u16) -> Self {
        Self { type_index, elements: Vec::new() }
    }

    pub fn type_descriptor<'a>(&self, constant_pool: &'a ConstantPool) -> ConstPoolResult<&'a str> {
        constant_pool.utf8(self.type_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// Primitive or string constant; `tag` is one of `B C D F I J S Z s`
    Const { tag: u8, index: u16 },
    /// Enum constant: field descriptor of the enum type and the constant's simple name
    Enum { type_name: u16, const_name: u16 },
    /// Return descriptor of a class literal, e.g. `Ljava/lang/String;` or `V`
    Class(u16),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

pub mod element_tags {
    pub const ENUM: u8 = b'e';
    pub const CLASS: u8 = b'c';
    pub const ANNOTATION: u8 = b'@';
    pub const ARRAY: u8 = b'[';

    /// Tags whose value is a single constant pool index
    pub fn is_const(tag: u8) -> bool {
        matches!(tag, b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's')
    }
}

impl ElementValue {
    pub fn tag(&self) -> u8 {
        match self {
            ElementValue::Const { tag, .. } => *tag,
            ElementValue::Enum { .. } => element_tags::ENUM,
            ElementValue::Class(_) => element_tags::CLASS,
            ElementValue::Annotation(_) => element_tags::ANNOTATION,
            ElementValue::Array(_) => element_tags::ARRAY,
        }
    }
}
