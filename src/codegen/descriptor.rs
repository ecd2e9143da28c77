//! Field and method descriptor parsing (JVMS 4.3)
//!
//! The parsed form is the only source the rewriter uses for parameter counts,
//! local variable slot widths and return categories.

use std::fmt;

use super::error::DescriptorError;

/// A field type as it appears in a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JvmType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Internal name of a class or interface, e.g. `java/lang/String`
    Reference(String),
    Array(Box<JvmType>),
}

/// Coarse type tag used to pick load and return opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Reference,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl JvmType {
    pub fn category(&self) -> TypeCategory {
        match self {
            JvmType::Boolean => TypeCategory::Boolean,
            JvmType::Byte => TypeCategory::Byte,
            JvmType::Char => TypeCategory::Char,
            JvmType::Short => TypeCategory::Short,
            JvmType::Int => TypeCategory::Int,
            JvmType::Long => TypeCategory::Long,
            JvmType::Float => TypeCategory::Float,
            JvmType::Double => TypeCategory::Double,
            JvmType::Reference(_) | JvmType::Array(_) => TypeCategory::Reference,
        }
    }

    /// Local variable / operand stack slots taken by a value of this type
    pub fn slot_width(&self) -> u16 {
        match self {
            JvmType::Long | JvmType::Double => 2,
            _ => 1,
        }
    }

    /// Number of leading `[` dimensions
    pub fn dimensions(&self) -> usize {
        match self {
            JvmType::Array(element) => 1 + element.dimensions(),
            _ => 0,
        }
    }

    /// Parse a complete field descriptor such as `[Ljava/lang/String;`
    pub fn parse(descriptor: &str) -> Result<JvmType, DescriptorError> {
        let mut parser = DescriptorParser::new(descriptor);
        let ty = parser
            .field_type()
            .map_err(|reason| DescriptorError::InvalidTypeDescriptor { descriptor: descriptor.to_string(), reason })?;
        if !parser.eof() {
            return Err(DescriptorError::InvalidTypeDescriptor {
                descriptor: descriptor.to_string(),
                reason: "trailing characters",
            });
        }
        Ok(ty)
    }
}

impl fmt::Display for JvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JvmType::Boolean => f.write_str("Z"),
            JvmType::Byte => f.write_str("B"),
            JvmType::Char => f.write_str("C"),
            JvmType::Short => f.write_str("S"),
            JvmType::Int => f.write_str("I"),
            JvmType::Long => f.write_str("J"),
            JvmType::Float => f.write_str("F"),
            JvmType::Double => f.write_str("D"),
            JvmType::Reference(name) => write!(f, "L{};", name),
            JvmType::Array(element) => write!(f, "[{}", element),
        }
    }
}

/// A parsed method descriptor: parameter types and return type (`None` for void)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<JvmType>,
    pub ret: Option<JvmType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<MethodDescriptor, DescriptorError> {
        let invalid = |reason| DescriptorError::InvalidMethodDescriptor { descriptor: descriptor.to_string(), reason };
        let mut parser = DescriptorParser::new(descriptor);
        if !parser.consume(b'(') {
            return Err(invalid("missing '('"));
        }
        let mut params = Vec::new();
        loop {
            match parser.peek() {
                Some(b')') => {
                    parser.bump();
                    break;
                }
                Some(b'V') => return Err(invalid("void parameter")),
                Some(_) => params.push(parser.field_type().map_err(invalid)?),
                None => return Err(invalid("missing ')'")),
            }
        }
        let ret = if parser.consume(b'V') {
            None
        } else {
            Some(parser.field_type().map_err(invalid)?)
        };
        if !parser.eof() {
            return Err(invalid("trailing characters"));
        }
        let slots: usize = params.iter().map(|p| p.slot_width() as usize).sum();
        if slots > MAX_PARAMETER_SLOTS {
            return Err(invalid("parameters need more than 255 local slots"));
        }
        Ok(MethodDescriptor { params, ret })
    }

    /// Local variable slots needed by the parameters of a static method
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(JvmType::slot_width).sum()
    }

    /// Operand stack slots taken by the return value
    pub fn return_slots(&self) -> u16 {
        self.ret.as_ref().map_or(0, JvmType::slot_width)
    }

    pub fn return_category(&self) -> TypeCategory {
        self.ret.as_ref().map_or(TypeCategory::Void, JvmType::category)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{}", ret),
            None => f.write_str("V"),
        }
    }
}

/// Parameters of a method may fill at most 255 local slots (JVMS 4.3.3)
pub const MAX_PARAMETER_SLOTS: usize = 255;

/// Arrays may not exceed 255 dimensions
const MAX_ARRAY_DIMENSIONS: usize = 255;

struct DescriptorParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self { bytes: descriptor.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> { self.bytes.get(self.pos).copied() }
    fn bump(&mut self) { self.pos += 1; }
    fn eof(&self) -> bool { self.pos >= self.bytes.len() }

    fn consume(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn field_type(&mut self) -> Result<JvmType, &'static str> {
        let mut dimensions = 0;
        while self.consume(b'[') {
            dimensions += 1;
        }
        if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err("too many array dimensions");
        }
        let Some(code) = self.peek() else {
            return Err("unexpected end of descriptor");
        };
        self.bump();
        let mut ty = match code {
            b'Z' => JvmType::Boolean,
            b'B' => JvmType::Byte,
            b'C' => JvmType::Char,
            b'S' => JvmType::Short,
            b'I' => JvmType::Int,
            b'J' => JvmType::Long,
            b'F' => JvmType::Float,
            b'D' => JvmType::Double,
            b'L' => {
                let start = self.pos;
                let Some(len) = self.bytes[start..].iter().position(|&b| b == b';') else {
                    return Err("unterminated class name");
                };
                if len == 0 {
                    return Err("empty class name");
                }
                self.pos = start + len + 1;
                // Descriptor input is a &str and ';' is ASCII, so the slice stays on char boundaries
                let name = String::from_utf8_lossy(&self.bytes[start..start + len]).into_owned();
                JvmType::Reference(name)
            }
            b'V' => return Err("void is not a field type"),
            _ => return Err("unknown type code"),
        };
        for _ in 0..dimensions {
            ty = JvmType::Array(Box::new(ty));
        }
        Ok(ty)
    }
}
