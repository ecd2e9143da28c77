//! Constant pool and constants for Java class files

use super::error::{ConstPoolError, ConstPoolResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    /// Utf8 entry holding unpaired surrogates, kept as its modified UTF-8 bytes
    RawUtf8(Vec<u8>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
    /// Second slot taken by a preceding `Long` or `Double`
    Unusable,
}

pub mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
    pub const CONSTANT_METHODHANDLE: u8 = 15;
    pub const CONSTANT_METHODTYPE: u8 = 16;
    pub const CONSTANT_DYNAMIC: u8 = 17;
    pub const CONSTANT_INVOKEDYNAMIC: u8 = 18;
    pub const CONSTANT_MODULE: u8 = 19;
    pub const CONSTANT_PACKAGE: u8 = 20;
}

impl Constant {
    /// Long and double constants occupy two pool indices
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Constant::Utf8(_) | Constant::RawUtf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class(_) => "Class",
            Constant::String(_) => "String",
            Constant::FieldRef(..) => "Fieldref",
            Constant::MethodRef(..) => "Methodref",
            Constant::InterfaceMethodRef(..) => "InterfaceMethodref",
            Constant::NameAndType(..) => "NameAndType",
            Constant::MethodHandle(..) => "MethodHandle",
            Constant::MethodType(_) => "MethodType",
            Constant::Dynamic(..) => "Dynamic",
            Constant::InvokeDynamic(..) => "InvokeDynamic",
            Constant::Module(_) => "Module",
            Constant::Package(_) => "Package",
            Constant::Unusable => "unusable slot",
        }
    }
}

/// Largest index a constant pool can hold (`constant_pool_count` is a u16)
const MAX_INDEX: usize = u16::MAX as usize - 1;

/// The constant pool of one class. Indices are 1-based; `constants[i]` is entry `i + 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    pub(crate) constants: Vec<Constant>,
}

impl ConstantPool {
    pub fn new() -> Self { Self { constants: Vec::new() } }

    /// Value written as `constant_pool_count`
    pub fn count(&self) -> u16 {
        (self.constants.len() + 1) as u16
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over every usable entry together with its index
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.constants
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| ((i + 1) as u16, c))
    }

    pub fn get(&self, index: u16) -> ConstPoolResult<&Constant> {
        match index.checked_sub(1).and_then(|i| self.constants.get(i as usize)) {
            Some(Constant::Unusable) | None => Err(ConstPoolError::InvalidIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    pub(crate) fn get_mut(&mut self, index: u16) -> ConstPoolResult<&mut Constant> {
        match index.checked_sub(1).and_then(|i| self.constants.get_mut(i as usize)) {
            Some(Constant::Unusable) | None => Err(ConstPoolError::InvalidIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    fn unexpected(&self, index: u16, expected: &'static str) -> ConstPoolError {
        log::trace!("pool entry {} is {:?}, wanted {}", index, self.get(index).map(Constant::kind), expected);
        ConstPoolError::UnexpectedEntry { index, expected }
    }

    pub fn utf8(&self, index: u16) -> ConstPoolResult<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            Constant::RawUtf8(_) => Err(ConstPoolError::UnpairedSurrogate(index)),
            _ => Err(self.unexpected(index, "Utf8")),
        }
    }

    /// Internal name referenced by a `Class` entry
    pub fn class_name(&self, index: u16) -> ConstPoolResult<&str> {
        match self.get(index)? {
            Constant::Class(name_index) => self.utf8(*name_index),
            _ => Err(self.unexpected(index, "Class")),
        }
    }

    pub fn name_and_type(&self, index: u16) -> ConstPoolResult<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType(name, descriptor) => Ok((self.utf8(*name)?, self.utf8(*descriptor)?)),
            _ => Err(self.unexpected(index, "NameAndType")),
        }
    }

    /// Owner, name and descriptor of a field, method or interface method reference
    pub fn member_ref(&self, index: u16) -> ConstPoolResult<(&str, &str, &str)> {
        match self.get(index)? {
            Constant::FieldRef(class, nat)
            | Constant::MethodRef(class, nat)
            | Constant::InterfaceMethodRef(class, nat) => {
                let (name, descriptor) = self.name_and_type(*nat)?;
                Ok((self.class_name(*class)?, name, descriptor))
            }
            _ => Err(self.unexpected(index, "member reference")),
        }
    }

    /// Append a constant without looking for an existing equal entry
    pub fn push(&mut self, constant: Constant) -> ConstPoolResult<u16> {
        let slots = if constant.is_wide() { 2 } else { 1 };
        if self.constants.len() + slots > MAX_INDEX {
            return Err(ConstPoolError::OutOfSpace);
        }
        let wide = constant.is_wide();
        self.constants.push(constant);
        let index = self.constants.len() as u16;
        if wide {
            self.constants.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Index of the first entry equal to `constant`
    pub fn find(&self, constant: &Constant) -> Option<u16> {
        self.iter().find(|(_, c)| *c == constant).map(|(i, _)| i)
    }

    /// Reuse an equal entry or append a new one
    pub fn intern(&mut self, constant: Constant) -> ConstPoolResult<u16> {
        match self.find(&constant) {
            Some(index) => Ok(index),
            None => self.push(constant),
        }
    }

    pub fn add_utf8(&mut self, value: &str) -> ConstPoolResult<u16> {
        self.intern(Constant::Utf8(value.to_string()))
    }

    pub fn add_class(&mut self, name: &str) -> ConstPoolResult<u16> {
        let name_index = self.add_utf8(name)?;
        self.intern(Constant::Class(name_index))
    }

    pub fn add_string(&mut self, value: &str) -> ConstPoolResult<u16> {
        let utf8_index = self.add_utf8(value)?;
        self.intern(Constant::String(utf8_index))
    }

    pub fn add_long(&mut self, value: i64) -> ConstPoolResult<u16> {
        self.intern(Constant::Long(value))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let name_index = self.add_utf8(name)?;
        let descriptor_index = self.add_utf8(descriptor)?;
        self.intern(Constant::NameAndType(name_index, descriptor_index))
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.intern(Constant::MethodRef(class_index, name_and_type_index))
    }

    pub fn add_method_handle(&mut self, reference_kind: u8, reference_index: u16) -> ConstPoolResult<u16> {
        self.intern(Constant::MethodHandle(reference_kind, reference_index))
    }

    pub fn add_invoke_dynamic(&mut self, bootstrap_method_attr_index: u16, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.intern(Constant::InvokeDynamic(bootstrap_method_attr_index, name_and_type_index))
    }
}

/// Decode JVM modified UTF-8 (JVMS 4.4.7) into UTF-16 code units. Returns
/// `None` on malformed or non-canonical input, so encoding the units again
/// reproduces the original bytes.
pub fn decode_modified_utf8_units(bytes: &[u8]) -> Option<Vec<u16>> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            if b == 0 {
                return None;
            }
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1)?;
            if b2 & 0xC0 != 0x80 {
                return None;
            }
            let unit = (((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16;
            // Only NUL may use an overlong two-byte form
            if unit != 0 && unit < 0x80 {
                return None;
            }
            units.push(unit);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1)?;
            let b3 = *bytes.get(i + 2)?;
            if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                return None;
            }
            let unit = (((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | (b3 & 0x3F) as u16;
            if unit < 0x800 {
                return None;
            }
            units.push(unit);
            i += 3;
        } else {
            return None;
        }
    }
    Some(units)
}

/// Pool entry for the bytes of a Utf8 constant. Well-formed bytes that are not
/// valid Unicode stay raw; `None` only for malformed input.
pub fn utf8_constant(bytes: &[u8]) -> Option<Constant> {
    let units = decode_modified_utf8_units(bytes)?;
    Some(match String::from_utf16(&units) {
        Ok(text) => Constant::Utf8(text),
        Err(_) => Constant::RawUtf8(bytes.to_vec()),
    })
}

/// Encode a string as JVM modified UTF-8
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                bytes.push(0xC0 | (unit >> 6) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                bytes.push(0xE0 | (unit >> 12) as u8);
                bytes.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_one_based_and_wide_entries_take_two_slots() {
        let mut cp = ConstantPool::new();
        let long = cp.add_long(7).unwrap();
        let utf8 = cp.add_utf8("after").unwrap();
        assert_eq!(long, 1);
        assert_eq!(utf8, 3);
        assert_eq!(cp.count(), 4);
        assert_eq!(cp.get(2), Err(ConstPoolError::InvalidIndex(2)));
        assert_eq!(cp.get(0), Err(ConstPoolError::InvalidIndex(0)));
        assert_eq!(cp.utf8(3).unwrap(), "after");
    }

    #[test]
    fn test_interning_reuses_equal_entries() {
        let mut cp = ConstantPool::new();
        let first = cp.add_method_ref("a/B", "run", "()V").unwrap();
        let before = cp.count();
        let second = cp.add_method_ref("a/B", "run", "()V").unwrap();
        assert_eq!(first, second);
        assert_eq!(before, cp.count());
        assert_eq!(cp.member_ref(first).unwrap(), ("a/B", "run", "()V"));
    }

    #[test]
    fn test_typed_lookup_reports_wrong_entry_kind() {
        let mut cp = ConstantPool::new();
        let utf8 = cp.add_utf8("x").unwrap();
        assert_eq!(
            cp.class_name(utf8),
            Err(ConstPoolError::UnexpectedEntry { index: utf8, expected: "Class" })
        );
    }

    #[test]
    fn test_out_of_space() {
        let mut cp = ConstantPool::new();
        for i in 0..MAX_INDEX {
            cp.push(Constant::Integer(i as i32)).unwrap();
        }
        assert_eq!(cp.push(Constant::Integer(-1)), Err(ConstPoolError::OutOfSpace));
        assert_eq!(cp.count(), u16::MAX);
    }

    #[test]
    fn test_modified_utf8_special_cases() {
        let text = "a\u{0}é€😀";
        let encoded = encode_modified_utf8(text);
        // NUL is two bytes, the emoji is a surrogate pair of two 3-byte sequences
        assert_eq!(&encoded[1..3], &[0xC0, 0x80]);
        assert_eq!(encoded.len(), 1 + 2 + 2 + 3 + 6);
        assert_eq!(utf8_constant(&encoded), Some(Constant::Utf8(text.to_string())));
        assert_eq!(utf8_constant(&[0x00]), None);
        assert_eq!(utf8_constant(&[0xC3]), None);
        // overlong 'A'
        assert_eq!(utf8_constant(&[0xC1, 0x81]), None);
    }

    #[test]
    fn test_unpaired_surrogate_is_kept_raw() {
        // "[\uD800]" as javac writes it
        let bytes = [b'[', 0xED, 0xA0, 0x80, b']'];
        assert_eq!(decode_modified_utf8_units(&bytes), Some(vec![0x5B, 0xD800, 0x5D]));
        assert_eq!(utf8_constant(&bytes), Some(Constant::RawUtf8(bytes.to_vec())));
        assert_eq!(utf8_constant(b"ok"), Some(Constant::Utf8("ok".to_string())));
        assert_eq!(utf8_constant(&[0xED, 0xA0]), None);

        let mut cp = ConstantPool::new();
        let index = cp.push(Constant::RawUtf8(bytes.to_vec())).unwrap();
        assert_eq!(cp.utf8(index), Err(ConstPoolError::UnpairedSurrogate(index)));
    }
}
