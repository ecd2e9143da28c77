//! Class file decoding (JVMS 4)
//!
//! `read_class` turns raw bytes into a [`ClassFile`]. Attributes the rewriter
//! and the remapper need to look into are decoded into [`AttributeInfo`]
//! variants, every other attribute is kept as opaque bytes. Decoding never
//! normalizes anything, so writing an untouched class back reproduces the
//! input exactly.

use super::annotation::{element_tags, Annotation, ElementValue};
use super::attribute::{
    AttributeInfo, BootstrapMethod, CodeAttribute, ExceptionTableEntry, LocalVariableEntry, NamedAttribute,
};
use super::class::ClassFile;
use super::constpool::{constant_tags, utf8_constant, Constant, ConstantPool};
use super::defs::{attribute_names, MAGIC};
use super::error::{ClassReadError, ConstPoolError, ReadResult};
use super::field::FieldInfo;
use super::method::MethodInfo;

/// Big-endian cursor over class file bytes
pub struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn offset(&self) -> usize { self.pos }
    pub fn remaining(&self) -> usize { self.data.len() - self.pos }

    pub fn bytes(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ClassReadError::UnexpectedEof { offset: self.pos, needed: len - self.remaining() });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn u8(&mut self) -> ReadResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> ReadResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> ReadResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> ReadResult<u64> {
        let b = self.bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    fn u16_list(&mut self) -> ReadResult<Vec<u16>> {
        let count = self.u16()?;
        (0..count).map(|_| self.u16()).collect()
    }
}

/// Decode a complete class file
pub fn read_class(data: &[u8]) -> ReadResult<ClassFile> {
    let mut reader = ClassReader::new(data);

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassReadError::InvalidMagic(magic));
    }
    let minor_version = reader.u16()?;
    let major_version = reader.u16()?;
    let constant_pool = read_constant_pool(&mut reader)?;

    let access_flags = reader.u16()?;
    let this_class = reader.u16()?;
    let super_class = reader.u16()?;
    let interfaces = reader.u16_list()?;

    let field_count = reader.u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let mut field = FieldInfo::new(reader.u16()?, reader.u16()?, reader.u16()?);
        field.attributes = read_attributes(&mut reader, &constant_pool)?;
        fields.push(field);
    }

    let method_count = reader.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        let mut method = MethodInfo::new(reader.u16()?, reader.u16()?, reader.u16()?);
        method.attributes = read_attributes(&mut reader, &constant_pool)?;
        methods.push(method);
    }

    let attributes = read_attributes(&mut reader, &constant_pool)?;
    if reader.remaining() > 0 {
        return Err(ClassReadError::TrailingBytes(reader.remaining()));
    }

    Ok(ClassFile {
        magic,
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn read_constant_pool(reader: &mut ClassReader<'_>) -> ReadResult<ConstantPool> {
    let count = reader.u16()?;
    let mut constants = Vec::with_capacity(count.saturating_sub(1) as usize);
    let mut index: u16 = 1;
    while index < count {
        let tag = reader.u8()?;
        let constant = match tag {
            constant_tags::CONSTANT_UTF8 => {
                let len = reader.u16()? as usize;
                let bytes = reader.bytes(len)?;
                utf8_constant(bytes).ok_or(ClassReadError::InvalidUtf8(index))?
            }
            constant_tags::CONSTANT_INTEGER => Constant::Integer(reader.u32()? as i32),
            constant_tags::CONSTANT_FLOAT => Constant::Float(f32::from_bits(reader.u32()?)),
            constant_tags::CONSTANT_LONG => Constant::Long(reader.u64()? as i64),
            constant_tags::CONSTANT_DOUBLE => Constant::Double(f64::from_bits(reader.u64()?)),
            constant_tags::CONSTANT_CLASS => Constant::Class(reader.u16()?),
            constant_tags::CONSTANT_STRING => Constant::String(reader.u16()?),
            constant_tags::CONSTANT_FIELDREF => Constant::FieldRef(reader.u16()?, reader.u16()?),
            constant_tags::CONSTANT_METHODREF => Constant::MethodRef(reader.u16()?, reader.u16()?),
            constant_tags::CONSTANT_INTERFACEMETHODREF => Constant::InterfaceMethodRef(reader.u16()?, reader.u16()?),
            constant_tags::CONSTANT_NAMEANDTYPE => Constant::NameAndType(reader.u16()?, reader.u16()?),
            constant_tags::CONSTANT_METHODHANDLE => Constant::MethodHandle(reader.u8()?, reader.u16()?),
            constant_tags::CONSTANT_METHODTYPE => Constant::MethodType(reader.u16()?),
            constant_tags::CONSTANT_DYNAMIC => Constant::Dynamic(reader.u16()?, reader.u16()?),
            constant_tags::CONSTANT_INVOKEDYNAMIC => Constant::InvokeDynamic(reader.u16()?, reader.u16()?),
            constant_tags::CONSTANT_MODULE => Constant::Module(reader.u16()?),
            constant_tags::CONSTANT_PACKAGE => Constant::Package(reader.u16()?),
            _ => return Err(ClassReadError::InvalidConstantTag { tag, index }),
        };
        let wide = constant.is_wide();
        constants.push(constant);
        index += 1;
        if wide {
            // The second slot of the last entry would fall outside the pool
            if index >= count {
                return Err(ConstPoolError::InvalidIndex(index).into());
            }
            constants.push(Constant::Unusable);
            index += 1;
        }
    }
    Ok(ConstantPool { constants })
}

/// Read an `attributes_count` followed by that many attributes
pub fn read_attributes(reader: &mut ClassReader<'_>, constant_pool: &ConstantPool) -> ReadResult<Vec<NamedAttribute>> {
    let count = reader.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = reader.u16()?;
        let len = reader.u32()? as usize;
        let payload = reader.bytes(len)?;
        let name = constant_pool.utf8(name_index)?;
        let info = read_attribute_info(name, payload, constant_pool)?;
        attributes.push(NamedAttribute::new(name_index, info));
    }
    Ok(attributes)
}

fn read_attribute_info(name: &str, payload: &[u8], constant_pool: &ConstantPool) -> ReadResult<AttributeInfo> {
    let mut reader = ClassReader::new(payload);
    let malformed = |reason: String| ClassReadError::MalformedAttribute { attribute: name.to_string(), reason };

    let parsed = match name {
        attribute_names::CODE => read_code(&mut reader, constant_pool).map(AttributeInfo::Code),
        attribute_names::BOOTSTRAP_METHODS => read_bootstrap_methods(&mut reader).map(AttributeInfo::BootstrapMethods),
        attribute_names::SIGNATURE => reader.u16().map(AttributeInfo::Signature),
        attribute_names::RUNTIME_VISIBLE_ANNOTATIONS => {
            read_annotations(&mut reader).map(AttributeInfo::RuntimeVisibleAnnotations)
        }
        attribute_names::RUNTIME_INVISIBLE_ANNOTATIONS => {
            read_annotations(&mut reader).map(AttributeInfo::RuntimeInvisibleAnnotations)
        }
        attribute_names::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS => {
            read_parameter_annotations(&mut reader).map(AttributeInfo::RuntimeVisibleParameterAnnotations)
        }
        attribute_names::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
            read_parameter_annotations(&mut reader).map(AttributeInfo::RuntimeInvisibleParameterAnnotations)
        }
        attribute_names::ANNOTATION_DEFAULT => read_element_value(&mut reader).map(AttributeInfo::AnnotationDefault),
        attribute_names::LOCAL_VARIABLE_TABLE => read_local_variables(&mut reader).map(AttributeInfo::LocalVariableTable),
        attribute_names::LOCAL_VARIABLE_TYPE_TABLE => {
            read_local_variables(&mut reader).map(AttributeInfo::LocalVariableTypeTable)
        }
        _ => return Ok(AttributeInfo::Other(payload.to_vec())),
    };

    let info = match parsed {
        Ok(info) => info,
        Err(ClassReadError::UnexpectedEof { offset, .. }) => {
            return Err(malformed(format!("truncated at offset {}", offset)))
        }
        Err(e) => return Err(e),
    };
    if reader.remaining() > 0 {
        return Err(malformed(format!("{} unread bytes", reader.remaining())));
    }
    Ok(info)
}

fn read_code(reader: &mut ClassReader<'_>, constant_pool: &ConstantPool) -> ReadResult<CodeAttribute> {
    let max_stack = reader.u16()?;
    let max_locals = reader.u16()?;
    let code_length = reader.u32()? as usize;
    let code = reader.bytes(code_length)?.to_vec();
    let mut attribute = CodeAttribute::new(max_stack, max_locals, code);

    let exception_count = reader.u16()?;
    for _ in 0..exception_count {
        attribute.exception_table.push(ExceptionTableEntry::new(
            reader.u16()?,
            reader.u16()?,
            reader.u16()?,
            reader.u16()?,
        ));
    }
    attribute.attributes = read_attributes(reader, constant_pool)?;
    Ok(attribute)
}

fn read_bootstrap_methods(reader: &mut ClassReader<'_>) -> ReadResult<Vec<BootstrapMethod>> {
    let count = reader.u16()?;
    let mut methods = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let method_ref = reader.u16()?;
        let arguments = reader.u16_list()?;
        methods.push(BootstrapMethod { method_ref, arguments });
    }
    Ok(methods)
}

fn read_annotations(reader: &mut ClassReader<'_>) -> ReadResult<Vec<Annotation>> {
    let count = reader.u16()?;
    (0..count).map(|_| read_annotation(reader)).collect()
}

fn read_parameter_annotations(reader: &mut ClassReader<'_>) -> ReadResult<Vec<Vec<Annotation>>> {
    let parameters = reader.u8()?;
    (0..parameters).map(|_| read_annotations(reader)).collect()
}

fn read_annotation(reader: &mut ClassReader<'_>) -> ReadResult<Annotation> {
    let mut annotation = Annotation::new(reader.u16()?);
    let pairs = reader.u16()?;
    for _ in 0..pairs {
        let name_index = reader.u16()?;
        annotation.elements.push((name_index, read_element_value(reader)?));
    }
    Ok(annotation)
}

fn read_element_value(reader: &mut ClassReader<'_>) -> ReadResult<ElementValue> {
    let tag = reader.u8()?;
    let value = match tag {
        t if element_tags::is_const(t) => ElementValue::Const { tag, index: reader.u16()? },
        element_tags::ENUM => ElementValue::Enum { type_name: reader.u16()?, const_name: reader.u16()? },
        element_tags::CLASS => ElementValue::Class(reader.u16()?),
        element_tags::ANNOTATION => ElementValue::Annotation(Box::new(read_annotation(reader)?)),
        element_tags::ARRAY => {
            let count = reader.u16()?;
            let values = (0..count).map(|_| read_element_value(reader)).collect::<ReadResult<Vec<_>>>()?;
            ElementValue::Array(values)
        }
        _ => {
            return Err(ClassReadError::MalformedAttribute {
                attribute: "annotation".to_string(),
                reason: format!("unknown element value tag 0x{:02X}", tag),
            })
        }
    };
    Ok(value)
}

fn read_local_variables(reader: &mut ClassReader<'_>) -> ReadResult<Vec<LocalVariableEntry>> {
    let count = reader.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(LocalVariableEntry {
            start_pc: reader.u16()?,
            length: reader.u16()?,
            name_index: reader.u16()?,
            descriptor_index: reader.u16()?,
            index: reader.u16()?,
        });
    }
    Ok(entries)
}
