//! Trait-based serialization for classfile structures

use std::io::{self, Write};

use super::annotation::{Annotation, ElementValue};
use super::attribute::{AttributeInfo, CodeAttribute, LocalVariableEntry, NamedAttribute};
use super::class::ClassFile;
use super::constpool::{constant_tags, encode_modified_utf8, Constant, ConstantPool};
use super::field::FieldInfo;
use super::method::MethodInfo;

/// An object which can be written into a classfile.
/// This trait provides a unified interface for serializing all classfile components.
pub trait ClassfileWritable {
    /// Writes the bytes of this object into the given buffer.
    ///
    /// # Arguments
    ///
    /// * `buffer` - classfile byte-buffer into which this object should be written
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()>;

    /// Writes the bytes of this object into a newly created buffer.
    fn to_classfile_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to_classfile(&mut buffer)?;
        Ok(buffer)
    }
}

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}

fn write_u16<W: Write>(buffer: &mut W, value: u16) -> io::Result<()> {
    buffer.write_all(&value.to_be_bytes())
}

/// Write a collection length as a u16 count, refusing lengths that do not fit
fn write_count<W: Write>(buffer: &mut W, len: usize, what: &str) -> io::Result<()> {
    let count = u16::try_from(len).map_err(|_| invalid_data(format!("too many {}: {}", what, len)))?;
    write_u16(buffer, count)
}

fn write_list<W: Write, T: ClassfileWritable>(buffer: &mut W, items: &[T], what: &str) -> io::Result<()> {
    write_count(buffer, items.len(), what)?;
    for item in items {
        item.write_to_classfile(buffer)?;
    }
    Ok(())
}

impl ClassfileWritable for ClassFile {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        // Write magic number
        buffer.write_all(&self.magic.to_be_bytes())?;

        // Write version
        write_u16(buffer, self.minor_version)?;
        write_u16(buffer, self.major_version)?;

        // Write constant pool
        self.constant_pool.write_to_classfile(buffer)?;

        // Write access flags and class indices
        write_u16(buffer, self.access_flags)?;
        write_u16(buffer, self.this_class)?;
        write_u16(buffer, self.super_class)?;

        write_count(buffer, self.interfaces.len(), "interfaces")?;
        for interface in &self.interfaces {
            write_u16(buffer, *interface)?;
        }

        write_list(buffer, &self.fields, "fields")?;
        write_list(buffer, &self.methods, "methods")?;
        write_list(buffer, &self.attributes, "attributes")
    }
}

impl ClassfileWritable for ConstantPool {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        // Write constant pool count (size + 1)
        write_u16(buffer, self.count())?;

        // The placeholder after a long or double is not written
        for constant in &self.constants {
            constant.write_to_classfile(buffer)?;
        }
        Ok(())
    }
}

impl ClassfileWritable for Constant {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        use constant_tags::*;

        match self {
            Constant::Utf8(value) => {
                let bytes = encode_modified_utf8(value);
                buffer.write_all(&[CONSTANT_UTF8])?;
                write_count(buffer, bytes.len(), "bytes in Utf8 constant")?;
                buffer.write_all(&bytes)?;
            }
            Constant::RawUtf8(bytes) => {
                buffer.write_all(&[CONSTANT_UTF8])?;
                write_count(buffer, bytes.len(), "bytes in Utf8 constant")?;
                buffer.write_all(bytes)?;
            }
            Constant::Integer(value) => {
                buffer.write_all(&[CONSTANT_INTEGER])?;
                buffer.write_all(&value.to_be_bytes())?;
            }
            Constant::Float(value) => {
                buffer.write_all(&[CONSTANT_FLOAT])?;
                buffer.write_all(&value.to_bits().to_be_bytes())?;
            }
            Constant::Long(value) => {
                buffer.write_all(&[CONSTANT_LONG])?;
                buffer.write_all(&value.to_be_bytes())?;
            }
            Constant::Double(value) => {
                buffer.write_all(&[CONSTANT_DOUBLE])?;
                buffer.write_all(&value.to_bits().to_be_bytes())?;
            }
            Constant::Class(name_index) => {
                buffer.write_all(&[CONSTANT_CLASS])?;
                write_u16(buffer, *name_index)?;
            }
            Constant::String(string_index) => {
                buffer.write_all(&[CONSTANT_STRING])?;
                write_u16(buffer, *string_index)?;
            }
            Constant::FieldRef(class_index, name_and_type_index) => {
                buffer.write_all(&[CONSTANT_FIELDREF])?;
                write_u16(buffer, *class_index)?;
                write_u16(buffer, *name_and_type_index)?;
            }
            Constant::MethodRef(class_index, name_and_type_index) => {
                buffer.write_all(&[CONSTANT_METHODREF])?;
                write_u16(buffer, *class_index)?;
                write_u16(buffer, *name_and_type_index)?;
            }
            Constant::InterfaceMethodRef(class_index, name_and_type_index) => {
                buffer.write_all(&[CONSTANT_INTERFACEMETHODREF])?;
                write_u16(buffer, *class_index)?;
                write_u16(buffer, *name_and_type_index)?;
            }
            Constant::NameAndType(name_index, descriptor_index) => {
                buffer.write_all(&[CONSTANT_NAMEANDTYPE])?;
                write_u16(buffer, *name_index)?;
                write_u16(buffer, *descriptor_index)?;
            }
            Constant::MethodHandle(reference_kind, reference_index) => {
                buffer.write_all(&[CONSTANT_METHODHANDLE, *reference_kind])?;
                write_u16(buffer, *reference_index)?;
            }
            Constant::MethodType(descriptor_index) => {
                buffer.write_all(&[CONSTANT_METHODTYPE])?;
                write_u16(buffer, *descriptor_index)?;
            }
            Constant::Dynamic(bootstrap_method_attr_index, name_and_type_index) => {
                buffer.write_all(&[CONSTANT_DYNAMIC])?;
                write_u16(buffer, *bootstrap_method_attr_index)?;
                write_u16(buffer, *name_and_type_index)?;
            }
            Constant::InvokeDynamic(bootstrap_method_attr_index, name_and_type_index) => {
                buffer.write_all(&[CONSTANT_INVOKEDYNAMIC])?;
                write_u16(buffer, *bootstrap_method_attr_index)?;
                write_u16(buffer, *name_and_type_index)?;
            }
            Constant::Module(name_index) => {
                buffer.write_all(&[CONSTANT_MODULE])?;
                write_u16(buffer, *name_index)?;
            }
            Constant::Package(name_index) => {
                buffer.write_all(&[CONSTANT_PACKAGE])?;
                write_u16(buffer, *name_index)?;
            }
            Constant::Unusable => {}
        }
        Ok(())
    }
}

impl ClassfileWritable for FieldInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        write_u16(buffer, self.access_flags)?;
        write_u16(buffer, self.name_index)?;
        write_u16(buffer, self.descriptor_index)?;
        write_list(buffer, &self.attributes, "field attributes")
    }
}

impl ClassfileWritable for MethodInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        write_u16(buffer, self.access_flags)?;
        write_u16(buffer, self.name_index)?;
        write_u16(buffer, self.descriptor_index)?;
        write_list(buffer, &self.attributes, "method attributes")
    }
}

impl ClassfileWritable for NamedAttribute {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        // The length prefix needs the payload first
        let mut payload = Vec::new();
        self.info.write_to_classfile(&mut payload)?;
        let len = u32::try_from(payload.len()).map_err(invalid_data)?;

        write_u16(buffer, self.name_index)?;
        buffer.write_all(&len.to_be_bytes())?;
        buffer.write_all(&payload)
    }
}

impl ClassfileWritable for AttributeInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        match self {
            AttributeInfo::Code(code) => code.write_to_classfile(buffer),
            AttributeInfo::BootstrapMethods(methods) => {
                write_count(buffer, methods.len(), "bootstrap methods")?;
                for method in methods {
                    write_u16(buffer, method.method_ref)?;
                    write_count(buffer, method.arguments.len(), "bootstrap arguments")?;
                    for argument in &method.arguments {
                        write_u16(buffer, *argument)?;
                    }
                }
                Ok(())
            }
            AttributeInfo::Signature(index) => write_u16(buffer, *index),
            AttributeInfo::RuntimeVisibleAnnotations(annotations)
            | AttributeInfo::RuntimeInvisibleAnnotations(annotations) => {
                write_list(buffer, annotations, "annotations")
            }
            AttributeInfo::RuntimeVisibleParameterAnnotations(parameters)
            | AttributeInfo::RuntimeInvisibleParameterAnnotations(parameters) => {
                let count = u8::try_from(parameters.len()).map_err(invalid_data)?;
                buffer.write_all(&[count])?;
                for annotations in parameters {
                    write_list(buffer, annotations, "parameter annotations")?;
                }
                Ok(())
            }
            AttributeInfo::AnnotationDefault(value) => value.write_to_classfile(buffer),
            AttributeInfo::LocalVariableTable(entries) | AttributeInfo::LocalVariableTypeTable(entries) => {
                write_list(buffer, entries, "local variables")
            }
            AttributeInfo::Other(bytes) => buffer.write_all(bytes),
        }
    }
}

impl ClassfileWritable for CodeAttribute {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        let max_stack = self.resolved_max_stack().map_err(invalid_data)?;
        let code = self.code_bytes().map_err(invalid_data)?;
        let code_length = u32::try_from(code.len()).map_err(invalid_data)?;

        write_u16(buffer, max_stack)?;
        write_u16(buffer, self.max_locals)?;
        buffer.write_all(&code_length.to_be_bytes())?;
        buffer.write_all(&code)?;

        write_count(buffer, self.exception_table.len(), "exception handlers")?;
        for entry in &self.exception_table {
            write_u16(buffer, entry.start_pc)?;
            write_u16(buffer, entry.end_pc)?;
            write_u16(buffer, entry.handler_pc)?;
            write_u16(buffer, entry.catch_type)?;
        }
        write_list(buffer, &self.attributes, "code attributes")
    }
}

impl ClassfileWritable for LocalVariableEntry {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        write_u16(buffer, self.start_pc)?;
        write_u16(buffer, self.length)?;
        write_u16(buffer, self.name_index)?;
        write_u16(buffer, self.descriptor_index)?;
        write_u16(buffer, self.index)
    }
}

impl ClassfileWritable for Annotation {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        write_u16(buffer, self.type_index)?;
        write_count(buffer, self.elements.len(), "annotation elements")?;
        for (name_index, value) in &self.elements {
            write_u16(buffer, *name_index)?;
            value.write_to_classfile(buffer)?;
        }
        Ok(())
    }
}

impl ClassfileWritable for ElementValue {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        buffer.write_all(&[self.tag()])?;
        match self {
            ElementValue::Const { index, .. } => write_u16(buffer, *index),
            ElementValue::Enum { type_name, const_name } => {
                write_u16(buffer, *type_name)?;
                write_u16(buffer, *const_name)
            }
            ElementValue::Class(index) => write_u16(buffer, *index),
            ElementValue::Annotation(annotation) => annotation.write_to_classfile(buffer),
            ElementValue::Array(values) => write_list(buffer, values, "array elements"),
        }
    }
}

/// Serialize a whole class
pub fn class_file_to_bytes(class_file: &ClassFile) -> io::Result<Vec<u8>> {
    class_file.to_classfile_bytes()
}
