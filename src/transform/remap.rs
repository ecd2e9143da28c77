//! Renaming of class references inside a parsed class
//!
//! A [`Remapper`] decides the new internal name of a class. [`remap_class`]
//! applies it to every place a class file names a type: class constants,
//! descriptors, generic signatures, annotations and debug tables.
//!
//! Utf8 entries are never edited in place. The referring structure is pointed
//! at a new (interned) Utf8 instead, since one Utf8 entry may back both a type
//! name and an unrelated string literal.

use crate::codegen::annotation::{Annotation, ElementValue};
use crate::codegen::attribute::{AttributeInfo, NamedAttribute};
use crate::codegen::class::ClassFile;
use crate::codegen::constpool::{Constant, ConstantPool};
use crate::codegen::error::DescriptorError;
use crate::common::error::{Error, Result};

pub trait Remapper {
    /// New internal name for `internal_name`, or `None` to keep it
    fn map(&self, internal_name: &str) -> Option<String>;

    /// Class constant names may be array descriptors such as `[Lfoo/Bar;`
    fn map_type_name(&self, name: &str) -> Option<String> {
        if name.starts_with('[') {
            self.map_descriptor(name)
        } else {
            self.map(name)
        }
    }

    /// Rewrite every `L<name>;` in a field or method descriptor
    fn map_descriptor(&self, descriptor: &str) -> Option<String> {
        let mut out = String::with_capacity(descriptor.len());
        let mut changed = false;
        let mut rest = descriptor;
        while let Some(start) = rest.find('L') {
            out.push_str(&rest[..=start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find(';') else {
                // Unterminated; leave the tail alone
                rest = after;
                break;
            };
            let name = &after[..end];
            match self.map(name) {
                Some(mapped) => {
                    out.push_str(&mapped);
                    changed = true;
                }
                None => out.push_str(name),
            }
            out.push(';');
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        changed.then_some(out)
    }

    /// Rewrite class names in a class, method or field signature
    fn map_signature(&self, signature: &str) -> std::result::Result<Option<String>, DescriptorError>
    where
        Self: Sized,
    {
        let mut mapper = SignatureMapper { remapper: self, input: signature, pos: 0, out: String::new(), changed: false };
        mapper.signature().map_err(|_| DescriptorError::InvalidSignature { signature: signature.to_string() })?;
        Ok(mapper.changed.then_some(mapper.out))
    }
}

/// Moves every class under `from` (the package itself or any subpackage) to `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRemapper {
    from: String,
    to: String,
}

impl PrefixRemapper {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

impl Remapper for PrefixRemapper {
    fn map(&self, internal_name: &str) -> Option<String> {
        let rest = internal_name.strip_prefix(self.from.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(format!("{}{}", self.to, rest))
        } else {
            None
        }
    }
}

/// Recursive-descent copy of a signature (JVMS 4.7.9.1) with class names mapped
struct SignatureMapper<'a, R: Remapper> {
    remapper: &'a R,
    input: &'a str,
    pos: usize,
    out: String,
    changed: bool,
}

type Parse = std::result::Result<(), ()>;

impl<'a, R: Remapper> SignatureMapper<'a, R> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, b: u8) -> Parse {
        if self.peek() == Some(b) {
            self.out.push(b as char);
            self.pos += 1;
            Ok(())
        } else {
            Err(())
        }
    }

    /// Identifier up to (not including) the first of `stops`
    fn identifier(&mut self, stops: &[u8]) -> std::result::Result<&'a str, ()> {
        let input: &'a str = self.input;
        let start = self.pos;
        let len = input.as_bytes()[start..].iter().position(|b| stops.contains(b)).ok_or(())?;
        if len == 0 {
            return Err(());
        }
        self.pos = start + len;
        Ok(&input[start..start + len])
    }

    fn signature(&mut self) -> Parse {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            // Method signature
            self.expect(b'(')?;
            while self.peek() != Some(b')') {
                self.java_type()?;
            }
            self.expect(b')')?;
            if self.peek() == Some(b'V') {
                self.expect(b'V')?;
            } else {
                self.java_type()?;
            }
            while self.peek() == Some(b'^') {
                self.expect(b'^')?;
                self.reference_type()?;
            }
        } else {
            // Field signature, or superclass followed by superinterfaces
            self.reference_type()?;
            while !self.eof() {
                self.reference_type()?;
            }
        }
        if self.eof() {
            Ok(())
        } else {
            Err(())
        }
    }

    fn type_parameters(&mut self) -> Parse {
        self.expect(b'<')?;
        loop {
            let name = self.identifier(b":")?;
            self.out.push_str(name);
            self.expect(b':')?;
            // Class bound may be empty
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.reference_type()?;
            }
            while self.peek() == Some(b':') {
                self.expect(b':')?;
                self.reference_type()?;
            }
            if self.peek() == Some(b'>') {
                return self.expect(b'>');
            }
        }
    }

    fn java_type(&mut self) -> Parse {
        match self.peek() {
            Some(b @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z')) => self.expect(b),
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Parse {
        match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => {
                self.expect(b'T')?;
                let name = self.identifier(b";")?;
                self.out.push_str(name);
                self.expect(b';')
            }
            Some(b'[') => {
                self.expect(b'[')?;
                self.java_type()
            }
            _ => Err(()),
        }
    }

    fn class_type(&mut self) -> Parse {
        self.expect(b'L')?;
        let name = self.identifier(b"<.;")?;
        match self.remapper.map(name) {
            Some(mapped) => {
                self.out.push_str(&mapped);
                self.changed = true;
            }
            None => self.out.push_str(name),
        }
        self.type_arguments_opt()?;
        // Inner classes are simple names relative to the outer type
        while self.peek() == Some(b'.') {
            self.expect(b'.')?;
            let inner = self.identifier(b"<.;")?;
            self.out.push_str(inner);
            self.type_arguments_opt()?;
        }
        self.expect(b';')
    }

    fn type_arguments_opt(&mut self) -> Parse {
        if self.peek() != Some(b'<') {
            return Ok(());
        }
        self.expect(b'<')?;
        loop {
            match self.peek() {
                Some(b'*') => self.expect(b'*')?,
                Some(b @ (b'+' | b'-')) => {
                    self.expect(b)?;
                    self.reference_type()?;
                }
                _ => self.reference_type()?,
            }
            if self.peek() == Some(b'>') {
                return self.expect(b'>');
            }
        }
    }
}

/// Apply `remapper` to every type reference in `class`
pub fn remap_class<R: Remapper>(class: &mut ClassFile, remapper: &R) -> Result<()> {
    let class_name = class.name()?.to_string();
    remap_constant_pool(&mut class.constant_pool, remapper)?;

    let constant_pool = &mut class.constant_pool;
    for field in &mut class.fields {
        let location = constant_pool.utf8(field.name_index)?.to_string();
        rewrite_utf8(constant_pool, &mut field.descriptor_index, |d| Ok(remapper.map_descriptor(d)))?;
        remap_attributes(&mut field.attributes, constant_pool, remapper, &class_name, &location)?;
    }
    for method in &mut class.methods {
        let location = constant_pool.utf8(method.name_index)?.to_string();
        rewrite_utf8(constant_pool, &mut method.descriptor_index, |d| Ok(remapper.map_descriptor(d)))?;
        remap_attributes(&mut method.attributes, constant_pool, remapper, &class_name, &location)?;
    }
    remap_attributes(&mut class.attributes, constant_pool, remapper, &class_name, "<class>")?;
    Ok(())
}

/// Class names, NameAndType descriptors and MethodType descriptors
fn remap_constant_pool<R: Remapper>(constant_pool: &mut ConstantPool, remapper: &R) -> Result<()> {
    let indices: Vec<u16> = constant_pool.iter().map(|(index, _)| index).collect();
    for index in indices {
        let mut constant = constant_pool.get(index)?.clone();
        let changed = match &mut constant {
            Constant::Class(name_index) => {
                rewrite_utf8(constant_pool, name_index, |name| Ok(remapper.map_type_name(name)))?
            }
            Constant::NameAndType(_, descriptor_index) | Constant::MethodType(descriptor_index) => {
                rewrite_utf8(constant_pool, descriptor_index, |d| Ok(remapper.map_descriptor(d)))?
            }
            _ => false,
        };
        if changed {
            *constant_pool.get_mut(index)? = constant;
        }
    }
    Ok(())
}

/// Point `index` at the mapped text when `map` changes it. Returns whether it did.
fn rewrite_utf8<F>(constant_pool: &mut ConstantPool, index: &mut u16, map: F) -> Result<bool>
where
    F: FnOnce(&str) -> Result<Option<String>>,
{
    let current = constant_pool.utf8(*index)?;
    match map(current)? {
        Some(mapped) => {
            *index = constant_pool.add_utf8(&mapped)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn rewrite_signature<R: Remapper>(
    constant_pool: &mut ConstantPool,
    index: &mut u16,
    remapper: &R,
    class_name: &str,
    location: &str,
) -> Result<bool> {
    rewrite_utf8(constant_pool, index, |signature| {
        remapper.map_signature(signature).map_err(|source| Error::Descriptor {
            class: class_name.to_string(),
            method: location.to_string(),
            source,
        })
    })
}

fn remap_attributes<R: Remapper>(
    attributes: &mut [NamedAttribute],
    constant_pool: &mut ConstantPool,
    remapper: &R,
    class_name: &str,
    location: &str,
) -> Result<()> {
    for attribute in attributes {
        match &mut attribute.info {
            AttributeInfo::Code(code) => {
                remap_attributes(&mut code.attributes, constant_pool, remapper, class_name, location)?;
            }
            AttributeInfo::Signature(index) => {
                rewrite_signature(constant_pool, index, remapper, class_name, location)?;
            }
            AttributeInfo::RuntimeVisibleAnnotations(annotations)
            | AttributeInfo::RuntimeInvisibleAnnotations(annotations) => {
                for annotation in annotations {
                    remap_annotation(annotation, constant_pool, remapper)?;
                }
            }
            AttributeInfo::RuntimeVisibleParameterAnnotations(parameters)
            | AttributeInfo::RuntimeInvisibleParameterAnnotations(parameters) => {
                for annotation in parameters.iter_mut().flatten() {
                    remap_annotation(annotation, constant_pool, remapper)?;
                }
            }
            AttributeInfo::AnnotationDefault(value) => remap_element_value(value, constant_pool, remapper)?,
            AttributeInfo::LocalVariableTable(entries) => {
                for entry in entries {
                    rewrite_utf8(constant_pool, &mut entry.descriptor_index, |d| Ok(remapper.map_descriptor(d)))?;
                }
            }
            AttributeInfo::LocalVariableTypeTable(entries) => {
                for entry in entries {
                    rewrite_signature(constant_pool, &mut entry.descriptor_index, remapper, class_name, location)?;
                }
            }
            AttributeInfo::BootstrapMethods(_) | AttributeInfo::Other(_) => {}
        }
    }
    Ok(())
}

fn remap_annotation<R: Remapper>(
    annotation: &mut Annotation,
    constant_pool: &mut ConstantPool,
    remapper: &R,
) -> Result<()> {
    rewrite_utf8(constant_pool, &mut annotation.type_index, |d| Ok(remapper.map_descriptor(d)))?;
    for (_, value) in &mut annotation.elements {
        remap_element_value(value, constant_pool, remapper)?;
    }
    Ok(())
}

fn remap_element_value<R: Remapper>(
    value: &mut ElementValue,
    constant_pool: &mut ConstantPool,
    remapper: &R,
) -> Result<()> {
    match value {
        ElementValue::Const { .. } => {}
        ElementValue::Enum { type_name, .. } => {
            rewrite_utf8(constant_pool, type_name, |d| Ok(remapper.map_descriptor(d)))?;
        }
        ElementValue::Class(index) => {
            rewrite_utf8(constant_pool, index, |d| Ok(remapper.map_descriptor(d)))?;
        }
        ElementValue::Annotation(annotation) => remap_annotation(annotation, constant_pool, remapper)?,
        ElementValue::Array(values) => {
            for value in values {
                remap_element_value(value, constant_pool, remapper)?;
            }
        }
    }
    Ok(())
}
