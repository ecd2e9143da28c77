//! Core classfile structure: ClassFile

use super::attribute::{AttributeInfo, BootstrapMethod, NamedAttribute};
use super::constpool::{Constant, ConstantPool};
use super::defs::{attribute_names, major_versions, MAGIC};
use super::error::{ConstPoolError, ConstPoolResult};
use super::field::FieldInfo;
use super::method::MethodInfo;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<NamedAttribute>,
}

impl Default for ClassFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassFile {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version: major_versions::JAVA_8,
            constant_pool: ConstantPool::new(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Internal name of this class
    pub fn name(&self) -> ConstPoolResult<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Internal name of the superclass, `None` for `java/lang/Object` itself
    pub fn super_name(&self) -> ConstPoolResult<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    /// Rename the class in place. The existing `this_class` entry is repointed,
    /// so every instruction referring to it follows the rename.
    pub fn set_name(&mut self, name: &str) -> ConstPoolResult<()> {
        if self.this_class == 0 {
            self.this_class = self.constant_pool.add_class(name)?;
            return Ok(());
        }
        let utf8_index = self.constant_pool.add_utf8(name)?;
        let this_class = self.this_class;
        match self.constant_pool.get_mut(this_class)? {
            Constant::Class(name_index) => {
                *name_index = utf8_index;
                Ok(())
            }
            _ => Err(ConstPoolError::UnexpectedEntry { index: this_class, expected: "Class" }),
        }
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| {
            method.name(&self.constant_pool).map_or(false, |n| n == name)
                && method.descriptor(&self.constant_pool).map_or(false, |d| d == descriptor)
        })
    }

    pub fn bootstrap_methods(&self) -> &[BootstrapMethod] {
        self.attributes
            .iter()
            .find_map(|attribute| match &attribute.info {
                AttributeInfo::BootstrapMethods(methods) => Some(methods.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Index of an equal bootstrap method entry, appending one (and the
    /// BootstrapMethods attribute itself) when missing
    pub fn add_bootstrap_method(&mut self, bootstrap: BootstrapMethod) -> ConstPoolResult<u16> {
        let existing = self.attributes.iter_mut().find_map(|attribute| match &mut attribute.info {
            AttributeInfo::BootstrapMethods(methods) => Some(methods),
            _ => None,
        });
        if let Some(methods) = existing {
            if let Some(index) = methods.iter().position(|m| *m == bootstrap) {
                return Ok(index as u16);
            }
            if methods.len() >= u16::MAX as usize {
                return Err(ConstPoolError::OutOfSpace);
            }
            methods.push(bootstrap);
            return Ok((methods.len() - 1) as u16);
        }
        let name_index = self.constant_pool.add_utf8(attribute_names::BOOTSTRAP_METHODS)?;
        self.attributes
            .push(NamedAttribute::new(name_index, AttributeInfo::BootstrapMethods(vec![bootstrap])));
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_name_repoints_existing_entry() {
        let mut class = ClassFile::new();
        class.this_class = class.constant_pool.add_class("old/Name").unwrap();
        let before = class.this_class;
        class.set_name("new/Name").unwrap();
        assert_eq!(class.this_class, before);
        assert_eq!(class.name().unwrap(), "new/Name");
    }

    #[test]
    fn test_bootstrap_methods_are_deduplicated() {
        let mut class = ClassFile::new();
        let handle = class.constant_pool.add_method_handle(6, 1).unwrap();
        let first = class.add_bootstrap_method(BootstrapMethod { method_ref: handle, arguments: vec![] }).unwrap();
        let second = class.add_bootstrap_method(BootstrapMethod { method_ref: handle, arguments: vec![] }).unwrap();
        let third = class.add_bootstrap_method(BootstrapMethod { method_ref: handle, arguments: vec![2] }).unwrap();
        assert_eq!((first, second, third), (0, 0, 1));
        assert_eq!(class.bootstrap_methods().len(), 2);
        assert_eq!(class.attributes.len(), 1);
    }
}
