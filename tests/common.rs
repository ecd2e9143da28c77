// Common test utilities

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use expect_platform::codegen::annotation::Annotation;
use expect_platform::codegen::attribute::{AttributeInfo, CodeAttribute, NamedAttribute};
use expect_platform::codegen::class::ClassFile;
use expect_platform::codegen::flag::access_flags;
use expect_platform::codegen::method::MethodInfo;
use expect_platform::codegen::opcodes;
use expect_platform::codegen::writer::ClassfileWritable;
use expect_platform::consts::{EXPECT_PLATFORM_LEGACY, EXPECT_PLATFORM_NEW};

pub const PUBLIC_STATIC: u16 = access_flags::ACC_PUBLIC | access_flags::ACC_STATIC;

/// Route crate logging to the test harness
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

pub fn load_fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).unwrap_or_else(|e| panic!("missing fixture {}: {}", name, e))
}

/// Which annotation a test method carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    None,
    Legacy,
    Namespaced,
    /// Namespaced descriptor, but stored as a runtime-visible annotation
    NamespacedVisible,
}

/// Builds small classes whose methods have placeholder bodies
pub struct ClassBuilder {
    class: ClassFile,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        let mut class = ClassFile::new();
        class.access_flags = access_flags::ACC_PUBLIC | access_flags::ACC_SUPER;
        class.this_class = class.constant_pool.add_class(name).unwrap();
        class.super_class = class.constant_pool.add_class("java/lang/Object").unwrap();
        Self { class }
    }

    pub fn major_version(mut self, major: u16) -> Self {
        self.class.major_version = major;
        self
    }

    /// A method whose body throws `AssertionError`
    pub fn method(mut self, access: u16, name: &str, descriptor: &str, mark: Mark) -> Self {
        let cp = &mut self.class.constant_pool;
        let name_index = cp.add_utf8(name).unwrap();
        let descriptor_index = cp.add_utf8(descriptor).unwrap();
        let mut method = MethodInfo::new(access, name_index, descriptor_index);

        let error_class = cp.add_class("java/lang/AssertionError").unwrap();
        let init = cp.add_method_ref("java/lang/AssertionError", "<init>", "()V").unwrap();
        let [e_hi, e_lo] = error_class.to_be_bytes();
        let [i_hi, i_lo] = init.to_be_bytes();
        let code = vec![opcodes::NEW, e_hi, e_lo, opcodes::DUP, opcodes::INVOKESPECIAL, i_hi, i_lo, opcodes::ATHROW];
        let code_name = cp.add_utf8("Code").unwrap();
        method
            .attributes
            .push(NamedAttribute::new(code_name, AttributeInfo::Code(CodeAttribute::new(2, 8, code))));

        if let Some((attribute, descriptor)) = match mark {
            Mark::None => None,
            Mark::Legacy => Some(("RuntimeVisibleAnnotations", EXPECT_PLATFORM_LEGACY)),
            Mark::Namespaced => Some(("RuntimeInvisibleAnnotations", EXPECT_PLATFORM_NEW)),
            Mark::NamespacedVisible => Some(("RuntimeVisibleAnnotations", EXPECT_PLATFORM_NEW)),
        } {
            let attribute_name = cp.add_utf8(attribute).unwrap();
            let annotation = Annotation::new(cp.add_utf8(descriptor).unwrap());
            let info = if attribute == "RuntimeVisibleAnnotations" {
                AttributeInfo::RuntimeVisibleAnnotations(vec![annotation])
            } else {
                AttributeInfo::RuntimeInvisibleAnnotations(vec![annotation])
            };
            method.attributes.push(NamedAttribute::new(attribute_name, info));
        }

        self.class.methods.push(method);
        self
    }

    pub fn build(self) -> ClassFile {
        self.class
    }

    pub fn bytes(self) -> Vec<u8> {
        self.class.to_classfile_bytes().unwrap()
    }
}

/// Code bytes of `name` in a parsed class
pub fn code_of(class: &ClassFile, name: &str, descriptor: &str) -> Vec<u8> {
    let method = class.find_method(name, descriptor).unwrap_or_else(|| panic!("no method {}{}", name, descriptor));
    method.code().expect("method has no Code").code_bytes().unwrap().into_owned()
}
