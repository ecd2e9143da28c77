mod common;

use common::{code_of, init_logger, load_fixture, ClassBuilder, Mark, PUBLIC_STATIC};
use expect_platform::codegen::attribute::{AttributeInfo, MaxStack};
use expect_platform::codegen::class::ClassFile;
use expect_platform::codegen::constpool::Constant;
use expect_platform::codegen::defs::reference_kinds;
use expect_platform::codegen::flag::access_flags;
use expect_platform::codegen::opcodes;
use expect_platform::codegen::reader::read_class;
use expect_platform::codegen::writer::{class_file_to_bytes, ClassfileWritable};
use expect_platform::consts::{
    BOOTSTRAP_METHOD_DESCRIPTOR, BOOTSTRAP_METHOD_NAME, LEGACY_PLATFORM_METHODS, USAGE_ERROR_STATIC_ONLY,
};
use expect_platform::transform::ExpectPlatformTransformer;
use expect_platform::{BuildContext, BuildIdentifier, Diagnostics, Error, Transformer};

fn transformer(identifier: &str) -> Transformer {
    Transformer::new(BuildContext::new(BuildIdentifier::new(identifier).unwrap(), true))
}

/// Resolver class named by the bootstrap method of the `invokedynamic` at offset `at`
fn bootstrap_owner(class: &ClassFile, code: &[u8], at: usize) -> String {
    assert_eq!(code[at], opcodes::INVOKEDYNAMIC);
    assert_eq!(&code[at + 3..at + 5], &[0, 0]);
    let index = u16::from_be_bytes([code[at + 1], code[at + 2]]);
    let Constant::InvokeDynamic(bootstrap_index, _) = class.constant_pool.get(index).unwrap() else {
        panic!("call site {} is not InvokeDynamic", index);
    };
    let bootstrap = &class.bootstrap_methods()[*bootstrap_index as usize];
    assert!(bootstrap.arguments.is_empty());
    let Constant::MethodHandle(kind, reference) = class.constant_pool.get(bootstrap.method_ref).unwrap() else {
        panic!("bootstrap method is not a MethodHandle");
    };
    assert_eq!(*kind, reference_kinds::REF_INVOKE_STATIC);
    let (owner, name, descriptor) = class.constant_pool.member_ref(*reference).unwrap();
    assert_eq!(name, BOOTSTRAP_METHOD_NAME);
    assert_eq!(descriptor, BOOTSTRAP_METHOD_DESCRIPTOR);
    owner.to_string()
}

/// Name and descriptor of the `invokedynamic` at offset `at`
fn call_site(class: &ClassFile, code: &[u8], at: usize) -> (String, String) {
    let index = u16::from_be_bytes([code[at + 1], code[at + 2]]);
    let Constant::InvokeDynamic(_, nat) = class.constant_pool.get(index).unwrap() else {
        panic!("call site {} is not InvokeDynamic", index);
    };
    let (name, descriptor) = class.constant_pool.name_and_type(*nat).unwrap();
    (name.to_string(), descriptor.to_string())
}

#[test]
fn test_namespaced_add_end_to_end() {
    init_logger();
    let input = ClassBuilder::new("demo/Util").method(PUBLIC_STATIC, "add", "(IJ)I", Mark::Namespaced).bytes();

    let mut diagnostics = Diagnostics::new();
    let output = transformer("abc123").transform_class("demo/Util", &input, &mut diagnostics).unwrap();
    assert!(diagnostics.is_empty());

    let class = read_class(&output).unwrap();
    let code = code_of(&class, "add", "(IJ)I");
    assert_eq!(code.len(), 8);
    assert_eq!(&code[..2], &[opcodes::ILOAD_0, opcodes::LLOAD_1]);
    assert_eq!(code[7], opcodes::IRETURN);
    assert_eq!(bootstrap_owner(&class, &code, 2), "abc123/PlatformMethods");
    assert_eq!(call_site(&class, &code, 2), ("add".to_string(), "(IJ)I".to_string()));

    let method_code = class.find_method("add", "(IJ)I").unwrap().code().unwrap();
    assert_eq!(method_code.max_locals, 3);
    assert_eq!(method_code.max_stack, MaxStack::Fixed(3));
    assert!(method_code.exception_table.is_empty());
}

#[test]
fn test_legacy_marker_uses_fixed_resolver() {
    let input = ClassBuilder::new("demo/Util").method(PUBLIC_STATIC, "ping", "()V", Mark::Legacy).bytes();
    let output = transformer("abc123").transform_class("demo/Util", &input, &mut Diagnostics::new()).unwrap();

    let class = read_class(&output).unwrap();
    let code = code_of(&class, "ping", "()V");
    assert_eq!(code.len(), 6);
    assert_eq!(code[5], opcodes::RETURN);
    assert_eq!(bootstrap_owner(&class, &code, 0), LEGACY_PLATFORM_METHODS);
}

#[test]
fn test_marker_visibility_matters() {
    // The namespaced descriptor is only honoured on the invisible attribute
    let input = ClassBuilder::new("demo/Util").method(PUBLIC_STATIC, "ping", "()V", Mark::NamespacedVisible).bytes();
    let output = transformer("abc123").transform_class("demo/Util", &input, &mut Diagnostics::new()).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_unmarked_class_is_byte_identical() {
    let input = ClassBuilder::new("demo/Plain")
        .method(PUBLIC_STATIC, "a", "(I)I", Mark::None)
        .method(access_flags::ACC_PUBLIC, "b", "()V", Mark::None)
        .bytes();
    let t = transformer("abc123");
    let first = t.transform_class("demo/Plain", &input, &mut Diagnostics::new()).unwrap();
    let second = t.transform_class("demo/Plain", &first, &mut Diagnostics::new()).unwrap();
    assert_eq!(first, input);
    assert_eq!(second, input);
}

#[test]
fn test_instance_methods_are_reported_and_skipped() {
    init_logger();
    for mark in [Mark::Legacy, Mark::Namespaced] {
        let input = ClassBuilder::new("demo/Util")
            .method(access_flags::ACC_PUBLIC, "bound", "(Ljava/lang/String;)I", mark)
            .method(PUBLIC_STATIC, "free", "(Ljava/lang/String;)I", mark)
            .bytes();

        let mut diagnostics = Diagnostics::new();
        let output = transformer("abc123").transform_class("demo/Util", &input, &mut diagnostics).unwrap();

        let reported: Vec<_> = diagnostics.iter().collect();
        assert_eq!(reported.len(), 1, "{:?}", mark);
        assert_eq!(reported[0].class_name, "demo/Util");
        assert_eq!(reported[0].method_name, "bound");
        assert_eq!(reported[0].message, USAGE_ERROR_STATIC_ONLY);

        let before = read_class(&input).unwrap();
        let after = read_class(&output).unwrap();
        assert_eq!(
            code_of(&after, "bound", "(Ljava/lang/String;)I"),
            code_of(&before, "bound", "(Ljava/lang/String;)I")
        );
        let free = code_of(&after, "free", "(Ljava/lang/String;)I");
        assert_eq!(free[0], opcodes::ALOAD_0);
        assert_eq!(*free.last().unwrap(), opcodes::IRETURN);
    }
}

#[test]
fn test_only_instance_methods_leaves_bytes_alone() {
    let input = ClassBuilder::new("demo/Util")
        .method(access_flags::ACC_PUBLIC, "bound", "()V", Mark::Namespaced)
        .bytes();
    let mut diagnostics = Diagnostics::new();
    let output = transformer("abc123").transform_class("demo/Util", &input, &mut diagnostics).unwrap();
    assert_eq!(output, input);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn test_return_families_and_slots() {
    let cases: &[(&str, &[u8], u8, u16)] = &[
        ("(ZBCS)Z", &[opcodes::ILOAD_0, opcodes::ILOAD_1, opcodes::ILOAD_2, opcodes::ILOAD_3], opcodes::IRETURN, 4),
        ("(F)F", &[opcodes::FLOAD_0], opcodes::FRETURN, 1),
        ("(JJ)J", &[opcodes::LLOAD_0, opcodes::LLOAD_2], opcodes::LRETURN, 4),
        ("(DI)D", &[opcodes::DLOAD_0, opcodes::ILOAD_2], opcodes::DRETURN, 3),
        ("(Ljava/lang/Object;)Ljava/lang/String;", &[opcodes::ALOAD_0], opcodes::ARETURN, 1),
        ("([I)[I", &[opcodes::ALOAD_0], opcodes::ARETURN, 1),
        ("()V", &[], opcodes::RETURN, 0),
    ];
    let mut builder = ClassBuilder::new("demo/Returns");
    for (i, (descriptor, _, _, _)) in cases.iter().enumerate() {
        builder = builder.method(PUBLIC_STATIC, &format!("m{}", i), descriptor, Mark::Namespaced);
    }
    let output = transformer("abc123").transform_class("demo/Returns", &builder.bytes(), &mut Diagnostics::new()).unwrap();
    let class = read_class(&output).unwrap();

    for (i, (descriptor, loads, ret, locals)) in cases.iter().enumerate() {
        let name = format!("m{}", i);
        let code = code_of(&class, &name, descriptor);
        assert_eq!(&code[..loads.len()], *loads, "{}", descriptor);
        assert_eq!(code[loads.len()], opcodes::INVOKEDYNAMIC, "{}", descriptor);
        assert_eq!(code.len(), loads.len() + 6, "{}", descriptor);
        assert_eq!(*code.last().unwrap(), *ret, "{}", descriptor);
        let method = class.find_method(&name, descriptor).unwrap();
        assert_eq!(method.code().unwrap().max_locals, *locals, "{}", descriptor);
    }
    // every call site shares one bootstrap entry
    assert_eq!(class.bootstrap_methods().len(), 1);
}

#[test]
fn test_identifier_only_changes_resolver_name() {
    let input = ClassBuilder::new("demo/Util")
        .method(PUBLIC_STATIC, "add", "(IJ)I", Mark::Namespaced)
        .method(PUBLIC_STATIC, "name", "()Ljava/lang/String;", Mark::Namespaced)
        .bytes();
    let a = read_class(&transformer("aaa").transform_class("demo/Util", &input, &mut Diagnostics::new()).unwrap()).unwrap();
    let b = read_class(&transformer("bbb").transform_class("demo/Util", &input, &mut Diagnostics::new()).unwrap()).unwrap();

    assert_eq!(a.methods, b.methods);
    assert_eq!(a.attributes, b.attributes);
    let pool_a: Vec<_> = a.constant_pool.iter().collect();
    let pool_b: Vec<_> = b.constant_pool.iter().collect();
    assert_eq!(pool_a.len(), pool_b.len());
    for ((index, left), (_, right)) in pool_a.iter().zip(&pool_b) {
        match (left, right) {
            (Constant::Utf8(l), Constant::Utf8(r)) if l != r => {
                assert_eq!(l.as_str(), "aaa/PlatformMethods", "entry {}", index);
                assert_eq!(r.as_str(), "bbb/PlatformMethods", "entry {}", index);
            }
            _ => assert_eq!(left, right, "entry {}", index),
        }
    }
}

#[test]
fn test_rewriting_twice_is_stable() {
    let input = ClassBuilder::new("demo/Util")
        .method(PUBLIC_STATIC, "add", "(IJ)I", Mark::Namespaced)
        .method(PUBLIC_STATIC, "ping", "()V", Mark::Legacy)
        .bytes();
    let t = transformer("abc123");
    let once = t.transform_class("demo/Util", &input, &mut Diagnostics::new()).unwrap();
    let twice = t.transform_class("demo/Util", &once, &mut Diagnostics::new()).unwrap();
    assert_ne!(once, input);
    assert_eq!(twice, once);
}

#[test]
fn test_bad_descriptor_aborts_class_untouched() {
    let identifier = BuildIdentifier::new("abc123").unwrap();
    let mut class = ClassBuilder::new("demo/Broken")
        .method(PUBLIC_STATIC, "fine", "()V", Mark::Namespaced)
        .method(PUBLIC_STATIC, "broken", "(Q)V", Mark::Namespaced)
        .build();
    let before = class.clone();

    let err = ExpectPlatformTransformer::new(&identifier).transform(&mut class, &mut Diagnostics::new()).unwrap_err();
    match err {
        Error::Descriptor { class: owner, method, .. } => {
            assert_eq!(owner, "demo/Broken");
            assert_eq!(method, "broken");
        }
        other => panic!("expected a descriptor error, got {:?}", other),
    }
    assert_eq!(class, before);
}

#[test]
fn test_old_class_version_is_rejected() {
    let input = ClassBuilder::new("demo/Old")
        .major_version(50)
        .method(PUBLIC_STATIC, "add", "(IJ)I", Mark::Legacy)
        .bytes();
    let err = transformer("abc123").transform_class("demo/Old", &input, &mut Diagnostics::new()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedClassVersion { major: 50, required: 51, .. }), "{:?}", err);

    // nothing to rewrite, so the version does not matter
    let plain = ClassBuilder::new("demo/Old").major_version(50).method(PUBLIC_STATIC, "a", "()V", Mark::None).bytes();
    let output = transformer("abc123").transform_class("demo/Old", &plain, &mut Diagnostics::new()).unwrap();
    assert_eq!(output, plain);
}

#[test]
fn test_native_method_gains_code() {
    let identifier = BuildIdentifier::new("abc123").unwrap();
    let mut class = ClassBuilder::new("demo/Native").method(PUBLIC_STATIC, "n", "(I)V", Mark::Namespaced).build();
    let method = &mut class.methods[0];
    method.attributes.retain(|attribute| !matches!(attribute.info, AttributeInfo::Code(_)));
    method.access_flags |= access_flags::ACC_NATIVE;

    let rewritten = ExpectPlatformTransformer::new(&identifier).transform(&mut class, &mut Diagnostics::new()).unwrap();
    assert_eq!(rewritten, 1);
    let method = &class.methods[0];
    assert_eq!(method.access_flags & access_flags::ACC_NATIVE, 0);
    assert_eq!(method.code().unwrap().code_bytes().unwrap()[0], opcodes::ILOAD_0);
    assert!(method.invisible_annotations().next().is_some());
}

#[test]
fn test_platforms_fixture() {
    init_logger();
    let input = load_fixture("Platforms.class");
    let original = read_class(&input).unwrap();

    let mut diagnostics = Diagnostics::new();
    let output = transformer("abc123").transform_class("demo/Platforms", &input, &mut diagnostics).unwrap();
    let class = read_class(&output).unwrap();

    let reported: Vec<_> = diagnostics.iter().map(|d| d.method_name.as_str()).collect();
    assert_eq!(reported, vec!["instanceBound"]);

    let add = code_of(&class, "add", "(IJ)I");
    assert_eq!(&add[..2], &[opcodes::ILOAD_0, opcodes::LLOAD_1]);
    assert_eq!(bootstrap_owner(&class, &add, 2), LEGACY_PLATFORM_METHODS);

    let names_descriptor = "([Ljava/lang/Object;DZ)Ljava/util/List;";
    let names = code_of(&class, "names", names_descriptor);
    assert_eq!(&names[..3], &[opcodes::ALOAD_0, opcodes::DLOAD_1, opcodes::ILOAD_3]);
    assert_eq!(*names.last().unwrap(), opcodes::ARETURN);
    assert_eq!(bootstrap_owner(&class, &names, 3), "abc123/PlatformMethods");
    let names_method = class.find_method("names", names_descriptor).unwrap();
    assert_eq!(names_method.code().unwrap().max_locals, 4);
    // annotations and the generic signature stay on the method
    assert!(names_method.invisible_annotations().next().is_some());
    assert!(names_method.attributes.iter().any(|a| matches!(a.info, AttributeInfo::Signature(_))));

    for (name, descriptor) in [("plain", "(I)I"), ("instanceBound", "(Ljava/lang/String;)I"), ("<init>", "()V")] {
        assert_eq!(
            class.find_method(name, descriptor).unwrap().code(),
            original.find_method(name, descriptor).unwrap().code(),
            "{} changed",
            name
        );
    }
    assert_eq!(class.bootstrap_methods().len(), 2);
}

/// The built class plus the string literal "[\uD800]" as javac encodes it
fn with_lone_surrogate_literal(builder: ClassBuilder) -> (Vec<u8>, Vec<u8>) {
    let raw = vec![b'[', 0xED, 0xA0, 0x80, b']'];
    let mut class = builder.build();
    let utf8 = class.constant_pool.push(Constant::RawUtf8(raw.clone())).unwrap();
    class.constant_pool.push(Constant::String(utf8)).unwrap();
    (class.to_classfile_bytes().unwrap(), raw)
}

#[test]
fn test_lone_surrogate_literal_passes_through() {
    let (input, _) =
        with_lone_surrogate_literal(ClassBuilder::new("demo/Regex").method(PUBLIC_STATIC, "a", "()V", Mark::None));
    let output = transformer("abc123").transform_class("demo/Regex", &input, &mut Diagnostics::new()).unwrap();
    assert_eq!(output, input);
    assert_eq!(class_file_to_bytes(&read_class(&input).unwrap()).unwrap(), input);
}

#[test]
fn test_lone_surrogate_literal_survives_rewrite() {
    let (input, raw) =
        with_lone_surrogate_literal(ClassBuilder::new("demo/Regex").method(PUBLIC_STATIC, "add", "(IJ)I", Mark::Namespaced));
    let output = transformer("abc123").transform_class("demo/Regex", &input, &mut Diagnostics::new()).unwrap();
    let class = read_class(&output).unwrap();
    assert_eq!(code_of(&class, "add", "(IJ)I")[0], opcodes::ILOAD_0);
    assert!(class.constant_pool.find(&Constant::RawUtf8(raw)).is_some());
}

#[test]
fn test_too_many_parameter_slots_aborts_class() {
    init_logger();
    let identifier = BuildIdentifier::new("abc123").unwrap();
    let wide = format!("({})V", "J".repeat(128));
    let mut class = ClassBuilder::new("demo/Wide").method(PUBLIC_STATIC, "wide", &wide, Mark::Namespaced).build();
    let before = class.clone();

    let err = ExpectPlatformTransformer::new(&identifier).transform(&mut class, &mut Diagnostics::new()).unwrap_err();
    assert!(matches!(err, Error::Descriptor { ref method, .. } if method == "wide"), "{:?}", err);
    assert_eq!(class, before);

    // exactly 255 slots still rewrites
    let full = format!("({}I)V", "J".repeat(127));
    let input = ClassBuilder::new("demo/Wide").method(PUBLIC_STATIC, "full", &full, Mark::Namespaced).bytes();
    let output = transformer("abc123").transform_class("demo/Wide", &input, &mut Diagnostics::new()).unwrap();
    let class = read_class(&output).unwrap();
    assert_eq!(class.find_method("full", &full).unwrap().code().unwrap().max_locals, 255);
}

#[test]
fn test_aborted_class_reports_nothing() {
    let identifier = BuildIdentifier::new("abc123").unwrap();
    let mut class = ClassBuilder::new("demo/Broken")
        .method(access_flags::ACC_PUBLIC, "bound", "()V", Mark::Namespaced)
        .method(PUBLIC_STATIC, "broken", "(Q)V", Mark::Namespaced)
        .build();

    let mut diagnostics = Diagnostics::new();
    let result = ExpectPlatformTransformer::new(&identifier).transform(&mut class, &mut diagnostics);
    assert!(matches!(result, Err(Error::Descriptor { .. })));
    assert!(diagnostics.is_empty());

    // same for an old class version
    let input = ClassBuilder::new("demo/Old")
        .major_version(50)
        .method(access_flags::ACC_PUBLIC, "bound", "()V", Mark::Legacy)
        .method(PUBLIC_STATIC, "free", "()V", Mark::Legacy)
        .bytes();
    let mut diagnostics = Diagnostics::new();
    assert!(transformer("abc123").transform_class("demo/Old", &input, &mut diagnostics).is_err());
    assert!(diagnostics.is_empty());
}
