use super::*;
use crate::flags::CallableKind;
use kite_types::{ClassKind, Modality, Visibility};

fn sample_module() -> ModuleProto {
    let int_name = 1;
    ModuleProto {
        name: "sample".to_string(),
        strings: vec!["kite".into(), "Int".into(), "answer".into(), "SampleKt".into()],
        qualified_names: vec![
            QualifiedNameProto { short_name: 0, parent: None, kind: QualifiedNameKind::Package },
            QualifiedNameProto { short_name: int_name, parent: Some(0), kind: QualifiedNameKind::Class },
            QualifiedNameProto { short_name: 3, parent: Some(0), kind: QualifiedNameKind::Class },
        ],
        classes: vec![Arc::new(ClassProto {
            flags: ClassFlags::build(Visibility::Public, Modality::Final, ClassKind::Class),
            fq_name: 1,
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
            constructors: Vec::new(),
            members: Vec::new(),
            nested_class_names: Vec::new(),
        })],
        packages: vec![Arc::new(PackageProto {
            fq_name: 0,
            facade: 2,
            members: vec![CallableProto {
                flags: CallableFlags::build(Visibility::Public, Modality::Final, CallableKind::Val)
                    | CallableFlags::HAS_GETTER
                    | CallableFlags::HAS_CONSTANT
                    | CallableFlags::IS_CONST,
                name: 2,
                type_parameters: Vec::new(),
                receiver_type: None,
                value_parameters: Vec::new(),
                return_type: Some(TypeProto::class(1, Vec::new(), false)),
                getter_flags: AccessorFlags::build(Visibility::Public, false),
                setter_flags: AccessorFlags::empty(),
                setter_parameter: None,
                constant: Some(ConstantProto::Int(42)),
            }],
        })],
    }
}

#[test]
fn test_module_survives_encoding() {
    let module = sample_module();
    let bytes = encode_module(&module);
    assert!(bytes.starts_with(MAGIC));
    let decoded = decode_module(&bytes).unwrap();
    assert_eq!(decoded, module);
}

#[test]
fn test_bad_magic_is_rejected() {
    let mut bytes = encode_module(&sample_module());
    bytes[0] = b'X';
    assert!(matches!(
        decode_module(&bytes),
        Err(MetadataError::Decode(DecodeError::BadMagic))
    ));
}

#[test]
fn test_unsupported_version_is_rejected() {
    let mut w = ByteWriter::new();
    w.write_raw(MAGIC);
    w.write_u32(VERSION + 1);
    assert_eq!(
        decode_module(&w.into_bytes()),
        Err(MetadataError::UnsupportedVersion { found: VERSION + 1, expected: VERSION })
    );
}

#[test]
fn test_truncated_input_is_an_error() {
    let bytes = encode_module(&sample_module());
    let truncated = &bytes[..bytes.len() - 3];
    assert!(matches!(decode_module(truncated), Err(MetadataError::Decode(_))));
}

#[test]
fn test_unknown_callable_kind_fails_validation() {
    let mut module = sample_module();
    let package = Arc::make_mut(&mut module.packages[0]);
    // Kind code 5 is not assigned.
    package.members[0].flags = CallableFlags::from_bits_retain(5 << 4);
    let bytes = encode_module(&module);
    assert_eq!(
        decode_module(&bytes),
        Err(MetadataError::UnknownCallableKind { kind: 5, name: "answer".to_string() })
    );
}

#[test]
fn test_class_reference_to_package_entry_fails_validation() {
    let mut module = sample_module();
    let package = Arc::make_mut(&mut module.packages[0]);
    package.members[0].return_type = Some(TypeProto::class(0, Vec::new(), false));
    assert_eq!(module.validate(), Err(MetadataError::NotAClassName { index: 0 }));
}

#[test]
fn test_constructor_among_members_fails_validation() {
    let mut module = sample_module();
    let package = Arc::make_mut(&mut module.packages[0]);
    package.members[0].flags = CallableFlags::build(Visibility::Public, Modality::Final, CallableKind::Constructor);
    assert_eq!(
        module.validate(),
        Err(MetadataError::MisplacedCallable { name: "answer".to_string(), place: "a package member" })
    );
}

#[test]
fn test_member_among_constructors_fails_validation() {
    let mut module = sample_module();
    let member = module.packages[0].members[0].clone();
    Arc::make_mut(&mut module.classes[0]).constructors.push(member);
    assert_eq!(
        module.validate(),
        Err(MetadataError::MisplacedCallable { name: "answer".to_string(), place: "a class constructor" })
    );
}
