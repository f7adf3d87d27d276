use super::*;

fn sample_class() -> ClassFile {
    let mut class = ClassFile::new("Line3", Some("kite/Any"), AccessFlags::PUBLIC | AccessFlags::SCRIPT);
    class.source_file = Some("line3.kts".to_string());
    class.fields.push(FieldInfo {
        name: "$$result".into(),
        ty: TypeDesc::Int,
        flags: AccessFlags::PUBLIC | AccessFlags::FINAL,
    });
    let print = MethodRef::new(
        "kite/io/ConsoleKt",
        "println",
        MethodDescriptor::new(vec![TypeDesc::object("kite/Any")], TypeDesc::Void),
    );
    class.methods.push(MethodInfo {
        name: "<init>".into(),
        descriptor: MethodDescriptor::new(vec![TypeDesc::object("Line2")], TypeDesc::Void),
        flags: AccessFlags::PUBLIC,
        code: Some(Code {
            max_stack: 2,
            max_locals: 3,
            instructions: vec![
                Instruction::ILoad(1),
                Instruction::LookupSwitch {
                    default: 4,
                    cases: vec![(-1, 2), (7, 3)],
                },
                Instruction::Ldc("neg".into()),
                Instruction::InvokeStatic(print),
                Instruction::Jsr(6),
                Instruction::Return,
                Instruction::AStore(2),
                Instruction::Ret(2),
            ],
            exception_table: vec![ExceptionEntry {
                from: 0,
                to: 4,
                handler: 5,
                catch_type: Some("kite/ArithmeticException".into()),
            }],
            line_numbers: vec![LineNumber { offset: 0, line: 1 }, LineNumber { offset: 2, line: 2 }],
        }),
    });
    class.methods.push(MethodInfo {
        name: "hash".into(),
        descriptor: MethodDescriptor::new(Vec::new(), TypeDesc::Int),
        flags: AccessFlags::PUBLIC,
        code: None,
    });
    class
}

#[test]
fn test_class_survives_encoding() {
    let class = sample_class();
    let bytes = encode_class(&class);
    assert!(bytes.starts_with(MAGIC));
    let decoded = decode_class(&bytes).expect("sample class decodes");
    assert_eq!(decoded, class);
}

#[test]
fn test_strings_are_pooled_once() {
    let class = sample_class();
    let bytes = encode_class(&class);
    let needle = b"kite/io/ConsoleKt";
    let occurrences = bytes.windows(needle.len()).filter(|window| window == needle).count();
    assert_eq!(occurrences, 1);
}

#[test]
fn test_bad_magic_is_rejected() {
    let mut bytes = encode_class(&sample_class());
    bytes[0] = b'X';
    assert!(matches!(
        decode_class(&bytes),
        Err(ClassFormatError::Decode(DecodeError::BadMagic))
    ));
}

#[test]
fn test_unknown_version_is_rejected() {
    let mut bytes = encode_class(&sample_class());
    bytes[MAGIC.len()] = 9;
    assert_eq!(
        decode_class(&bytes),
        Err(ClassFormatError::UnsupportedVersion {
            found: 9,
            expected: VERSION
        })
    );
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let mut bytes = encode_class(&sample_class());
    bytes.push(0);
    assert!(matches!(
        decode_class(&bytes),
        Err(ClassFormatError::Decode(DecodeError::TrailingBytes { .. }))
    ));
}

#[test]
fn test_truncated_input_is_an_error_not_a_panic() {
    let bytes = encode_class(&sample_class());
    for len in 0..bytes.len() {
        assert!(decode_class(&bytes[..len]).is_err(), "prefix of {len} bytes decoded");
    }
}

fn class_with_code(instructions: Vec<Instruction>) -> ClassFile {
    let mut class = ClassFile::new("Broken", None, AccessFlags::PUBLIC);
    class.methods.push(MethodInfo {
        name: "run".into(),
        descriptor: MethodDescriptor::new(Vec::new(), TypeDesc::Void),
        flags: AccessFlags::STATIC,
        code: Some(Code {
            instructions,
            ..Code::default()
        }),
    });
    class
}

#[test]
fn test_validation_rejects_jumps_past_the_end() {
    let class = class_with_code(vec![Instruction::Goto(5)]);
    assert!(matches!(
        validate_class(&class),
        Err(ClassFormatError::JumpOutOfRange { offset: 0, target: 5, .. })
    ));
    assert!(decode_class(&encode_class(&class)).is_err());
}

#[test]
fn test_validation_rejects_code_that_falls_off_the_end() {
    let class = class_with_code(vec![Instruction::IConst(1), Instruction::Pop]);
    assert!(matches!(
        validate_class(&class),
        Err(ClassFormatError::FallsOffEnd { .. })
    ));
    assert!(validate_class(&class_with_code(vec![Instruction::Return])).is_ok());
}

#[test]
fn test_validation_rejects_inverted_exception_ranges() {
    let mut class = class_with_code(vec![Instruction::Nop, Instruction::Return]);
    if let Some(code) = class.methods[0].code.as_mut() {
        code.exception_table.push(ExceptionEntry {
            from: 1,
            to: 1,
            handler: 0,
            catch_type: None,
        });
    }
    assert!(matches!(
        validate_class(&class),
        Err(ClassFormatError::BadExceptionRange { from: 1, to: 1, .. })
    ));
}
