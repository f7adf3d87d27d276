use super::*;

#[test]
fn test_varint_boundaries() {
    let mut writer = ByteWriter::new();
    for value in [0u64, 127, 128, 300, u64::from(u32::MAX)] {
        writer.write_varint(value);
    }
    let bytes = writer.into_bytes();
    assert_eq!(&bytes[..4], &[0x00, 0x7f, 0x80, 0x01]);

    let mut reader = ByteReader::new(&bytes);
    for expected in [0u64, 127, 128, 300, u64::from(u32::MAX)] {
        assert_eq!(reader.read_varint(), Ok(expected));
    }
    assert!(reader.finish().is_ok());
}

#[test]
fn test_signed_values_use_zigzag() {
    let mut writer = ByteWriter::new();
    writer.write_i64(-1);
    writer.write_i64(i64::from(i32::MIN));
    let bytes = writer.into_bytes();
    assert_eq!(bytes[0], 1);
    let mut reader = ByteReader::new(&bytes);
    assert_eq!(reader.read_i64(), Ok(-1));
    assert_eq!(reader.read_i64(), Ok(i64::from(i32::MIN)));
}

#[test]
fn test_truncated_input_is_an_error() {
    let mut writer = ByteWriter::new();
    writer.write_str("println");
    let mut bytes = writer.into_bytes();
    bytes.truncate(4);
    let mut reader = ByteReader::new(&bytes);
    assert_eq!(reader.read_string(), Err(DecodeError::UnexpectedEof { offset: 0 }));
}

#[test]
fn test_magic_and_trailing_bytes() {
    let bytes = b"KMETA\x01\x02";
    let mut reader = ByteReader::new(bytes);
    assert_eq!(reader.expect_magic(b"KCLASS"), Err(DecodeError::BadMagic));
    assert!(reader.expect_magic(b"KMETA").is_ok());
    assert_eq!(reader.read_u8(), Ok(1));
    assert_eq!(reader.finish(), Err(DecodeError::TrailingBytes { count: 1 }));
}

#[test]
fn test_optional_indices() {
    let mut writer = ByteWriter::new();
    writer.write_optional_u32(None);
    writer.write_optional_u32(Some(0));
    let bytes = writer.into_bytes();
    let mut reader = ByteReader::new(&bytes);
    assert_eq!(reader.read_optional_u32(), Ok(None));
    assert_eq!(reader.read_optional_u32(), Ok(Some(0)));
}
