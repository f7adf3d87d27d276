//! Byte streams with LEB128 varints.
//!
//! Both binary formats (metadata modules and class files) are sequences of
//! tagged records whose integers are unsigned LEB128, signed integers
//! zig-zag encoded, and strings length-prefixed UTF-8.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("varint too long at offset {offset}")]
    VarintOverflow { offset: usize },
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("invalid tag {tag} for {what} at offset {offset}")]
    InvalidTag {
        what: &'static str,
        tag: u64,
        offset: usize,
    },
    #[error("bad magic header")]
    BadMagic,
    #[error("{count} trailing bytes after the last record")]
    TrailingBytes { count: usize },
}

#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Unsigned LEB128.
    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_varint(u64::from(value));
    }

    /// Zig-zag encoded signed varint.
    pub fn write_i64(&mut self, value: i64) {
        self.write_varint(((value << 1) ^ (value >> 63)) as u64);
    }

    pub fn write_len(&mut self, len: usize) {
        self.write_varint(len as u64);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// `0` for `None`, `index + 1` otherwise.
    pub fn write_optional_u32(&mut self, value: Option<u32>) {
        match value {
            None => self.write_varint(0),
            Some(value) => self.write_varint(u64::from(value) + 1),
        }
    }
}

#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, pos: 0 }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Consume `expected` or fail with [`DecodeError::BadMagic`].
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<(), DecodeError> {
        let end = self.pos + expected.len();
        if self.bytes.get(self.pos..end) != Some(expected) {
            return Err(DecodeError::BadMagic);
        }
        self.pos = end;
        Ok(())
    }

    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.bytes.len() - self.pos.min(self.bytes.len()) {
            0 => Ok(()),
            count => Err(DecodeError::TrailingBytes { count }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(DecodeError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::InvalidTag {
                what: "bool",
                tag: u64::from(tag),
                offset: self.pos - 1,
            }),
        }
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let mut result = 0u64;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 {
                return Err(DecodeError::VarintOverflow { offset: start });
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let offset = self.pos;
        u32::try_from(self.read_varint()?).map_err(|_| DecodeError::VarintOverflow { offset })
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let raw = self.read_varint()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let len = self.read_varint()? as usize;
        // A length can never exceed the remaining input.
        if len > self.bytes.len().saturating_sub(self.pos) {
            return Err(DecodeError::UnexpectedEof { offset });
        }
        Ok(len)
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_len()?;
        let start = self.pos;
        let slice = &self.bytes[start..start + len];
        self.pos += len;
        std::str::from_utf8(slice)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8 { offset: start })
    }

    pub fn read_optional_u32(&mut self) -> Result<Option<u32>, DecodeError> {
        match self.read_u32()? {
            0 => Ok(None),
            value => Ok(Some(value - 1)),
        }
    }
}

#[cfg(test)]
#[path = "../tests/bytes_tests.rs"]
mod bytes_tests;
