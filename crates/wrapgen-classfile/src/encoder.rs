//! Big-endian encoding and decoding primitives
//!
//! The class-file format stores every multi-byte quantity in big-endian
//! order. `ByteWriter` and `ByteReader` are the only places that know this.

use thiserror::Error;

/// Errors that can occur while decoding class-file bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Unexpected end of input
    #[error("Unexpected end of class data at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid modified UTF-8 in a constant
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// Wrong magic number
    #[error("Invalid magic number {0:#010x}")]
    InvalidMagic(u32),

    /// Unknown constant-pool tag
    #[error("Unknown constant pool tag {tag} at offset {offset}")]
    UnknownTag {
        /// The tag byte
        tag: u8,
        /// Offset of the tag
        offset: usize,
    },

    /// A constant-pool index that does not name the expected entry kind
    #[error("Constant pool index {index} is not a {expected}")]
    BadConstant {
        /// Offending index
        index: u16,
        /// Entry kind that was expected
        expected: &'static str,
    },

    /// A field or method descriptor that does not parse
    #[error("Malformed descriptor {0:?}")]
    InvalidDescriptor(String),

    /// Trailing bytes after the class structure
    #[error("{0} trailing bytes after class structure")]
    TrailingBytes(usize),
}

/// Byte sink for class-file structures
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a writer with preallocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Current length in bytes
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Borrow the bytes written so far
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    // ===== Emission =====

    /// Write one byte
    pub fn u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Write a big-endian u16
    pub fn u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian u32
    pub fn u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian i16
    pub fn i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian i32
    pub fn i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Write raw bytes
    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write a u16 length prefix followed by the bytes
    pub fn utf8(&mut self, value: &str) {
        self.u16(value.len() as u16);
        self.bytes(value.as_bytes());
    }

    // ===== Patching =====

    /// Overwrite a previously written big-endian i16
    pub fn patch_i16(&mut self, offset: usize, value: i16) {
        self.buffer[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Overwrite a previously written big-endian u32
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }
}

/// Cursor over class-file bytes
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader at offset zero
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current offset
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Whether any bytes remain
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .buffer
            .get(self.position)
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        self.position += 1;
        Ok(byte)
    }

    /// Read a big-endian u16
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a big-endian i16
    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a big-endian u32
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a big-endian i32
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }

    /// Read `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.take(count)?.to_vec())
    }

    /// Read a u16-length-prefixed UTF-8 string
    pub fn read_utf8(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u16()? as usize;
        let start = self.position;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(start))
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.buffer.len())
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        let slice = &self.buffer[self.position..end];
        self.position = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_layout() {
        let mut writer = ByteWriter::new();
        writer.u16(0x0102);
        writer.u32(0xCAFEBABE);
        assert_eq!(writer.buffer(), &[0x01, 0x02, 0xCA, 0xFE, 0xBA, 0xBE]);
    }

    #[test]
    fn test_reader_bounds_checking() {
        let mut reader = ByteReader::new(&[0x00]);
        assert_eq!(reader.read_u16(), Err(DecodeError::UnexpectedEnd(0)));
        assert_eq!(reader.read_u8(), Ok(0));
        assert!(!reader.has_more());
    }

    #[test]
    fn test_patch_i16() {
        let mut writer = ByteWriter::new();
        writer.u8(0xa7);
        let at = writer.offset();
        writer.i16(0);
        writer.patch_i16(at, -3);
        let mut reader = ByteReader::new(writer.buffer());
        reader.read_u8().unwrap();
        assert_eq!(reader.read_i16().unwrap(), -3);
    }

    #[test]
    fn test_utf8_roundtrip() {
        let mut writer = ByteWriter::new();
        writer.utf8("java/lang/Object");
        let mut reader = ByteReader::new(writer.buffer());
        assert_eq!(reader.read_utf8().unwrap(), "java/lang/Object");
        assert_eq!(reader.remaining(), 0);
    }
}
