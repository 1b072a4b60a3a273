//! Little-endian binary encoding used for hashing and relaying payloads.
//!
//! The layout follows the Neo wire format: fixed-width integers are
//! little-endian, variable-length data is prefixed with a var-int.

use thiserror::Error;

/// Errors raised while decoding binary payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    EndOfData { needed: usize, remaining: usize },
    #[error("length {length} exceeds maximum {max}")]
    TooLong { length: u64, max: usize },
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type IoResult<T> = Result<T, IoError>;

/// Types with a canonical binary encoding.
pub trait Serializable {
    /// Encoded size in bytes.
    fn size(&self) -> usize;

    fn serialize(&self, writer: &mut BinaryWriter<'_>);

    fn to_array(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.size());
        self.serialize(&mut BinaryWriter::new(&mut buffer));
        buffer
    }
}

/// Size of a var-int prefix for `value`.
pub fn get_var_size(value: u64) -> usize {
    if value < 0xFD {
        1
    } else if value <= 0xFFFF {
        3
    } else if value <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// Size of a var-bytes field.
pub fn get_var_size_bytes(data: &[u8]) -> usize {
    get_var_size(data.len() as u64) + data.len()
}

/// Size of a var-array of serializable items.
pub fn get_var_size_serializable_slice<T: Serializable>(items: &[T]) -> usize {
    get_var_size(items.len() as u64) + items.iter().map(Serializable::size).sum::<usize>()
}

/// A binary writer appending to a borrowed buffer.
pub struct BinaryWriter<'a> {
    inner: &'a mut Vec<u8>,
}

impl<'a> BinaryWriter<'a> {
    pub fn new(inner: &'a mut Vec<u8>) -> Self {
        Self { inner }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.inner.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.inner.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.inner.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.inner.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.inner.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, buffer: &[u8]) {
        self.inner.extend_from_slice(buffer);
    }

    pub fn write_var_int(&mut self, value: u64) {
        if value < 0xFD {
            self.write_u8(value as u8);
        } else if value <= 0xFFFF {
            self.write_u8(0xFD);
            self.write_u16(value as u16);
        } else if value <= 0xFFFF_FFFF {
            self.write_u8(0xFE);
            self.write_u32(value as u32);
        } else {
            self.write_u8(0xFF);
            self.write_u64(value);
        }
    }

    pub fn write_var_bytes(&mut self, data: &[u8]) {
        self.write_var_int(data.len() as u64);
        self.write_bytes(data);
    }

    pub fn write_serializable_slice<T: Serializable>(&mut self, items: &[T]) {
        self.write_var_int(items.len() as u64);
        for item in items {
            item.serialize(self);
        }
    }
}

/// A cursor over an encoded buffer.
pub struct MemoryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> MemoryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take(&mut self, count: usize) -> IoResult<&'a [u8]> {
        if self.remaining() < count {
            return Err(IoError::EndOfData {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> IoResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> IoResult<u16> {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> IoResult<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> IoResult<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_bytes(&mut self, count: usize) -> IoResult<Vec<u8>> {
        Ok(self.take(count)?.to_vec())
    }

    pub fn read_var_int(&mut self, max: u64) -> IoResult<u64> {
        let value = match self.read_u8()? {
            0xFD => u64::from(self.read_u16()?),
            0xFE => u64::from(self.read_u32()?),
            0xFF => self.read_u64()?,
            prefix => u64::from(prefix),
        };
        if value > max {
            return Err(IoError::TooLong {
                length: value,
                max: max as usize,
            });
        }
        Ok(value)
    }

    pub fn read_var_bytes(&mut self, max: usize) -> IoResult<Vec<u8>> {
        let length = self.read_var_int(max as u64)? as usize;
        self.read_bytes(length)
    }
}
