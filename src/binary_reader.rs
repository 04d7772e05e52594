use crate::{varint, Error, ErrorKind, Result};
use std::str;

/// The magic number at the start of every WebAssembly module.
pub const WASM_MAGIC_NUMBER: &[u8; 4] = b"\0asm";

/// The only module format version this crate understands.
pub const WASM_VERSION: u32 = 1;

/// Types that can be decoded from a [`BinaryReader`].
pub trait FromReader<'a>: Sized {
    /// Reads one value of this type, advancing the reader past it.
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self>;
}

/// A sequential, single-pass reader over the bytes of a WebAssembly module.
///
/// Every read either consumes exactly the bytes it needs or fails; there is
/// no way to move backwards.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buffer: &'a [u8],
    position: usize,
    original_offset: usize,
}

impl<'a> BinaryReader<'a> {
    /// Creates a new binary reader which will parse the `data` provided.
    ///
    /// The `original_offset` provided is used for byte offsets in errors that
    /// are generated. That offset is added to the current position in `data`.
    pub fn new(data: &'a [u8], original_offset: usize) -> BinaryReader<'a> {
        BinaryReader {
            buffer: data,
            position: 0,
            original_offset,
        }
    }

    /// Gets the original position of the binary reader.
    #[inline]
    pub fn original_position(&self) -> usize {
        self.original_offset + self.position
    }

    /// Returns the number of bytes consumed so far.
    #[inline]
    pub fn current_position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining in the `BinaryReader`.
    #[inline]
    pub fn bytes_remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Returns whether the `BinaryReader` has reached the end of its buffer.
    #[inline]
    pub fn eof(&self) -> bool {
        self.position >= self.buffer.len()
    }

    fn ensure_has_bytes(&self, len: usize) -> Result<()> {
        if len <= self.bytes_remaining() {
            Ok(())
        } else {
            let needed = len - self.bytes_remaining();
            Err(Error::eof(self.original_position(), needed))
        }
    }

    /// Reads a value of type `T` from this binary reader, advancing the
    /// internal position in this reader forward as data is read.
    #[inline]
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: FromReader<'a>,
    {
        T::from_reader(self)
    }

    /// Reads an unsigned-LEB128 count followed by that many values of type
    /// `T`.
    ///
    /// Errors raised while reading an item are tagged with its index.
    pub fn read_vec<T>(&mut self) -> Result<Vec<T>>
    where
        T: FromReader<'a>,
    {
        let count = self.read_var_u32()? as usize;
        // Every item takes at least one byte, so don't trust `count` for
        // more capacity than there are bytes left.
        let mut items = Vec::with_capacity(count.min(self.bytes_remaining()));
        for index in 0..count {
            items.push(self.read().map_err(|e| e.in_entry(index))?);
        }
        Ok(items)
    }

    /// Advances the `BinaryReader` a single byte.
    ///
    /// # Errors
    ///
    /// If `BinaryReader` has no bytes remaining.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = match self.buffer.get(self.position) {
            Some(b) => *b,
            None => return Err(self.eof_err()),
        };
        self.position += 1;
        Ok(b)
    }

    #[cold]
    fn eof_err(&self) -> Error {
        Error::eof(self.original_position(), 1)
    }

    /// Advances the `BinaryReader` `size` bytes, and returns a slice from the
    /// current position of `size` length.
    ///
    /// # Errors
    ///
    /// If `size` exceeds the remaining length in `BinaryReader`.
    pub fn read_bytes(&mut self, size: usize) -> Result<&'a [u8]> {
        self.ensure_has_bytes(size)?;
        let start = self.position;
        self.position += size;
        Ok(&self.buffer[start..self.position])
    }

    /// Splits off the next `size` bytes into their own reader, advancing this
    /// reader past them.
    ///
    /// Offsets reported by the returned reader stay relative to the original
    /// input.
    pub fn read_reader(&mut self, size: usize) -> Result<BinaryReader<'a>> {
        let offset = self.original_position();
        let data = self.read_bytes(size)?;
        Ok(BinaryReader::new(data, offset))
    }

    /// Reads a fixed-width little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a fixed-width little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_array::<8>()?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    /// Reads an unsigned LEB128 integer of at most 32 bits.
    #[inline]
    pub fn read_var_u32(&mut self) -> Result<u32> {
        // Optimization for single byte u32.
        let byte = self.peek()?;
        if byte & 0x80 == 0 {
            self.position += 1;
            return Ok(u32::from(byte));
        }
        Ok(varint::decode_unsigned(self, 32)? as u32)
    }

    /// Reads a signed LEB128 integer of at most 32 bits.
    pub fn read_var_i32(&mut self) -> Result<i32> {
        Ok(varint::decode_signed(self, 32)? as i32)
    }

    /// Reads a signed LEB128 integer of at most 64 bits.
    pub fn read_var_i64(&mut self) -> Result<i64> {
        varint::decode_signed(self, 64)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<&'a str> {
        let len = self.read_var_u32()? as usize;
        let start = self.original_position();
        let bytes = self.read_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| Error::malformed("malformed UTF-8 encoding", start))
    }

    /// Reads the 8-byte module preamble and returns the version.
    pub(crate) fn read_header_version(&mut self) -> Result<u32> {
        let magic_number = self.read_bytes(4)?;
        if magic_number != WASM_MAGIC_NUMBER {
            return Err(Error::malformed(
                format!(
                    "magic header not detected: bad magic number - \
                     expected={WASM_MAGIC_NUMBER:#x?} actual={magic_number:#x?}"
                ),
                self.original_position() - 4,
            ));
        }
        let version = self.read_u32()?;
        if version != WASM_VERSION {
            return Err(Error::malformed(
                format!("unsupported module version {version}"),
                self.original_position() - 4,
            ));
        }
        Ok(version)
    }

    pub(crate) fn peek(&self) -> Result<u8> {
        match self.buffer.get(self.position) {
            Some(b) => Ok(*b),
            None => Err(self.eof_err()),
        }
    }

    #[cold]
    pub(crate) fn invalid_leading_byte<T>(&self, byte: u8, desc: &'static str) -> Result<T> {
        Err(Error::at(
            ErrorKind::InvalidLeadingByte { byte, desc },
            self.original_position() - 1,
        ))
    }
}

impl<'a> FromReader<'a> for u32 {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        reader.read_var_u32()
    }
}

impl<'a> FromReader<'a> for String {
    fn from_reader(reader: &mut BinaryReader<'a>) -> Result<Self> {
        Ok(reader.read_string()?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_and_remaining() {
        let mut reader = BinaryReader::new(&[1, 2, 3, 4, 5, 6], 10);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_bytes(2).unwrap(), [2, 3]);
        assert_eq!(reader.current_position(), 3);
        assert_eq!(reader.original_position(), 13);
        assert_eq!(reader.bytes_remaining(), 3);
        assert!(!reader.eof());

        let err = reader.read_u32().unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::UnexpectedEof { needed: 1 });
        assert_eq!(err.offset(), Some(13));

        let mut sub = reader.read_reader(2).unwrap();
        assert_eq!(sub.original_position(), 13);
        assert_eq!(sub.read_u8().unwrap(), 4);
        assert_eq!(reader.bytes_remaining(), 1);
        assert_eq!(reader.read_u8().unwrap(), 6);
        assert!(reader.eof());
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn fixed_width_is_little_endian() {
        let mut reader = BinaryReader::new(&[0x01, 0x00, 0x00, 0x00, 0xff, 0, 0, 0, 0, 0, 0, 0x80], 0);
        assert_eq!(reader.read_u32().unwrap(), 1);
        assert_eq!(reader.read_u64().unwrap(), 0x8000_0000_0000_00ff);
    }

    #[test]
    fn strings() {
        let mut reader = BinaryReader::new(b"\x03abc\x02\xff\xfe", 0);
        assert_eq!(reader.read_string().unwrap(), "abc");
        let err = reader.read_string().unwrap_err();
        assert_eq!(
            *err.kind(),
            ErrorKind::Malformed("malformed UTF-8 encoding".to_string())
        );
        assert_eq!(err.offset(), Some(5));
    }

    #[test]
    fn vec_errors_carry_the_entry_index() {
        let mut reader = BinaryReader::new(&[0x03, 0x01, 0x02], 0);
        let err = reader.read_vec::<u32>().unwrap_err();
        assert_eq!(err.entry(), Some(2));
        assert_eq!(*err.kind(), ErrorKind::UnexpectedEof { needed: 1 });
    }

    #[test]
    fn header() {
        let mut reader = BinaryReader::new(b"\0asm\x01\0\0\0", 0);
        assert_eq!(reader.read_header_version().unwrap(), 1);

        let mut reader = BinaryReader::new(b"\0asm\x02\0\0\0", 0);
        assert!(reader.read_header_version().is_err());

        let mut reader = BinaryReader::new(b"\0wasm\x01\0\0", 0);
        assert!(reader.read_header_version().is_err());

        let mut reader = BinaryReader::new(b"\0asm\x01", 0);
        let err = reader.read_header_version().unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::UnexpectedEof { needed: 3 });
    }
}
