//! The write side of the codec.
//!
//! Everything encodes into a plain `Vec<u8>` sink: bytes are only ever
//! appended, and `sink.len()` is the number of bytes produced so far.
//! Length-prefixed regions (section payloads, code bodies) are encoded into a
//! scratch buffer first so that their length is known before it's written.

use crate::{varint, Result};

/// Types that can be written in the WebAssembly binary format.
pub trait Encode {
    /// Appends the binary encoding of `self` to `sink`.
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()>;
}

impl<T: Encode + ?Sized> Encode for &'_ T {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        T::encode(self, sink)
    }
}

/// A count followed by every item; errors are tagged with the item index.
impl<T: Encode> Encode for [T] {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        write_len(sink, self.len());
        for (index, item) in self.iter().enumerate() {
            item.encode(sink).map_err(|e| e.in_entry(index))?;
        }
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        <[T]>::encode(self, sink)
    }
}

impl Encode for u32 {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        varint::write_unsigned(sink, u64::from(*self));
        Ok(())
    }
}

impl Encode for str {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        write_bytes(sink, self.as_bytes());
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, sink: &mut Vec<u8>) -> Result<()> {
        self.as_str().encode(sink)
    }
}

/// Writes a length as an unsigned LEB128 integer.
pub(crate) fn write_len(sink: &mut Vec<u8>, len: usize) {
    varint::write_unsigned(sink, len as u64);
}

/// Writes `bytes` prefixed by their length.
pub(crate) fn write_bytes(sink: &mut Vec<u8>, bytes: &[u8]) {
    write_len(sink, bytes.len());
    sink.extend_from_slice(bytes);
}

/// Encodes `item` into `scratch`, then writes the scratch buffer's length
/// followed by its contents to `sink`.
pub(crate) fn write_sized(
    sink: &mut Vec<u8>,
    scratch: &mut Vec<u8>,
    item: &(impl Encode + ?Sized),
) -> Result<()> {
    scratch.truncate(0);
    item.encode(scratch)?;
    write_bytes(sink, scratch);
    Ok(())
}
