//! LEB128 variable-length integers.
//!
//! Encoding always produces the minimal (canonical) representation, which is
//! what makes byte-exact round trips possible. Decoding is width-checked: a
//! value that needs more than `bits` bits, or whose representation is longer
//! than a `bits`-bit integer can ever need, is rejected with
//! [`ErrorKind::MalformedVarint`].

use crate::{BinaryReader, Error, ErrorKind, Result};

/// Writes `value` as an unsigned LEB128 integer, returning the number of
/// bytes written.
pub fn write_unsigned(sink: &mut Vec<u8>, value: u64) -> usize {
    // Writing into a `Vec` cannot fail.
    leb128::write::unsigned(sink, value).unwrap()
}

/// Writes `value` as a signed LEB128 integer, returning the number of bytes
/// written.
pub fn write_signed(sink: &mut Vec<u8>, value: i64) -> usize {
    leb128::write::signed(sink, value).unwrap()
}

/// Writes `value` as an unsigned LEB128 integer of at most `bits` bits.
///
/// # Errors
///
/// Returns [`ErrorKind::MalformedVarint`] if `value` doesn't fit in `bits`
/// bits.
pub fn encode_unsigned(sink: &mut Vec<u8>, value: u64, bits: u32) -> Result<usize> {
    debug_assert!(bits > 0 && bits <= 64);
    if bits < 64 && value >> bits != 0 {
        return Err(ErrorKind::MalformedVarint("integer too large for its width").into());
    }
    Ok(write_unsigned(sink, value))
}

/// Writes `value` as a signed LEB128 integer of at most `bits` bits.
///
/// # Errors
///
/// Returns [`ErrorKind::MalformedVarint`] if `value` doesn't fit in `bits`
/// bits.
pub fn encode_signed(sink: &mut Vec<u8>, value: i64, bits: u32) -> Result<usize> {
    debug_assert!(bits > 0 && bits <= 64);
    let ashift = 64 - bits;
    if (value << ashift) >> ashift != value {
        return Err(ErrorKind::MalformedVarint("integer too large for its width").into());
    }
    Ok(write_signed(sink, value))
}

/// Reads an unsigned LEB128 integer of at most `bits` bits.
pub fn decode_unsigned(reader: &mut BinaryReader<'_>, bits: u32) -> Result<u64> {
    debug_assert!(bits > 0 && bits <= 64);
    let mut byte = reader.read_u8()?;
    let mut result = 0;
    let mut shift = 0;
    loop {
        let group = u64::from(byte & 0x7f);
        if shift + 7 >= bits {
            // This is the last group that can carry any bits of the value:
            // the continuation bit and the bits beyond `bits` must be clear.
            if byte & 0x80 != 0 {
                return Err(too_long(reader));
            }
            if group >> (bits - shift) != 0 {
                return Err(too_large(reader));
            }
            return Ok(result | group << shift);
        }
        result |= group << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        byte = next_group(reader)?;
    }
}

/// Reads a signed LEB128 integer of at most `bits` bits, sign-extended to
/// 64 bits.
pub fn decode_signed(reader: &mut BinaryReader<'_>, bits: u32) -> Result<i64> {
    debug_assert!(bits > 0 && bits <= 64);
    let mut byte = reader.read_u8()?;
    let mut result = 0;
    let mut shift = 0;
    loop {
        let group = i64::from(byte & 0x7f);
        if shift + 7 >= bits {
            if byte & 0x80 != 0 {
                return Err(too_long(reader));
            }
            // The sign bit and the unused high bits of the final group must
            // all be equal.
            let sign_and_unused = ((byte << 1) as i8) >> (bits - shift);
            if sign_and_unused != 0 && sign_and_unused != -1 {
                return Err(too_large(reader));
            }
            let ashift = 64 - bits;
            return Ok(((result | group << shift) << ashift) >> ashift);
        }
        result |= group << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            let ashift = 64 - shift;
            return Ok((result << ashift) >> ashift);
        }
        byte = next_group(reader)?;
    }
}

fn next_group(reader: &mut BinaryReader<'_>) -> Result<u8> {
    reader.read_u8().map_err(|_| {
        Error::at(
            ErrorKind::MalformedVarint("unterminated integer"),
            reader.original_position(),
        )
    })
}

#[cold]
fn too_long(reader: &BinaryReader<'_>) -> Error {
    Error::at(
        ErrorKind::MalformedVarint("integer representation too long"),
        reader.original_position() - 1,
    )
}

#[cold]
fn too_large(reader: &BinaryReader<'_>) -> Error {
    Error::at(
        ErrorKind::MalformedVarint("integer too large"),
        reader.original_position() - 1,
    )
}
