//! Endian-aware conversion between byte strings and unsigned numbers.
//!
//! Test vectors carry counters and lengths as raw byte strings of 1 to 8 bytes. There are two
//! layers:
//! - **Option layer** (`read_nbr`): returns `None` for slices wider than a `u64`.
//! - **Result layer** (`*_bytes_to_nbr`, `nbr_to_*_bytes`): maps that to
//!   [`TemplateError::NumberTooWide`].
//!
//! An empty slice converts to `0`. Encoding into fewer bytes than the number needs keeps the
//! low-order bytes.

use crate::err::{Result, TemplateError};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

const NBR_BYTES: usize = 8;

fn read_nbr<B: ByteOrder>(bytes: &[u8]) -> Option<u64> {
    match bytes.len() {
        0 => Some(0),
        len if len <= NBR_BYTES => Some(B::read_uint(bytes, len)),
        _ => None,
    }
}

fn write_nbr<B: ByteOrder>(nbr: u64, len: usize) -> Result<Vec<u8>> {
    if len > NBR_BYTES {
        return Err(TemplateError::NumberTooWide { len });
    }

    let mut out = vec![0_u8; len];
    if len > 0 {
        let mask = u64::MAX >> (8 * (NBR_BYTES - len));
        B::write_uint(&mut out, nbr & mask, len);
    }
    Ok(out)
}

/// Interprets up to 8 bytes as a little-endian number.
pub fn le_bytes_to_nbr(bytes: &[u8]) -> Result<u64> {
    read_nbr::<LittleEndian>(bytes).ok_or(TemplateError::NumberTooWide { len: bytes.len() })
}

/// Interprets up to 8 bytes as a big-endian number.
pub fn be_bytes_to_nbr(bytes: &[u8]) -> Result<u64> {
    read_nbr::<BigEndian>(bytes).ok_or(TemplateError::NumberTooWide { len: bytes.len() })
}

/// Encodes the low `len` bytes of `nbr`, least significant first.
pub fn nbr_to_le_bytes(nbr: u64, len: usize) -> Result<Vec<u8>> {
    write_nbr::<LittleEndian>(nbr, len)
}

/// Encodes the low `len` bytes of `nbr`, most significant first.
pub fn nbr_to_be_bytes(nbr: u64, len: usize) -> Result<Vec<u8>> {
    write_nbr::<BigEndian>(nbr, len)
}
