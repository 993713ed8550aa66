//! Primitive field representations used by cpio headers
//!
//! Old binary headers store raw 16-bit words; 32-bit quantities are split into
//! two halves, most-significant half first, each half in the archive's byte
//! order. New ASCII headers store every field as 8 hexadecimal digits.

use deku::ctx::Endian;
use num_traits::PrimInt;

use crate::error::FieldError;

/// How one header field is laid out on disk
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldEncoding {
    /// One 16-bit word
    Half,
    /// 32-bit value as two 16-bit words, most-significant first
    SplitWord,
    /// 8 ASCII hex digits
    Hex,
}

impl FieldEncoding {
    /// Width on disk, in bytes
    pub const fn width(self) -> usize {
        match self {
            Self::Half => 2,
            Self::SplitWord => 4,
            Self::Hex => 8,
        }
    }

    /// Largest value the field can hold
    pub const fn limit(self) -> u64 {
        match self {
            Self::Half => u16::MAX as u64,
            Self::SplitWord | Self::Hex => u32::MAX as u64,
        }
    }
}

/// Entry of a variant's ordered field table
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub encoding: FieldEncoding,
}

impl FieldSpec {
    pub const fn new(name: &'static str, encoding: FieldEncoding) -> Self {
        Self { name, encoding }
    }
}

/// Total width in bytes of a field table
pub const fn table_width(fields: &[FieldSpec]) -> usize {
    let mut width = 0;
    let mut i = 0;
    while i < fields.len() {
        width += fields[i].encoding.width();
        i += 1;
    }
    width
}

fn exact<const N: usize>(bytes: &[u8]) -> Result<[u8; N], FieldError> {
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or(FieldError::Short { expected: N, found: bytes.len() })
}

pub fn decode_half(bytes: &[u8], endian: Endian) -> Result<u16, FieldError> {
    let bytes = exact::<2>(bytes)?;
    Ok(match endian {
        Endian::Little => u16::from_le_bytes(bytes),
        Endian::Big => u16::from_be_bytes(bytes),
    })
}

pub fn encode_half(value: u32, endian: Endian) -> Result<[u8; 2], FieldError> {
    let value: u16 = narrow(value.into())?;
    Ok(match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    })
}

/// Reassemble a 32-bit value from two 16-bit halves, most-significant first
pub fn decode_split_word(bytes: &[u8], endian: Endian) -> Result<u32, FieldError> {
    let bytes = exact::<4>(bytes)?;
    let high = decode_half(&bytes[..2], endian)?;
    let low = decode_half(&bytes[2..], endian)?;
    Ok((u32::from(high) << 16) | u32::from(low))
}

/// Inverse of [`decode_split_word`]
pub fn encode_split_word(value: u32, endian: Endian) -> [u8; 4] {
    let (high, low) = ((value >> 16) as u16, value as u16);
    let (high, low) = match endian {
        Endian::Little => (high.to_le_bytes(), low.to_le_bytes()),
        Endian::Big => (high.to_be_bytes(), low.to_be_bytes()),
    };
    [high[0], high[1], low[0], low[1]]
}

// [30, 30, 38, 42, 32, 38, 37, 34]
// "008B2874"
pub fn decode_hex_field(bytes: &[u8]) -> Result<u32, FieldError> {
    let bytes = exact::<8>(bytes)?;
    let mut value = 0_u32;
    for (index, byte) in bytes.into_iter().enumerate() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return Err(FieldError::InvalidHexDigit { byte, index }),
        };
        value = (value << 4) | u32::from(digit);
    }
    Ok(value)
}

/// Zero padded, uppercase, 8 digits
pub fn encode_hex_field(value: u64) -> Result<[u8; 8], FieldError> {
    let value: u32 = narrow(value)?;
    let mut out = [0; 8];
    for (i, b) in value.to_be_bytes().into_iter().enumerate() {
        let left = (b & 0xf0) >> 4;
        let right = b & 0x0f;
        out[i * 2] = if left > 9 { left + 0x37 } else { left + 0x30 };
        out[i * 2 + 1] = if right > 9 { right + 0x37 } else { right + 0x30 };
    }
    Ok(out)
}

/// Narrow `value` into a smaller integer, failing if it does not fit
pub fn narrow<T: PrimInt>(value: u64) -> Result<T, FieldError> {
    <T as num_traits::NumCast>::from(value).ok_or_else(|| FieldError::Overflow {
        value,
        limit: T::max_value().to_u64().unwrap_or(u64::MAX),
    })
}
