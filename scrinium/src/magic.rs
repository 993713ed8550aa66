use std::fmt;
use std::io::Read;

use deku::ctx::Endian;

use crate::error::CpioError;
use crate::stream::ArchiveStream;

/// Old binary magic, `070707` octal stored as a raw 16-bit word
pub const OLD_BINARY_MAGIC: u16 = 0o070707;
/// New ASCII magic
pub const NEW_ASCII_MAGIC: [u8; 6] = *b"070701";

/// Header layout variant of an archive
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Old binary format, in the byte order it was written with
    OldBinary(Endian),
    /// New ASCII format, also known as "newc" or "SVR4"
    NewAscii,
}

impl Variant {
    /// Old binary format in the byte order of this machine
    pub fn old_binary() -> Self {
        if cfg!(target_endian = "little") {
            Self::OldBinary(Endian::Little)
        } else {
            Self::OldBinary(Endian::Big)
        }
    }

    /// Magic bytes, as they appear on disk
    pub fn magic(&self) -> Vec<u8> {
        match self {
            Self::OldBinary(Endian::Little) => OLD_BINARY_MAGIC.to_le_bytes().to_vec(),
            Self::OldBinary(Endian::Big) => OLD_BINARY_MAGIC.to_be_bytes().to_vec(),
            Self::NewAscii => NEW_ASCII_MAGIC.to_vec(),
        }
    }

    pub fn magic_len(&self) -> usize {
        match self {
            Self::OldBinary(_) => 2,
            Self::NewAscii => NEW_ASCII_MAGIC.len(),
        }
    }

    /// Length of a complete header, magic included
    pub fn header_len(&self) -> usize {
        self.magic_len() + self.fields_len()
    }

    /// Length of the header after the magic
    pub fn fields_len(&self) -> usize {
        match self {
            Self::OldBinary(_) => crate::header::OLD_BINARY_LEN,
            Self::NewAscii => crate::header::NEW_ASCII_LEN,
        }
    }

    /// Names and payloads end on a multiple of this, relative to their header
    pub fn alignment(&self) -> usize {
        match self {
            Self::OldBinary(_) => 1,
            Self::NewAscii => 4,
        }
    }

    /// Ceiling on payload size imposed by the split 16-bit halves
    ///
    /// New ASCII has none beyond the width of its `filesize` field.
    pub fn max_filesize(&self) -> Option<u64> {
        match self {
            Self::OldBinary(_) => Some(u32::MAX.into()),
            Self::NewAscii => None,
        }
    }

    /// Byte order of binary fields, if the variant has any
    pub fn endian(&self) -> Option<Endian> {
        match self {
            Self::OldBinary(endian) => Some(*endian),
            Self::NewAscii => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OldBinary(Endian::Little) => write!(f, "old binary (little endian)"),
            Self::OldBinary(Endian::Big) => write!(f, "old binary (big endian)"),
            Self::NewAscii => write!(f, "new ascii"),
        }
    }
}

/// Classify the archive from its first magic
///
/// Consumes the 2 byte old binary magic, or all 6 bytes when the stream is
/// not old binary.
pub fn detect<R: Read>(stream: &mut ArchiveStream<R>) -> Result<Variant, CpioError> {
    let start = stream.offset();
    let entry = stream.entry();
    let mut observed = stream.read_up_to(2)?;
    if observed.len() < 2 {
        return Err(truncated(entry, start, 2, observed.len()));
    }

    for endian in [Endian::Little, Endian::Big] {
        let variant = Variant::OldBinary(endian);
        if observed == variant.magic() {
            log::debug!("detected {variant}");
            return Ok(variant);
        }
    }

    observed.extend(stream.read_up_to(4)?);
    if observed.len() < NEW_ASCII_MAGIC.len() {
        return Err(truncated(entry, start, NEW_ASCII_MAGIC.len(), observed.len()));
    }
    if observed == NEW_ASCII_MAGIC {
        log::debug!("detected {}", Variant::NewAscii);
        return Ok(Variant::NewAscii);
    }

    Err(CpioError::UnrecognizedMagic { offset: start, observed })
}

/// Check the magic of a later entry against the variant pinned by [`detect`]
pub fn expect<R: Read>(stream: &mut ArchiveStream<R>, variant: Variant) -> Result<(), CpioError> {
    let offset = stream.offset();
    let entry = stream.entry();
    let observed = stream.read_up_to(variant.magic_len() as u64)?;
    if observed.len() < variant.magic_len() {
        return Err(truncated(entry, offset, variant.magic_len(), observed.len()));
    }
    if observed != variant.magic() {
        return Err(CpioError::InconsistentVariant { entry, offset, expected: variant, observed });
    }
    Ok(())
}

fn truncated(entry: usize, offset: u64, expected: usize, found: usize) -> CpioError {
    CpioError::TruncatedHeader { entry, offset, expected: expected as u64, found: found as u64 }
}
