use std::io;

use thiserror::Error;

use crate::Variant;
use crate::hardlink::{FileIdentity, Identity};

/// Failure of a single header field, before it is placed in an archive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("expected {expected} bytes, found {found}")]
    Short { expected: usize, found: usize },

    #[error("{0}")]
    Malformed(&'static str),

    #[error("invalid hex digit {byte:#04x} at index {index}")]
    InvalidHexDigit { byte: u8, index: usize },

    #[error("value {value:#x} exceeds field limit {limit:#x}")]
    Overflow { value: u64, limit: u64 },
}

impl FieldError {
    /// Attach the field name and position, producing the archive level error
    pub(crate) fn at(self, field: &'static str, entry: usize, offset: u64) -> CpioError {
        match self {
            Self::InvalidHexDigit { byte, index } => {
                CpioError::InvalidHexDigit { entry, offset: offset + index as u64, field, byte }
            }
            Self::Overflow { value, limit } => CpioError::FieldOverflow { entry, field, value, limit },
            source => CpioError::MalformedField { entry, offset, field, source },
        }
    }
}

/// Errors generated from library
///
/// Every variant is terminal for the archive being read or written. Offsets are
/// in bytes from the start of the archive, entries are counted from zero.
#[derive(Error, Debug)]
pub enum CpioError {
    #[error("std io error: {0}")]
    StdIo(#[from] io::Error),

    #[error("deku error: {0:?}")]
    Deku(#[from] deku::DekuError),

    #[error("unrecognized magic {observed:02x?} at offset {offset}")]
    UnrecognizedMagic { offset: u64, observed: Vec<u8> },

    #[error("entry {entry}: header truncated at offset {offset}, expected {expected} bytes, found {found}")]
    TruncatedHeader { entry: usize, offset: u64, expected: u64, found: u64 },

    #[error("entry {entry}: name truncated at offset {offset}, expected {expected} bytes, found {found}")]
    TruncatedName { entry: usize, offset: u64, expected: u64, found: u64 },

    #[error("entry {entry}: payload truncated at offset {offset}, expected {expected} bytes, found {found}")]
    TruncatedPayload { entry: usize, offset: u64, expected: u64, found: u64 },

    #[error("entry {entry}: malformed `{field}` at offset {offset}: {source}")]
    MalformedField { entry: usize, offset: u64, field: &'static str, source: FieldError },

    #[error("entry {entry}: invalid hex digit {byte:#04x} in `{field}` at offset {offset}")]
    InvalidHexDigit { entry: usize, offset: u64, field: &'static str, byte: u8 },

    #[error("entry {entry}: `{field}` value {value:#x} exceeds {limit:#x}")]
    FieldOverflow { entry: usize, field: &'static str, value: u64, limit: u64 },

    #[error("entry {entry}: {name:?} is {size} bytes, limit is {limit}")]
    FileTooLarge { entry: usize, name: String, size: u64, limit: u64 },

    #[error("entry {entry}: expected {expected} magic at offset {offset}, found {observed:02x?}")]
    InconsistentVariant { entry: usize, offset: u64, expected: Variant, observed: Vec<u8> },

    #[error("entry {entry}: duplicate pathname {name:?}")]
    DuplicatePathname { entry: usize, name: String },

    #[error("identity {identity:?} requested by {requested:?} is already held by {holder:?}")]
    IdentityCollision { identity: Identity, requested: FileIdentity, holder: Option<FileIdentity> },

    /// An earlier entry failed after part of it was written
    #[error("entry {entry}: archive is incomplete after an earlier write error")]
    Aborted { entry: usize },
}

impl CpioError {
    /// Relabel an error raised without knowing which entry it belongs to
    pub(crate) fn with_entry(mut self, index: usize) -> Self {
        match &mut self {
            Self::TruncatedHeader { entry, .. }
            | Self::TruncatedName { entry, .. }
            | Self::TruncatedPayload { entry, .. }
            | Self::MalformedField { entry, .. }
            | Self::InvalidHexDigit { entry, .. }
            | Self::FieldOverflow { entry, .. }
            | Self::FileTooLarge { entry, .. }
            | Self::InconsistentVariant { entry, .. }
            | Self::DuplicatePathname { entry, .. }
            | Self::Aborted { entry } => *entry = index,
            Self::StdIo(_)
            | Self::Deku(_)
            | Self::UnrecognizedMagic { .. }
            | Self::IdentityCollision { .. } => (),
        }
        self
    }
}
