//! Header layouts and the codec that walks them
//!
//! Each variant owns an ordered field table. Decoding reads the fixed size
//! remainder of a header (everything after the magic) and walks the table;
//! encoding walks the same table in the same order.

use std::ffi::{CStr, CString};
use std::io::{Cursor, Read};

use deku::ctx::Endian;
use deku::prelude::*;

use crate::error::{CpioError, FieldError};
use crate::field::{self, FieldSpec, narrow};
use crate::hardlink::{Device, FileIdentity, Identity};
use crate::metadata::Metadata;
use crate::stream::ArchiveStream;
use crate::{TRAILER, Variant};

use crate::field::FieldEncoding::{Half, Hex, SplitWord};

/// Old binary layout after the magic
pub const OLD_BINARY_FIELDS: [FieldSpec; 10] = [
    FieldSpec::new("dev", Half),
    FieldSpec::new("ino", Half),
    FieldSpec::new("mode", Half),
    FieldSpec::new("uid", Half),
    FieldSpec::new("gid", Half),
    FieldSpec::new("nlink", Half),
    FieldSpec::new("rdev", Half),
    FieldSpec::new("mtime", SplitWord),
    FieldSpec::new("namesize", Half),
    FieldSpec::new("filesize", SplitWord),
];

/// New ASCII layout after the magic
pub const NEW_ASCII_FIELDS: [FieldSpec; 13] = [
    FieldSpec::new("ino", Hex),
    FieldSpec::new("mode", Hex),
    FieldSpec::new("uid", Hex),
    FieldSpec::new("gid", Hex),
    FieldSpec::new("nlink", Hex),
    FieldSpec::new("mtime", Hex),
    FieldSpec::new("filesize", Hex),
    FieldSpec::new("devmajor", Hex),
    FieldSpec::new("devminor", Hex),
    FieldSpec::new("rdevmajor", Hex),
    FieldSpec::new("rdevminor", Hex),
    FieldSpec::new("namesize", Hex),
    FieldSpec::new("check", Hex),
];

pub const OLD_BINARY_LEN: usize = field::table_width(&OLD_BINARY_FIELDS);
pub const NEW_ASCII_LEN: usize = field::table_width(&NEW_ASCII_FIELDS);

/// Common information between types of cpio headers
pub trait CpioHeader {
    /// Field table, in on-disk order after the magic
    fn field_table(&self) -> &'static [FieldSpec];
    /// Field values, in [`Self::field_table`] order
    fn values(&self) -> Vec<u32>;
    fn variant(&self) -> Variant;
    fn ino(&self) -> u32;
    fn mode(&self) -> u32;
    fn uid(&self) -> u32;
    fn gid(&self) -> u32;
    fn nlink(&self) -> u32;
    fn mtime(&self) -> u32;
    fn filesize(&self) -> u32;
    /// Includes the terminating NUL
    fn namesize(&self) -> u32;
    /// Device holding the file
    fn device(&self) -> Device;
    /// Device described by a special file
    fn rdevice(&self) -> Device;
    fn check(&self) -> Option<u32>;

    /// Archive identity, equal for hardlinked entries
    fn identity(&self) -> Identity {
        Identity::new(self.device(), self.ino())
    }
}

/// Original cpio header, fields are 16-bit words in either byte order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OldBinaryHeader {
    pub endian: Endian,
    pub dev: u16,
    pub ino: u16,
    pub mode: u16,
    pub uid: u16,
    pub gid: u16,
    pub nlink: u16,
    pub rdev: u16,
    pub mtime: u32,
    pub namesize: u16,
    pub filesize: u32,
}

impl OldBinaryHeader {
    fn from_values(
        values: [u32; 10],
        endian: Endian,
        entry: usize,
        start: u64,
    ) -> Result<Self, CpioError> {
        let [dev, ino, mode, uid, gid, nlink, rdev, mtime, namesize, filesize] = values;
        let half = |field: &'static str, value: u32| -> Result<u16, CpioError> {
            narrow(value.into()).map_err(|e: FieldError| e.at(field, entry, start))
        };
        Ok(Self {
            endian,
            dev: half("dev", dev)?,
            ino: half("ino", ino)?,
            mode: half("mode", mode)?,
            uid: half("uid", uid)?,
            gid: half("gid", gid)?,
            nlink: half("nlink", nlink)?,
            rdev: half("rdev", rdev)?,
            mtime,
            namesize: half("namesize", namesize)?,
            filesize,
        })
    }
}

impl CpioHeader for OldBinaryHeader {
    fn field_table(&self) -> &'static [FieldSpec] {
        &OLD_BINARY_FIELDS
    }

    fn values(&self) -> Vec<u32> {
        vec![
            self.dev.into(),
            self.ino.into(),
            self.mode.into(),
            self.uid.into(),
            self.gid.into(),
            self.nlink.into(),
            self.rdev.into(),
            self.mtime,
            self.namesize.into(),
            self.filesize,
        ]
    }

    fn variant(&self) -> Variant {
        Variant::OldBinary(self.endian)
    }

    fn ino(&self) -> u32 {
        self.ino.into()
    }

    fn mode(&self) -> u32 {
        self.mode.into()
    }

    fn uid(&self) -> u32 {
        self.uid.into()
    }

    fn gid(&self) -> u32 {
        self.gid.into()
    }

    fn nlink(&self) -> u32 {
        self.nlink.into()
    }

    fn mtime(&self) -> u32 {
        self.mtime
    }

    fn filesize(&self) -> u32 {
        self.filesize
    }

    fn namesize(&self) -> u32 {
        self.namesize.into()
    }

    fn device(&self) -> Device {
        Device::from_word(self.dev)
    }

    fn rdevice(&self) -> Device {
        Device::from_word(self.rdev)
    }

    fn check(&self) -> Option<u32> {
        None
    }
}

/// Improved cpio Header, also known as "SVR4" or "New ASCII"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAsciiHeader {
    pub ino: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub filesize: u32,
    pub devmajor: u32,
    pub devminor: u32,
    pub rdevmajor: u32,
    pub rdevminor: u32,
    pub namesize: u32,
    /// Only meaningful for the crc variant, kept verbatim
    pub check: u32,
}

impl NewAsciiHeader {
    fn from_values(values: [u32; 13]) -> Self {
        let [
            ino,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            filesize,
            devmajor,
            devminor,
            rdevmajor,
            rdevminor,
            namesize,
            check,
        ] = values;
        Self {
            ino,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            filesize,
            devmajor,
            devminor,
            rdevmajor,
            rdevminor,
            namesize,
            check,
        }
    }
}

impl CpioHeader for NewAsciiHeader {
    fn field_table(&self) -> &'static [FieldSpec] {
        &NEW_ASCII_FIELDS
    }

    fn values(&self) -> Vec<u32> {
        vec![
            self.ino,
            self.mode,
            self.uid,
            self.gid,
            self.nlink,
            self.mtime,
            self.filesize,
            self.devmajor,
            self.devminor,
            self.rdevmajor,
            self.rdevminor,
            self.namesize,
            self.check,
        ]
    }

    fn variant(&self) -> Variant {
        Variant::NewAscii
    }

    fn ino(&self) -> u32 {
        self.ino
    }

    fn mode(&self) -> u32 {
        self.mode
    }

    fn uid(&self) -> u32 {
        self.uid
    }

    fn gid(&self) -> u32 {
        self.gid
    }

    fn nlink(&self) -> u32 {
        self.nlink
    }

    fn mtime(&self) -> u32 {
        self.mtime
    }

    fn filesize(&self) -> u32 {
        self.filesize
    }

    fn namesize(&self) -> u32 {
        self.namesize
    }

    fn device(&self) -> Device {
        Device::new(self.devmajor, self.devminor)
    }

    fn rdevice(&self) -> Device {
        Device::new(self.rdevmajor, self.rdevminor)
    }

    fn check(&self) -> Option<u32> {
        Some(self.check)
    }
}

/// Header of either variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    OldBinary(OldBinaryHeader),
    NewAscii(NewAsciiHeader),
}

impl Header {
    /// Header for a new entry, every field checked against the variant's widths
    ///
    /// `entry` only labels errors.
    pub fn new(
        variant: Variant,
        metadata: &Metadata,
        identity: Identity,
        namesize: u64,
        filesize: u64,
        entry: usize,
    ) -> Result<Self, CpioError> {
        let header = match variant {
            Variant::OldBinary(endian) => {
                let half = |field: &'static str, value: u32| -> Result<u16, CpioError> {
                    narrow(value.into()).map_err(|e: FieldError| e.at(field, entry, 0))
                };
                Header::OldBinary(OldBinaryHeader {
                    endian,
                    dev: identity.device.to_word().map_err(|e| e.at("dev", entry, 0))?,
                    ino: half("ino", identity.inode)?,
                    mode: half("mode", metadata.mode)?,
                    uid: half("uid", metadata.uid)?,
                    gid: half("gid", metadata.gid)?,
                    nlink: half("nlink", metadata.nlink)?,
                    rdev: metadata.rdev.to_word().map_err(|e| e.at("rdev", entry, 0))?,
                    mtime: metadata.mtime,
                    namesize: narrow(namesize).map_err(|e| e.at("namesize", entry, 0))?,
                    filesize: narrow(filesize).map_err(|e| e.at("filesize", entry, 0))?,
                })
            }
            Variant::NewAscii => Header::NewAscii(NewAsciiHeader {
                ino: identity.inode,
                mode: metadata.mode,
                uid: metadata.uid,
                gid: metadata.gid,
                nlink: metadata.nlink,
                mtime: metadata.mtime,
                filesize: narrow(filesize).map_err(|e| e.at("filesize", entry, 0))?,
                devmajor: identity.device.major,
                devminor: identity.device.minor,
                rdevmajor: metadata.rdev.major,
                rdevminor: metadata.rdev.minor,
                namesize: narrow(namesize).map_err(|e| e.at("namesize", entry, 0))?,
                check: 0,
            }),
        };
        Ok(header)
    }

    /// Header of the `TRAILER!!!` entry
    pub fn trailer(variant: Variant) -> Self {
        let namesize = TRAILER.len() as u32 + 1;
        match variant {
            Variant::OldBinary(endian) => Header::OldBinary(OldBinaryHeader {
                endian,
                dev: 0,
                ino: 0,
                mode: 0,
                uid: 0,
                gid: 0,
                nlink: 1,
                rdev: 0,
                mtime: 0,
                namesize: namesize as u16,
                filesize: 0,
            }),
            Variant::NewAscii => {
                Header::NewAscii(NewAsciiHeader { nlink: 1, namesize, ..NewAsciiHeader::default() })
            }
        }
    }

    fn inner(&self) -> &dyn CpioHeader {
        match self {
            Header::OldBinary(h) => h,
            Header::NewAscii(h) => h,
        }
    }

    /// Every field by name, in on-disk order
    pub fn fields(&self) -> Vec<(&'static str, u32)> {
        self.field_table().iter().map(|f| f.name).zip(self.values()).collect()
    }

    /// Attributes to write this header again, identity included
    pub fn metadata(&self) -> Metadata {
        Metadata {
            mode: self.mode(),
            uid: self.uid(),
            gid: self.gid(),
            nlink: self.nlink(),
            mtime: self.mtime(),
            rdev: self.rdevice(),
            identity: Some(FileIdentity::Explicit(self.identity())),
        }
    }
}

impl CpioHeader for Header {
    fn field_table(&self) -> &'static [FieldSpec] {
        self.inner().field_table()
    }

    fn values(&self) -> Vec<u32> {
        self.inner().values()
    }

    fn variant(&self) -> Variant {
        self.inner().variant()
    }

    fn ino(&self) -> u32 {
        self.inner().ino()
    }

    fn mode(&self) -> u32 {
        self.inner().mode()
    }

    fn uid(&self) -> u32 {
        self.inner().uid()
    }

    fn gid(&self) -> u32 {
        self.inner().gid()
    }

    fn nlink(&self) -> u32 {
        self.inner().nlink()
    }

    fn mtime(&self) -> u32 {
        self.inner().mtime()
    }

    fn filesize(&self) -> u32 {
        self.inner().filesize()
    }

    fn namesize(&self) -> u32 {
        self.inner().namesize()
    }

    fn device(&self) -> Device {
        self.inner().device()
    }

    fn rdevice(&self) -> Device {
        self.inner().rdevice()
    }

    fn check(&self) -> Option<u32> {
        self.inner().check()
    }
}

/// pad out to a multiple of the variant's alignment
pub fn padding(variant: Variant, len: u64) -> usize {
    let align = variant.alignment() as u64;
    ((align - len % align) % align) as usize
}

/// Decode the header that follows an already consumed magic
pub fn decode_header<R: Read>(
    stream: &mut ArchiveStream<R>,
    variant: Variant,
) -> Result<Header, CpioError> {
    let entry = stream.entry();
    let start = stream.offset();
    let len = variant.fields_len();
    let bytes = stream.read_up_to(len as u64)?;
    if bytes.len() < len {
        return Err(CpioError::TruncatedHeader {
            entry,
            offset: start,
            expected: len as u64,
            found: bytes.len() as u64,
        });
    }

    let header = match variant {
        Variant::OldBinary(endian) => {
            let values = decode_values(&OLD_BINARY_FIELDS, &bytes, endian, entry, start)?;
            Header::OldBinary(OldBinaryHeader::from_values(values, endian, entry, start)?)
        }
        Variant::NewAscii => {
            let values = decode_values(&NEW_ASCII_FIELDS, &bytes, Endian::Big, entry, start)?;
            Header::NewAscii(NewAsciiHeader::from_values(values))
        }
    };
    log::trace!("entry {entry}: {header:x?}");
    Ok(header)
}

fn decode_values<const N: usize>(
    fields: &[FieldSpec; N],
    bytes: &[u8],
    endian: Endian,
    entry: usize,
    start: u64,
) -> Result<[u32; N], CpioError> {
    let mut cursor = Cursor::new(bytes);
    let mut reader = Reader::new(&mut cursor);
    let mut values = [0; N];
    let mut at = start;
    for (slot, spec) in values.iter_mut().zip(fields) {
        *slot = match spec.encoding {
            Half => {
                let raw = <[u8; 2]>::from_reader_with_ctx(&mut reader, ())?;
                field::decode_half(&raw, endian).map(u32::from)
            }
            SplitWord => {
                let raw = <[u8; 4]>::from_reader_with_ctx(&mut reader, ())?;
                field::decode_split_word(&raw, endian)
            }
            Hex => {
                let raw = <[u8; 8]>::from_reader_with_ctx(&mut reader, ())?;
                field::decode_hex_field(&raw)
            }
        }
        .map_err(|e| e.at(spec.name, entry, at))?;
        at += spec.encoding.width() as u64;
    }
    Ok(values)
}

/// Magic and fields of `header`
pub fn encode_header(header: &Header) -> Result<Vec<u8>, CpioError> {
    let variant = header.variant();
    let endian = variant.endian().unwrap_or(Endian::Big);

    let mut out = Cursor::new(Vec::with_capacity(variant.header_len()));
    let mut writer = Writer::new(&mut out);
    writer.write_bytes(&variant.magic())?;
    for (spec, value) in header.field_table().iter().zip(header.values()) {
        match spec.encoding {
            Half => {
                let bytes = field::encode_half(value, endian).map_err(|e| e.at(spec.name, 0, 0))?;
                writer.write_bytes(&bytes)?;
            }
            SplitWord => writer.write_bytes(&field::encode_split_word(value, endian))?,
            Hex => {
                let bytes =
                    field::encode_hex_field(value.into()).map_err(|e| e.at(spec.name, 0, 0))?;
                writer.write_bytes(&bytes)?;
            }
        }
    }
    writer.finalize()?;
    drop(writer);

    Ok(out.into_inner())
}

/// Read a `namesize` byte name and the padding after it
///
/// The name is returned without its terminator, byte for byte as stored.
pub fn decode_name<R: Read>(
    stream: &mut ArchiveStream<R>,
    namesize: u32,
    variant: Variant,
) -> Result<Vec<u8>, CpioError> {
    let entry = stream.entry();
    let offset = stream.offset();
    let malformed = |reason| CpioError::MalformedField {
        entry,
        offset,
        field: "name",
        source: FieldError::Malformed(reason),
    };
    if namesize == 0 {
        return Err(malformed("name size does not include a terminator"));
    }

    let bytes = stream.read_up_to(namesize.into())?;
    let pad = padding(variant, (variant.header_len() as u64) + u64::from(namesize));
    let truncated = |found: usize| CpioError::TruncatedName {
        entry,
        offset,
        expected: u64::from(namesize) + pad as u64,
        found: found as u64,
    };
    if bytes.len() < namesize as usize {
        return Err(truncated(bytes.len()));
    }
    let name = CStr::from_bytes_with_nul(&bytes)
        .map_err(|_| malformed("name is not terminated by its only NUL"))?
        .to_bytes()
        .to_vec();

    let found = stream.skip_padding(pad)?;
    if found < pad {
        return Err(truncated(bytes.len() + found));
    }
    Ok(name)
}

/// Name, terminator and padding as written after a header
pub fn encode_name(name: &[u8], variant: Variant) -> Result<Vec<u8>, CpioError> {
    let mut bytes = CString::new(name)
        .map_err(|_| CpioError::MalformedField {
            entry: 0,
            offset: 0,
            field: "name",
            source: FieldError::Malformed("name contains a NUL"),
        })?
        .into_bytes_with_nul();
    let pad = padding(variant, (variant.header_len() + bytes.len()) as u64);
    bytes.resize(bytes.len() + pad, 0);
    Ok(bytes)
}

/// Read exactly `filesize` bytes and the padding after them
pub fn decode_payload<R: Read>(
    stream: &mut ArchiveStream<R>,
    filesize: u32,
    variant: Variant,
) -> Result<Vec<u8>, CpioError> {
    let entry = stream.entry();
    let offset = stream.offset();
    let pad = padding(variant, filesize.into());
    let truncated = |found: usize| CpioError::TruncatedPayload {
        entry,
        offset,
        expected: u64::from(filesize) + pad as u64,
        found: found as u64,
    };

    let data = stream.read_up_to(filesize.into())?;
    if data.len() < filesize as usize {
        return Err(truncated(data.len()));
    }
    let found = stream.skip_padding(pad)?;
    if found < pad {
        return Err(truncated(data.len() + found));
    }
    Ok(data)
}
