use std::collections::HashSet;
use std::io::{self, Cursor, Read, SeekFrom, Write};

use crate::error::CpioError;
use crate::hardlink::HardlinkTracker;
use crate::header::{self, Header};
use crate::metadata::Metadata;
use crate::stream::ReadSeek;
use crate::{TRAILER, Variant};

/// Payload of an entry being written
pub enum Data<'a> {
    /// Size is taken by seeking to the end, the bytes are copied from the start
    Reader(Box<dyn ReadSeek + 'a>),
    /// Zero sized, for directories and other special files
    Empty,
}

impl Data<'_> {
    fn size(&mut self) -> io::Result<u64> {
        match self {
            Self::Reader(reader) => {
                // stream_len
                let len = reader.seek(SeekFrom::End(0))?;
                reader.seek(SeekFrom::Start(0))?;
                Ok(len)
            }
            Self::Empty => Ok(0),
        }
    }
}

impl<'a> From<&'a [u8]> for Data<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Reader(Box::new(Cursor::new(bytes)))
    }
}

impl From<Vec<u8>> for Data<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Reader(Box::new(Cursor::new(bytes)))
    }
}

/// One entry handed to [`write_all`]
pub struct NewEntry<'a> {
    /// Pathname, without a terminator
    pub name: Vec<u8>,
    pub metadata: Metadata,
    pub data: Data<'a>,
}

impl<'a> NewEntry<'a> {
    pub fn new(name: impl Into<Vec<u8>>, metadata: Metadata, data: impl Into<Data<'a>>) -> Self {
        Self { name: name.into(), metadata, data: data.into() }
    }

    pub fn empty(name: impl Into<Vec<u8>>, metadata: Metadata) -> Self {
        Self { name: name.into(), metadata, data: Data::Empty }
    }
}

/// Write cpio Archive one entry at a time
///
/// Entries go out as soon as they are pushed. [`Self::finish`] appends the
/// `TRAILER!!!` entry; callers never write it themselves. Once an entry fails
/// after its first byte went out, every later call returns
/// [`CpioError::Aborted`].
///
/// # Example
/// Create new cpio archive of Newc format and one file.
///
/// ```rust, no_run
/// # use std::fs::File;
/// # use scrinium::{ArchiveWriter, Metadata, Variant};
/// let file = File::create("archive.cpio").unwrap();
/// let mut writer = ArchiveWriter::new(file, Variant::NewAscii);
///
/// writer.push("a", &Metadata::file(0o644), "a\n".as_bytes().into()).unwrap();
///
/// // write to archive
/// writer.finish().unwrap();
/// ```
pub struct ArchiveWriter<W: Write> {
    writer: W,
    variant: Variant,
    tracker: HardlinkTracker,
    names: HashSet<Vec<u8>>,
    entries: usize,
    offset: u64,
    pad_len: u32,
    failed: bool,
}

impl<W: Write> ArchiveWriter<W> {
    /// Default image padding length, one cpio block
    pub const DEFAULT_PAD_LEN: u32 = 0x200;

    /// Create new `ArchiveWriter` with no entries and image padding length of
    /// `Self::DEFAULT_PAD_LEN`.
    pub fn new(writer: W, variant: Variant) -> Self {
        Self {
            writer,
            variant,
            tracker: HardlinkTracker::new(variant),
            names: HashSet::new(),
            entries: 0,
            offset: 0,
            pad_len: Self::DEFAULT_PAD_LEN,
            failed: false,
        }
    }

    /// Pad the finished image to a multiple of `pad_len`, `0` to disable
    pub fn set_pad_len(&mut self, pad_len: u32) {
        self.pad_len = pad_len;
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Bytes written so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Add data to cpio archive, returning the header it was written with
    ///
    /// Errors found before anything is written leave the archive untouched and
    /// the writer usable.
    pub fn push(
        &mut self,
        name: impl AsRef<[u8]>,
        metadata: &Metadata,
        mut data: Data<'_>,
    ) -> Result<Header, CpioError> {
        let name = name.as_ref();
        let entry = self.entries;
        if self.failed {
            return Err(CpioError::Aborted { entry });
        }
        let display = || String::from_utf8_lossy(name).into_owned();
        if name == TRAILER.as_bytes() || self.names.contains(name) {
            return Err(CpioError::DuplicatePathname { entry, name: display() });
        }

        let filesize = data.size()?;
        if let Some(limit) = self.variant.max_filesize() {
            if filesize > limit {
                return Err(CpioError::FileTooLarge {
                    entry,
                    name: display(),
                    size: filesize,
                    limit,
                });
            }
        }

        let identity = match &metadata.identity {
            Some(key) => self.tracker.assign(key),
            None => self.tracker.assign_unique(),
        }
        .map_err(|e| e.with_entry(entry))?;

        let name_bytes =
            header::encode_name(name, self.variant).map_err(|e| e.with_entry(entry))?;
        let namesize = name.len() as u64 + 1;
        let header = Header::new(self.variant, metadata, identity, namesize, filesize, entry)?;
        let header_bytes = header::encode_header(&header).map_err(|e| e.with_entry(entry))?;

        log::trace!("writing header for {:?}", display());
        if let Err(e) = self.write_entry(entry, &header_bytes, &name_bytes, data, filesize) {
            self.failed = true;
            return Err(e);
        }

        log::debug!("entry {entry}: {:?}, {filesize} bytes, {identity:?}", display());
        self.names.insert(name.to_vec());
        self.entries += 1;
        Ok(header)
    }

    /// Add data read from `reader` to cpio archive
    pub fn push_file<'a>(
        &mut self,
        name: impl AsRef<[u8]>,
        metadata: &Metadata,
        reader: impl ReadSeek + 'a,
    ) -> Result<Header, CpioError> {
        self.push(name, metadata, Data::Reader(Box::new(reader)))
    }

    /// Add Empty File (Directory) to cpio archive
    pub fn push_empty(
        &mut self,
        name: impl AsRef<[u8]>,
        metadata: &Metadata,
    ) -> Result<Header, CpioError> {
        self.push(name, metadata, Data::Empty)
    }

    /// Append the trailer, pad the image and hand back the writer
    pub fn finish(mut self) -> Result<W, CpioError> {
        if self.failed {
            return Err(CpioError::Aborted { entry: self.entries });
        }
        let header = Header::trailer(self.variant);
        let header_bytes = header::encode_header(&header)?;
        let name_bytes = header::encode_name(TRAILER.as_bytes(), self.variant)?;
        self.emit(&header_bytes)?;
        self.emit(&name_bytes)?;

        // pad bytes if required
        if self.pad_len != 0 {
            let pad_len = u64::from(self.pad_len);
            let mut pad = (pad_len - self.offset % pad_len) % pad_len;
            log::trace!("padding image with {pad} bytes");

            // Write 1K at a time
            let arr = [0x00; 1024];
            while pad > 0 {
                let len = pad.min(arr.len() as u64) as usize;
                self.emit(&arr[..len])?;
                pad -= len as u64;
            }
        }

        self.writer.flush()?;
        Ok(self.writer)
    }

    /// Header, name, payload and padding of one entry
    fn write_entry(
        &mut self,
        entry: usize,
        header_bytes: &[u8],
        name_bytes: &[u8],
        mut data: Data<'_>,
        filesize: u64,
    ) -> Result<(), CpioError> {
        self.emit(header_bytes)?;
        self.emit(name_bytes)?;

        log::trace!("writing data, {filesize}");
        let start = self.offset;
        if let Data::Reader(reader) = &mut data {
            self.copy(reader.take(filesize))?;
        }
        let written = self.offset - start;
        if written < filesize {
            return Err(CpioError::TruncatedPayload {
                entry,
                offset: start,
                expected: filesize,
                found: written,
            });
        }

        // add padding
        let pad = header::padding(self.variant, filesize);
        self.emit(&[0; 4][..pad])?;
        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn copy(&mut self, mut reader: impl Read) -> io::Result<()> {
        let mut buf = [0; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.emit(&buf[..n])?;
        }
    }
}

/// Write every entry of `entries` followed by the trailer
pub fn write_all<'a, W, I>(writer: W, variant: Variant, entries: I) -> Result<W, CpioError>
where
    W: Write,
    I: IntoIterator<Item = NewEntry<'a>>,
{
    let mut writer = ArchiveWriter::new(writer, variant);
    for entry in entries {
        writer.push(&entry.name, &entry.metadata, entry.data)?;
    }
    writer.finish()
}
