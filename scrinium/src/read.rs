use std::borrow::Cow;
use std::io::{Read, Seek};
use std::iter::FusedIterator;
use std::str::Utf8Error;

use crate::error::CpioError;
use crate::header::{self, CpioHeader, Header};
use crate::stream::ArchiveStream;
use crate::{TRAILER, Variant, magic};

/// Decoded entry: header, pathname and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    header: Header,
    name: Vec<u8>,
    data: Vec<u8>,
    offset: u64,
}

impl Entry {
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Pathname as stored, without its terminating NUL
    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    /// Pathname for display, invalid UTF-8 replaced with U+FFFD
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn name_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.name)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Offset of this entry's magic from the start of the archive
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// `TRAILER!!!` entry marking the end of the archive
    pub fn is_trailer(&self) -> bool {
        self.name == TRAILER.as_bytes()
    }
}

/// Read cpio Archive one entry at a time
///
/// The first entry decides the variant, every later entry must use the same
/// one. The trailer is yielded like any other entry and ends the sequence; so
/// does the first error.
///
/// # Example
/// ```rust, no_run
/// # use std::fs::File;
/// # use std::io::BufReader;
/// # use scrinium::ArchiveReader;
/// let file = BufReader::new(File::open("archive.cpio").unwrap());
/// for entry in ArchiveReader::new(file) {
///     let entry = entry.unwrap();
///     println!("{} ({} bytes)", entry.name(), entry.data().len());
/// }
/// ```
#[derive(Debug)]
pub struct ArchiveReader<R> {
    stream: ArchiveStream<R>,
    variant: Option<Variant>,
    done: bool,
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(reader: R) -> Self {
        Self { stream: ArchiveStream::new(reader), variant: None, done: false }
    }

    /// Variant pinned by the first entry, once it has been read
    pub fn variant(&self) -> Option<Variant> {
        self.variant
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.stream.offset()
    }

    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }

    /// Next entry, `None` once the trailer or an error has been returned
    pub fn next_entry(&mut self) -> Result<Option<Entry>, CpioError> {
        if self.done {
            return Ok(None);
        }

        let entry = self.read_entry();
        self.done = match &entry {
            Ok(entry) => entry.is_trailer(),
            Err(e) => {
                log::debug!("stopping at entry {}: {e}", self.stream.entry());
                true
            }
        };
        entry.map(Some)
    }

    fn read_entry(&mut self) -> Result<Entry, CpioError> {
        let offset = self.stream.offset();
        let variant = match self.variant {
            Some(variant) => {
                magic::expect(&mut self.stream, variant)?;
                variant
            }
            None => {
                let variant = magic::detect(&mut self.stream)?;
                self.variant = Some(variant);
                variant
            }
        };

        let header = header::decode_header(&mut self.stream, variant)?;
        let name = header::decode_name(&mut self.stream, header.namesize(), variant)?;
        log::trace!("reading data, {}", header.filesize());
        let data = header::decode_payload(&mut self.stream, header.filesize(), variant)?;
        log::debug!(
            "entry {}: {:?} at {offset}, {} bytes",
            self.stream.entry(),
            String::from_utf8_lossy(&name),
            data.len()
        );

        self.stream.next_entry();
        Ok(Entry { header, name, data, offset })
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Archive that starts `offset` bytes into `reader`
    pub fn from_reader_with_offset(reader: R, offset: u64) -> Result<Self, CpioError> {
        let stream = ArchiveStream::with_offset(reader, offset)?;
        Ok(Self { stream, variant: None, done: false })
    }
}

impl<R: Read> Iterator for ArchiveReader<R> {
    type Item = Result<Entry, CpioError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

impl<R: Read> FusedIterator for ArchiveReader<R> {}

/// Lazy sequence of the entries in `reader`, trailer included
pub fn entries<R: Read>(reader: R) -> ArchiveReader<R> {
    ArchiveReader::new(reader)
}
