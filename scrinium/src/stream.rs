use std::io::{self, Read, Seek, SeekFrom};

/// `Read` + `Seek`
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Byte stream positioned inside an archive
///
/// Counts every byte consumed so errors can name the offset they happened at,
/// and remembers which entry is being decoded.
#[derive(Debug)]
pub struct ArchiveStream<R> {
    io: R,
    /// Bytes consumed since the start of the archive
    offset: u64,
    /// Index of the entry currently being decoded
    entry: usize,
}

impl<R: Read> ArchiveStream<R> {
    pub fn new(io: R) -> Self {
        Self { io, offset: 0, entry: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn entry(&self) -> usize {
        self.entry
    }

    pub(crate) fn next_entry(&mut self) {
        self.entry += 1;
    }

    pub fn into_inner(self) -> R {
        self.io
    }

    /// Read up to `len` bytes, stopping early only at end of stream
    pub(crate) fn read_up_to(&mut self, len: u64) -> io::Result<Vec<u8>> {
        let mut buf = vec![];
        self.by_ref().take(len).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Consume `len` padding bytes, returning how many were present
    pub(crate) fn skip_padding(&mut self, len: usize) -> io::Result<usize> {
        let pad = self.read_up_to(len as u64)?;
        if pad.iter().any(|b| *b != 0) {
            log::warn!("non-zero padding {:02x?} at offset {}", pad, self.offset);
        }
        Ok(pad.len())
    }
}

impl<R: Read + Seek> ArchiveStream<R> {
    /// Archive embedded at `offset` inside a larger stream
    ///
    /// Offsets reported afterwards are relative to the start of the archive.
    pub fn with_offset(mut io: R, offset: u64) -> io::Result<Self> {
        io.seek(SeekFrom::Start(offset))?;
        Ok(Self::new(io))
    }
}

impl<R: Read> Read for ArchiveStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.io.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_counts_bytes() {
        let mut stream = ArchiveStream::new(Cursor::new(vec![1, 2, 3, 4, 5]));
        assert_eq!(stream.read_up_to(2).unwrap(), [1, 2]);
        assert_eq!(stream.offset(), 2);
        assert_eq!(stream.read_up_to(10).unwrap(), [3, 4, 5]);
        assert_eq!(stream.offset(), 5);
    }

    #[test]
    fn test_with_offset() {
        let mut stream = ArchiveStream::with_offset(Cursor::new(vec![9, 9, 1, 2]), 2).unwrap();
        assert_eq!(stream.offset(), 0);
        assert_eq!(stream.read_up_to(2).unwrap(), [1, 2]);
        assert_eq!(stream.offset(), 2);
    }
}
