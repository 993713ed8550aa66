/*!
Reader and Writer library for old binary and new ASCII (newc) cpio archives

### Read
```rust, no_run
# use std::fs::File;
# use std::io::BufReader;
# use scrinium::{ArchiveReader, CpioHeader};
let file = BufReader::new(File::open("archive.cpio").unwrap());
let mut archive = ArchiveReader::new(file);

// list every entry, the trailer is the last one
while let Some(entry) = archive.next_entry().unwrap() {
    println!("{:o} {:>8} {}", entry.header().mode(), entry.data().len(), entry.name());
}
```

### Write
```rust, no_run
# use std::fs::File;
# use scrinium::{ArchiveWriter, FileIdentity, Metadata, Variant};
let file = File::create("archive.cpio").unwrap();
let mut writer = ArchiveWriter::new(file, Variant::NewAscii);

// A, and B hardlinked to it
let link = FileIdentity::Source { dev: 2049, ino: 131 };
let a = Metadata::file(0o644).with_identity(link);
writer.push("a", &a, "a\n".as_bytes().into()).unwrap();
writer.push("b", &a, "a\n".as_bytes().into()).unwrap();
writer.push_empty("dir", &Metadata::directory(0o755)).unwrap();

// write trailer
writer.finish().unwrap();
```
*/

pub mod error;
pub use error::{CpioError, FieldError};
pub mod field;
pub use field::{FieldEncoding, FieldSpec};
pub mod hardlink;
pub use hardlink::{Device, FileIdentity, HardlinkTracker, Identity};
pub mod header;
pub use header::{CpioHeader, Header, NewAsciiHeader, OldBinaryHeader};
pub mod magic;
pub use magic::Variant;
mod metadata;
pub use metadata::Metadata;
pub mod mode;
pub use mode::{FileType, mode_string};
mod read;
pub use read::{ArchiveReader, Entry, entries};
mod stream;
pub use stream::{ArchiveStream, ReadSeek};
mod write;
pub use write::{ArchiveWriter, Data, NewEntry, write_all};

pub use deku::ctx::Endian;

/// Pathname of the entry that ends every archive
pub const TRAILER: &str = "TRAILER!!!";
