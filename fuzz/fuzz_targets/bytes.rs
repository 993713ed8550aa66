#![no_main]

use libfuzzer_sys::fuzz_target;
use scrinium::{ArchiveReader, ArchiveWriter, Metadata};

fuzz_target!(|data: Vec<u8>| {
    // doesn't crash, and whatever decodes can be written again
    let mut writer = ArchiveWriter::new(std::io::sink(), scrinium::Variant::NewAscii);
    for entry in ArchiveReader::new(std::io::Cursor::new(data)) {
        let Ok(entry) = entry else { break };
        if entry.is_trailer() {
            break;
        }
        let metadata = Metadata { identity: None, ..entry.header().metadata() };
        let _ = writer.push(entry.name_bytes(), &metadata, entry.data().into());
    }
    let _ = writer.finish();
});
