#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use scrinium::Endian;
use test_assets_ureq::{TestAssetDef, dl_test_files};

/// Source of archive bytes for tests
pub trait FixtureProvider {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>>;
}

pub const A: &[u8] = b"a\n";
pub const B: &[u8] = b"bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\n";
pub const C: &[u8] = b"cccccccccccccccccccccccccccccc\ncccc\nc\nc\nc\nc\nc\n";

/// Archive entry as laid out by hand, independent of the library's encoder
pub struct Raw<'a> {
    pub ino: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub name: &'a [u8],
    pub data: &'a [u8],
}

impl<'a> Raw<'a> {
    pub fn new(ino: u32, mode: u32, name: &'a str, data: &'a [u8]) -> Self {
        let name = name.as_bytes();
        Self { ino, mode, uid: 1000, gid: 100, nlink: 1, mtime: 0x6720_f1a5, name, data }
    }

    pub fn trailer() -> Self {
        Self { ino: 0, mode: 0, uid: 0, gid: 0, nlink: 1, mtime: 0, name: b"TRAILER!!!", data: &[] }
    }
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// newc entry as `cpio -o -H newc` lays it out
pub fn newc(out: &mut Vec<u8>, raw: &Raw) {
    out.extend_from_slice(b"070701");
    let (devmajor, devminor) = if raw.ino == 0 { (0, 0) } else { (8, 1) };
    let fields = [
        raw.ino,
        raw.mode,
        raw.uid,
        raw.gid,
        raw.nlink,
        raw.mtime,
        raw.data.len() as u32,
        devmajor,
        devminor,
        0,
        0,
        raw.name.len() as u32 + 1,
        0,
    ];
    for field in fields {
        out.extend_from_slice(format!("{field:08X}").as_bytes());
    }
    out.extend_from_slice(raw.name);
    out.push(0);
    pad4(out);
    out.extend_from_slice(raw.data);
    pad4(out);
}

/// Old binary entry, no padding between fields
pub fn old(out: &mut Vec<u8>, endian: Endian, raw: &Raw) {
    let half = |out: &mut Vec<u8>, v: u16| match endian {
        Endian::Little => out.extend_from_slice(&v.to_le_bytes()),
        Endian::Big => out.extend_from_slice(&v.to_be_bytes()),
    };
    let dev = if raw.ino == 0 { 0 } else { 0x0801 };
    let filesize = raw.data.len() as u32;
    half(out, 0o070707);
    let (uid, gid) = (raw.uid as u16, raw.gid as u16);
    for v in [dev, raw.ino as u16, raw.mode as u16, uid, gid, raw.nlink as u16, 0] {
        half(out, v);
    }
    half(out, (raw.mtime >> 16) as u16);
    half(out, raw.mtime as u16);
    half(out, raw.name.len() as u16 + 1);
    half(out, (filesize >> 16) as u16);
    half(out, filesize as u16);
    out.extend_from_slice(raw.name);
    out.push(0);
    out.extend_from_slice(raw.data);
}

pub fn pad_block(out: &mut Vec<u8>) {
    while out.len() % 0x200 != 0 {
        out.push(0);
    }
}

pub fn simple_entries() -> Vec<Raw<'static>> {
    vec![
        Raw::new(0x0a, 0o040755, ".", &[]),
        Raw { nlink: 2, ..Raw::new(0x0b, 0o040755, "cpio-in", &[]) },
        Raw::new(0x0c, 0o100644, "cpio-in/a", A),
        Raw::new(0x0d, 0o100644, "cpio-in/b", B),
        Raw::new(0x0e, 0o100644, "cpio-in/c", C),
        Raw::trailer(),
    ]
}

/// Archives assembled in memory
pub struct InMemory {
    fixtures: HashMap<&'static str, Vec<u8>>,
}

impl InMemory {
    pub fn new() -> Self {
        let mut fixtures = HashMap::new();

        let mut bytes = vec![];
        for raw in simple_entries() {
            newc(&mut bytes, &raw);
        }
        pad_block(&mut bytes);
        fixtures.insert("newc.cpio", bytes);

        for (name, endian) in [("bin-le.cpio", Endian::Little), ("bin-be.cpio", Endian::Big)] {
            let mut bytes = vec![];
            for raw in simple_entries() {
                old(&mut bytes, endian, &raw);
            }
            pad_block(&mut bytes);
            fixtures.insert(name, bytes);
        }

        Self { fixtures }
    }
}

impl FixtureProvider for InMemory {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        self.fixtures
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }
}

/// Archives made by GNU cpio, fetched once and checked against their hash
pub struct Download {
    dir: &'static str,
    /// filename, sha256, url
    assets: Vec<(&'static str, &'static str, String)>,
}

impl Download {
    pub fn new() -> Self {
        const FILE_NAME: &str = "cpio-in.cpio";
        Self {
            dir: "test-assets/test_simple_in_out_newc/",
            assets: vec![(
                FILE_NAME,
                "39c7a5817e62fa451fb57638137bcfdd6add7fe706394d42c60c5c9314dc6cf2",
                format!(
                    "https://wcampbell.dev/cpio/testing/test_simple_in_out_newc_files/{FILE_NAME}"
                ),
            )],
        }
    }
}

impl FixtureProvider for Download {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        let assets: Vec<TestAssetDef> = self
            .assets
            .iter()
            .filter(|(filename, ..)| *filename == name)
            .map(|(filename, hash, url)| TestAssetDef {
                filename: filename.to_string(),
                hash: hash.to_string(),
                url: url.clone(),
            })
            .collect();
        if assets.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, name.to_string()));
        }
        dl_test_files(&assets, self.dir, true)
            .map_err(|e| io::Error::other(format!("{e:?}")))?;
        fs::read(format!("{}/{name}", self.dir))
    }
}

/// Reports `len` zero bytes without holding them
pub struct Sparse {
    pub len: u64,
    pub pos: u64,
}

impl Read for Sparse {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.len.saturating_sub(self.pos).min(buf.len() as u64) as usize;
        buf[..n].fill(0);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for Sparse {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::End(n) => self.len.saturating_add_signed(n),
            SeekFrom::Current(n) => self.pos.saturating_add_signed(n),
        };
        Ok(self.pos)
    }
}

/// Reports `claimed` bytes when seeked to its end but only holds `data`
pub struct ShortRead {
    pub claimed: u64,
    pub data: Cursor<Vec<u8>>,
}

impl Read for ShortRead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Seek for ShortRead {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::End(n) => Ok(self.claimed.saturating_add_signed(n)),
            pos => self.data.seek(pos),
        }
    }
}
