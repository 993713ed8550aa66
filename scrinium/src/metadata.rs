use crate::hardlink::{Device, FileIdentity};
use crate::mode::{S_IFDIR, S_IFLNK, S_IFREG};

/// File attributes supplied when writing an entry
///
/// Sizes are never given here, the writer derives name and file sizes from
/// the pathname and payload it is handed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    /// Device described by block and character special files
    pub rdev: Device,
    /// Hardlink key; `None` gives the entry an identity of its own
    pub identity: Option<FileIdentity>,
}

impl Metadata {
    /// Regular file with permission bits `perm`
    pub fn file(perm: u32) -> Self {
        Self { mode: S_IFREG | perm, nlink: 1, ..Self::default() }
    }

    /// Directory with permission bits `perm`
    pub fn directory(perm: u32) -> Self {
        Self { mode: S_IFDIR | perm, nlink: 2, ..Self::default() }
    }

    pub fn symlink() -> Self {
        Self { mode: S_IFLNK | 0o777, nlink: 1, ..Self::default() }
    }

    pub fn with_identity(mut self, identity: FileIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }
}
