//! File type and permission bits carried in the `mode` field

/// Mask of the file type bits
pub const S_IFMT: u32 = 0o170000;
pub const S_IFSOCK: u32 = 0o140000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFIFO: u32 = 0o010000;
pub const S_ISUID: u32 = 0o004000;
pub const S_ISGID: u32 = 0o002000;
pub const S_ISVTX: u32 = 0o001000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileType {
    Socket,
    /// Link target is stored as the payload
    Symlink,
    Regular,
    BlockDevice,
    Directory,
    CharDevice,
    Fifo,
}

impl FileType {
    pub fn from_mode(mode: u32) -> Option<Self> {
        Some(match mode & S_IFMT {
            S_IFSOCK => Self::Socket,
            S_IFLNK => Self::Symlink,
            S_IFREG => Self::Regular,
            S_IFBLK => Self::BlockDevice,
            S_IFDIR => Self::Directory,
            S_IFCHR => Self::CharDevice,
            S_IFIFO => Self::Fifo,
            _ => return None,
        })
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Socket => S_IFSOCK,
            Self::Symlink => S_IFLNK,
            Self::Regular => S_IFREG,
            Self::BlockDevice => S_IFBLK,
            Self::Directory => S_IFDIR,
            Self::CharDevice => S_IFCHR,
            Self::Fifo => S_IFIFO,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Socket => 's',
            Self::Symlink => 'l',
            Self::Regular => '-',
            Self::BlockDevice => 'b',
            Self::Directory => 'd',
            Self::CharDevice => 'c',
            Self::Fifo => 'p',
        }
    }
}

/// `ls -l` style rendering, `?` for an unknown file type
pub fn mode_string(mode: u32) -> String {
    let mut s = String::with_capacity(10);
    s.push(FileType::from_mode(mode).map_or('?', FileType::symbol));

    let special = [(S_ISUID, 's'), (S_ISGID, 's'), (S_ISVTX, 't')];
    for (shift, (special_bit, special_char)) in [6, 3, 0].into_iter().zip(special) {
        let perm = (mode >> shift) & 0o7;
        s.push(if perm & 0o4 != 0 { 'r' } else { '-' });
        s.push(if perm & 0o2 != 0 { 'w' } else { '-' });
        let exec = perm & 0o1 != 0;
        s.push(match (mode & special_bit != 0, exec) {
            (true, true) => special_char,
            (true, false) => special_char.to_ascii_uppercase(),
            (false, true) => 'x',
            (false, false) => '-',
        });
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_string() {
        assert_eq!(mode_string(0o040755), "drwxr-xr-x");
        assert_eq!(mode_string(0o100644), "-rw-r--r--");
        assert_eq!(mode_string(0o120777), "lrwxrwxrwx");
        assert_eq!(mode_string(0o104755), "-rwsr-xr-x");
        assert_eq!(mode_string(0o041777), "drwxrwxrwt");
        assert_eq!(mode_string(0o102644), "-rw-r-Sr--");
        assert_eq!(mode_string(0o000644), "?rw-r--r--");
    }

    #[test]
    fn test_file_type() {
        assert_eq!(FileType::from_mode(0o060660), Some(FileType::BlockDevice));
        assert_eq!(FileType::from_mode(0o010600), Some(FileType::Fifo));
        assert_eq!(FileType::from_mode(0o644), None);
        assert_eq!(FileType::Directory.bits() | 0o755, 0o040755);
    }
}
