//! Device/inode identity for archives being written
//!
//! Readers decide that two entries are the same file when their device and
//! inode match, so a writer must hand out one identity per underlying file and
//! never let two files share one. Hardlinked entries still carry their full
//! payload, nothing here deduplicates data.

use std::collections::HashMap;

use crate::Variant;
use crate::error::{CpioError, FieldError};
use crate::field::narrow;

/// Device number, split into major and minor
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Device {
    pub major: u32,
    pub minor: u32,
}

impl Device {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Old binary devices are one word, major in the high byte
    pub fn from_word(word: u16) -> Self {
        Self { major: u32::from(word >> 8), minor: u32::from(word & 0xff) }
    }

    pub fn to_word(self) -> Result<u16, FieldError> {
        let major: u8 = narrow(self.major.into())?;
        let minor: u8 = narrow(self.minor.into())?;
        Ok(u16::from(major) << 8 | u16::from(minor))
    }
}

/// Identity of one file inside an archive
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub device: Device,
    pub inode: u32,
}

impl Identity {
    pub const fn new(device: Device, inode: u32) -> Self {
        Self { device, inode }
    }
}

/// Caller supplied key naming the file an entry was made from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    /// Device and inode of the file on the source filesystem
    Source { dev: u64, ino: u64 },
    /// Identity to use verbatim in the archive
    Explicit(Identity),
}

/// Largest device and inode values a variant can store
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Limits {
    major: u32,
    minor: u32,
    inode: u32,
}

impl Limits {
    fn of(variant: Variant) -> Self {
        match variant {
            Variant::OldBinary(_) => Self { major: 0xff, minor: 0xff, inode: u16::MAX.into() },
            Variant::NewAscii => Self { major: u32::MAX, minor: u32::MAX, inode: u32::MAX },
        }
    }

    fn successor(&self, current: Identity) -> Option<Identity> {
        let Identity { device: Device { major, minor }, inode } = current;
        if inode < self.inode {
            Some(Identity::new(Device::new(major, minor), inode + 1))
        } else if minor < self.minor {
            Some(Identity::new(Device::new(major, minor + 1), 1))
        } else if major < self.major {
            Some(Identity::new(Device::new(major + 1, 0), 1))
        } else {
            None
        }
    }
}

/// Assigns archive identities for one write session
#[derive(Debug)]
pub struct HardlinkTracker {
    limits: Limits,
    assigned: HashMap<FileIdentity, Identity>,
    /// `None` holder: handed out by [`Self::assign_unique`]
    holders: HashMap<Identity, Option<FileIdentity>>,
    next: Option<Identity>,
    requests: usize,
}

impl HardlinkTracker {
    pub fn new(variant: Variant) -> Self {
        Self {
            limits: Limits::of(variant),
            assigned: HashMap::new(),
            holders: HashMap::new(),
            next: Some(Identity::new(Device::default(), 1)),
            requests: 0,
        }
    }

    /// Identity for `key`, the same one every time the key is seen again
    pub fn assign(&mut self, key: &FileIdentity) -> Result<Identity, CpioError> {
        self.requests += 1;
        if let Some(identity) = self.assigned.get(key) {
            log::trace!("{key:?} is a hardlink to {identity:?}");
            return Ok(*identity);
        }

        let identity = match key {
            FileIdentity::Explicit(identity) => {
                if let Some(holder) = self.holders.get(identity) {
                    return Err(CpioError::IdentityCollision {
                        identity: *identity,
                        requested: key.clone(),
                        holder: holder.clone(),
                    });
                }
                *identity
            }
            FileIdentity::Source { .. } => self.fresh()?,
        };

        log::trace!("assigned {identity:?} to {key:?}");
        self.assigned.insert(key.clone(), identity);
        self.holders.insert(identity, Some(key.clone()));
        Ok(identity)
    }

    /// Identity shared with nothing else, for entries without a key
    pub fn assign_unique(&mut self) -> Result<Identity, CpioError> {
        self.requests += 1;
        let identity = self.fresh()?;
        self.holders.insert(identity, None);
        Ok(identity)
    }

    /// Number of distinct identities handed out
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    fn fresh(&mut self) -> Result<Identity, CpioError> {
        while let Some(candidate) = self.next {
            self.next = self.limits.successor(candidate);
            if !self.holders.contains_key(&candidate) {
                return Ok(candidate);
            }
        }

        Err(CpioError::FieldOverflow {
            entry: self.requests - 1,
            field: "ino",
            value: u64::from(self.limits.inode) + 1,
            limit: self.limits.inode.into(),
        })
    }
}
