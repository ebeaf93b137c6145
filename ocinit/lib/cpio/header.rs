use std::collections::BTreeMap;

use getset::{CopyGetters, Getters, Setters};
use tar::EntryType;

use crate::{oci::MergedEntry, OcinitError, OcinitResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

// Standard Unix file type bits (S_IFMT).
const S_IFLNK: u32 = 0xA000;
const S_IFREG: u32 = 0x8000;
const S_IFBLK: u32 = 0x6000;
const S_IFDIR: u32 = 0x4000;
const S_IFCHR: u32 = 0x2000;
const S_IFIFO: u32 = 0x1000;

/// Name of the terminating archive record.
pub(crate) const TRAILER_NAME: &str = "TRAILER!!!";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A logical newc CPIO header.
///
/// Numeric fields wider than 32 bits are truncated to their low 32 bits when
/// the header is encoded; the checksum field is always zero for newc.
#[derive(Debug, Clone, Default, Getters, CopyGetters, Setters)]
#[getset(set = "pub with_prefix")]
pub struct CpioHeader {
    /// Emitted entry name, already normalized by the merge engine
    /// (`./` prefix, trailing `/` for directories).
    #[getset(get = "pub with_prefix")]
    name: String,

    /// Permission bits OR'd with the file-type field.
    #[getset(get_copy = "pub with_prefix")]
    mode: u32,

    /// User ID of the owner.
    #[getset(get_copy = "pub with_prefix")]
    uid: u32,

    /// Group ID of the owner.
    #[getset(get_copy = "pub with_prefix")]
    gid: u32,

    /// Number of hard links: 2 for directories, 1 otherwise.
    #[getset(get_copy = "pub with_prefix")]
    nlink: u32,

    /// Modification time, seconds since the Unix epoch.
    #[getset(get_copy = "pub with_prefix")]
    mtime: u64,

    /// Body size in bytes: the payload size for regular files, the target
    /// length for symlinks, zero for everything else.
    #[getset(get_copy = "pub with_prefix")]
    size: u64,

    /// Major number of the filesystem the entry came from. Left zero.
    #[getset(get_copy = "pub with_prefix")]
    devmajor: u32,

    /// Minor number of the filesystem the entry came from. Left zero.
    #[getset(get_copy = "pub with_prefix")]
    devminor: u32,

    /// Major number of the device node, for char and block entries.
    #[getset(get_copy = "pub with_prefix")]
    rdevmajor: u32,

    /// Minor number of the device node, for char and block entries.
    #[getset(get_copy = "pub with_prefix")]
    rdevminor: u32,

    /// Inode number assigned by the driver.
    #[getset(get_copy = "pub with_prefix")]
    inode: u32,

    /// Extended attributes decoded from `SCHILY.xattr.` PAX records. The
    /// newc encoding has no place for them; they are carried so a format
    /// variant that can encode them does not need to re-read the layer.
    #[getset(get = "pub with_prefix")]
    xattrs: BTreeMap<String, Vec<u8>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl CpioHeader {
    /// Translates a merged tar entry into a newc header, assigning `inode`.
    ///
    /// The low 12 permission bits come from the tar mode; the file-type
    /// field is derived from the typeflag. Sizes are adjusted per type: a
    /// symlink's size is the length of its target (the target bytes become
    /// the body), directories and device nodes carry no body, and a tar
    /// hardlink degrades to an empty regular file since nothing tracks its
    /// target's inode.
    pub fn from_entry(entry: &mut MergedEntry<'_, '_>, inode: u32) -> OcinitResult<Self> {
        let header = entry.header();
        let entry_type = header.entry_type();

        let permissions = header
            .mode()
            .map_err(|e| OcinitError::MalformedArchive(e.to_string()))?
            & 0o7777;
        let uid = header
            .uid()
            .map_err(|e| OcinitError::MalformedArchive(e.to_string()))? as u32;
        let gid = header
            .gid()
            .map_err(|e| OcinitError::MalformedArchive(e.to_string()))? as u32;
        let mtime = header
            .mtime()
            .map_err(|e| OcinitError::MalformedArchive(e.to_string()))?;

        let (type_bits, size) = match entry_type {
            EntryType::Directory => (S_IFDIR, 0),
            EntryType::Symlink => {
                let target_len = entry.link_target().map(|t| t.len() as u64).unwrap_or(0);
                (S_IFLNK, target_len)
            }
            EntryType::Char => (S_IFCHR, 0),
            EntryType::Block => (S_IFBLK, 0),
            EntryType::Fifo => (S_IFIFO, 0),
            EntryType::Link => (S_IFREG, 0),
            _ => (S_IFREG, entry.size()?),
        };

        let (rdevmajor, rdevminor) = match entry_type {
            EntryType::Char | EntryType::Block => {
                let major = header
                    .device_major()
                    .map_err(|e| OcinitError::MalformedArchive(e.to_string()))?
                    .unwrap_or(0);
                let minor = header
                    .device_minor()
                    .map_err(|e| OcinitError::MalformedArchive(e.to_string()))?
                    .unwrap_or(0);
                (major, minor)
            }
            _ => (0, 0),
        };

        let nlink = if entry_type == EntryType::Directory { 2 } else { 1 };

        Ok(Self {
            name: entry.name().to_string(),
            mode: permissions | type_bits,
            uid,
            gid,
            nlink,
            mtime,
            size,
            devmajor: 0,
            devminor: 0,
            rdevmajor,
            rdevminor,
            inode,
            xattrs: entry.xattrs()?,
        })
    }

    /// The header of the closing `TRAILER!!!` record.
    pub(crate) fn trailer(inode: u32) -> Self {
        Self {
            name: TRAILER_NAME.to_string(),
            nlink: 1,
            inode,
            ..Self::default()
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
