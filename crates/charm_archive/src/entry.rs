use crate::path::PackagePath;

/// The permission bits every expanded directory receives, regardless of the mode stored for it.
pub const DIR_MODE: u32 = 0o755;

/// The permission bits assumed for regular files that carry no unix mode in the container.
pub(crate) const FILE_MODE: u32 = 0o644;

/// The permission bits kept from a source. Setuid, setgid and sticky bits are never carried over.
pub(crate) const PERMISSION_BITS: u32 = 0o777;

/// The mode bits that mark a hook as executable.
pub(crate) const EXECUTABLE_BITS: u32 = 0o111;

/// The kind of a package member together with the attributes that matter for that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file with its permission bits.
    File {
        /// Permission bits (`0o777` mask).
        mode: u32,
    },

    /// A directory with its stored permission bits.
    Directory {
        /// Permission bits as stored. Expansion always uses [`DIR_MODE`].
        mode: u32,
    },

    /// A symbolic link.
    Symlink {
        /// The literal link target.
        target: String,
    },
}

/// A single member of a package as seen by the extractor and the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Normalized location of the member.
    pub path: PackagePath,

    /// What kind of member this is.
    pub kind: EntryKind,

    /// Uncompressed size of the member content in bytes.
    pub size: u64,
}

impl Entry {
    /// Constructs a directory entry that is implied by the paths of other entries.
    pub(crate) fn implied_directory(path: PackagePath) -> Self {
        Self {
            path,
            kind: EntryKind::Directory { mode: DIR_MODE },
            size: 0,
        }
    }
}
