#![deny(missing_docs)]

//! This crate provides the ability to read, expand and write charm packages.
//!
//! A charm is either an expanded directory ([`PackageDir`]) or a single zip container
//! ([`PackageArchive`]). Both implement [`PackageSource`], which is all [`extract::expand`] and
//! [`write::write_package`] need to move a package between the two forms.

use std::path::PathBuf;

pub mod archive;
pub mod dir;
mod entry;
pub mod extract;
pub mod fs;
mod manifest;
pub mod path;
pub mod revision;
mod source;
pub mod write;

pub use archive::{ArchiveEntry, PackageArchive};
pub use dir::PackageDir;
pub use entry::{Entry, EntryKind, DIR_MODE};
pub use manifest::Manifest;
pub use path::PackagePath;
pub use source::PackageSource;

/// An error that can occur when reading, expanding or writing a package.
#[derive(thiserror::Error, Debug)]
#[allow(missing_docs)]
pub enum ArchiveError {
    #[error("invalid package archive: {0}")]
    CorruptArchive(String),

    #[error("'{0}' does not exist in the package")]
    NotFound(String),

    #[error("invalid revision file")]
    InvalidRevision(String),

    #[error("cannot extract {entry:?}: {}", escape_reason(.target))]
    PathEscape {
        entry: String,
        target: Option<String>,
    },

    #[error("cannot extract {entry:?}: symlink {target:?} is absolute")]
    AbsoluteSymlink { entry: String, target: String },

    #[error("failed to {operation} '{}'", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load '{member}'")]
    Metadata {
        member: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is not a regular file, directory or symlink", .path.display())]
    UnsupportedFileType { path: PathBuf },
}

fn escape_reason(target: &Option<String>) -> String {
    match target {
        Some(target) => format!("symlink {target:?} leads out of scope"),
        None => String::from("path leads out of scope"),
    }
}

impl ArchiveError {
    /// Returns a closure that wraps an [`std::io::Error`] into [`ArchiveError::Io`].
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> ArchiveError {
        let path = path.into();
        move |source| ArchiveError::Io {
            operation,
            path,
            source,
        }
    }
}
