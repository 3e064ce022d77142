//! Functionality for writing charm packages
use std::io::{Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{result::ZipError, CompressionMethod, DateTime, ZipWriter};

use crate::entry::{EntryKind, FILE_MODE};
use crate::extract::{check_symlink, symlink_table};
use crate::revision::{self, REVISION_FILE};
use crate::{ArchiveError, PackageSource};

/// Select the compression level to use for the package
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Use the lowest compression level (deflate: 1)
    Lowest,
    /// Use the highest compression level (deflate: 9)
    Highest,
    /// Use the default compression level (deflate: 6)
    #[default]
    Default,
    /// Use a numeric compression level (deflate: 1-9)
    Numeric(u32),
}

impl CompressionLevel {
    fn to_deflate_level(self) -> Result<i64, std::io::Error> {
        match self {
            CompressionLevel::Lowest => Ok(1),
            CompressionLevel::Highest => Ok(9),
            CompressionLevel::Default => Ok(6),
            CompressionLevel::Numeric(n) => {
                if !(1..=9).contains(&n) {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "deflate compression level must be between 1 and 9",
                    ))
                } else {
                    Ok(i64::from(n))
                }
            }
        }
    }
}

/// Options that control how a package is serialized.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    compression_level: CompressionLevel,
    stored: bool,
}

impl WriteOptions {
    /// Sets the deflate level used for regular files.
    pub fn with_compression_level(self, compression_level: CompressionLevel) -> Self {
        Self {
            compression_level,
            ..self
        }
    }

    /// Store regular files without compressing them.
    pub fn with_stored(self, stored: bool) -> Self {
        Self { stored, ..self }
    }

    fn file_options(&self) -> Result<SimpleFileOptions, std::io::Error> {
        let options = base_options();
        if self.stored {
            return Ok(options.compression_method(CompressionMethod::Stored));
        }
        Ok(options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level.to_deflate_level()?)))
    }
}

/// Every entry carries the zip epoch as its modification time so that the output only depends on
/// the content of the package.
fn base_options() -> SimpleFileOptions {
    SimpleFileOptions::default().last_modified_time(DateTime::default())
}

/// Write a package to a zip container.
///
/// Members are written in sorted path order, directories as explicit entries. Regular files keep
/// the permission bits of the source and symlinks are stored with their literal target. The
/// current revision of `source` is written last as the top-level `revision` file.
///
/// # Errors
///
/// Fails if the writer returns an error, if the compression level is out of range, or if a symlink
/// in the source points outside of the package.
///
/// # Examples
///
/// ```no_run
/// use charm_archive::{write::{write_package, CompressionLevel, WriteOptions}, PackageDir};
///
/// let package = PackageDir::open("dummy").unwrap();
/// let file = std::fs::File::create("dummy.charm").unwrap();
/// let options = WriteOptions::default().with_compression_level(CompressionLevel::Highest);
/// write_package(&package, file, &options).unwrap();
/// ```
pub fn write_package<S: PackageSource + ?Sized, W: Write + Seek>(
    source: &S,
    writer: W,
    options: &WriteOptions,
) -> Result<W, ArchiveError> {
    let file_options = options
        .file_options()
        .map_err(ArchiveError::io("configure compression for", "<archive>"))?;

    let entries = source.walk()?;
    let links = symlink_table(&entries);

    let mut archive = ZipWriter::new(writer);
    for entry in &entries {
        let name = entry.path.as_str();
        match &entry.kind {
            EntryKind::Directory { mode } => {
                archive
                    .add_directory(format!("{name}/"), base_options().unix_permissions(*mode))
                    .map_err(write_error(name))?;
            }
            EntryKind::File { mode } => {
                archive
                    .start_file(name, file_options.unix_permissions(*mode))
                    .map_err(write_error(name))?;
                source.copy_file(&entry.path, &mut archive)?;
            }
            EntryKind::Symlink { target } => {
                check_symlink(&entry.path, target, &links)?;
                archive
                    .add_symlink(name, target.as_str(), base_options())
                    .map_err(write_error(name))?;
            }
        }
        tracing::trace!("wrote '{name}'");
    }

    archive
        .start_file(REVISION_FILE, file_options.unix_permissions(FILE_MODE))
        .map_err(write_error(REVISION_FILE))?;
    archive
        .write_all(revision::format(source.revision()).as_bytes())
        .map_err(ArchiveError::io("write", REVISION_FILE))?;

    archive.finish().map_err(write_error("<archive>"))
}

fn write_error(name: &str) -> impl FnOnce(ZipError) -> ArchiveError + '_ {
    move |err| {
        let source = match err {
            ZipError::Io(source) => source,
            other => std::io::Error::other(other),
        };
        ArchiveError::Io {
            operation: "write",
            path: name.into(),
            source,
        }
    }
}
