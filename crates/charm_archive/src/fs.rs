//! Functions to read, expand and write charm packages on disk.

use std::io::BufWriter;
use std::path::Path;

use crate::write::{write_package, WriteOptions};
use crate::{ArchiveError, PackageArchive, PackageDir, PackageSource};

/// Opens the package at `path`, which may either be an expanded directory or a zip container.
///
/// ```rust,no_run
/// # use std::path::Path;
/// use charm_archive::fs::read_package;
/// let package = read_package(Path::new("charms/dummy.charm")).unwrap();
/// println!("{}", package.meta().name);
/// ```
pub fn read_package(path: &Path) -> Result<Box<dyn PackageSource>, ArchiveError> {
    let metadata = fs_err::metadata(path).map_err(ArchiveError::io("open", path))?;
    if metadata.is_dir() {
        Ok(Box::new(PackageDir::open(path)?))
    } else {
        Ok(Box::new(PackageArchive::open(path)?))
    }
}

/// Expands the zip container at `archive` into the directory `destination`.
///
/// ```rust,no_run
/// # use std::path::Path;
/// use charm_archive::fs::expand_archive;
/// expand_archive(Path::new("charms/dummy.charm"), Path::new("/tmp/dummy")).unwrap();
/// ```
pub fn expand_archive(archive: &Path, destination: &Path) -> Result<(), ArchiveError> {
    PackageArchive::open(archive)?.expand_to(destination)
}

/// Serializes `source` into a new zip container at `output`. An existing file is overwritten.
pub fn write_package_file<S: PackageSource + ?Sized>(
    source: &S,
    output: &Path,
    options: &WriteOptions,
) -> Result<(), ArchiveError> {
    let file = fs_err::File::create(output).map_err(ArchiveError::io("create", output))?;
    let mut writer = write_package(source, BufWriter::new(file), options)?;
    std::io::Write::flush(&mut writer).map_err(ArchiveError::io("write", output))
}
