//! Contains models of the metadata files that are found at the root of a charm package.

use std::io::Read;
use std::path::Path;

mod actions;
mod config;
mod meta;

pub use {
    actions::{ActionSpec, Actions},
    config::{Config, ConfigOption, OptionType},
    meta::{Meta, Relation, RelationRole, RelationScope},
};

/// A trait implemented for each metadata file that can be read from a charm package.
///
/// Implementors only have to provide [`PackageFile::package_path`] and
/// [`PackageFile::from_str`], all other ways of loading the file are derived from those.
pub trait PackageFile: Sized {
    /// Returns the path of the file relative to the root of the package.
    fn package_path() -> &'static Path;

    /// Parses the contents of the file.
    fn from_str(str: &str) -> Result<Self, std::io::Error>;

    /// Parses the file from a reader.
    fn from_reader(mut reader: impl Read) -> Result<Self, std::io::Error> {
        let mut str = String::new();
        reader.read_to_string(&mut str)?;
        Self::from_str(&str)
    }

    /// Parses the file from a path on disk.
    fn from_path(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let contents = fs_err::read_to_string(path.as_ref())?;
        Self::from_str(&contents)
    }

    /// Reads the file from an expanded package directory.
    fn from_package_directory(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        Self::from_path(path.as_ref().join(Self::package_path()))
    }
}

/// Converts a yaml parse failure into the error type returned by [`PackageFile::from_str`].
pub(crate) fn invalid_yaml(path: &Path, err: serde_yaml::Error) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("failed to parse '{}': {err}", path.display()),
    )
}
