use std::io::Write;

use charm_types::{Actions, Config, Meta};

use crate::entry::Entry;
use crate::manifest::Manifest;
use crate::path::PackagePath;
use crate::ArchiveError;

/// A charm package that can be inspected, expanded and serialized.
///
/// Implemented by [`crate::PackageArchive`] for zip containers and by [`crate::PackageDir`] for
/// expanded directories.
pub trait PackageSource {
    /// Returns every member of the package except the top-level `revision` file, sorted by path.
    ///
    /// Directories that are only implied by the paths of other members are included, so parents
    /// always come before their children.
    fn walk(&self) -> Result<Vec<Entry>, ArchiveError>;

    /// Copies the content of the regular file at `path` into `writer`.
    fn copy_file(&self, path: &PackagePath, writer: &mut dyn Write) -> Result<u64, ArchiveError>;

    /// The parsed `metadata.yaml`.
    fn meta(&self) -> &Meta;

    /// The parsed `config.yaml`, empty if the package has none.
    fn config(&self) -> &Config;

    /// The parsed `actions.yaml`, empty if the package has none.
    fn actions(&self) -> &Actions;

    /// The current revision of the package.
    fn revision(&self) -> u64;

    /// Overrides the revision in memory. The new value is used by subsequent expansions and
    /// serializations, the package itself is left untouched.
    fn set_revision(&mut self, revision: u64);

    /// Computes the set of paths that exist after expanding the package.
    fn manifest(&self) -> Result<Manifest, ArchiveError> {
        Ok(Manifest::from_entries(&self.walk()?))
    }
}
