use std::collections::BTreeSet;

use serde::Serialize;

use crate::entry::Entry;
use crate::path::PackagePath;
use crate::revision::REVISION_FILE;

/// The set of paths that exist after a package has been fully expanded.
///
/// The top-level `revision` file is never part of a manifest, and every ancestor directory of a
/// member is, whether or not the source stores it explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest(BTreeSet<PackagePath>);

impl Manifest {
    /// Builds a manifest from the entries of a package.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        entries
            .into_iter()
            .map(|entry| entry.path.clone())
            .collect()
    }

    /// Returns true if `path` is part of the manifest.
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    /// Iterates over all paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(PackagePath::as_str)
    }

    /// The number of paths in the manifest.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the manifest contains no paths at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<PackagePath> for Manifest {
    fn from_iter<T: IntoIterator<Item = PackagePath>>(iter: T) -> Self {
        let mut paths = BTreeSet::new();
        for path in iter {
            paths.extend(path.ancestors());
            paths.insert(path);
        }
        paths.remove(REVISION_FILE);
        Self(paths)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a PackagePath;
    type IntoIter = std::collections::btree_set::Iter<'a, PackagePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Returns the ancestors of `paths` that are not themselves part of `paths`.
pub(crate) fn implied_directories<'a>(
    paths: impl IntoIterator<Item = &'a PackagePath>,
) -> BTreeSet<PackagePath> {
    let paths: BTreeSet<&PackagePath> = paths.into_iter().collect();
    paths
        .iter()
        .flat_map(|path| path.ancestors())
        .filter(|ancestor| !paths.contains(ancestor))
        .collect()
}
