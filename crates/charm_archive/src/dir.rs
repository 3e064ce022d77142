//! Reading charm packages that are expanded into a directory.

use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use charm_types::{package::PackageFile, Actions, Config, Meta};
use walkdir::WalkDir;

use crate::entry::{Entry, EntryKind};
use crate::path::PackagePath;
use crate::revision::{self, REVISION_FILE};
use crate::write::WriteOptions;
use crate::{ArchiveError, PackageSource};

/// Version control directories that are never part of a package.
const VCS_DIRS: [&str; 4] = [".git", ".bzr", ".hg", ".svn"];

/// A charm package that lives in a directory on disk.
#[derive(Debug, Clone)]
pub struct PackageDir {
    path: PathBuf,
    meta: Meta,
    config: Config,
    actions: Actions,
    revision: u64,
}

impl PackageDir {
    /// Reads the package metadata from the directory at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let path = path.into();
        tracing::debug!("reading package directory {}", path.display());

        let meta = Meta::from_package_directory(&path).map_err(|source| ArchiveError::Metadata {
            member: Meta::package_path().display().to_string(),
            source,
        })?;
        let config = load_optional::<Config>(&path)?;
        let actions = load_optional::<Actions>(&path)?;

        let revision_path = path.join(REVISION_FILE);
        let revision_file = match fs_err::symlink_metadata(&revision_path) {
            Ok(metadata) if metadata.is_file() => Some(
                fs_err::read(&revision_path).map_err(ArchiveError::io("read", &revision_path))?,
            ),
            Ok(_) => {
                return Err(ArchiveError::CorruptArchive(format!(
                    "'{REVISION_FILE}' is not a regular file"
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ArchiveError::io("read", revision_path)(e)),
        };
        let revision = revision::resolve(revision_file.as_deref(), &meta)?;

        Ok(Self {
            path,
            meta,
            config,
            actions,
            revision,
        })
    }

    /// The directory this package was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the package into a zip container, see [`crate::write::write_package`].
    pub fn archive_to<W: Write + Seek>(
        &self,
        writer: W,
        options: &WriteOptions,
    ) -> Result<W, ArchiveError> {
        crate::write::write_package(self, writer, options)
    }

    /// Copies the package into `destination`, see [`crate::extract::expand`].
    pub fn expand_to(&self, destination: impl AsRef<Path>) -> Result<(), ArchiveError> {
        crate::extract::expand(self, destination.as_ref(), &Default::default())
    }
}

impl PackageSource for PackageDir {
    fn walk(&self) -> Result<Vec<Entry>, ArchiveError> {
        let walker = WalkDir::new(&self.path)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let is_vcs = entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| VCS_DIRS.contains(&name));
                if is_vcs {
                    tracing::warn!("skipping version control directory {}", entry.path().display());
                }
                !is_vcs
            });

        let mut entries = Vec::new();
        for dir_entry in walker {
            let dir_entry = dir_entry.map_err(|err| {
                let path = err
                    .path()
                    .map_or_else(|| self.path.clone(), Path::to_path_buf);
                ArchiveError::io("walk", path)(err.into())
            })?;

            let Some(path) = package_path(&self.path, dir_entry.path())? else {
                continue;
            };
            if path.as_str() == REVISION_FILE {
                continue;
            }

            let file_type = dir_entry.file_type();
            let metadata = dir_entry.metadata().map_err(|err| {
                ArchiveError::io("read metadata of", dir_entry.path())(err.into())
            })?;
            let (kind, size) = if file_type.is_symlink() {
                let target = fs_err::read_link(dir_entry.path())
                    .map_err(ArchiveError::io("read link", dir_entry.path()))?;
                let target = target.to_str().map(str::to_owned).ok_or_else(|| {
                    ArchiveError::UnsupportedFileType {
                        path: dir_entry.path().to_path_buf(),
                    }
                })?;
                (EntryKind::Symlink { target }, 0)
            } else if file_type.is_dir() {
                let mode = permission_bits(&metadata);
                (EntryKind::Directory { mode }, 0)
            } else if file_type.is_file() {
                let mode = permission_bits(&metadata);
                (EntryKind::File { mode }, metadata.len())
            } else {
                return Err(ArchiveError::UnsupportedFileType {
                    path: dir_entry.path().to_path_buf(),
                });
            };

            tracing::trace!("found '{path}' as {kind:?}");
            entries.push(Entry { path, kind, size });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn copy_file(&self, path: &PackagePath, writer: &mut dyn Write) -> Result<u64, ArchiveError> {
        let native = path.to_native_path(&self.path);
        let mut file = fs_err::File::open(&native).map_err(ArchiveError::io("open", &native))?;
        std::io::copy(&mut file, writer).map_err(ArchiveError::io("read", native))
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn actions(&self) -> &Actions {
        &self.actions
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
}

/// Loads a metadata file that a package is allowed to omit.
fn load_optional<T: PackageFile + Default>(dir: &Path) -> Result<T, ArchiveError> {
    match T::from_package_directory(dir) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(ArchiveError::Metadata {
            member: T::package_path().display().to_string(),
            source,
        }),
    }
}

/// Converts a path found below `root` into a package path.
fn package_path(root: &Path, path: &Path) -> Result<Option<PackagePath>, ArchiveError> {
    let not_utf8 = || ArchiveError::UnsupportedFileType {
        path: path.to_path_buf(),
    };
    let relative = path.strip_prefix(root).map_err(|_| not_utf8())?;
    let mut components = Vec::new();
    for component in relative.components() {
        components.push(component.as_os_str().to_str().ok_or_else(not_utf8)?);
    }
    PackagePath::parse(&components.join("/")).map_err(|_| ArchiveError::PathEscape {
        entry: relative.display().to_string(),
        target: None,
    })
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & crate::entry::PERMISSION_BITS
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => crate::DIR_MODE,
        (false, true) => 0o444,
        (false, false) => crate::entry::FILE_MODE,
    }
}
