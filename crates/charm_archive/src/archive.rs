//! Reading charm packages stored as zip containers.

use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use charm_types::{package::PackageFile, Actions, Config, Meta};
use parking_lot::Mutex;
use zip::{result::ZipError, ZipArchive};

use crate::entry::{Entry, EntryKind, FILE_MODE, PERMISSION_BITS};
use crate::manifest::implied_directories;
use crate::path::PackagePath;
use crate::revision::{self, REVISION_FILE};
use crate::{ArchiveError, PackageSource};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// The longest symlink target that is accepted, matching `PATH_MAX` on Linux.
const MAX_SYMLINK_TARGET: u64 = 4096;

trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A member of a zip container exactly as it is stored.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    name: String,
    index: usize,
    kind: EntryKind,
    size: u64,
}

impl ArchiveEntry {
    /// The name of the member in the container, without the trailing `/` of directories.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of the member.
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// The uncompressed size of the member.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A charm package backed by a zip container.
///
/// The container is indexed when it is opened, member content is only decompressed when it is
/// read. Reads lock the underlying zip handle for the duration of a single member, so a
/// `PackageArchive` can be shared between threads.
pub struct PackageArchive {
    zip: Mutex<ZipArchive<Box<dyn ReadSeek>>>,
    entries: Vec<ArchiveEntry>,
    by_path: HashMap<PackagePath, usize>,
    meta: Meta,
    config: Config,
    actions: Actions,
    revision: u64,
}

impl std::fmt::Debug for PackageArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageArchive")
            .field("name", &self.meta.name)
            .field("revision", &self.revision)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl PackageArchive {
    /// Opens the container at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = fs_err::File::open(path).map_err(ArchiveError::io("open", path))?;
        tracing::debug!("reading package archive {}", path.display());
        Self::from_reader(BufReader::new(file))
    }

    /// Reads a container that is held in memory.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ArchiveError> {
        Self::from_reader(Cursor::new(bytes.into()))
    }

    /// Reads a container from any seekable reader.
    pub fn from_reader(reader: impl Read + Seek + Send + 'static) -> Result<Self, ArchiveError> {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        let mut zip = ZipArchive::new(reader).map_err(corrupt)?;
        let (entries, by_path) = index_entries(&mut zip)?;
        check_revision_member(&entries, &by_path)?;

        let mut archive = Self {
            zip: Mutex::new(zip),
            entries,
            by_path,
            meta: Meta::default(),
            config: Config::default(),
            actions: Actions::default(),
            revision: 0,
        };

        archive.meta = archive.load_package_file::<Meta>()?.ok_or_else(|| {
            ArchiveError::Metadata {
                member: Meta::package_path().display().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "the package does not contain a metadata file",
                ),
            }
        })?;
        archive.config = archive.load_package_file::<Config>()?.unwrap_or_default();
        archive.actions = archive.load_package_file::<Actions>()?.unwrap_or_default();

        let revision_file = archive.read_optional(REVISION_FILE)?;
        archive.revision = revision::resolve(revision_file.as_deref(), &archive.meta)?;

        tracing::debug!(
            "indexed {} entries of package '{}' at revision {}",
            archive.entries.len(),
            archive.meta.name,
            archive.revision
        );
        Ok(archive)
    }

    /// Returns the members of the container in the order in which they are stored.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Reads the content of the regular file at `path`.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        self.read_optional(path)?
            .ok_or_else(|| ArchiveError::NotFound(path.to_owned()))
    }

    /// Expands the package into `destination`, see [`crate::extract::expand`].
    pub fn expand_to(&self, destination: impl AsRef<Path>) -> Result<(), ArchiveError> {
        crate::extract::expand(self, destination.as_ref(), &Default::default())
    }

    fn find_file(&self, path: &str) -> Option<&ArchiveEntry> {
        let path = PackagePath::parse(path).ok()??;
        let entry = &self.entries[*self.by_path.get(&path)?];
        matches!(entry.kind, EntryKind::File { .. }).then_some(entry)
    }

    fn read_optional(&self, path: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        let Some(entry) = self.find_file(path) else {
            return Ok(None);
        };
        let mut content = Vec::new();
        self.copy_entry(entry, &mut content)?;
        Ok(Some(content))
    }

    fn copy_entry(&self, entry: &ArchiveEntry, writer: &mut dyn Write) -> Result<u64, ArchiveError> {
        let mut zip = self.zip.lock();
        let mut file = zip.by_index(entry.index).map_err(corrupt)?;
        std::io::copy(&mut file, writer).map_err(ArchiveError::io("read", &entry.name))
    }

    fn load_package_file<T: PackageFile>(&self) -> Result<Option<T>, ArchiveError> {
        let member = T::package_path().display().to_string();
        let Some(content) = self.read_optional(&member)? else {
            return Ok(None);
        };
        T::from_reader(content.as_slice())
            .map(Some)
            .map_err(|source| ArchiveError::Metadata { member, source })
    }
}

impl PackageSource for PackageArchive {
    fn walk(&self) -> Result<Vec<Entry>, ArchiveError> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for archive_entry in &self.entries {
            let path = match PackagePath::parse(&archive_entry.name) {
                Ok(Some(path)) => path,
                Ok(None) => continue,
                Err(_) => {
                    return Err(ArchiveError::PathEscape {
                        entry: archive_entry.name.clone(),
                        target: None,
                    })
                }
            };
            if path.as_str() == REVISION_FILE {
                continue;
            }
            entries.push(Entry {
                path,
                kind: archive_entry.kind.clone(),
                size: archive_entry.size,
            });
        }

        let kinds: HashMap<&PackagePath, &EntryKind> =
            entries.iter().map(|e| (&e.path, &e.kind)).collect();
        for entry in &entries {
            let non_directory_parent = entry.path.ancestors().find(|ancestor| {
                kinds
                    .get(ancestor)
                    .is_some_and(|kind| !matches!(kind, EntryKind::Directory { .. }))
            });
            if let Some(parent) = non_directory_parent {
                return Err(ArchiveError::CorruptArchive(format!(
                    "'{}' is nested below '{parent}' which is not a directory",
                    entry.path
                )));
            }
        }

        let implied = implied_directories(entries.iter().map(|e| &e.path));
        entries.extend(implied.into_iter().map(Entry::implied_directory));

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn copy_file(&self, path: &PackagePath, writer: &mut dyn Write) -> Result<u64, ArchiveError> {
        let entry = self
            .find_file(path.as_str())
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))?;
        self.copy_entry(entry, writer)
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

/// Reads the central directory of the container. Symlink targets are read eagerly, all other
/// content is left compressed.
fn index_entries<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
) -> Result<(Vec<ArchiveEntry>, HashMap<PackagePath, usize>), ArchiveError> {
    let mut entries = Vec::with_capacity(zip.len());
    let mut by_path = HashMap::with_capacity(zip.len());

    for index in 0..zip.len() {
        let mut file = zip.by_index(index).map_err(corrupt)?;
        let name = file.name().trim_end_matches('/').to_owned();
        let mode = file.unix_mode();

        let kind = if file.is_dir() {
            EntryKind::Directory {
                mode: mode.map_or(crate::DIR_MODE, |m| m & PERMISSION_BITS),
            }
        } else if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            (&mut file)
                .take(MAX_SYMLINK_TARGET + 1)
                .read_to_string(&mut target)
                .map_err(|_| {
                    ArchiveError::CorruptArchive(format!(
                        "symlink '{name}' has an unreadable target"
                    ))
                })?;
            if target.len() as u64 > MAX_SYMLINK_TARGET {
                return Err(ArchiveError::CorruptArchive(format!(
                    "symlink '{name}' has a target longer than {MAX_SYMLINK_TARGET} bytes"
                )));
            }
            EntryKind::Symlink { target }
        } else {
            EntryKind::File {
                mode: mode.map_or(FILE_MODE, |m| m & PERMISSION_BITS),
            }
        };
        let size = file.size();
        drop(file);

        tracing::trace!("indexed '{name}' as {kind:?}");

        // Members that escape the root are kept so that expanding them fails with a proper error.
        if let Ok(Some(path)) = PackagePath::parse(&name) {
            if by_path.insert(path, entries.len()).is_some() {
                return Err(ArchiveError::CorruptArchive(format!(
                    "'{name}' is stored more than once"
                )));
            }
        }

        entries.push(ArchiveEntry {
            name,
            index,
            kind,
            size,
        });
    }

    Ok((entries, by_path))
}

/// The top-level `revision` member, if present, must be a regular file with nothing below it.
fn check_revision_member(
    entries: &[ArchiveEntry],
    by_path: &HashMap<PackagePath, usize>,
) -> Result<(), ArchiveError> {
    for (path, &index) in by_path {
        let misplaced = if path.as_str() == REVISION_FILE {
            !matches!(entries[index].kind, EntryKind::File { .. })
        } else {
            path.is_inside(REVISION_FILE)
        };
        if misplaced {
            return Err(ArchiveError::CorruptArchive(format!(
                "'{REVISION_FILE}' is not a regular file"
            )));
        }
    }
    Ok(())
}

fn corrupt(err: ZipError) -> ArchiveError {
    match err {
        ZipError::Io(source) => ArchiveError::Io {
            operation: "read",
            path: "<archive>".into(),
            source,
        },
        other => ArchiveError::CorruptArchive(other.to_string()),
    }
}
