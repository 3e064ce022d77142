//! Materializing a package onto the filesystem.

use std::collections::HashMap;
use std::path::Path;

use crate::entry::{Entry, EntryKind, EXECUTABLE_BITS};
use crate::path::{resolve_symlink, PackagePath, PathViolation};
use crate::revision::{self, REVISION_FILE};
use crate::{ArchiveError, PackageSource, DIR_MODE};

/// The directory whose regular files are made executable on expansion.
const HOOKS_DIR: &str = "hooks";

/// Controls how a package is expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    executable_hooks: bool,
    write_revision: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            executable_hooks: true,
            write_revision: true,
        }
    }
}

impl ExpandOptions {
    /// Whether files below `hooks/` are made executable regardless of their stored mode.
    /// Enabled by default.
    pub fn with_executable_hooks(self, executable_hooks: bool) -> Self {
        Self {
            executable_hooks,
            ..self
        }
    }

    /// Whether a `revision` file with the current revision is written to the destination. Enabled
    /// by default.
    pub fn with_revision_file(self, write_revision: bool) -> Self {
        Self {
            write_revision,
            ..self
        }
    }
}

/// Expands every member of `source` into `destination`.
///
/// Entry paths are checked for containment before anything is written. Directories are created with
/// [`DIR_MODE`], regular files keep their stored permission bits, and symlinks are recreated with
/// their literal target as long as that target resolves to a location inside the package.
///
/// Expansion stops at the first error. Anything that was written up to that point is left in place.
pub fn expand<S: PackageSource + ?Sized>(
    source: &S,
    destination: &Path,
    options: &ExpandOptions,
) -> Result<(), ArchiveError> {
    let entries = source.walk()?;
    let links = symlink_table(&entries);

    fs_err::create_dir_all(destination)
        .map_err(ArchiveError::io("create directory", destination))?;

    for entry in &entries {
        let target_path = entry.path.to_native_path(destination);
        match &entry.kind {
            EntryKind::Directory { .. } => {
                fs_err::create_dir_all(&target_path)
                    .map_err(ArchiveError::io("create directory", &target_path))?;
                set_mode(&target_path, DIR_MODE)?;
            }
            EntryKind::File { mode } => {
                let mode = if options.executable_hooks && entry.path.is_inside(HOOKS_DIR) {
                    mode | EXECUTABLE_BITS
                } else {
                    *mode
                };
                let mut file = fs_err::File::create(&target_path)
                    .map_err(ArchiveError::io("create", &target_path))?;
                source.copy_file(&entry.path, &mut file)?;
                drop(file);
                set_mode(&target_path, mode)?;
            }
            EntryKind::Symlink { target } => {
                check_symlink(&entry.path, target, &links)?;
                symlink(target, &target_path)?;
            }
        }
        tracing::debug!("expanded '{}'", entry.path);
    }

    if options.write_revision {
        let revision_path = destination.join(REVISION_FILE);
        fs_err::write(&revision_path, revision::format(source.revision()))
            .map_err(ArchiveError::io("write", &revision_path))?;
    }

    tracing::debug!(
        "expanded {} entries into {}",
        entries.len(),
        destination.display()
    );
    Ok(())
}

/// Maps the path of every symlink in `entries` to its literal target.
pub(crate) fn symlink_table(entries: &[Entry]) -> HashMap<&str, &str> {
    entries
        .iter()
        .filter_map(|entry| match &entry.kind {
            EntryKind::Symlink { target } => Some((entry.path.as_str(), target.as_str())),
            _ => None,
        })
        .collect()
}

/// Fails if the symlink at `link` does not resolve to a location inside the package, following
/// the other symlinks of the package in `links` along the way.
pub(crate) fn check_symlink(
    link: &PackagePath,
    target: &str,
    links: &HashMap<&str, &str>,
) -> Result<(), ArchiveError> {
    match resolve_symlink(link, target, links) {
        Ok(_) => Ok(()),
        Err(PathViolation::Absolute) => Err(ArchiveError::AbsoluteSymlink {
            entry: link.to_string(),
            target: target.to_owned(),
        }),
        Err(PathViolation::Escapes) => Err(ArchiveError::PathEscape {
            entry: link.to_string(),
            target: Some(target.to_owned()),
        }),
        Err(violation @ PathViolation::TooManyLinks) => Err(ArchiveError::CorruptArchive(format!(
            "symlink '{link}' {violation}"
        ))),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ArchiveError> {
    use std::os::unix::fs::PermissionsExt;
    fs_err::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(ArchiveError::io("set permissions of", path))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ArchiveError> {
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &str, link: &Path) -> Result<(), ArchiveError> {
    fs_err::os::unix::fs::symlink(target, link).map_err(ArchiveError::io("create symlink", link))
}

#[cfg(windows)]
fn symlink(target: &str, link: &Path) -> Result<(), ArchiveError> {
    fs_err::os::windows::fs::symlink_file(target, link)
        .map_err(ArchiveError::io("create symlink", link))
}
