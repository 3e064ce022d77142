//! Resolution of the package revision.
//!
//! The revision of a package is taken from its top-level `revision` file. Older packages store it in
//! `metadata.yaml` instead, and a package that has neither is at revision zero.

use charm_types::Meta;

use crate::ArchiveError;

/// The name of the top-level file that holds the package revision.
pub const REVISION_FILE: &str = "revision";

/// Parses the contents of a `revision` file.
///
/// Only a plain decimal number is accepted, optionally followed by a single `\n` or `\r\n`. Signs,
/// other whitespace and empty content are rejected with [`ArchiveError::InvalidRevision`].
pub fn parse(content: &[u8]) -> Result<u64, ArchiveError> {
    let invalid = || ArchiveError::InvalidRevision(String::from_utf8_lossy(content).into_owned());

    let text = std::str::from_utf8(content).map_err(|_| invalid())?;
    let digits = text
        .strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

/// Determines the revision of a package from the contents of its `revision` file, if any, and its
/// metadata.
pub fn resolve(revision_file: Option<&[u8]>, meta: &Meta) -> Result<u64, ArchiveError> {
    match revision_file {
        Some(content) => parse(content),
        None => Ok(meta.revision.unwrap_or(0)),
    }
}

/// Formats a revision the way it is stored in a `revision` file.
pub fn format(revision: u64) -> String {
    revision.to_string()
}
