//! Lexical path handling for package members.
//!
//! Everything in this module works on strings only and never touches the filesystem. Paths inside a
//! package are always relative and separated by `/`, regardless of the host platform.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// The ways in which a path can fail to stay within the package root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PathViolation {
    /// The path starts with `/`.
    #[error("is absolute")]
    Absolute,

    /// A `..` component climbs above the package root.
    #[error("leads out of scope")]
    Escapes,

    /// Resolving a symlink target passes through too many other symlinks of the package.
    #[error("passes through too many symlinks")]
    TooManyLinks,
}

/// Lexically normalizes a slash separated path.
///
/// Empty and `.` components are dropped and `..` removes the preceding component. The result is
/// relative to the package root, an empty string denotes the root itself.
pub fn normalize(path: &str) -> Result<String, PathViolation> {
    if path.starts_with('/') {
        return Err(PathViolation::Absolute);
    }

    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if components.pop().is_none() {
                    return Err(PathViolation::Escapes);
                }
            }
            other => components.push(other),
        }
    }

    Ok(components.join("/"))
}

/// A normalized, non-empty path of a member relative to the package root.
///
/// A `PackagePath` never starts with `/` and never contains empty, `.` or `..` components, so
/// joining it onto a destination directory always yields a path inside that directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PackagePath(String);

impl PackagePath {
    /// Normalizes `path`. Returns `None` if the path denotes the package root itself.
    pub fn parse(path: &str) -> Result<Option<Self>, PathViolation> {
        let normalized = normalize(path)?;
        Ok((!normalized.is_empty()).then_some(Self(normalized)))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the directory containing this path, or `None` for top-level members.
    pub fn parent(&self) -> Option<PackagePath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| PackagePath(parent.to_owned()))
    }

    /// Iterates over all proper ancestors of this path, closest first.
    pub fn ancestors(&self) -> impl Iterator<Item = PackagePath> + '_ {
        self.0
            .match_indices('/')
            .map(|(idx, _)| PackagePath(self.0[..idx].to_owned()))
            .rev()
    }

    /// Returns true if this path lies somewhere below the top-level directory `dir`.
    pub fn is_inside(&self, dir: &str) -> bool {
        self.0
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns the location of this path below `root` on the local filesystem.
    pub fn to_native_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(self.0.split('/'));
        path
    }
}

impl Display for PackagePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackagePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PackagePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The number of package symlinks that may be traversed while resolving a single target.
const MAX_SYMLINK_FOLLOWS: usize = 40;

/// Resolves the target of a symlink stored at `link` and checks that it stays inside the package.
///
/// The target is interpreted relative to the directory that contains the link. Whenever a prefix of
/// the resolved path is itself one of the package symlinks in `links`, that symlink's target is
/// substituted before resolution continues, so a chain of links cannot climb out of the root
/// either. On success the normalized location of the target relative to the package root is
/// returned.
pub fn resolve_symlink(
    link: &PackagePath,
    target: &str,
    links: &HashMap<&str, &str>,
) -> Result<String, PathViolation> {
    if target.starts_with('/') {
        return Err(PathViolation::Absolute);
    }

    let mut resolved: Vec<String> = match link.parent() {
        Some(parent) => parent.0.split('/').map(str::to_owned).collect(),
        None => Vec::new(),
    };
    let mut pending: VecDeque<String> = target.split('/').map(str::to_owned).collect();
    let mut follows = 0;

    while let Some(component) = pending.pop_front() {
        if component.is_empty() || component == "." {
            continue;
        }
        if component == ".." {
            if resolved.pop().is_none() {
                return Err(PathViolation::Escapes);
            }
            continue;
        }

        resolved.push(component);
        let Some(next) = links.get(resolved.join("/").as_str()) else {
            continue;
        };

        follows += 1;
        if follows > MAX_SYMLINK_FOLLOWS {
            return Err(PathViolation::TooManyLinks);
        }
        if next.starts_with('/') {
            return Err(PathViolation::Absolute);
        }

        // The link is replaced by its target, which is relative to the link's directory.
        resolved.pop();
        for component in next.split('/').rev() {
            pending.push_front(component.to_owned());
        }
    }

    Ok(resolved.join("/"))
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hooks/install", Ok("hooks/install"))]
    #[case("./hooks//install", Ok("hooks/install"))]
    #[case("hooks/", Ok("hooks"))]
    #[case("src/../metadata.yaml", Ok("metadata.yaml"))]
    #[case(".", Ok(""))]
    #[case("a/b/../..", Ok(""))]
    #[case("../evil", Err(PathViolation::Escapes))]
    #[case("hooks/../../evil", Err(PathViolation::Escapes))]
    #[case("/etc/passwd", Err(PathViolation::Absolute))]
    fn test_normalize(#[case] input: &str, #[case] expected: Result<&str, PathViolation>) {
        assert_eq!(normalize(input), expected.map(String::from));
    }

    #[test]
    fn test_parse_root() {
        assert_eq!(PackagePath::parse("./").unwrap(), None);
        assert_eq!(
            PackagePath::parse("empty/.gitkeep").unwrap().unwrap().as_str(),
            "empty/.gitkeep"
        );
    }

    #[test]
    fn test_ancestors() {
        let path = PackagePath::parse("a/b/c").unwrap().unwrap();
        let ancestors: Vec<_> = path.ancestors().map(|p| p.to_string()).collect();
        assert_eq!(ancestors, ["a/b", "a"]);
        assert_eq!(path.parent().unwrap().as_str(), "a/b");
        assert_eq!(PackagePath::parse("a").unwrap().unwrap().parent(), None);
    }

    #[rstest]
    #[case("hooks/install", true)]
    #[case("hooks/sub/script", true)]
    #[case("hooks", false)]
    #[case("hooks-extra/install", false)]
    #[case("src/hooks/install", false)]
    fn test_is_inside(#[case] path: &str, #[case] expected: bool) {
        let path = PackagePath::parse(path).unwrap().unwrap();
        assert_eq!(path.is_inside("hooks"), expected);
    }

    #[rstest]
    #[case("hooks/symlink", "../target", Ok("target"))]
    #[case("hooks/symlink", "install", Ok("hooks/install"))]
    #[case("hooks/symlink", "..", Ok(""))]
    #[case("top", "src/hello.c", Ok("src/hello.c"))]
    #[case("hooks/badlink", "../../target", Err(PathViolation::Escapes))]
    #[case("top", "../target", Err(PathViolation::Escapes))]
    #[case("hooks/badlink", "/target", Err(PathViolation::Absolute))]
    fn test_resolve_symlink(
        #[case] link: &str,
        #[case] target: &str,
        #[case] expected: Result<&str, PathViolation>,
    ) {
        let link = PackagePath::parse(link).unwrap().unwrap();
        assert_eq!(
            resolve_symlink(&link, target, &HashMap::new()),
            expected.map(String::from)
        );
    }

    #[rstest]
    #[case("z", "hooks/up/..", Err(PathViolation::Escapes))]
    #[case("z", "hooks/up/src", Ok("src"))]
    #[case("z", "hooks/up", Ok(""))]
    #[case("hooks/z", "up/../..", Err(PathViolation::Escapes))]
    #[case("z", "chain/x", Ok("src/x"))]
    #[case("z", "abs/x", Err(PathViolation::Absolute))]
    #[case("z", "loop", Err(PathViolation::TooManyLinks))]
    #[case("z", "hooks/install", Ok("hooks/install"))]
    fn test_resolve_symlink_through_links(
        #[case] link: &str,
        #[case] target: &str,
        #[case] expected: Result<&str, PathViolation>,
    ) {
        let links = HashMap::from([
            ("hooks/up", ".."),
            ("chain", "hooks/up/src"),
            ("abs", "/etc"),
            ("loop", "loop"),
        ]);
        let link = PackagePath::parse(link).unwrap().unwrap();
        assert_eq!(
            resolve_symlink(&link, target, &links),
            expected.map(String::from)
        );
    }

    #[test]
    fn test_to_native_path() {
        let path = PackagePath::parse("src/hello.c").unwrap().unwrap();
        assert_eq!(
            path.to_native_path(Path::new("/tmp/charm")),
            Path::new("/tmp/charm").join("src").join("hello.c")
        );
    }
}
