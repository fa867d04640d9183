//! Path jail: maps untrusted request paths onto the served root directory.
//!
//! Every filesystem operation in the server receives its path from
//! [`PathJail`]. Resolution is purely lexical: `.` and empty segments are
//! dropped, `..` pops one segment, and any `..` that would climb above the
//! root is rejected with [`StoreError::InvalidPath`] instead of being clamped.
//! The joined result is then checked again for containment before it is
//! handed out.

use crate::error::StoreError;
use std::fmt;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

/// An absolute path proven to lie inside the jail root.
///
/// Only [`PathJail`] constructs these; file store operations accept nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    relative: String,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Normalized root-relative form, used in messages and logs.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Final path component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

impl Deref for ResolvedPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl PartialEq<PathBuf> for ResolvedPath {
    fn eq(&self, other: &PathBuf) -> bool {
        &self.path == other
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.relative)
    }
}

/// Strip a query string and fragment from a request path.
pub fn strip_query(request_path: &str) -> &str {
    let end = request_path.find(['?', '#']).unwrap_or(request_path.len());
    &request_path[..end]
}

/// Resolves request paths to absolute paths confined to a root directory.
#[derive(Debug, Clone)]
pub struct PathJail {
    root: PathBuf,
    index: String,
}

impl PathJail {
    /// Create a jail over `root`, serving `index` for the empty path.
    ///
    /// `root` should already be absolute; it is never modified afterwards.
    pub fn new(root: impl Into<PathBuf>, index: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index: index.into(),
        }
    }

    /// The jail root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the default document.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Resolve a request path to a file path inside the root.
    ///
    /// The empty path (and `/`) resolves to the default document.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, StoreError> {
        let segments = confine(request_path)?;
        if segments.is_empty() {
            return self.join(request_path, &[self.index.as_str()]);
        }
        self.join(request_path, &segments)
    }

    /// Resolve a request path to a directory inside the root.
    ///
    /// Unlike [`PathJail::resolve`], the empty path resolves to the root itself.
    pub fn resolve_dir(&self, request_path: &str) -> Result<ResolvedPath, StoreError> {
        let segments = confine(request_path)?;
        self.join(request_path, &segments)
    }

    fn join(&self, request_path: &str, segments: &[&str]) -> Result<ResolvedPath, StoreError> {
        let mut resolved = self.root.clone();
        for segment in segments {
            resolved.push(segment);
        }

        // A segment can still carry platform meaning (a drive prefix on
        // Windows), so the joined path is checked component by component.
        let contained = resolved
            .strip_prefix(&self.root)
            .map(|rel| rel.components().all(|c| matches!(c, Component::Normal(_))))
            .unwrap_or(false);

        if contained {
            Ok(ResolvedPath {
                path: resolved,
                relative: segments.join("/"),
            })
        } else {
            Err(StoreError::InvalidPath(request_path.to_string()))
        }
    }
}

/// Normalize a request path into root-relative segments.
///
/// Returns `InvalidPath` if the path climbs above the root at any point.
fn confine(request_path: &str) -> Result<Vec<&str>, StoreError> {
    let relative = strip_query(request_path).trim_start_matches('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StoreError::InvalidPath(request_path.to_string()));
                }
            }
            s if s.contains('\0') || s.contains('\\') => {
                return Err(StoreError::InvalidPath(request_path.to_string()));
            }
            s => segments.push(s),
        }
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jail() -> PathJail {
        PathJail::new("/srv/www", "index.html")
    }

    fn assert_inside(resolved: &Path) {
        let rel = resolved
            .strip_prefix("/srv/www")
            .expect("resolved path must stay under the root");
        assert!(rel
            .components()
            .all(|c| matches!(c, Component::Normal(_))));
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("/a/b.txt?x=1"), "/a/b.txt");
        assert_eq!(strip_query("/a/b.txt#top"), "/a/b.txt");
        assert_eq!(strip_query("/a?x=1#top"), "/a");
        assert_eq!(strip_query("/a#frag?x"), "/a");
        assert_eq!(strip_query("/plain"), "/plain");
        assert_eq!(strip_query(""), "");
    }

    #[test]
    fn test_empty_resolves_to_index() {
        let jail = jail();
        assert_eq!(
            jail.resolve("").unwrap(),
            PathBuf::from("/srv/www/index.html")
        );
        assert_eq!(
            jail.resolve("/").unwrap(),
            PathBuf::from("/srv/www/index.html")
        );
        assert_eq!(
            jail.resolve("///").unwrap(),
            PathBuf::from("/srv/www/index.html")
        );
        assert_eq!(
            jail.resolve("/?list=x").unwrap(),
            PathBuf::from("/srv/www/index.html")
        );
    }

    #[test]
    fn test_resolve_dir_empty_is_root() {
        let jail = jail();
        assert_eq!(jail.resolve_dir("").unwrap(), PathBuf::from("/srv/www"));
        assert_eq!(jail.resolve_dir("/").unwrap(), PathBuf::from("/srv/www"));
        assert_eq!(
            jail.resolve_dir("sub/").unwrap(),
            PathBuf::from("/srv/www/sub")
        );
    }

    #[test]
    fn test_relative_form() {
        let jail = jail();
        let resolved = jail.resolve("/a//./b/../c.txt?x").unwrap();
        assert_eq!(resolved.relative(), "a/c.txt");
        assert_eq!(resolved.file_name(), Some("c.txt"));
        assert_eq!(resolved.to_string(), "/a/c.txt");
        assert_eq!(jail.resolve("").unwrap().relative(), "index.html");
        assert_eq!(jail.resolve_dir("").unwrap().relative(), "");
    }

    #[test]
    fn test_plain_paths() {
        let jail = jail();
        assert_eq!(
            jail.resolve("notes.txt").unwrap(),
            PathBuf::from("/srv/www/notes.txt")
        );
        assert_eq!(
            jail.resolve("/a/b/c.bin").unwrap(),
            PathBuf::from("/srv/www/a/b/c.bin")
        );
        assert_eq!(
            jail.resolve("//a//b/./c.bin").unwrap(),
            PathBuf::from("/srv/www/a/b/c.bin")
        );
        assert_eq!(
            jail.resolve("/a/b.txt?edit=1#x").unwrap(),
            PathBuf::from("/srv/www/a/b.txt")
        );
    }

    #[test]
    fn test_dot_dot_within_root() {
        let jail = jail();
        assert_eq!(
            jail.resolve("a/../b.txt").unwrap(),
            PathBuf::from("/srv/www/b.txt")
        );
        assert_eq!(
            jail.resolve("a/b/../../c.txt").unwrap(),
            PathBuf::from("/srv/www/c.txt")
        );
        // Climbing back to the root is allowed; the index is substituted.
        assert_eq!(
            jail.resolve("a/..").unwrap(),
            PathBuf::from("/srv/www/index.html")
        );
    }

    #[test]
    fn test_escape_rejected() {
        let jail = jail();
        for input in [
            "..",
            "/..",
            "../etc/passwd",
            "/../etc/passwd",
            "a/../../etc/passwd",
            "a/b/../../../x",
            "./../x",
            "//..//..//x",
            "../srv/www/x",
            "a/../..",
            "..?list=1",
        ] {
            let err = jail.resolve(input).unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidPath(_)),
                "expected InvalidPath for {:?}, got {:?}",
                input,
                err
            );
            assert!(jail.resolve_dir(input).is_err(), "dir escape for {:?}", input);
        }
    }

    #[test]
    fn test_escape_rejected_even_when_it_returns_inside() {
        // Net depth is non-negative but the path dips above the root first.
        let jail = jail();
        assert!(matches!(
            jail.resolve("../www/x"),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_absolute_looking_prefixes_stay_inside() {
        let jail = jail();
        assert_eq!(
            jail.resolve("/etc/passwd").unwrap(),
            PathBuf::from("/srv/www/etc/passwd")
        );
        assert_eq!(
            jail.resolve("////etc/passwd").unwrap(),
            PathBuf::from("/srv/www/etc/passwd")
        );
    }

    #[test]
    fn test_backslash_and_nul_rejected() {
        let jail = jail();
        assert!(matches!(
            jail.resolve("..\\..\\etc\\passwd"),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            jail.resolve("a\0b"),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_dotted_names_are_ordinary() {
        let jail = jail();
        assert_eq!(
            jail.resolve("...").unwrap(),
            PathBuf::from("/srv/www/...")
        );
        assert_eq!(
            jail.resolve("..hidden").unwrap(),
            PathBuf::from("/srv/www/..hidden")
        );
        assert_eq!(
            jail.resolve(".config/x").unwrap(),
            PathBuf::from("/srv/www/.config/x")
        );
    }

    #[test]
    fn test_never_outside_root_for_generated_inputs() {
        let jail = jail();
        let parts = ["..", ".", "", "a", "b", "/", "//", "../..", "a/.."];
        for first in parts {
            for second in parts {
                for third in parts {
                    let input = format!("{}/{}/{}", first, second, third);
                    match jail.resolve(&input) {
                        Ok(resolved) => assert_inside(resolved.as_path()),
                        Err(StoreError::InvalidPath(_)) => {}
                        Err(other) => panic!("unexpected error for {:?}: {:?}", input, other),
                    }
                    match jail.resolve_dir(&input) {
                        Ok(resolved) => assert!(resolved.starts_with("/srv/www")),
                        Err(StoreError::InvalidPath(_)) => {}
                        Err(other) => panic!("unexpected error for {:?}: {:?}", input, other),
                    }
                }
            }
        }
    }
}
