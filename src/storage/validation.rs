//! Path validation
//!
//! Resolves client-supplied paths against a session's working directory into
//! normalized, root-confined virtual paths.

use std::fmt;
use std::path::PathBuf;

use crate::error::StorageError;

/// Deepest directory nesting a virtual path may have
pub const MAX_DIRECTORY_DEPTH: usize = 64;

/// A normalized absolute path inside the session root.
///
/// Always starts with `/`, never has a trailing slash (except the root
/// itself) and never contains empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath(String);

impl VirtualPath {
    pub fn root() -> Self {
        VirtualPath("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Parent directory; the root is its own parent.
    pub fn parent(&self) -> VirtualPath {
        match self.0.rfind('/') {
            Some(0) | None => VirtualPath::root(),
            Some(idx) => VirtualPath(self.0[..idx].to_string()),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Path relative to the root, suitable for joining onto a backend root
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments().collect()
    }

    fn from_segments(segments: &[&str]) -> Self {
        VirtualPath(format!("/{}", segments.join("/")))
    }
}

impl Default for VirtualPath {
    fn default() -> Self {
        VirtualPath::root()
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve `client_path` against `cwd`.
///
/// Absolute arguments start from the root. An empty argument resolves to
/// `cwd`. Fails with `InvalidPath` when a `..` segment would climb above the
/// root, when the argument contains NUL or backslash characters, or when the
/// result is nested deeper than `MAX_DIRECTORY_DEPTH`.
pub fn resolve(cwd: &VirtualPath, client_path: &str) -> Result<VirtualPath, StorageError> {
    if client_path.contains(['\0', '\\']) {
        return Err(StorageError::InvalidPath(client_path.to_string()));
    }

    let mut segments: Vec<&str> = if client_path.starts_with('/') {
        Vec::new()
    } else {
        cwd.segments().collect()
    };

    for segment in client_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::InvalidPath(client_path.to_string()));
                }
            }
            name => segments.push(name),
        }
    }

    if segments.len() > MAX_DIRECTORY_DEPTH {
        return Err(StorageError::InvalidPath(client_path.to_string()));
    }

    Ok(VirtualPath::from_segments(&segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vp(s: &str) -> VirtualPath {
        resolve(&VirtualPath::root(), s).unwrap()
    }

    #[test]
    fn relative_and_absolute() {
        let cwd = vp("/docs");
        assert_eq!(resolve(&cwd, "a.txt").unwrap().as_str(), "/docs/a.txt");
        assert_eq!(resolve(&cwd, "/a.txt").unwrap().as_str(), "/a.txt");
        assert_eq!(resolve(&cwd, "").unwrap(), cwd);
        assert_eq!(resolve(&cwd, ".").unwrap(), cwd);
    }

    #[test]
    fn normalizes_redundant_segments() {
        let cwd = vp("/a");
        assert_eq!(resolve(&cwd, "b//c/./d/").unwrap().as_str(), "/a/b/c/d");
        assert_eq!(resolve(&cwd, "b/../c").unwrap().as_str(), "/a/c");
        assert_eq!(resolve(&cwd, "..").unwrap(), VirtualPath::root());
    }

    #[test]
    fn rejects_escape_above_root() {
        assert!(matches!(
            resolve(&VirtualPath::root(), ".."),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(resolve(&vp("/a/b"), "../../..").is_err());
        assert!(resolve(&vp("/a"), "/../etc/passwd").is_err());
        assert!(resolve(&vp("/a"), "x/../../../etc").is_err());
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(resolve(&VirtualPath::root(), "..\\..\\windows").is_err());
        assert!(resolve(&VirtualPath::root(), "a\0b").is_err());
    }

    #[test]
    fn percent_encoding_is_literal() {
        let p = resolve(&VirtualPath::root(), "%2e%2e/%2e%2e/etc").unwrap();
        assert_eq!(p.as_str(), "/%2e%2e/%2e%2e/etc");
    }

    #[test]
    fn rejects_excessive_depth() {
        let deep = vec!["d"; MAX_DIRECTORY_DEPTH + 1].join("/");
        assert!(resolve(&VirtualPath::root(), &deep).is_err());
    }

    #[test]
    fn parent_and_file_name() {
        let p = vp("/a/b/c.txt");
        assert_eq!(p.parent().as_str(), "/a/b");
        assert_eq!(p.file_name(), Some("c.txt"));
        assert_eq!(vp("/a").parent(), VirtualPath::root());
        assert_eq!(VirtualPath::root().parent(), VirtualPath::root());
        assert_eq!(VirtualPath::root().file_name(), None);
        assert_eq!(p.to_relative_path(), PathBuf::from("a/b/c.txt"));
    }

    #[test]
    fn walks_never_leave_root() {
        // Every mix of descending and climbing stays rooted or is rejected.
        let moves = ["sub", "..", "x/y", "../..", "/", "a/../b", "..", ".."];
        let mut cwd = VirtualPath::root();
        for step in moves.iter().cycle().take(200) {
            if let Ok(next) = resolve(&cwd, step) {
                assert!(next.as_str().starts_with('/'));
                assert!(!next.segments().any(|s| s == ".." || s == "."));
                cwd = next;
            }
        }
    }
}
