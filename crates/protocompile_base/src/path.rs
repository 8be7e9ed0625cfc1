//! Canonical import paths.
//!
//! Protobuf import paths are forward-slash separated regardless of host
//! platform, and are compared and hashed as the primary key for a file
//! throughout a compilation (the task map, the import array, the diagnostic
//! "imported from" notes). [`ImportPath`] normalizes once at construction so
//! every later comparison is a plain string comparison.

use std::borrow::Borrow;
use std::fmt;

/// A canonical forward-slash file path, used as the primary key for files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportPath(String);

impl ImportPath {
    /// Builds a canonical path from any OS-flavored or already-canonical
    /// input, replacing backslashes and collapsing `./` segments.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        let mut out = String::with_capacity(raw.len());
        for (i, segment) in raw.replace('\\', "/").split('/').enumerate() {
            if segment.is_empty() || segment == "." {
                continue;
            }
            if i > 0 && !out.is_empty() {
                out.push('/');
            }
            out.push_str(segment);
        }
        ImportPath(out)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for ImportPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImportPath {
    fn from(s: &str) -> Self {
        ImportPath::new(s)
    }
}

impl From<String> for ImportPath {
    fn from(s: String) -> Self {
        ImportPath::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(ImportPath::new("a\\b\\c.proto").as_str(), "a/b/c.proto");
    }

    #[test]
    fn collapses_dot_segments() {
        assert_eq!(ImportPath::new("./a/./b.proto").as_str(), "a/b.proto");
    }

    #[test]
    fn collapses_duplicate_separators() {
        assert_eq!(ImportPath::new("a//b.proto").as_str(), "a/b.proto");
    }

    #[test]
    fn equal_after_normalization_compares_equal() {
        assert_eq!(ImportPath::new("a/b.proto"), ImportPath::new("a\\b.proto"));
    }

    #[test]
    fn display_prints_canonical_form() {
        let path = ImportPath::new("x/y.proto");
        assert_eq!(format!("{}", path), "x/y.proto");
    }
}
