//! A filesystem-backed [`Resolver`]: searches an ordered list of import
//! roots for each requested path, the way `protoc` and `buf` do.

use std::fs::File;
use std::path::{Path, PathBuf};

use protocompile_base::ImportPath;
use protocompile_diag::CompileError;
use protocompile_driver::{Resolver, SearchResult};

/// Resolves import paths against a fixed, ordered list of root
/// directories. The first root whose `root.join(path)` both exists and
/// canonicalizes to somewhere underneath that root (never escaping it
/// via `../` segments) wins; later roots are tried only if an earlier
/// one doesn't have the file.
pub struct FsResolver {
    roots: Vec<PathBuf>,
}

impl FsResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        FsResolver { roots }
    }

    fn resolve_under(&self, root: &Path, path: &ImportPath) -> Option<Result<SearchResult, CompileError>> {
        let candidate = root.join(path.as_str());
        if !candidate.is_file() {
            return None;
        }

        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        match candidate.canonicalize() {
            Ok(canonical) if !canonical.starts_with(&canonical_root) => {
                return Some(Err(CompileError::Resolver {
                    path: path.as_str().to_string(),
                    message: format!("path escapes import root \"{}\"", root.display()),
                }));
            }
            _ => {}
        }

        Some(File::open(&candidate).map_err(|err| CompileError::Resolver {
            path: path.as_str().to_string(),
            message: err.to_string(),
        }).map(|file| SearchResult::Source {
            reader: Box::new(file),
            closer: None,
        }))
    }
}

impl Resolver for FsResolver {
    fn resolve(&self, path: &ImportPath) -> Result<SearchResult, CompileError> {
        for root in &self.roots {
            if let Some(result) = self.resolve_under(root, path) {
                return result;
            }
        }
        Err(CompileError::Resolver {
            path: path.as_str().to_string(),
            message: format!(
                "not found in any of {} import root(s)",
                self.roots.len()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn finds_a_file_directly_under_the_root() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.proto", "message M {}");

        let resolver = FsResolver::new(vec![dir.path().to_path_buf()]);
        let result = resolver.resolve(&ImportPath::new("a.proto"));
        assert!(matches!(result, Ok(SearchResult::Source { .. })));
    }

    #[test]
    fn falls_through_to_a_later_root() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_file(second.path(), "b.proto", "message M {}");

        let resolver = FsResolver::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let result = resolver.resolve(&ImportPath::new("b.proto"));
        assert!(matches!(result, Ok(SearchResult::Source { .. })));
    }

    #[test]
    fn missing_path_is_a_resolver_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsResolver::new(vec![dir.path().to_path_buf()]);
        let result = resolver.resolve(&ImportPath::new("missing.proto"));
        assert!(matches!(result, Err(CompileError::Resolver { .. })));
    }

    #[test]
    fn rejects_a_path_that_escapes_the_root_via_dot_dot() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        write_file(outside.path(), "secret.proto", "message Secret {}");
        let escaping = format!("../{}/secret.proto", outside.path().file_name().unwrap().to_str().unwrap());

        let resolver = FsResolver::new(vec![root.path().to_path_buf()]);
        let result = resolver.resolve(&ImportPath::new(&escaping));
        assert!(matches!(result, Err(CompileError::Resolver { .. })));
    }
}
