//! [`ImportArray`]: a file's partitioned view of its imports —
//! `[public | weak | direct | transitive-public]` with three boundary
//! indices, spec.md §3's representation backing §4.5's visibility model.
//!
//! Positions in the array are 1-indexed to match
//! [`crate::table::SymbolRef::file_index`]; position `p`'s entry is
//! `entries()[p - 1]`.

use std::cell::Cell;
use std::collections::HashSet;

use protocompile_base::ImportPath;

/// How a single direct `import` declaration was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectKind {
    Public,
    Weak,
    Plain,
}

/// One slot of an [`ImportArray`].
#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub path: ImportPath,
    /// Re-exported to whatever imports *this* file, i.e. included in
    /// [`ImportArray::reexported_paths`]. True for direct `public`
    /// imports and for every transitive-public entry (itself already
    /// public by construction).
    pub public: bool,
    /// Whether this was a directly-written `import` line, as opposed to
    /// an entry pulled in only because some direct import re-exports it.
    /// Used-import warnings (spec §4.5) apply only to direct, non-public
    /// entries — a transitive-public entry was never itself written in
    /// this file's source, and a public import's whole purpose is
    /// re-export regardless of whether this file's own declarations use it.
    pub direct: bool,
    used: Cell<bool>,
}

impl ImportEntry {
    pub fn is_used(&self) -> bool {
        self.used.get()
    }
}

/// A file's import list, partitioned into direct-public, direct-weak,
/// direct-plain, and transitive-public slices.
#[derive(Debug, Default, Clone)]
pub struct ImportArray {
    entries: Vec<ImportEntry>,
    public_end: usize,
    weak_end: usize,
    direct_end: usize,
}

impl ImportArray {
    /// Builds an array from this file's own directly-written imports plus
    /// the transitive-public closure reachable through them.
    ///
    /// `direct` lists this file's own `import` declarations in source
    /// order. `reexports_of` returns, for a direct import's path, the
    /// paths *it* re-exports (its own `ImportArray::reexported_paths`) —
    /// already resolved, since the driver links dependencies before the
    /// files that import them.
    pub fn build<'a>(
        direct: &[(ImportPath, DirectKind)],
        mut reexports_of: impl FnMut(&ImportPath) -> Box<dyn Iterator<Item = ImportPath> + 'a>,
    ) -> Self {
        let mut entries = Vec::new();
        let mut seen: HashSet<ImportPath> = HashSet::new();

        let mut push_direct = |path: &ImportPath, public: bool, entries: &mut Vec<ImportEntry>| {
            if seen.insert(path.clone()) {
                entries.push(ImportEntry {
                    path: path.clone(),
                    public,
                    direct: true,
                    used: Cell::new(false),
                });
            }
        };
        for (path, _) in direct.iter().filter(|(_, k)| *k == DirectKind::Public) {
            push_direct(path, true, &mut entries);
        }
        let public_end = entries.len();
        for (path, _) in direct.iter().filter(|(_, k)| *k == DirectKind::Weak) {
            push_direct(path, false, &mut entries);
        }
        let weak_end = entries.len();
        for (path, _) in direct.iter().filter(|(_, k)| *k == DirectKind::Plain) {
            push_direct(path, false, &mut entries);
        }
        let direct_end = entries.len();

        // Transitive-public closure: walk every direct import's own
        // re-exports, breadth-first, deduplicating against what's already
        // present anywhere in this array.
        let mut queue: std::collections::VecDeque<ImportPath> = std::collections::VecDeque::new();
        for (path, _) in direct {
            for reexported in reexports_of(path) {
                queue.push_back(reexported);
            }
        }
        while let Some(path) = queue.pop_front() {
            if !seen.insert(path.clone()) {
                continue;
            }
            for further in reexports_of(&path) {
                queue.push_back(further);
            }
            entries.push(ImportEntry {
                path,
                public: true,
                direct: false,
                used: Cell::new(false),
            });
        }

        ImportArray {
            entries,
            public_end,
            weak_end,
            direct_end,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in array order (1-indexed positions `1..=len()`).
    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    pub fn public(&self) -> &[ImportEntry] {
        &self.entries[..self.public_end]
    }

    pub fn weak(&self) -> &[ImportEntry] {
        &self.entries[self.public_end..self.weak_end]
    }

    pub fn direct_plain(&self) -> &[ImportEntry] {
        &self.entries[self.weak_end..self.direct_end]
    }

    pub fn direct(&self) -> &[ImportEntry] {
        &self.entries[..self.direct_end]
    }

    pub fn transitive_public(&self) -> &[ImportEntry] {
        &self.entries[self.direct_end..]
    }

    /// The 1-indexed position of `path` in this array, matching
    /// [`crate::table::SymbolRef::file_index`]'s convention.
    pub fn position_of(&self, path: &ImportPath) -> Option<i32> {
        self.entries
            .iter()
            .position(|e| &e.path == path)
            .map(|i| (i + 1) as i32)
    }

    /// Inverse of [`ImportArray::position_of`].
    pub fn path_at(&self, file_index: i32) -> Option<&ImportPath> {
        if file_index <= 0 {
            return None;
        }
        self.entries.get((file_index - 1) as usize).map(|e| &e.path)
    }

    pub fn entry_at(&self, file_index: i32) -> Option<&ImportEntry> {
        if file_index <= 0 {
            return None;
        }
        self.entries.get((file_index - 1) as usize)
    }

    /// Records that a symbol belonging to `file_index`'s file was
    /// actually resolved to — drives the "import not used" warning.
    pub fn mark_used(&self, file_index: i32) {
        if let Some(entry) = self.entry_at(file_index) {
            entry.used.set(true);
        }
    }

    /// Paths this file re-exports to whatever imports it: its own public
    /// direct imports plus its whole transitive-public closure (already
    /// public by construction).
    pub fn reexported_paths(&self) -> impl Iterator<Item = ImportPath> + '_ {
        self.entries.iter().filter(|e| e.public).map(|e| e.path.clone())
    }

    /// Direct, non-public entries never marked used — candidates for an
    /// "import \"X\" not used" warning. Public imports are excluded since
    /// their purpose is re-export regardless of local use; transitive
    /// entries are excluded since they were never directly written here.
    pub fn unused_candidates(&self) -> impl Iterator<Item = &ImportEntry> {
        self.entries
            .iter()
            .filter(|e| e.direct && !e.public && !e.is_used())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_reexports<'a>(_: &ImportPath) -> Box<dyn Iterator<Item = ImportPath> + 'a> {
        Box::new(std::iter::empty())
    }

    #[test]
    fn partitions_come_out_public_weak_plain_transitive() {
        let direct = vec![
            (ImportPath::new("w.proto"), DirectKind::Weak),
            (ImportPath::new("pub.proto"), DirectKind::Public),
            (ImportPath::new("p.proto"), DirectKind::Plain),
        ];
        let array = ImportArray::build(&direct, empty_reexports);
        assert_eq!(array.public().len(), 1);
        assert_eq!(array.public()[0].path, ImportPath::new("pub.proto"));
        assert_eq!(array.weak().len(), 1);
        assert_eq!(array.direct_plain().len(), 1);
        assert_eq!(array.transitive_public().len(), 0);
    }

    #[test]
    fn transitive_public_closure_pulled_in_from_a_public_direct_import() {
        let direct = vec![(ImportPath::new("mid.proto"), DirectKind::Public)];
        let array = ImportArray::build(&direct, |path| {
            if path.as_str() == "mid.proto" {
                Box::new(std::iter::once(ImportPath::new("base.proto")))
            } else {
                Box::new(std::iter::empty())
            }
        });
        assert_eq!(array.transitive_public().len(), 1);
        assert_eq!(array.transitive_public()[0].path, ImportPath::new("base.proto"));
        assert!(array.transitive_public()[0].public);
    }

    #[test]
    fn each_path_appears_at_most_once() {
        let direct = vec![
            (ImportPath::new("a.proto"), DirectKind::Public),
            (ImportPath::new("b.proto"), DirectKind::Public),
        ];
        let array = ImportArray::build(&direct, |path| {
            if path.as_str() == "a.proto" || path.as_str() == "b.proto" {
                Box::new(std::iter::once(ImportPath::new("shared.proto")))
            } else {
                Box::new(std::iter::empty())
            }
        });
        assert_eq!(
            array.entries().iter().filter(|e| e.path == ImportPath::new("shared.proto")).count(),
            1
        );
    }

    #[test]
    fn position_of_and_path_at_round_trip() {
        let direct = vec![(ImportPath::new("a.proto"), DirectKind::Plain)];
        let array = ImportArray::build(&direct, empty_reexports);
        let pos = array.position_of(&ImportPath::new("a.proto")).unwrap();
        assert_eq!(pos, 1);
        assert_eq!(array.path_at(pos), Some(&ImportPath::new("a.proto")));
    }

    #[test]
    fn unused_candidates_excludes_public_and_transitive_entries() {
        let direct = vec![
            (ImportPath::new("pub.proto"), DirectKind::Public),
            (ImportPath::new("plain.proto"), DirectKind::Plain),
        ];
        let array = ImportArray::build(&direct, empty_reexports);
        let unused: Vec<_> = array.unused_candidates().map(|e| e.path.clone()).collect();
        assert_eq!(unused, vec![ImportPath::new("plain.proto")]);
    }

    #[test]
    fn mark_used_is_reflected_in_unused_candidates() {
        let direct = vec![(ImportPath::new("plain.proto"), DirectKind::Plain)];
        let array = ImportArray::build(&direct, empty_reexports);
        let pos = array.position_of(&ImportPath::new("plain.proto")).unwrap();
        array.mark_used(pos);
        assert_eq!(array.unused_candidates().count(), 0);
    }

    #[test]
    fn reexported_paths_includes_public_direct_and_transitive() {
        let direct = vec![(ImportPath::new("mid.proto"), DirectKind::Public)];
        let array = ImportArray::build(&direct, |path| {
            if path.as_str() == "mid.proto" {
                Box::new(std::iter::once(ImportPath::new("base.proto")))
            } else {
                Box::new(std::iter::empty())
            }
        });
        let mut paths: Vec<_> = array.reexported_paths().collect();
        paths.sort();
        let mut expected = vec![ImportPath::new("mid.proto"), ImportPath::new("base.proto")];
        expected.sort();
        assert_eq!(paths, expected);
    }
}
