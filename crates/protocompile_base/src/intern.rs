//! Process-local string interning.
//!
//! [`InternId`] is a small integer handle standing in for a uniquely stored
//! byte string. Comparing two identifiers is an integer comparison regardless
//! of how long the underlying string is, which matters for a compiler that
//! compares fully-qualified names constantly during symbol resolution.
//!
//! Interning is monotonic: once a string is interned it keeps its id for the
//! lifetime of the [`Interner`], and ids are never reused even if the
//! matching entry becomes unreachable.
//!
//! [`Interner`] is single-threaded. [`SharedInterner`] wraps one behind a
//! `RwLock` so every file's compilation task can intern names concurrently:
//! reads (`resolve`, a cache-hit `intern`) take the read lock, and only a
//! genuinely new string pays for the write lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A handle to an interned string.
///
/// `InternId::NONE` (zero) represents "no string", matching the convention
/// used for absent optional names throughout the AST and IR. Every other
/// value names an entry produced by some [`Interner::intern`] call.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct InternId(u32);

impl InternId {
    /// The "no string" sentinel. Never returned for an interned string.
    pub const NONE: InternId = InternId(0);

    /// Raw numeric value, useful for dense side-table indexing.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns `true` for the `NONE` sentinel.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for InternId {
    fn default() -> Self {
        Self::NONE
    }
}

/// A single-threaded string interner.
pub struct Interner {
    map: HashMap<Box<str>, InternId>,
    strings: Vec<Box<str>>,
}

impl Interner {
    /// Creates an interner with nothing but the `NONE` sentinel pre-seeded.
    pub fn new() -> Self {
        Interner {
            map: HashMap::new(),
            strings: vec![Box::from("")],
        }
    }

    /// Interns a string, returning its existing id if already present.
    pub fn intern(&mut self, s: &str) -> InternId {
        if let Some(&id) = self.map.get(s) {
            return id;
        }
        let id = InternId(self.strings.len() as u32);
        let boxed: Box<str> = Box::from(s);
        self.strings.push(boxed.clone());
        self.map.insert(boxed, id);
        id
    }

    /// Resolves an id back to its string.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this interner.
    pub fn resolve(&self, id: InternId) -> &str {
        &self.strings[id.as_u32() as usize]
    }

    /// Looks up a string without interning it if absent.
    pub fn lookup(&self, s: &str) -> Option<InternId> {
        self.map.get(s).copied()
    }

    /// Number of interned strings, including the `NONE` sentinel.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// `true` if nothing beyond the `NONE` sentinel has been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe handle to an [`Interner`], shared across every compilation
/// task in a single driver run.
///
/// Cloning a `SharedInterner` clones the `Arc`, not the underlying table —
/// all clones observe the same interned strings.
#[derive(Clone)]
pub struct SharedInterner {
    inner: Arc<RwLock<Interner>>,
}

impl SharedInterner {
    /// Creates a fresh, empty shared interner.
    pub fn new() -> Self {
        SharedInterner {
            inner: Arc::new(RwLock::new(Interner::new())),
        }
    }

    /// Interns a string. Takes only a read lock on the common case where the
    /// string is already present; otherwise upgrades to a write lock.
    pub fn intern(&self, s: &str) -> InternId {
        if let Some(id) = self.inner.read().unwrap().lookup(s) {
            return id;
        }
        self.inner.write().unwrap().intern(s)
    }

    /// Resolves an id to an owned string.
    ///
    /// Returns an owned `String` rather than a borrow: the read lock cannot
    /// outlive the call, and interned strings are cheap to clone relative to
    /// the cost of threading a lock guard through the caller's lifetime.
    pub fn resolve(&self, id: InternId) -> String {
        self.inner.read().unwrap().resolve(id).to_string()
    }

    /// Looks up a string without interning it if absent.
    pub fn lookup(&self, s: &str) -> Option<InternId> {
        self.inner.read().unwrap().lookup(s)
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience trait for comparing an [`InternId`] to a string literal
/// without manually resolving it first.
pub trait InternIdExt {
    /// Returns `true` if this id resolves to `s` in `interner`.
    fn is(&self, interner: &Interner, s: &str) -> bool;
}

impl InternIdExt for InternId {
    #[inline]
    fn is(&self, interner: &Interner, s: &str) -> bool {
        !self.is_none() && interner.resolve(*self) == s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_same_id_for_same_string() {
        let mut interner = Interner::new();
        let a = interner.intern("foo.Bar");
        let b = interner.intern("foo.Bar");
        assert_eq!(a, b);
    }

    #[test]
    fn intern_returns_different_ids_for_different_strings() {
        let mut interner = Interner::new();
        let a = interner.intern("foo.Bar");
        let b = interner.intern("foo.Baz");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_roundtrips() {
        let mut interner = Interner::new();
        let id = interner.intern("package.Message");
        assert_eq!(interner.resolve(id), "package.Message");
    }

    #[test]
    fn none_is_empty_string() {
        let interner = Interner::new();
        assert_eq!(interner.resolve(InternId::NONE), "");
        assert!(InternId::NONE.is_none());
    }

    #[test]
    fn lookup_does_not_insert() {
        let mut interner = Interner::new();
        assert_eq!(interner.lookup("missing"), None);
        assert!(interner.is_empty());
        interner.intern("present");
        assert_eq!(interner.lookup("present"), Some(interner.lookup("present").unwrap()));
    }

    #[test]
    fn is_ext_compares_against_literal() {
        let mut interner = Interner::new();
        let id = interner.intern("Widget");
        assert!(id.is(&interner, "Widget"));
        assert!(!id.is(&interner, "Gadget"));
    }

    #[test]
    fn shared_interner_concurrent_reads_and_writes() {
        use std::thread;

        let shared = SharedInterner::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let shared = shared.clone();
            handles.push(thread::spawn(move || shared.intern(&format!("sym{}", i % 4))));
        }
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        // Same symbol from different threads interns to the same id.
        assert_eq!(ids[0], ids[4]);
        assert_eq!(shared.resolve(ids[0]), "sym0");
    }

    #[test]
    fn shared_interner_lookup_without_insert() {
        let shared = SharedInterner::new();
        assert_eq!(shared.lookup("nope"), None);
        let id = shared.intern("yep");
        assert_eq!(shared.lookup("yep"), Some(id));
    }
}
