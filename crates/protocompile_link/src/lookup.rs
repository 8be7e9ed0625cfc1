//! Protobuf's nested-scope name resolution (spec.md §4.5): the five-step
//! `Lookup(scope, name, accept)` search that underlies every field type,
//! extendee, method signature, and option-extension reference a `.proto`
//! file can write.
//!
//! A bare (non-leading-dot) name is resolved relative to the scope it's
//! written in: `Lookup` tries the innermost candidate first, then climbs
//! outward one enclosing scope at a time, the same order `protoc` walks
//! nested C++ namespaces. A leading-dot name is already absolute and
//! skips the climb entirely.

use protocompile_base::{InternId, SharedInterner};
use protocompile_ir::{File, SymbolKind, SymbolRef};

/// The outcome of a [`lookup`] call.
pub enum LookupResult {
    /// Resolved to a symbol `accept` was willing to take.
    Found(SymbolRef),
    /// Nothing of any kind matched `name` from `scope` at all.
    NotFound,
    /// Something named `name` exists and would be reachable from `scope`,
    /// but `accept` rejected every candidate found — e.g. a message name
    /// used where only enums are acceptable. Carries the rejected
    /// candidate so the caller can build a precise diagnostic.
    WrongKind(SymbolRef),
}

/// Resolves `name` (dotted or not, possibly leading-dot-absolute) against
/// `scope` (the interned FQN of the message/package the reference
/// appears in, or `InternId::NONE` for the file's root package) by
/// searching `table`.
///
/// `accept` filters candidates by [`SymbolKind`] — e.g. field type
/// resolution accepts `is_type()` kinds, extendee resolution accepts only
/// `Message`. Spec §4.5 step 5: if every candidate search fails to find
/// anything `accept` takes, the whole search reruns once more without the
/// filter, purely to produce a "found, but the wrong kind" diagnostic;
/// that relaxed result is never treated as success.
pub fn lookup(
    interner: &SharedInterner,
    table: &LookupTable<'_>,
    scope: InternId,
    name: &str,
    accept: impl Fn(SymbolKind) -> bool,
) -> LookupResult {
    if let Some(absolute) = name.strip_prefix('.') {
        return match search_absolute(interner, table, absolute, &accept) {
            Some(hit) => LookupResult::Found(hit),
            None => match search_absolute(interner, table, absolute, &|_| true) {
                Some(hit) => LookupResult::WrongKind(hit),
                None => LookupResult::NotFound,
            },
        };
    }

    match climb(interner, table, scope, name, &accept) {
        Some(hit) => LookupResult::Found(hit),
        None => match climb(interner, table, scope, name, &|_| true) {
            Some(hit) => LookupResult::WrongKind(hit),
            None => LookupResult::NotFound,
        },
    }
}

/// A name already known to be fully qualified: search the table directly,
/// no climbing.
fn search_absolute(
    interner: &SharedInterner,
    table: &LookupTable<'_>,
    name: &str,
    accept: &impl Fn(SymbolKind) -> bool,
) -> Option<SymbolRef> {
    let fqn = interner.lookup(name)?;
    table.find(fqn, accept)
}

/// Spec §4.5 steps 1-4: starting at `scope`, try the candidate built from
/// `scope` and the first dotted component of `name`; climb outward by
/// stripping `scope`'s own last component on failure; repeat until `scope`
/// is exhausted (the file's root package).
fn climb(
    interner: &SharedInterner,
    table: &LookupTable<'_>,
    scope: InternId,
    name: &str,
    accept: &impl Fn(SymbolKind) -> bool,
) -> Option<SymbolRef> {
    let first_component = name.split('.').next().unwrap_or(name);
    let mut current_scope = scope;
    loop {
        let candidate = join(interner, current_scope, first_component);
        if let Some(fqn) = interner.lookup(&candidate) {
            if let Some(hit) = table.find(fqn, |k| k.is_scope()) {
                // The prefix resolved to a scope-defining ancestor
                // (Package or Message): if `name` has further
                // components, re-resolve the full dotted name against
                // that scope directly rather than continuing to climb.
                if name.contains('.') {
                    let full = join(interner, hit.fqn, &name[first_component.len() + 1..]);
                    if let Some(full_fqn) = interner.lookup(&full) {
                        if let Some(found) = table.find(full_fqn, accept) {
                            return Some(found);
                        }
                    }
                } else if accept(hit.kind(table)) {
                    return Some(hit);
                }
            } else if !name.contains('.') {
                // Single-component name: accept a non-scope hit too
                // (e.g. a field type naming a scalar-adjacent message
                // or enum defined directly in `current_scope`).
                if let Some(found) = table.find(fqn, accept) {
                    return Some(found);
                }
            }
        }
        if current_scope.is_none() {
            return None;
        }
        current_scope = strip_last_component(interner, current_scope);
    }
}

fn join(interner: &SharedInterner, scope: InternId, name: &str) -> String {
    if scope.is_none() {
        name.to_string()
    } else {
        format!("{}.{}", interner.resolve(scope), name)
    }
}

/// Strips the last dotted component off `scope`'s own name, interning the
/// shortened prefix — or `InternId::NONE` if `scope` had no further
/// ancestor to climb to.
fn strip_last_component(interner: &SharedInterner, scope: InternId) -> InternId {
    let text = interner.resolve(scope);
    match text.rfind('.') {
        Some(at) => interner.intern(&text[..at]),
        None => InternId::NONE,
    }
}

/// A view over a file's own (already-merged) symbol table, bundled with
/// what [`climb`] needs to fetch a hit's [`SymbolKind`] without a second
/// round trip through `File::resolve`.
pub struct LookupTable<'a> {
    pub file: &'a File,
    pub dependencies: &'a [&'a File],
}

impl<'a> LookupTable<'a> {
    pub fn new(file: &'a File, dependencies: &'a [&'a File]) -> Self {
        LookupTable { file, dependencies }
    }

    /// Marks `sref`'s owning import entry used, if it's a foreign symbol —
    /// drives the unused-import warning (spec §4.5). Call once a search
    /// actually resolves to a symbol, not for every candidate probed.
    pub fn mark_used(&self, sref: &SymbolRef) {
        if !sref.is_local() {
            self.file.imports.mark_used(sref.file_index);
        }
    }

    fn find(&self, fqn: InternId, accept: impl Fn(SymbolKind) -> bool) -> Option<SymbolRef> {
        self.file
            .symbols
            .entries_with_fqn(fqn)
            .iter()
            .find(|&sref| {
                self.file
                    .resolve(sref, self.dependencies)
                    .map(|raw| accept(raw.kind))
                    .unwrap_or(false)
            })
            .copied()
    }
}

trait SymbolKindHit {
    fn kind(&self, table: &LookupTable<'_>) -> SymbolKind;
}

impl SymbolKindHit for SymbolRef {
    fn kind(&self, table: &LookupTable<'_>) -> SymbolKind {
        table
            .file
            .resolve(self, table.dependencies)
            .map(|raw| raw.kind)
            .unwrap_or(SymbolKind::Scalar)
    }
}
