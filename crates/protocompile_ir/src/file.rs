//! [`File`]: spec.md §3's "File (IR)" — a linked (or linking) file's AST,
//! symbol arena and table, import array, and the descriptor proto being
//! populated.

use protocompile_ast::Context;
use protocompile_base::{Arena, ImportPath, SharedInterner};

use crate::import::ImportArray;
use crate::symbol::RawSymbol;
use crate::table::{SymbolRef, SymbolTable};

/// A file's IR: its AST plus everything the linker (`protocompile-link`)
/// attaches to it. `descriptor` starts out `Default`-empty and is filled
/// in across the linker's passes; callers should not assume it is
/// complete until the file has reached the `Linked` state (tracked
/// outside this struct, by `protocompile-link`'s state machine).
pub struct File {
    pub path: ImportPath,
    pub context: Context,
    pub symbols_arena: Arena<RawSymbol>,
    /// This file's own definitions only (`SymbolRef::file_index == 0`
    /// for every entry), as built by `protocompile-link`'s intern-and-
    /// index pass. Never touched again after that pass sorts it — this
    /// is the table another file's merge step reads when *this* file
    /// sits somewhere in that importer's own import array.
    pub local_symbols: SymbolTable,
    /// The complete view this file's own linking passes resolve names
    /// against: `local_symbols` concatenated with every file in
    /// `imports`'s own `local_symbols`, each rewritten to that file's
    /// position here. Empty until the merge pass runs.
    pub symbols: SymbolTable,
    pub imports: ImportArray,
    pub descriptor: protobuf::descriptor::FileDescriptorProto,
    pub interner: SharedInterner,
}

impl File {
    /// A fresh file wrapping a parsed `Context`, with empty symbol
    /// storage and import array — the state right after parsing, before
    /// the linker's passes run.
    pub fn new(path: ImportPath, context: Context, interner: SharedInterner) -> Self {
        File {
            path,
            context,
            symbols_arena: Arena::new(),
            local_symbols: SymbolTable::new(),
            symbols: SymbolTable::new(),
            imports: ImportArray::default(),
            descriptor: protobuf::descriptor::FileDescriptorProto::default(),
            interner,
        }
    }

    /// Dereferences a symbol reference found in `self.symbols`, given the
    /// files this one imports in the same order as `self.imports`
    /// (`dependencies[i]` is the file at 1-indexed position `i + 1`).
    ///
    /// Returns `None` for an out-of-range foreign index — a programmer
    /// error in practice, since a published `SymbolRef` should always
    /// name a file present in this file's own import array.
    pub fn resolve<'a>(&'a self, sref: &SymbolRef, dependencies: &'a [&'a File]) -> Option<&'a RawSymbol> {
        if sref.is_local() {
            self.symbols_arena.try_get(sref.ptr)
        } else {
            dependencies
                .get((sref.file_index - 1) as usize)?
                .symbols_arena
                .try_get(sref.ptr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_file_has_empty_symbols_and_imports() {
        let interner = SharedInterner::new();
        let context = Context::new(ImportPath::new("a.proto"), String::new(), interner.clone());
        let file = File::new(ImportPath::new("a.proto"), context, interner);
        assert!(file.symbols.is_empty());
        assert!(file.imports.is_empty());
    }

    #[test]
    fn resolve_returns_none_for_an_out_of_range_foreign_index() {
        let interner = SharedInterner::new();
        let context = Context::new(ImportPath::new("a.proto"), String::new(), interner.clone());
        let file = File::new(ImportPath::new("a.proto"), context, interner);
        let sref = SymbolRef::foreign(1, protocompile_base::ArenaPointer::from_raw(1), protocompile_base::InternId::NONE);
        assert!(file.resolve(&sref, &[]).is_none());
    }
}
