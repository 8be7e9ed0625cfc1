//! [`Context`]: the per-file container owning a file's token stream,
//! intern references, AST arenas (one per node kind), and literal side
//! table. All of a file's arena storage lives and dies with its
//! `Context` — dropping one frees the whole AST atomically, per spec
//! §3's Context lifecycle note.

use std::sync::atomic::{AtomicU32, Ordering};

use protocompile_base::{Arena, ImportPath, SharedInterner};

use crate::decl::{
    DeclBodyData, DeclDefData, ExtensionRangeData, ImportData, PackageData, RawPointer, ReservedRangeData, SyntaxData,
};
use crate::expr::ExprData;
use crate::literal::LiteralTable;
use crate::name::NameData;
use crate::node::{AstNode, ContextId};
use crate::token::TokenStream;

static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Owns one file's worth of AST storage: its token stream, its typed
/// arenas (one per node kind), its literal side table, and a handle to
/// the process-wide intern pool.
pub struct Context {
    id: ContextId,
    pub path: ImportPath,
    pub source: String,
    pub tokens: TokenStream,
    pub interner: SharedInterner,
    pub literals: LiteralTable,

    decl_defs: Arena<DeclDefData>,
    decl_bodies: Arena<DeclBodyData>,
    names: Arena<NameData>,
    exprs: Arena<ExprData>,
    syntaxes: Arena<SyntaxData>,
    packages: Arena<PackageData>,
    imports: Arena<ImportData>,
    reserved_ranges: Arena<ReservedRangeData>,
    extension_ranges: Arena<ExtensionRangeData>,

    /// The file's top-level declaration body, set once parsing finishes.
    pub root: AstNode<DeclBodyData>,
}

impl Context {
    pub fn new(path: ImportPath, source: String, interner: SharedInterner) -> Self {
        let id = ContextId::new(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        Context {
            id,
            path,
            source,
            tokens: TokenStream::new(),
            interner,
            literals: LiteralTable::new(),
            decl_defs: Arena::new(),
            decl_bodies: Arena::new(),
            names: Arena::new(),
            exprs: Arena::new(),
            syntaxes: Arena::new(),
            packages: Arena::new(),
            imports: Arena::new(),
            reserved_ranges: Arena::new(),
            extension_ranges: Arena::new(),
            root: AstNode::zero(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn alloc_decl_def(&mut self, data: DeclDefData) -> AstNode<DeclDefData> {
        AstNode::new(self.id, self.decl_defs.alloc(data))
    }

    pub fn alloc_decl_body(&mut self, data: DeclBodyData) -> AstNode<DeclBodyData> {
        AstNode::new(self.id, self.decl_bodies.alloc(data))
    }

    pub fn alloc_name(&mut self, data: NameData) -> AstNode<NameData> {
        AstNode::new(self.id, self.names.alloc(data))
    }

    pub fn alloc_expr(&mut self, data: ExprData) -> AstNode<ExprData> {
        AstNode::new(self.id, self.exprs.alloc(data))
    }

    pub fn alloc_syntax(&mut self, data: SyntaxData) -> AstNode<SyntaxData> {
        AstNode::new(self.id, self.syntaxes.alloc(data))
    }

    pub fn alloc_package(&mut self, data: PackageData) -> AstNode<PackageData> {
        AstNode::new(self.id, self.packages.alloc(data))
    }

    pub fn alloc_import(&mut self, data: ImportData) -> AstNode<ImportData> {
        AstNode::new(self.id, self.imports.alloc(data))
    }

    pub fn alloc_reserved_range(&mut self, data: ReservedRangeData) -> AstNode<ReservedRangeData> {
        AstNode::new(self.id, self.reserved_ranges.alloc(data))
    }

    pub fn alloc_extension_range(&mut self, data: ExtensionRangeData) -> AstNode<ExtensionRangeData> {
        AstNode::new(self.id, self.extension_ranges.alloc(data))
    }

    pub fn decl_def(&self, node: AstNode<DeclDefData>) -> Option<&DeclDefData> {
        node.get(self.id, &self.decl_defs)
    }

    pub fn decl_body(&self, node: AstNode<DeclBodyData>) -> Option<&DeclBodyData> {
        node.get(self.id, &self.decl_bodies)
    }

    pub fn name(&self, node: AstNode<NameData>) -> Option<&NameData> {
        node.get(self.id, &self.names)
    }

    pub fn expr(&self, node: AstNode<ExprData>) -> Option<&ExprData> {
        node.get(self.id, &self.exprs)
    }

    pub fn syntax(&self, node: AstNode<SyntaxData>) -> Option<&SyntaxData> {
        node.get(self.id, &self.syntaxes)
    }

    pub fn package(&self, node: AstNode<PackageData>) -> Option<&PackageData> {
        node.get(self.id, &self.packages)
    }

    pub fn import(&self, node: AstNode<ImportData>) -> Option<&ImportData> {
        node.get(self.id, &self.imports)
    }

    pub fn reserved_range(&self, node: AstNode<ReservedRangeData>) -> Option<&ReservedRangeData> {
        node.get(self.id, &self.reserved_ranges)
    }

    pub fn extension_range(&self, node: AstNode<ExtensionRangeData>) -> Option<&ExtensionRangeData> {
        node.get(self.id, &self.extension_ranges)
    }

    /// Dereferences a [`DeclBodyData`] child's untyped [`RawPointer`]
    /// directly, without going through an [`AstNode`]. A `DeclBody`'s
    /// children are tagged with a [`crate::decl::DeclKind`] rather than
    /// carrying their own `AstNode` — a caller outside this crate that
    /// has already checked the tag has no way to rebuild the `AstNode`
    /// `AstNode::new` is private to this crate, so these accessors take
    /// the raw pointer straight from the owning context instead.
    pub fn decl_def_raw(&self, ptr: RawPointer) -> Option<&DeclDefData> {
        self.decl_defs.try_get(ptr.into_arena_ptr())
    }

    pub fn syntax_raw(&self, ptr: RawPointer) -> Option<&SyntaxData> {
        self.syntaxes.try_get(ptr.into_arena_ptr())
    }

    pub fn decl_body_raw(&self, ptr: RawPointer) -> Option<&DeclBodyData> {
        self.decl_bodies.try_get(ptr.into_arena_ptr())
    }

    pub fn name_raw(&self, ptr: RawPointer) -> Option<&NameData> {
        self.names.try_get(ptr.into_arena_ptr())
    }

    pub fn import_raw(&self, ptr: RawPointer) -> Option<&ImportData> {
        self.imports.try_get(ptr.into_arena_ptr())
    }

    pub fn package_raw(&self, ptr: RawPointer) -> Option<&PackageData> {
        self.packages.try_get(ptr.into_arena_ptr())
    }

    pub fn reserved_range_raw(&self, ptr: RawPointer) -> Option<&ReservedRangeData> {
        self.reserved_ranges.try_get(ptr.into_arena_ptr())
    }

    pub fn extension_range_raw(&self, ptr: RawPointer) -> Option<&ExtensionRangeData> {
        self.extension_ranges.try_get(ptr.into_arena_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocompile_base::SharedInterner;

    fn ctx() -> Context {
        Context::new(ImportPath::new("a.proto"), String::new(), SharedInterner::new())
    }

    #[test]
    fn fresh_contexts_get_distinct_ids() {
        let a = ctx();
        let b = ctx();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn alloc_and_read_a_name_node() {
        let mut context = ctx();
        let node = context.alloc_name(NameData::default());
        assert!(context.name(node).is_some());
    }

    #[test]
    fn root_starts_as_the_zero_node() {
        let context = ctx();
        assert!(context.root.is_zero());
    }

    #[test]
    fn decl_def_round_trips_through_classify() {
        let mut context = ctx();
        let def = context.alloc_decl_def(DeclDefData {
            keyword: Some(crate::decl::Keyword::Enum),
            ..Default::default()
        });
        assert_eq!(
            context.decl_def(def).unwrap().classify(),
            crate::decl::DefKind::Enum
        );
    }
}
