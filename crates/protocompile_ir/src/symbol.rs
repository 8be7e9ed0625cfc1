//! [`RawSymbol`]: the payload a file's own symbol arena stores — spec.md's
//! `Symbol { kind, fqn, data }` value, addressed throughout the rest of
//! the crate by [`SymbolPointer`] rather than by borrow.

use protocompile_ast::{ContextId, RawPointer};
use protocompile_base::{ArenaPointer, InternId};

/// What a symbol names. Scope-defining, type, and member kinds each have
/// their own predicate below since the nested-scope resolver and the
/// field/extendee-resolution passes filter on exactly these groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Package,
    Scalar,
    Message,
    Enum,
    Field,
    EnumValue,
    Extension,
    Oneof,
    Service,
    Method,
}

impl SymbolKind {
    /// `Package` and `Message` are the two kinds whose FQN can prefix a
    /// nested name — the kinds the climbing step of `Lookup` treats as
    /// "this ancestor defines a scope".
    pub fn is_scope(self) -> bool {
        matches!(self, SymbolKind::Package | SymbolKind::Message)
    }

    /// A reference in a field's type position may resolve to one of these.
    pub fn is_type(self) -> bool {
        matches!(self, SymbolKind::Message | SymbolKind::Enum | SymbolKind::Scalar)
    }

    /// Fields, extensions, and enum values: symbols that belong to a
    /// message or enum rather than defining one.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Field | SymbolKind::Extension | SymbolKind::EnumValue
        )
    }
}

/// A symbol local to one file: its kind, its fully-qualified interned
/// name, and a pointer back to the AST node that declared it.
///
/// `context`/`node` let a caller with the owning `Context` in hand
/// recover the declaration (span for diagnostics, fields for the
/// linker's resolution passes); `RawSymbol` itself carries no borrow.
#[derive(Debug, Clone, Copy)]
pub struct RawSymbol {
    pub kind: SymbolKind,
    pub fqn: InternId,
    pub context: ContextId,
    pub node: RawPointer,
}

impl RawSymbol {
    pub fn new(kind: SymbolKind, fqn: InternId, context: ContextId, node: RawPointer) -> Self {
        RawSymbol {
            kind,
            fqn,
            context,
            node,
        }
    }
}

/// A pointer into some file's `Arena<RawSymbol>` — which file is implied
/// by the [`crate::table::SymbolRef`] that carries this pointer.
pub type SymbolPointer = ArenaPointer<RawSymbol>;
