//! Value expressions: the right-hand side of `name = value`, whether
//! that's a field/enum-value number, an option's scalar value, or a
//! message-literal aggregate used for a message-typed option.

use protocompile_base::ArenaPointer;

use crate::node::AstNode;
use crate::token::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// No value was parsed — the zero expression.
    Nil,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    BoolLiteral,
    Identifier,
    /// A `{ key: value, ... }` message literal.
    Aggregate,
}

impl Default for ExprKind {
    fn default() -> Self {
        ExprKind::Nil
    }
}

/// A single entry of an aggregate (message-literal) expression:
/// `field_name: value` or `field_name { ... }`.
#[derive(Debug, Clone, Copy)]
pub struct AggregateEntry {
    pub name: TokenId,
    pub value: AstNode<ExprData>,
}

#[derive(Debug, Default, Clone)]
pub struct ExprData {
    pub kind: ExprKind,
    /// The literal or identifier token, for every kind but `Aggregate`.
    pub token: TokenId,
    /// Populated when `kind == Identifier`: a dotted name reference.
    pub name_components: Vec<TokenId>,
    /// Populated when `kind == Aggregate`.
    pub entries: Vec<AggregateEntry>,
}

impl ExprData {
    pub fn literal(kind: ExprKind, token: TokenId) -> Self {
        ExprData {
            kind,
            token,
            name_components: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn identifier(components: Vec<TokenId>) -> Self {
        ExprData {
            kind: ExprKind::Identifier,
            token: TokenId::NIL,
            name_components: components,
            entries: Vec::new(),
        }
    }

    pub fn aggregate(entries: Vec<AggregateEntry>) -> Self {
        ExprData {
            kind: ExprKind::Aggregate,
            token: TokenId::NIL,
            name_components: Vec::new(),
            entries,
        }
    }
}

// ArenaPointer<ExprData> needs ExprData to not require Clone/Copy bounds
// on the pointer type itself (it never does); kept here only to
// document which arena `AstNode<ExprData>` indexes into.
pub type ExprPointer = ArenaPointer<ExprData>;
