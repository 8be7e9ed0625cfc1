//! The flat token stream and permissive AST: spec.md's Token Stream and
//! AST components (§4.2, §4.3). A file's tokens live in a
//! [`TokenStream`], its syntax tree in a [`Context`]'s typed arenas,
//! addressed throughout by value-type [`AstNode`] handles rather than
//! borrowed references.
//!
//! [`lexer`] and [`parser`] are minimal stand-ins for the byte-for-byte
//! Protobuf grammar, which spec §1 scopes out as an external
//! collaborator; they exist here so the rest of the crate has something
//! concrete to build and to be exercised by.

mod context;
mod cursor;
mod decl;
mod expr;
mod lexer;
mod literal;
mod name;
mod node;
mod parser;
mod token;

pub use context::Context;
pub use cursor::{Cursor, Mark};
pub use decl::{
    DeclBodyData, DeclDefData, DeclKind, DefKind, ExtensionRangeData, FieldLabel, ImportData, ImportModifier, Keyword,
    PackageData, RawPointer, ReservedEntry, ReservedRangeData, SyntaxData,
};
pub use expr::{AggregateEntry, ExprData, ExprKind, ExprPointer};
pub use lexer::lex;
pub use literal::{LiteralTable, LiteralValue};
pub use name::NameData;
pub use node::{AstNode, ContextId};
pub use parser::parse;
pub use token::{NaturalToken, SyntheticToken, TokenId, TokenKind, TokenStream};

/// Lexes and parses `source` into a fresh [`Context`], ready for symbol
/// resolution. The one-call convenience path most callers want; the
/// `lex`/`parse` split stays available for callers that need to drive
/// the two steps separately (e.g. to re-lex after an edit without
/// re-parsing unaffected regions).
pub fn parse_source(
    path: protocompile_base::ImportPath,
    source: String,
    interner: protocompile_base::SharedInterner,
) -> Context {
    let (stream, literals) = lex(&source);
    let mut context = Context::new(path, source, interner);
    context.tokens = stream;
    parser::parse(&mut context, literals);
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocompile_base::{ImportPath, SharedInterner};

    #[test]
    fn parse_source_builds_a_root_body_with_declarations() {
        let context = parse_source(
            ImportPath::new("a.proto"),
            "message M { string s = 1; }".to_string(),
            SharedInterner::new(),
        );
        assert!(!context.root.is_zero());
        let body = context.decl_body(context.root).unwrap();
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parse_source_handles_an_empty_file() {
        let context = parse_source(ImportPath::new("empty.proto"), String::new(), SharedInterner::new());
        let body = context.decl_body(context.root).unwrap();
        assert!(body.is_empty());
    }
}
