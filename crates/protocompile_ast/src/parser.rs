//! A minimal recursive-descent parser, good enough to build a permissive
//! AST out of the token stream for this workspace's tests and CLI.
//!
//! The concrete grammar productions of a full Protobuf parser are an
//! external collaborator per spec §1; this one covers `syntax`/`edition`,
//! `package`, `import`, `reserved`, and the `message|enum|service|extend|
//! oneof|rpc|option` definitions plus plain fields and enum values,
//! deliberately staying permissive about structures the real grammar
//! forbids (e.g. `option` nested anywhere) so the classifier, not the
//! parser, is what rejects them.

use crate::context::Context;
use crate::decl::{
    DeclBodyData, DeclDefData, DeclKind, FieldLabel, ImportData, ImportModifier, Keyword,
    PackageData, RawPointer, ReservedEntry, ReservedRangeData, SyntaxData,
};
use crate::expr::{AggregateEntry, ExprData, ExprKind};
use crate::literal::LiteralValue;
use crate::name::NameData;
use crate::node::AstNode;
use crate::token::{TokenId, TokenKind};

/// Parses `source`'s already-lexed token stream (and literal table) into
/// `context`'s AST, setting `context.root` to the file's top-level body.
pub fn parse(context: &mut Context, literals: Vec<(TokenId, LiteralValue)>) {
    for (token, value) in literals {
        context.literals.set(token, value);
    }
    let mut parser = Parser { context, pos: 0 };
    let mut body = DeclBodyData::default();
    loop {
        parser.skip_trivia();
        if parser.pos >= parser.natural_len() {
            break;
        }
        let (kind, ptr) = parser.parse_declaration();
        body.push(kind, ptr);
    }
    let root = parser.context.alloc_decl_body(body);
    parser.context.root = root;
}

struct Parser<'a> {
    context: &'a mut Context,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn natural_len(&self) -> usize {
        self.context.tokens.natural_len()
    }

    fn kind_at(&self, pos: usize) -> TokenKind {
        if pos >= self.natural_len() {
            TokenKind::Eof
        } else {
            self.context.tokens.kind(TokenId::from_natural_index(pos))
        }
    }

    fn text_at(&self, pos: usize) -> &str {
        if pos >= self.natural_len() {
            ""
        } else {
            self.context
                .tokens
                .text(TokenId::from_natural_index(pos), &self.context.source)
        }
    }

    fn skip_trivia(&mut self) {
        while self.kind_at(self.pos).is_skippable() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> TokenKind {
        self.skip_trivia();
        self.kind_at(self.pos)
    }

    fn peek_id(&mut self) -> TokenId {
        self.skip_trivia();
        if self.pos >= self.natural_len() {
            TokenId::NIL
        } else {
            TokenId::from_natural_index(self.pos)
        }
    }

    fn bump(&mut self) -> TokenId {
        let id = self.peek_id();
        if !id.is_nil() {
            self.pos += 1;
        }
        id
    }

    fn at(&mut self, text: &str) -> bool {
        self.skip_trivia();
        self.text_at(self.pos) == text
    }

    fn eat(&mut self, text: &str) -> Option<TokenId> {
        if self.at(text) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn eat_ident(&mut self) -> Option<TokenId> {
        if self.peek() == TokenKind::Ident {
            Some(self.bump())
        } else {
            None
        }
    }

    fn finish_def(&mut self, def: DeclDefData) -> (DeclKind, RawPointer) {
        let node = self.context.alloc_decl_def(def);
        (DeclKind::Def, RawPointer::from_arena_ptr(node.pointer()))
    }

    /// Parses a `{ ... }` block bounded by its matched closer (found via
    /// the token stream's bracket fuse, not by counting braces again).
    fn parse_braced_body(&mut self) -> AstNode<DeclBodyData> {
        let open = match self.eat("{") {
            Some(open) => open,
            None => return AstNode::zero(),
        };
        let end_pos = self.matching_end(open);
        let mut body = DeclBodyData::default();
        loop {
            self.skip_trivia();
            if self.pos >= end_pos {
                break;
            }
            let (kind, ptr) = self.parse_declaration();
            body.push(kind, ptr);
        }
        self.pos = end_pos + 1;
        self.context.alloc_decl_body(body)
    }

    fn matching_end(&self, open: TokenId) -> usize {
        self.context
            .tokens
            .bracket_match(open)
            .and_then(|close| close.natural_index())
            .unwrap_or_else(|| self.natural_len())
    }

    fn parse_declaration(&mut self) -> (DeclKind, RawPointer) {
        if self.eat(";").is_some() {
            return (DeclKind::Empty, RawPointer::NULL);
        }
        if self.at("syntax") || self.at("edition") {
            return self.parse_syntax();
        }
        if self.at("package") {
            return self.parse_package();
        }
        if self.at("import") {
            return self.parse_import();
        }
        if self.at("reserved") {
            return self.parse_reserved();
        }
        if self.at("extensions") {
            return self.parse_extension_range();
        }
        if self.at("message")
            || self.at("enum")
            || self.at("service")
            || self.at("extend")
            || self.at("oneof")
            || self.at("rpc")
            || self.at("option")
        {
            return self.parse_def_with_keyword();
        }
        self.parse_def_plain()
    }

    fn parse_syntax(&mut self) -> (DeclKind, RawPointer) {
        let keyword = self.bump();
        self.eat("=");
        let value = self.bump();
        let semicolon = self.eat(";").unwrap_or(TokenId::NIL);
        let node = self.context.alloc_syntax(SyntaxData {
            keyword,
            value,
            semicolon,
        });
        (DeclKind::Syntax, RawPointer::from_arena_ptr(node.pointer()))
    }

    fn parse_package(&mut self) -> (DeclKind, RawPointer) {
        self.bump();
        let name = self.parse_dotted_name();
        let semicolon = self.eat(";").unwrap_or(TokenId::NIL);
        let node = self.context.alloc_package(PackageData { name, semicolon });
        (DeclKind::Package, RawPointer::from_arena_ptr(node.pointer()))
    }

    fn parse_import(&mut self) -> (DeclKind, RawPointer) {
        self.bump();
        let modifier = if self.eat("public").is_some() {
            ImportModifier::Public
        } else if self.eat("weak").is_some() {
            ImportModifier::Weak
        } else {
            ImportModifier::None
        };
        let path = self.bump();
        let semicolon = self.eat(";").unwrap_or(TokenId::NIL);
        let node = self.context.alloc_import(ImportData {
            modifier,
            path,
            semicolon,
        });
        (DeclKind::Import, RawPointer::from_arena_ptr(node.pointer()))
    }

    fn parse_reserved(&mut self) -> (DeclKind, RawPointer) {
        self.bump();
        let mut entries = Vec::new();
        loop {
            if self.at(";") || self.peek() == TokenKind::Eof {
                break;
            }
            if self.peek() == TokenKind::String {
                entries.push(ReservedEntry::Name(self.bump()));
            } else {
                let start = self.bump();
                if self.eat("to").is_some() {
                    let end = self.bump();
                    entries.push(ReservedEntry::Range(start, end));
                } else {
                    entries.push(ReservedEntry::Range(start, start));
                }
            }
            if self.eat(",").is_none() {
                break;
            }
        }
        let semicolon = self.eat(";").unwrap_or(TokenId::NIL);
        let node = self
            .context
            .alloc_reserved_range(ReservedRangeData { entries, semicolon });
        (
            DeclKind::ReservedRange,
            RawPointer::from_arena_ptr(node.pointer()),
        )
    }

    /// `extensions 100 to 200, 1000 to max;`. No string-name form exists
    /// for extension ranges, so unlike `parse_reserved` every entry is a
    /// bare `(start, end)` pair; `to max` is accepted here as ordinary
    /// tokens and only interpreted as the sentinel by the consuming pass.
    fn parse_extension_range(&mut self) -> (DeclKind, RawPointer) {
        self.bump();
        let mut entries = Vec::new();
        loop {
            if self.at(";") || self.peek() == TokenKind::Eof {
                break;
            }
            let start = self.bump();
            if self.eat("to").is_some() {
                let end = self.bump();
                entries.push((start, end));
            } else {
                entries.push((start, start));
            }
            if self.eat(",").is_none() {
                break;
            }
        }
        let semicolon = self.eat(";").unwrap_or(TokenId::NIL);
        let node = self
            .context
            .alloc_extension_range(crate::decl::ExtensionRangeData { entries, semicolon });
        (
            DeclKind::ExtensionRange,
            RawPointer::from_arena_ptr(node.pointer()),
        )
    }

    fn parse_dotted_name(&mut self) -> AstNode<NameData> {
        let leading_dot = self.eat(".").is_some();
        let mut components = Vec::new();
        if let Some(first) = self.eat_ident() {
            components.push(first);
        }
        while self.at(".") {
            self.bump();
            if let Some(next) = self.eat_ident() {
                components.push(next);
            }
        }
        if components.is_empty() && !leading_dot {
            return AstNode::zero();
        }
        self.context.alloc_name(NameData {
            leading_dot,
            components,
        })
    }

    fn parse_parenthesized_name(&mut self) -> AstNode<NameData> {
        self.eat("(");
        self.eat("stream");
        let name = self.parse_dotted_name();
        self.eat(")");
        name
    }

    fn parse_value_expr(&mut self) -> AstNode<ExprData> {
        match self.peek() {
            TokenKind::Number => {
                let token = self.bump();
                let kind = match self.context.literals.get(token) {
                    Some(LiteralValue::Float(_)) => ExprKind::FloatLiteral,
                    _ => ExprKind::IntLiteral,
                };
                self.context.alloc_expr(ExprData::literal(kind, token))
            }
            TokenKind::String => {
                let token = self.bump();
                self.context
                    .alloc_expr(ExprData::literal(ExprKind::StringLiteral, token))
            }
            TokenKind::Ident if self.at("true") || self.at("false") => {
                let token = self.bump();
                self.context
                    .alloc_expr(ExprData::literal(ExprKind::BoolLiteral, token))
            }
            TokenKind::Ident => {
                let name = self.parse_dotted_name();
                let components = self
                    .context
                    .name(name)
                    .map(|n| n.components.clone())
                    .unwrap_or_default();
                self.context.alloc_expr(ExprData::identifier(components))
            }
            TokenKind::Punct if self.at("{") => self.parse_aggregate(),
            _ => AstNode::zero(),
        }
    }

    fn parse_aggregate(&mut self) -> AstNode<ExprData> {
        let open = self.eat("{").expect("caller checked for {");
        let end_pos = self.matching_end(open);
        let mut entries = Vec::new();
        loop {
            self.skip_trivia();
            if self.pos >= end_pos {
                break;
            }
            let name = self.bump();
            self.eat(":");
            let value = self.parse_value_expr();
            entries.push(AggregateEntry { name, value });
            self.eat(",");
        }
        self.pos = end_pos + 1;
        self.context.alloc_expr(ExprData::aggregate(entries))
    }

    fn parse_bracketed_options(&mut self) -> AstNode<DeclBodyData> {
        let open = self.eat("[").expect("caller checked for [");
        let end_pos = self.matching_end(open);
        let mut body = DeclBodyData::default();
        loop {
            self.skip_trivia();
            if self.pos >= end_pos {
                break;
            }
            let name = self.parse_dotted_name();
            let equals = self.eat("=").unwrap_or(TokenId::NIL);
            let value = self.parse_value_expr();
            let def = DeclDefData {
                keyword: Some(Keyword::OptionKw),
                name,
                equals,
                value,
                ..Default::default()
            };
            let node = self.context.alloc_decl_def(def);
            body.push(DeclKind::Def, RawPointer::from_arena_ptr(node.pointer()));
            self.eat(",");
        }
        self.pos = end_pos + 1;
        self.context.alloc_decl_body(body)
    }

    fn parse_def_with_keyword(&mut self) -> (DeclKind, RawPointer) {
        let keyword = if self.eat("message").is_some() {
            Keyword::Message
        } else if self.eat("enum").is_some() {
            Keyword::Enum
        } else if self.eat("service").is_some() {
            Keyword::Service
        } else if self.eat("extend").is_some() {
            Keyword::Extend
        } else if self.eat("oneof").is_some() {
            Keyword::Oneof
        } else if self.eat("rpc").is_some() {
            Keyword::Rpc
        } else {
            self.bump();
            Keyword::OptionKw
        };

        let mut def = DeclDefData {
            keyword: Some(keyword),
            ..Default::default()
        };

        match keyword {
            Keyword::OptionKw => {
                def.name = self.parse_dotted_name();
                def.equals = self.eat("=").unwrap_or(TokenId::NIL);
                def.value = self.parse_value_expr();
                def.semicolon = self.eat(";").unwrap_or(TokenId::NIL);
            }
            Keyword::Rpc => {
                def.name = self.parse_dotted_name();
                def.ty = self.parse_parenthesized_name();
                self.eat("returns");
                def.return_type = self.parse_parenthesized_name();
                if self.at("{") {
                    def.body = self.parse_braced_body();
                } else {
                    def.semicolon = self.eat(";").unwrap_or(TokenId::NIL);
                }
            }
            _ => {
                def.name = self.parse_dotted_name();
                if self.at("{") {
                    def.body = self.parse_braced_body();
                } else {
                    def.semicolon = self.eat(";").unwrap_or(TokenId::NIL);
                }
            }
        }

        self.finish_def(def)
    }

    /// A field (`[label] Type name = N [options];`) or an enum value
    /// (`NAME = N [options];`) — or, if the parse collapses partway
    /// through, a corrupt `DeclDef` that `classify` marks as such.
    fn parse_def_plain(&mut self) -> (DeclKind, RawPointer) {
        let mut def = DeclDefData::default();

        if self.eat("optional").is_some() {
            def.label = FieldLabel::Optional;
        } else if self.eat("required").is_some() {
            def.label = FieldLabel::Required;
        } else if self.eat("repeated").is_some() {
            def.label = FieldLabel::Repeated;
        }

        if self.at("group") {
            self.bump();
            def.type_is_group = true;
            def.name = self.parse_dotted_name();
            def.body = self.parse_braced_body();
            return self.finish_def(def);
        }

        let first = self.parse_dotted_name();
        if self.peek() == TokenKind::Ident {
            def.ty = first;
            def.name = self.parse_dotted_name();
        } else {
            def.name = first;
        }

        if let Some(equals) = self.eat("=") {
            def.equals = equals;
            def.value = self.parse_value_expr();
        }
        if self.at("[") {
            def.options = self.parse_bracketed_options();
        }
        def.semicolon = self.eat(";").unwrap_or(TokenId::NIL);
        self.finish_def(def)
    }
}
