//! Pass 1 (intern & index, spec.md §4.6): walks a parsed file's AST and
//! interns a [`RawSymbol`] for every definable entity spec §4.5 lists —
//! package, message, enum, field, enum-value, extension, oneof, service,
//! method — appending a [`SymbolRef::local`] into the file's own table
//! for each.
//!
//! Enum values attach to the enum's *enclosing* scope rather than the
//! enum itself (spec §4.5: "C++ enum scoping"): `message M { enum X { N
//! = 1; } }` interns `N` as `M.N`, not `M.X.N`. Extension fields attach
//! to the scope the `extend` block is declared in, not the extendee.

use protocompile_ast::{AstNode, Context, DeclKind, DefKind, NameData, RawPointer, TokenId};
use protocompile_base::{InternId, SharedInterner, Span};
use protocompile_diag::{CompileError, Diagnostic, Reporter};
use protocompile_ir::{File, RawSymbol, SymbolKind, SymbolRef};

/// Protobuf's sentinel spelling for the highest valid field/extension
/// number (`2^29 - 1`, the top of the usable range below the reserved
/// 19000-19999 band).
pub(crate) const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Interns `name` under `scope` (`scope.name`, or bare `name` if `scope`
/// is `InternId::NONE`).
pub(crate) fn qualify(interner: &SharedInterner, scope: InternId, name: &str) -> InternId {
    if scope.is_none() {
        interner.intern(name)
    } else {
        let prefix = interner.resolve(scope);
        interner.intern(&format!("{prefix}.{name}"))
    }
}

pub(crate) fn resolve_name(context: &Context, node: AstNode<NameData>) -> String {
    context
        .name(node)
        .map(|n| n.text(&context.tokens, &context.source))
        .unwrap_or_default()
}

/// Reads a field/enum-value/extension's declared number out of its
/// `value` expression. `None` covers both "no value was parsed" and "the
/// value wasn't an integer literal" — both are parse-time malformations
/// downstream passes leave for the AST's own diagnostics, not this one's.
pub(crate) fn field_tag(context: &Context, value: AstNode<protocompile_ast::ExprData>) -> Option<i32> {
    let expr = context.expr(value)?;
    match context.literals.get(expr.token) {
        Some(protocompile_ast::LiteralValue::Int(n)) => Some(*n as i32),
        Some(protocompile_ast::LiteralValue::UInt(n)) => Some(*n as i32),
        _ => None,
    }
}

/// Reads one end of an `extensions ... ;` range entry: a literal integer,
/// or the keyword `max` standing in for [`MAX_FIELD_NUMBER`].
fn range_bound(context: &Context, token: TokenId) -> Option<i32> {
    if context.tokens.text(token, &context.source) == "max" {
        return Some(MAX_FIELD_NUMBER);
    }
    match context.literals.get(token) {
        Some(protocompile_ast::LiteralValue::Int(n)) => Some(*n as i32),
        Some(protocompile_ast::LiteralValue::UInt(n)) => Some(*n as i32),
        _ => None,
    }
}

/// Every `extensions N to M;` range declared directly in `body`
/// (inclusive on both ends, matching Protobuf's own `extensions` syntax
/// — unlike `reserved_range`'s descriptor-proto encoding, which is
/// half-open). Shared between `resolve.rs` (tag validation) and
/// `descriptor.rs` (`extension_range` population) so the two passes
/// can't disagree about what a range means.
pub(crate) fn extension_ranges(context: &Context, body: AstNode<protocompile_ast::DeclBodyData>) -> Vec<(i32, i32)> {
    body_children(context, body)
        .into_iter()
        .filter(|(kind, _)| *kind == DeclKind::ExtensionRange)
        .filter_map(|(_, ptr)| context.extension_range_raw(ptr))
        .flat_map(|range| range.entries.iter().copied())
        .filter_map(|(lo, hi)| Some((range_bound(context, lo)?, range_bound(context, hi)?)))
        .collect()
}

/// A representative span for a declared entity, used for `source_info`
/// location entries: the merged span of its name's components. Not
/// guaranteed to match a reference compiler's idea of "the declaration's
/// span" (see `DESIGN.md`'s source-info decision) — just a stable,
/// self-consistent anchor derived from this crate's own token spans.
pub(crate) fn name_span(context: &Context, node: AstNode<NameData>) -> Span {
    let Some(name) = context.name(node) else {
        return Span::ZERO;
    };
    name.components
        .iter()
        .map(|&tok| context.tokens.span(tok))
        .reduce(Span::merge)
        .unwrap_or(Span::ZERO)
}

pub(crate) fn body_children(
    context: &Context,
    body: AstNode<protocompile_ast::DeclBodyData>,
) -> Vec<(DeclKind, RawPointer)> {
    context.decl_body(body).map(|b| b.iter().collect()).unwrap_or_default()
}

/// Walks `file`'s AST, populating `file.symbols_arena` and
/// `file.symbols` with every local definition, and `file.descriptor`'s
/// `name`/`package` fields. Does not sort the table or merge imports —
/// callers call [`protocompile_ir::SymbolTable::sort`] themselves before
/// moving to the merge pass, so duplicate detection (spec §4.6 pass 1)
/// sees a stable, sorted view.
pub fn build_symbols(file: &mut File, reporter: &Reporter) -> Result<(), CompileError> {
    file.descriptor.set_name(file.path.as_str().to_string());
    let interner = file.interner.clone();
    let root = match file.context.decl_body(file.context.root) {
        Some(body) => body.clone(),
        None => return Ok(()),
    };

    let mut package_fqn = InternId::NONE;
    for (kind, ptr) in root.iter() {
        if kind == DeclKind::Syntax {
            if let Some(syntax) = file.context.syntax_raw(ptr) {
                let text = file
                    .context
                    .tokens
                    .text(syntax.value, &file.context.source)
                    .trim_matches('"')
                    .to_string();
                if !text.is_empty() {
                    file.descriptor.set_syntax(text);
                }
            }
        }
        if kind == DeclKind::Package {
            if let Some(pkg) = file.context.package_raw(ptr) {
                let text = resolve_name(&file.context, pkg.name);
                file.descriptor.set_package(text.clone());
                package_fqn = interner.intern(&text);
            }
        }
    }

    let mut builder = Builder {
        interner: &interner,
        file,
        reporter,
    };
    for (kind, ptr) in root.iter() {
        if kind == DeclKind::Def {
            builder.walk_def(ptr, package_fqn)?;
        }
    }
    Ok(())
}

struct Builder<'a> {
    interner: &'a SharedInterner,
    file: &'a mut File,
    reporter: &'a Reporter,
}

impl<'a> Builder<'a> {
    fn intern_symbol(&mut self, kind: SymbolKind, fqn: InternId, node: RawPointer) {
        let raw = RawSymbol::new(kind, fqn, self.file.context.id(), node);
        let ptr = self.file.symbols_arena.alloc(raw);
        self.file.local_symbols.push(SymbolRef::local(ptr, fqn));
    }

    fn walk_def(&mut self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let kind = match self.file.context.decl_def_raw(ptr) {
            Some(def) => def.classify(),
            None => return Ok(()),
        };
        match kind {
            DefKind::Message => self.walk_message(ptr, scope),
            DefKind::Enum => self.walk_enum(ptr, scope),
            DefKind::Service => self.walk_service(ptr, scope),
            DefKind::Extend => self.walk_extend_block(ptr, scope),
            DefKind::Oneof => self.walk_oneof(ptr, scope),
            DefKind::Field | DefKind::Group => self.walk_field(ptr, scope, SymbolKind::Field),
            DefKind::Method => self.walk_method(ptr, scope),
            DefKind::EnumValue | DefKind::OptionDef | DefKind::Corrupt => {
                // Enum values are interned by `walk_enum` (against the
                // *enclosing* scope, not the enum's own); options carry
                // no symbol of their own; corrupt defs are ignored by
                // every downstream pass per spec §9.
                Ok(())
            }
        }
    }

    fn walk_message(&mut self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let (name, body) = {
            let context = &self.file.context;
            let def = context.decl_def_raw(ptr).expect("classified as a message");
            (resolve_name(context, def.name), def.body)
        };
        let fqn = qualify(self.interner, scope, &name);
        self.intern_symbol(SymbolKind::Message, fqn, ptr);
        let children = body_children(&self.file.context, body);
        for (kind, child) in children {
            if kind == DeclKind::Def {
                self.walk_def(child, fqn)?;
            }
        }
        Ok(())
    }

    fn walk_enum(&mut self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let (name, body) = {
            let context = &self.file.context;
            let def = context.decl_def_raw(ptr).expect("classified as an enum");
            (resolve_name(context, def.name), def.body)
        };
        let fqn = qualify(self.interner, scope, &name);
        self.intern_symbol(SymbolKind::Enum, fqn, ptr);

        let values: Vec<(RawPointer, String)> = {
            let context = &self.file.context;
            body_children(context, body)
                .into_iter()
                .filter_map(|(kind, child)| {
                    if kind != DeclKind::Def {
                        return None;
                    }
                    let child_def = context.decl_def_raw(child)?;
                    if child_def.classify() == DefKind::EnumValue {
                        Some((child, resolve_name(context, child_def.name)))
                    } else {
                        None
                    }
                })
                .collect()
        };
        // Enum values belong to the enum's *enclosing* scope (spec
        // §4.5), not to `fqn`.
        for (child, value_name) in values {
            let value_fqn = qualify(self.interner, scope, &value_name);
            self.intern_symbol(SymbolKind::EnumValue, value_fqn, child);
        }
        Ok(())
    }

    fn walk_service(&mut self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let (name, body) = {
            let context = &self.file.context;
            let def = context.decl_def_raw(ptr).expect("classified as a service");
            (resolve_name(context, def.name), def.body)
        };
        let fqn = qualify(self.interner, scope, &name);
        self.intern_symbol(SymbolKind::Service, fqn, ptr);
        let children = body_children(&self.file.context, body);
        for (kind, child) in children {
            if kind == DeclKind::Def {
                self.walk_method(child, fqn)?;
            }
        }
        Ok(())
    }

    fn walk_method(&mut self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let name = {
            let context = &self.file.context;
            match context.decl_def_raw(ptr) {
                Some(def) if def.classify() == DefKind::Method => resolve_name(context, def.name),
                _ => return Ok(()),
            }
        };
        let fqn = qualify(self.interner, scope, &name);
        self.intern_symbol(SymbolKind::Method, fqn, ptr);
        Ok(())
    }

    fn walk_oneof(&mut self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let (name, body) = {
            let context = &self.file.context;
            let def = context.decl_def_raw(ptr).expect("classified as a oneof");
            (resolve_name(context, def.name), def.body)
        };
        let fqn = qualify(self.interner, scope, &name);
        self.intern_symbol(SymbolKind::Oneof, fqn, ptr);
        // Oneof members are fields of the enclosing message, not of the
        // oneof itself: interned against `scope`, matching real Protobuf
        // FQN rules (`M.field`, never `M.my_oneof.field`).
        let children = body_children(&self.file.context, body);
        for (kind, child) in children {
            if kind == DeclKind::Def {
                self.walk_field(child, scope, SymbolKind::Field)?;
            }
        }
        Ok(())
    }

    fn walk_extend_block(&mut self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let body = self
            .file
            .context
            .decl_def_raw(ptr)
            .expect("classified as an extend block")
            .body;
        let children = body_children(&self.file.context, body);
        for (kind, child) in children {
            if kind == DeclKind::Def {
                self.walk_field(child, scope, SymbolKind::Extension)?;
            }
        }
        Ok(())
    }

    fn walk_field(&mut self, ptr: RawPointer, scope: InternId, kind: SymbolKind) -> Result<(), CompileError> {
        enum Outcome {
            Missing,
            NoName,
            Named(String),
        }
        let outcome = {
            let context = &self.file.context;
            match context.decl_def_raw(ptr) {
                None => Outcome::Missing,
                Some(def) if def.name.is_zero() => Outcome::NoName,
                Some(def) => Outcome::Named(resolve_name(context, def.name)),
            }
        };
        let name = match outcome {
            Outcome::Missing => return Ok(()),
            Outcome::NoName => {
                self.reporter
                    .report_error(Diagnostic::error("field or extension is missing a name"))?;
                return Ok(());
            }
            Outcome::Named(name) => name,
        };
        let fqn = qualify(self.interner, scope, &name);
        self.intern_symbol(kind, fqn, ptr);
        Ok(())
    }
}
