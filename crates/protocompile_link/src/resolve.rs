//! Passes 3-5 (spec.md §4.6): once a file's symbol table is merged with
//! its dependencies', resolve every cross-reference the file's AST makes
//! — field types, extendee types and tag numbers, method request/response
//! types — against [`crate::lookup`].
//!
//! Scope threading follows real Protobuf nesting, not the AST's own
//! recursion shape: only a `message` introduces a new scope for its
//! children. `service`, `extend`, and `oneof` bodies resolve their
//! contents against the *enclosing* scope, matching how `symbols.rs`
//! interns them (`M.field`, never `M.my_oneof.field` or
//! `M.MyExtendBlock.field` — there is no such thing as the latter).
//!
//! Bracketed option values (spec §4.5's "option extension name
//! resolution") are out of scope here: this compiler doesn't interpret
//! option contents, only validates structural references, so there is
//! nothing to resolve them against beyond what `descriptor.rs` copies
//! through unparsed.

use protocompile_ast::{AstNode, Context, DeclKind, DefKind, NameData, RawPointer};
use protocompile_base::{InternId, SharedInterner};
use protocompile_diag::{CompileError, Diagnostic, Reporter};
use protocompile_ir::{File, SymbolKind, SymbolRef};

use crate::extensions::{ExtensionOrigin, ExtensionRegistry};
use crate::lookup::{lookup, LookupResult, LookupTable};
use crate::symbols::{body_children, extension_ranges, field_tag, qualify, resolve_name};

/// Protobuf's built-in scalar keywords — these occupy the same grammar
/// slot as a message/enum type reference (`DeclDefData.ty`) but never
/// name a symbol, so they're excluded from lookup before it ever runs.
const SCALAR_KEYWORDS: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32", "fixed64", "sfixed32",
    "sfixed64", "bool", "string", "bytes",
];

fn is_builtin_scalar(name: &str) -> bool {
    SCALAR_KEYWORDS.contains(&name)
}

/// Walks `file`'s AST a second time (pass 1 already built its symbol
/// table) and resolves every type, extendee, and method signature
/// reference it contains. `file.symbols` must already be sorted and
/// merged with `dependencies`'s tables before calling this — see
/// `link.rs`.
pub fn resolve_file(
    file: &File,
    dependencies: &[&File],
    interner: &SharedInterner,
    reporter: &Reporter,
    extensions: &ExtensionRegistry,
) -> Result<(), CompileError> {
    let root = match file.context.decl_body(file.context.root) {
        Some(body) => body.clone(),
        None => return Ok(()),
    };
    let package_fqn = if file.descriptor.package().is_empty() {
        InternId::NONE
    } else {
        interner.intern(file.descriptor.package())
    };

    let resolver = Resolver {
        file,
        dependencies,
        interner,
        reporter,
        extensions,
    };
    for (kind, ptr) in root.iter() {
        if kind == DeclKind::Def {
            resolver.walk(ptr, package_fqn)?;
        }
    }
    Ok(())
}

struct Resolver<'a> {
    file: &'a File,
    dependencies: &'a [&'a File],
    interner: &'a SharedInterner,
    reporter: &'a Reporter,
    extensions: &'a ExtensionRegistry,
}

impl<'a> Resolver<'a> {
    fn context(&self) -> &Context {
        &self.file.context
    }

    fn walk(&self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let context = self.context();
        let def = match context.decl_def_raw(ptr) {
            Some(def) => def,
            None => return Ok(()),
        };
        match def.classify() {
            DefKind::Message => {
                let fqn = qualify(self.interner, scope, &resolve_name(context, def.name));
                for (kind, child) in body_children(context, def.body) {
                    if kind == DeclKind::Def {
                        self.walk(child, fqn)?;
                    }
                }
                Ok(())
            }
            DefKind::Service => {
                for (kind, child) in body_children(context, def.body) {
                    if kind == DeclKind::Def {
                        self.resolve_method(child, scope)?;
                    }
                }
                Ok(())
            }
            DefKind::Oneof => {
                for (kind, child) in body_children(context, def.body) {
                    if kind == DeclKind::Def {
                        self.resolve_field_type(child, scope)?;
                    }
                }
                Ok(())
            }
            DefKind::Extend => self.resolve_extend(def, scope),
            DefKind::Field | DefKind::Group => self.resolve_field_type(ptr, scope),
            DefKind::Enum | DefKind::EnumValue | DefKind::Method | DefKind::OptionDef | DefKind::Corrupt => Ok(()),
        }
    }

    fn resolve_extend(&self, def: &protocompile_ast::DeclDefData, scope: InternId) -> Result<(), CompileError> {
        let context = self.context();
        let extendee_name = resolve_name(context, def.name);
        let table = LookupTable::new(self.file, self.dependencies);
        let (extendee_fqn, extendee_sref) = match lookup(self.interner, &table, scope, &extendee_name, |k| {
            matches!(k, SymbolKind::Message)
        }) {
            LookupResult::Found(sref) => {
                table.mark_used(&sref);
                (self.interner.resolve(sref.fqn), Some(sref))
            }
            LookupResult::NotFound => {
                self.reporter
                    .report_error(Diagnostic::error(format!("unknown extendee type \"{extendee_name}\"")))?;
                return Ok(());
            }
            LookupResult::WrongKind(_) => {
                self.reporter
                    .report_error(Diagnostic::error(format!("\"{extendee_name}\" is not a message type")))?;
                return Ok(());
            }
        };
        for (kind, child) in body_children(context, def.body) {
            if kind != DeclKind::Def {
                continue;
            }
            self.resolve_field_type(child, scope)?;
            self.resolve_extension_tag(child, &extendee_fqn, extendee_sref.as_ref())?;
        }
        Ok(())
    }

    fn resolve_extension_tag(&self, ptr: RawPointer, extendee: &str, extendee_sref: Option<&SymbolRef>) -> Result<(), CompileError> {
        let context = self.context();
        let def = match context.decl_def_raw(ptr) {
            Some(def) => def,
            None => return Ok(()),
        };
        let tag = match field_tag(context, def.value) {
            Some(tag) => tag,
            None => return Ok(()),
        };
        let field_name = resolve_name(context, def.name);

        if let Some(sref) = extendee_sref {
            if !self.tag_in_declared_range(sref, tag) {
                self.reporter.report_error(Diagnostic::error(format!(
                    "extension number {tag} is outside the extension range declared by \"{extendee}\""
                )))?;
            }
        }

        let origin = ExtensionOrigin {
            file: self.file.path.as_str().to_string(),
            field_name: field_name.clone(),
        };
        if let Err(existing) = self.extensions.claim((extendee.to_string(), tag), origin) {
            self.reporter.report_error(Diagnostic::error(format!(
                "extension number {tag} has already been used in \"{extendee}\" by field \"{}\" in {}",
                existing.field_name, existing.file
            )))?;
        }
        Ok(())
    }

    /// Spec §4.6 pass 4: "tag numbers must lie within the extendee's
    /// declared extension ranges." Reads ranges straight from the
    /// extendee's AST (local or in `self.dependencies`) rather than its
    /// descriptor, since `descriptor.rs`'s pass 6 may not have run yet
    /// for the extendee's file (`build_descriptor` is optional per
    /// `CompilerOptions`). An extendee this can't resolve back to a
    /// `DeclDef`, or one that declares no `extensions` block at all, is
    /// treated as permissive — it has nothing to check the tag against.
    fn tag_in_declared_range(&self, extendee: &SymbolRef, tag: i32) -> bool {
        let Some(raw) = self.file.resolve(extendee, self.dependencies) else {
            return true;
        };
        let owner_context = if extendee.is_local() {
            self.context()
        } else {
            match self.dependencies.get((extendee.file_index - 1) as usize) {
                Some(dep) => &dep.context,
                None => return true,
            }
        };
        let Some(def) = owner_context.decl_def_raw(raw.node) else {
            return true;
        };
        let ranges = extension_ranges(owner_context, def.body);
        if ranges.is_empty() {
            return true;
        }
        ranges.iter().any(|&(lo, hi)| tag >= lo && tag <= hi)
    }

    fn resolve_method(&self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let context = self.context();
        let def = match context.decl_def_raw(ptr) {
            Some(def) if def.classify() == DefKind::Method => def,
            _ => return Ok(()),
        };
        self.resolve_type_ref(def.ty, scope, |k| matches!(k, SymbolKind::Message), "request type")?;
        self.resolve_type_ref(def.return_type, scope, |k| matches!(k, SymbolKind::Message), "response type")
    }

    fn resolve_field_type(&self, ptr: RawPointer, scope: InternId) -> Result<(), CompileError> {
        let context = self.context();
        let def = match context.decl_def_raw(ptr) {
            Some(def) => def,
            None => return Ok(()),
        };
        self.resolve_type_ref(def.ty, scope, |k| k.is_type(), "field type")
    }

    /// Spec §4.6 pass 3: "Fields in proto3 messages may not reference
    /// proto2 enums." Only meaningful when `sref` resolved to an enum;
    /// messages and scalars never trip it.
    fn check_proto3_enum_reference(&self, sref: &SymbolRef, type_name: &str) -> Result<(), CompileError> {
        if self.file.descriptor.syntax() != "proto3" {
            return Ok(());
        }
        let Some(raw) = self.file.resolve(sref, self.dependencies) else {
            return Ok(());
        };
        if raw.kind != SymbolKind::Enum {
            return Ok(());
        }
        let owner_syntax = if sref.is_local() {
            self.file.descriptor.syntax()
        } else {
            self.dependencies
                .get((sref.file_index - 1) as usize)
                .map(|dep| dep.descriptor.syntax())
                .unwrap_or("proto2")
        };
        if owner_syntax.is_empty() || owner_syntax == "proto2" {
            self.reporter.report_error(Diagnostic::error(format!(
                "proto3 field may not reference proto2 enum \"{type_name}\""
            )))?;
        }
        Ok(())
    }

    fn resolve_type_ref(
        &self,
        name_node: AstNode<NameData>,
        scope: InternId,
        accept: impl Fn(SymbolKind) -> bool,
        what: &str,
    ) -> Result<(), CompileError> {
        if name_node.is_zero() {
            return Ok(());
        }
        let type_name = resolve_name(self.context(), name_node);
        if type_name.is_empty() || is_builtin_scalar(&type_name) {
            return Ok(());
        }
        let table = LookupTable::new(self.file, self.dependencies);
        match lookup(self.interner, &table, scope, &type_name, accept) {
            LookupResult::Found(sref) => {
                table.mark_used(&sref);
                self.check_proto3_enum_reference(&sref, &type_name)
            }
            LookupResult::NotFound => self
                .reporter
                .report_error(Diagnostic::error(format!("unknown {what} \"{type_name}\"")))
                .map(|_| ()),
            LookupResult::WrongKind(_) => self
                .reporter
                .report_error(Diagnostic::error(format!("\"{type_name}\" is not a valid {what}")))
                .map(|_| ()),
        }
    }
}
