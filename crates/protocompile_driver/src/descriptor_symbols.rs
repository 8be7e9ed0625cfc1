//! Builds a [`SymbolTable`] directly from an already-resolved
//! `FileDescriptorProto`, for the two [`crate::resolver::SearchResult`]
//! variants that hand the driver a descriptor instead of source or an
//! AST (spec.md §4.1's "Edge cases": "If a descriptor is supplied,
//! linking is skipped and the IR is constructed directly from it").
//!
//! This is the same thing a descriptor pool does when loading an
//! embedded `FileDescriptorProto` for a well-known type: there is no AST
//! to walk, so the symbol table is read straight off the proto's own
//! `message_type`/`enum_type`/`service` entries instead of off
//! `protocompile-link::symbols`'s AST walk.

use protobuf::descriptor::FileDescriptorProto;

use protocompile_ast::{Context, RawPointer};
use protocompile_base::{InternId, SharedInterner};
use protocompile_ir::{RawSymbol, SymbolKind, SymbolRef, SymbolTable};

fn qualify(interner: &SharedInterner, scope: InternId, name: &str) -> InternId {
    if scope.is_none() {
        interner.intern(name)
    } else {
        let prefix = interner.resolve(scope);
        interner.intern(&format!("{prefix}.{name}"))
    }
}

/// Appends every symbol `proto` defines into `symbols`/`arena`, under
/// `scope`. Enum values attach to the enum's enclosing scope, matching
/// `protocompile-link::symbols`'s AST-driven walk (spec §4.5's "C++ enum
/// scoping"), so a file resolved this way and a file linked normally
/// produce lookup-compatible fully-qualified names.
pub fn populate(
    proto: &FileDescriptorProto,
    interner: &SharedInterner,
    context: &Context,
    arena: &mut protocompile_base::Arena<RawSymbol>,
    symbols: &mut SymbolTable,
) {
    let package_fqn = if proto.package().is_empty() {
        InternId::NONE
    } else {
        interner.intern(proto.package())
    };
    for message in &proto.message_type {
        walk_message(message, interner, context, arena, symbols, package_fqn);
    }
    for e in &proto.enum_type {
        walk_enum(e, interner, context, arena, symbols, package_fqn);
    }
    for service in &proto.service {
        walk_service(service, interner, context, arena, symbols, package_fqn);
    }
}

fn intern_symbol(
    kind: SymbolKind,
    fqn: InternId,
    context: &Context,
    arena: &mut protocompile_base::Arena<RawSymbol>,
    symbols: &mut SymbolTable,
) {
    let raw = RawSymbol::new(kind, fqn, context.id(), RawPointer::NULL);
    let ptr = arena.alloc(raw);
    symbols.push(SymbolRef::local(ptr, fqn));
}

fn walk_message(
    message: &protobuf::descriptor::DescriptorProto,
    interner: &SharedInterner,
    context: &Context,
    arena: &mut protocompile_base::Arena<RawSymbol>,
    symbols: &mut SymbolTable,
    scope: InternId,
) {
    let fqn = qualify(interner, scope, message.name());
    intern_symbol(SymbolKind::Message, fqn, context, arena, symbols);
    for field in &message.field {
        let field_fqn = qualify(interner, fqn, field.name());
        intern_symbol(SymbolKind::Field, field_fqn, context, arena, symbols);
    }
    for nested in &message.nested_type {
        walk_message(nested, interner, context, arena, symbols, fqn);
    }
    for e in &message.enum_type {
        walk_enum(e, interner, context, arena, symbols, fqn);
    }
}

fn walk_enum(
    e: &protobuf::descriptor::EnumDescriptorProto,
    interner: &SharedInterner,
    context: &Context,
    arena: &mut protocompile_base::Arena<RawSymbol>,
    symbols: &mut SymbolTable,
    scope: InternId,
) {
    let fqn = qualify(interner, scope, e.name());
    intern_symbol(SymbolKind::Enum, fqn, context, arena, symbols);
    for value in &e.value {
        // Enum values attach to the enclosing scope, not to the enum
        // itself, mirroring `protocompile-link::symbols::walk_enum`.
        let value_fqn = qualify(interner, scope, value.name());
        intern_symbol(SymbolKind::EnumValue, value_fqn, context, arena, symbols);
    }
}

fn walk_service(
    service: &protobuf::descriptor::ServiceDescriptorProto,
    interner: &SharedInterner,
    context: &Context,
    arena: &mut protocompile_base::Arena<RawSymbol>,
    symbols: &mut SymbolTable,
    scope: InternId,
) {
    let fqn = qualify(interner, scope, service.name());
    intern_symbol(SymbolKind::Service, fqn, context, arena, symbols);
    for method in &service.method {
        let method_fqn = qualify(interner, fqn, method.name());
        intern_symbol(SymbolKind::Method, method_fqn, context, arena, symbols);
    }
}
