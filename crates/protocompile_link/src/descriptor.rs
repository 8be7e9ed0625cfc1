//! Pass 6 (spec.md §4.6): builds each top-level message, enum, service,
//! and file-level extension into `file.descriptor`'s `message_type` /
//! `enum_type` / `service` / `extension` vectors, once passes 3-5
//! (`resolve.rs`) have already validated every cross-reference the file
//! makes.
//!
//! This crate doesn't attempt to match a reference compiler's descriptor
//! byte-for-byte (spec §1 scopes the "bit-exact `FileDescriptorProto`
//! serializer" out entirely) — it populates the structural fields a
//! caller needs to hand to an option interpreter or a serializer of its
//! own: names, numbers, labels, resolved `type_name`s, nesting. Option
//! values themselves are copied through unparsed; interpreting them is
//! also an external collaborator (spec §1).
//!
//! When `CompilerOptions::source_info` is set (spec §6's option table),
//! this pass also records one `SourceCodeInfo.Location` per entity it
//! builds, keyed by the same `descriptor.proto` field-number path the
//! entity was just placed at. The span each location carries comes from
//! this crate's own token stream (`symbols::name_span`), not a
//! byte-for-byte replay of any reference compiler's lexer positions —
//! see `DESIGN.md`'s source-info decision.

use std::cell::RefCell;

use protobuf::descriptor::field_descriptor_proto::{Label, Type};
use protobuf::descriptor::source_code_info::Location;
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    MethodDescriptorProto, OneofDescriptorProto, ServiceDescriptorProto, SourceCodeInfo,
};
use protobuf::EnumOrUnknown;

use protocompile_ast::{Context, DeclDefData, DeclKind, DefKind, FieldLabel, NameData, RawPointer};
use protocompile_base::{InternId, SharedInterner, Span};
use protocompile_ir::{File, SymbolKind};

use crate::lookup::{lookup, LookupResult, LookupTable};
use crate::symbols::{body_children, extension_ranges, field_tag, name_span, qualify, resolve_name};

/// Protobuf's scalar keywords, mapped to their descriptor `Type`. Mirrors
/// `resolve.rs`'s `SCALAR_KEYWORDS` list — kept separate because this
/// one carries the type tag each keyword maps to, which `resolve.rs`
/// never needs (it only has to recognize that a name is *a* scalar, not
/// which one).
const SCALARS: &[(&str, Type)] = &[
    ("double", Type::TYPE_DOUBLE),
    ("float", Type::TYPE_FLOAT),
    ("int64", Type::TYPE_INT64),
    ("uint64", Type::TYPE_UINT64),
    ("int32", Type::TYPE_INT32),
    ("fixed64", Type::TYPE_FIXED64),
    ("fixed32", Type::TYPE_FIXED32),
    ("bool", Type::TYPE_BOOL),
    ("string", Type::TYPE_STRING),
    ("bytes", Type::TYPE_BYTES),
    ("uint32", Type::TYPE_UINT32),
    ("sfixed32", Type::TYPE_SFIXED32),
    ("sfixed64", Type::TYPE_SFIXED64),
    ("sint32", Type::TYPE_SINT32),
    ("sint64", Type::TYPE_SINT64),
];

// descriptor.proto field numbers, used as `SourceCodeInfo.Location.path`
// components.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const FILE_SERVICE: i32 = 6;
const FILE_EXTENSION: i32 = 7;

const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const MESSAGE_EXTENSION: i32 = 6;
const MESSAGE_ONEOF_DECL: i32 = 8;

const ENUM_VALUE: i32 = 2;

const SERVICE_METHOD: i32 = 2;

fn scalar_type(name: &str) -> Option<Type> {
    SCALARS.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

fn label_of(label: FieldLabel) -> Label {
    match label {
        FieldLabel::Required => Label::LABEL_REQUIRED,
        FieldLabel::Repeated => Label::LABEL_REPEATED,
        FieldLabel::Optional | FieldLabel::None => Label::LABEL_OPTIONAL,
    }
}

/// lowerCamelCase projection of a field's declared name, matching
/// `FieldDescriptorProto.json_name`'s convention: each `_`-separated
/// segment after the first is title-cased, the underscore dropped.
fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// 0-indexed `(line, column)` of `offset` within `source`, matching
/// `SourceCodeInfo.Location.span`'s own convention (unlike
/// `protocompile_diag::render`'s 1-based positions, which are for human
/// display rather than descriptor interchange).
fn line_col(source: &str, offset: u32) -> (i32, i32) {
    let offset = (offset as usize).min(source.len());
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = source[..line_start].matches('\n').count() as i32;
    let col = (offset - line_start) as i32;
    (line, col)
}

fn span_to_location_span(span: Span, source: &str) -> Vec<i32> {
    let (start_line, start_col) = line_col(source, span.start);
    let (end_line, end_col) = line_col(source, span.end);
    if start_line == end_line {
        vec![start_line, start_col, end_col]
    } else {
        vec![start_line, start_col, end_line, end_col]
    }
}

/// Populates `file.descriptor`'s `message_type`/`enum_type`/`service`/
/// `extension` from its AST. `dependencies` must be the same
/// position-ordered slice `file.imports` indexes into (see
/// `crate::merge::merge_imports`) — every type reference resolved here
/// goes through the same `lookup` table `resolve_file` already validated.
/// When `source_info` is set, also builds `file.descriptor.source_code_info`
/// with one `Location` per entity built, addressed by the same path this
/// pass places it at.
pub fn build_descriptor(file: &mut File, dependencies: &[&File], interner: &SharedInterner, source_info: bool) {
    let Some(root) = file.context.decl_body(file.context.root) else {
        return;
    };
    let root = root.clone();
    let package_fqn = if file.descriptor.package().is_empty() {
        InternId::NONE
    } else {
        interner.intern(file.descriptor.package())
    };

    let (messages, enums, services, extensions, locations) = {
        let builder = Builder {
            file,
            dependencies,
            interner,
            locations: RefCell::new(if source_info { Some(Vec::new()) } else { None }),
        };
        let mut messages = Vec::new();
        let mut enums = Vec::new();
        let mut services = Vec::new();
        let mut extensions = Vec::new();
        for (kind, ptr) in root.iter() {
            if kind != DeclKind::Def {
                continue;
            }
            let Some(def) = file.context.decl_def_raw(ptr) else {
                continue;
            };
            match def.classify() {
                DefKind::Message => {
                    let path = [FILE_MESSAGE_TYPE, messages.len() as i32];
                    messages.push(builder.build_message(ptr, package_fqn, &path));
                }
                DefKind::Enum => {
                    let path = [FILE_ENUM_TYPE, enums.len() as i32];
                    enums.push(builder.build_enum(ptr, package_fqn, &path));
                }
                DefKind::Service => {
                    let path = [FILE_SERVICE, services.len() as i32];
                    services.push(builder.build_service(ptr, package_fqn, &path));
                }
                DefKind::Extend => {
                    let base = extensions.len() as i32;
                    extensions.extend(builder.build_extend(ptr, package_fqn, &[], FILE_EXTENSION, base));
                }
                _ => {}
            }
        }
        (messages, enums, services, extensions, builder.locations.into_inner())
    };

    file.descriptor.message_type = messages;
    file.descriptor.enum_type = enums;
    file.descriptor.service = services;
    file.descriptor.extension = extensions;

    if let Some(locations) = locations {
        let mut info = SourceCodeInfo::new();
        info.location = locations;
        file.descriptor.source_code_info = protobuf::MessageField::some(info);
    }
}

struct Builder<'a> {
    file: &'a File,
    dependencies: &'a [&'a File],
    interner: &'a SharedInterner,
    /// `None` when `source_info` wasn't requested; recording is a no-op
    /// in that case rather than threading an `Option` through every
    /// call site.
    locations: RefCell<Option<Vec<Location>>>,
}

impl<'a> Builder<'a> {
    fn context(&self) -> &Context {
        &self.file.context
    }

    fn record(&self, path: &[i32], span: Span) {
        let mut locations = self.locations.borrow_mut();
        if let Some(locations) = locations.as_mut() {
            let mut location = Location::new();
            location.path = path.to_vec();
            location.span = span_to_location_span(span, &self.context().source);
            locations.push(location);
        }
    }

    /// Resolves a type reference the same way `resolve.rs` does, but
    /// returns the descriptor-ready `(Type, Option<fully-qualified
    /// type_name>)` pair instead of just diagnosing it. A reference that
    /// failed to resolve (already reported by `resolve_file`) comes back
    /// `None` and the caller simply leaves the field's type unset.
    fn resolve_type(&self, name_node: protocompile_ast::AstNode<NameData>, scope: InternId) -> Option<(Type, Option<String>)> {
        if name_node.is_zero() {
            return None;
        }
        let name = resolve_name(self.context(), name_node);
        if let Some(scalar) = scalar_type(&name) {
            return Some((scalar, None));
        }
        let table = LookupTable::new(self.file, self.dependencies);
        match lookup(self.interner, &table, scope, &name, |k| k.is_type()) {
            LookupResult::Found(sref) => {
                let kind = self
                    .file
                    .resolve(&sref, self.dependencies)
                    .map(|raw| raw.kind)
                    .unwrap_or(SymbolKind::Message);
                let fqn = format!(".{}", self.interner.resolve(sref.fqn));
                let ty = if kind == SymbolKind::Enum { Type::TYPE_ENUM } else { Type::TYPE_MESSAGE };
                Some((ty, Some(fqn)))
            }
            LookupResult::NotFound | LookupResult::WrongKind(_) => None,
        }
    }

    fn build_message(&self, ptr: RawPointer, scope: InternId, path: &[i32]) -> DescriptorProto {
        let context = self.context();
        let def = context.decl_def_raw(ptr).expect("classified as a message");
        let name = resolve_name(context, def.name);
        let fqn = qualify(self.interner, scope, &name);
        self.record(path, name_span(context, def.name));

        let mut proto = DescriptorProto::new();
        proto.set_name(name);

        let mut oneof_index_by_child: std::collections::HashMap<RawPointer, i32> = std::collections::HashMap::new();
        for (kind, child) in body_children(context, def.body) {
            if kind != DeclKind::Def {
                continue;
            }
            let Some(child_def) = context.decl_def_raw(child) else {
                continue;
            };
            if child_def.classify() == DefKind::Oneof {
                let oneof_idx = proto.oneof_decl.len() as i32;
                let oneof_name = resolve_name(context, child_def.name);
                let mut oneof_path = path.to_vec();
                oneof_path.extend([MESSAGE_ONEOF_DECL, oneof_idx]);
                self.record(&oneof_path, name_span(context, child_def.name));
                let mut oneof_proto = OneofDescriptorProto::new();
                oneof_proto.set_name(oneof_name);
                proto.oneof_decl.push(oneof_proto);
                for (member_kind, member_ptr) in body_children(context, child_def.body) {
                    if member_kind == DeclKind::Def {
                        oneof_index_by_child.insert(member_ptr, oneof_idx);
                    }
                }
            }
        }

        for (kind, child) in body_children(context, def.body) {
            if kind != DeclKind::Def {
                continue;
            }
            let Some(child_def) = context.decl_def_raw(child) else {
                continue;
            };
            match child_def.classify() {
                DefKind::Field | DefKind::Group => {
                    let mut field_path = path.to_vec();
                    field_path.extend([MESSAGE_FIELD, proto.field.len() as i32]);
                    let mut field = self.build_field(child, child_def, fqn, &field_path);
                    if let Some(&oneof_idx) = oneof_index_by_child.get(&child) {
                        field.set_oneof_index(oneof_idx);
                    }
                    if child_def.classify() == DefKind::Group {
                        let mut nested_path = path.to_vec();
                        nested_path.extend([MESSAGE_NESTED_TYPE, proto.nested_type.len() as i32]);
                        proto.nested_type.push(self.build_group_type(child_def, fqn, &nested_path));
                    }
                    proto.field.push(field);
                }
                DefKind::Message => {
                    let mut nested_path = path.to_vec();
                    nested_path.extend([MESSAGE_NESTED_TYPE, proto.nested_type.len() as i32]);
                    proto.nested_type.push(self.build_message(child, fqn, &nested_path));
                }
                DefKind::Enum => {
                    let mut enum_path = path.to_vec();
                    enum_path.extend([MESSAGE_ENUM_TYPE, proto.enum_type.len() as i32]);
                    proto.enum_type.push(self.build_enum(child, fqn, &enum_path));
                }
                DefKind::Extend => {
                    let base = proto.extension.len() as i32;
                    proto.extension.extend(self.build_extend(child, fqn, path, MESSAGE_EXTENSION, base));
                }
                DefKind::Oneof => {
                    // Oneof members were already folded into `proto.field`
                    // above, tagged with `oneof_index`; the oneof's own
                    // declaration entry was handled in the first pass.
                }
                DefKind::EnumValue | DefKind::Service | DefKind::Method | DefKind::OptionDef | DefKind::Corrupt => {}
            }
        }

        for entry in reserved_ranges(context, def.body) {
            match entry {
                protocompile_ast::ReservedEntry::Range(lo, hi) => {
                    if let (Some(lo), Some(hi)) = (int_token(context, lo), int_token(context, hi)) {
                        let mut range = protobuf::descriptor::descriptor_proto::ReservedRange::new();
                        range.set_start(lo);
                        range.set_end(hi + 1);
                        proto.reserved_range.push(range);
                    }
                }
                protocompile_ast::ReservedEntry::Name(tok) => {
                    proto.reserved_name.push(context.tokens.text(tok, &context.source).trim_matches('"').to_string());
                }
            }
        }

        for (lo, hi) in extension_ranges(context, def.body) {
            let mut range = protobuf::descriptor::descriptor_proto::ExtensionRange::new();
            range.set_start(lo);
            range.set_end(hi.saturating_add(1));
            proto.extension_range.push(range);
        }

        proto
    }

    /// A `group` field's implicit nested message type, named after the
    /// field itself (classic proto2 group sugar: `optional group Foo { ...
    /// }` defines both a field named `foo` and a nested message `Foo`).
    fn build_group_type(&self, def: &DeclDefData, scope: InternId, path: &[i32]) -> DescriptorProto {
        let context = self.context();
        let name = resolve_name(context, def.name);
        let fqn = qualify(self.interner, scope, &name);
        self.record(path, name_span(context, def.name));
        let mut proto = DescriptorProto::new();
        proto.set_name(name);
        for (kind, child) in body_children(context, def.body) {
            if kind != DeclKind::Def {
                continue;
            }
            let Some(child_def) = context.decl_def_raw(child) else {
                continue;
            };
            if matches!(child_def.classify(), DefKind::Field | DefKind::Group) {
                let mut field_path = path.to_vec();
                field_path.extend([MESSAGE_FIELD, proto.field.len() as i32]);
                proto.field.push(self.build_field(child, child_def, fqn, &field_path));
            }
        }
        proto
    }

    fn build_field(&self, _ptr: RawPointer, def: &DeclDefData, scope: InternId, path: &[i32]) -> FieldDescriptorProto {
        let context = self.context();
        self.record(path, name_span(context, def.name));
        let mut field = FieldDescriptorProto::new();
        let name = resolve_name(context, def.name);
        field.set_json_name(json_name(&name));
        field.set_name(name);
        field.set_label(EnumOrUnknown::new(label_of(def.label)));
        if let Some(number) = field_tag(context, def.value) {
            field.set_number(number);
        }
        if def.type_is_group {
            field.set_type(EnumOrUnknown::new(Type::TYPE_GROUP));
            field.set_type_name(format!(".{}", self.interner.resolve(qualify(self.interner, scope, &resolve_name(context, def.name)))));
        } else if let Some((ty, type_name)) = self.resolve_type(def.ty, scope) {
            field.set_type(EnumOrUnknown::new(ty));
            if let Some(type_name) = type_name {
                field.set_type_name(type_name);
            }
        }
        if def.label == FieldLabel::Optional {
            field.set_proto3_optional(true);
        }
        field
    }

    fn build_enum(&self, ptr: RawPointer, scope: InternId, path: &[i32]) -> EnumDescriptorProto {
        let context = self.context();
        let def = context.decl_def_raw(ptr).expect("classified as an enum");
        let name = resolve_name(context, def.name);
        self.record(path, name_span(context, def.name));

        let mut proto = EnumDescriptorProto::new();
        proto.set_name(name);
        for (kind, child) in body_children(context, def.body) {
            if kind != DeclKind::Def {
                continue;
            }
            let Some(child_def) = context.decl_def_raw(child) else {
                continue;
            };
            if child_def.classify() != DefKind::EnumValue {
                continue;
            }
            let value_name = resolve_name(context, child_def.name);
            let mut value_path = path.to_vec();
            value_path.extend([ENUM_VALUE, proto.value.len() as i32]);
            self.record(&value_path, name_span(context, child_def.name));
            let mut value = EnumValueDescriptorProto::new();
            value.set_name(value_name);
            if let Some(number) = field_tag(context, child_def.value) {
                value.set_number(number);
            }
            proto.value.push(value);
        }
        let _ = scope;
        proto
    }

    fn build_service(&self, ptr: RawPointer, scope: InternId, path: &[i32]) -> ServiceDescriptorProto {
        let context = self.context();
        let def = context.decl_def_raw(ptr).expect("classified as a service");
        let name = resolve_name(context, def.name);
        self.record(path, name_span(context, def.name));

        let mut proto = ServiceDescriptorProto::new();
        proto.set_name(name);
        for (kind, child) in body_children(context, def.body) {
            if kind != DeclKind::Def {
                continue;
            }
            let Some(child_def) = context.decl_def_raw(child) else {
                continue;
            };
            if child_def.classify() != DefKind::Method {
                continue;
            }
            let method_name = resolve_name(context, child_def.name);
            let mut method_path = path.to_vec();
            method_path.extend([SERVICE_METHOD, proto.method.len() as i32]);
            self.record(&method_path, name_span(context, child_def.name));
            let mut method = MethodDescriptorProto::new();
            method.set_name(method_name);
            if let Some((_, Some(type_name))) = self.resolve_type(child_def.ty, scope) {
                method.set_input_type(type_name);
            }
            if let Some((_, Some(type_name))) = self.resolve_type(child_def.return_type, scope) {
                method.set_output_type(type_name);
            }
            proto.method.push(method);
        }
        proto
    }

    fn build_extend(&self, ptr: RawPointer, scope: InternId, path_prefix: &[i32], field_number: i32, base_index: i32) -> Vec<FieldDescriptorProto> {
        let context = self.context();
        let Some(def) = context.decl_def_raw(ptr) else {
            return Vec::new();
        };
        let extendee_name = resolve_name(context, def.name);
        let table = LookupTable::new(self.file, self.dependencies);
        let extendee_fqn = match lookup(self.interner, &table, scope, &extendee_name, |k| matches!(k, SymbolKind::Message)) {
            LookupResult::Found(sref) => format!(".{}", self.interner.resolve(sref.fqn)),
            _ => return Vec::new(),
        };
        let mut fields = Vec::new();
        for (kind, child) in body_children(context, def.body) {
            if kind != DeclKind::Def {
                continue;
            }
            let Some(child_def) = context.decl_def_raw(child) else {
                continue;
            };
            if !matches!(child_def.classify(), DefKind::Field | DefKind::Group) {
                continue;
            }
            let mut field_path = path_prefix.to_vec();
            field_path.extend([field_number, base_index + fields.len() as i32]);
            let mut field = self.build_field(child, child_def, scope, &field_path);
            field.set_extendee(extendee_fqn.clone());
            fields.push(field);
        }
        fields
    }
}

fn reserved_ranges(
    context: &Context,
    body: protocompile_ast::AstNode<protocompile_ast::DeclBodyData>,
) -> Vec<protocompile_ast::ReservedEntry> {
    body_children(context, body)
        .into_iter()
        .filter(|(kind, _)| *kind == DeclKind::ReservedRange)
        .filter_map(|(_, ptr)| context.reserved_range_raw(ptr))
        .flat_map(|range| range.entries.iter().copied())
        .collect()
}

fn int_token(context: &Context, token: protocompile_ast::TokenId) -> Option<i32> {
    match context.literals.get(token) {
        Some(protocompile_ast::LiteralValue::Int(n)) => Some(*n as i32),
        Some(protocompile_ast::LiteralValue::UInt(n)) => Some(*n as i32),
        _ => None,
    }
}
