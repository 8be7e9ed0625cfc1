//! Declarations: the `syntax`/`package`/`import`/reserved-range forms
//! that have their own fixed shape, and the permissive `DeclDef` union
//! that covers every kind of definition (message, enum, service, extend,
//! oneof, group, field, enum-value, method, option) behind a single
//! post-parse [`classify`](DeclDefData::classify) step.

use protocompile_base::ArenaPointer;

use crate::expr::ExprData;
use crate::name::NameData;
use crate::node::AstNode;
use crate::token::TokenId;

/// An untyped arena pointer paired with a [`DeclKind`] tag: the
/// `DeclBody` child representation spec §4.3 calls for — "a byte-per-
/// child kind tag and an untyped arena pointer", five bytes per child.
/// The tag tells a reader which arena (`DeclDefData`, `DeclBodyData`,
/// ...) the pointer indexes; reconstructing the typed pointer is the
/// caller's job once it has checked the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawPointer(u32);

impl RawPointer {
    pub const NULL: RawPointer = RawPointer(0);

    pub fn from_arena_ptr<T>(ptr: ArenaPointer<T>) -> Self {
        RawPointer(ptr.into_raw())
    }

    pub fn into_arena_ptr<T>(self) -> ArenaPointer<T> {
        ArenaPointer::from_raw(self.0)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// The top-level tag of a declaration inside a [`DeclBodyData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeclKind {
    Empty,
    Syntax,
    Package,
    Import,
    /// A definition — resolve further via `DeclDefData::classify`.
    Def,
    /// A nested body (the braces of a message/enum/service/oneof/extend).
    Nested,
    ReservedRange,
    ExtensionRange,
}

/// A parsed body: a message's, enum's, service's, oneof's, extend's, or
/// the whole file's top-level declaration list.
#[derive(Debug, Default, Clone)]
pub struct DeclBodyData {
    kinds: Vec<DeclKind>,
    pointers: Vec<RawPointer>,
}

impl DeclBodyData {
    pub fn push(&mut self, kind: DeclKind, pointer: RawPointer) {
        self.kinds.push(kind);
        self.pointers.push(pointer);
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<(DeclKind, RawPointer)> {
        Some((*self.kinds.get(index)?, *self.pointers.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclKind, RawPointer)> + '_ {
        self.kinds.iter().copied().zip(self.pointers.iter().copied())
    }

    /// All children of a given tag, e.g. every `Import` in a file body.
    pub fn of_kind(&self, kind: DeclKind) -> impl Iterator<Item = RawPointer> + '_ {
        self.iter().filter(move |(k, _)| *k == kind).map(|(_, p)| p)
    }
}

/// `syntax = "proto3";` or `edition = "2023";`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxData {
    pub keyword: TokenId,
    pub value: TokenId,
    pub semicolon: TokenId,
}

/// `package foo.bar.baz;`.
#[derive(Debug, Default, Clone)]
pub struct PackageData {
    pub name: AstNode<NameData>,
    pub semicolon: TokenId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportModifier {
    None,
    Public,
    Weak,
}

impl Default for ImportModifier {
    fn default() -> Self {
        ImportModifier::None
    }
}

/// `import ["public" | "weak"] "path.proto";`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportData {
    pub modifier: ImportModifier,
    pub path: TokenId,
    pub semicolon: TokenId,
}

#[derive(Debug, Clone, Copy)]
pub enum ReservedEntry {
    Range(TokenId, TokenId),
    Name(TokenId),
}

/// `reserved 2, 9 to 11, "foo";`.
#[derive(Debug, Default, Clone)]
pub struct ReservedRangeData {
    pub entries: Vec<ReservedEntry>,
    pub semicolon: TokenId,
}

/// `extensions 100 to 200, 1000 to max;`. Unlike `reserved`, extension
/// ranges have no string-name variant, so entries are plain `(start,
/// end)` token pairs rather than the `reserved`-shaped enum — `end` may
/// spell the literal keyword `max` (spec's extension-range sentinel for
/// the highest valid field number), which only the consuming pass needs
/// to know how to read.
#[derive(Debug, Default, Clone)]
pub struct ExtensionRangeData {
    pub entries: Vec<(TokenId, TokenId)>,
    pub semicolon: TokenId,
}

/// The keyword that, if present, unambiguously classifies a `DeclDef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Message,
    Enum,
    Service,
    Extend,
    Oneof,
    Rpc,
    OptionKw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    None,
    Optional,
    Required,
    Repeated,
}

impl Default for FieldLabel {
    fn default() -> Self {
        FieldLabel::None
    }
}

/// What a [`DeclDefData`] turned out to mean, once classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Message,
    Enum,
    Service,
    Extend,
    Oneof,
    Group,
    Field,
    EnumValue,
    Method,
    OptionDef,
    /// Too malformed to classify; downstream passes ignore it.
    Corrupt,
}

/// The permissive union of every "definition" declaration kind. A single
/// shape holds every field any of `message|enum|service|extend|oneof|
/// group|field|enum-value|method|option` might populate; `classify`
/// inspects which fields actually got filled in and decides.
#[derive(Debug, Default, Clone)]
pub struct DeclDefData {
    pub keyword: Option<Keyword>,
    pub label: FieldLabel,
    /// Set when the parser saw the literal `group` keyword as the type —
    /// needed because a `group` field has no distinguishing keyword of
    /// its own otherwise (spec §4.3: "recognizes `optional group` as
    /// group").
    pub type_is_group: bool,
    pub ty: AstNode<NameData>,
    pub name: AstNode<NameData>,
    pub signature: AstNode<DeclBodyData>,
    /// A method's response type, e.g. the `Out` of `rpc M(In) returns
    /// (Out)`. `ty` doubles as the request type in that case. Not part
    /// of spec.md's literal field list for `DeclDef`, but needed to
    /// represent a method's signature without inventing a second node
    /// kind just for RPC shapes — still a single nullable field that
    /// `classify` never has to inspect.
    pub return_type: AstNode<NameData>,
    pub equals: TokenId,
    pub value: AstNode<ExprData>,
    pub options: AstNode<DeclBodyData>,
    pub body: AstNode<DeclBodyData>,
    pub semicolon: TokenId,
}

impl DeclDefData {
    /// Decides which definition kind this `DeclDef` represents from its
    /// populated fields. Pure function of `self`, so calling it twice on
    /// the same data always returns the same answer.
    pub fn classify(&self) -> DefKind {
        if let Some(keyword) = self.keyword {
            return match keyword {
                Keyword::Message => DefKind::Message,
                Keyword::Enum => DefKind::Enum,
                Keyword::Service => DefKind::Service,
                Keyword::Extend => DefKind::Extend,
                Keyword::Oneof => DefKind::Oneof,
                Keyword::Rpc => DefKind::Method,
                Keyword::OptionKw => DefKind::OptionDef,
            };
        }
        if self.type_is_group {
            return DefKind::Group;
        }
        if !self.ty.is_zero() {
            return DefKind::Field;
        }
        if !self.name.is_zero() && !self.value.is_zero() {
            return DefKind::EnumValue;
        }
        DefKind::Corrupt
    }
}
