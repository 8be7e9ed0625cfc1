#![cfg_attr(docsrs, feature(doc_cfg))]

//! # protocompile-base
//!
//! Pure structural atoms shared by every other protocompile crate.
//!
//! - [`Arena`]/[`ArenaPointer`] — index-addressed bump allocation for AST and IR storage
//! - [`Interner`]/[`SharedInterner`]/[`InternId`] — string interning, single- and multi-threaded
//! - [`Span`] — byte-offset source locations
//! - [`ImportPath`] — canonical forward-slash file paths
//!
//! This crate has no knowledge of Protobuf grammar, tokens, or diagnostics.
//! It provides only the generic, reusable infrastructure the rest of the
//! compiler builds on.

pub mod arena;
pub mod intern;
pub mod path;
pub mod span;

pub use arena::{Arena, ArenaPointer};
pub use intern::{InternId, InternIdExt, Interner, SharedInterner};
pub use path::ImportPath;
pub use span::Span;
