//! # protocompile-ir
//!
//! The linked intermediate representation: per-file symbol storage
//! ([`symbol::RawSymbol`]), the sorted-by-FQN [`table::SymbolTable`]
//! with its k-way merge, the partitioned [`import::ImportArray`], and the
//! [`file::File`] that ties a parsed [`protocompile_ast::Context`] to all
//! of the above plus the `FileDescriptorProto` being populated.
//!
//! This crate owns data shapes, not algorithms: building a file's symbol
//! table from its AST, merging in imports, and resolving names lives in
//! `protocompile-link`, which depends on this crate rather than the
//! other way around.

mod file;
mod import;
mod symbol;
mod table;

pub use file::File;
pub use import::{DirectKind, ImportArray, ImportEntry};
pub use symbol::{RawSymbol, SymbolKind, SymbolPointer};
pub use table::{SymbolRef, SymbolTable};
