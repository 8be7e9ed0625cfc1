//! Spec.md §6 "External Interfaces": the seam between this crate's
//! scheduling and wherever file content actually comes from — a
//! filesystem, an in-memory map, a network fetch, a precompiled
//! descriptor set. `protocompile-driver` never reads a file itself.

use std::io::Read;

use protocompile_ast::Context;
use protocompile_base::ImportPath;
use protocompile_diag::CompileError;

/// What a [`Resolver`] hands back for one requested path.
///
/// Three of the four variants let a caller skip work the driver would
/// otherwise do itself: supplying an [`SearchResult::Ast`] skips lexing
/// and parsing, and supplying [`SearchResult::Proto`] or
/// [`SearchResult::Descriptor`] additionally skips linking — the driver
/// builds the file's local symbol table straight from the descriptor's
/// own message/enum/service entries (the same thing a descriptor pool
/// does for an embedded `FileDescriptorProto`, e.g. the well-known
/// types) and publishes it without ever running `protocompile-link`.
pub enum SearchResult {
    /// Raw bytes to lex and parse, plus an optional closer run once the
    /// driver is done with the bytes (dropping the handle isn't enough
    /// when the resolver needs to do something side-effecting on close,
    /// e.g. releasing a pooled file descriptor).
    Source {
        reader: Box<dyn Read + Send>,
        closer: Option<Box<dyn FnOnce() + Send>>,
    },
    /// A pre-built AST; parsing is skipped but the file still goes
    /// through every linking pass.
    Ast(Box<Context>),
    /// A pre-built descriptor proto; linking is skipped and the file's
    /// symbol table is derived directly from the proto's own entries.
    Proto(Box<protobuf::descriptor::FileDescriptorProto>),
    /// A pre-built, already fully-resolved descriptor; linking is
    /// skipped. Modeled the same as [`SearchResult::Proto`] here since
    /// this compiler has no separate "resolved descriptor" type of its
    /// own beyond `FileDescriptorProto` plus a symbol table.
    Descriptor(Box<protobuf::descriptor::FileDescriptorProto>),
}

/// A strategy that maps an import path to a [`SearchResult`].
///
/// Resolvers compose as a chain: [`ChainResolver`] tries each resolver
/// in turn and returns the first one that finds the path, so a caller
/// can layer an in-memory override map over a filesystem search path
/// over a well-known-types registry without any one of them knowing
/// about the others.
pub trait Resolver: Send + Sync {
    fn resolve(&self, path: &ImportPath) -> Result<SearchResult, CompileError>;
}

impl<F> Resolver for F
where
    F: Fn(&ImportPath) -> Result<SearchResult, CompileError> + Send + Sync,
{
    fn resolve(&self, path: &ImportPath) -> Result<SearchResult, CompileError> {
        self(path)
    }
}

/// Tries each resolver in order, returning the first `Ok`. If every
/// resolver fails, returns the last resolver's error — the one most
/// likely to name the search root the caller actually expected to find
/// the file under.
pub struct ChainResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        ChainResolver { resolvers }
    }
}

impl Resolver for ChainResolver {
    fn resolve(&self, path: &ImportPath) -> Result<SearchResult, CompileError> {
        let mut last_err = None;
        for resolver in &self.resolvers {
            match resolver.resolve(path) {
                Ok(result) => return Ok(result),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| CompileError::Resolver {
            path: path.as_str().to_string(),
            message: "no resolver in the chain was configured".to_string(),
        }))
    }
}
