//! Pass 2 (spec.md §4.6): builds a file's [`ImportArray`] from its own
//! `import` declarations plus the transitive-public closure reachable
//! through them, then merges each array entry's *local* symbol table
//! into this file's complete, resolvable [`protocompile_ir::File::symbols`].
//!
//! Merging only ever touches an entry's `local_symbols` — never its own
//! already-merged `symbols` — which is what keeps a non-public transitive
//! import's definitions invisible past the file that imports it
//! non-publicly: that file's own `local_symbols` never contains them, so
//! they never propagate into whoever imports *that* file in turn. A
//! file that sits several import-hops away is only ever merged in
//! directly if the public chain actually reaches it (spec §4.5's
//! visibility rule), exactly the set [`ImportArray::build`]'s transitive
//! closure walk produces.

use std::sync::Arc;

use protocompile_ast::DeclKind;
use protocompile_base::ImportPath;
use protocompile_diag::{CompileError, Diagnostic, Reporter};
use protocompile_ir::{DirectKind, File, ImportArray, SymbolRef, SymbolTable};

/// Reads `file`'s own `import` lines off its parsed AST, in source
/// order, with their `public`/`weak`/plain modifier.
fn direct_imports(file: &File) -> Vec<(ImportPath, DirectKind)> {
    let Some(root) = file.context.decl_body(file.context.root) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for ptr in root.of_kind(DeclKind::Import) {
        let Some(import) = file.context.import_raw(ptr) else {
            continue;
        };
        let path = import_path_text(file, import.path);
        let kind = match import.modifier {
            protocompile_ast::ImportModifier::Public => DirectKind::Public,
            protocompile_ast::ImportModifier::Weak => DirectKind::Weak,
            protocompile_ast::ImportModifier::None => DirectKind::Plain,
        };
        out.push((ImportPath::new(path), kind));
    }
    out
}

/// The paths a file's own `import` declarations name, in source order,
/// each exactly once even if written more than once. `protocompile-driver`
/// calls this right after parsing, before the file's dependencies exist,
/// to learn which other files it must resolve and link first.
pub fn direct_import_paths(file: &File) -> Vec<ImportPath> {
    let mut seen = std::collections::HashSet::new();
    direct_imports(file)
        .into_iter()
        .filter_map(|(path, _)| seen.insert(path.clone()).then_some(path))
        .collect()
}

fn import_path_text(file: &File, token: protocompile_ast::TokenId) -> String {
    if let Some(protocompile_ast::LiteralValue::Str(text)) = file.context.literals.get(token) {
        return text.clone();
    }
    file.context.tokens.text(token, &file.context.source).trim_matches('"').to_string()
}

/// A file resolved by path — the driver's completed-task map, or
/// anything else able to hand back an already-linked dependency.
pub trait DependencyLookup {
    fn lookup(&self, path: &ImportPath) -> Option<Arc<File>>;
}

impl<F: Fn(&ImportPath) -> Option<Arc<File>>> DependencyLookup for F {
    fn lookup(&self, path: &ImportPath) -> Option<Arc<File>> {
        self(path)
    }
}

/// Builds `file.imports` and `file.symbols`, given a way to fetch any
/// already-linked dependency by path. Every path named anywhere in the
/// resulting [`ImportArray`] — direct or transitive-public — must
/// resolve through `dependencies`; a miss is an internal-error-class
/// invariant violation (the driver is responsible for only linking a
/// file once every import its AST or its imports' re-exports name has
/// itself finished linking).
///
/// Returns the files backing each position of `file.imports`, in
/// position order — the slice every later pass (`resolve_file`,
/// `build_descriptor`) must receive verbatim, since `SymbolRef::file_index`
/// indexes into exactly this slice.
pub fn merge_imports(
    file: &mut File,
    dependencies: &impl DependencyLookup,
    reporter: &Reporter,
) -> Result<Vec<Arc<File>>, CompileError> {
    let direct = direct_imports(file);

    for (path, _) in &direct {
        if *path == file.path {
            reporter.report_error(Diagnostic::error(format!(
                "\"{}\" imports itself",
                path.as_str()
            )))?;
        }
    }

    let array = ImportArray::build(&direct, |path| match dependencies.lookup(path) {
        Some(dep) => Box::new(dep.imports.reexported_paths().collect::<Vec<_>>().into_iter()),
        None => Box::new(std::iter::empty()),
    });

    let mut ordered: Vec<Arc<File>> = Vec::with_capacity(array.len());
    let mut rewritten: Vec<SymbolTable> = Vec::with_capacity(array.len());
    for (position, entry) in array.entries().iter().enumerate() {
        let dep = dependencies.lookup(&entry.path).unwrap_or_else(|| {
            panic!(
                "protocompile-link: \"{}\" names import \"{}\" which was never linked before merge",
                file.path.as_str(),
                entry.path.as_str()
            )
        });
        let file_index = (position + 1) as i32;
        let mut table = SymbolTable::new();
        for local in dep.local_symbols.iter() {
            table.push(SymbolRef::foreign(file_index, local.ptr, local.fqn));
        }
        rewritten.push(table);
        ordered.push(dep);
    }

    let mut refs: Vec<&SymbolTable> = vec![&file.local_symbols];
    refs.extend(rewritten.iter());
    file.symbols = SymbolTable::merge(&refs);
    file.imports = array;

    Ok(ordered)
}

/// Builds an "import \"X\" not used" warning diagnostic anchored at
/// nothing more precise than the file itself — the AST doesn't retain a
/// span-addressable handle per import declaration beyond its raw tokens,
/// so this names the path rather than pointing a caret at it.
pub fn unused_import_warning(path: &ImportPath) -> Diagnostic {
    Diagnostic::warning(format!("import \"{}\" not used", path.as_str()))
}
