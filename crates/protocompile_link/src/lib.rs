//! Links a single parsed file (spec.md §4, "Symbol Resolution Engine"):
//! interns its own symbols, merges in its import closure's, resolves
//! every cross-reference its AST makes, and builds the `FileDescriptorProto`
//! a caller hands off to whatever consumes it next (an option interpreter,
//! a serializer — both external collaborators per spec §1).
//!
//! [`link_file`] runs passes 1 through 6 (spec §4.6) in order, threading
//! one [`protocompile_diag::Reporter`] through all of them so a fatal
//! diagnostic anywhere aborts the remaining passes via `?` — the same
//! short-circuit-on-fatal contract `protocompile_diag::Reporter` itself
//! documents. This crate never decides *how* its caller schedules files
//! against each other or discovers their dependencies; that's
//! `protocompile-driver`'s job ([`merge::DependencyLookup`] is the seam
//! between them).

mod descriptor;
mod extensions;
mod lookup;
mod merge;
mod resolve;
mod state;
mod symbols;

use std::sync::Arc;

use protocompile_diag::{CompileError, Reporter};
use protocompile_ir::File;

pub use extensions::{ExtensionKey, ExtensionOrigin, ExtensionRegistry};
pub use merge::{direct_import_paths, unused_import_warning, DependencyLookup};
pub use state::FileState;

/// Runs every linking pass over `file` in order:
///
/// 1. `symbols::build_symbols` — intern this file's own definitions.
/// 2. sort `local_symbols`, report local duplicate-definition errors.
/// 3. `merge::merge_imports` — build the import array, merge in each
///    dependency's `local_symbols`.
/// 4. `resolve::resolve_file` — validate every type/extendee/method
///    reference against the merged table.
/// 5. `descriptor::build_descriptor` — populate `file.descriptor`, and
///    (when `source_info` is set) its `source_code_info`.
/// 6. emit unused-import warnings for any direct import `resolve_file`
///    never marked used.
///
/// Returns the dependency files in `file.imports`' position order — the
/// same slice `dependencies` was threaded through passes 4-5 as, which a
/// caller building a whole-program index may want to keep around (e.g.
/// to free them once nothing else references this file any longer).
///
/// A fatal [`CompileError`] aborts immediately; anything already reported
/// to `reporter` before that point stays recorded.
pub fn link_file(
    file: &mut File,
    dependency_lookup: &impl DependencyLookup,
    reporter: &Reporter,
    extensions: &ExtensionRegistry,
    generate_descriptor: bool,
    source_info: bool,
) -> Result<Vec<Arc<File>>, CompileError> {
    symbols::build_symbols(file, reporter)?;
    file.local_symbols.sort();
    for dup in file.local_symbols.local_duplicates() {
        let name = file.interner.resolve(dup);
        reporter.report_error(protocompile_diag::Diagnostic::error(format!(
            "\"{name}\" is defined more than once in \"{}\"",
            file.path.as_str()
        )))?;
    }

    let ordered = merge::merge_imports(file, dependency_lookup, reporter)?;
    let dependencies: Vec<&File> = ordered.iter().map(|dep| dep.as_ref()).collect();

    resolve::resolve_file(file, &dependencies, &file.interner.clone(), reporter, extensions)?;

    if generate_descriptor {
        descriptor::build_descriptor(file, &dependencies, &file.interner.clone(), source_info);
    }

    for entry in file.imports.unused_candidates() {
        reporter.report_warning(merge::unused_import_warning(&entry.path));
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use protocompile_ast::parse_source;
    use protocompile_base::{ImportPath, SharedInterner};
    use protocompile_diag::{AbortPolicy, Reporter};
    use protocompile_ir::File;

    use super::*;

    struct NoAbort;
    impl AbortPolicy for NoAbort {
        fn should_abort(&self, _diagnostic: &protocompile_diag::Diagnostic) -> bool {
            false
        }
    }

    fn parse_file(path: &str, source: &str, interner: &SharedInterner) -> File {
        let import_path = ImportPath::new(path);
        let context = parse_source(import_path.clone(), source.to_string(), interner.clone());
        File::new(import_path, context, interner.clone())
    }

    /// A fixed table of already-linked files, keyed by path — stands in
    /// for the driver's completed-task map.
    #[derive(Default, Clone)]
    struct FixedDependencies(HashMap<String, Arc<File>>);

    impl DependencyLookup for FixedDependencies {
        fn lookup(&self, path: &ImportPath) -> Option<Arc<File>> {
            self.0.get(path.as_str()).cloned()
        }
    }

    #[test]
    fn links_a_self_contained_file_with_no_imports() {
        let interner = SharedInterner::new();
        let mut file = parse_file(
            "a.proto",
            "syntax = \"proto3\"; message M { string name = 1; int32 id = 2; }",
            &interner,
        );
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let deps = FixedDependencies::default();

        let ordered = link_file(&mut file, &deps, &reporter, &extensions, true, false).expect("linking a closed file should not abort");
        assert!(ordered.is_empty());
        assert_eq!(file.descriptor.message_type.len(), 1);
        let message = &file.descriptor.message_type[0];
        assert_eq!(message.name(), "M");
        assert_eq!(message.field.len(), 2);
        assert_eq!(message.field[0].name(), "name");
        assert_eq!(message.field[1].number(), 2);
    }

    #[test]
    fn extensions_declaration_populates_the_descriptors_extension_range() {
        let interner = SharedInterner::new();
        let mut file = parse_file(
            "ranges.proto",
            "message Base { extensions 100 to 200, 1000 to max; }",
            &interner,
        );
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let deps = FixedDependencies::default();

        link_file(&mut file, &deps, &reporter, &extensions, true, false).expect("linking a closed file should not abort");
        let message = &file.descriptor.message_type[0];
        assert_eq!(message.extension_range.len(), 2);
        assert_eq!(message.extension_range[0].start(), 100);
        assert_eq!(message.extension_range[0].end(), 201);
        assert_eq!(message.extension_range[1].start(), 1000);
        assert_eq!(message.extension_range[1].end(), 536_870_912);
    }

    #[test]
    fn source_info_populates_a_location_per_message_and_field() {
        let interner = SharedInterner::new();
        let mut file = parse_file("info.proto", "message M { string name = 1; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let deps = FixedDependencies::default();

        link_file(&mut file, &deps, &reporter, &extensions, true, true).expect("linking a closed file should not abort");
        let info = file.descriptor.source_code_info.as_ref().expect("source_info was requested");
        assert!(info.location.iter().any(|loc| loc.path == vec![4, 0]), "message path missing");
        assert!(info.location.iter().any(|loc| loc.path == vec![4, 0, 2, 0]), "field path missing");
        let field_location = info.location.iter().find(|loc| loc.path == vec![4, 0, 2, 0]).unwrap();
        assert!(!field_location.span.is_empty());
    }

    #[test]
    fn source_info_is_absent_when_not_requested() {
        let interner = SharedInterner::new();
        let mut file = parse_file("noinfo.proto", "message M { string name = 1; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let deps = FixedDependencies::default();

        link_file(&mut file, &deps, &reporter, &extensions, true, false).expect("linking a closed file should not abort");
        assert!(file.descriptor.source_code_info.is_none());
    }

    #[test]
    fn local_duplicate_definitions_are_reported() {
        let interner = SharedInterner::new();
        let mut file = parse_file(
            "dup.proto",
            "message M { int32 a = 1; } message M { int32 b = 1; }",
            &interner,
        );
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let deps = FixedDependencies::default();

        link_file(&mut file, &deps, &reporter, &extensions, false, false).expect("non-fatal duplicate errors shouldn't abort under NoAbort");
        assert!(reporter
            .diagnostics()
            .iter()
            .any(|d| d.message().contains("more than once")));
    }

    #[test]
    fn imported_message_type_resolves_across_files() {
        let interner = SharedInterner::new();
        let mut imported = parse_file("dep.proto", "message Imported { int32 x = 1; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let empty_deps = FixedDependencies::default();
        link_file(&mut imported, &empty_deps, &reporter, &extensions, true, false).expect("dep should link cleanly");
        let imported = Arc::new(imported);

        let mut deps = HashMap::new();
        deps.insert("dep.proto".to_string(), imported.clone());
        let deps = FixedDependencies(deps);

        let mut main = parse_file(
            "main.proto",
            "import \"dep.proto\"; message Holder { Imported inner = 1; }",
            &interner,
        );
        let ordered = link_file(&mut main, &deps, &reporter, &extensions, true, false).expect("main should link using the imported type");
        assert_eq!(ordered.len(), 1);
        assert!(!reporter.diagnostics().iter().any(|d| d.message().contains("unknown field type")));
        let message = &main.descriptor.message_type[0];
        assert_eq!(message.field[0].type_name(), ".Imported");
    }

    #[test]
    fn unknown_field_type_is_reported() {
        let interner = SharedInterner::new();
        let mut file = parse_file("bad.proto", "message M { Nope field = 1; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let deps = FixedDependencies::default();
        link_file(&mut file, &deps, &reporter, &extensions, false, false).expect("an unresolved type is non-fatal under NoAbort");
        assert!(reporter.diagnostics().iter().any(|d| d.message().contains("unknown field type")));
    }

    #[test]
    fn unused_direct_import_produces_a_warning() {
        let interner = SharedInterner::new();
        let mut dep = parse_file("unused.proto", "message Unused { int32 x = 1; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let empty_deps = FixedDependencies::default();
        link_file(&mut dep, &empty_deps, &reporter, &extensions, false, false).unwrap();
        let dep = Arc::new(dep);

        let mut deps = HashMap::new();
        deps.insert("unused.proto".to_string(), dep);
        let deps = FixedDependencies(deps);

        let mut main = parse_file("main2.proto", "import \"unused.proto\"; message M { int32 x = 1; }", &interner);
        link_file(&mut main, &deps, &reporter, &extensions, false, false).unwrap();
        assert!(reporter.diagnostics().iter().any(|d| d.message().contains("not used")));
    }

    #[test]
    fn self_import_is_rejected() {
        let interner = SharedInterner::new();
        let mut file = parse_file("self.proto", "import \"self.proto\"; message M { int32 x = 1; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let deps = FixedDependencies::default();
        link_file(&mut file, &deps, &reporter, &extensions, false, false).unwrap();
        assert!(reporter.diagnostics().iter().any(|d| d.message().contains("imports itself")));
    }

    #[test]
    fn cross_file_extension_tag_collisions_are_detected() {
        let interner = SharedInterner::new();
        let mut base = parse_file("base.proto", "message Base { extensions 100 to 200; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let empty_deps = FixedDependencies::default();
        link_file(&mut base, &empty_deps, &reporter, &extensions, false, false).unwrap();
        let base = Arc::new(base);

        let mut deps = HashMap::new();
        deps.insert("base.proto".to_string(), base.clone());
        let deps = FixedDependencies(deps);

        let mut first = parse_file(
            "ext_a.proto",
            "import \"base.proto\"; extend Base { optional int32 a = 100; }",
            &interner,
        );
        link_file(&mut first, &deps, &reporter, &extensions, false, false).unwrap();

        let mut second = parse_file(
            "ext_b.proto",
            "import \"base.proto\"; extend Base { optional int32 b = 100; }",
            &interner,
        );
        link_file(&mut second, &deps, &reporter, &extensions, false, false).unwrap();

        assert!(reporter
            .diagnostics()
            .iter()
            .any(|d| d.message().contains("has already been used")));
    }

    #[test]
    fn extension_tag_outside_the_declared_range_is_rejected() {
        let interner = SharedInterner::new();
        let mut base = parse_file("ranged.proto", "message Base { extensions 100 to 200; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let empty_deps = FixedDependencies::default();
        link_file(&mut base, &empty_deps, &reporter, &extensions, false, false).unwrap();
        let base = Arc::new(base);

        let mut deps = HashMap::new();
        deps.insert("ranged.proto".to_string(), base);
        let deps = FixedDependencies(deps);

        let mut out_of_range = parse_file(
            "ext_out.proto",
            "import \"ranged.proto\"; extend Base { optional int32 a = 50; }",
            &interner,
        );
        link_file(&mut out_of_range, &deps, &reporter, &extensions, false, false).unwrap();

        assert!(reporter
            .diagnostics()
            .iter()
            .any(|d| d.message().contains("outside the extension range")));
    }

    #[test]
    fn extension_tag_inside_the_declared_range_is_accepted() {
        let interner = SharedInterner::new();
        let mut base = parse_file("ranged2.proto", "message Base { extensions 100 to 200; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let empty_deps = FixedDependencies::default();
        link_file(&mut base, &empty_deps, &reporter, &extensions, false, false).unwrap();
        let base = Arc::new(base);

        let mut deps = HashMap::new();
        deps.insert("ranged2.proto".to_string(), base);
        let deps = FixedDependencies(deps);

        let mut in_range = parse_file(
            "ext_in.proto",
            "import \"ranged2.proto\"; extend Base { optional int32 a = 150; }",
            &interner,
        );
        link_file(&mut in_range, &deps, &reporter, &extensions, false, false).unwrap();

        assert!(!reporter
            .diagnostics()
            .iter()
            .any(|d| d.message().contains("outside the extension range")));
    }

    #[test]
    fn proto3_field_cannot_reference_a_proto2_enum() {
        let interner = SharedInterner::new();
        let mut dep = parse_file("legacy.proto", "enum Status { OK = 0; }", &interner);
        let reporter = Reporter::new(NoAbort);
        let extensions = ExtensionRegistry::new();
        let empty_deps = FixedDependencies::default();
        link_file(&mut dep, &empty_deps, &reporter, &extensions, true, false).unwrap();
        let dep = Arc::new(dep);

        let mut deps = HashMap::new();
        deps.insert("legacy.proto".to_string(), dep);
        let deps = FixedDependencies(deps);

        let mut main = parse_file(
            "main3.proto",
            "syntax = \"proto3\"; import \"legacy.proto\"; message M { Status s = 1; }",
            &interner,
        );
        link_file(&mut main, &deps, &reporter, &extensions, false, false).unwrap();
        assert!(reporter
            .diagnostics()
            .iter()
            .any(|d| d.message().contains("proto3 field may not reference proto2 enum")));
    }
}
