//! Spec.md §4.1's algorithm: the task map, the semaphore, and the
//! release-before-recursing/reacquire-before-linking protocol that keeps
//! a deep import chain from deadlocking against a small parallelism cap.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Read;
use std::sync::{Arc, Mutex};

use protocompile_ast::Context;
use protocompile_base::{ImportPath, SharedInterner};
use protocompile_diag::{CompileError, Reporter};
use protocompile_ir::File;
use protocompile_link::{direct_import_paths, ExtensionRegistry};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::cancel::CancelSignal;
use crate::descriptor_symbols;
use crate::options::CompilerOptions;
use crate::resolver::{Resolver, SearchResult};
use crate::task::{TaskResult, TaskSlot};

/// A file resolved by path out of whatever's already finished linking in
/// this compile — the driver's own completed-task map, projected down to
/// the [`protocompile_link::DependencyLookup`] shape the linker expects.
struct DependencyMap(HashMap<ImportPath, Arc<File>>);

impl protocompile_link::DependencyLookup for DependencyMap {
    fn lookup(&self, path: &ImportPath) -> Option<Arc<File>> {
        self.0.get(path).cloned()
    }
}

/// One [`compile`] call's shared state: everything spec §4.1's "State"
/// paragraph lists, plus the reporter, extension registry, and intern
/// pool every task in this run shares. Methods that need to hand a copy
/// of the owning `Arc` to a spawned task take `&Arc<Driver>` as a plain
/// parameter rather than as `self`, since `&Arc<Self>` isn't one of the
/// receiver types Rust recognizes.
struct Driver {
    resolver: Arc<dyn Resolver>,
    source_info: bool,
    tasks: Mutex<HashMap<ImportPath, Arc<TaskSlot>>>,
    semaphore: Arc<Semaphore>,
    extensions: ExtensionRegistry,
    interner: SharedInterner,
    reporter: Arc<Reporter>,
    cancel: CancelSignal,
}

impl Driver {
    fn new(options: CompilerOptions, reporter: Arc<Reporter>, cancel: CancelSignal) -> Arc<Self> {
        Arc::new(Driver {
            resolver: options.resolver.clone(),
            source_info: options.source_info,
            tasks: Mutex::new(HashMap::new()),
            semaphore: Arc::new(Semaphore::new(options.effective_parallelism())),
            extensions: ExtensionRegistry::new(),
            interner: SharedInterner::new(),
            reporter,
            cancel,
        })
    }

    async fn resolve(&self, path: &ImportPath) -> Result<SearchResult, CompileError> {
        let resolver = self.resolver.clone();
        let path = path.clone();
        tokio::task::spawn_blocking(move || resolver.resolve(&path))
            .await
            .map_err(|_| CompileError::Fatal("resolver task panicked".to_string()))?
    }

    async fn read_source(
        &self,
        path: &ImportPath,
        mut reader: Box<dyn Read + Send>,
        closer: Option<Box<dyn FnOnce() + Send>>,
    ) -> Result<String, CompileError> {
        let path_text = path.as_str().to_string();
        tokio::task::spawn_blocking(move || {
            let mut buf = String::new();
            let read_result = reader.read_to_string(&mut buf).map(|_| buf);
            if let Some(close) = closer {
                close();
            }
            read_result
        })
        .await
        .map_err(|_| CompileError::Fatal("resolver read task panicked".to_string()))?
        .map_err(|err| CompileError::Resolver {
            path: path_text,
            message: err.to_string(),
        })
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, CompileError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(CompileError::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                Ok(permit.expect("driver semaphore is never closed while a compile is in flight"))
            }
        }
    }

    /// Spec §4.1 edge case: "If a descriptor is supplied, linking is
    /// skipped and the IR is constructed directly from it." The file's
    /// own symbol table is read straight off the descriptor's own
    /// entries (`descriptor_symbols::populate`) rather than off an AST
    /// walk, so it can still serve as another file's import.
    fn build_from_descriptor(&self, path: ImportPath, proto: protobuf::descriptor::FileDescriptorProto) -> TaskResult {
        let context = Context::new(path.clone(), String::new(), self.interner.clone());
        let mut file = File::new(path, context, self.interner.clone());
        descriptor_symbols::populate(
            &proto,
            &self.interner,
            &file.context,
            &mut file.symbols_arena,
            &mut file.local_symbols,
        );
        file.local_symbols.sort();
        file.symbols = file.local_symbols.clone();
        file.descriptor = proto;
        Ok(Arc::new(file))
    }
}

/// Spec §4.1 step 1: under the task map's mutex, either hands back an
/// already-scheduled task's slot, or creates one and spawns the work
/// that will eventually complete it. Guarantees at-most-one build per
/// path for the lifetime of `driver`.
fn ensure_scheduled(driver: &Arc<Driver>, path: ImportPath) -> Arc<TaskSlot> {
    let mut tasks = driver.tasks.lock().expect("driver task map mutex poisoned");
    if let Some(slot) = tasks.get(&path) {
        return slot.clone();
    }
    let slot = Arc::new(TaskSlot::new());
    tasks.insert(path.clone(), slot.clone());
    drop(tasks);

    let driver = driver.clone();
    let slot_for_task = slot.clone();
    tokio::spawn(async move {
        let result = run_task(driver, path).await;
        slot_for_task.complete(result);
    });
    slot
}

/// Schedules `path` if needed and waits for its result, racing against
/// the compile's cancellation signal — one of spec §5's three
/// suspension points.
async fn wait_for(driver: &Arc<Driver>, path: ImportPath) -> TaskResult {
    let slot = ensure_scheduled(driver, path);
    tokio::select! {
        _ = driver.cancel.cancelled() => Err(CompileError::Cancelled),
        result = slot.wait() => result,
    }
}

/// Spec §4.1 steps 2-4. Acquires a permit, resolves `path`, and either
/// builds the IR directly (a descriptor-shaped [`SearchResult`]) or
/// parses then links it, recursing into its direct imports with the
/// permit released in between.
async fn run_task(driver: Arc<Driver>, path: ImportPath) -> TaskResult {
    if driver.cancel.is_cancelled() {
        return Err(CompileError::Cancelled);
    }
    let permit = driver.acquire_permit().await?;

    let search = driver.resolve(&path).await?;
    match search {
        SearchResult::Proto(proto) | SearchResult::Descriptor(proto) => {
            drop(permit);
            driver.build_from_descriptor(path, *proto)
        }
        SearchResult::Ast(context) => link(driver, path, *context, permit).await,
        SearchResult::Source { reader, closer } => {
            let source = driver.read_source(&path, reader, closer).await?;
            drop(permit);
            let context = protocompile_ast::parse_source(path.clone(), source, driver.interner.clone());
            let permit = driver.acquire_permit().await?;
            link(driver, path, context, permit).await
        }
    }
}

/// Spec §4.1 step 2's release/reacquire protocol: releases the permit
/// this task is holding before recursing into its dependencies (so a
/// deep import chain beyond the parallelism cap doesn't deadlock every
/// in-flight task against each other), then reacquires one before
/// actually running the linker.
async fn link(driver: Arc<Driver>, path: ImportPath, context: Context, permit: OwnedSemaphorePermit) -> TaskResult {
    let mut file = File::new(path, context, driver.interner.clone());
    let direct_paths = direct_import_paths(&file);

    drop(permit);
    let deps = collect_dependency_closure(&driver, &direct_paths).await?;
    let permit = driver.acquire_permit().await?;

    let link_result = protocompile_link::link_file(&mut file, &deps, &driver.reporter, &driver.extensions, true, driver.source_info);
    drop(permit);
    link_result?;

    if driver.source_info {
        tracing::debug!(path = %file.path, "populated source_code_info");
    }
    Ok(Arc::new(file))
}

/// Waits for `direct_paths`, then follows each result's own public
/// re-exports breadth-first until every file the merge pass might look
/// up — direct or transitive-public — has been collected. The driver
/// links dependencies before their importers, so every file reached
/// this way is already complete; waiting on it resolves immediately.
async fn collect_dependency_closure(driver: &Arc<Driver>, direct_paths: &[ImportPath]) -> Result<DependencyMap, CompileError> {
    let mut resolved = HashMap::new();
    let mut queued: HashSet<ImportPath> = direct_paths.iter().cloned().collect();
    let mut queue: VecDeque<ImportPath> = direct_paths.iter().cloned().collect();

    while let Some(path) = queue.pop_front() {
        if resolved.contains_key(&path) {
            continue;
        }
        let file = wait_for(driver, path.clone()).await?;
        for reexport in file.imports.reexported_paths() {
            if queued.insert(reexport.clone()) {
                queue.push_back(reexport);
            }
        }
        resolved.insert(path, file);
    }
    Ok(DependencyMap(resolved))
}

/// Spec §4.1's public contract: `Compile(paths, cancel_signal) →
/// (results, error)`. `results` is positionally aligned with `paths`,
/// `None` at a position whose file failed. The returned error is the
/// session-wide verdict: the first fatal or cancellation or resolver
/// error observed, or the reporter's "invalid source" sentinel if
/// nothing else failed but some diagnostic was still reported, or
/// `None` on full success.
pub async fn compile(
    options: CompilerOptions,
    paths: &[ImportPath],
    cancel: CancelSignal,
) -> (Vec<Option<Arc<File>>>, Option<CompileError>) {
    let reporter = options.reporter.clone().unwrap_or_default();
    let driver = Driver::new(options, reporter.clone(), cancel);

    let futures = paths.iter().cloned().map(|path| {
        let driver = driver.clone();
        async move { wait_for(&driver, path).await }
    });
    let outcomes = futures::future::join_all(futures).await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_fatal: Option<CompileError> = None;
    for outcome in outcomes {
        match outcome {
            Ok(file) => results.push(Some(file)),
            Err(err) => {
                if first_fatal.is_none() && !matches!(err, CompileError::InvalidSource) {
                    first_fatal = Some(err);
                }
                results.push(None);
            }
        }
    }

    let error = first_fatal.or_else(|| reporter.finalize().err());
    (results, error)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::options::CompilerOptions;

    struct InMemoryResolver {
        files: StdMutex<StdHashMap<String, String>>,
    }

    impl InMemoryResolver {
        fn new(files: &[(&str, &str)]) -> Self {
            InMemoryResolver {
                files: StdMutex::new(files.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
            }
        }
    }

    impl Resolver for InMemoryResolver {
        fn resolve(&self, path: &ImportPath) -> Result<SearchResult, CompileError> {
            let files = self.files.lock().unwrap();
            match files.get(path.as_str()) {
                Some(source) => Ok(SearchResult::Source {
                    reader: Box::new(std::io::Cursor::new(source.clone().into_bytes())),
                    closer: None,
                }),
                None => Err(CompileError::Resolver {
                    path: path.as_str().to_string(),
                    message: "not found".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn compiles_a_single_self_contained_file() {
        let resolver = InMemoryResolver::new(&[("a.proto", "message M { int32 x = 1; }")]);
        let options = CompilerOptions::new(Arc::new(resolver));
        let (results, error) = compile(options, &[ImportPath::new("a.proto")], CancelSignal::new()).await;
        assert!(error.is_none());
        let file = results[0].as_ref().expect("a.proto should compile");
        assert_eq!(file.descriptor.message_type[0].name(), "M");
    }

    #[tokio::test]
    async fn a_diamond_import_graph_builds_each_file_once() {
        let resolver = InMemoryResolver::new(&[
            ("base.proto", "message Base { int32 x = 1; }"),
            ("left.proto", "import \"base.proto\"; message Left { Base b = 1; }"),
            ("right.proto", "import \"base.proto\"; message Right { Base b = 1; }"),
            (
                "top.proto",
                "import \"left.proto\"; import \"right.proto\"; message Top { Left l = 1; Right r = 2; }",
            ),
        ]);
        let options = CompilerOptions::new(Arc::new(resolver));
        let (results, error) = compile(options, &[ImportPath::new("top.proto")], CancelSignal::new()).await;
        assert!(error.is_none(), "{error:?}");
        let top = results[0].as_ref().unwrap();
        assert_eq!(top.descriptor.message_type[0].name(), "Top");
    }

    #[tokio::test]
    async fn a_missing_import_fails_the_whole_request() {
        let resolver = InMemoryResolver::new(&[("a.proto", "import \"missing.proto\"; message M { int32 x = 1; }")]);
        let options = CompilerOptions::new(Arc::new(resolver));
        let (results, error) = compile(options, &[ImportPath::new("a.proto")], CancelSignal::new()).await;
        assert!(error.is_some());
        assert!(results[0].is_none());
    }

    #[tokio::test]
    async fn an_already_cancelled_signal_fails_every_request() {
        let resolver = InMemoryResolver::new(&[("a.proto", "message M { int32 x = 1; }")]);
        let options = CompilerOptions::new(Arc::new(resolver));
        let cancel = CancelSignal::new();
        cancel.cancel();
        let (results, error) = compile(options, &[ImportPath::new("a.proto")], cancel).await;
        assert!(matches!(error, Some(CompileError::Cancelled)));
        assert!(results[0].is_none());
    }

    #[tokio::test]
    async fn a_resolver_that_cannot_find_a_path_produces_a_resolver_error() {
        let resolver = InMemoryResolver::new(&[]);
        let options = CompilerOptions::new(Arc::new(resolver));
        let (results, error) = compile(options, &[ImportPath::new("missing.proto")], CancelSignal::new()).await;
        assert!(matches!(error, Some(CompileError::Resolver { .. })));
        assert!(results[0].is_none());
    }
}
