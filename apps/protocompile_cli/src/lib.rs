//! Library half of the `protocompile` binary: argument parsing, resolver
//! wiring, and diagnostic rendering, kept separate from `main.rs` so the
//! dispatch logic is unit-testable without spawning a process.

mod config;
mod fs_resolver;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use protocompile_base::ImportPath;
use protocompile_diag::{render, Reporter};
use protocompile_driver::{CancelSignal, ChainResolver, CompilerOptions};

pub use config::ProjectConfig;
pub use fs_resolver::FsResolver;

/// Compiles one or more `.proto` files against a search path of import
/// roots, printing diagnostics and optionally writing a serialized
/// `FileDescriptorSet`.
#[derive(Parser, Debug)]
#[command(name = "protocompile")]
#[command(about = "Compiles Protobuf sources to descriptors", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Proto files to compile, given as paths relative to an import root.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// A directory to search for imports. May be given more than once;
    /// earlier roots are searched first. Defaults to the current directory.
    #[arg(short = 'I', long = "import-path", value_name = "DIR")]
    pub import_paths: Vec<PathBuf>,

    /// Maximum number of files linked concurrently. 0 defers to the
    /// available parallelism of the host.
    #[arg(long, default_value_t = 0)]
    pub max_parallelism: usize,

    /// Write a serialized `FileDescriptorSet` to this path.
    #[arg(short = 'o', long = "descriptor-set-out", value_name = "FILE")]
    pub descriptor_set_out: Option<PathBuf>,

    /// Disable ANSI colors in diagnostic output.
    #[arg(long)]
    pub no_color: bool,

    /// Load import roots and a parallelism cap from a JSON config file.
    /// Its `import_paths` are searched before any `-I` flags; its
    /// `max_parallelism` only applies when `--max-parallelism` is left
    /// at its default.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Parses arguments, runs the compile, prints diagnostics, and returns
/// the process exit code (`0` on success, `1` if any file failed).
pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    init_logging();

    let config = match &cli.config {
        Some(path) => match ProjectConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {err}");
                return 1;
            }
        },
        None => ProjectConfig::default(),
    };

    let mut roots = config.import_paths.clone();
    roots.extend(cli.import_paths.iter().cloned());
    if roots.is_empty() {
        roots.push(PathBuf::from("."));
    }
    let resolver = Arc::new(ChainResolver::new(vec![Box::new(FsResolver::new(roots))]));

    let mut options = CompilerOptions::new(resolver);
    options.max_parallelism = if cli.max_parallelism > 0 {
        cli.max_parallelism
    } else {
        config.max_parallelism.unwrap_or(0)
    };
    let reporter = Arc::new(Reporter::default());
    options.reporter = Some(reporter.clone());

    let cancel = CancelSignal::new();
    let cancel_for_signal = cancel.clone();
    let paths: Vec<ImportPath> = cli.paths.iter().map(ImportPath::new).collect();

    let runtime = tokio::runtime::Runtime::new().expect("failed to start the async runtime");
    let (results, error) = runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel_for_signal.cancel();
            }
        });
        protocompile_driver::compile(options, &paths, cancel).await
    });

    for diagnostic in reporter.diagnostics() {
        let rendered = if cli.no_color {
            render::render_plain(&diagnostic, "compilation", "")
        } else {
            render::render(&diagnostic, "compilation", "")
        };
        eprint!("{rendered}");
    }

    if let Some(err) = &error {
        tracing::error!(%err, "compilation did not finish cleanly");
    }

    if let Some(out_path) = &cli.descriptor_set_out {
        if let Err(err) = write_descriptor_set(&results, out_path) {
            eprintln!("error: failed to write descriptor set: {err}");
            return 1;
        }
    }

    if error.is_some() || results.iter().any(Option::is_none) {
        1
    } else {
        0
    }
}

fn write_descriptor_set(
    results: &[Option<Arc<protocompile_ir::File>>],
    out_path: &std::path::Path,
) -> std::io::Result<()> {
    use protobuf::Message;

    let mut set = protobuf::descriptor::FileDescriptorSet::new();
    for file in results.iter().flatten() {
        set.file.push(file.descriptor.clone());
    }
    let bytes = set
        .write_to_bytes()
        .expect("a fully populated FileDescriptorSet always serializes");
    let mut out = std::fs::File::create(out_path)?;
    out.write_all(&bytes)
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var("PROTOCOMPILE_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
