//! `protocompile` entry point.
//!
//! A thin wrapper around [`protocompile_cli::run_cli`], which does all
//! the actual argument parsing and dispatch so it stays testable without
//! spawning a process.

fn main() {
    std::process::exit(protocompile_cli::run_cli());
}
