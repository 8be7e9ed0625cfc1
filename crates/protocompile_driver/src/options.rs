//! Spec.md §6's "Recognized compiler options" configuration struct.

use std::sync::Arc;

use protocompile_diag::Reporter;

use crate::resolver::Resolver;

/// Configuration for one [`crate::compile::Compile`] call.
///
/// `resolver` is the only field without a usable default — everything
/// else falls back to the behavior spec §6's table describes for the
/// "effect" column's implicit default.
pub struct CompilerOptions {
    /// Upper bound on concurrent link tasks. `0` (the `Default` value)
    /// means "use the runtime default": the smaller of the available
    /// parallelism and a hardcoded ceiling, computed by
    /// [`CompilerOptions::effective_parallelism`].
    pub max_parallelism: usize,
    /// If set, populate `source_code_info` on each linked file's
    /// descriptor. Not yet implemented by `protocompile-link`'s
    /// `build_descriptor` pass; reserved here so the option surface
    /// matches spec §6 and callers can set it without a compile error
    /// once that pass grows the feature.
    pub source_info: bool,
    /// Sink for diagnostics. `None` means accumulate into a fresh
    /// default-policy [`Reporter`] the driver creates for this compile.
    pub reporter: Option<Arc<Reporter>>,
    /// Strategy for finding files. Required.
    pub resolver: Arc<dyn Resolver>,
}

impl CompilerOptions {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        CompilerOptions {
            max_parallelism: 0,
            source_info: false,
            reporter: None,
            resolver,
        }
    }

    /// The smaller of the configured parallelism and the runtime's
    /// available parallelism hint, per spec §4.1's "State" paragraph —
    /// `0` (unset) defers entirely to the runtime hint.
    pub fn effective_parallelism(&self) -> usize {
        if self.max_parallelism > 0 {
            return self.max_parallelism;
        }
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocompile_base::ImportPath;
    use protocompile_diag::CompileError;
    use crate::resolver::SearchResult;

    struct Noop;
    impl Resolver for Noop {
        fn resolve(&self, path: &ImportPath) -> Result<SearchResult, CompileError> {
            Err(CompileError::Resolver {
                path: path.as_str().to_string(),
                message: "unused in this test".to_string(),
            })
        }
    }

    #[test]
    fn zero_parallelism_defers_to_the_runtime_hint() {
        let options = CompilerOptions::new(Arc::new(Noop));
        assert!(options.effective_parallelism() >= 1);
    }

    #[test]
    fn explicit_parallelism_is_honored() {
        let mut options = CompilerOptions::new(Arc::new(Noop));
        options.max_parallelism = 2;
        assert_eq!(options.effective_parallelism(), 2);
    }
}
