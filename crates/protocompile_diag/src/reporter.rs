//! The [`Reporter`]: a session-wide sink for diagnostics with a
//! fatal-shortcut policy.
//!
//! Every component that finds a problem — the lexer, the parser, the
//! linker — reports through the same `Reporter`, shared behind an `Arc`
//! across however many files the driver is compiling in parallel.
//! `report_error` decides, per diagnostic, whether the whole session
//! should abort; once it does, every later call returns the same
//! captured error without re-running the abort policy or touching the
//! diagnostic list again.

use std::sync::Mutex;

use crate::diagnostic::{Diagnostic, Severity};
use crate::error::CompileError;

/// Decides whether a just-reported error diagnostic should abort the
/// whole session. The default policy aborts only on diagnostics marked
/// [`Diagnostic::internal_error`] — ordinary syntax and linking errors
/// accumulate and are reported together at `finalize`.
pub trait AbortPolicy: Send + Sync {
    fn should_abort(&self, diagnostic: &Diagnostic) -> bool;
}

/// The default policy: fatal only for internal errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct InternalErrorsAbort;

impl AbortPolicy for InternalErrorsAbort {
    fn should_abort(&self, diagnostic: &Diagnostic) -> bool {
        diagnostic.is_internal()
    }
}

struct ErrorState {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    aborted: Option<CompileError>,
}

/// Collects diagnostics from any number of concurrent callers, imposing
/// a session-wide fatal-shortcut policy on errors.
///
/// Warnings are collected in a separate, independently-locked list: they
/// never participate in the abort decision, so recording one never
/// contends with the error path.
pub struct Reporter {
    policy: Box<dyn AbortPolicy>,
    errors: Mutex<ErrorState>,
    warnings: Mutex<Vec<Diagnostic>>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter::new(InternalErrorsAbort)
    }
}

impl Reporter {
    /// Builds a reporter with a custom abort policy.
    pub fn new(policy: impl AbortPolicy + 'static) -> Self {
        Reporter {
            policy: Box::new(policy),
            errors: Mutex::new(ErrorState {
                diagnostics: Vec::new(),
                error_count: 0,
                aborted: None,
            }),
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Reports an error-severity diagnostic.
    ///
    /// Returns `Err` if this diagnostic (or an earlier one) tripped the
    /// abort policy; the session should stop doing further work for this
    /// compile as soon as it observes that. Once aborted, every
    /// subsequent call returns the same error immediately without
    /// consulting the policy or appending to the diagnostic list again.
    pub fn report_error(&self, diagnostic: Diagnostic) -> Result<(), CompileError> {
        debug_assert_eq!(diagnostic.severity(), Severity::Error);
        let mut state = self.errors.lock().expect("reporter mutex poisoned");
        if let Some(err) = &state.aborted {
            return Err(err.clone());
        }
        let fatal = self.policy.should_abort(&diagnostic);
        let message = diagnostic.message().to_string();
        state.error_count += 1;
        state.diagnostics.push(diagnostic);
        if fatal {
            let err = CompileError::Fatal(message);
            state.aborted = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }

    /// Reports a warning-severity diagnostic. Never aborts the session.
    pub fn report_warning(&self, diagnostic: Diagnostic) {
        debug_assert_eq!(diagnostic.severity(), Severity::Warning);
        self.warnings
            .lock()
            .expect("reporter mutex poisoned")
            .push(diagnostic);
    }

    /// The number of error-severity diagnostics reported so far.
    pub fn error_count(&self) -> usize {
        self.errors.lock().expect("reporter mutex poisoned").error_count
    }

    /// `true` once an aborting diagnostic has been reported.
    pub fn is_aborted(&self) -> bool {
        self.errors.lock().expect("reporter mutex poisoned").aborted.is_some()
    }

    /// All diagnostics reported so far, errors first in report order,
    /// then warnings in report order. Intended for rendering once the
    /// compile is done; cheap but not free, so callers shouldn't call it
    /// in a hot loop.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let errors = self.errors.lock().expect("reporter mutex poisoned");
        let warnings = self.warnings.lock().expect("reporter mutex poisoned");
        let mut all = Vec::with_capacity(errors.diagnostics.len() + warnings.len());
        all.extend(errors.diagnostics.iter().cloned());
        all.extend(warnings.iter().cloned());
        all
    }

    /// Resolves the session to its final verdict: the captured abort
    /// error if one was ever reported, else [`CompileError::InvalidSource`]
    /// if any error (fatal or not) was reported, else `Ok(())`.
    pub fn finalize(&self) -> Result<(), CompileError> {
        let state = self.errors.lock().expect("reporter mutex poisoned");
        if let Some(err) = &state.aborted {
            return Err(err.clone());
        }
        if state.error_count > 0 {
            return Err(CompileError::InvalidSource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocompile_base::Span;

    #[test]
    fn ordinary_errors_accumulate_without_aborting() {
        let reporter = Reporter::default();
        assert!(reporter.report_error(Diagnostic::error("bad token")).is_ok());
        assert!(reporter.report_error(Diagnostic::error("bad token 2")).is_ok());
        assert_eq!(reporter.error_count(), 2);
        assert!(!reporter.is_aborted());
    }

    #[test]
    fn internal_error_aborts_and_is_sticky() {
        let reporter = Reporter::default();
        let first = reporter.report_error(Diagnostic::internal_error("arena corrupted"));
        assert!(first.is_err());
        assert!(reporter.is_aborted());

        let second = reporter.report_error(Diagnostic::error("irrelevant"));
        assert_eq!(second.unwrap_err().to_string(), first.unwrap_err().to_string());
        assert_eq!(reporter.error_count(), 1, "second call must not append");
    }

    #[test]
    fn warnings_never_abort_or_count_as_errors() {
        let reporter = Reporter::default();
        reporter.report_warning(Diagnostic::warning("unused import \"a.proto\""));
        assert_eq!(reporter.error_count(), 0);
        assert!(!reporter.is_aborted());
        assert_eq!(reporter.diagnostics().len(), 1);
    }

    #[test]
    fn finalize_ok_when_nothing_reported() {
        let reporter = Reporter::default();
        assert!(reporter.finalize().is_ok());
    }

    #[test]
    fn finalize_invalid_source_when_errors_but_no_abort() {
        let reporter = Reporter::default();
        reporter.report_error(Diagnostic::error("bad token")).unwrap();
        match reporter.finalize() {
            Err(CompileError::InvalidSource) => {}
            other => panic!("expected InvalidSource, got {other:?}"),
        }
    }

    #[test]
    fn finalize_returns_the_captured_fatal_error() {
        let reporter = Reporter::default();
        let _ = reporter.report_error(Diagnostic::internal_error("corrupted"));
        match reporter.finalize() {
            Err(CompileError::Fatal(message)) => assert_eq!(message, "corrupted"),
            other => panic!("expected Fatal, got {other:?}"),
        }
    }

    #[test]
    fn custom_abort_policy_overrides_default() {
        struct AbortOnAnyError;
        impl AbortPolicy for AbortOnAnyError {
            fn should_abort(&self, _diagnostic: &Diagnostic) -> bool {
                true
            }
        }
        let reporter = Reporter::new(AbortOnAnyError);
        let result = reporter.report_error(Diagnostic::error("anything").with_span(Span::ZERO));
        assert!(result.is_err());
    }

    #[test]
    fn diagnostics_preserves_errors_before_warnings() {
        let reporter = Reporter::default();
        reporter.report_warning(Diagnostic::warning("w1"));
        reporter.report_error(Diagnostic::error("e1")).unwrap();
        let all = reporter.diagnostics();
        assert_eq!(all[0].message(), "e1");
        assert_eq!(all[1].message(), "w1");
    }
}
