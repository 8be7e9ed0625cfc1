//! The error type a compilation ultimately fails with.
//!
//! A single file or a whole [`Reporter`](crate::reporter::Reporter) session
//! resolves to one of these, never to a bag of diagnostics — the
//! diagnostics themselves are reported separately as they're found, and
//! this is just the terminal verdict.

/// The outcome of a failed compile, as surfaced to callers of the driver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// At least one error-severity diagnostic was reported, but nothing
    /// asked the reporter to abort early. The caller should look at the
    /// collected diagnostics for specifics; this variant carries no detail
    /// of its own because by the time it's produced the diagnostics have
    /// already been rendered or handed back.
    #[error("invalid source")]
    InvalidSource,
    /// A diagnostic was marked fatal (an internal error, a parse failure
    /// too severe to recover from) and short-circuited the rest of the
    /// compile. Carries the message of the diagnostic that tripped it.
    #[error("fatal: {0}")]
    Fatal(String),
    /// The compile's cancellation signal fired before completion.
    #[error("compilation cancelled")]
    Cancelled,
    /// A resolver implementation failed to produce source for a path.
    #[error("resolving \"{path}\": {message}")]
    Resolver { path: String, message: String },
}
