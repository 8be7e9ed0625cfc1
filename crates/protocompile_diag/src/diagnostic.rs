//! The [`Diagnostic`] value type.
//!
//! A diagnostic is built once, fully formed, and then either reported or
//! discarded — there is no mutation after it leaves its constructor site,
//! so every other component can pass it around by value without worrying
//! about who's allowed to add a note.

use protocompile_base::Span;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Blocks the file (and anything that imports it) from linking.
    Error,
    /// Informational; never aborts a compile on its own.
    Warning,
}

/// A secondary span attached to a diagnostic, e.g. "previous definition
/// here" pointing at an earlier declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanLabel {
    pub span: Span,
    pub message: String,
}

/// A suggested fix: replace the text covered by `span` with `replacement`.
/// Diagnostics may carry more than one edit, covering disjoint spans, to
/// describe a single multi-part fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

/// A single error or warning, anchored at a primary span with optional
/// secondary labels, notes, hints, and suggested edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub(crate) severity: Severity,
    pub(crate) message: String,
    pub(crate) primary_span: Option<Span>,
    pub(crate) labels: Vec<SpanLabel>,
    pub(crate) notes: Vec<String>,
    pub(crate) hints: Vec<String>,
    pub(crate) edits: Vec<Edit>,
    pub(crate) internal: bool,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            primary_span: None,
            labels: Vec::new(),
            notes: Vec::new(),
            hints: Vec::new(),
            edits: Vec::new(),
            internal: false,
        }
    }

    /// A recoverable error: reported, recorded, but doesn't by itself
    /// stop the rest of the file (or other files) from being checked.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message)
    }

    /// An error too severe to recover from — a corrupt token stream, an
    /// allocator invariant violated. Marks the diagnostic so the default
    /// [`Reporter`](crate::reporter::Reporter) policy treats it as fatal.
    pub fn internal_error(message: impl Into<String>) -> Self {
        let mut diag = Diagnostic::new(Severity::Error, message);
        diag.internal = true;
        diag
    }

    /// A non-fatal informational diagnostic, e.g. an unused import.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, message)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn primary_span(&self) -> Option<Span> {
        self.primary_span
    }

    pub fn labels(&self) -> &[SpanLabel] {
        &self.labels
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Anchors the diagnostic at a primary source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.primary_span = Some(span);
        self
    }

    /// Attaches a secondary span with its own message, e.g. pointing back
    /// at a conflicting declaration.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(SpanLabel {
            span,
            message: message.into(),
        });
        self
    }

    /// Appends a note: additional context that isn't tied to a span.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Appends a hint: a suggestion for how to fix the problem, in prose.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Attaches a machine-applicable suggested edit.
    pub fn with_edit(mut self, span: Span, replacement: impl Into<String>) -> Self {
        self.edits.push(Edit {
            span,
            replacement: replacement.into(),
        });
        self
    }
}
