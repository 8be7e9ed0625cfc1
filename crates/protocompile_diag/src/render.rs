//! Renders a [`Diagnostic`] as a source excerpt: a `file:line:column`
//! header, the offending line with a caret underline, secondary labels,
//! notes, hints, and suggested edits shown as a small unified diff.

use crate::diagnostic::{Diagnostic, Severity};
use crate::style;
use protocompile_base::Span;

/// Renders with ANSI colors, as for a terminal.
pub fn render(diagnostic: &Diagnostic, filename: &str, source: &str) -> String {
    render_with(diagnostic, filename, source, true)
}

/// Renders as plain text, as for a log file or CI transcript.
pub fn render_plain(diagnostic: &Diagnostic, filename: &str, source: &str) -> String {
    render_with(diagnostic, filename, source, false)
}

fn render_with(diagnostic: &Diagnostic, filename: &str, source: &str, color: bool) -> String {
    let mut out = String::new();

    let (tag, paint_tag): (&str, fn(&str) -> String) = match diagnostic.severity() {
        Severity::Error => ("error", style::bold_red as fn(&str) -> String),
        Severity::Warning => ("warning", style::bold_yellow as fn(&str) -> String),
    };
    let header = format!("{tag}: {}", diagnostic.message());
    out.push_str(&if color { paint_tag(&header) } else { header });
    out.push('\n');

    if let Some(span) = diagnostic.primary_span() {
        render_location(&mut out, filename, source, span, None, color);
    }

    for label in diagnostic.labels() {
        render_location(&mut out, filename, source, label.span, Some(&label.message), color);
    }

    for note in diagnostic.notes() {
        let line = format!("note: {note}");
        out.push_str(&if color { style::dim(&line) } else { line });
        out.push('\n');
    }

    for hint in diagnostic.hints() {
        let line = format!("hint: {hint}");
        out.push_str(&if color { style::bold_cyan(&line) } else { line });
        out.push('\n');
    }

    for edit in diagnostic.edits() {
        let (line_no, _col, line_start, line_end) = locate(source, edit.span.start);
        let old = &source[line_start..line_end];
        out.push_str(&format!("{}\n", if color { style::dim(&format!(" --- line {line_no}")) } else { format!(" --- line {line_no}") }));
        let removed = format!("-{old}");
        let mut patched = String::with_capacity(old.len());
        let rel_start = edit.span.start as usize - line_start;
        let rel_end = (edit.span.end as usize).min(line_end) - line_start;
        patched.push_str(&old[..rel_start]);
        patched.push_str(&edit.replacement);
        patched.push_str(&old[rel_end..]);
        let added = format!("+{patched}");
        out.push_str(&if color { style::bold_red(&removed) } else { removed });
        out.push('\n');
        out.push_str(&if color { style::green(&added) } else { added });
        out.push('\n');
    }

    out
}

fn render_location(
    out: &mut String,
    filename: &str,
    source: &str,
    span: Span,
    label: Option<&str>,
    color: bool,
) {
    let (line_no, col, line_start, line_end) = locate(source, span.start);
    let location = format!("  --> {filename}:{line_no}:{col}");
    out.push_str(&if color { style::bold(&location) } else { location });
    out.push('\n');

    let line_text = &source[line_start..line_end];
    out.push_str("   | ");
    out.push_str(line_text);
    out.push('\n');

    let underline_start = span.start as usize - line_start;
    let underline_len = ((span.end.max(span.start + 1)) as usize - line_start)
        .saturating_sub(underline_start)
        .min(line_end - line_start - underline_start);
    let underline_len = underline_len.max(1);
    let mut caret = String::with_capacity(underline_start + underline_len);
    caret.push_str("   | ");
    caret.push_str(&" ".repeat(underline_start));
    let carets = "^".repeat(underline_len);
    caret.push_str(&if color { style::bold_red(&carets) } else { carets });
    if let Some(label) = label {
        caret.push(' ');
        caret.push_str(label);
    }
    out.push_str(&caret);
    out.push('\n');
}

/// Returns `(1-based line number, 1-based column, line start offset, line end offset)`.
fn locate(source: &str, offset: u32) -> (usize, usize, usize, usize) {
    let offset = (offset as usize).min(source.len());
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(source.len());
    let line_no = source[..line_start].matches('\n').count() + 1;
    let col = offset - line_start + 1;
    (line_no, col, line_start, line_end)
}
