//! Minimal ANSI styling for terminal rendering.
//!
//! Kept deliberately small: a handful of named colors used consistently
//! by [`crate::render`], nothing configurable. Callers that want plain
//! text (logging to a file, a CI transcript) use
//! [`render::plain`](crate::render::plain) instead of the colored variant.

pub(crate) fn bold_red(text: &str) -> String {
    format!("\x1b[1;31m{text}\x1b[0m")
}

pub(crate) fn bold_yellow(text: &str) -> String {
    format!("\x1b[1;33m{text}\x1b[0m")
}

pub(crate) fn bold_cyan(text: &str) -> String {
    format!("\x1b[1;36m{text}\x1b[0m")
}

pub(crate) fn bold(text: &str) -> String {
    format!("\x1b[1m{text}\x1b[0m")
}

pub(crate) fn dim(text: &str) -> String {
    format!("\x1b[2m{text}\x1b[0m")
}

pub(crate) fn green(text: &str) -> String {
    format!("\x1b[32m{text}\x1b[0m")
}
