//! A forward-only, cheaply-cloneable cursor over one token stream's
//! natural range, with whitespace/comment skipping and a mark/rewind
//! checkpoint.
//!
//! Cursors never span two files' streams and never cross the
//! natural/synthetic boundary — a cursor walks exactly one of the two
//! arrays in a [`TokenStream`], identified by a half-open `[start, end)`
//! range of indices into that array.

use crate::token::{TokenId, TokenKind, TokenStream};

/// An opaque checkpoint produced by [`Cursor::mark`] and consumed by
/// [`Cursor::rewind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// A forward-only cursor over the natural token stream's `[start, end)`
/// range. Cheap to clone: it holds a borrow of the stream and two
/// indices.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    stream: &'a TokenStream,
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    /// A cursor over the whole natural stream.
    pub fn over(stream: &'a TokenStream) -> Self {
        Cursor {
            stream,
            pos: 0,
            end: stream.natural_len(),
        }
    }

    /// A cursor over an explicit natural-index range, e.g. the body of a
    /// bracketed group located via [`TokenStream::bracket_match`].
    pub fn over_range(stream: &'a TokenStream, start: TokenId, end: TokenId) -> Self {
        let pos = start
            .natural_index()
            .unwrap_or_else(|| stream.natural_len());
        let end = end.natural_index().unwrap_or_else(|| stream.natural_len());
        Cursor { stream, pos, end }
    }

    fn at(&self, index: usize) -> Option<(TokenId, TokenKind)> {
        if index >= self.end {
            None
        } else {
            let id = TokenId::from_natural_index(index);
            Some((id, self.stream.kind(id)))
        }
    }

    /// The next token, including whitespace and comments, without
    /// consuming it.
    pub fn peek_skippable(&self) -> Option<TokenId> {
        self.at(self.pos).map(|(id, _)| id)
    }

    /// Consumes and returns the next token, including whitespace and
    /// comments.
    pub fn pop_skippable(&mut self) -> Option<TokenId> {
        let result = self.peek_skippable();
        if result.is_some() {
            self.pos += 1;
        }
        result
    }

    /// The next non-skippable token, without consuming anything.
    pub fn peek(&self) -> Option<TokenId> {
        let mut i = self.pos;
        loop {
            let (id, kind) = self.at(i)?;
            if !kind.is_skippable() {
                return Some(id);
            }
            i += 1;
        }
    }

    /// Consumes tokens up to and including the next non-skippable one,
    /// returning that token.
    pub fn pop(&mut self) -> Option<TokenId> {
        loop {
            let (id, kind) = self.at(self.pos)?;
            self.pos += 1;
            if !kind.is_skippable() {
                return Some(id);
            }
        }
    }

    /// `true` once the cursor has reached its range's end (ignoring any
    /// trailing skippable tokens).
    pub fn is_at_end(&self) -> bool {
        self.peek().is_none()
    }

    /// Saves the current position for a later [`Cursor::rewind`].
    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    /// Restores a position saved by [`Cursor::mark`].
    pub fn rewind(&mut self, mark: Mark) {
        self.pos = mark.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn sample_stream() -> TokenStream {
        let mut s = TokenStream::new();
        s.push_natural(7, TokenKind::Ident); // "message"
        s.push_natural(8, TokenKind::Whitespace);
        s.push_natural(9, TokenKind::Ident); // "M"
        s.push_natural(10, TokenKind::Whitespace);
        s.push_natural(11, TokenKind::Punct); // "{"
        s
    }

    #[test]
    fn pop_skippable_sees_whitespace() {
        let stream = sample_stream();
        let mut cursor = Cursor::over(&stream);
        assert_eq!(stream.kind(cursor.pop_skippable().unwrap()), TokenKind::Ident);
        assert_eq!(
            stream.kind(cursor.pop_skippable().unwrap()),
            TokenKind::Whitespace
        );
    }

    #[test]
    fn pop_skips_whitespace_and_comments() {
        let stream = sample_stream();
        let mut cursor = Cursor::over(&stream);
        assert_eq!(stream.kind(cursor.pop().unwrap()), TokenKind::Ident);
        assert_eq!(stream.kind(cursor.pop().unwrap()), TokenKind::Ident);
        assert_eq!(stream.kind(cursor.pop().unwrap()), TokenKind::Punct);
        assert!(cursor.pop().is_none());
    }

    #[test]
    fn peek_does_not_consume() {
        let stream = sample_stream();
        let cursor = Cursor::over(&stream);
        let first = cursor.peek();
        let second = cursor.peek();
        assert_eq!(first, second);
    }

    #[test]
    fn mark_and_rewind_restore_position() {
        let stream = sample_stream();
        let mut cursor = Cursor::over(&stream);
        let mark = cursor.mark();
        cursor.pop();
        cursor.pop();
        cursor.rewind(mark);
        assert_eq!(stream.kind(cursor.peek().unwrap()), TokenKind::Ident);
    }

    #[test]
    fn is_at_end_true_past_last_token() {
        let stream = sample_stream();
        let mut cursor = Cursor::over(&stream);
        while cursor.pop().is_some() {}
        assert!(cursor.is_at_end());
    }

    #[test]
    fn over_range_restricts_to_a_sub_range() {
        let stream = sample_stream();
        let start = TokenId::from_natural_index(2);
        let end = TokenId::from_natural_index(3);
        let mut cursor = Cursor::over_range(&stream, start, end);
        assert_eq!(stream.kind(cursor.pop_skippable().unwrap()), TokenKind::Ident);
        assert!(cursor.pop_skippable().is_none());
    }
}
