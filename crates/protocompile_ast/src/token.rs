//! The flat token stream: `(end-offset, kind, bracket-offset)` triples for
//! natural (lexed) tokens, plus a separate array for synthetic
//! (constructed) tokens.
//!
//! Natural tokens store only their *end* offset; a token's start is the
//! previous natural token's end offset (or zero for the first token).
//! This makes appending a token O(1) with no neighbor fixup, at the cost
//! of span lookup needing the token's index rather than just its record —
//! which is why [`TokenId`] resolves through [`TokenStream::span`] rather
//! than carrying a span directly.

use protocompile_base::Span;

/// What kind of lexical item a token is. Three bits wide — it's packed
/// into the low bits of a natural token's `kind_and_offset` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    Ident = 0,
    Number = 1,
    String = 2,
    Punct = 3,
    Whitespace = 4,
    Comment = 5,
    Eof = 6,
    Unknown = 7,
}

impl TokenKind {
    const MASK: i32 = 0b111;

    fn from_bits(bits: i32) -> TokenKind {
        match bits & Self::MASK {
            0 => TokenKind::Ident,
            1 => TokenKind::Number,
            2 => TokenKind::String,
            3 => TokenKind::Punct,
            4 => TokenKind::Whitespace,
            5 => TokenKind::Comment,
            6 => TokenKind::Eof,
            _ => TokenKind::Unknown,
        }
    }

    /// Whitespace and comments are invisible to `Peek`/`Pop`; only
    /// `PeekSkippable`/`PopSkippable` see them.
    pub fn is_skippable(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// A `(end_offset, kind_and_offset)` pair, as lexed from source bytes.
///
/// `kind_and_offset`'s low 3 bits are the [`TokenKind`]; the remaining,
/// sign-extended bits are the matched-bracket offset: positive on an
/// opening bracket (its closer is `self_index + offset`), negative on the
/// matching closer (same magnitude, opposite sign), zero on a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalToken {
    pub end_offset: u32,
    kind_and_offset: i32,
}

impl NaturalToken {
    pub fn new(end_offset: u32, kind: TokenKind) -> Self {
        NaturalToken {
            end_offset,
            kind_and_offset: kind as i32,
        }
    }

    pub fn kind(self) -> TokenKind {
        TokenKind::from_bits(self.kind_and_offset)
    }

    /// The matched-bracket offset: `0` for a leaf, `+n`/`-n` for a
    /// bracket pair `n` tokens apart.
    pub fn bracket_offset(self) -> i32 {
        self.kind_and_offset >> 3
    }

    fn set_bracket_offset(&mut self, offset: i32) {
        let kind = self.kind_and_offset & TokenKind::MASK;
        self.kind_and_offset = (offset << 3) | kind;
    }
}

/// A token built programmatically rather than lexed — carries its own
/// text and, for tree-bracket tokens, an explicit "other end" and child
/// list, mirroring the natural API without relying on source offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticToken {
    pub text: String,
    pub kind: TokenKind,
    pub other_end: TokenId,
    pub children: Vec<TokenId>,
}

impl SyntheticToken {
    pub fn leaf(text: impl Into<String>, kind: TokenKind) -> Self {
        SyntheticToken {
            text: text.into(),
            kind,
            other_end: TokenId::NIL,
            children: Vec::new(),
        }
    }
}

/// A handle into a [`TokenStream`]: zero is nil, positive indexes the
/// natural stream (1-based), negative indexes the synthetic stream
/// (`-1 -> 0`, `-2 -> 1`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(i32);

impl TokenId {
    pub const NIL: TokenId = TokenId(0);

    pub fn is_nil(self) -> bool {
        self.0 == 0
    }

    pub fn is_natural(self) -> bool {
        self.0 > 0
    }

    pub fn is_synthetic(self) -> bool {
        self.0 < 0
    }

    pub(crate) fn from_natural_index(index: usize) -> TokenId {
        TokenId(index as i32 + 1)
    }

    pub(crate) fn from_synthetic_index(index: usize) -> TokenId {
        TokenId(-(index as i32) - 1)
    }

    pub(crate) fn natural_index(self) -> Option<usize> {
        if self.0 > 0 {
            Some((self.0 - 1) as usize)
        } else {
            None
        }
    }

    pub(crate) fn synthetic_index(self) -> Option<usize> {
        if self.0 < 0 {
            Some((-self.0 - 1) as usize)
        } else {
            None
        }
    }
}

impl Default for TokenId {
    fn default() -> Self {
        TokenId::NIL
    }
}

/// The flat stream of a single file's tokens: the natural array produced
/// by the lexer plus the synthetic array produced by rewrites and
/// constructors.
#[derive(Debug, Default)]
pub struct TokenStream {
    natural: Vec<NaturalToken>,
    synthetic: Vec<SyntheticToken>,
}

impl TokenStream {
    pub fn new() -> Self {
        TokenStream::default()
    }

    /// Appends a natural token with no bracket match yet; returns its id.
    /// Callers that know they're pushing half of a bracket pair call
    /// [`TokenStream::fuse`] once both halves are pushed.
    pub fn push_natural(&mut self, end_offset: u32, kind: TokenKind) -> TokenId {
        self.natural.push(NaturalToken::new(end_offset, kind));
        TokenId::from_natural_index(self.natural.len() - 1)
    }

    /// Appends a synthetic leaf token; returns its id.
    pub fn push_synthetic(&mut self, token: SyntheticToken) -> TokenId {
        self.synthetic.push(token);
        TokenId::from_synthetic_index(self.synthetic.len() - 1)
    }

    /// Writes matching signed offsets into both halves of a bracket
    /// pair. `opener` must precede `closer` in the natural stream.
    pub fn fuse(&mut self, opener: TokenId, closer: TokenId) {
        let oi = opener
            .natural_index()
            .expect("fuse: opener must be a natural token");
        let ci = closer
            .natural_index()
            .expect("fuse: closer must be a natural token");
        debug_assert!(oi < ci, "fuse: opener must precede closer");
        let offset = (ci - oi) as i32;
        self.natural[oi].set_bracket_offset(offset);
        self.natural[ci].set_bracket_offset(-offset);
    }

    pub fn kind(&self, id: TokenId) -> TokenKind {
        if let Some(i) = id.natural_index() {
            self.natural[i].kind()
        } else if let Some(i) = id.synthetic_index() {
            self.synthetic[i].kind
        } else {
            TokenKind::Eof
        }
    }

    /// The `[start, end)` byte span a natural token covers. Synthetic
    /// tokens have no source span and resolve to [`Span::ZERO`].
    pub fn span(&self, id: TokenId) -> Span {
        match id.natural_index() {
            Some(0) => Span::new(0, self.natural[0].end_offset),
            Some(i) => Span::new(self.natural[i - 1].end_offset, self.natural[i].end_offset),
            None => Span::ZERO,
        }
    }

    /// The literal source text a natural token covers, or a synthetic
    /// token's stored text.
    pub fn text<'a>(&'a self, id: TokenId, source: &'a str) -> &'a str {
        if id.natural_index().is_some() {
            self.span(id).slice(source)
        } else if let Some(i) = id.synthetic_index() {
            &self.synthetic[i].text
        } else {
            ""
        }
    }

    /// The token this one is bracket-matched with, if any.
    pub fn bracket_match(&self, id: TokenId) -> Option<TokenId> {
        if let Some(i) = id.natural_index() {
            let offset = self.natural[i].bracket_offset();
            if offset == 0 {
                None
            } else {
                Some(TokenId::from_natural_index((i as i32 + offset) as usize))
            }
        } else if let Some(i) = id.synthetic_index() {
            let other = self.synthetic[i].other_end;
            if other.is_nil() {
                None
            } else {
                Some(other)
            }
        } else {
            None
        }
    }

    pub fn natural_len(&self) -> usize {
        self.natural.len()
    }

    pub fn synthetic_len(&self) -> usize {
        self.synthetic.len()
    }

    /// The id one past the last natural token — the exclusive end of a
    /// cursor spanning the whole natural stream.
    pub fn natural_end(&self) -> TokenId {
        TokenId::from_natural_index(self.natural.len())
    }

    pub fn natural_start(&self) -> TokenId {
        if self.natural.is_empty() {
            self.natural_end()
        } else {
            TokenId::from_natural_index(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_id_round_trips_natural_indices() {
        assert_eq!(TokenId::from_natural_index(0).natural_index(), Some(0));
        assert_eq!(TokenId::from_natural_index(9).natural_index(), Some(9));
        assert!(TokenId::from_natural_index(0).is_natural());
    }

    #[test]
    fn token_id_round_trips_synthetic_indices() {
        assert_eq!(TokenId::from_synthetic_index(0).synthetic_index(), Some(0));
        assert_eq!(TokenId::from_synthetic_index(5).synthetic_index(), Some(5));
        assert!(TokenId::from_synthetic_index(0).is_synthetic());
    }

    #[test]
    fn nil_is_neither_natural_nor_synthetic() {
        assert!(TokenId::NIL.is_nil());
        assert!(!TokenId::NIL.is_natural());
        assert!(!TokenId::NIL.is_synthetic());
    }

    #[test]
    fn leaf_token_has_zero_bracket_offset() {
        let mut stream = TokenStream::new();
        let id = stream.push_natural(5, TokenKind::Ident);
        assert!(stream.bracket_match(id).is_none());
    }

    #[test]
    fn fuse_writes_matching_signed_offsets() {
        let mut stream = TokenStream::new();
        let open = stream.push_natural(1, TokenKind::Punct);
        let _mid = stream.push_natural(5, TokenKind::Ident);
        let close = stream.push_natural(6, TokenKind::Punct);
        stream.fuse(open, close);

        assert_eq!(stream.bracket_match(open), Some(close));
        assert_eq!(stream.bracket_match(close), Some(open));
    }

    #[test]
    fn span_uses_previous_tokens_end_offset_as_start() {
        let mut stream = TokenStream::new();
        let a = stream.push_natural(5, TokenKind::Ident);
        let b = stream.push_natural(9, TokenKind::Punct);
        assert_eq!(stream.span(a), Span::new(0, 5));
        assert_eq!(stream.span(b), Span::new(5, 9));
    }

    #[test]
    fn text_slices_the_source_for_natural_tokens() {
        let mut stream = TokenStream::new();
        let source = "hello world";
        let a = stream.push_natural(5, TokenKind::Ident);
        let _sp = stream.push_natural(6, TokenKind::Whitespace);
        let b = stream.push_natural(11, TokenKind::Ident);
        assert_eq!(stream.text(a, source), "hello");
        assert_eq!(stream.text(b, source), "world");
    }

    #[test]
    fn synthetic_tokens_carry_their_own_text() {
        let mut stream = TokenStream::new();
        let id = stream.push_synthetic(SyntheticToken::leaf("synthetic_name", TokenKind::Ident));
        assert_eq!(stream.text(id, ""), "synthetic_name");
        assert_eq!(stream.kind(id), TokenKind::Ident);
    }

    #[test]
    fn synthetic_pair_links_via_other_end() {
        let mut stream = TokenStream::new();
        let open_idx = stream.synthetic.len();
        stream.synthetic.push(SyntheticToken::leaf("{", TokenKind::Punct));
        let close_idx = stream.synthetic.len();
        stream.synthetic.push(SyntheticToken::leaf("}", TokenKind::Punct));
        let open = TokenId::from_synthetic_index(open_idx);
        let close = TokenId::from_synthetic_index(close_idx);
        stream.synthetic[open_idx].other_end = close;
        stream.synthetic[close_idx].other_end = open;
        assert_eq!(stream.bracket_match(open), Some(close));
    }

    #[test]
    fn natural_start_and_end_bound_the_whole_stream() {
        let mut stream = TokenStream::new();
        assert_eq!(stream.natural_start(), stream.natural_end());
        stream.push_natural(1, TokenKind::Ident);
        stream.push_natural(2, TokenKind::Ident);
        assert_eq!(stream.natural_start(), TokenId::from_natural_index(0));
        assert_eq!(stream.natural_end(), TokenId::from_natural_index(2));
    }
}
