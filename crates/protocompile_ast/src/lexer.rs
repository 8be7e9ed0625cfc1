//! A minimal tokenizer, good enough to drive the token stream's
//! invariants and to feed the parser in this workspace's tests and CLI.
//!
//! The byte-for-byte Protobuf lexer (the full escape grammar, every
//! numeric literal format) is an external collaborator per spec §1;
//! this one recognizes identifiers, decimal/hex integers, floats,
//! double/single-quoted strings, `//` and `/* */` comments, whitespace,
//! and single-character punctuation, fusing `()`, `[]`, `{}`, `<>` pairs
//! as it goes.

use crate::literal::LiteralValue;
use crate::token::{TokenId, TokenKind, TokenStream};

/// Lexes `source` into a fresh [`TokenStream`], returning the stream and
/// the literal values (see [`crate::literal::LiteralTable`]) for tokens
/// whose text needs decoding (numbers, quoted strings).
pub fn lex(source: &str) -> (TokenStream, Vec<(TokenId, LiteralValue)>) {
    let mut stream = TokenStream::new();
    let mut literals = Vec::new();
    let mut brackets: Vec<TokenId> = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let start = i;
        let b = bytes[i];

        if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
            while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
                i += 1;
            }
            stream.push_natural(i as u32, TokenKind::Whitespace);
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            stream.push_natural(i as u32, TokenKind::Comment);
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
            stream.push_natural(i as u32, TokenKind::Comment);
            continue;
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            stream.push_natural(i as u32, TokenKind::Ident);
            continue;
        }

        if b.is_ascii_digit() {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'-')
            {
                i += 1;
            }
            let text = &source[start..i];
            let id = stream.push_natural(i as u32, TokenKind::Number);
            if let Some(value) = parse_number(text) {
                literals.push((id, value));
            }
            continue;
        }

        if b == b'"' || b == b'\'' {
            let quote = b;
            i += 1;
            let mut decoded = String::new();
            while i < bytes.len() && bytes[i] != quote {
                if bytes[i] == b'\\' && i + 1 < bytes.len() {
                    decoded.push(decode_escape(bytes[i + 1]));
                    i += 2;
                } else {
                    decoded.push(bytes[i] as char);
                    i += 1;
                }
            }
            i = (i + 1).min(bytes.len());
            let id = stream.push_natural(i as u32, TokenKind::String);
            literals.push((id, LiteralValue::Str(decoded)));
            continue;
        }

        // Single-character punctuation, with bracket fusing.
        i += 1;
        let id = stream.push_natural(i as u32, TokenKind::Punct);
        match b {
            b'(' | b'[' | b'{' | b'<' => brackets.push(id),
            b')' | b']' | b'}' | b'>' => {
                if let Some(opener) = brackets.pop() {
                    stream.fuse(opener, id);
                }
            }
            _ => {}
        }
    }

    (stream, literals)
}

fn decode_escape(b: u8) -> char {
    match b {
        b'n' => '\n',
        b't' => '\t',
        b'r' => '\r',
        b'\\' => '\\',
        b'"' => '"',
        b'\'' => '\'',
        other => other as char,
    }
}

fn parse_number(text: &str) -> Option<LiteralValue> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(LiteralValue::Int);
    }
    if text.contains('.') || text.contains('e') || text.contains('E') {
        return text.parse::<f64>().ok().map(LiteralValue::Float);
    }
    text.parse::<i64>().ok().map(LiteralValue::Int)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_identifiers_and_whitespace() {
        let (stream, _) = lex("message M");
        assert_eq!(stream.kind(TokenId::from_natural_index(0)), TokenKind::Ident);
        assert_eq!(
            stream.kind(TokenId::from_natural_index(1)),
            TokenKind::Whitespace
        );
        assert_eq!(stream.kind(TokenId::from_natural_index(2)), TokenKind::Ident);
    }

    #[test]
    fn fuses_matched_braces() {
        let (stream, _) = lex("message M { }");
        let open = TokenId::from_natural_index(4);
        let close = TokenId::from_natural_index(6);
        assert_eq!(stream.kind(open), TokenKind::Punct);
        assert_eq!(stream.bracket_match(open), Some(close));
    }

    #[test]
    fn fuses_nested_brackets_correctly() {
        let (stream, _) = lex("{ ( ) }");
        let outer_open = TokenId::from_natural_index(0);
        let inner_open = TokenId::from_natural_index(2);
        let inner_close = TokenId::from_natural_index(4);
        let outer_close = TokenId::from_natural_index(6);
        assert_eq!(stream.bracket_match(outer_open), Some(outer_close));
        assert_eq!(stream.bracket_match(inner_open), Some(inner_close));
    }

    #[test]
    fn decodes_decimal_and_hex_numbers() {
        let (_, literals) = lex("5 0x1F");
        assert_eq!(literals[0].1, LiteralValue::Int(5));
        assert_eq!(literals[1].1, LiteralValue::Int(31));
    }

    #[test]
    fn decodes_quoted_strings_with_escapes() {
        let (_, literals) = lex(r#""a\nb""#);
        assert_eq!(literals[0].1, LiteralValue::Str("a\nb".to_string()));
    }

    #[test]
    fn line_comment_runs_to_end_of_line() {
        let (stream, _) = lex("a // comment\nb");
        assert_eq!(stream.kind(TokenId::from_natural_index(2)), TokenKind::Comment);
    }

    #[test]
    fn skips_past_unmatched_closer_without_panicking() {
        let (stream, _) = lex(") x");
        assert_eq!(stream.kind(TokenId::from_natural_index(0)), TokenKind::Punct);
        assert_eq!(stream.bracket_match(TokenId::from_natural_index(0)), None);
    }
}
