//! Dotted name paths (`foo.bar.Baz`, `.fully.qualified.Name`).

use crate::token::{TokenId, TokenStream};

/// A dotted sequence of identifier tokens, with an optional leading dot
/// marking it as already fully qualified (spec §4.6: "if the type name
/// begins with `.`, it is already absolute").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameData {
    pub leading_dot: bool,
    pub components: Vec<TokenId>,
}

impl NameData {
    pub fn single(component: TokenId) -> Self {
        NameData {
            leading_dot: false,
            components: vec![component],
        }
    }

    /// Renders the dotted name as text, given the stream and source it
    /// was lexed from.
    pub fn text(&self, stream: &TokenStream, source: &str) -> String {
        let mut out = String::new();
        if self.leading_dot {
            out.push('.');
        }
        for (i, &component) in self.components.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(stream.text(component, source));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn text_joins_components_with_dots() {
        let mut stream = TokenStream::new();
        let foo = stream.push_natural(3, TokenKind::Ident);
        let _dot = stream.push_natural(4, TokenKind::Punct);
        let bar = stream.push_natural(7, TokenKind::Ident);
        let name = NameData {
            leading_dot: false,
            components: vec![foo, bar],
        };
        assert_eq!(name.text(&stream, "foo.bar"), "foo.bar");
    }

    #[test]
    fn single_component_has_no_dots() {
        let mut stream = TokenStream::new();
        let id = stream.push_natural(3, TokenKind::Ident);
        let name = NameData::single(id);
        assert_eq!(name.text(&stream, "Foo"), "Foo");
    }

    #[test]
    fn leading_dot_marks_an_absolute_name() {
        let mut stream = TokenStream::new();
        let a = stream.push_natural(1, TokenKind::Ident);
        let name = NameData {
            leading_dot: true,
            components: vec![a],
        };
        assert!(name.text(&stream, "a").starts_with('.'));
    }
}
