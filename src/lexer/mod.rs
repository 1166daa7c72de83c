pub mod token;
pub use token::is_keyword;

use logos::Logos;
use crate::span::{Span, Spanned};
use crate::diagnostics::AnalysisError;
use token::Token;

pub fn lex(source: &str) -> Result<Vec<Spanned<Token>>, AnalysisError> {
    lex_in_file(source, 0)
}

/// Lex `source`, tagging every span with `file_id`.
pub fn lex_in_file(source: &str, file_id: u32) -> Result<Vec<Spanned<Token>>, AnalysisError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let span = Span::with_file(span.start, span.end, file_id);
        match result {
            Ok(tok) => tokens.push(Spanned::new(tok, span)),
            Err(()) => {
                return Err(AnalysisError::syntax(
                    format!("unexpected character '{}'", &source[span.start..span.end]),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_class_header() {
        let tokens = lex("class Foo<T> extends Bar {").unwrap();
        assert!(matches!(tokens[0].node, Token::Class));
        assert!(matches!(tokens[1].node, Token::Ident));
        assert!(matches!(tokens[2].node, Token::Lt));
        assert!(matches!(tokens[3].node, Token::Ident));
        assert!(matches!(tokens[4].node, Token::Gt));
        assert!(matches!(tokens[5].node, Token::Extends));
        assert!(matches!(tokens[7].node, Token::LBrace));
    }

    #[test]
    fn lex_interval_is_not_a_float() {
        let tokens = lex("0...10").unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[0].node, Token::IntLit(0)));
        assert!(matches!(tokens[1].node, Token::DotDotDot));
        assert!(matches!(tokens[2].node, Token::IntLit(10)));
    }

    #[test]
    fn lex_literals() {
        let tokens = lex(r#"42 0xFF 3.5 1e3 "dq" 'sq' true null"#).unwrap();
        assert!(matches!(tokens[0].node, Token::IntLit(42)));
        assert!(matches!(tokens[1].node, Token::IntLit(255)));
        assert!(matches!(tokens[2].node, Token::FloatLit(_)));
        assert!(matches!(tokens[3].node, Token::FloatLit(_)));
        assert!(matches!(tokens[4].node, Token::DoubleString));
        assert!(matches!(tokens[5].node, Token::SingleString));
        assert!(matches!(tokens[6].node, Token::True));
        assert!(matches!(tokens[7].node, Token::Null));
    }

    #[test]
    fn lex_comments_skipped() {
        let tokens = lex("var x = 1; // trailing\n/* block\n comment */ var y;").unwrap();
        assert_eq!(tokens.iter().filter(|t| matches!(t.node, Token::Var)).count(), 2);
    }

    #[test]
    fn lex_metadata() {
        let tokens = lex("@:isVar @:final var x").unwrap();
        assert_eq!(tokens[0].node, Token::Meta(":isVar".to_string()));
        assert_eq!(tokens[1].node, Token::Meta(":final".to_string()));
    }

    #[test]
    fn lex_spans_carry_file_id() {
        let tokens = lex_in_file("var x", 7).unwrap();
        assert_eq!(tokens[1].span, Span::with_file(4, 5, 7));
    }

    #[test]
    fn lex_rejects_unknown_character() {
        let err = lex("var x = #;").unwrap_err();
        assert!(err.to_string().contains("unexpected character '#'"));
    }

    #[test]
    fn keywords_are_recognized() {
        assert!(is_keyword("override"));
        assert!(is_keyword("untyped"));
        assert!(!is_keyword("get"));
    }
}
