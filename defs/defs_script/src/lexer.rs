//! Lexical analysis for unit script.
//!
//! Whitespace and `//` line comments are skipped. Block comments are kept as
//! tokens because the comments in front of `export default` become the
//! definition's documentation; the parser drops every other one.
//!
//! # Example
//!
//! ```rust
//! use defs_script::{tokenize, TokenKind};
//!
//! let tokens = tokenize("let x = 42;").unwrap();
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![TokenKind::Let, TokenKind::Ident, TokenKind::Eq, TokenKind::Number, TokenKind::Semi]
//! );
//! ```

use std::ops::Range;

use logos::Logos;

use crate::error::ParseError;

/// Token kinds for the unit script lexer.
///
/// `from`, `as` and `default` are contextual and lex as identifiers.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // Keywords
    #[token("import")]
    Import,
    #[token("export")]
    Export,
    #[token("fn")]
    Fn,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("throw")]
    Throw,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("typeof")]
    Typeof,

    // Literals and names
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    String,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,

    // Operators
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Not,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    // Comments
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    /// `/* ... */`, kept so documentation can be recovered
    #[token("/*", block_comment)]
    BlockComment,
}

/// Consume the rest of a block comment. Unclosed comments are lex errors.
fn block_comment(lexer: &mut logos::Lexer<TokenKind>) -> bool {
    match lexer.remainder().find("*/") {
        Some(end) => {
            lexer.bump(end + 2);
            true
        }
        None => {
            lexer.bump(lexer.remainder().len());
            false
        }
    }
}

impl TokenKind {
    /// A human readable name for diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            TokenKind::Import => "`import`",
            TokenKind::Export => "`export`",
            TokenKind::Fn => "`fn`",
            TokenKind::Let => "`let`",
            TokenKind::Const => "`const`",
            TokenKind::Return => "`return`",
            TokenKind::If => "`if`",
            TokenKind::Else => "`else`",
            TokenKind::While => "`while`",
            TokenKind::Throw => "`throw`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Null => "`null`",
            TokenKind::Typeof => "`typeof`",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::Question => "`?`",
            TokenKind::Eq => "`=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Le => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::Ge => "`>=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Not => "`!`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::LineComment => "comment",
            TokenKind::BlockComment => "comment",
        }
    }

    /// Keyword spelling, for tokens that are keywords.
    pub fn as_keyword_str(&self) -> Option<&'static str> {
        let keyword = match self {
            TokenKind::Import => "import",
            TokenKind::Export => "export",
            TokenKind::Fn => "fn",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Throw => "throw",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Typeof => "typeof",
            _ => return None,
        };
        Some(keyword)
    }
}

/// Whether `name` is a reserved word.
pub fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "import"
            | "export"
            | "fn"
            | "let"
            | "const"
            | "return"
            | "if"
            | "else"
            | "while"
            | "throw"
            | "true"
            | "false"
            | "null"
            | "typeof"
    )
}

/// A token with its kind and byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Tokenize a whole source text.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(kind) = lexer.next() {
        let span = lexer.span();
        match kind {
            Ok(kind) => tokens.push(Token { kind, span }),
            Err(()) => {
                let message = if lexer.slice().starts_with("/*") {
                    "unterminated block comment".to_string()
                } else {
                    format!("unexpected character {:?}", lexer.slice())
                };
                return Err(ParseError::at(source, span.start, message));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_contextual_words() {
        assert_eq!(
            lex("import a from export default fn"),
            vec![
                TokenKind::Import,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Export,
                TokenKind::Ident,
                TokenKind::Fn,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            lex(r#"1 2.5 1e3 "a\"b" 'c'"#),
            vec![
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::String,
                TokenKind::String,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("= == != <= >= && || !"),
            vec![
                TokenKind::Eq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Not,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(lex("fn // comment\nlet"), vec![TokenKind::Fn, TokenKind::Let]);
        assert_eq!(
            lex("/** doc */ fn"),
            vec![TokenKind::BlockComment, TokenKind::Fn]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("fn main").unwrap();
        assert_eq!(tokens[0].span, 0..2);
        assert_eq!(tokens[1].span, 3..7);
    }

    #[test]
    fn test_unclosed_block_comment() {
        let err = tokenize("fn /* unclosed").unwrap_err();
        assert_eq!(err.message, "unterminated block comment");
        assert_eq!((err.line, err.column), (1, 4));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("let a = #;").unwrap_err();
        assert_eq!((err.line, err.column), (1, 9));
    }
}
