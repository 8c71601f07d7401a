//! Parse errors.

use thiserror::Error;

/// A lexical or syntactic error with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    /// What went wrong
    pub message: String,

    /// 1-based line
    pub line: usize,

    /// 1-based column, counted in characters
    pub column: usize,
}

impl ParseError {
    /// Build an error located at a byte offset of `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, offset);
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Translate a byte offset into a 1-based line and column.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let source = "let a = 1;\nlet b = @;";
        assert_eq!(line_column(source, 0), (1, 1));
        assert_eq!(line_column(source, 19), (2, 9));
        let err = ParseError::at(source, 19, "unexpected character");
        assert_eq!(err.to_string(), "2:9: unexpected character");
    }
}
