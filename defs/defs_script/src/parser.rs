//! Recursive descent parser for unit script.
//!
//! Expressions use Pratt parsing for operator precedence. Semicolons may be
//! left out at the end of a line or before a closing brace.

use std::ops::Range;
use std::sync::Arc;

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Parse a whole source file.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    Parser::new(source)?.parse_module()
}

type ParseResult<T> = Result<T, ParseError>;

/// How deeply blocks and expressions may nest.
///
/// Every later stage walks the tree recursively, so the limit applies to the
/// tree: a left-leaning chain such as `a + b + c` counts one level per
/// operator.
pub const MAX_NESTING: usize = 128;

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn infix_operator(kind: TokenKind) -> Option<(Precedence, Infix)> {
    let infix = match kind {
        TokenKind::OrOr => Infix::Logical(LogicalOp::Or),
        TokenKind::AndAnd => Infix::Logical(LogicalOp::And),
        TokenKind::EqEq => Infix::Binary(BinaryOp::Eq),
        TokenKind::NotEq => Infix::Binary(BinaryOp::NotEq),
        TokenKind::Lt => Infix::Binary(BinaryOp::Lt),
        TokenKind::Le => Infix::Binary(BinaryOp::Le),
        TokenKind::Gt => Infix::Binary(BinaryOp::Gt),
        TokenKind::Ge => Infix::Binary(BinaryOp::Ge),
        TokenKind::Plus => Infix::Binary(BinaryOp::Add),
        TokenKind::Minus => Infix::Binary(BinaryOp::Sub),
        TokenKind::Star => Infix::Binary(BinaryOp::Mul),
        TokenKind::Slash => Infix::Binary(BinaryOp::Div),
        TokenKind::Percent => Infix::Binary(BinaryOp::Rem),
        _ => return None,
    };
    let precedence = match &infix {
        Infix::Binary(op) => op.precedence(),
        Infix::Logical(op) => op.precedence(),
    };
    Some((precedence, infix))
}

/// The parser state.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    /// Whether a line break precedes each token
    line_breaks: Vec<bool>,
    /// Block comments between each token and the one before it
    comments: Vec<Vec<Range<usize>>>,
    pos: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    /// Tokenize `source` and set up a parser over it.
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        let mut line_breaks = Vec::new();
        let mut comments = Vec::new();
        let mut pending = Vec::new();
        let mut prev_end = 0;

        for token in tokenize(source)? {
            if token.kind == TokenKind::BlockComment {
                pending.push(token.span);
                continue;
            }
            line_breaks.push(source[prev_end..token.span.start].contains('\n'));
            comments.push(std::mem::take(&mut pending));
            prev_end = token.span.end;
            tokens.push(token);
        }

        Ok(Self {
            source,
            tokens,
            line_breaks,
            comments,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse every item up to the end of input.
    pub fn parse_module(mut self) -> ParseResult<Module> {
        let mut items = Vec::new();
        while !self.at_end() {
            items.push(self.parse_item()?);
        }
        Ok(Module { items })
    }

    // Token helpers

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn advance(&mut self) -> ParseResult<Token> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(self.error_here("unexpected end of input")),
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.unexpected(kind.description()))
        }
    }

    fn text(&self, token: &Token) -> &'src str {
        &self.source[token.span.clone()]
    }

    fn check_contextual(&self, word: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some(token) => token.kind == TokenKind::Ident && self.text(token) == word,
            None => false,
        }
    }

    fn eat_contextual(&mut self, word: &str) -> bool {
        if self.check_contextual(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn line_break_before(&self) -> bool {
        self.line_breaks.get(self.pos).copied().unwrap_or(true)
    }

    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end)
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let offset = self
            .tokens
            .get(self.pos)
            .map_or(self.source.len(), |t| t.span.start);
        ParseError::at(self.source, offset, message)
    }

    /// Go one level deeper, failing past [`MAX_NESTING`]. Levels are only
    /// given back on success; a failed parse is not resumed.
    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here(format!(
                "nesting too deep (more than {} levels)",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(token) => self.error_here(format!(
                "expected {}, found {}",
                expected,
                token.kind.description()
            )),
            None => self.error_here(format!("expected {}, found end of input", expected)),
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        let token = self.expect(TokenKind::Ident)?;
        Ok(self.text(&token).to_string())
    }

    /// An identifier or keyword used as a property name.
    fn expect_property_name(&mut self) -> ParseResult<String> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == TokenKind::Ident => {
                let name = self.text(token).to_string();
                self.pos += 1;
                Ok(name)
            }
            Some(token) => match token.kind.as_keyword_str() {
                Some(keyword) => {
                    self.pos += 1;
                    Ok(keyword.to_string())
                }
                None => Err(self.unexpected("property name")),
            },
            None => Err(self.unexpected("property name")),
        }
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        let token = self.expect(TokenKind::String)?;
        unescape(self.text(&token))
            .map_err(|message| ParseError::at(self.source, token.span.start, message))
    }

    fn end_statement(&mut self) -> ParseResult<()> {
        if self.eat(TokenKind::Semi)
            || self.check(TokenKind::RBrace)
            || self.at_end()
            || self.line_break_before()
        {
            Ok(())
        } else {
            Err(self.unexpected("`;`"))
        }
    }

    fn doc_comment(&self, index: usize) -> Option<String> {
        let ranges = self.comments.get(index)?;
        if ranges.is_empty() {
            return None;
        }
        let parts: Vec<&str> = ranges
            .iter()
            .map(|range| &self.source[range.start + 2..range.end - 2])
            .collect();
        Some(parts.join("\n"))
    }

    // Items

    fn parse_item(&mut self) -> ParseResult<Item> {
        match self.peek_kind() {
            Some(TokenKind::Import) if self.peek_kind_at(1) != Some(TokenKind::LParen) => {
                self.parse_import().map(Item::Import)
            }
            Some(TokenKind::Export) => self.parse_export().map(Item::ExportDefault),
            _ => self.parse_stmt().map(Item::Stmt),
        }
    }

    fn parse_import(&mut self) -> ParseResult<ImportDecl> {
        let start = self.expect(TokenKind::Import)?.span.start;
        let mut specifiers = Vec::new();

        let mut named = true;
        if self.check(TokenKind::Ident) && !self.check_contextual("from") {
            let local = self.expect_ident()?;
            specifiers.push(ImportSpecifier {
                imported: None,
                local,
            });
            named = self.eat(TokenKind::Comma);
        }

        if named {
            self.expect(TokenKind::LBrace)?;
            while !self.check(TokenKind::RBrace) {
                let imported = self.expect_ident()?;
                let local = if self.eat_contextual("as") {
                    self.expect_ident()?
                } else {
                    imported.clone()
                };
                specifiers.push(ImportSpecifier {
                    imported: Some(imported),
                    local,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace)?;
        }

        if !self.eat_contextual("from") {
            return Err(self.unexpected("`from`"));
        }
        let source = self.expect_string()?;
        let end = self.previous_end();
        self.end_statement()?;

        Ok(ImportDecl {
            specifiers,
            source,
            span: start..end,
        })
    }

    fn parse_export(&mut self) -> ParseResult<ExportDefault> {
        let doc = self.doc_comment(self.pos);
        let start = self.expect(TokenKind::Export)?.span.start;
        if !self.eat_contextual("default") {
            return Err(self.error_here("only `export default` is supported"));
        }

        let value = if self.check(TokenKind::Fn) {
            self.advance()?;
            let decl = self.parse_fn()?;
            self.eat(TokenKind::Semi);
            ExportValue::Function(decl)
        } else {
            let expr = self.parse_expr()?;
            self.end_statement()?;
            ExportValue::Expr(expr)
        };

        Ok(ExportDefault {
            doc,
            value,
            span: start..self.previous_end(),
        })
    }

    /// Parse the rest of a function after `fn`.
    fn parse_fn(&mut self) -> ParseResult<FnDecl> {
        let name = if self.check(TokenKind::Ident) {
            Some(self.expect_ident()?)
        } else {
            None
        };

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            params.push(self.parse_param()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        Ok(FnDecl { name, params, body })
    }

    fn parse_param(&mut self) -> ParseResult<Param> {
        if !self.eat(TokenKind::LBrace) {
            return self.expect_ident().map(Param::Ident);
        }

        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let shorthand = self.check(TokenKind::Ident);
            let key = if self.check(TokenKind::String) {
                self.expect_string()?
            } else {
                self.expect_property_name()?
            };
            let local = if self.eat(TokenKind::Colon) {
                self.expect_ident()?
            } else if shorthand {
                key.clone()
            } else {
                return Err(self.unexpected("`:`"));
            };
            fields.push(PatternField { key, local });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Param::Object(fields))
    }

    // Statements

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.descend()?;
        let block = self.parse_block_inner()?;
        self.ascend(1);
        Ok(block)
    }

    fn parse_block_inner(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            Some(TokenKind::Let) | Some(TokenKind::Const) => {
                let constant = self.advance()?.kind == TokenKind::Const;
                let name = self.expect_ident()?;
                let init = if self.eat(TokenKind::Eq) {
                    Some(self.parse_expr()?)
                } else if constant {
                    return Err(self.error_here("missing initializer in const declaration"));
                } else {
                    None
                };
                self.end_statement()?;
                Ok(Stmt::Let {
                    name,
                    init,
                    constant,
                })
            }
            Some(TokenKind::Fn) if self.peek_kind_at(1) == Some(TokenKind::Ident) => {
                self.advance()?;
                let decl = self.parse_fn()?;
                Ok(Stmt::Fn(Arc::new(decl)))
            }
            Some(TokenKind::Return) => {
                self.advance()?;
                let value = if self.check(TokenKind::Semi)
                    || self.check(TokenKind::RBrace)
                    || self.line_break_before()
                {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.end_statement()?;
                Ok(Stmt::Return(value))
            }
            Some(TokenKind::If) => {
                self.advance()?;
                let cond = self.parse_condition()?;
                let then_branch = self.parse_block()?;
                let else_branch = if self.eat(TokenKind::Else) {
                    if self.check(TokenKind::If) {
                        self.descend()?;
                        let else_if = self.parse_stmt()?;
                        self.ascend(1);
                        Some(vec![else_if])
                    } else {
                        Some(self.parse_block()?)
                    }
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            Some(TokenKind::While) => {
                self.advance()?;
                let cond = self.parse_condition()?;
                let body = self.parse_block()?;
                Ok(Stmt::While { cond, body })
            }
            Some(TokenKind::Throw) => {
                self.advance()?;
                if self.line_break_before() {
                    return Err(self.error_here("illegal newline after throw"));
                }
                let value = self.parse_expr()?;
                self.end_statement()?;
                Ok(Stmt::Throw(value))
            }
            Some(TokenKind::LBrace) => self.parse_block().map(Stmt::Block),
            Some(TokenKind::Export) => Err(self.error_here("export is only allowed at the top level")),
            _ => {
                let expr = self.parse_expr()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_condition(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(cond)
    }

    // Expressions

    /// Parse a full expression, assignments included.
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.descend()?;
        let expr = self.parse_assignment()?;
        self.ascend(1);
        Ok(expr)
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        let target = self.parse_conditional()?;

        if !self.check(TokenKind::Eq) {
            return Ok(target);
        }
        if !matches!(
            target,
            Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }
        ) {
            self.pos = start;
            return Err(self.error_here("invalid assignment target"));
        }
        self.advance()?;
        let value = self.parse_expr()?;
        Ok(Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_binary(Precedence::Or)?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let alternate = self.parse_expr()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_binary(&mut self, min: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        let mut levels = 0;

        while let Some((precedence, infix)) = self.peek_kind().and_then(infix_operator) {
            if precedence < min {
                break;
            }
            self.descend()?;
            levels += 1;
            self.advance()?;
            let right = Box::new(self.parse_binary(precedence.next())?);
            let lhs = Box::new(left);
            left = match infix {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    left: lhs,
                    right,
                },
                Infix::Logical(op) => Expr::Logical {
                    op,
                    left: lhs,
                    right,
                },
            };
        }

        self.ascend(levels);
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_kind() {
            Some(TokenKind::Not) => UnaryOp::Not,
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Typeof) => UnaryOp::Typeof,
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        self.descend()?;
        let operand = self.parse_unary()?;
        self.ascend(1);
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut levels = 0;

        loop {
            if matches!(
                self.peek_kind(),
                Some(TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen)
            ) {
                self.descend()?;
                levels += 1;
            }

            if self.eat(TokenKind::Dot) {
                let property = self.expect_property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(TokenKind::LParen) {
                let args = self.parse_list(TokenKind::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.ascend(levels);
                return Ok(expr);
            }
        }
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn parse_list(&mut self, close: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(kind) = self.peek_kind() else {
            return Err(self.unexpected("expression"));
        };

        match kind {
            TokenKind::Number => {
                let token = self.advance()?;
                let text = self.text(&token);
                match text.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(Expr::Number(n)),
                    _ => Err(ParseError::at(
                        self.source,
                        token.span.start,
                        format!("number literal {} out of range", text),
                    )),
                }
            }
            TokenKind::String => self.expect_string().map(Expr::Str),
            TokenKind::True => {
                self.advance()?;
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Expr::Bool(false))
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(Expr::Null)
            }
            TokenKind::Ident => self.expect_ident().map(Expr::Ident),
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance()?;
                self.parse_list(TokenKind::RBracket).map(Expr::Array)
            }
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Fn => {
                self.advance()?;
                let decl = self.parse_fn()?;
                Ok(Expr::Function(Arc::new(decl)))
            }
            TokenKind::Import => {
                self.advance()?;
                self.expect(TokenKind::LParen)?;
                let source = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Import(Box::new(source)))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::LBrace)?;
        let mut properties = Vec::new();

        while !self.check(TokenKind::RBrace) {
            let shorthand = self.check(TokenKind::Ident);
            let key = match self.peek_kind() {
                Some(TokenKind::String) => self.expect_string()?,
                Some(TokenKind::Number) => {
                    let token = self.advance()?;
                    self.text(&token).to_string()
                }
                _ => self.expect_property_name()?,
            };
            let value = if self.eat(TokenKind::Colon) {
                self.parse_expr()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected("`:`"));
            };
            properties.push((key, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Object(properties))
    }
}

/// Decode a quoted string literal.
fn unescape(literal: &str) -> Result<String, String> {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some(c @ ('\\' | '"' | '\'' | '/')) => out.push(c),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    None => return Err(format!("invalid unicode escape \\u{}", hex)),
                }
            }
            Some(other) => return Err(format!("invalid escape sequence \\{}", other)),
            None => return Err("unterminated escape sequence".to_string()),
        }
    }

    Ok(out)
}
