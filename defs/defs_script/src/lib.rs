//! # Defs Script
//!
//! The unit script language that definition bodies are written in: a small,
//! expression-oriented language with ES-style `import` and `export default`
//! items.
//!
//! - **lexer**: Tokens, built with `logos`
//! - **parser**: Recursive descent with Pratt expressions
//! - **ast**: The syntax tree and a mutable expression walk
//! - **printer**: The canonical, comment-free printer

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;

pub use ast::{Expr, ExportDefault, ExportValue, FnDecl, ImportDecl, Item, Module, Param, Stmt};
pub use error::ParseError;
pub use lexer::{is_keyword, tokenize, Token, TokenKind};
pub use parser::{parse_module, Parser};
pub use printer::{print_expr, print_module};
