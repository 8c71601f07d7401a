//! Abstract syntax tree for unit script.

use std::ops::Range;
use std::sync::Arc;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub items: Vec<Item>,
}

/// A top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    ExportDefault(ExportDefault),
    Stmt(Stmt),
}

/// `import a from "src";` or `import { a, b as c } from "src";`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    pub span: Range<usize>,
}

/// One name brought in by an import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    /// Exported name for `{ a as b }` forms, `None` for the default form
    pub imported: Option<String>,
    /// Name bound in the importing body
    pub local: String,
}

/// `export default <value>`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDefault {
    /// Text of the block comments directly in front of `export`, joined by newlines
    pub doc: Option<String>,
    pub value: ExportValue,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Function(FnDecl),
    Expr(Expr),
}

/// A function, named or anonymous.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Ident(String),
    /// `{ key, key: local }`
    Object(Vec<PatternField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternField {
    pub key: String,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        init: Option<Expr>,
        constant: bool,
    },
    /// Named function declaration, hoisted to the top of its block
    Fn(Arc<FnDecl>),
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Throw(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Function(Arc<FnDecl>),
    /// `import(source)`
    Import(Box<Expr>),
}

/// Operator precedence levels (higher binds tighter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None = 0,
    Assign = 1,      // = and function expressions
    Conditional = 2, // ?:
    Or = 3,          // ||
    And = 4,         // &&
    Equality = 5,    // == !=
    Comparison = 6,  // < <= > >=
    Term = 7,        // + -
    Factor = 8,      // * / %
    Unary = 9,       // ! - typeof
    Call = 10,       // () [] .
    Primary = 11,
}

impl Precedence {
    /// The next higher level.
    pub fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Assign,
            Precedence::Assign => Precedence::Conditional,
            Precedence::Conditional => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

impl BinaryOp {
    pub fn precedence(self) -> Precedence {
        match self {
            BinaryOp::Eq | BinaryOp::NotEq => Precedence::Equality,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => Precedence::Comparison,
            BinaryOp::Add | BinaryOp::Sub => Precedence::Term,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => Precedence::Factor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl LogicalOp {
    pub fn precedence(self) -> Precedence {
        match self {
            LogicalOp::And => Precedence::And,
            LogicalOp::Or => Precedence::Or,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

impl Expr {
    /// How tightly this expression binds when printed.
    pub fn precedence(&self) -> Precedence {
        match self {
            Expr::Assign { .. } | Expr::Function(_) => Precedence::Assign,
            Expr::Conditional { .. } => Precedence::Conditional,
            Expr::Logical { op, .. } => op.precedence(),
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { .. } => Precedence::Unary,
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } | Expr::Import(_) => {
                Precedence::Call
            }
            _ => Precedence::Primary,
        }
    }

    /// A short description of the expression's syntactic kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Null => "null literal",
            Expr::Bool(_) => "boolean literal",
            Expr::Number(_) => "number literal",
            Expr::Str(_) => "string literal",
            Expr::Ident(_) => "identifier",
            Expr::Array(_) => "array expression",
            Expr::Object(_) => "object expression",
            Expr::Member { .. } | Expr::Index { .. } => "member expression",
            Expr::Call { .. } => "call expression",
            Expr::Unary { .. } => "unary expression",
            Expr::Binary { .. } => "binary expression",
            Expr::Logical { .. } => "logical expression",
            Expr::Conditional { .. } => "conditional expression",
            Expr::Assign { .. } => "assignment expression",
            Expr::Function(_) => "function expression",
            Expr::Import(_) => "import expression",
        }
    }
}

impl Module {
    /// Visit every expression in the module mutably, children before parents.
    pub fn walk_exprs_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        for item in &mut self.items {
            match item {
                Item::Import(_) => {}
                Item::ExportDefault(export) => match &mut export.value {
                    ExportValue::Function(decl) => walk_stmts_mut(&mut decl.body, f),
                    ExportValue::Expr(expr) => walk_expr_mut(expr, f),
                },
                Item::Stmt(stmt) => walk_stmt_mut(stmt, f),
            }
        }
    }
}

pub fn walk_stmts_mut(stmts: &mut [Stmt], f: &mut dyn FnMut(&mut Expr)) {
    for stmt in stmts {
        walk_stmt_mut(stmt, f);
    }
}

pub fn walk_stmt_mut(stmt: &mut Stmt, f: &mut dyn FnMut(&mut Expr)) {
    match stmt {
        Stmt::Let { init, .. } => {
            if let Some(init) = init {
                walk_expr_mut(init, f);
            }
        }
        Stmt::Fn(decl) => walk_stmts_mut(&mut Arc::make_mut(decl).body, f),
        Stmt::Expr(expr) | Stmt::Throw(expr) => walk_expr_mut(expr, f),
        Stmt::Return(value) => {
            if let Some(value) = value {
                walk_expr_mut(value, f);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr_mut(cond, f);
            walk_stmts_mut(then_branch, f);
            if let Some(else_branch) = else_branch {
                walk_stmts_mut(else_branch, f);
            }
        }
        Stmt::While { cond, body } => {
            walk_expr_mut(cond, f);
            walk_stmts_mut(body, f);
        }
        Stmt::Block(body) => walk_stmts_mut(body, f),
    }
}

pub fn walk_expr_mut(expr: &mut Expr, f: &mut dyn FnMut(&mut Expr)) {
    match expr {
        Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) | Expr::Ident(_) => {}
        Expr::Array(elements) => {
            for element in elements {
                walk_expr_mut(element, f);
            }
        }
        Expr::Object(properties) => {
            for (_, value) in properties {
                walk_expr_mut(value, f);
            }
        }
        Expr::Member { object, .. } => walk_expr_mut(object, f),
        Expr::Index { object, index } => {
            walk_expr_mut(object, f);
            walk_expr_mut(index, f);
        }
        Expr::Call { callee, args } => {
            walk_expr_mut(callee, f);
            for arg in args {
                walk_expr_mut(arg, f);
            }
        }
        Expr::Unary { operand, .. } => walk_expr_mut(operand, f),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            walk_expr_mut(left, f);
            walk_expr_mut(right, f);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            walk_expr_mut(test, f);
            walk_expr_mut(consequent, f);
            walk_expr_mut(alternate, f);
        }
        Expr::Assign { target, value } => {
            walk_expr_mut(target, f);
            walk_expr_mut(value, f);
        }
        Expr::Function(decl) => walk_stmts_mut(&mut Arc::make_mut(decl).body, f),
        Expr::Import(source) => walk_expr_mut(source, f),
    }
    f(expr);
}
