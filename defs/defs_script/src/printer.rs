//! Canonical printer.
//!
//! Printing is deterministic: layout, quoting and parenthesization depend
//! only on the tree, and comments are never emitted. Two sources that differ
//! only in formatting print to the same text.

use crate::ast::*;

const INDENT: &str = "    ";

/// Print a module in canonical form.
pub fn print_module(module: &Module) -> String {
    let mut printer = Printer::default();
    for item in &module.items {
        printer.write_item(item);
    }
    printer.out
}

/// Print a single expression in canonical form.
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.write_expr(expr, Precedence::None);
    printer.out
}

/// Whether `name` can be written without quotes as a property name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Quote a string as a double-quoted literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn write_item(&mut self, item: &Item) {
        match item {
            Item::Import(import) => self.write_import(import),
            Item::ExportDefault(export) => {
                self.out.push_str("export default ");
                match &export.value {
                    ExportValue::Function(decl) => {
                        self.write_fn(decl);
                        self.out.push('\n');
                    }
                    ExportValue::Expr(expr) => {
                        self.write_statement_expr(expr);
                        self.out.push_str(";\n");
                    }
                }
            }
            Item::Stmt(stmt) => self.write_stmt(stmt),
        }
    }

    fn write_import(&mut self, import: &ImportDecl) {
        let mut defaults = Vec::new();
        let mut named = Vec::new();
        for spec in &import.specifiers {
            match &spec.imported {
                None => defaults.push(spec.local.clone()),
                Some(imported) if *imported == spec.local => named.push(imported.clone()),
                Some(imported) => named.push(format!("{} as {}", imported, spec.local)),
            }
        }

        let mut clauses = defaults;
        if !named.is_empty() {
            clauses.push(format!("{{ {} }}", named.join(", ")));
        }
        self.out.push_str(&format!(
            "import {} from {};\n",
            clauses.join(", "),
            quote(&import.source)
        ));
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        self.indent();
        match stmt {
            Stmt::Let {
                name,
                init,
                constant,
            } => {
                self.out.push_str(if *constant { "const " } else { "let " });
                self.out.push_str(name);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.write_expr(init, Precedence::Assign);
                }
                self.out.push(';');
            }
            Stmt::Fn(decl) => self.write_fn(decl),
            Stmt::Expr(expr) => {
                self.write_statement_expr(expr);
                self.out.push(';');
            }
            Stmt::Return(value) => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.write_expr(value, Precedence::None);
                }
                self.out.push(';');
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.write_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body } => {
                self.out.push_str("while (");
                self.write_expr(cond, Precedence::None);
                self.out.push_str(") ");
                self.write_block(body);
            }
            Stmt::Throw(value) => {
                self.out.push_str("throw ");
                self.write_expr(value, Precedence::None);
                self.out.push(';');
            }
            Stmt::Block(body) => self.write_block(body),
        }
        self.out.push('\n');
    }

    /// Expression statements may not start with `{` or `fn`.
    fn write_statement_expr(&mut self, expr: &Expr) {
        let mut inner = Printer {
            out: String::new(),
            depth: self.depth,
        };
        inner.write_expr(expr, Precedence::None);
        let text = inner.out;
        if text.starts_with('{') || text.starts_with("fn(") || text.starts_with("fn ") {
            self.out.push('(');
            self.out.push_str(&text);
            self.out.push(')');
        } else {
            self.out.push_str(&text);
        }
    }

    fn write_if(&mut self, cond: &Expr, then_branch: &[Stmt], else_branch: Option<&[Stmt]>) {
        self.out.push_str("if (");
        self.write_expr(cond, Precedence::None);
        self.out.push_str(") ");
        self.write_block(then_branch);

        match else_branch {
            None => {}
            Some(
                [Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                }],
            ) => {
                self.out.push_str(" else ");
                self.write_if(cond, then_branch, else_branch.as_deref());
            }
            Some(body) => {
                self.out.push_str(" else ");
                self.write_block(body);
            }
        }
    }

    fn write_block(&mut self, stmts: &[Stmt]) {
        if stmts.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.depth += 1;
        for stmt in stmts {
            self.write_stmt(stmt);
        }
        self.depth -= 1;
        self.indent();
        self.out.push('}');
    }

    fn write_fn(&mut self, decl: &FnDecl) {
        self.out.push_str("fn");
        if let Some(name) = &decl.name {
            self.out.push(' ');
            self.out.push_str(name);
        }
        self.out.push('(');
        for (i, param) in decl.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_param(param);
        }
        self.out.push_str(") ");
        self.write_block(&decl.body);
    }

    fn write_param(&mut self, param: &Param) {
        match param {
            Param::Ident(name) => self.out.push_str(name),
            Param::Object(fields) if fields.is_empty() => self.out.push_str("{}"),
            Param::Object(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        if field.key == field.local && !crate::lexer::is_keyword(&field.key) {
                            field.key.clone()
                        } else {
                            format!("{}: {}", property_key(&field.key), field.local)
                        }
                    })
                    .collect();
                self.out.push_str(&format!("{{ {} }}", parts.join(", ")));
            }
        }
    }

    fn write_expr(&mut self, expr: &Expr, min: Precedence) {
        if expr.precedence() < min {
            self.out.push('(');
            self.write_expr(expr, Precedence::None);
            self.out.push(')');
            return;
        }

        match expr {
            Expr::Null => self.out.push_str("null"),
            Expr::Bool(value) => self.out.push_str(if *value { "true" } else { "false" }),
            Expr::Number(n) => self.out.push_str(&n.to_string()),
            Expr::Str(value) => self.out.push_str(&quote(value)),
            Expr::Ident(name) => self.out.push_str(name),
            Expr::Array(elements) => {
                self.out.push('[');
                self.write_list(elements);
                self.out.push(']');
            }
            Expr::Object(properties) if properties.is_empty() => self.out.push_str("{}"),
            Expr::Object(properties) => {
                self.out.push_str("{ ");
                for (i, (key, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&property_key(key));
                    self.out.push_str(": ");
                    self.write_expr(value, Precedence::Assign);
                }
                self.out.push_str(" }");
            }
            Expr::Member { object, property } => {
                self.write_expr(object, Precedence::Call);
                if is_identifier(property) {
                    self.out.push('.');
                    self.out.push_str(property);
                } else {
                    self.out.push('[');
                    self.out.push_str(&quote(property));
                    self.out.push(']');
                }
            }
            Expr::Index { object, index } => {
                self.write_expr(object, Precedence::Call);
                self.out.push('[');
                self.write_expr(index, Precedence::None);
                self.out.push(']');
            }
            Expr::Call { callee, args } => {
                self.write_expr(callee, Precedence::Call);
                self.out.push('(');
                self.write_list(args);
                self.out.push(')');
            }
            Expr::Unary { op, operand } => {
                self.out.push_str(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::Typeof => "typeof ",
                });
                self.write_expr(operand, Precedence::Unary);
            }
            Expr::Binary { op, left, right } => {
                self.write_infix(left, op.as_str(), right, op.precedence())
            }
            Expr::Logical { op, left, right } => {
                self.write_infix(left, op.as_str(), right, op.precedence())
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.write_expr(test, Precedence::Or);
                self.out.push_str(" ? ");
                self.write_expr(consequent, Precedence::Assign);
                self.out.push_str(" : ");
                self.write_expr(alternate, Precedence::Assign);
            }
            Expr::Assign { target, value } => {
                self.write_expr(target, Precedence::Call);
                self.out.push_str(" = ");
                self.write_expr(value, Precedence::Assign);
            }
            Expr::Function(decl) => self.write_fn(decl),
            Expr::Import(source) => {
                self.out.push_str("import(");
                self.write_expr(source, Precedence::Assign);
                self.out.push(')');
            }
        }
    }

    fn write_infix(&mut self, left: &Expr, op: &str, right: &Expr, precedence: Precedence) {
        self.write_expr(left, precedence);
        self.out.push(' ');
        self.out.push_str(op);
        self.out.push(' ');
        self.write_expr(right, precedence.next());
    }

    fn write_list(&mut self, items: &[Expr]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_expr(item, Precedence::Assign);
        }
    }
}

fn property_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}
