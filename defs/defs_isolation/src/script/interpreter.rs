//! Tree-walking evaluation of statements and expressions.
//!
//! Objects and arrays are values: assigning through `a.b = v` rebuilds the
//! container and stores it back into `a`.

use std::cmp::Ordering;
use std::sync::Arc;

use defs_core::error::{ExecutionError, Result};
use defs_core::types::{Function, Object, Value};
use defs_script::ast::{BinaryOp, Expr, FnDecl, LogicalOp, Stmt, UnaryOp};
use defs_script::print_expr;

use super::evaluation::Evaluation;
use super::function::ScriptFunction;
use super::intrinsics;
use super::scope::Scope;
use super::script_error;

pub(crate) enum Flow {
    Normal,
    Return(Value),
}

pub(crate) struct Interpreter {
    evaluation: Arc<Evaluation>,
}

impl Interpreter {
    pub fn new(evaluation: Arc<Evaluation>) -> Self {
        Self { evaluation }
    }

    /// Run a block in `scope`. Named function declarations are bound first.
    pub fn exec_block(&self, stmts: &[Stmt], scope: &Scope) -> Result<Flow> {
        for stmt in stmts {
            if let Stmt::Fn(decl) = stmt {
                if let Some(name) = &decl.name {
                    scope.define(name, self.closure(decl.clone(), scope));
                }
            }
        }

        for stmt in stmts {
            if let Flow::Return(value) = self.exec_stmt(stmt, scope)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&self, stmt: &Stmt, scope: &Scope) -> Result<Flow> {
        self.evaluation.metering().tick()?;

        match stmt {
            Stmt::Let {
                name,
                init,
                constant,
            } => {
                let value = match init {
                    Some(init) => self.eval(init, scope)?,
                    None => Value::Null,
                };
                scope.declare(name, value, *constant)?;
                Ok(Flow::Normal)
            }
            Stmt::Fn(_) => Ok(Flow::Normal),
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, scope)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, scope)?.is_truthy() {
                    self.exec_block(then_branch, &scope.child())
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch, &scope.child())
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                while self.eval(cond, scope)?.is_truthy() {
                    self.evaluation.metering().tick()?;
                    if let Flow::Return(value) = self.exec_block(body, &scope.child())? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Throw(value) => {
                let message = match self.eval(value, scope)? {
                    Value::String(message) => message,
                    other => other.to_string(),
                };
                Err(ExecutionError::Raised(message).into())
            }
            Stmt::Block(body) => self.exec_block(body, &scope.child()),
        }
    }

    pub fn eval(&self, expr: &Expr, scope: &Scope) -> Result<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item, scope))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Expr::Object(properties) => {
                let mut object = Object::new();
                for (key, value) in properties {
                    object.insert(key.clone(), self.eval(value, scope)?);
                }
                Ok(Value::Object(object))
            }
            Expr::Member { object, property } => {
                let target = self.eval(object, scope)?;
                get_property(&target, property)
            }
            Expr::Index { object, index } => {
                let target = self.eval(object, scope)?;
                let key = self.eval(index, scope)?;
                get_index(&target, &key)
            }
            Expr::Call { callee, args } => {
                let func = self.eval(callee, scope)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, scope))
                    .collect::<Result<Vec<_>>>()?;
                self.evaluation.metering().tick()?;
                match func {
                    Value::Function(func) => func.call(args),
                    _ => Err(ExecutionError::NotCallable(print_expr(callee)).into()),
                }
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Typeof => Ok(Value::String(value.type_tag().as_str().to_string())),
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(script_error(format!(
                            "Cannot negate a value of type {}",
                            other.type_tag()
                        ))),
                    },
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                binary(*op, left, right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Assign { target, value } => {
                let value = self.eval(value, scope)?;
                self.assign(target, value.clone(), scope)?;
                Ok(value)
            }
            Expr::Function(decl) => Ok(self.closure(decl.clone(), scope)),
            Expr::Import(_) => Err(script_error(
                "import() is not available inside the sandbox",
            )),
        }
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Result<Value> {
        scope
            .lookup(name)
            .or_else(|| intrinsics::lookup(name).map(Value::Function))
            .ok_or_else(|| script_error(format!("{} is not defined", name)))
    }

    fn closure(&self, decl: Arc<FnDecl>, scope: &Scope) -> Value {
        Value::Function(Function::new(ScriptFunction::new(
            decl,
            scope,
            &self.evaluation,
        )))
    }

    fn assign(&self, target: &Expr, value: Value, scope: &Scope) -> Result<()> {
        match target {
            Expr::Ident(name) => scope.assign(name, value),
            Expr::Member { object, property } => {
                let mut container = self.eval(object, scope)?;
                set_property(&mut container, property, value)?;
                self.assign(object, container, scope)
            }
            Expr::Index { object, index } => {
                let key = self.eval(index, scope)?;
                let mut container = self.eval(object, scope)?;
                set_index(&mut container, &key, value)?;
                self.assign(object, container, scope)
            }
            other => Err(script_error(format!(
                "Invalid assignment target: {}",
                other.kind_name()
            ))),
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", left, right)))
            }
            _ => Err(operand_error(op, &left, &right)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                return Err(operand_error(op, &left, &right));
            };
            let n = match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            Ok(Value::Number(n))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => return Err(operand_error(op, &left, &right)),
            };
            let result = match ordering {
                None => false,
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Le => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                },
            };
            Ok(Value::Bool(result))
        }
    }
}

fn operand_error(op: BinaryOp, left: &Value, right: &Value) -> defs_core::Error {
    script_error(format!(
        "Operator {} cannot be applied to {} and {}",
        op.as_str(),
        left.type_tag(),
        right.type_tag()
    ))
}

fn array_index(key: f64) -> Option<usize> {
    if key >= 0.0 && key.fract() == 0.0 && key < usize::MAX as f64 {
        Some(key as usize)
    } else {
        None
    }
}

fn get_property(target: &Value, property: &str) -> Result<Value> {
    match target {
        Value::Object(object) => Ok(object.get(property).cloned().unwrap_or_default()),
        Value::Array(items) if property == "length" => Ok(Value::Number(items.len() as f64)),
        Value::String(s) if property == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::Null => Err(script_error(format!(
            "Cannot read property '{}' of null",
            property
        ))),
        _ => Ok(Value::Null),
    }
}

fn get_index(target: &Value, key: &Value) -> Result<Value> {
    match (target, key) {
        (Value::Array(items), Value::Number(n)) => Ok(array_index(*n)
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default()),
        (Value::String(s), Value::Number(n)) => Ok(array_index(*n)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default()),
        (_, Value::String(property)) => get_property(target, property),
        (Value::Null, _) => Err(script_error(format!(
            "Cannot read index {} of null",
            key
        ))),
        _ => Ok(Value::Null),
    }
}

fn set_property(target: &mut Value, property: &str, value: Value) -> Result<()> {
    match target {
        Value::Object(object) => {
            object.insert(property.to_string(), value);
            Ok(())
        }
        other => Err(script_error(format!(
            "Cannot set property '{}' on {}",
            property,
            other.type_tag()
        ))),
    }
}

fn set_index(target: &mut Value, key: &Value, value: Value) -> Result<()> {
    match (target, key) {
        (Value::Array(items), Value::Number(n)) => match array_index(*n) {
            Some(i) if i < items.len() => {
                items[i] = value;
                Ok(())
            }
            Some(i) if i == items.len() => {
                items.push(value);
                Ok(())
            }
            _ => Err(script_error(format!("Array index {} out of range", key))),
        },
        (target, Value::String(property)) => set_property(target, property, value),
        (target, _) => Err(script_error(format!(
            "Cannot set index {} on {}",
            key,
            target.type_tag()
        ))),
    }
}
