//! Script functions as host callables.

use std::sync::{Arc, Weak};

use defs_core::error::Result;
use defs_core::traits::Callable;
use defs_core::types::{Function, Value};
use defs_script::ast::{FnDecl, Param};

use super::evaluation::Evaluation;
use super::interpreter::{Flow, Interpreter};
use super::scope::{Scope, WeakScope};
use super::script_error;

/// A closure over the scope it was created in.
///
/// The scope and the evaluation are owned elsewhere; see
/// [`Evaluation`](super::evaluation::Evaluation).
#[derive(Clone)]
pub(crate) struct ScriptFunction {
    decl: Arc<FnDecl>,
    env: WeakScope,
    evaluation: Weak<Evaluation>,
}

impl ScriptFunction {
    pub fn new(decl: Arc<FnDecl>, env: &Scope, evaluation: &Arc<Evaluation>) -> Self {
        evaluation.retain(env);
        Self {
            decl,
            env: env.downgrade(),
            evaluation: Arc::downgrade(evaluation),
        }
    }
}

fn bind_param(scope: &Scope, param: &Param, arg: Value) {
    match param {
        Param::Ident(name) => scope.define(name, arg),
        Param::Object(fields) => {
            let object = arg.as_object();
            for field in fields {
                let value = object
                    .and_then(|object| object.get(&field.key))
                    .cloned()
                    .unwrap_or_default();
                scope.define(&field.local, value);
            }
        }
    }
}

impl Callable for ScriptFunction {
    fn name(&self) -> Option<&str> {
        self.decl.name.as_deref()
    }

    fn call(&self, args: Vec<Value>) -> Result<Value> {
        let (Some(evaluation), Some(env)) = (self.evaluation.upgrade(), self.env.upgrade()) else {
            return Err(script_error(format!(
                "{} was called after its evaluation ended",
                self.decl.name.as_deref().unwrap_or("anonymous function")
            )));
        };
        let _guard = evaluation.metering().enter_call()?;
        let scope = env.child();

        if let Some(name) = &self.decl.name {
            scope.define(name, Value::Function(Function::new(self.clone())));
        }

        let mut args = args.into_iter();
        for param in &self.decl.params {
            bind_param(&scope, param, args.next().unwrap_or_default());
        }

        let interpreter = Interpreter::new(evaluation.clone());
        match interpreter.exec_block(&self.decl.body, &scope)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
        }
    }
}
