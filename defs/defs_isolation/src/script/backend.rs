//! Script isolation backend.

use std::sync::Arc;

use defs_core::error::{ExecutionError, Result};
use defs_core::traits::IsolationBackend;
use defs_core::types::{BindingTable, EvalMode, Value, EXPORT_SLOT};
use defs_script::ast::{Expr, Item, Stmt};
use defs_script::parse_module;
use tracing::{debug, trace};

use super::evaluation::{escape, Evaluation};
use super::interpreter::Interpreter;
use super::scope::Scope;
use super::script_error;
use crate::resource::{ExecutionLimits, ResourceMetering};

/// Runs normalized unit script bodies.
///
/// Each evaluation gets a fresh root scope holding only the binding table
/// and the `exports` slot, and a fresh [`ResourceMetering`]. The frames of an
/// evaluation are released when it returns, unless a function escapes in
/// its result.
#[derive(Debug, Clone, Default)]
pub struct ScriptBackend {
    limits: ExecutionLimits,
}

impl ScriptBackend {
    /// Create a backend with the given limits.
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }

    /// The limits applied to each evaluation.
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }
}

/// Take the top-level statements of a normalized body.
fn executable_statements(body: &str) -> Result<Vec<Stmt>> {
    let mut module = parse_module(body)
        .map_err(|err| script_error(format!("Body does not parse at {}", err)))?;

    let mut has_import = false;
    module.walk_exprs_mut(&mut |expr| {
        if matches!(expr, Expr::Import(_)) {
            has_import = true;
        }
    });
    if has_import {
        return Err(script_error(
            "Body contains import(); it must be normalized first",
        ));
    }

    module
        .items
        .into_iter()
        .map(|item| match item {
            Item::Stmt(stmt) => Ok(stmt),
            Item::Import(import) => Err(script_error(format!(
                "Body contains an import of {:?}; it must be normalized first",
                import.source
            ))),
            Item::ExportDefault(_) => Err(script_error(
                "Body contains export default; it must be normalized first",
            )),
        })
        .collect()
}

impl IsolationBackend for ScriptBackend {
    fn name(&self) -> &str {
        "script"
    }

    fn evaluate(&self, body: &str, bindings: BindingTable, mode: EvalMode) -> Result<Value> {
        let stmts = executable_statements(body)?;
        let evaluation = Evaluation::new(ResourceMetering::new(Arc::new(self.limits.clone())));

        let scope = Scope::root();
        for (name, value) in bindings.iter() {
            scope.define(name, value.clone());
        }
        scope.define(EXPORT_SLOT, Value::Null);

        debug!(bindings = bindings.len(), ?mode, "Evaluating body");
        Interpreter::new(evaluation.clone()).exec_block(&stmts, &scope)?;
        let exported = scope.lookup(EXPORT_SLOT).unwrap_or_default();

        let result = match mode {
            EvalMode::Export => Ok(exported),
            EvalMode::Invoke => match exported {
                Value::Function(func) => func.call(vec![bindings.args().clone()]),
                other => Err(ExecutionError::NotCallable(format!(
                    "{} ({})",
                    EXPORT_SLOT,
                    other.type_tag()
                ))
                .into()),
            },
        };

        let usage = evaluation.metering().usage();
        trace!(
            operations = usage.operations,
            function_calls = usage.function_calls,
            peak_call_depth = usage.peak_call_depth,
            elapsed_us = usage.elapsed().as_micros() as u64,
            "Evaluation finished"
        );
        result.map(|value| escape(value, &evaluation))
    }
}
