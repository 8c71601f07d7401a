//! Execution of resolved trees.
//!
//! The executor walks an [`ExecutionContext`] and hands each node's body to
//! the isolation backend together with a binding table holding exactly:
//!
//! - one callable per `requires` entry, under its local name,
//! - `require`, the dynamic-import lookup,
//! - `args`.
//!
//! Dependency callables execute their node of the same tree. `require`
//! resolves its token from the store every time it is called and executes
//! the fresh tree in export mode.
//!
//! Execution is synchronous. `require` drives the async resolver on the
//! runtime handle the executor was built with, so [`Executor::execute`] must
//! be called from outside async code (for example under
//! `tokio::task::spawn_blocking`).

use std::sync::Arc;

use defs_core::error::{Error, ExecutionError, Result, StoreError};
use defs_core::id::{DefId, ExecutionId};
use defs_core::traits::IsolationBackend;
use defs_core::types::{BindingTable, EvalMode, Function, Value, DYNAMIC_IMPORT_BINDING};
use tokio::runtime::Handle;
use tracing::{debug, info_span, trace};

use crate::contracts::{check_arguments, check_output};
use crate::resolve::{ExecutionContext, Resolver};
use crate::system::config::ExecutionConfig;

/// Per-call execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Check declared argument and output types of every invoked node
    pub runtime_type_checks: bool,

    /// Invoke the exported function with `args`; when false the exported
    /// value itself is returned
    pub eval: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            runtime_type_checks: false,
            eval: true,
        }
    }
}

impl ExecuteOptions {
    /// Invoke with runtime type checks on.
    pub fn checked() -> Self {
        Self {
            runtime_type_checks: true,
            eval: true,
        }
    }

    /// The same type-check setting, returning the export uninvoked.
    pub fn exported(self) -> Self {
        Self { eval: false, ..self }
    }

    /// The same type-check setting, invoking the export.
    pub fn invoked(self) -> Self {
        Self { eval: true, ..self }
    }
}

/// Runs execution trees against an isolation backend.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    isolation: Arc<dyn IsolationBackend>,
    resolver: Resolver,
    handle: Handle,
    max_depth: usize,
}

impl Executor {
    /// Create an executor.
    ///
    /// # Arguments
    ///
    /// * `isolation` - The backend every body runs in.
    /// * `resolver` - Used by `require` to build fresh trees.
    /// * `handle` - The tokio runtime `require` blocks on.
    /// * `config` - Execution limits.
    pub fn new(
        isolation: Arc<dyn IsolationBackend>,
        resolver: Resolver,
        handle: Handle,
        config: &ExecutionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                isolation,
                resolver,
                handle,
                max_depth: config.max_depth,
            }),
        }
    }

    /// The isolation backend.
    pub fn isolation(&self) -> &Arc<dyn IsolationBackend> {
        &self.inner.isolation
    }

    /// Execute the root of a resolved tree.
    ///
    /// # Arguments
    ///
    /// * `context` - The resolved tree.
    /// * `args` - Arguments for the root's exported function.
    /// * `options` - Type checking and eval mode.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The result, or the exported value when `eval` is false.
    /// * `Err(Error::ArgumentType | Error::OutputType)` - If type checks are on
    ///   and a contract is violated.
    /// * `Err(Error::Execution)` - If a body failed.
    /// * `Err` - Any error raised by a nested dependency or dynamic import.
    pub fn execute(
        &self,
        context: ExecutionContext,
        args: Value,
        options: ExecuteOptions,
    ) -> Result<Value> {
        let execution_id = ExecutionId::new();
        let span = info_span!("execute", id = %context.id, execution = %execution_id);
        let _enter = span.enter();

        let root = Arc::new(context);
        let result = self.run(&root, &[], args, options, 0);
        match &result {
            Ok(value) => debug!(output = %value.type_tag(), "Execution finished"),
            Err(err) => debug!(error = %err, "Execution failed"),
        }
        result
    }

    /// Execute the node at `path` below `root`.
    fn run(
        &self,
        root: &Arc<ExecutionContext>,
        path: &[DefId],
        args: Value,
        options: ExecuteOptions,
        depth: usize,
    ) -> Result<Value> {
        let node = root.descend(path).ok_or_else(|| {
            let missing = path.last().unwrap_or(&root.id);
            Error::from(StoreError::NotFound(missing.to_string()))
        })?;

        if depth >= self.inner.max_depth {
            return Err(ExecutionError::ResourceExhausted(format!(
                "Execution depth limit of {} exceeded at {}",
                self.inner.max_depth, node.id
            ))
            .into());
        }

        let definition = &node.definition;
        let check = options.runtime_type_checks && options.eval;
        if check {
            check_arguments(definition.arguments.as_ref(), &args).map_err(|source| {
                Error::ArgumentType {
                    id: node.id.clone(),
                    source,
                }
            })?;
        }

        let mut bindings = BindingTable::new(args);
        for (local, dependency) in &definition.requires {
            let mut child_path = path.to_vec();
            child_path.push(dependency.clone());
            bindings.bind(
                local.clone(),
                Value::Function(self.dependency_binding(local, root, child_path, options, depth)),
            );
        }
        bindings.bind(
            DYNAMIC_IMPORT_BINDING,
            Value::Function(self.require_binding(options, depth)),
        );

        trace!(
            id = %node.id,
            depth,
            bindings = bindings.len(),
            eval = options.eval,
            "Evaluating node"
        );
        let value = self.inner.isolation.evaluate(
            &definition.implementation,
            bindings,
            EvalMode::from_eval(options.eval),
        )?;

        if check {
            check_output(definition.output_type, &value).map_err(|source| Error::OutputType {
                id: node.id.clone(),
                source,
            })?;
        }

        Ok(value)
    }

    fn dependency_binding(
        &self,
        local: &str,
        root: &Arc<ExecutionContext>,
        path: Vec<DefId>,
        options: ExecuteOptions,
        depth: usize,
    ) -> Function {
        let executor = self.clone();
        let root = Arc::clone(root);
        Function::native(local, move |args: Vec<Value>| {
            let child_args = args.into_iter().next().unwrap_or_default();
            executor.run(&root, &path, child_args, options.invoked(), depth + 1)
        })
    }

    fn require_binding(&self, options: ExecuteOptions, depth: usize) -> Function {
        let executor = self.clone();
        Function::native(DYNAMIC_IMPORT_BINDING, move |args: Vec<Value>| {
            let token = match args.first() {
                Some(Value::String(token)) => token.clone(),
                other => {
                    let found = other.map_or("nothing".to_string(), |v| v.type_tag().to_string());
                    return Err(ExecutionError::Script(format!(
                        "{} expects a name or def id, got {}",
                        DYNAMIC_IMPORT_BINDING, found
                    ))
                    .into());
                }
            };
            executor.import(&token, options, depth + 1)
        })
    }

    /// Resolve `token` afresh and return its exported value.
    fn import(&self, token: &str, options: ExecuteOptions, depth: usize) -> Result<Value> {
        let resolver = self.inner.resolver.clone();
        let context = self.inner.handle.block_on(async move {
            let id = resolver.resolve_token(token).await?;
            resolver.resolve(&id).await
        })?;
        debug!(token, id = %context.id, "Dynamic import resolved");

        let root = Arc::new(context);
        self.run(&root, &[], Value::Null, options.exported(), depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use defs_core::error::ContractError;
    use defs_core::types::{Arguments, FunctionDefinition, Requires, TypeTag};
    use defs_isolation::ScriptBackend;
    use defs_store::{DefinitionStore, MemoryStorage};
    use serde_json::json;

    use crate::system::config::ResolverConfig;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap()
    }

    fn executor(rt: &tokio::runtime::Runtime, isolation: Arc<dyn IsolationBackend>) -> Executor {
        let store = DefinitionStore::new(Arc::new(MemoryStorage::new()));
        Executor::new(
            isolation,
            Resolver::new(store, ResolverConfig::default()),
            rt.handle().clone(),
            &ExecutionConfig::default(),
        )
    }

    fn node(
        id: &str,
        body: &str,
        arguments: Option<Arguments>,
        output_type: TypeTag,
        children: Vec<(&str, ExecutionContext)>,
    ) -> ExecutionContext {
        let id = DefId::parse(id).unwrap();
        let requires: Requires = children
            .iter()
            .map(|(local, child)| (local.to_string(), child.id.clone()))
            .collect();
        ExecutionContext {
            id: id.clone(),
            definition: FunctionDefinition {
                id,
                implementation: body.to_string(),
                arguments,
                output_type,
                jsdoc: None,
                requires,
                name: None,
                meta: None,
            },
            subtree: children
                .into_iter()
                .map(|(_, child)| (child.id.clone(), child))
                .collect(),
        }
    }

    fn numbers(names: &[&str]) -> Option<Arguments> {
        Some(names.iter().map(|n| (n.to_string(), TypeTag::Number)).collect())
    }

    fn adder() -> ExecutionContext {
        node(
            "defs_adder",
            "exports = fn adder({ x, y }) {\n    return x + y;\n};\n",
            numbers(&["x", "y"]),
            TypeTag::Number,
            vec![],
        )
    }

    #[test]
    fn test_dependency_bindings() {
        let rt = runtime();
        let executor = executor(&rt, Arc::new(ScriptBackend::default()));
        let main = node(
            "defs_main",
            "exports = fn main({ a }) {\n    return add({ x: a, y: 10 });\n};\n",
            numbers(&["a"]),
            TypeTag::Number,
            vec![("add", adder())],
        );

        let out = executor
            .execute(main, Value::from(json!({"a": 5})), ExecuteOptions::checked())
            .unwrap();
        assert_eq!(out, Value::Number(15.0));
    }

    #[test]
    fn test_argument_check_stops_before_the_body_runs() {
        struct Counting(AtomicUsize, ScriptBackend);

        impl IsolationBackend for Counting {
            fn name(&self) -> &str {
                "counting"
            }

            fn evaluate(&self, body: &str, bindings: BindingTable, mode: EvalMode) -> Result<Value> {
                self.0.fetch_add(1, Ordering::SeqCst);
                self.1.evaluate(body, bindings, mode)
            }
        }

        let rt = runtime();
        let backend = Arc::new(Counting(AtomicUsize::new(0), ScriptBackend::default()));
        let executor = executor(&rt, backend.clone());
        let main = node(
            "defs_main",
            "exports = fn main() {\n    return add({ x: 1, y: \"2\" });\n};\n",
            None,
            TypeTag::Number,
            vec![("add", adder())],
        );

        let err = executor
            .execute(main.clone(), Value::Null, ExecuteOptions::checked())
            .unwrap_err();
        match err {
            Error::ArgumentType { id, source } => {
                assert_eq!(id.as_str(), "defs_adder");
                assert!(matches!(source, ContractError::TypeMismatch { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // main ran, adder did not
        assert_eq!(backend.0.load(Ordering::SeqCst), 1);

        let out = executor
            .execute(main, Value::Null, ExecuteOptions::default())
            .unwrap();
        assert_eq!(out, Value::from("12"));
    }

    #[test]
    fn test_output_check() {
        let rt = runtime();
        let executor = executor(&rt, Arc::new(ScriptBackend::default()));
        let liar = node(
            "defs_liar",
            "exports = fn liar() {\n    return \"three\";\n};\n",
            None,
            TypeTag::Number,
            vec![],
        );

        let err = executor
            .execute(liar.clone(), Value::Null, ExecuteOptions::checked())
            .unwrap_err();
        assert!(matches!(err, Error::OutputType { .. }));
        assert!(executor
            .execute(liar, Value::Null, ExecuteOptions::default())
            .is_ok());
    }

    #[test]
    fn test_export_mode_returns_callable() {
        let rt = runtime();
        let executor = executor(&rt, Arc::new(ScriptBackend::default()));

        let exported = executor
            .execute(adder(), Value::Null, ExecuteOptions::default().exported())
            .unwrap();
        let func = exported.as_function().unwrap().clone();
        let out = func
            .call(vec![Value::from(json!({"x": 2, "y": 3}))])
            .unwrap();
        assert_eq!(out, Value::Number(5.0));
    }

    #[test]
    fn test_executions_release_the_tree() {
        let rt = runtime();
        let executor = executor(&rt, Arc::new(ScriptBackend::default()));
        let main = node(
            "defs_main",
            "exports = fn main({ a }) {\n    let twice = fn(v) { return add({ x: v, y: v }); };\n    return twice(a);\n};\n",
            numbers(&["a"]),
            TypeTag::Number,
            vec![("add", adder())],
        );
        let baseline = Arc::strong_count(&executor.inner);

        for a in 0..10 {
            let out = executor
                .execute(main.clone(), Value::from(json!({"a": a})), ExecuteOptions::checked())
                .unwrap();
            assert_eq!(out, Value::Number(2.0 * a as f64));
        }
        assert_eq!(Arc::strong_count(&executor.inner), baseline);

        // An exported function keeps its bindings until it is dropped
        let exported = executor
            .execute(main, Value::Null, ExecuteOptions::default().exported())
            .unwrap();
        assert!(Arc::strong_count(&executor.inner) > baseline);
        let out = exported
            .as_function()
            .unwrap()
            .call(vec![Value::from(json!({"a": 4}))])
            .unwrap();
        assert_eq!(out, Value::Number(8.0));
        drop(exported);
        assert_eq!(Arc::strong_count(&executor.inner), baseline);
    }

    #[test]
    fn test_execution_depth_limit() {
        let rt = runtime();
        let store = DefinitionStore::new(Arc::new(MemoryStorage::new()));
        let executor = Executor::new(
            Arc::new(ScriptBackend::default()),
            Resolver::new(store, ResolverConfig::default()),
            rt.handle().clone(),
            &ExecutionConfig {
                max_depth: 2,
                ..ExecutionConfig::default()
            },
        );

        let leaf = node("defs_leaf", "exports = fn() {\n    return 1;\n};\n", None, TypeTag::Number, vec![]);
        let middle = node(
            "defs_middle",
            "exports = fn() {\n    return leaf();\n};\n",
            None,
            TypeTag::Number,
            vec![("leaf", leaf)],
        );
        assert_eq!(
            executor
                .execute(middle.clone(), Value::Null, ExecuteOptions::default())
                .unwrap(),
            Value::Number(1.0)
        );

        let top = node(
            "defs_top",
            "exports = fn() {\n    return middle();\n};\n",
            None,
            TypeTag::Number,
            vec![("middle", middle)],
        );
        let err = executor
            .execute(top, Value::Null, ExecuteOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Execution(ExecutionError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_require_rejects_non_string_tokens() {
        let rt = runtime();
        let executor = executor(&rt, Arc::new(ScriptBackend::default()));
        let main = node(
            "defs_main",
            "exports = fn main() {\n    return require(42);\n};\n",
            None,
            TypeTag::Null,
            vec![],
        );

        let err = executor
            .execute(main, Value::Null, ExecuteOptions::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Execution error: Script error: require expects a name or def id, got number"
        );
    }
}
