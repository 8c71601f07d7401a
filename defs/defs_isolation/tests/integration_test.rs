//! Integration tests for defs_isolation.

use defs_core::error::{Error, ExecutionError, StoreError};
use defs_core::types::{BindingTable, EvalMode, Function, Value};
use defs_core::IsolationBackend;
use defs_isolation::*;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

// Initialize tracing for tests
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn args(value: serde_json::Value) -> BindingTable {
    BindingTable::new(Value::from(value))
}

const ADDER: &str = "exports = fn adder({ x, y }) {\n    return x + y;\n};\n";

#[test]
fn test_invoke_exported_function() {
    init_tracing();
    let backend = ScriptBackend::default();

    let result = backend
        .evaluate(ADDER, args(json!({"x": 1, "y": 2})), EvalMode::Invoke)
        .unwrap();
    info!(?result, "adder evaluated");

    assert_eq!(result, Value::Number(3.0));
}

#[test]
fn test_export_mode_returns_callable() {
    init_tracing();
    let backend = ScriptBackend::default();
    let body = "
        fn helper(v) { return v * 10; }
        exports = fn scale(n) { return helper(n); };
    ";

    let exported = backend
        .evaluate(body, args(json!(null)), EvalMode::Export)
        .unwrap();
    let func = exported.as_function().expect("exported a function");

    assert_eq!(func.name(), Some("scale"));
    assert_eq!(func.call(vec![Value::from(4.0)]).unwrap(), Value::Number(40.0));
}

#[test]
fn test_bindings_are_the_only_capabilities() {
    init_tracing();
    let backend = ScriptBackend::default();

    for name in ["process", "globalThis", "require", "fetch"] {
        let body = format!("exports = fn peek() {{ return {}; }};", name);
        let err = backend
            .evaluate(&body, args(json!(null)), EvalMode::Invoke)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Execution error: Script error: {} is not defined", name)
        );
    }
}

#[test]
fn test_host_bindings_are_called() {
    init_tracing();
    let backend = ScriptBackend::default();
    let mut bindings = args(json!({"x": 2}));
    bindings.bind(
        "double",
        Value::Function(Function::native("double", |args| {
            let n = args
                .first()
                .and_then(Value::as_object)
                .and_then(|o| o.get("n"))
                .and_then(Value::as_number)
                .unwrap_or(0.0);
            Ok(Value::Number(n * 2.0))
        })),
    );

    let body = "exports = fn main({ x }) { return { result: double({ n: x }) }; };";
    let result = backend.evaluate(body, bindings, EvalMode::Invoke).unwrap();

    assert_eq!(result.to_json().unwrap(), json!({"result": 4}));
}

#[test]
fn test_host_errors_pass_through_unchanged() {
    init_tracing();
    let backend = ScriptBackend::default();
    let mut bindings = args(json!(null));
    bindings.bind(
        "missing",
        Value::Function(Function::native("missing", |_| {
            Err(StoreError::NotFound("defs_gone".into()).into())
        })),
    );

    let err = backend
        .evaluate(
            "exports = fn main() { return missing(); };",
            bindings,
            EvalMode::Invoke,
        )
        .unwrap_err();

    assert!(matches!(err, Error::Store(StoreError::NotFound(ref id)) if id == "defs_gone"));
}

#[test]
fn test_thrown_values_raise() {
    init_tracing();
    let backend = ScriptBackend::default();

    let err = backend
        .evaluate(
            "exports = fn main() { throw \"bad input\"; };",
            args(json!(null)),
            EvalMode::Invoke,
        )
        .unwrap_err();

    assert!(matches!(err, Error::Execution(ExecutionError::Raised(ref m)) if m == "bad input"));
    assert_eq!(err.to_string(), "Execution error: bad input");
}

#[test]
fn test_intrinsics() {
    init_tracing();
    let backend = ScriptBackend::default();
    let body = "exports = fn main(args) { return json(args) + \":\" + string(len(keys(args))); };";

    let result = backend
        .evaluate(body, args(json!({"result": 3})), EvalMode::Invoke)
        .unwrap();

    assert_eq!(result, Value::from(r#"{"result":3}:1"#));
}

#[test]
fn test_call_depth_limit() {
    init_tracing();
    let backend = ScriptBackend::new(ExecutionLimits::new(16, None));
    let body = "exports = fn forever(n) { return forever(n + 1); };";

    let err = backend
        .evaluate(body, args(json!(0)), EvalMode::Invoke)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Execution(ExecutionError::ResourceExhausted(_))
    ));
}

#[test]
fn test_operation_limit() {
    init_tracing();
    let backend = ScriptBackend::new(ExecutionLimits::new(16, Some(1_000)));
    let body = "exports = fn spin() { while (true) {} };";

    let err = backend
        .evaluate(body, args(json!(null)), EvalMode::Invoke)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Execution(ExecutionError::ResourceExhausted(_))
    ));
}

#[test]
fn test_syntax_errors_in_bodies() {
    init_tracing();
    let backend = ScriptBackend::default();

    let err = backend
        .evaluate("exports = fn (", args(json!(null)), EvalMode::Invoke)
        .unwrap_err();

    assert!(matches!(err, Error::Execution(ExecutionError::Script(_))));
}

fn counted_binding(token: &Arc<()>) -> Value {
    let token = Arc::clone(token);
    Value::Function(Function::native("counted", move |_| {
        Ok(Value::from(Arc::strong_count(&token) as f64))
    }))
}

#[test]
fn test_invoke_releases_bindings() {
    init_tracing();
    let backend = ScriptBackend::default();
    let token = Arc::new(());
    let body = "
        fn helper() { return counted(); }
        exports = fn main() { return helper(); };
    ";

    for _ in 0..10 {
        let mut bindings = args(json!(null));
        bindings.bind("counted", counted_binding(&token));
        backend.evaluate(body, bindings, EvalMode::Invoke).unwrap();
    }

    assert_eq!(Arc::strong_count(&token), 1);
}

#[test]
fn test_exported_function_keeps_bindings_until_dropped() {
    init_tracing();
    let backend = ScriptBackend::default();
    let token = Arc::new(());
    let mut bindings = args(json!(null));
    bindings.bind("counted", counted_binding(&token));

    let exported = backend
        .evaluate("exports = fn main() { return counted(); };", bindings, EvalMode::Export)
        .unwrap();
    assert_eq!(Arc::strong_count(&token), 2);
    assert_eq!(
        exported.as_function().unwrap().call(vec![]).unwrap(),
        Value::Number(2.0)
    );

    drop(exported);
    assert_eq!(Arc::strong_count(&token), 1);
}

#[test]
fn test_nested_evaluations_share_the_call_depth() {
    init_tracing();
    let backend = ScriptBackend::new(ExecutionLimits::new(20, None));
    let body = "
        fn down(n) { return n == 0 ? inner() : down(n - 1); }
        exports = fn main(n) { return down(n); };
    ";

    let inner_backend = backend.clone();
    let mut bindings = args(json!(12));
    bindings.bind(
        "inner",
        Value::Function(Function::native("inner", move |_| {
            let mut bindings = args(json!(12));
            bindings.bind("inner", Value::Function(Function::native("leaf", |_| Ok(Value::Null))));
            inner_backend.evaluate(
                "fn down(n) { return n == 0 ? inner() : down(n - 1); }\nexports = fn main(n) { return down(n); };",
                bindings,
                EvalMode::Invoke,
            )
        })),
    );

    let err = backend
        .evaluate(body, bindings, EvalMode::Invoke)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Execution(ExecutionError::ResourceExhausted(_))
    ));
    assert_eq!(thread_call_depth(), 0);
}
