//! End-to-end tests for the defs runtime.

use std::sync::Arc;

use defs_core::error::{CanonicalError, ContractError, Error, ExecutionError, ResolveError, StoreError};
use defs_core::types::{Definition, TypeTag, Value};
use defs_core::DefId;
use defs_isolation::ScriptBackend;
use defs_runtime::system::config::ResolverConfig;
use defs_runtime::{ExecuteOptions, NewFunction, Runtime, RuntimeConfig};
use defs_store::{MemoryStorage, NewDefinition};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

// Initialize tracing for tests
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default()).unwrap()
}

const ADDER: &str = r#"
/**
 * This function adds two numbers
 */
export default fn adder({ x, y }) {
    return x + y;
}
"#;

const STRINGIFY: &str = r#"
/**
 * This is a function that is resolved dynamically
 */
export default fn stringify(args) {
    return json(args)
}
"#;

fn adder() -> NewFunction {
    NewFunction::new(ADDER, TypeTag::Number)
        .arg("x", TypeTag::Number)
        .arg("y", TypeTag::Number)
}

fn main_source(adder: &DefId, stringify: &str) -> String {
    format!(
        r#"
import adder from '{adder}';

/**
 * This is the main entrypoint to the program
 */
export default fn main() {{
    const result = adder({{ x: 1, y: 2 }})
    const stringify = import('{stringify}')

    return stringify({{ result }})
}}
"#
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_end_to_end_program() {
    init_tracing();
    let runtime = runtime();

    let adder = runtime.create_fn(adder()).await.unwrap();
    let stringify = runtime
        .create_fn(NewFunction::new(STRINGIFY, TypeTag::String))
        .await
        .unwrap();
    let main = runtime
        .create_fn(NewFunction::new(
            main_source(&adder, stringify.as_str()),
            TypeTag::String,
        ))
        .await
        .unwrap();
    info!(%adder, %stringify, %main, "Created program");

    for options in [ExecuteOptions::default(), ExecuteOptions::checked()] {
        let context = runtime.resolve(&main).await.unwrap();
        let out = runtime.execute(context, Value::Null, options).await.unwrap();
        assert_eq!(out, Value::from(r#"{"result":3}"#));
    }

    // the dynamic import also works by name
    let by_name = runtime
        .create_fn(NewFunction::new(main_source(&adder, "stringify"), TypeTag::String))
        .await
        .unwrap();
    let out = runtime
        .run(by_name.as_str(), Value::Null, ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(out, Value::from(r#"{"result":3}"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_is_deterministic() {
    let runtime = runtime();

    let first = runtime.create_fn(adder()).await.unwrap();
    let second = runtime.create_fn(adder()).await.unwrap();
    assert_eq!(first, second);

    // layout and plain comments are not part of the identity
    let reformatted = NewFunction {
        implementation: "/**\n * This function adds two numbers\n */\nexport default fn adder({x,y}){return x+y} // sum"
            .to_string(),
        ..adder()
    };
    assert_eq!(runtime.create_fn(reformatted).await.unwrap(), first);

    assert_eq!(runtime.resolve_token("adder").await.unwrap(), first);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requires_collide_on_one_id() {
    let runtime = runtime();
    let one = runtime
        .create_fn(NewFunction::new("export default fn one() { return 1 }", TypeTag::Number))
        .await
        .unwrap();
    let other_one = runtime
        .create_fn(NewFunction::new(
            "export default fn other() { return 1 }",
            TypeTag::Number,
        ))
        .await
        .unwrap();

    let caller = |source: &DefId| {
        NewFunction::new(
            format!("import dep from \"{}\";\nexport default fn caller() {{ return dep() }}", source),
            TypeTag::Number,
        )
    };

    let first = runtime.create_fn(caller(&one)).await.unwrap();
    let second = runtime.create_fn(caller(&other_one)).await.unwrap();
    assert_eq!(first, second);

    let Definition::Function(stored) = runtime.get(&first).await.unwrap() else {
        panic!("expected a function definition");
    };
    assert_eq!(stored.requires["dep"], other_one);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resolve_round_trip_and_completeness() {
    let runtime = runtime();
    let adder = runtime.create_fn(adder()).await.unwrap();
    let twice = runtime
        .create_fn(
            NewFunction::new(
                "import add from \"adder\";\nimport plus from \"adder\";\nexport default fn twice({ n }) { return plus({ x: add({ x: n, y: n }), y: 0 }) }",
                TypeTag::Number,
            )
            .arg("n", TypeTag::Number),
        )
        .await
        .unwrap();

    let tree = runtime.resolve(&twice).await.unwrap();
    assert_eq!(Definition::Function(tree.definition.clone()), runtime.get(&twice).await.unwrap());

    for dependency in tree.definition.requires.values() {
        assert_eq!(tree.subtree[dependency].definition.id, *dependency);
    }
    assert_eq!(tree.definition.requires["add"], adder);

    let out = runtime
        .execute(tree, Value::from(json!({"n": 4})), ExecuteOptions::checked())
        .await
        .unwrap();
    assert_eq!(out, Value::Number(8.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_type_checks_are_opt_in() {
    let runtime = runtime();
    let adder = runtime.create_fn(adder()).await.unwrap();
    let main = runtime
        .create_fn(NewFunction::new(
            format!(
                "import adder from \"{}\";\nexport default fn main() {{ return adder({{ x: 1, y: \"2\" }}) }}",
                adder
            ),
            TypeTag::String,
        ))
        .await
        .unwrap();

    let err = runtime
        .run(main.as_str(), Value::Null, ExecuteOptions::checked())
        .await
        .unwrap_err();
    match err {
        Error::ArgumentType { id, source } => {
            assert_eq!(id, adder);
            assert_eq!(
                source,
                ContractError::TypeMismatch {
                    key: Some("y".into()),
                    expected: TypeTag::Number,
                    actual: TypeTag::String,
                }
            );
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let out = runtime
        .run(main.as_str(), Value::Null, ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(out, Value::from("12"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_dependency_is_reported_by_id() {
    let runtime = runtime();
    let ghost = "defs_doesNotExist";
    let main = runtime
        .create_fn(NewFunction::new(
            format!("import ghost from \"{}\";\nexport default fn main() {{ return ghost() }}", ghost),
            TypeTag::Null,
        ))
        .await
        .unwrap();

    let err = runtime.resolve(&main).await.unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::NotFound(ref id)) if id == ghost));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_self_cycle_exhausts_resolution_depth() {
    let config = RuntimeConfig {
        resolver: ResolverConfig { max_depth: 16 },
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::with_backends(
        config,
        Arc::new(MemoryStorage::new()),
        Arc::new(ScriptBackend::default()),
    )
    .unwrap();

    // a content id cannot name itself, so the cycle is written directly
    let id = DefId::parse("defs_ouroboros").unwrap();
    let mut def = NewDefinition::new("exports = fn() {\n    return self();\n};\n", TypeTag::Null);
    def.requires.insert("self".into(), id.clone());
    let created = runtime.store().create(def).await.unwrap();
    let Definition::Function(mut record) = runtime.get(&created).await.unwrap() else {
        panic!("expected a function definition");
    };
    record.id = id.clone();
    runtime.store().put(&id, &record.into()).await.unwrap();

    let err = runtime.resolve(&id).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Resolve(ResolveError::DepthExhausted { depth: 16, ref id }) if id.as_str() == "defs_ouroboros"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_name_imports_are_pinned_at_creation() {
    let runtime = runtime();
    let v1 = runtime
        .create_fn(NewFunction::new("export default fn version() { return 1 }", TypeTag::Number))
        .await
        .unwrap();
    let main = runtime
        .create_fn(NewFunction::new(
            "import version from \"version\";\nexport default fn main() { return version() }",
            TypeTag::Number,
        ))
        .await
        .unwrap();

    // a new definition takes over the alias
    let v2 = runtime
        .create_fn(NewFunction::new("export default fn version() { return 2 }", TypeTag::Number))
        .await
        .unwrap();
    assert_ne!(v1, v2);
    assert_eq!(runtime.resolve_token("version").await.unwrap(), v2);

    let out = runtime
        .run(main.as_str(), Value::Null, ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(out, Value::Number(1.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_sources_write_nothing() {
    let runtime = runtime();

    let err = runtime
        .create_fn(NewFunction {
            strict: Some(true),
            ..NewFunction::new(
                "import adder from \"adder\";\nexport default fn f() { return 1 }",
                TypeTag::Number,
            )
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Canonical(CanonicalError::InvalidDependencySource(_))
    ));

    let err = runtime
        .create_fn(NewFunction::new(
            "import nothing from \"nowhere\";\nexport default fn f() { return 1 }",
            TypeTag::Number,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::NotFound(ref name)) if name == "nowhere"));

    let err = runtime
        .create_fn(NewFunction::new("fn f() {}", TypeTag::Null))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Canonical(CanonicalError::MissingDefaultExport)));

    assert!(runtime.store().ids().await.unwrap().is_empty());
    assert!(runtime.names().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_payload_errors_keep_their_message() {
    let runtime = runtime();
    let failing = runtime
        .create_fn(NewFunction::new(
            "export default fn failing() { throw \"payload said no\" }",
            TypeTag::Null,
        ))
        .await
        .unwrap();
    let caller = runtime
        .create_fn(NewFunction::new(
            "import failing from \"failing\";\nexport default fn caller() { return failing() }",
            TypeTag::Null,
        ))
        .await
        .unwrap();

    for token in [failing.as_str(), caller.as_str()] {
        let err = runtime
            .run(token, Value::Null, ExecuteOptions::default())
            .await
            .unwrap_err();
        match err {
            Error::Execution(ExecutionError::Raised(message)) => {
                assert_eq!(message, "payload said no")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_escaping_closures_stay_callable() {
    let runtime = runtime();
    let counter = runtime
        .create_fn(NewFunction::new(
            r#"
export default fn counter({ start }) {
    let n = start
    return fn() {
        n = n + 1
        return n
    }
}
"#,
            TypeTag::Function,
        )
        .arg("start", TypeTag::Number))
        .await
        .unwrap();

    let out = runtime
        .run(
            counter.as_str(),
            Value::from(json!({"start": 10})),
            ExecuteOptions::checked(),
        )
        .await
        .unwrap();
    let tick = out.as_function().unwrap().clone();

    let values = tokio::task::spawn_blocking(move || {
        (tick.call(vec![]).unwrap(), tick.call(vec![]).unwrap())
    })
    .await
    .unwrap();
    assert_eq!(values, (Value::Number(11.0), Value::Number(12.0)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_backed_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig::default().with_file_storage(dir.path());

    let id = {
        let runtime = Runtime::new(config.clone()).unwrap();
        runtime.create_fn(adder()).await.unwrap()
    };

    let runtime = Runtime::new(config).unwrap();
    assert_eq!(runtime.resolve_token("adder").await.unwrap(), id);
    let out = runtime
        .run("adder", Value::from(json!({"x": 20, "y": 22})), ExecuteOptions::checked())
        .await
        .unwrap();
    assert_eq!(out, Value::Number(42.0));
}

const COUNTDOWN: &str = r#"
export default fn countdown({ n }) {
    fn r(k) {
        return k == 0 ? 0 : 1 + r(k - 1)
    }
    return r(n)
}
"#;

fn is_exhausted(err: &Error) -> bool {
    matches!(err, Error::Execution(ExecutionError::ResourceExhausted(_)))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recursion_at_the_default_call_depth() {
    let runtime = runtime();
    let id = runtime
        .create_fn(NewFunction::new(COUNTDOWN, TypeTag::Number).arg("n", TypeTag::Number))
        .await
        .unwrap();

    let out = runtime
        .run(id.as_str(), Value::from(json!({"n": 120})), ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(out, Value::Number(120.0));

    let err = runtime
        .run(id.as_str(), Value::from(json!({"n": 200})), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(is_exhausted(&err), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dependencies_share_the_call_depth() {
    let runtime = runtime();
    let inner = runtime
        .create_fn(NewFunction::new(COUNTDOWN, TypeTag::Number).arg("n", TypeTag::Number))
        .await
        .unwrap();
    let outer = runtime
        .create_fn(
            NewFunction::new(
                format!(
                    r#"
import countdown from '{inner}';

export default fn outer({{ n }}) {{
    fn r(k) {{
        return k == 0 ? countdown({{ n }}) : 1 + r(k - 1)
    }}
    return r(n)
}}
"#
                ),
                TypeTag::Number,
            )
            .arg("n", TypeTag::Number),
        )
        .await
        .unwrap();

    let out = runtime
        .run(outer.as_str(), Value::from(json!({"n": 50})), ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(out, Value::Number(100.0));

    // Each half fits on its own; together they pass the limit
    let err = runtime
        .run(outer.as_str(), Value::from(json!({"n": 100})), ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(is_exhausted(&err), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deep_frames_fit_the_execution_stack() {
    let runtime = runtime();
    let step = format!("{}1 + r(k - 1){}", "-(".repeat(40), ")".repeat(40));
    let id = runtime
        .create_fn(
            NewFunction::new(
                format!(
                    "export default fn deep({{ n }}) {{\n    fn r(k) {{\n        return k == 0 ? 0 : {step}\n    }}\n    return r(n)\n}}\n"
                ),
                TypeTag::Number,
            )
            .arg("n", TypeTag::Number),
        )
        .await
        .unwrap();

    let out = runtime
        .run(id.as_str(), Value::from(json!({"n": 120})), ExecuteOptions::default())
        .await
        .unwrap();
    assert_eq!(out, Value::Number(120.0));
}
