//! Pure functions available to every body.
//!
//! Intrinsics are only consulted when a name is not bound in scope, so a
//! binding or local variable of the same name shadows them.

use defs_core::types::{Function, Value};

use super::script_error;

pub(crate) fn lookup(name: &str) -> Option<Function> {
    let func = match name {
        "json" => Function::native("json", |args| {
            let value = args.into_iter().next().unwrap_or_default();
            Ok(Value::String(value.to_json_string()?))
        }),
        "len" => Function::native("len", |args| {
            let len = match args.first() {
                Some(Value::String(s)) => s.chars().count(),
                Some(Value::Array(items)) => items.len(),
                Some(Value::Object(object)) => object.len(),
                other => {
                    return Err(script_error(format!(
                        "len() expects a string, array or object, got {}",
                        other.map_or("nothing".to_string(), |v| v.type_tag().to_string())
                    )))
                }
            };
            Ok(Value::Number(len as f64))
        }),
        "keys" => Function::native("keys", |args| match args.first() {
            Some(Value::Object(object)) => Ok(Value::Array(
                object.keys().map(|k| Value::String(k.clone())).collect(),
            )),
            _ => Err(script_error("keys() expects an object")),
        }),
        "string" => Function::native("string", |args| {
            let value = args.into_iter().next().unwrap_or_default();
            Ok(Value::String(value.to_string()))
        }),
        _ => return None,
    };
    Some(func)
}
