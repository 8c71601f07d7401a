//! Runtime values.
//!
//! `Value` is what flows across the isolation boundary: arguments going in,
//! results coming out, and the callables the host hands to a payload. The
//! data part maps one-to-one onto JSON; functions are opaque handles.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::{Callable, NativeFunction};

/// An ordered string-keyed record.
pub type Object = IndexMap<String, Value>;

/// The runtime primitive type of a value.
///
/// Declared argument and output types use the same tags, so a type contract
/// is just an equality check between a declared tag and [`Value::type_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// The absent value
    Null,

    /// `true` or `false`
    Boolean,

    /// A double-precision number
    Number,

    /// A UTF-8 string
    String,

    /// An ordered list
    Array,

    /// A string-keyed record
    Object,

    /// Something that can be called
    Function,
}

impl TypeTag {
    /// Get the name of this tag as it appears in declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "null" => Ok(Self::Null),
            "boolean" => Ok(Self::Boolean),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            "function" => Ok(Self::Function),
            other => Err(format!("Unknown type tag: {}", other)),
        }
    }
}

/// A callable handle.
///
/// Cloning a `Function` clones the handle, not the callable behind it.
#[derive(Clone)]
pub struct Function(Arc<dyn Callable>);

impl Function {
    /// Wrap a callable.
    pub fn new(callable: impl Callable + 'static) -> Self {
        Self(Arc::new(callable))
    }

    /// Wrap a host closure under the given name.
    pub fn native<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(NativeFunction::new(name, f))
    }

    /// The function's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.0.name()
    }

    /// Call the function with positional arguments.
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        self.0.call(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[fn {}]", self.name().unwrap_or("anonymous"))
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

/// A runtime value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// The absent value
    #[default]
    Null,

    /// A boolean
    Bool(bool),

    /// A number
    Number(f64),

    /// A string
    String(String),

    /// A list of values
    Array(Vec<Value>),

    /// A record of values
    Object(Object),

    /// A callable
    Function(Function),
}

impl Value {
    /// Get the runtime primitive type of this value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Null => TypeTag::Null,
            Self::Bool(_) => TypeTag::Boolean,
            Self::Number(_) => TypeTag::Number,
            Self::String(_) => TypeTag::String,
            Self::Array(_) => TypeTag::Array,
            Self::Object(_) => TypeTag::Object,
            Self::Function(_) => TypeTag::Function,
        }
    }

    /// Whether the value counts as true in a condition.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// Build an object value from key/value pairs.
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Borrow the record if this is an object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow the text if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the number if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow the handle if this is a function.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Convert to JSON.
    ///
    /// Integral numbers become JSON integers and non-finite numbers become
    /// `null`. Functions cannot be represented and fail the conversion.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Object(object) => {
                let mut map = serde_json::Map::with_capacity(object.len());
                for (key, value) in object {
                    map.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Self::Function(func) => {
                return Err(Error::Serialization(format!(
                    "{:?} cannot be represented as JSON",
                    func
                )))
            }
        })
    }

    /// Convert to compact JSON text.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Format a number the way the payload language prints it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Self::Function(func)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::Function(func) => write!(f, "{:?}", func),
            Self::Array(_) | Self::Object(_) => match self.to_json_string() {
                Ok(text) => f.write_str(&text),
                Err(_) => f.write_str(if matches!(self, Self::Array(_)) {
                    "[array]"
                } else {
                    "[object]"
                }),
            },
        }
    }
}
