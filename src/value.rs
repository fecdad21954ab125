//! Dynamic value type for deferred-call arguments.
//!
//! A [`Value`] is what producers hand to the queue and what receivers get
//! back at dispatch time. Values are moved into the message buffer when a
//! record is encoded and dropped exactly once when the record is destroyed,
//! so every variant owns its payload outright.
//!
//! The `Opaque` variant carries an arbitrary shared host object; it is the
//! escape hatch for arguments that have no data representation (handles,
//! resources, callbacks). Opaque values compare by identity and are not
//! representable as JSON.

use serde_json::Value as JsonValue;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Dynamic argument value for deferred calls, sets and notifications.
#[derive(Clone)]
pub enum Value {
    /// Absence of a value.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Owned string.
    Str(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed map of values.
    Map(BTreeMap<String, Value>),
    /// Shared reference to an arbitrary host object.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Create a nil value.
    #[must_use]
    pub const fn nil() -> Self {
        Self::Nil
    }

    /// Create a boolean value.
    #[must_use]
    pub const fn bool(v: bool) -> Self {
        Self::Bool(v)
    }

    /// Create an integer value.
    #[must_use]
    pub const fn int(v: i64) -> Self {
        Self::Int(v)
    }

    /// Create a floating-point value.
    #[must_use]
    pub const fn float(v: f64) -> Self {
        Self::Float(v)
    }

    /// Create a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self::Str(v.into())
    }

    /// Create a list value.
    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(items)
    }

    /// Create a shared opaque value.
    #[must_use]
    pub fn opaque(object: Arc<dyn Any + Send + Sync>) -> Self {
        Self::Opaque(object)
    }

    /// Check if the value is nil.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Convert to bool if possible.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to i64 if possible.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f64 if possible. Integers are promoted.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Borrow as a string slice if possible.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as a list if possible.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as a map if possible.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Downcast an opaque value to a concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics and error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Build a value from a JSON tree.
    ///
    /// Numbers become `Int` when they fit an i64 and `Float` otherwise.
    #[must_use]
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Nil,
            JsonValue::Bool(v) => Self::Bool(v),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Nil),
            JsonValue::String(s) => Self::Str(s),
            JsonValue::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            JsonValue::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to a JSON tree.
    ///
    /// Returns `None` when the value (or any nested value) is `Opaque`, and
    /// maps non-finite floats to JSON null.
    #[must_use]
    pub fn to_json(&self) -> Option<JsonValue> {
        match self {
            Self::Nil => Some(JsonValue::Null),
            Self::Bool(v) => Some(JsonValue::Bool(*v)),
            Self::Int(v) => Some(JsonValue::Number((*v).into())),
            Self::Float(v) => Some(
                serde_json::Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
            ),
            Self::Str(v) => Some(JsonValue::String(v.clone())),
            Self::List(items) => items
                .iter()
                .map(Self::to_json)
                .collect::<Option<Vec<_>>>()
                .map(JsonValue::Array),
            Self::Map(map) => map
                .iter()
                .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(JsonValue::Object),
            Self::Opaque(_) => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Nil
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            // Opaque values have no data representation; identity is equality.
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::List(v) => f.debug_tuple("List").field(v).finish(),
            Self::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Self::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn value_is_send_sync() {
        _assert_send_sync::<Value>();
    }

    #[test]
    fn accessors_match_variants() {
        assert!(Value::nil().is_nil());
        assert_eq!(Value::bool(true).as_bool(), Some(true));
        assert_eq!(Value::int(-4).as_i64(), Some(-4));
        assert_eq!(Value::float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::string("hi").as_str(), Some("hi"));
        assert_eq!(Value::int(3).as_f64(), Some(3.0));
        assert_eq!(Value::string("no").as_i64(), None);
    }

    #[test]
    fn json_round_trip() {
        let json = json!({
            "name": "probe",
            "score": 0.25,
            "count": 3,
            "tags": ["a", "b"],
            "enabled": true,
            "extra": null
        });

        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), Some(json));
    }

    #[test]
    fn large_numbers_become_floats() {
        let value = Value::from_json(json!(1e300));
        assert_eq!(value.as_f64(), Some(1e300));
    }

    #[test]
    fn opaque_is_not_json_representable() {
        let value = Value::opaque(Arc::new(7u32));
        assert_eq!(value.to_json(), None);

        let nested = Value::list(vec![Value::int(1), Value::opaque(Arc::new(()))]);
        assert_eq!(nested.to_json(), None);
    }

    #[test]
    fn opaque_compares_by_identity() {
        let a: Arc<dyn std::any::Any + Send + Sync> = Arc::new(5u8);
        let first = Value::opaque(a.clone());
        let same = Value::opaque(a);
        let other = Value::opaque(Arc::new(5u8));

        assert_eq!(first, same);
        assert_ne!(first, other);
    }

    #[test]
    fn opaque_downcast() {
        let value = Value::opaque(Arc::new(String::from("payload")));
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("payload"));
        assert!(value.downcast_ref::<u32>().is_none());
        assert!(Value::int(1).downcast_ref::<i64>().is_none());
    }
}
