//! Core value and clause types for statement building
//!
//! `Value` is the dynamic carrier every statement binds and every row scan
//! produces. Richer SQL types (timestamps, uuids, json) travel as `Text`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RowMapError;

/// A dynamically typed value bound into or scanned out of a SQL statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the carried type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOL",
            Self::Int(_) => "INT",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Blob(_) => "BLOB",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    fn conversion_error(&self, wanted: &str) -> RowMapError {
        RowMapError::reflection(format!("cannot read {} as {}", self.type_name(), wanted))
    }
}

// ---------------------------------------------------------------------------
// Conversions into Value
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Blob(value.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Text(value.to_rfc3339())
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions out of Value
// ---------------------------------------------------------------------------

impl TryFrom<Value> for i64 {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(other.conversion_error("i64")),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(n) => i32::try_from(n)
                .map_err(|_| RowMapError::reflection(format!("value {n} out of range for i32"))),
            other => Err(other.conversion_error("i32")),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as f64),
            other => Err(other.conversion_error("f64")),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(b),
            // SQLite reports booleans through integer affinity
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => Err(other.conversion_error("bool")),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other.conversion_error("String")),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Blob(b) => Ok(b),
            other => Err(other.conversion_error("Vec<u8>")),
        }
    }
}

impl TryFrom<Value> for DateTime<Utc> {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RowMapError::reflection(format!("invalid timestamp '{s}': {e}"))),
            other => Err(other.conversion_error("DateTime<Utc>")),
        }
    }
}

impl TryFrom<Value> for Uuid {
    type Error = RowMapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Uuid::parse_str(&s)
                .map_err(|e| RowMapError::reflection(format!("invalid uuid '{s}': {e}"))),
            other => Err(other.conversion_error("Uuid")),
        }
    }
}

// A blanket impl over `T: TryFrom<Value>` would collide with the standard
// library's `From<T> for Option<T>`, so nullable targets are enumerated.
macro_rules! value_try_into_option {
    ($($t:ty),*) => {
        $(impl TryFrom<Value> for Option<$t> {
            type Error = RowMapError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::Null => Ok(None),
                    other => <$t>::try_from(other).map(Some),
                }
            }
        })*
    };
}

value_try_into_option!(i64, i32, f64, bool, String, Vec<u8>, DateTime<Utc>, Uuid);

// ---------------------------------------------------------------------------
// Clause types
// ---------------------------------------------------------------------------

/// Post-conflict directive for an insert.
///
/// `clause` is the raw fragment following `ON` (e.g. `CONFLICT(id)` or
/// `CONFLICT(id) DO NOTHING`). When `upsert_columns` is set, the statement
/// builder appends `DO UPDATE SET` assignments built from those columns and
/// binds their current model values after the insert values. Otherwise any
/// `arguments` are appended verbatim for placeholders inside the fragment.
/// Upsert columns and raw arguments are mutually exclusive in effect.
#[derive(Debug, Clone, Default)]
pub struct On {
    pub clause: String,
    pub upsert_columns: Vec<String>,
    pub arguments: Vec<Value>,
}

impl On {
    /// No conflict handling: a plain insert
    pub fn none() -> Self {
        Self::default()
    }

    /// A bare conflict fragment, e.g. `CONFLICT(id) DO NOTHING`
    pub fn conflict(clause: impl Into<String>) -> Self {
        Self {
            clause: clause.into(),
            ..Self::default()
        }
    }

    /// Conflict target plus the columns to rewrite from the model's current
    /// values, e.g. `On::upsert("CONFLICT(id)", &["email", "name"])`
    pub fn upsert(clause: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            clause: clause.into(),
            upsert_columns: columns.iter().map(|c| c.to_string()).collect(),
            arguments: Vec::new(),
        }
    }

    /// Conflict fragment carrying its own placeholders and their arguments
    pub fn with_arguments(clause: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            upsert_columns: Vec::new(),
            arguments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

/// A raw boolean fragment and its bound arguments.
///
/// Fragments are written with `?` placeholders regardless of dialect; the
/// statement builder renumbers them for PostgreSQL. The placeholder count
/// must match the argument count; this is not validated.
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    pub clause: String,
    pub arguments: Vec<Value>,
}

impl WhereClause {
    pub fn new(clause: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Value Conversion Tests
    // =========================================================================

    #[test]
    fn test_value_from_scalars() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42u16), Value::Int(42));
        assert_eq!(Value::from(1.5f64), Value::Float(1.5));
        assert_eq!(Value::from("abc"), Value::Text("abc".to_string()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Blob(vec![1, 2]));
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Int(7));
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(Value::from(serde_json::json!(null)), Value::Null);
        assert_eq!(Value::from(serde_json::json!(3)), Value::Int(3));
        assert_eq!(Value::from(serde_json::json!(2.5)), Value::Float(2.5));
        assert_eq!(
            Value::from(serde_json::json!("x")),
            Value::Text("x".to_string())
        );
    }

    #[test]
    fn test_value_try_into_scalars() {
        assert_eq!(i64::try_from(Value::Int(9)).unwrap(), 9);
        assert_eq!(i32::try_from(Value::Int(9)).unwrap(), 9);
        assert_eq!(f64::try_from(Value::Int(2)).unwrap(), 2.0);
        assert_eq!(String::try_from(Value::Text("a".into())).unwrap(), "a");
        assert!(i64::try_from(Value::Text("a".into())).is_err());
    }

    #[test]
    fn test_value_try_into_bool_accepts_integer_affinity() {
        assert!(bool::try_from(Value::Bool(true)).unwrap());
        assert!(!bool::try_from(Value::Int(0)).unwrap());
        assert!(bool::try_from(Value::Int(1)).unwrap());
        assert!(bool::try_from(Value::Int(2)).is_err());
    }

    #[test]
    fn test_value_try_into_option() {
        let none: Option<i64> = Value::Null.try_into().unwrap();
        assert_eq!(none, None);
        let some: Option<i64> = Value::Int(4).try_into().unwrap();
        assert_eq!(some, Some(4));
    }

    #[test]
    fn test_value_timestamp_round_trip() {
        let now = Utc::now();
        let value = Value::from(now);
        let back = DateTime::<Utc>::try_from(value).unwrap();
        assert_eq!(back, now);
    }

    #[test]
    fn test_value_uuid_round_trip() {
        let id = Uuid::new_v4();
        let back = Uuid::try_from(Value::from(id)).unwrap();
        assert_eq!(back, id);
    }

    // =========================================================================
    // Clause Tests
    // =========================================================================

    #[test]
    fn test_on_constructors() {
        assert!(On::none().is_empty());

        let bare = On::conflict("CONFLICT(id) DO NOTHING");
        assert!(!bare.is_empty());
        assert!(bare.upsert_columns.is_empty());
        assert!(bare.arguments.is_empty());

        let upsert = On::upsert("CONFLICT(id)", &["email", "name"]);
        assert_eq!(upsert.upsert_columns, vec!["email", "name"]);

        let with_args = On::with_arguments("CONFLICT(id) DO UPDATE SET name=?", vec!["n".into()]);
        assert_eq!(with_args.arguments.len(), 1);
    }

    #[test]
    fn test_where_clause_new() {
        let wc = WhereClause::new("id=?", vec![Value::Int(1)]);
        assert_eq!(wc.clause, "id=?");
        assert_eq!(wc.arguments, vec![Value::Int(1)]);
    }
}
