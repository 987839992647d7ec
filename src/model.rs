//! The model contract
//!
//! The capability set a type must satisfy to participate in statement
//! building: a fixed table name, a stable field enumeration, and per-field
//! read/write access through the dynamic [`Value`] carrier. Implementing the
//! contract explicitly keeps the field→column mapping in code the model
//! author controls and statically checkable.

use crate::error::{Result, RowMapError};
use crate::types::Value;

/// A persistable table model.
///
/// The ordering returned by [`fields`](Model::fields) must be stable across
/// calls for a given concrete type so that column lists and value lists stay
/// index-aligned. Read operations scan into the model in place; multi-row
/// reads clone the model once per result row.
///
/// ```
/// use rowmap::{Model, Result, RowMapError, Value};
///
/// #[derive(Debug, Clone, Default)]
/// struct Account {
///     id: i64,
///     email: String,
/// }
///
/// impl Model for Account {
///     fn table_name(&self) -> &'static str {
///         "account"
///     }
///
///     fn fields(&self) -> Vec<&'static str> {
///         vec!["id", "email"]
///     }
///
///     fn value(&self, field: &str) -> Option<Value> {
///         match field {
///             "id" => Some(self.id.into()),
///             "email" => Some(self.email.as_str().into()),
///             _ => None,
///         }
///     }
///
///     fn set_value(&mut self, field: &str, value: Value) -> Result<()> {
///         match field {
///             "id" => self.id = value.try_into()?,
///             "email" => self.email = value.try_into()?,
///             _ => return Err(RowMapError::reflection(format!("unknown field '{field}'"))),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Model: Clone {
    /// Table this model persists to
    fn table_name(&self) -> &'static str;

    /// Persistable field names, in a fixed, deterministic order
    fn fields(&self) -> Vec<&'static str>;

    /// Current value of `field`, or `None` when the field is unknown
    fn value(&self, field: &str) -> Option<Value>;

    /// Scan `value` into `field`'s storage
    fn set_value(&mut self, field: &str, value: Value) -> Result<()>;

    /// Resolve the subset of `names` that exist on this model, aligned with
    /// their current values.
    ///
    /// Unknown names are silently dropped. A field that is listed by
    /// [`fields`](Model::fields) but yields no value is an inconsistent
    /// implementation and fails with a reflection error.
    fn field_values(&self, names: &[&str]) -> Result<(Vec<&'static str>, Vec<Value>)> {
        let fields = self.fields();
        let mut cols = Vec::with_capacity(names.len());
        let mut values = Vec::with_capacity(names.len());
        for &name in names {
            let Some(&field) = fields.iter().find(|&&f| f == name) else {
                continue;
            };
            let value = self.value(field).ok_or_else(|| {
                RowMapError::reflection(format!("field '{field}' has no readable value"))
            })?;
            cols.push(field);
            values.push(value);
        }
        Ok((cols, values))
    }
}
