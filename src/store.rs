//! Model operations
//!
//! Composes INSERT/UPDATE/DELETE/SELECT/COUNT statement text from a model's
//! field set and dispatches it through the executor. Column selections are
//! applied in model field order; names that do not exist on the model are
//! silently dropped.

use std::collections::HashSet;

use crate::db::Database;
use crate::error::{BatchError, Result, RowMapError};
use crate::model::Model;
use crate::sql::dialect::Dialect;
use crate::sql::format::{assignment_list, column_names, number_fragment, placeholders};
use crate::types::{On, Value, WhereClause};

impl Database {
    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert one row built from `insert_cols`.
    ///
    /// Returns whether exactly one row was affected, so an insert under a
    /// `DO NOTHING` conflict directive reports `false` when the row already
    /// existed.
    pub async fn insert<M: Model>(&self, model: &M, insert_cols: &[&str], on: On) -> Result<bool> {
        let (cols, mut values) = selected_columns(model, insert_cols)?;
        let mut sql = format!(
            "INSERT INTO {}({}) VALUES ({})",
            model.table_name(),
            column_names(&cols),
            placeholders(&cols, self.dialect()),
        );
        sql.push_str(&conflict_clause_sql(&on, self.dialect(), values.len() + 1));
        values.extend(conflict_arguments(model, &on)?);

        let affected = self.execute(&sql, &values).await?;
        Ok(affected == 1)
    }

    /// Insert every model in one transaction.
    ///
    /// Columns are resolved once from the first model; the per-row argument
    /// list is rebuilt for every model with the same column selection. An
    /// empty slice is a no-op success.
    pub async fn insert_many<M: Model>(
        &self,
        models: &[M],
        insert_cols: &[&str],
        on: On,
    ) -> std::result::Result<(), BatchError> {
        let Some(first) = models.first() else {
            return Ok(());
        };

        let (cols, _) = selected_columns(first, insert_cols).map_err(BatchError::new)?;
        let mut sql = format!(
            "INSERT INTO {}({}) VALUES ({})",
            first.table_name(),
            column_names(&cols),
            placeholders(&cols, self.dialect()),
        );
        sql.push_str(&conflict_clause_sql(&on, self.dialect(), cols.len() + 1));

        let mut records = Vec::with_capacity(models.len());
        for model in models {
            let (_, mut record) = selected_columns(model, insert_cols).map_err(BatchError::new)?;
            record.extend(conflict_arguments(model, &on).map_err(BatchError::new)?);
            records.push(record);
        }

        self.execute_many(&sql, &records).await
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Update the selected columns of every row matching the where clause.
    ///
    /// Arguments bind in the order [selected column values, where-clause
    /// arguments]. Returns whether exactly one row was affected.
    pub async fn update<M: Model>(
        &self,
        model: &M,
        update_cols: &[&str],
        wc: WhereClause,
    ) -> Result<bool> {
        let (cols, mut values) = selected_columns(model, update_cols)?;
        let (fragment, _) = number_fragment(&wc.clause, self.dialect(), cols.len() + 1);
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            model.table_name(),
            assignment_list(&cols, self.dialect(), 1),
            fragment,
        );
        values.extend(wc.arguments);

        let affected = self.execute(&sql, &values).await?;
        Ok(affected == 1)
    }

    /// Update every known field except `exclude_cols`
    pub async fn update_by_exclusion<M: Model>(
        &self,
        model: &M,
        exclude_cols: &[&str],
        wc: WhereClause,
    ) -> Result<bool> {
        let excluded: HashSet<&str> = exclude_cols.iter().copied().collect();
        let update_cols: Vec<&str> = model
            .fields()
            .into_iter()
            .filter(|field| !excluded.contains(*field))
            .collect();
        self.update(model, &update_cols, wc).await
    }

    // =========================================================================
    // Delete / Count
    // =========================================================================

    /// Delete every row matching the where clause; 0 is a valid outcome
    pub async fn delete<M: Model>(&self, model: &M, wc: WhereClause) -> Result<u64> {
        let (fragment, _) = number_fragment(&wc.clause, self.dialect(), 1);
        let sql = format!("DELETE FROM {} WHERE {}", model.table_name(), fragment);
        self.execute(&sql, &wc.arguments).await
    }

    /// Count rows by `ref_col`, optionally constrained by a where clause
    pub async fn count<M: Model>(
        &self,
        model: &M,
        ref_col: &str,
        wc: Option<WhereClause>,
    ) -> Result<i64> {
        let table = model.table_name();
        let (sql, args) = match wc {
            Some(wc) => {
                let (fragment, _) = number_fragment(&wc.clause, self.dialect(), 1);
                (
                    format!("SELECT count({ref_col}) FROM {table} WHERE {fragment}"),
                    wc.arguments,
                )
            }
            None => (format!("SELECT count({ref_col}) FROM {table}"), Vec::new()),
        };

        let rows = self.query(&sql, &args).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(0);
        };
        let Some(value) = row.into_iter().next() else {
            return Ok(0);
        };
        Ok(i64::try_from(value)?)
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Fetch at most one row of every known field into the model in place.
    ///
    /// Zero matching rows is not an error; the model comes back unmodified.
    pub async fn query_model<M: Model>(&self, model: M, wc: Option<WhereClause>) -> Result<M> {
        let fields = model.fields();
        self.query_model_by_columns(model, &fields, wc).await
    }

    /// Fetch at most one row of the named columns into the model in place
    pub async fn query_model_by_columns<M: Model>(
        &self,
        mut model: M,
        field_names: &[&str],
        wc: Option<WhereClause>,
    ) -> Result<M> {
        let (cols, _) = model.field_values(field_names)?;
        let (sql, args) = select_statement(model.table_name(), &cols, wc.as_ref(), self.dialect(), true)?;

        let rows = self.query(&sql, &args).await?;
        if let Some(row) = rows.into_iter().next() {
            scan_row(&mut model, &cols, row)?;
        }
        Ok(model)
    }

    /// Fetch every matching row, cloning the model once per row
    pub async fn query_models<M: Model>(&self, model: M, wc: Option<WhereClause>) -> Result<Vec<M>> {
        let fields = model.fields();
        self.query_models_by_columns(model, &fields, wc).await
    }

    /// Fetch every matching row of the named columns, cloning the model once
    /// per row.
    ///
    /// A supplied where clause must carry at least one bound argument; omit
    /// the clause entirely to query every row.
    pub async fn query_models_by_columns<M: Model>(
        &self,
        mut model: M,
        field_names: &[&str],
        wc: Option<WhereClause>,
    ) -> Result<Vec<M>> {
        if let Some(wc) = &wc {
            if wc.arguments.is_empty() {
                return Err(RowMapError::validation(
                    "where clause supplied with no bound arguments",
                ));
            }
        }

        let (cols, _) = model.field_values(field_names)?;
        let (sql, args) = select_statement(model.table_name(), &cols, wc.as_ref(), self.dialect(), false)?;

        let rows = self.query(&sql, &args).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            scan_row(&mut model, &cols, row)?;
            results.push(model.clone());
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Statement assembly helpers
// ---------------------------------------------------------------------------

/// Intersect `selected` with the model's fields, in model field order,
/// pairing each kept column with its current value. Unknown names are
/// silently dropped; an empty result is a caller mistake.
fn selected_columns<M: Model>(
    model: &M,
    selected: &[&str],
) -> Result<(Vec<&'static str>, Vec<Value>)> {
    let wanted: HashSet<&str> = selected.iter().copied().collect();
    let mut cols = Vec::with_capacity(selected.len());
    let mut values = Vec::with_capacity(selected.len());
    for field in model.fields() {
        if !wanted.contains(field) {
            continue;
        }
        let value = model.value(field).ok_or_else(|| {
            RowMapError::reflection(format!("field '{field}' has no readable value"))
        })?;
        cols.push(field);
        values.push(value);
    }
    if cols.is_empty() {
        return Err(RowMapError::validation(
            "no columns resolved from the requested column set",
        ));
    }
    Ok((cols, values))
}

/// Render the `ON ...` conflict clause, numbering any extra placeholders
/// from `start` (one past the insert values).
fn conflict_clause_sql(on: &On, dialect: Dialect, start: usize) -> String {
    if on.is_empty() {
        return String::new();
    }
    if !on.upsert_columns.is_empty() {
        let cols: Vec<&str> = on.upsert_columns.iter().map(String::as_str).collect();
        format!(
            " ON {} DO UPDATE SET {}",
            on.clause,
            assignment_list(&cols, dialect, start)
        )
    } else if !on.arguments.is_empty() {
        let (fragment, _) = number_fragment(&on.clause, dialect, start);
        format!(" ON {fragment}")
    } else {
        format!(" ON {}", on.clause)
    }
}

/// Arguments the conflict clause appends after the insert values: the upsert
/// columns' current model values, or the directive's literal arguments.
fn conflict_arguments<M: Model>(model: &M, on: &On) -> Result<Vec<Value>> {
    if on.is_empty() {
        return Ok(Vec::new());
    }
    if !on.upsert_columns.is_empty() {
        on.upsert_columns
            .iter()
            .map(|col| {
                model.value(col).ok_or_else(|| {
                    RowMapError::reflection(format!("unknown field '{col}' in upsert columns"))
                })
            })
            .collect()
    } else {
        Ok(on.arguments.clone())
    }
}

fn select_statement(
    table: &str,
    cols: &[&'static str],
    wc: Option<&WhereClause>,
    dialect: Dialect,
    single: bool,
) -> Result<(String, Vec<Value>)> {
    if cols.is_empty() {
        return Err(RowMapError::validation(
            "no columns resolved from the requested column set",
        ));
    }
    let columns = column_names(cols);
    let limit = if single { " LIMIT 1" } else { "" };
    match wc {
        Some(wc) => {
            let (fragment, _) = number_fragment(&wc.clause, dialect, 1);
            Ok((
                format!("SELECT {columns} FROM {table} WHERE {fragment}{limit}"),
                wc.arguments.clone(),
            ))
        }
        None => Ok((format!("SELECT {columns} FROM {table}{limit}"), Vec::new())),
    }
}

fn scan_row<M: Model>(model: &mut M, cols: &[&'static str], row: Vec<Value>) -> Result<()> {
    for (col, value) in cols.iter().zip(row) {
        model.set_value(col, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Account {
        id: i64,
        email: String,
        name: String,
    }

    impl Model for Account {
        fn table_name(&self) -> &'static str {
            "account"
        }

        fn fields(&self) -> Vec<&'static str> {
            vec!["id", "email", "name"]
        }

        fn value(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(self.id.into()),
                "email" => Some(self.email.as_str().into()),
                "name" => Some(self.name.as_str().into()),
                _ => None,
            }
        }

        fn set_value(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "id" => self.id = value.try_into()?,
                "email" => self.email = value.try_into()?,
                "name" => self.name = value.try_into()?,
                _ => return Err(RowMapError::reflection(format!("unknown field '{field}'"))),
            }
            Ok(())
        }
    }

    // =========================================================================
    // Column Selection Tests
    // =========================================================================

    #[test]
    fn test_selected_columns_keeps_field_order() {
        let account = Account {
            id: 1,
            email: "e".into(),
            name: "n".into(),
        };
        // Request order does not matter; model field order governs.
        let (cols, values) = selected_columns(&account, &["name", "id"]).unwrap();
        assert_eq!(cols, vec!["id", "name"]);
        assert_eq!(values, vec![Value::Int(1), Value::Text("n".into())]);
    }

    #[test]
    fn test_selected_columns_drops_unknown_names() {
        let account = Account::default();
        let (cols, _) = selected_columns(&account, &["id", "missing"]).unwrap();
        assert_eq!(cols, vec!["id"]);
    }

    #[test]
    fn test_selected_columns_rejects_empty_resolution() {
        let account = Account::default();
        assert!(matches!(
            selected_columns(&account, &["missing"]),
            Err(RowMapError::Validation(_))
        ));
    }

    // =========================================================================
    // Conflict Clause Tests
    // =========================================================================

    #[test]
    fn test_conflict_clause_absent() {
        assert_eq!(conflict_clause_sql(&On::none(), Dialect::Sqlite, 4), "");
    }

    #[test]
    fn test_conflict_clause_bare_fragment() {
        assert_eq!(
            conflict_clause_sql(&On::conflict("CONFLICT(id) DO NOTHING"), Dialect::Sqlite, 4),
            " ON CONFLICT(id) DO NOTHING"
        );
    }

    #[test]
    fn test_conflict_clause_upsert_numbers_after_insert_values() {
        let on = On::upsert("CONFLICT(id)", &["email", "name"]);
        assert_eq!(
            conflict_clause_sql(&on, Dialect::Sqlite, 4),
            " ON CONFLICT(id) DO UPDATE SET email=?,name=?"
        );
        assert_eq!(
            conflict_clause_sql(&on, Dialect::Postgres, 4),
            " ON CONFLICT(id) DO UPDATE SET email=$4,name=$5"
        );
    }

    #[test]
    fn test_conflict_clause_raw_arguments() {
        let on = On::with_arguments(
            "CONFLICT(id) DO UPDATE SET name=?",
            vec![Value::Text("n".into())],
        );
        assert_eq!(
            conflict_clause_sql(&on, Dialect::Postgres, 4),
            " ON CONFLICT(id) DO UPDATE SET name=$4"
        );
    }

    #[test]
    fn test_conflict_arguments_bind_model_values_for_upsert() {
        let account = Account {
            id: 1,
            email: "e".into(),
            name: "n".into(),
        };
        let on = On::upsert("CONFLICT(id)", &["email", "name"]);
        let args = conflict_arguments(&account, &on).unwrap();
        assert_eq!(args, vec![Value::Text("e".into()), Value::Text("n".into())]);
    }

    #[test]
    fn test_conflict_arguments_unknown_upsert_column() {
        let account = Account::default();
        let on = On::upsert("CONFLICT(id)", &["missing"]);
        assert!(matches!(
            conflict_arguments(&account, &on),
            Err(RowMapError::Reflection(_))
        ));
    }

    // =========================================================================
    // Select Statement Tests
    // =========================================================================

    #[test]
    fn test_select_statement_single() {
        let wc = WhereClause::new("id=?", vec![Value::Int(1)]);
        let (sql, args) =
            select_statement("account", &["id", "name"], Some(&wc), Dialect::Sqlite, true).unwrap();
        assert_eq!(sql, "SELECT id,name FROM account WHERE id=? LIMIT 1");
        assert_eq!(args, vec![Value::Int(1)]);
    }

    #[test]
    fn test_select_statement_many_postgres() {
        let wc = WhereClause::new("id=? AND name=?", vec![Value::Int(1), "n".into()]);
        let (sql, _) =
            select_statement("account", &["id"], Some(&wc), Dialect::Postgres, false).unwrap();
        assert_eq!(sql, "SELECT id FROM account WHERE id=$1 AND name=$2");
    }

    #[test]
    fn test_select_statement_unconditional() {
        let (sql, args) =
            select_statement("account", &["id"], None, Dialect::Sqlite, false).unwrap();
        assert_eq!(sql, "SELECT id FROM account");
        assert!(args.is_empty());
    }
}
