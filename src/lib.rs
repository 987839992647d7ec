//! # rowmap
//!
//! Model-driven dynamic SQL mapping for SQLite and PostgreSQL.
//!
//! This crate persists typed table models to a relational store without
//! hand-written SQL per entity. Given a model's field set and an operation,
//! it derives column lists, placeholder strings, and argument bindings,
//! dispatches them through a single pooled connection abstraction, and
//! applies dialect-specific syntax along the way.
//!
//! ## Features
//!
//! - **Explicit model contract**: types opt in by implementing [`Model`]:
//!   table name, field enumeration, per-field read/write access
//! - **Dynamic statement building**: insert, upsert, batch insert, update,
//!   delete, count, and single/multi-row selects from one field mapping
//! - **Dialect awareness**: positional `?` vs numbered `$n` placeholders and
//!   `excluded`/`EXCLUDED` upsert assignments, selected by the connection URL
//! - **Transactional batches**: prepared once, executed per row, committed
//!   atomically, with a bounded rollback retry on failure
//! - **Two-error batch contract**: a failed batch reports the original
//!   failure and the cleanup outcome together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rowmap::{Database, Model, On, Result, RowMapError, Value, WhereClause};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Account {
//!     id: i64,
//!     email: String,
//!     name: String,
//! }
//!
//! impl Model for Account {
//!     fn table_name(&self) -> &'static str {
//!         "account"
//!     }
//!
//!     fn fields(&self) -> Vec<&'static str> {
//!         vec!["id", "email", "name"]
//!     }
//!
//!     fn value(&self, field: &str) -> Option<Value> {
//!         match field {
//!             "id" => Some(self.id.into()),
//!             "email" => Some(self.email.as_str().into()),
//!             "name" => Some(self.name.as_str().into()),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_value(&mut self, field: &str, value: Value) -> Result<()> {
//!         match field {
//!             "id" => self.id = value.try_into()?,
//!             "email" => self.email = value.try_into()?,
//!             "name" => self.name = value.try_into()?,
//!             _ => return Err(RowMapError::reflection(format!("unknown field '{field}'"))),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let db = Database::connect("sqlite:accounts.db").await?;
//!     db.execute(
//!         "CREATE TABLE IF NOT EXISTS account (
//!             id INTEGER NOT NULL PRIMARY KEY,
//!             email TEXT NOT NULL UNIQUE,
//!             name TEXT DEFAULT ''
//!         )",
//!         &[],
//!     )
//!     .await?;
//!
//!     let account = Account {
//!         id: 1,
//!         email: "a@example.com".to_string(),
//!         name: "a".to_string(),
//!     };
//!
//!     // Insert, ignoring an already-present row
//!     let inserted = db
//!         .insert(
//!             &account,
//!             &["id", "email", "name"],
//!             On::conflict("CONFLICT(id) DO NOTHING"),
//!         )
//!         .await?;
//!
//!     // Insert-or-update from the model's current values
//!     db.insert(
//!         &account,
//!         &["id", "email", "name"],
//!         On::upsert("CONFLICT(id)", &["email", "name"]),
//!     )
//!     .await?;
//!
//!     // Read it back
//!     let found = db
//!         .query_model(
//!             Account::default(),
//!             Some(WhereClause::new("id=?", vec![Value::Int(1)])),
//!         )
//!         .await?;
//!
//!     println!("inserted={inserted} found={found:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Dialects
//!
//! The connection URL scheme fixes the dialect for every statement built
//! through a [`Database`] handle: `sqlite:` renders `?` placeholders,
//! `postgres:`/`postgresql:` renders `$n`. Where-clause and conflict
//! fragments are always written with `?` and renumbered for PostgreSQL, so
//! caller fragments stay dialect-portable.
//!
//! ## Concurrency
//!
//! Every operation is one awaited round trip; concurrency safety is the
//! pool's. A batch owns one pooled connection for its whole BEGIN..COMMIT
//! sequence. The only retry in the crate is the rollback of a failed batch.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod sql;
pub mod types;

mod store;

// Re-export the public surface for convenience
pub use config::{
    ConnectionSource, DatabaseConfig, DatabaseConfigBuilder, FileSource, ProtocolOptions,
    ServerSource,
};
pub use db::Database;
pub use error::{BatchError, Result, RowMapError};
pub use model::Model;
pub use sql::dialect::Dialect;
pub use sql::format::{
    assignment_list, column_names, excluded_assignment_list, number_fragment, placeholders,
    table_name_from_create_sql,
};
pub use types::{On, Value, WhereClause};
