//! # pgnamed
//!
//! Record-oriented convenience helpers for PostgreSQL on top of `tokio-postgres`.
//!
//! ## Features
//!
//! - **Records**: columns come from `#[orm(column = "...")]` annotated struct fields (or the
//!   keys of a string-keyed map), with nested records flattened in declaration order
//! - **Generated SQL**: `"a", "b"` / `:a, :b` insert lists and `"a"=:a` update lists
//! - **Named parameters**: `:name` placeholders are bound from the record's fields
//! - **Wrapped errors**: failures carry the operation and table, and
//!   [`is_not_found_error`] sees through every layer of wrapping
//! - **Transaction-friendly**: anything implementing [`GenericClient`] can run statements
//!
//! ## Example
//!
//! ```ignore
//! use pgnamed::{QueryRunner, Record, FromRow};
//!
//! #[derive(Record, FromRow)]
//! struct User {
//!     #[orm(column = "id")]
//!     id: i64,
//!     #[orm(column = "name")]
//!     name: String,
//!     // not annotated: never written
//!     cache: Option<String>,
//! }
//!
//! let runner = QueryRunner::new(&client);
//! let id: i64 = runner.insert_and_get_id("users", &user, &["id"], "id").await?;
//! runner.update("users", &user, "WHERE id = :id", &["id"]).await?;
//!
//! match runner.get::<User>("SELECT * FROM users WHERE id = $1", &[&id]).await {
//!     Err(e) if pgnamed::is_not_found_error(&e) => { /* gone */ }
//!     other => { let _user = other?; }
//! }
//! ```

pub mod client;
pub mod config;
pub mod connect;
pub mod error;
pub mod fields;
pub mod ident;
pub mod json;
pub mod named;
pub mod record;
pub mod row;
pub mod runner;
pub mod sql_gen;
pub mod transaction;

pub use client::GenericClient;
pub use config::RunnerConfig;
pub use connect::{connect, connect_with_tls};
pub use error::{OrmError, OrmResult, Operation, ResultExt, is_not_found_error};
pub use fields::{column_names, extract_fields, record_fields, record_fields_with_depth};
pub use ident::TableName;
pub use json::JsonParam;
pub use named::NamedQuery;
pub use record::{Field, FieldSink, FieldValue, MAX_FLATTEN_DEPTH, Record};
pub use row::{FromRow, RowExt};
pub use runner::QueryRunner;
pub use sql_gen::{
    InsertClauses, build_insert, build_insert_returning, build_update_set, insert_sql, update_sql,
};
pub use transaction::begin;

#[doc(hidden)]
pub use transaction::__rollback_failed;

#[cfg(feature = "pool")]
pub use connect::{
    DEFAULT_POOL_SIZE, create_pool, create_pool_with_manager_config, create_pool_with_size,
    create_pool_with_tls,
};

#[cfg(feature = "pool")]
pub use transaction::begin_pooled;

#[cfg(feature = "pool")]
pub use deadpool_postgres;

pub use tokio_postgres;

#[cfg(feature = "derive")]
pub use pgnamed_derive::{FromRow, Record};
