//! Record-level insert/update helpers over any [`GenericClient`].
//!
//! # Example
//!
//! ```ignore
//! use pgnamed::{QueryRunner, Record};
//!
//! #[derive(Record)]
//! struct User {
//!     #[orm(column = "id")]
//!     id: i64,
//!     #[orm(column = "name")]
//!     name: String,
//! }
//!
//! let runner = QueryRunner::new(&client);
//! let id: i64 = runner.insert_and_get_id("users", &user, &["id"], "id").await?;
//! runner.update("users", &user, "WHERE id = :id", &["id"]).await?;
//! ```

use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, ToSql};
use tracing::Level;

use crate::client::GenericClient;
use crate::config::RunnerConfig;
use crate::error::{OrmError, OrmResult, Operation, ResultExt};
use crate::fields::{column_names, record_fields_with_depth};
use crate::named::NamedQuery;
use crate::record::{Field, Record};
use crate::row::FromRow;
use crate::sql_gen::{build_insert_returning, insert_sql, update_sql};

/// Runs generated record statements on a client, connection pool client or transaction.
///
/// Statement-building errors (unsupported record shapes, empty column lists, unknown
/// parameters) are returned as-is. Errors reported by the client are wrapped in
/// [`OrmError::Execution`] with the operation and table.
#[derive(Debug, Clone)]
pub struct QueryRunner<C> {
    client: C,
    config: RunnerConfig,
}

impl<C: GenericClient> QueryRunner<C> {
    /// Wrap a client with the default configuration.
    pub fn new(client: C) -> Self {
        Self::with_config(client, RunnerConfig::default())
    }

    pub fn with_config(client: C, config: RunnerConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Insert `record` into `table`, skipping the columns in `exclude`.
    ///
    /// Only annotated fields are inserted. Returns the number of affected rows.
    pub async fn insert<R: Record + ?Sized>(
        &self,
        table: &str,
        record: &R,
        exclude: &[&str],
    ) -> OrmResult<u64> {
        let fields = self.fields(record)?;
        let columns = column_names(&fields, exclude)?;
        let sql = insert_sql(table, &columns)?;
        self.execute_write(Operation::Insert, table, &sql, &fields).await
    }

    /// Insert `record` and return the value of `id_column` for the new row.
    pub async fn insert_and_get_id<R, Id>(
        &self,
        table: &str,
        record: &R,
        exclude: &[&str],
        id_column: &str,
    ) -> OrmResult<Id>
    where
        R: Record + ?Sized,
        Id: for<'a> FromSql<'a>,
    {
        let op = Operation::InsertReturning;
        let fields = self.fields(record)?;
        let columns = column_names(&fields, exclude)?;
        let sql = build_insert_returning(table, &columns, id_column)?;
        let query = NamedQuery::compile(&sql)?;
        let params = query.bind(&fields)?;

        self.log_statement(op.label(), table, query.sql(), params.len());
        let row = self
            .client
            .query_one(query.sql(), &params)
            .await
            .map_err(|e| self.failed(op, table, e))?;
        row.try_get::<usize, Id>(0)
            .map_err(|e| self.failed(op, table, OrmError::decode(id_column, e.to_string())))
    }

    /// Update `table` from `record`, setting every annotated column not in `exclude`.
    ///
    /// `where_sql` is appended verbatim and may use any record column as `:name`, including
    /// excluded ones (e.g. `"WHERE id = :id"` with `exclude = ["id"]`).
    pub async fn update<R: Record + ?Sized>(
        &self,
        table: &str,
        record: &R,
        where_sql: &str,
        exclude: &[&str],
    ) -> OrmResult<u64> {
        let fields = self.fields(record)?;
        let columns = column_names(&fields, exclude)?;
        let sql = update_sql(table, &columns, where_sql)?;
        self.execute_write(Operation::Update, table, &sql, &fields).await
    }

    /// Update only `columns` of `table`, taking their values from `record`.
    pub async fn update_fields<R: Record + ?Sized>(
        &self,
        table: &str,
        record: &R,
        where_sql: &str,
        columns: &[&str],
    ) -> OrmResult<u64> {
        let fields = self.fields(record)?;
        let sql = update_sql(table, columns, where_sql)?;
        self.execute_write(Operation::Update, table, &sql, &fields).await
    }

    /// Run `sql` with `:name` parameters bound from `record`; returns affected rows.
    pub async fn execute_named<R: Record + ?Sized>(&self, sql: &str, record: &R) -> OrmResult<u64> {
        let fields = self.fields(record)?;
        let query = NamedQuery::compile(sql)?;
        let params = query.bind(&fields)?;

        self.log_statement("execute", "-", query.sql(), params.len());
        self.client
            .execute(query.sql(), &params)
            .await
            .with_context(|| format!("cannot execute `{}`", self.config.display_sql(sql)))
    }

    /// Run `sql` with `:name` parameters bound from `record`; returns the first row.
    ///
    /// Zero rows is reported as [`OrmError::NotFound`].
    pub async fn query_one_named<R: Record + ?Sized>(
        &self,
        sql: &str,
        record: &R,
    ) -> OrmResult<Row> {
        let fields = self.fields(record)?;
        let query = NamedQuery::compile(sql)?;
        let params = query.bind(&fields)?;

        self.log_statement("query_one", "-", query.sql(), params.len());
        self.client
            .query_one(query.sql(), &params)
            .await
            .with_context(|| format!("cannot query `{}`", self.config.display_sql(sql)))
    }

    /// Fetch exactly the first row of `sql` as `T`; zero rows is [`OrmError::NotFound`].
    pub async fn get<T: FromRow>(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<T> {
        self.log_statement("get", "-", sql, params.len());
        let row = self
            .client
            .query_one(sql, params)
            .await
            .with_context(|| format!("cannot get `{}`", self.config.display_sql(sql)))?;
        T::from_row(&row)
    }

    /// Fetch all rows of `sql` as `T`.
    pub async fn select<T: FromRow>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<Vec<T>> {
        self.log_statement("select", "-", sql, params.len());
        let rows = self
            .client
            .query(sql, params)
            .await
            .with_context(|| format!("cannot select `{}`", self.config.display_sql(sql)))?;
        rows.iter().map(T::from_row).collect()
    }

    fn fields<'r, R: Record + ?Sized>(&self, record: &'r R) -> OrmResult<Vec<Field<'r>>> {
        record_fields_with_depth(record, self.config.max_flatten_depth)
    }

    async fn execute_write(
        &self,
        op: Operation,
        table: &str,
        sql: &str,
        fields: &[Field<'_>],
    ) -> OrmResult<u64> {
        let query = NamedQuery::compile(sql)?;
        let params = query.bind(fields)?;

        self.log_statement(op.label(), table, query.sql(), params.len());
        self.client
            .execute(query.sql(), &params)
            .await
            .map_err(|e| self.failed(op, table, e))
    }

    fn failed(&self, op: Operation, table: &str, err: OrmError) -> OrmError {
        if self.config.log_sql {
            tracing::warn!(
                target: "pgnamed.sql",
                op = op.label(),
                table,
                error = %err,
                "statement failed"
            );
        }
        OrmError::execution(op, table, err)
    }

    fn log_statement(&self, op: &str, table: &str, sql: &str, param_count: usize) {
        if !self.config.log_sql {
            return;
        }

        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.config.display_sql(sql);
        emit_at_level!(
            self.config.log_level,
            target: "pgnamed.sql",
            op,
            table,
            param_count,
            sql = %sql,
        );
    }
}
