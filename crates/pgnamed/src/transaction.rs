//! Transactions.
//!
//! `tokio_postgres::Transaction` and `deadpool_postgres::Transaction` both implement
//! [`GenericClient`](crate::GenericClient), so a [`QueryRunner`](crate::QueryRunner) can be built
//! on a transaction exactly like on a connection.
//!
//! ```ignore
//! pgnamed::transaction!(&mut client, tx, {
//!     let runner = pgnamed::QueryRunner::new(&tx);
//!     let id: i64 = runner.insert_and_get_id("orders", &order, &["id"], "id").await?;
//!     runner.update("stock", &stock, "WHERE sku = :sku", &["sku"]).await?;
//!     Ok(id)
//! })?;
//! ```

use crate::error::{OrmError, OrmResult};

/// Start a transaction on `client`.
///
/// The transaction rolls back when dropped without `commit`.
pub async fn begin(
    client: &mut tokio_postgres::Client,
) -> OrmResult<tokio_postgres::Transaction<'_>> {
    client.transaction().await.map_err(OrmError::from_db_error)
}

/// Start a transaction on a pooled connection.
#[cfg(feature = "pool")]
pub async fn begin_pooled(
    client: &mut deadpool_postgres::Client,
) -> OrmResult<deadpool_postgres::Transaction<'_>> {
    client.transaction().await.map_err(OrmError::from_db_error)
}

/// Attach a failed rollback to the error that caused it.
///
/// The original error stays the root cause, so [`OrmError::is_not_found`] and friends still see it.
#[doc(hidden)]
pub fn __rollback_failed(error: OrmError, rollback_err: tokio_postgres::Error) -> OrmError {
    tracing::warn!(target: "pgnamed.sql", error = %rollback_err, "transaction rollback failed");
    error.wrap(format!("rollback failed ({rollback_err})"))
}

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `pgnamed::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        #[allow(unused_mut)]
        let mut $tx = ($client)
            .transaction()
            .await
            .map_err($crate::OrmError::from_db_error)?;

        let __pgnamed_tx_result: $crate::OrmResult<_> = async { $body }.await;
        match __pgnamed_tx_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::OrmError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::__rollback_failed(error, rollback_err)),
            },
        }
    }};
}
