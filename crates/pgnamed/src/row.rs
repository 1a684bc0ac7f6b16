//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`, which reads the same
/// `#[orm(column = "...")]`, `#[orm(ignore)]` and `#[orm(flatten)]` annotations as
/// `#[derive(Record)]`, so a record type reads back what it writes (flattened `Option` records
/// are write-only and rejected by the derive).
///
/// # Example
///
/// ```ignore
/// use pgnamed::{FromRow, Record};
///
/// #[derive(FromRow, Record)]
/// struct User {
///     #[orm(column = "id")]
///     id: i64,
///     #[orm(column = "name")]
///     name: String,
///     #[orm(ignore)]
///     dirty: bool,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }
}

macro_rules! impl_from_row_tuple {
    ($($idx:tt => $t:ident),+) => {
        impl<$($t),+> FromRow for ($($t,)+)
        where
            $($t: for<'a> FromSql<'a>),+
        {
            fn from_row(row: &Row) -> OrmResult<Self> {
                Ok(($(
                    row.try_get::<usize, $t>($idx)
                        .map_err(|e| OrmError::decode(stringify!($idx), e.to_string()))?,
                )+))
            }
        }
    };
}

impl_from_row_tuple!(0 => A);
impl_from_row_tuple!(0 => A, 1 => B);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C, 3 => D);
