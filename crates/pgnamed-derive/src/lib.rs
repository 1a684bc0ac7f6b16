//! Derive macros for pgnamed
//!
//! Provides `#[derive(Record)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod from_row;
mod record;
mod sql_ident;

/// Derive `Record` for a struct with named fields.
///
/// Only annotated fields become columns; everything else is left out of generated SQL.
///
/// # Example
///
/// ```ignore
/// use pgnamed::Record;
///
/// #[derive(Record)]
/// struct Audit {
///     #[orm(column = "created_by")]
///     created_by: String,
/// }
///
/// #[derive(Record)]
/// struct User {
///     #[orm(column = "id")]
///     id: i64,
///     #[orm(column = "name")]
///     name: String,
///     #[orm(flatten)]
///     audit: Audit,
///     cache: Vec<u8>,
/// }
/// // columns: id, name, created_by
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Write the field to this column (a plain SQL identifier)
/// - `#[orm(flatten)]` - Inline the columns of a nested `Record`, in place
/// - `#[orm(ignore)]` - Never write the field (same as leaving it unannotated)
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` trait for a struct.
///
/// Reads the same attributes as `Record`: `column` fields are read by name, `flatten` fields
/// are read with their own `FromRow` from the same row, and every other field is
/// `Default::default()`. A flattened `Option<..>` field is a compile error, since a row cannot
/// tell whether the nested record was written.
///
/// # Example
///
/// ```ignore
/// use pgnamed::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     #[orm(column = "id")]
///     id: i64,
///     #[orm(column = "email_address")]
///     email: Option<String>,
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
