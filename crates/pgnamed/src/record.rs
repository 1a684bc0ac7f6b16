//! Records: values that can be persisted column-by-column.
//!
//! A record is either a struct deriving [`Record`](crate::Record) (only fields annotated with
//! `#[orm(column = "...")]` participate) or a string-keyed map. Records expose their fields
//! through a [`FieldSink`], which the extractor and the named-parameter binder both consume.
//!
//! ```ignore
//! use pgnamed::Record;
//!
//! #[derive(Record)]
//! struct User {
//!     #[orm(column = "id")]
//!     id: i64,
//!     #[orm(column = "name")]
//!     name: String,
//!     #[orm(flatten)]
//!     audit: Audit,
//!     cache_key: String, // not persisted
//! }
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

use tokio_postgres::types::ToSql;

use crate::error::{OrmError, OrmResult};
use crate::ident::is_valid_column_name;
use crate::json::JsonParam;

/// Default limit on nested `#[orm(flatten)]` levels.
pub const MAX_FLATTEN_DEPTH: usize = 32;

/// A value that knows which columns it persists to.
///
/// Usually derived with `#[derive(Record)]`; implemented here for string-keyed maps and
/// `serde_json` objects.
pub trait Record {
    /// Push every persisted field, in column order, into `sink`.
    fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()>;
}

/// The value bound for one column.
#[derive(Clone, Copy)]
pub enum FieldValue<'a> {
    /// A typed Rust value.
    Sql(&'a (dyn ToSql + Sync)),
    /// A dynamic JSON value, converted to the column type at bind time.
    Json(JsonParam<'a>),
}

impl FieldValue<'_> {
    /// The value as a tokio-postgres parameter.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Sql(value) => *value,
            Self::Json(value) => value,
        }
    }
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql(value) => f.debug_tuple("Sql").field(value).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

/// One persisted column of a record.
#[derive(Debug, Clone)]
pub struct Field<'a> {
    column: Cow<'a, str>,
    value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    pub fn new(column: impl Into<Cow<'a, str>>, value: FieldValue<'a>) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value(&self) -> &FieldValue<'a> {
        &self.value
    }
}

/// Collects the fields of a record, tracking how deep flattening has gone.
#[derive(Debug)]
pub struct FieldSink<'a> {
    fields: Vec<Field<'a>>,
    depth: usize,
    max_depth: usize,
}

impl<'a> FieldSink<'a> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            fields: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Add an annotated struct field. Column names are checked by the derive macro.
    pub fn column(&mut self, column: &'static str, value: &'a (dyn ToSql + Sync)) {
        self.fields.push(Field::new(column, FieldValue::Sql(value)));
    }

    /// Add a map entry. The key becomes a column name, so it must be a plain SQL identifier.
    pub fn entry(&mut self, key: &'a str, value: FieldValue<'a>) -> OrmResult<()> {
        if !is_valid_column_name(key) {
            return Err(OrmError::validation(format!(
                "record key '{key}' is not a valid column name (expected [A-Za-z_][A-Za-z0-9_]*)"
            )));
        }
        self.fields.push(Field::new(key, value));
        Ok(())
    }

    /// Append the fields of a nested record.
    pub fn flatten<R: Record + ?Sized>(&mut self, record: &'a R) -> OrmResult<()> {
        if self.depth >= self.max_depth {
            return Err(OrmError::RecursionLimit {
                depth: self.max_depth,
            });
        }
        self.depth += 1;
        let result = record.collect_fields(self);
        self.depth -= 1;
        result
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<Field<'a>> {
        self.fields
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
        (**self).collect_fields(sink)
    }
}

/// `None` contributes no columns.
impl<R: Record> Record for Option<R> {
    fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
        match self {
            Some(record) => record.collect_fields(sink),
            None => Ok(()),
        }
    }
}

// Maps yield their keys in lexicographic order so generated SQL is stable.

impl<V: ToSql + Sync> Record for BTreeMap<String, V> {
    fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
        for (key, value) in self {
            sink.entry(key, FieldValue::Sql(value))?;
        }
        Ok(())
    }
}

impl<V: ToSql + Sync, S: BuildHasher> Record for HashMap<String, V, S> {
    fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
        let mut entries: Vec<(&String, &V)> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (key, value) in entries {
            sink.entry(key, FieldValue::Sql(value))?;
        }
        Ok(())
    }
}
