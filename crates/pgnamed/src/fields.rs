//! Column extraction from records.

use std::collections::HashSet;

use crate::error::{OrmError, OrmResult};
use crate::record::{Field, FieldSink, MAX_FLATTEN_DEPTH, Record};

/// Every persisted field of `record`, with its bound value, in column order.
pub fn record_fields<R: Record + ?Sized>(record: &R) -> OrmResult<Vec<Field<'_>>> {
    record_fields_with_depth(record, MAX_FLATTEN_DEPTH)
}

/// Like [`record_fields`], with an explicit flatten depth limit.
pub fn record_fields_with_depth<R: Record + ?Sized>(
    record: &R,
    max_depth: usize,
) -> OrmResult<Vec<Field<'_>>> {
    let mut sink = FieldSink::new(max_depth);
    record.collect_fields(&mut sink)?;
    Ok(sink.into_fields())
}

/// The ordered column names of `record`, minus those listed in `exclude`.
///
/// Struct records yield columns in declaration order, with flattened records spliced in where
/// they are declared. Map records yield their keys in lexicographic order.
///
/// # Example
///
/// ```ignore
/// let cols = pgnamed::extract_fields(&user, &["id"])?;
/// assert_eq!(cols, vec!["name"]);
/// ```
pub fn extract_fields<R: Record + ?Sized>(record: &R, exclude: &[&str]) -> OrmResult<Vec<String>> {
    let fields = record_fields(record)?;
    column_names(&fields, exclude)
}

/// Column names of already collected fields, minus `exclude`.
///
/// A column that appears twice (e.g. a flattened record reusing a parent column name) is an
/// error, since neither the INSERT column list nor the parameter binding could be resolved.
pub fn column_names(fields: &[Field<'_>], exclude: &[&str]) -> OrmResult<Vec<String>> {
    let exclude: HashSet<&str> = exclude.iter().copied().collect();
    let mut seen = HashSet::with_capacity(fields.len());
    let mut columns = Vec::with_capacity(fields.len());

    for field in fields {
        let column = field.column();
        if !seen.insert(column) {
            return Err(OrmError::validation(format!(
                "record produces column '{column}' more than once"
            )));
        }
        if !exclude.contains(column) {
            columns.push(column.to_string());
        }
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Audit {
        created_by: String,
        note: String,
    }

    impl Record for Audit {
        fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
            sink.column("created_by", &self.created_by);
            // `note` carries no column annotation.
            let _ = &self.note;
            Ok(())
        }
    }

    struct User {
        id: i64,
        name: String,
        audit: Audit,
    }

    impl Record for User {
        fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
            sink.column("id", &self.id);
            sink.column("name", &self.name);
            sink.flatten(&self.audit)
        }
    }

    fn user() -> User {
        User {
            id: 1,
            name: "Bob".into(),
            audit: Audit {
                created_by: "admin".into(),
                note: "n/a".into(),
            },
        }
    }

    #[test]
    fn excludes_listed_columns() {
        let cols = extract_fields(&user(), &["id"]).unwrap();
        assert_eq!(cols, vec!["name", "created_by"]);
    }

    #[test]
    fn nested_columns_follow_parent_columns() {
        let cols = extract_fields(&user(), &[]).unwrap();
        assert_eq!(cols, vec!["id", "name", "created_by"]);
    }

    #[test]
    fn exclusion_applies_to_nested_columns() {
        let cols = extract_fields(&user(), &["created_by"]).unwrap();
        assert_eq!(cols, vec!["id", "name"]);
    }

    #[test]
    fn empty_map_yields_no_columns() {
        let map: BTreeMap<String, i32> = BTreeMap::new();
        assert!(extract_fields(&map, &[]).unwrap().is_empty());
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        struct Clash {
            name: String,
            inner: Inner,
        }
        struct Inner {
            name: String,
        }
        impl Record for Inner {
            fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
                sink.column("name", &self.name);
                Ok(())
            }
        }
        impl Record for Clash {
            fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
                sink.column("name", &self.name);
                sink.flatten(&self.inner)
            }
        }

        let clash = Clash {
            name: "a".into(),
            inner: Inner { name: "b".into() },
        };
        assert!(matches!(
            extract_fields(&clash, &[]),
            Err(OrmError::Validation(_))
        ));
    }

    #[test]
    fn depth_limit_is_configurable() {
        let user = user();
        let fields = record_fields_with_depth(&user, 0);
        assert!(matches!(fields, Err(OrmError::RecursionLimit { depth: 0 })));
        assert_eq!(record_fields_with_depth(&user, 1).unwrap().len(), 3);
    }
}
