//! SQL fragment generation for record writes.
//!
//! The `build_*` functions are pure string builders: they never fail, and an empty column list
//! yields empty clauses. The statement helpers ([`insert_sql`], [`build_insert_returning`],
//! [`update_sql`]) are their callers and refuse to assemble a statement with no columns.
//!
//! Placeholders use the `:column` form understood by [`NamedQuery`](crate::NamedQuery).

use crate::error::{OrmError, OrmResult};
use crate::ident::{TableName, is_valid_column_name, push_quoted};

/// Column and placeholder lists for an `INSERT` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertClauses {
    /// `"col1", "col2"`
    pub columns: String,
    /// `:col1, :col2`
    pub placeholders: String,
}

/// Build the column and placeholder lists of `INSERT INTO t (<columns>) VALUES (<placeholders>)`.
///
/// The clauses do not depend on the table, so it is not a parameter; [`insert_sql`] takes the
/// table and assembles the full statement.
pub fn build_insert<S: AsRef<str>>(columns: &[S]) -> InsertClauses {
    let mut cols = String::new();
    let mut placeholders = String::new();
    for (i, col) in columns.iter().enumerate() {
        let col = col.as_ref();
        if i > 0 {
            cols.push_str(", ");
            placeholders.push_str(", ");
        }
        push_quoted(&mut cols, col);
        placeholders.push(':');
        placeholders.push_str(col);
    }
    InsertClauses {
        columns: cols,
        placeholders,
    }
}

/// Build the assignment list of `UPDATE t SET <set> ...`: `"col1"=:col1, "col2"=:col2`.
pub fn build_update_set<S: AsRef<str>>(columns: &[S]) -> String {
    let mut out = String::new();
    for (i, col) in columns.iter().enumerate() {
        let col = col.as_ref();
        if i > 0 {
            out.push_str(", ");
        }
        push_quoted(&mut out, col);
        out.push_str("=:");
        out.push_str(col);
    }
    out
}

/// `INSERT INTO <table> ("a", "b") VALUES (:a, :b)`
pub fn insert_sql<S: AsRef<str>>(table: &str, columns: &[S]) -> OrmResult<String> {
    let table = checked_target(table, columns)?;
    let clauses = build_insert(columns);
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        clauses.columns, clauses.placeholders
    ))
}

/// `INSERT INTO <table> ("a", "b") VALUES (:a, :b) RETURNING "<id_column>"`
pub fn build_insert_returning<S: AsRef<str>>(
    table: &str,
    columns: &[S],
    id_column: &str,
) -> OrmResult<String> {
    if id_column.is_empty() {
        return Err(OrmError::validation("RETURNING column cannot be empty"));
    }
    let mut sql = insert_sql(table, columns)?;
    sql.push_str(" RETURNING ");
    push_quoted(&mut sql, id_column);
    Ok(sql)
}

/// `UPDATE <table> SET "a"=:a, "b"=:b <where_sql>`
///
/// `where_sql` is appended verbatim and may reference any record field as `:name`.
pub fn update_sql<S: AsRef<str>>(table: &str, columns: &[S], where_sql: &str) -> OrmResult<String> {
    let table = checked_target(table, columns)?;
    let mut sql = format!("UPDATE {table} SET {}", build_update_set(columns));
    let where_sql = where_sql.trim();
    if !where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(where_sql);
    }
    Ok(sql)
}

fn checked_target<S: AsRef<str>>(table: &str, columns: &[S]) -> OrmResult<TableName> {
    let table = TableName::parse(table)?;
    if columns.is_empty() {
        return Err(OrmError::validation(format!(
            "no columns to write for table '{table}'"
        )));
    }
    if let Some(bad) = columns
        .iter()
        .map(|c| c.as_ref())
        .find(|c| !is_valid_column_name(c))
    {
        return Err(OrmError::validation(format!(
            "invalid column name '{bad}' for table '{table}'"
        )));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_insert_columns(sql: &str) -> Vec<String> {
        let start = sql.find('(').unwrap() + 1;
        let end = sql.find(')').unwrap();
        sql[start..end]
            .split(',')
            .map(|c| c.trim().trim_matches('"').to_string())
            .collect()
    }

    #[test]
    fn single_column_insert() {
        let clauses = build_insert(&["name"]);
        assert_eq!(clauses.columns, r#""name""#);
        assert_eq!(clauses.placeholders, ":name");
    }

    #[test]
    fn insert_clauses_preserve_order() {
        let cols = ["id", "name", "description"];
        let clauses = build_insert(&cols);
        assert_eq!(clauses.columns, r#""id", "name", "description""#);
        assert_eq!(clauses.placeholders, ":id, :name, :description");
        assert_eq!(clauses.columns.split(", ").count(), cols.len());
        assert_eq!(clauses.placeholders.split(", ").count(), cols.len());
    }

    #[test]
    fn update_set_terms() {
        let set = build_update_set(&["name", "email"]);
        assert_eq!(set, r#""name"=:name, "email"=:email"#);
        let terms: Vec<_> = set.split(", ").collect();
        assert_eq!(terms, vec![r#""name"=:name"#, r#""email"=:email"#]);
    }

    #[test]
    fn empty_columns_yield_empty_clauses() {
        let none: [&str; 0] = [];
        let clauses = build_insert(&none);
        assert!(clauses.columns.is_empty());
        assert!(clauses.placeholders.is_empty());
        assert!(build_update_set(&none).is_empty());
    }

    #[test]
    fn statements_reject_empty_columns() {
        let none: [&str; 0] = [];
        assert!(matches!(
            insert_sql("users", &none),
            Err(OrmError::Validation(_))
        ));
        assert!(matches!(
            update_sql("users", &none, "WHERE id = :id"),
            Err(OrmError::Validation(_))
        ));
        assert!(build_insert_returning("users", &none, "id").is_err());
    }

    #[test]
    fn insert_round_trip() {
        let cols = vec!["id".to_string(), "name".to_string(), "email".to_string()];
        let sql = insert_sql("users", &cols).unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO users ("id", "name", "email") VALUES (:id, :name, :email)"#
        );
        assert_eq!(parse_insert_columns(&sql), cols);
    }

    #[test]
    fn insert_returning() {
        let sql = build_insert_returning("public.users", &["name"], "id").unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO public.users ("name") VALUES (:name) RETURNING "id""#
        );
    }

    #[test]
    fn update_with_where() {
        let sql = update_sql("users", &["name"], " WHERE id = :id ").unwrap();
        assert_eq!(sql, r#"UPDATE users SET "name"=:name WHERE id = :id"#);

        let sql = update_sql("users", &["name"], "").unwrap();
        assert_eq!(sql, r#"UPDATE users SET "name"=:name"#);
    }

    #[test]
    fn statements_reject_bad_identifiers() {
        assert!(insert_sql("users; --", &["name"]).is_err());
        assert!(update_sql("users", &["na me"], "").is_err());
    }
}
