//! Named parameters (`:name`) on top of tokio-postgres positional parameters (`$n`).
//!
//! ```ignore
//! let q = NamedQuery::compile("UPDATE users SET name = :name WHERE id = :id")?;
//! assert_eq!(q.sql(), "UPDATE users SET name = $1 WHERE id = $2");
//! let fields = pgnamed::record_fields(&user)?;
//! let params = q.bind(&fields)?;
//! client.execute(q.sql(), &params).await?;
//! ```
//!
//! Left untouched while scanning:
//! - `::type` casts
//! - `'string'` literals, `E'...'` escapes included
//! - `"quoted"` identifiers
//! - `$tag$ ... $tag$` dollar-quoted bodies
//! - `-- line` and `/* block */` comments

use std::collections::HashMap;

use tokio_postgres::types::ToSql;

use crate::error::{OrmError, OrmResult};
use crate::record::Field;

/// A statement whose `:name` placeholders were rewritten to `$1, $2, ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    sql: String,
    names: Vec<String>,
}

impl NamedQuery {
    /// Rewrite `:name` placeholders. A name used more than once maps to the same `$n`.
    pub fn compile(sql: &str) -> OrmResult<Self> {
        let bytes = sql.as_bytes();
        let mut out = String::with_capacity(sql.len());
        let mut names: Vec<String> = Vec::new();
        let mut i = 0;
        // Start of the slice not yet copied to `out`.
        let mut copied = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\'' => i = skip_quoted(bytes, i, b'\'', is_escape_string(bytes, i))?,
                b'"' => i = skip_quoted(bytes, i, b'"', false)?,
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = match sql[i..].find('\n') {
                        Some(pos) => i + pos + 1,
                        None => bytes.len(),
                    };
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let end = sql[i + 2..]
                        .find("*/")
                        .ok_or_else(|| OrmError::validation("unterminated block comment"))?;
                    i = i + 2 + end + 2;
                }
                b'$' => i = skip_dollar(sql, i)?,
                b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
                b':' if bytes.get(i + 1).is_some_and(|b| is_name_start(*b)) => {
                    let start = i + 1;
                    let mut end = start + 1;
                    while end < bytes.len() && is_name_char(bytes[end]) {
                        end += 1;
                    }
                    let name = &sql[start..end];
                    let index = match names.iter().position(|n| n == name) {
                        Some(pos) => pos + 1,
                        None => {
                            names.push(name.to_string());
                            names.len()
                        }
                    };

                    out.push_str(&sql[copied..i]);
                    out.push('$');
                    out.push_str(&index.to_string());
                    copied = end;
                    i = end;
                }
                _ => i += 1,
            }
        }
        out.push_str(&sql[copied..]);

        Ok(Self { sql: out, names })
    }

    /// The rewritten SQL, with positional placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names, in `$n` order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Resolve each parameter name against `fields`, in `$n` order.
    pub fn bind<'r>(&self, fields: &'r [Field<'_>]) -> OrmResult<Vec<&'r (dyn ToSql + Sync)>> {
        let by_column: HashMap<&str, &'r Field<'_>> =
            fields.iter().map(|f| (f.column(), f)).collect();

        self.names
            .iter()
            .map(|name| {
                by_column
                    .get(name.as_str())
                    .copied()
                    .map(|f| f.value().as_sql())
                    .ok_or_else(|| OrmError::MissingParameter(name.clone()))
            })
            .collect()
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether the literal opening at `quote` is an `E'...'` string.
fn is_escape_string(bytes: &[u8], quote: usize) -> bool {
    match quote.checked_sub(1).map(|p| bytes[p]) {
        Some(b'E' | b'e') => quote < 2 || !is_name_char(bytes[quote - 2]),
        _ => false,
    }
}

/// Skip a `'...'` or `"..."` section starting at `start`; a doubled quote is an escape.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> OrmResult<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Ok(i + 1);
        }
        if backslash_escapes && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        i += 1;
    }
    Err(OrmError::validation(if quote == b'\'' {
        "unterminated string literal"
    } else {
        "unterminated quoted identifier"
    }))
}

/// Skip a `$tag$ ... $tag$` body starting at `start`.
///
/// `$1`-style positional placeholders cannot be mixed with named ones and are rejected.
fn skip_dollar(sql: &str, start: usize) -> OrmResult<usize> {
    let bytes = sql.as_bytes();
    // A `$` inside an identifier such as `my_var$1` is not a quote.
    if start > 0 && is_name_char(bytes[start - 1]) {
        return Ok(start + 1);
    }
    let mut i = start + 1;
    if bytes.get(i).is_some_and(u8::is_ascii_digit) {
        return Err(OrmError::validation(
            "positional placeholders ($n) cannot be mixed with named parameters",
        ));
    }
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    if bytes.get(i) != Some(&b'$') {
        return Ok(start + 1);
    }
    let tag = &sql[start..=i];
    let body = i + 1;
    let end = sql[body..]
        .find(tag)
        .ok_or_else(|| OrmError::validation("unterminated dollar-quoted string"))?;
    Ok(body + end + tag.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::record_fields;
    use std::collections::BTreeMap;

    #[test]
    fn rewrites_in_order() {
        let q = NamedQuery::compile("INSERT INTO t (\"a\", \"b\") VALUES (:a, :b)").unwrap();
        assert_eq!(q.sql(), "INSERT INTO t (\"a\", \"b\") VALUES ($1, $2)");
        assert_eq!(q.names(), ["a", "b"]);
    }

    #[test]
    fn repeated_names_share_an_index() {
        let q = NamedQuery::compile("SELECT :id, :name, :id").unwrap();
        assert_eq!(q.sql(), "SELECT $1, $2, $1");
        assert_eq!(q.names(), ["id", "name"]);
    }

    #[test]
    fn casts_literals_and_comments_are_untouched() {
        let sql = "SELECT :v::text, ':not', \":nope\", $$ :body $$ \
                   -- :c\n/* :d */ FROM t WHERE x = :x";
        let q = NamedQuery::compile(sql).unwrap();
        assert_eq!(
            q.sql(),
            "SELECT $1::text, ':not', \":nope\", $$ :body $$ -- :c\n/* :d */ FROM t WHERE x = $2"
        );
        assert_eq!(q.names(), ["v", "x"]);
    }

    #[test]
    fn escaped_quotes_stay_inside_literals() {
        let q = NamedQuery::compile("SELECT 'it''s :x', E'a\\' :y' , :z").unwrap();
        assert_eq!(q.names(), ["z"]);
        assert!(q.sql().ends_with("$1"));
    }

    #[test]
    fn rejects_positional_placeholders() {
        assert!(NamedQuery::compile("SELECT $1, :a").is_err());
        assert!(NamedQuery::compile("SELECT my_var$1 FROM t WHERE a = :a").is_ok());
    }

    #[test]
    fn backslash_is_literal_outside_escape_strings() {
        let q = NamedQuery::compile(r"SELECT 'C:' , :path").unwrap();
        assert_eq!(q.names(), ["path"]);
    }

    #[test]
    fn rejects_unterminated_sections() {
        assert!(NamedQuery::compile("SELECT 'open").is_err());
        assert!(NamedQuery::compile("SELECT \"open").is_err());
        assert!(NamedQuery::compile("SELECT /* open").is_err());
        assert!(NamedQuery::compile("SELECT $tag$ open").is_err());
    }

    #[test]
    fn lone_colons_are_kept() {
        let q = NamedQuery::compile("SELECT arr[1:2], : FROM t").unwrap();
        assert_eq!(q.sql(), "SELECT arr[1:2], : FROM t");
        assert!(q.names().is_empty());
    }

    #[test]
    fn binds_from_record_fields() {
        let mut record = BTreeMap::new();
        record.insert("id".to_string(), 7_i64);
        record.insert("age".to_string(), 40_i64);

        let fields = record_fields(&record).unwrap();
        let q = NamedQuery::compile("UPDATE t SET age = :age WHERE id = :id").unwrap();
        let params = q.bind(&fields).unwrap();
        assert_eq!(params.len(), 2);

        let q = NamedQuery::compile("SELECT :missing").unwrap();
        match q.bind(&fields) {
            Err(OrmError::MissingParameter(name)) => assert_eq!(name, "missing"),
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }
}
