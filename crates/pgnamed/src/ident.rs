//! SQL identifier handling for table and column names.
//!
//! Table names are spliced into generated statements, so they go through [`TableName::parse`]:
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL and escape `"` as `""`
//! - Parts are joined with `.` (`schema.table`)
//!
//! Column names are always rendered double-quoted.

use std::fmt;

use crate::error::{OrmError, OrmResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Unquoted(String),
    Quoted(String),
}

/// A validated, possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    parts: Vec<Part>,
}

impl TableName {
    /// Parse a table name, supporting dotted and quoted forms.
    ///
    /// - Dotted: `public.users`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable"`
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Table name cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Table name cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') if chars.peek().is_some() => {}
                    Some('.') => return Err(OrmError::validation("Trailing '.' in table name")),
                    Some(c) => {
                        return Err(OrmError::validation(format!(
                            "Expected '.' between table name parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            name.push('"');
                        }
                        Some('"') => break,
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
                parts.push(Part::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return Err(OrmError::validation(format!(
                        "Invalid character in table name: '{c}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::validation("Empty table name segment"));
            }
            parts.push(Part::Unquoted(name));
        }

        Ok(Self { parts })
    }

    /// Render the table name as SQL.
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match part {
                Part::Unquoted(s) => f.write_str(s)?,
                Part::Quoted(s) => {
                    let mut quoted = String::with_capacity(s.len() + 2);
                    push_quoted(&mut quoted, s);
                    f.write_str(&quoted)?;
                }
            }
        }
        Ok(())
    }
}

/// Whether `s` can be used both as a column name and as a `:name` placeholder.
pub fn is_valid_column_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Append `name` wrapped in double quotes, doubling any embedded quote.
pub fn push_quoted(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}
