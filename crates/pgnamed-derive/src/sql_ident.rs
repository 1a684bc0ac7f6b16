use syn::{Error, LitStr, Result};

fn is_valid_sql_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Read a string literal that names a SQL column, rejecting anything but a plain identifier.
pub(crate) fn parse_sql_ident(lit: &LitStr, what: &str) -> Result<String> {
    let value = lit.value();
    let s = value.trim();
    if s.is_empty() {
        return Err(Error::new(lit.span(), format!("{what} must not be empty")));
    }
    if !is_valid_sql_ident(s) {
        return Err(Error::new(
            lit.span(),
            format!("{what} '{s}' is not a valid SQL identifier (expected [A-Za-z_][A-Za-z0-9_]*)"),
        ));
    }
    Ok(s.to_string())
}
