//! `serde_json` records.
//!
//! A JSON object is a map-shaped record; any other JSON value is rejected with
//! [`OrmError::UnsupportedRecordShape`]. Object values are bound through [`JsonParam`], which
//! converts the JSON scalar to whatever the target column expects.

use std::error::Error;

use bytes::BytesMut;
use serde_json::{Map, Number, Value};
use tokio_postgres::types::{Format, IsNull, ToSql, Type};

use crate::error::{OrmError, OrmResult};
use crate::record::{FieldSink, FieldValue, Record};

/// A JSON value bound as a query parameter.
///
/// - `null` binds SQL `NULL` for any column type, `json` / `jsonb` included.
/// - `json` / `jsonb` columns receive any other value as-is.
/// - booleans, numbers and strings are encoded in binary when the column has a matching
///   scalar type (`bool`, integer and float types, text types).
/// - for every other column type (`numeric`, `timestamptz`, `date`, `uuid`, ...) the scalar is
///   sent in text format and parsed by the server.
/// - arrays and objects are only accepted by `json` / `jsonb` columns.
#[derive(Debug, Clone, Copy)]
pub struct JsonParam<'a>(pub &'a Value);

impl JsonParam<'_> {
    /// Whether the value is written with its binary encoding for `ty`.
    fn is_binary(&self, ty: &Type) -> bool {
        match self.0 {
            Value::Bool(_) => *ty == Type::BOOL || is_json_type(ty),
            Value::Number(_) => is_number_type(ty) || is_text_type(ty) || is_json_type(ty),
            Value::String(_) => is_text_type(ty) || is_json_type(ty),
            Value::Null | Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl ToSql for JsonParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if self.0.is_null() {
            return Ok(IsNull::Yes);
        }
        if is_json_type(ty) {
            return self.0.to_sql(ty, out);
        }
        let binary = self.is_binary(ty);
        match self.0 {
            Value::Bool(b) if binary => b.to_sql(ty, out),
            Value::Number(n) if binary => number_to_sql(n, ty, out),
            Value::String(s) if binary => s.as_str().to_sql(ty, out),
            Value::Bool(b) => write_text(if *b { "true" } else { "false" }, out),
            Value::Number(n) => write_text(&n.to_string(), out),
            Value::String(s) => write_text(s, out),
            other => Err(format!(
                "cannot bind a JSON {} to a column of type {ty}",
                json_shape(other)
            )
            .into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        if self.is_binary(ty) {
            Format::Binary
        } else {
            Format::Text
        }
    }

    tokio_postgres::types::to_sql_checked!();
}

fn is_json_type(ty: &Type) -> bool {
    matches!(*ty, Type::JSON | Type::JSONB)
}

fn is_number_type(ty: &Type) -> bool {
    matches!(*ty, Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT4 | Type::FLOAT8)
}

fn is_text_type(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
}

/// Text-format parameter: the server runs the column type's input function on it.
fn write_text(text: &str, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    out.extend_from_slice(text.as_bytes());
    Ok(IsNull::No)
}

fn number_to_sql(
    n: &Number,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    let integer = || {
        n.as_i64()
            .ok_or_else(|| format!("JSON number {n} is not an integer"))
    };
    match *ty {
        Type::INT2 => i16::try_from(integer()?)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(integer()?)?.to_sql(ty, out),
        Type::INT8 => integer()?.to_sql(ty, out),
        Type::FLOAT4 | Type::FLOAT8 => {
            let f = n
                .as_f64()
                .ok_or_else(|| format!("JSON number {n} is not representable as a float"))?;
            if *ty == Type::FLOAT4 {
                (f as f32).to_sql(ty, out)
            } else {
                f.to_sql(ty, out)
            }
        }
        _ => n.to_string().to_sql(ty, out),
    }
}

pub(crate) fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Record for Map<String, Value> {
    fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
        let mut entries: Vec<(&String, &Value)> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (key, value) in entries {
            sink.entry(key, FieldValue::Json(JsonParam(value)))?;
        }
        Ok(())
    }
}

impl Record for Value {
    fn collect_fields<'a>(&'a self, sink: &mut FieldSink<'a>) -> OrmResult<()> {
        match self {
            Value::Object(map) => map.collect_fields(sink),
            other => Err(OrmError::UnsupportedRecordShape {
                shape: json_shape(other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MAX_FLATTEN_DEPTH;
    use serde_json::json;

    fn columns(value: &Value) -> OrmResult<Vec<String>> {
        let mut sink = FieldSink::new(MAX_FLATTEN_DEPTH);
        value.collect_fields(&mut sink)?;
        Ok(sink
            .into_fields()
            .iter()
            .map(|f| f.column().to_string())
            .collect())
    }

    #[test]
    fn object_keys_are_sorted() {
        let value = json!({ "name": "Bob", "age": 42, "email": null });
        assert_eq!(columns(&value).unwrap(), vec!["age", "email", "name"]);
    }

    #[test]
    fn empty_object_has_no_columns() {
        assert!(columns(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn non_objects_are_unsupported() {
        for (value, shape) in [
            (json!([1, 2]), "array"),
            (json!("x"), "string"),
            (json!(1), "number"),
            (json!(null), "null"),
            (json!(true), "bool"),
        ] {
            match columns(&value) {
                Err(OrmError::UnsupportedRecordShape { shape: got }) => assert_eq!(got, shape),
                other => panic!("expected UnsupportedRecordShape, got {other:?}"),
            }
        }
    }

    #[test]
    fn binds_scalars_by_column_type() {
        let mut buf = BytesMut::new();
        let v = json!(42);
        JsonParam(&v).to_sql_checked(&Type::INT4, &mut buf).unwrap();
        assert_eq!(&buf[..], &42_i32.to_be_bytes());

        let mut buf = BytesMut::new();
        let v = json!("Bob");
        JsonParam(&v).to_sql_checked(&Type::TEXT, &mut buf).unwrap();
        assert_eq!(&buf[..], b"Bob");

        let mut buf = BytesMut::new();
        let v = json!(null);
        assert!(matches!(
            JsonParam(&v).to_sql_checked(&Type::INT8, &mut buf).unwrap(),
            IsNull::Yes
        ));
    }

    #[test]
    fn rejects_mismatched_types() {
        let mut buf = BytesMut::new();
        let v = json!(70000);
        assert!(JsonParam(&v).to_sql_checked(&Type::INT2, &mut buf).is_err());

        let v = json!(1.5);
        assert!(JsonParam(&v).to_sql_checked(&Type::INT8, &mut buf).is_err());

        let v = json!([1, 2]);
        assert!(JsonParam(&v).to_sql_checked(&Type::TEXT, &mut buf).is_err());
    }

    #[test]
    fn other_column_types_use_text_format() {
        let cases = [
            (json!("2024-01-01T00:00:00Z"), Type::TIMESTAMPTZ, "2024-01-01T00:00:00Z"),
            (json!("2024-01-01"), Type::DATE, "2024-01-01"),
            (
                json!("67e55044-10b1-426f-9247-bb680e5fe0c8"),
                Type::UUID,
                "67e55044-10b1-426f-9247-bb680e5fe0c8",
            ),
            (json!(12.5), Type::NUMERIC, "12.5"),
            (json!(7), Type::NUMERIC, "7"),
            (json!(true), Type::TEXT, "true"),
            (json!("42"), Type::INT4, "42"),
        ];
        for (value, ty, text) in cases {
            let param = JsonParam(&value);
            assert!(
                matches!(param.encode_format(&ty), Format::Text),
                "{value} as {ty}"
            );

            let mut buf = BytesMut::new();
            assert!(matches!(param.to_sql_checked(&ty, &mut buf).unwrap(), IsNull::No));
            assert_eq!(&buf[..], text.as_bytes());
        }
    }

    #[test]
    fn native_scalars_stay_binary() {
        let v = json!(42);
        assert!(matches!(JsonParam(&v).encode_format(&Type::INT8), Format::Binary));
        let v = json!(false);
        assert!(matches!(JsonParam(&v).encode_format(&Type::BOOL), Format::Binary));
        let v = json!("Bob");
        assert!(matches!(JsonParam(&v).encode_format(&Type::VARCHAR), Format::Binary));
        let v = json!({ "vip": true });
        assert!(matches!(JsonParam(&v).encode_format(&Type::JSONB), Format::Binary));
    }

    #[test]
    fn null_is_sql_null_for_json_columns() {
        let v = json!(null);
        for ty in [Type::JSON, Type::JSONB] {
            let mut buf = BytesMut::new();
            assert!(matches!(
                JsonParam(&v).to_sql_checked(&ty, &mut buf).unwrap(),
                IsNull::Yes
            ));
            assert!(buf.is_empty());
        }

        let v = json!([1, 2]);
        let mut buf = BytesMut::new();
        assert!(matches!(
            JsonParam(&v).to_sql_checked(&Type::JSONB, &mut buf).unwrap(),
            IsNull::No
        ));
    }
}
