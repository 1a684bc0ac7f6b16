//! `#[orm(...)]` field attribute parsing shared by `Record` and `FromRow`.

use std::collections::HashSet;

use syn::{Data, DeriveInput, Fields, Ident, LitStr, Result, Type};

use crate::sql_ident::parse_sql_ident;

/// How a field takes part in a record.
pub(crate) enum FieldKind {
    /// `#[orm(column = "name")]`
    Column(String),
    /// `#[orm(flatten)]`: a nested record whose columns are inlined.
    Flatten,
    /// `#[orm(ignore)]` or no `orm` attribute at all.
    Skip,
}

pub(crate) struct RecordField<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
    pub kind: FieldKind,
}

/// Parsed contents of one `#[orm(...)]` attribute on a field.
#[derive(Default)]
struct FieldAttr {
    column: Option<LitStr>,
    flatten: bool,
    ignore: bool,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            if ident == "flatten" {
                attr.flatten = true;
            } else if ident == "ignore" {
                attr.ignore = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                attr.column = Some(input.parse()?);
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    format!(
                        "unknown orm field attribute `{ident}` \
                         (expected column, flatten or ignore)"
                    ),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        if !input.is_empty() {
            return Err(input.error("expected `,` between orm attributes"));
        }
        Ok(attr)
    }
}

fn field_kind(field: &syn::Field) -> Result<FieldKind> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        if parsed.column.is_some() {
            if merged.column.is_some() {
                return Err(syn::Error::new_spanned(attr, "duplicate `column` attribute"));
            }
            merged.column = parsed.column;
        }
        merged.flatten |= parsed.flatten;
        merged.ignore |= parsed.ignore;
    }

    match (merged.column, merged.flatten, merged.ignore) {
        (Some(lit), false, false) => Ok(FieldKind::Column(parse_sql_ident(&lit, "column")?)),
        (None, true, false) => Ok(FieldKind::Flatten),
        (None, false, _) => Ok(FieldKind::Skip),
        _ => Err(syn::Error::new_spanned(
            field,
            "`column`, `flatten` and `ignore` are mutually exclusive",
        )),
    }
}

/// Classify the named fields of a struct, rejecting every other shape.
///
/// Column names repeated within one struct are rejected here; clashes introduced through
/// `flatten` are only known at runtime.
pub(crate) fn record_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<Vec<RecordField<'a>>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    format!("{derive} can only be derived for structs with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs"),
            ));
        }
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let kind = field_kind(field)?;
        if let FieldKind::Column(column) = &kind {
            if !seen.insert(column.clone()) {
                return Err(syn::Error::new_spanned(
                    field,
                    format!("column '{column}' is mapped by more than one field"),
                ));
            }
        }
        out.push(RecordField {
            ident,
            ty: &field.ty,
            kind,
        });
    }
    Ok(out)
}
