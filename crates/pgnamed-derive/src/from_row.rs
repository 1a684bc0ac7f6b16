//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result, Type};

use crate::attrs::{FieldKind, record_fields};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut field_extracts = Vec::new();
    for field in record_fields(&input, "FromRow")? {
        let ident = field.ident;
        let ty = field.ty;
        field_extracts.push(match field.kind {
            FieldKind::Column(column) => quote! {
                #ident: row.try_get_column(#column)?
            },
            FieldKind::Flatten if is_option(ty) => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "FromRow cannot read an `Option` flattened record; \
                     flatten the record type itself",
                ));
            }
            FieldKind::Flatten => quote! {
                #ident: <#ty as ::pgnamed::FromRow>::from_row(row)?
            },
            FieldKind::Skip => quote! {
                #ident: ::core::default::Default::default()
            },
        });
    }

    Ok(quote! {
        impl #impl_generics ::pgnamed::FromRow for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn from_row(row: &::pgnamed::tokio_postgres::Row) -> ::pgnamed::OrmResult<Self> {
                use ::pgnamed::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

/// `Option<..>`, `std::option::Option<..>` or `core::option::Option<..>`.
fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.qself.is_none()
        && path
            .path
            .segments
            .last()
            .is_some_and(|seg| seg.ident == "Option")
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn expands_columns_flatten_and_defaults() {
        let input: DeriveInput = parse_quote! {
            struct Account {
                #[orm(column = "email")]
                email: String,
                #[orm(flatten)]
                audit: Audit,
                cache: Vec<u8>,
            }
        };
        let out = expand(input).unwrap().to_string();
        assert!(out.contains("try_get_column (\"email\")"));
        assert!(out.contains("< Audit as :: pgnamed :: FromRow > :: from_row (row)"));
        assert!(out.contains("cache : :: core :: default :: Default :: default ()"));
    }

    #[test]
    fn optional_flatten_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Draft {
                #[orm(column = "title")]
                title: String,
                #[orm(flatten)]
                audit: Option<Audit>,
            }
        };
        let err = expand(input).unwrap_err().to_string();
        assert!(err.contains("cannot read an `Option` flattened record"));

        let input: DeriveInput = parse_quote! {
            struct Draft {
                #[orm(flatten)]
                audit: std::option::Option<Audit>,
            }
        };
        assert!(expand(input).is_err());
    }
}
