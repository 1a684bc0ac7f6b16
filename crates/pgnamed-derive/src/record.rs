//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::{FieldKind, record_fields};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let collect: Vec<_> = record_fields(&input, "Record")?
        .into_iter()
        .filter_map(|field| {
            let ident = field.ident;
            match field.kind {
                FieldKind::Column(column) => Some(quote! {
                    sink.column(#column, &self.#ident);
                }),
                FieldKind::Flatten => Some(quote! {
                    sink.flatten(&self.#ident)?;
                }),
                FieldKind::Skip => None,
            }
        })
        .collect();

    Ok(quote! {
        impl #impl_generics ::pgnamed::Record for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn collect_fields<'__pgnamed>(
                &'__pgnamed self,
                sink: &mut ::pgnamed::FieldSink<'__pgnamed>,
            ) -> ::pgnamed::OrmResult<()> {
                #(#collect)*
                Ok(())
            }
        }
    })
}
