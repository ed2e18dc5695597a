//! Procedural macro binding a record type to its store model
//!
//! `#[derive(Entity)]` implements `store_object::Entity`, so the CRUD engine reaches the
//! right model through the type instead of a runtime string lookup.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod parsing;

use parsing::parse_entity;

/// Derive macro for the `Entity` trait
///
/// The model name defaults to the snake_case type name. The soft-delete marker comes from
/// `soft_delete = "..."` or from a field marked `#[soft_delete]`; without either the
/// engine uses the configured default.
///
/// ```rust,ignore
/// use crudhaus::prelude::*;
///
/// #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
/// #[entity(model = "product")]
/// pub struct Product {
///     pub id: i64,
///     pub name: String,
///     #[soft_delete]
///     pub deleted_at: Option<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, soft_delete))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let info = match parse_entity(&input) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let model = &info.model;
    let soft_delete = match &info.soft_delete_field {
        Some(field) => quote! { Some(#field) },
        None => quote! { None },
    };

    let expanded = quote! {
        impl #impl_generics store_object::Entity for #name #ty_generics #where_clause {
            const MODEL: &'static str = #model;
            const SOFT_DELETE_FIELD: Option<&'static str> = #soft_delete;
        }
    };

    TokenStream::from(expanded)
}
