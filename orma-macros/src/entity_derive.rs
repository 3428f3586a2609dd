use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::crate_path::orma_data_path;
use crate::parsing::{custom_query, named_fields, property_name, push_query, snake_case, string_value};

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Struct-level `#[entity(...)]` settings.
struct EntityAttrs {
    table: Option<String>,
    key: Option<String>,
    queries: Vec<(String, String)>,
}

fn extract_entity_attrs(input: &DeriveInput) -> syn::Result<EntityAttrs> {
    let mut attrs = EntityAttrs {
        table: None,
        key: None,
        queries: Vec::new(),
    };
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                attrs.table = Some(string_value(&meta)?);
                Ok(())
            } else if meta.path.is_ident("key") {
                attrs.key = Some(string_value(&meta)?);
                Ok(())
            } else if meta.path.is_ident("query") {
                let query = custom_query(&meta, "entity")?;
                push_query(&mut attrs.queries, query, &input.ident)
            } else {
                Err(meta.error("expected `table`, `key`, or `query(...)` in #[entity(...)]"))
            }
        })?;
    }
    Ok(attrs)
}

#[derive(Default)]
struct FieldFlags {
    id: bool,
    manual: bool,
    skip: bool,
}

fn extract_field_flags(attrs: &[syn::Attribute]) -> syn::Result<FieldFlags> {
    let mut flags = FieldFlags::default();
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                flags.id = true;
            } else if meta.path.is_ident("manual") {
                flags.manual = true;
            } else if meta.path.is_ident("skip") {
                flags.skip = true;
            } else {
                return Err(meta.error("expected `id`, `manual`, or `skip` in #[entity(...)]"));
            }
            Ok(())
        })?;
    }
    Ok(flags)
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let krate = orma_data_path();
    let attrs = extract_entity_attrs(input)?;
    let fields = named_fields(input, "Entity")?;

    let table = attrs.table.unwrap_or_else(|| snake_case(&name.to_string()));
    let key = attrs.key.unwrap_or_else(|| format!("{table}_id"));

    let mut id_field: Option<&syn::Ident> = None;
    let mut fallback_id: Option<&syn::Ident> = None;
    let mut properties = Vec::new();
    let mut manual = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let flags = extract_field_flags(&field.attrs)?;
        if flags.id {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(ident, "only one field can be #[entity(id)]"));
            }
            id_field = Some(ident);
            continue;
        }
        if flags.skip {
            continue;
        }
        let property = property_name(ident);
        if property == "id" {
            fallback_id = Some(ident);
            continue;
        }
        if flags.manual {
            manual.push(property.clone());
        }
        properties.push((property, ident));
    }

    let id_field = match (id_field, fallback_id) {
        (Some(ident), Some(other)) => {
            // an explicit id plus a field literally named `id`
            return Err(syn::Error::new_spanned(
                other,
                format!("field `id` clashes with #[entity(id)] field `{ident}`; mark it #[entity(skip)]"),
            ));
        }
        (Some(ident), None) | (None, Some(ident)) => ident,
        (None, None) => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Entity)] requires an `i64` key field named `id` or marked #[entity(id)]\n\
                 \n  example:\n  #[derive(Default, Entity)]\n  #[entity(table = \"widget\", key = \"widget_id\")]\n  pub struct Widget {\n      #[entity(id)]\n      pub id: i64,\n      ...\n  }",
            ))
        }
    };

    let property_names: Vec<&String> = properties.iter().map(|(p, _)| p).collect();
    let query_names: Vec<&String> = attrs.queries.iter().map(|(n, _)| n).collect();
    let query_sql: Vec<&String> = attrs.queries.iter().map(|(_, s)| s).collect();

    let getters = properties.iter().map(|(property, ident)| {
        quote! { #property => Some(#krate::ToValue::to_value(&self.#ident)), }
    });
    let unused_value = properties.is_empty().then(|| quote!(let _ = value;));
    let setters = properties.iter().map(|(property, ident)| {
        let target = format!("{table}.{property}");
        quote! {
            #property => {
                self.#ident = #krate::FromValue::from_value(value, #target)?;
                Ok(())
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Entity for #name #ty_generics #where_clause {
            fn schema() -> &'static #krate::EntitySchema {
                static SCHEMA: #krate::EntitySchema = #krate::EntitySchema {
                    table: #table,
                    key: #key,
                    properties: &[#(#property_names),*],
                    manual: &[#(#manual),*],
                    queries: &[#((#query_names, #query_sql)),*],
                };
                &SCHEMA
            }

            fn id(&self) -> i64 {
                self.#id_field
            }

            fn set_id(&mut self, id: i64) {
                self.#id_field = id;
            }

            fn property(&self, name: &str) -> Option<#krate::Value> {
                match name {
                    #(#getters)*
                    _ => None,
                }
            }

            fn set_property(&mut self, name: &str, value: #krate::Value) -> Result<(), #krate::DataError> {
                #unused_value
                match name {
                    #(#setters)*
                    _ => Err(#krate::DataError::InvalidArgument(format!(
                        "`{}` has no property `{}`",
                        #table, name
                    ))),
                }
            }
        }
    })
}
