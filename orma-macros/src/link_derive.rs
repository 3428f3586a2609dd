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

/// Struct-level `#[orma(...)]` settings.
#[derive(Default)]
struct LinkAttrs {
    table: Option<String>,
    from_key: Option<String>,
    to_key: Option<String>,
    order_from: Option<String>,
    order_to: Option<String>,
    queries: Vec<(String, String)>,
}

fn extract_link_attrs(input: &DeriveInput) -> syn::Result<LinkAttrs> {
    let mut attrs = LinkAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("orma") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("table") {
                &mut attrs.table
            } else if meta.path.is_ident("from_key") {
                &mut attrs.from_key
            } else if meta.path.is_ident("to_key") {
                &mut attrs.to_key
            } else if meta.path.is_ident("order_from") {
                &mut attrs.order_from
            } else if meta.path.is_ident("order_to") {
                &mut attrs.order_to
            } else if meta.path.is_ident("query") {
                let query = custom_query(&meta, "orma")?;
                return push_query(&mut attrs.queries, query, &input.ident);
            } else {
                return Err(meta.error(
                    "expected `table`, `from_key`, `to_key`, `order_from`, `order_to`, or `query(...)` in #[orma(...)]",
                ));
            };
            *slot = Some(string_value(&meta)?);
            Ok(())
        })?;
    }
    Ok(attrs)
}

#[derive(Default)]
struct FieldFlags {
    from: bool,
    to: bool,
    additional_key: bool,
    manual: bool,
    skip: bool,
}

fn extract_field_flags(attrs: &[syn::Attribute]) -> syn::Result<FieldFlags> {
    let mut flags = FieldFlags::default();
    for attr in attrs {
        if !attr.path().is_ident("orma") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("from") {
                flags.from = true;
            } else if meta.path.is_ident("to") {
                flags.to = true;
            } else if meta.path.is_ident("additional_key") {
                flags.additional_key = true;
            } else if meta.path.is_ident("manual") {
                flags.manual = true;
            } else if meta.path.is_ident("skip") {
                flags.skip = true;
            } else {
                return Err(meta.error(
                    "expected `from`, `to`, `additional_key`, `manual`, or `skip` in #[orma(...)]",
                ));
            }
            Ok(())
        })?;
    }
    Ok(flags)
}

fn option_tokens(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(v) => quote!(Some(#v)),
        None => quote!(None),
    }
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let krate = orma_data_path();
    let attrs = extract_link_attrs(input)?;
    let fields = named_fields(input, "Link")?;

    let mut from: Option<(&syn::Ident, &syn::Type)> = None;
    let mut to: Option<(&syn::Ident, &syn::Type)> = None;
    let mut properties = Vec::new();
    let mut additional_key = Vec::new();
    let mut manual = Vec::new();
    let mut others = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let flags = extract_field_flags(&field.attrs)?;
        if flags.from || flags.to {
            let slot = if flags.from { &mut from } else { &mut to };
            if flags.from && flags.to {
                return Err(syn::Error::new_spanned(ident, "a field cannot be both #[orma(from)] and #[orma(to)]"));
            }
            if slot.is_some() {
                return Err(syn::Error::new_spanned(
                    ident,
                    "a link has exactly one #[orma(from)] and one #[orma(to)] field",
                ));
            }
            *slot = Some((ident, &field.ty));
            continue;
        }
        others.push(ident);
        if flags.skip {
            continue;
        }
        let property = property_name(ident);
        if flags.additional_key {
            additional_key.push(property.clone());
        }
        if flags.manual {
            manual.push(property.clone());
        }
        properties.push((property, ident));
    }

    let (Some((from_ident, from_ty)), Some((to_ident, to_ty))) = (from, to) else {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Link)] requires one #[orma(from)] and one #[orma(to)] entity field\n\
             \n  example:\n  #[derive(Clone, Link)]\n  #[orma(table = \"user_group\")]\n  pub struct Membership {\n      #[orma(from)] pub user: User,\n      #[orma(to)] pub group: Group,\n  }",
        ));
    };

    let table = attrs.table.unwrap_or_else(|| snake_case(&name.to_string()));
    let from_key = option_tokens(&attrs.from_key);
    let to_key = option_tokens(&attrs.to_key);
    let order_from = option_tokens(&attrs.order_from);
    let order_to = option_tokens(&attrs.order_to);

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
        impl #impl_generics #krate::Link for #name #ty_generics #where_clause {
            type From = #from_ty;
            type To = #to_ty;

            fn schema() -> &'static #krate::LinkSchema {
                static SCHEMA: #krate::LinkSchema = #krate::LinkSchema {
                    table: #table,
                    from_key: #from_key,
                    to_key: #to_key,
                    properties: &[#(#property_names),*],
                    additional_key: &[#(#additional_key),*],
                    manual: &[#(#manual),*],
                    queries: &[#((#query_names, #query_sql)),*],
                    order_from: #order_from,
                    order_to: #order_to,
                };
                &SCHEMA
            }

            fn assemble(from: #from_ty, to: #to_ty) -> Self {
                Self {
                    #from_ident: from,
                    #to_ident: to,
                    #(#others: Default::default(),)*
                }
            }

            fn from_entity(&self) -> &#from_ty {
                &self.#from_ident
            }

            fn to_entity(&self) -> &#to_ty {
                &self.#to_ident
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
                        "link `{}` has no property `{}`",
                        #table, name
                    ))),
                }
            }
        }
    })
}
