//! Attribute parsing shared by the `Entity` and `Link` derives.

use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Fields, Token};

/// `UserGroup` -> `user_group`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Property name of a field (raw identifiers lose their `r#`).
pub fn property_name(ident: &syn::Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}

/// Named fields of a struct, or an error naming the derive.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a Punctuated<syn::Field, Token![,]>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => Ok(&named.named),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                format!("#[derive({derive})] only works on structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("#[derive({derive})] only works on structs"),
        )),
    }
}

/// Parse `key = "value"` into a string.
pub fn string_value(meta: &ParseNestedMeta) -> syn::Result<String> {
    let lit: syn::LitStr = meta.value()?.parse()?;
    let value = lit.value();
    if value.trim().is_empty() {
        return Err(syn::Error::new_spanned(lit, "value must not be empty"));
    }
    Ok(value)
}

/// Parse a nested `query(name = "...", sql = "...")`.
pub fn custom_query(meta: &ParseNestedMeta, attr: &str) -> syn::Result<(String, String)> {
    let mut name = None;
    let mut sql = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            name = Some(string_value(&inner)?);
            Ok(())
        } else if inner.path.is_ident("sql") {
            sql = Some(string_value(&inner)?);
            Ok(())
        } else {
            Err(inner.error(format!(
                "expected `name` or `sql` in #[{attr}(query(...))]"
            )))
        }
    })?;
    match (name, sql) {
        (Some(name), Some(sql)) => Ok((name, sql)),
        _ => Err(meta.error(format!(
            "#[{attr}(query(...))] requires both `name` and `sql`\n\
             \n  example:\n  #[{attr}(query(name = \"by_name\", sql = \"SELECT {{readspec}} FROM {{table}} WHERE `name`=:name\"))]"
        ))),
    }
}

/// Reject a custom query that reuses a name.
pub fn push_query(
    queries: &mut Vec<(String, String)>,
    query: (String, String),
    span: &syn::Ident,
) -> syn::Result<()> {
    if queries.iter().any(|(name, _)| *name == query.0) {
        return Err(syn::Error::new_spanned(
            span,
            format!("custom query `{}` is declared twice", query.0),
        ));
    }
    queries.push(query);
    Ok(())
}
