extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod crate_path;
pub(crate) mod entity_derive;
pub(crate) mod link_derive;
pub(crate) mod parsing;

/// Derive macro implementing `Entity` for a struct mapped to one table row.
///
/// # Struct-level attribute
///
/// `#[entity(...)]` configures the mapping and may be repeated:
///
/// | Parameter | Required | Description |
/// |-----------|----------|-------------|
/// | `table`   | no       | Table name (default: the struct name in snake case) |
/// | `key`     | no       | Key column (default: `<table>_id`) |
/// | `query(name = "...", sql = "...")` | no | Custom named operation; the template may use `{table}`, `{readspec}`, `{fieldset}`, ... |
///
/// # Field attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[entity(id)]` | The `i64` key field. A field named `id` is used when none is marked. |
/// | `#[entity(manual)]` | Persisted, but never written by the generated insert/update. |
/// | `#[entity(skip)]` | Not persisted. |
///
/// Every other field is a property; its column is the field name. Property
/// types implement `ToValue` and `FromValue`.
///
/// # Example
///
/// ```ignore
/// use orma::prelude::*;
///
/// #[derive(Debug, Clone, Default, Entity)]
/// #[entity(table = "widget", key = "widget_id")]
/// #[entity(query(name = "by_mess", sql = "SELECT {readspec} FROM {table} WHERE `mess`=:mess"))]
/// pub struct Widget {
///     pub id: i64,
///     pub a_date: i64,
///     pub mess: String,
///     #[entity(manual)]
///     pub created_at: i64,
///     #[entity(skip)]
///     pub dirty: bool,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_derive::expand(input)
}

/// Derive macro implementing `Link` for an association between two entities.
///
/// Settings go in `#[orma(...)]`, since `#[link]` is a built-in attribute.
///
/// # Struct-level attribute
///
/// | Parameter | Required | Description |
/// |-----------|----------|-------------|
/// | `table`   | no       | Link table (default: the struct name in snake case) |
/// | `from_key` / `to_key` | no | Key columns (default: `<endpoint table>_id`) |
/// | `order_from` | no    | `ORDER BY` body used when loading the links of a `from` entity |
/// | `order_to` | no      | `ORDER BY` body used when loading the links of a `to` entity |
/// | `query(name = "...", sql = "...")` | no | Custom named operation |
///
/// # Field attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[orma(from)]` | **Required.** The `from` endpoint entity. |
/// | `#[orma(to)]` | **Required.** The `to` endpoint entity. |
/// | `#[orma(additional_key)]` | Payload property that extends the composite key. |
/// | `#[orma(manual)]` | Persisted, but never written by the generated statements. |
/// | `#[orma(skip)]` | Not persisted. |
///
/// Non-endpoint fields must implement `Default` (used by `Link::assemble`).
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Link)]
/// #[orma(table = "user_group", order_from = "`joined` DESC")]
/// pub struct Membership {
///     #[orma(from)]
///     pub user: User,
///     #[orma(to)]
///     pub group: Group,
///     pub joined: i64,
/// }
/// ```
#[proc_macro_derive(Link, attributes(orma))]
pub fn derive_link(input: TokenStream) -> TokenStream {
    link_derive::expand(input)
}
