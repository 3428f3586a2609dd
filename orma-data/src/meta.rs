//! Per-type metadata descriptors.
//!
//! A [`Descriptor`] is computed once per `(connection target, type)` from
//! the type's declared schema plus one introspection round trip per column,
//! then kept for the lifetime of the process (see [`Registry`](crate::Registry)).
//! It owns the property → column map, the introspected column definitions,
//! and the SQL templates of every operation, expanded lazily and memoized.
//!
//! # Placeholders
//!
//! | Placeholder | Expansion |
//! |-------------|-----------|
//! | `{table}` | quoted table name |
//! | `{key}` / `{keybind}` | quoted key column / its named bind |
//! | `{colspec}` | projection of the automatic columns |
//! | `{readspec}` | projection of every mapped non-key column |
//! | `{fieldset}` | `` `col`=:col `` assignments of the automatic columns |
//! | `{columns}` / `{values}` | automatic column list / bind list |
//! | `{+colspec}` `{+fieldset}` `{+columns}` `{+values}` | same, prefixed with `, `, empty when there are no automatic columns |
//!
//! Link descriptors add their own placeholders, see [`LinkDescriptor`](crate::LinkDescriptor).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;

use crate::column::{column_name, ColumnDef, ColumnKind};
use crate::database::Database;
use crate::dialect::Dialect;
use crate::error::DataError;
use crate::link_meta::LinkParts;
use crate::params::Params;
use crate::value::{Row, Value};

/// Property name that always maps to the key column.
pub const ID_PROPERTY: &str = "id";

/// Names of the built-in operations of plain entities.
pub const ENTITY_BUILTINS: &[&str] = &["select", "insert", "update", "delete"];

/// Declared shape handed to [`Descriptor::introspect`].
pub(crate) struct Shape<'a> {
    pub table: &'a str,
    pub key: Option<&'a str>,
    pub properties: &'a [&'a str],
    pub manual: Vec<String>,
    pub queries: &'a [(&'a str, &'a str)],
    pub link: Option<LinkParts>,
}

/// Cached metadata and SQL for one entity or link type.
pub struct Descriptor {
    table: String,
    key: Option<String>,
    dialect: Dialect,
    column_map: BTreeMap<String, String>,
    column_def: HashMap<String, ColumnDef>,
    manual: BTreeSet<String>,
    templates: BTreeMap<String, String>,
    sql_cache: DashMap<String, Arc<str>>,
    pub(crate) link: Option<LinkParts>,
}

impl Descriptor {
    /// Build a descriptor from a declared shape, introspecting each column once.
    pub(crate) async fn introspect(db: &mut Database, shape: Shape<'_>) -> Result<Self, DataError> {
        if shape.table.is_empty() {
            return Err(DataError::Config("type declares no table".into()));
        }
        if shape.key.is_some_and(str::is_empty) {
            return Err(DataError::Config(format!(
                "table `{}` declares no key column",
                shape.table
            )));
        }

        let dialect = db.dialect();
        let strict = db.options().strict_schema;
        let mut column_map = BTreeMap::new();
        let mut column_def = HashMap::new();
        let mut missing = Vec::new();

        if let Some(key) = shape.key {
            column_map.insert(ID_PROPERTY.to_string(), key.to_string());
        }

        for property in shape.properties {
            if *property == ID_PROPERTY {
                continue;
            }
            let column = column_name(property);
            let sql = dialect.describe_sql(shape.table, &column);
            let rows: Vec<Row> = db
                .query_with(&sql, Params::None, "describe")
                .await?
                .collect();
            match dialect.parse_describe(&column, &rows) {
                Some(def) => {
                    column_map.insert(property.to_string(), column.clone());
                    column_def.insert(column, def);
                }
                None => missing.push(column),
            }
        }

        if !missing.is_empty() {
            if strict {
                return Err(DataError::Schema {
                    table: shape.table.to_string(),
                    missing,
                });
            }
            tracing::warn!(
                table = shape.table,
                ?missing,
                "columns not found, properties excluded from persistence"
            );
        }

        let manual: BTreeSet<String> = shape
            .manual
            .into_iter()
            .filter(|col| column_def.contains_key(col))
            .collect();

        let mut descriptor = Self {
            table: shape.table.to_string(),
            key: shape.key.map(str::to_string),
            dialect,
            column_map,
            column_def,
            manual,
            templates: BTreeMap::new(),
            sql_cache: DashMap::new(),
            link: shape.link,
        };

        let builtins = descriptor.builtin_templates();
        for (name, template) in &builtins {
            descriptor
                .templates
                .insert((*name).to_string(), template.clone());
        }
        for (name, template) in shape.queries {
            if builtins.iter().any(|(b, _)| b == name) {
                return Err(DataError::Config(format!(
                    "custom query `{name}` on `{}` shadows a built-in operation",
                    shape.table
                )));
            }
            descriptor
                .templates
                .insert((*name).to_string(), (*template).to_string());
        }

        tracing::debug!(
            table = %descriptor.table,
            columns = descriptor.column_def.len(),
            manual = descriptor.manual.len(),
            "descriptor built"
        );
        Ok(descriptor)
    }

    fn builtin_templates(&self) -> Vec<(&'static str, String)> {
        if self.link.is_some() {
            return LinkParts::builtin_templates(self.dialect);
        }
        let insert = if self.automatic_columns().is_empty() {
            match self.dialect {
                Dialect::MySql => "INSERT INTO {table} () VALUES ()",
                Dialect::Sqlite => "INSERT INTO {table} DEFAULT VALUES",
            }
        } else {
            self.dialect.insert_template()
        };
        vec![
            (
                "select",
                "SELECT {readspec} FROM {table} WHERE {key}={keybind}".to_string(),
            ),
            ("insert", insert.to_string()),
            (
                "update",
                "UPDATE {table} SET {fieldset} WHERE {key}={keybind}".to_string(),
            ),
            ("delete", "DELETE FROM {table} WHERE {key}={keybind}".to_string()),
        ]
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Key column, `None` for link descriptors (composite key).
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Property name → column name, iterated in property-name order.
    pub fn column_map(&self) -> &BTreeMap<String, String> {
        &self.column_map
    }

    pub fn column_def(&self, column: &str) -> Option<&ColumnDef> {
        self.column_def.get(column)
    }

    pub fn manual_columns(&self) -> impl Iterator<Item = &str> {
        self.manual.iter().map(String::as_str)
    }

    pub fn is_manual(&self, column: &str) -> bool {
        self.manual.contains(column)
    }

    /// Property mapped to `column`.
    pub fn property_for(&self, column: &str) -> Option<&str> {
        self.column_map
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map(|(p, _)| p.as_str())
    }

    /// Names of the registered operations (built-in and custom).
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    fn is_key(&self, column: &str) -> bool {
        self.key.as_deref() == Some(column)
    }

    /// Mapped columns written on insert/update: everything except the key
    /// and manual columns, in property order.
    pub fn automatic_columns(&self) -> Vec<&str> {
        self.column_map
            .values()
            .map(String::as_str)
            .filter(|c| !self.is_key(c) && !self.manual.contains(*c))
            .collect()
    }

    /// Every mapped column except the key, in property order.
    pub fn read_columns(&self) -> Vec<&str> {
        self.column_map
            .values()
            .map(String::as_str)
            .filter(|c| !self.is_key(c))
            .collect()
    }

    fn kind_of(&self, column: &str) -> ColumnKind {
        self.column_def
            .get(column)
            .map_or(ColumnKind::Plain, |d| d.kind)
    }

    /// Projection list. Temporal columns are converted to integer seconds
    /// and aliased back to their bare column name. With a `prefix`, every
    /// column is qualified by it and aliased.
    pub fn columns_sql(&self, cols: Option<&[&str]>, prefix: Option<&str>, glue: &str) -> String {
        let all;
        let cols = match cols {
            Some(c) => c,
            None => {
                all = self.automatic_columns();
                &all
            }
        };
        cols.iter()
            .map(|col| {
                let quoted = self.dialect.quote(col);
                let expr = match prefix {
                    Some(p) => format!("{}.{quoted}", self.dialect.quote(p)),
                    None => quoted.clone(),
                };
                let kind = self.kind_of(col);
                if kind.is_temporal() {
                    format!("{} AS {quoted}", self.dialect.project_temporal(kind, &expr))
                } else if prefix.is_some() {
                    format!("{expr} AS {quoted}")
                } else {
                    expr
                }
            })
            .collect::<Vec<_>>()
            .join(glue)
    }

    /// Bind expression for a column: `:col` or `?`, wrapped in the inverse
    /// temporal conversion for temporal columns.
    pub fn bind_sql(&self, column: &str, by_name: bool) -> String {
        let bind = if by_name {
            format!(":{column}")
        } else {
            self.dialect.placeholder(0)
        };
        self.dialect.bind_temporal(self.kind_of(column), &bind)
    }

    /// Assignment fragments `` `col`=<bind> ``.
    pub fn field_set_sql(&self, cols: Option<&[&str]>, by_name: bool, glue: &str) -> String {
        let all;
        let cols = match cols {
            Some(c) => c,
            None => {
                all = self.automatic_columns();
                &all
            }
        };
        cols.iter()
            .map(|col| format!("{}={}", self.dialect.quote(col), self.bind_sql(col, by_name)))
            .collect::<Vec<_>>()
            .join(glue)
    }

    fn prefixed(fragment: String) -> String {
        if fragment.is_empty() {
            fragment
        } else {
            format!(", {fragment}")
        }
    }

    /// Resolve one placeholder name, `None` when unrecognized.
    fn resolve(&self, name: &str) -> Option<String> {
        if let Some(link) = &self.link {
            if let Some(expansion) = link.resolve(self, name) {
                return Some(expansion);
            }
        }
        let automatic = self.automatic_columns();
        let expansion = match name {
            "table" => self.dialect.quote(&self.table),
            "key" => self.dialect.quote(self.key.as_deref()?),
            "keybind" => format!(":{}", self.key.as_deref()?),
            "colspec" => self.columns_sql(Some(&automatic), None, ", "),
            "readspec" => {
                let read = self.read_columns();
                if read.is_empty() {
                    self.dialect.quote(self.key.as_deref()?)
                } else {
                    self.columns_sql(Some(&read), None, ", ")
                }
            }
            "fieldset" => self.field_set_sql(Some(&automatic), true, ", "),
            "columns" => self.column_list(&automatic),
            "values" => self.bind_list(&automatic),
            "+colspec" => Self::prefixed(self.columns_sql(Some(&automatic), None, ", ")),
            "+fieldset" => Self::prefixed(self.field_set_sql(Some(&automatic), true, ", ")),
            "+columns" => Self::prefixed(self.column_list(&automatic)),
            "+values" => Self::prefixed(self.bind_list(&automatic)),
            _ => return None,
        };
        Some(expansion)
    }

    pub(crate) fn column_list(&self, cols: &[&str]) -> String {
        cols.iter()
            .map(|c| self.dialect.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn bind_list(&self, cols: &[&str]) -> String {
        cols.iter()
            .map(|c| self.bind_sql(c, true))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Expand an arbitrary template against this descriptor.
    pub fn expand(&self, template: &str) -> String {
        expand_placeholders(template, |name| self.resolve(name))
    }

    /// Expand an operation's template without touching the cache.
    pub fn build_sql(&self, op: &str) -> Result<String, DataError> {
        let template = self.templates.get(op).ok_or_else(|| {
            DataError::Config(format!("no operation `{op}` registered for `{}`", self.table))
        })?;
        Ok(self.expand(template))
    }

    /// Expanded SQL of an operation, memoized per descriptor.
    pub fn sql(&self, op: &str) -> Result<Arc<str>, DataError> {
        if let Some(cached) = self.sql_cache.get(op) {
            return Ok(Arc::clone(cached.value()));
        }
        let sql: Arc<str> = Arc::from(self.build_sql(op)?);
        self.sql_cache.insert(op.to_string(), Arc::clone(&sql));
        Ok(sql)
    }

    /// Named parameters for `columns`, reading each mapped property via `get`.
    pub fn bind_columns(
        &self,
        columns: &[&str],
        get: impl Fn(&str) -> Option<Value>,
    ) -> Result<Params, DataError> {
        let mut params = Params::None;
        for column in columns {
            let property = self.property_for(column).ok_or_else(|| {
                DataError::Config(format!("column `{column}` of `{}` is not mapped", self.table))
            })?;
            let value = get(property).ok_or_else(|| {
                DataError::Config(format!(
                    "`{}` declares property `{property}` but does not expose it",
                    self.table
                ))
            })?;
            params.bind(*column, value);
        }
        Ok(params)
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("table", &self.table)
            .field("key", &self.key)
            .field("column_map", &self.column_map)
            .field("manual", &self.manual)
            .field("operations", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Replace `{name}` placeholders using `resolve`; unknown names stay verbatim.
pub fn expand_placeholders(template: &str, resolve: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}');
        let name = close.map(|c| &after[..c]);
        match name {
            Some(n) if is_placeholder_name(n) => {
                match resolve(n) {
                    Some(expansion) => out.push_str(&expansion),
                    None => {
                        out.push('{');
                        out.push_str(n);
                        out.push('}');
                    }
                }
                rest = &after[n.len() + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    let body = name.strip_prefix('+').unwrap_or(name);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}
