//! Link metadata: a [`Descriptor`] extended with the composite key of an
//! association table.
//!
//! Key columns are the two endpoint keys plus any additional-key columns.
//! Endpoint keys are derived as `<endpoint table>_id`. Additional-key columns
//! are mapped properties that count as manual, so they never appear in
//! `{colspec}`/`{fieldset}`.
//!
//! | Placeholder | Expansion |
//! |-------------|-----------|
//! | `{keyspec}` | key assignments glued with ` AND ` |
//! | `{keyset}` | key assignments glued with `, ` |
//! | `{keycolumns}` / `{keyvalues}` | key column list / bind list |
//! | `{+addkey}` | `, ` + additional-key projection, empty without one |
//! | `{from_key}` `{to_key}` | quoted endpoint key columns |
//! | `{from_keybind}` `{to_keybind}` | named binds of the endpoint keys |
//! | `{orderfrom}` `{orderto}` | ` ORDER BY ...` when an ordering is declared |

use std::ops::Deref;

use crate::database::Database;
use crate::dialect::Dialect;
use crate::error::DataError;
use crate::meta::{Descriptor, Shape};

/// Names of the built-in operations of links.
pub const LINK_BUILTINS: &[&str] = &[
    "insert",
    "update",
    "delete",
    "load_from",
    "load_to",
    "delete_from",
    "delete_to",
];

/// Link-only part of a descriptor.
#[derive(Debug, Clone)]
pub(crate) struct LinkParts {
    from_key: String,
    to_key: String,
    additional_key: Vec<String>,
    order_from: Option<String>,
    order_to: Option<String>,
}

impl LinkParts {
    pub(crate) fn builtin_templates(dialect: Dialect) -> Vec<(&'static str, String)> {
        vec![
            ("insert", dialect.link_insert_template().to_string()),
            ("update", "UPDATE {table} SET {fieldset} WHERE {keyspec}".to_string()),
            ("delete", "DELETE FROM {table} WHERE {keyspec}".to_string()),
            (
                "load_from",
                "SELECT {to_key}{+addkey}{+colspec} FROM {table} \
                 WHERE {from_key}={from_keybind}{orderfrom}"
                    .to_string(),
            ),
            (
                "load_to",
                "SELECT {from_key}{+addkey}{+colspec} FROM {table} \
                 WHERE {to_key}={to_keybind}{orderto}"
                    .to_string(),
            ),
            (
                "delete_from",
                "DELETE FROM {table} WHERE {from_key}={from_keybind}".to_string(),
            ),
            (
                "delete_to",
                "DELETE FROM {table} WHERE {to_key}={to_keybind}".to_string(),
            ),
        ]
    }

    fn key_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.from_key.as_str(), self.to_key.as_str()];
        cols.extend(self.additional_key.iter().map(String::as_str));
        cols
    }

    fn order_clause(order: Option<&str>) -> String {
        match order {
            Some(o) if !o.trim().is_empty() => format!(" ORDER BY {o}"),
            _ => String::new(),
        }
    }

    pub(crate) fn resolve(&self, base: &Descriptor, name: &str) -> Option<String> {
        let dialect = base.dialect();
        let keys = self.key_columns();
        let additional: Vec<&str> = self.additional_key.iter().map(String::as_str).collect();
        let expansion = match name {
            "keyspec" => base.field_set_sql(Some(&keys), true, " AND "),
            "keyset" => base.field_set_sql(Some(&keys), true, ", "),
            "keycolumns" => base.column_list(&keys),
            "keyvalues" => base.bind_list(&keys),
            "+addkey" if additional.is_empty() => String::new(),
            "+addkey" => format!(", {}", base.columns_sql(Some(&additional), None, ", ")),
            "from_key" => dialect.quote(&self.from_key),
            "to_key" => dialect.quote(&self.to_key),
            "from_keybind" => format!(":{}", self.from_key),
            "to_keybind" => format!(":{}", self.to_key),
            "orderfrom" => Self::order_clause(self.order_from.as_deref()),
            "orderto" => Self::order_clause(self.order_to.as_deref()),
            _ => return None,
        };
        Some(expansion)
    }
}

/// Declared shape of a link type, assembled from its schema.
pub(crate) struct LinkShape<'a> {
    pub table: &'a str,
    pub from_table: &'a str,
    pub to_table: &'a str,
    pub from_key: Option<&'a str>,
    pub to_key: Option<&'a str>,
    pub properties: &'a [&'a str],
    pub additional_key: &'a [&'a str],
    pub manual: &'a [&'a str],
    pub queries: &'a [(&'a str, &'a str)],
    pub order_from: Option<&'a str>,
    pub order_to: Option<&'a str>,
}

/// Cached metadata and SQL for one link type.
///
/// Dereferences to the underlying [`Descriptor`] for the column helpers.
#[derive(Debug)]
pub struct LinkDescriptor {
    inner: Descriptor,
}

impl LinkDescriptor {
    pub(crate) async fn introspect(
        db: &mut Database,
        shape: LinkShape<'_>,
    ) -> Result<Self, DataError> {
        let from_key = shape
            .from_key
            .map_or_else(|| format!("{}_id", shape.from_table), str::to_string);
        let to_key = shape
            .to_key
            .map_or_else(|| format!("{}_id", shape.to_table), str::to_string);
        if from_key == to_key {
            return Err(DataError::Config(format!(
                "link `{}` derives the same key column `{from_key}` for both endpoints",
                shape.table
            )));
        }

        let additional_key: Vec<String> = shape
            .additional_key
            .iter()
            .map(|p| crate::column::column_name(p))
            .collect();
        let mut manual: Vec<String> = shape
            .manual
            .iter()
            .map(|p| crate::column::column_name(p))
            .collect();
        manual.extend(additional_key.iter().cloned());

        let mut properties: Vec<&str> = shape.additional_key.to_vec();
        properties.extend(
            shape
                .properties
                .iter()
                .filter(|p| !shape.additional_key.contains(*p)),
        );

        let parts = LinkParts {
            from_key,
            to_key,
            additional_key,
            order_from: shape.order_from.map(str::to_string),
            order_to: shape.order_to.map(str::to_string),
        };

        let inner = Descriptor::introspect(
            db,
            Shape {
                table: shape.table,
                key: None,
                properties: &properties,
                manual,
                queries: shape.queries,
                link: Some(parts),
            },
        )
        .await?;

        if let Some(parts) = &inner.link {
            let unmapped: Vec<&String> = parts
                .additional_key
                .iter()
                .filter(|c| inner.column_def(c).is_none())
                .collect();
            if !unmapped.is_empty() {
                return Err(DataError::Schema {
                    table: shape.table.to_string(),
                    missing: unmapped.into_iter().cloned().collect(),
                });
            }
        }

        Ok(Self { inner })
    }

    fn parts(&self) -> Option<&LinkParts> {
        self.inner.link.as_ref()
    }

    pub fn from_key(&self) -> &str {
        self.parts().map_or("", |p| p.from_key.as_str())
    }

    pub fn to_key(&self) -> &str {
        self.parts().map_or("", |p| p.to_key.as_str())
    }

    /// Additional-key columns, in declaration order.
    pub fn additional_key(&self) -> Vec<&str> {
        self.parts()
            .map(|p| p.additional_key.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every key column: from, to, then the additional keys.
    pub fn key_columns(&self) -> Vec<&str> {
        self.parts().map(LinkParts::key_columns).unwrap_or_default()
    }

    /// Columns returned after the opposite endpoint key by `load_from` /
    /// `load_to`, in result order.
    pub fn payload_columns(&self) -> Vec<&str> {
        let mut cols = self.additional_key();
        cols.extend(self.inner.automatic_columns());
        cols
    }
}

impl Deref for LinkDescriptor {
    type Target = Descriptor;

    fn deref(&self) -> &Descriptor {
        &self.inner
    }
}
