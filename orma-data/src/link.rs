use std::any::{Any, TypeId};

use async_trait::async_trait;

use crate::database::Database;
use crate::dialect::LockMode;
use crate::entity::{Crud, Entity};
use crate::error::DataError;
use crate::link_meta::LinkDescriptor;
use crate::params::Params;
use crate::value::Value;

/// Declared persistence shape of a link (association) type.
///
/// Usually produced by `#[derive(Link)]`:
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
#[derive(Debug, Clone, Copy)]
pub struct LinkSchema {
    pub table: &'static str,
    /// Overrides the derived `<from table>_id` key column.
    pub from_key: Option<&'static str>,
    /// Overrides the derived `<to table>_id` key column.
    pub to_key: Option<&'static str>,
    /// Persistable payload property names, including additional keys.
    pub properties: &'static [&'static str],
    /// Properties that extend the composite key.
    pub additional_key: &'static [&'static str],
    pub manual: &'static [&'static str],
    pub queries: &'static [(&'static str, &'static str)],
    /// `ORDER BY` body applied when loading links of a `From` entity.
    pub order_from: Option<&'static str>,
    /// `ORDER BY` body applied when loading links of a `To` entity.
    pub order_to: Option<&'static str>,
}

/// An association row between a `From` and a `To` entity, with payload.
///
/// Endpoint types are fixed at compile time; a link always holds both
/// endpoint entities.
pub trait Link: Send + Sync + Sized + 'static {
    type From: Entity + Default + Clone;
    type To: Entity + Default + Clone;

    fn schema() -> &'static LinkSchema;

    /// Build a link with default payload from its two endpoints.
    fn assemble(from: Self::From, to: Self::To) -> Self;

    fn from_entity(&self) -> &Self::From;

    fn to_entity(&self) -> &Self::To;

    fn property(&self, name: &str) -> Option<Value>;

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), DataError>;
}

/// Which endpoint of a link an entity sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    From,
    To,
}

impl Side {
    /// Side of `E` in link `L`. `From` wins when both endpoints share a type.
    pub fn of<L: Link, E: Entity>() -> Option<Side> {
        let id = TypeId::of::<E>();
        if id == TypeId::of::<L::From>() {
            Some(Side::From)
        } else if id == TypeId::of::<L::To>() {
            Some(Side::To)
        } else {
            None
        }
    }
}

fn require_saved<E: Entity>(entity: &E, role: &str) -> Result<(), DataError> {
    if entity.is_saved() {
        Ok(())
    } else {
        Err(DataError::InvalidArgument(format!(
            "{role} endpoint `{}` is not saved",
            E::schema().table
        )))
    }
}

fn label(descriptor: &LinkDescriptor, op: &str) -> String {
    format!("{}::{op}", descriptor.table())
}

fn foreign_entity<L: Link, E: Entity>() -> DataError {
    DataError::InvalidArgument(format!(
        "`{}` is not an endpoint of link `{}`",
        E::schema().table,
        L::schema().table
    ))
}

/// Key binds of a link row: both endpoint ids and the additional keys.
fn key_params<L: Link>(descriptor: &LinkDescriptor, link: &L) -> Result<Params, DataError> {
    let mut params = Params::None;
    params.bind(descriptor.from_key(), link.from_entity().id());
    params.bind(descriptor.to_key(), link.to_entity().id());
    let additional = descriptor.additional_key();
    if let Params::Named(extra) = descriptor.bind_columns(&additional, |p| link.property(p))? {
        for (name, value) in extra {
            params.bind(name, value);
        }
    }
    Ok(params)
}

/// Persistence of link rows and traversal from either endpoint.
#[async_trait]
pub trait LinkCrud: Link {
    /// Pair two saved endpoints with default payload.
    fn between(from: Self::From, to: Self::To) -> Result<Self, DataError> {
        require_saved(&from, "from")?;
        require_saved(&to, "to")?;
        Ok(Self::assemble(from, to))
    }

    /// Insert the link row. Both endpoints must be saved.
    async fn insert(&self, db: &mut Database) -> Result<(), DataError>;

    /// Rewrite the payload of the row matching the full key.
    async fn update(&self, db: &mut Database) -> Result<u64, DataError>;

    /// Delete the row matching the full key.
    async fn delete(&self, db: &mut Database) -> Result<u64, DataError>;

    /// All links of `entity`, which must be the `From` or `To` endpoint type.
    ///
    /// Rows whose opposite endpoint no longer exists are skipped.
    async fn load_for<E: Entity>(db: &mut Database, entity: &E) -> Result<Vec<Self>, DataError>;

    /// Delete every link of `entity`.
    async fn delete_for<E: Entity>(db: &mut Database, entity: &E) -> Result<u64, DataError>;
}

#[async_trait]
impl<L: Link> LinkCrud for L {
    async fn insert(&self, db: &mut Database) -> Result<(), DataError> {
        require_saved(self.from_entity(), "from")?;
        require_saved(self.to_entity(), "to")?;
        let descriptor = db.link_descriptor::<L>().await?;
        let sql = descriptor.sql("insert")?;
        let mut params = key_params(&descriptor, self)?;
        if let Params::Named(payload) =
            descriptor.bind_columns(&descriptor.automatic_columns(), |p| self.property(p))?
        {
            for (name, value) in payload {
                params.bind(name, value);
            }
        }

        let mut tables = vec![
            descriptor.table(),
            <L::From as Entity>::schema().table,
            <L::To as Entity>::schema().table,
        ];
        tables.dedup();
        let label = label(&descriptor, "insert");

        db.ensure_unlocked(&tables)?;
        let locked = db.lock(&tables, LockMode::Write).await;
        let inserted = match locked {
            Ok(()) => db.query_with(&sql, params, &label).await.map(|c| c.free()),
            Err(err) => Err(err),
        };
        let unlocked = db.unlock().await;

        inserted?;
        unlocked
    }

    async fn update(&self, db: &mut Database) -> Result<u64, DataError> {
        require_saved(self.from_entity(), "from")?;
        require_saved(self.to_entity(), "to")?;
        let descriptor = db.link_descriptor::<L>().await?;
        let automatic = descriptor.automatic_columns();
        if automatic.is_empty() {
            return Ok(0);
        }
        let sql = descriptor.sql("update")?;
        let mut params = descriptor.bind_columns(&automatic, |p| self.property(p))?;
        if let Params::Named(keys) = key_params(&descriptor, self)? {
            for (name, value) in keys {
                params.bind(name, value);
            }
        }
        let cursor = db
            .query_with(&sql, params, &label(&descriptor, "update"))
            .await?;
        Ok(cursor.rows_affected())
    }

    async fn delete(&self, db: &mut Database) -> Result<u64, DataError> {
        let descriptor = db.link_descriptor::<L>().await?;
        let sql = descriptor.sql("delete")?;
        let params = key_params(&descriptor, self)?;
        let cursor = db
            .query_with(&sql, params, &label(&descriptor, "delete"))
            .await?;
        Ok(cursor.rows_affected())
    }

    async fn load_for<E: Entity>(db: &mut Database, entity: &E) -> Result<Vec<Self>, DataError> {
        let side = Side::of::<L, E>().ok_or_else(foreign_entity::<L, E>)?;
        require_saved(entity, "link")?;
        let descriptor = db.link_descriptor::<L>().await?;
        let (op, key) = match side {
            Side::From => ("load_from", descriptor.from_key()),
            Side::To => ("load_to", descriptor.to_key()),
        };
        let sql = descriptor.sql(op)?;
        let mut params = Params::None;
        params.bind(key, entity.id());
        let mut cursor = db
            .query_with(&sql, params, &label(&descriptor, op))
            .await?;

        let payload = descriptor.payload_columns();
        let mut links = Vec::with_capacity(cursor.remaining());
        while let Some(row) = cursor.next_row() {
            let mut values = row.into_values().into_iter();
            let Some(opposite) = values.next().and_then(|v| v.as_i64()) else {
                tracing::warn!(table = descriptor.table(), column = key, "link row without endpoint id, row skipped");
                continue;
            };
            let link = match side {
                Side::From => {
                    let from = (entity as &dyn Any)
                        .downcast_ref::<L::From>()
                        .ok_or_else(foreign_entity::<L, E>)?;
                    match <L::To as Crud>::load(db, opposite).await? {
                        Some(to) => L::assemble(from.clone(), to),
                        None => {
                            tracing::warn!(table = descriptor.table(), id = opposite, "link target missing, row skipped");
                            continue;
                        }
                    }
                }
                Side::To => {
                    let to = (entity as &dyn Any)
                        .downcast_ref::<L::To>()
                        .ok_or_else(foreign_entity::<L, E>)?;
                    match <L::From as Crud>::load(db, opposite).await? {
                        Some(from) => L::assemble(from, to.clone()),
                        None => {
                            tracing::warn!(table = descriptor.table(), id = opposite, "link source missing, row skipped");
                            continue;
                        }
                    }
                }
            };
            let mut link = link;
            for (column, value) in payload.iter().zip(values) {
                if let Some(property) = descriptor.property_for(column) {
                    link.set_property(property, value)?;
                }
            }
            links.push(link);
        }
        Ok(links)
    }

    async fn delete_for<E: Entity>(db: &mut Database, entity: &E) -> Result<u64, DataError> {
        let side = Side::of::<L, E>().ok_or_else(foreign_entity::<L, E>)?;
        require_saved(entity, "link")?;
        let descriptor = db.link_descriptor::<L>().await?;
        let (op, key) = match side {
            Side::From => ("delete_from", descriptor.from_key()),
            Side::To => ("delete_to", descriptor.to_key()),
        };
        let sql = descriptor.sql(op)?;
        let mut params = Params::None;
        params.bind(key, entity.id());
        let cursor = db
            .query_with(&sql, params, &label(&descriptor, op))
            .await?;
        Ok(cursor.rows_affected())
    }
}
