use async_trait::async_trait;

use crate::column::column_name;
use crate::cursor::Cursor;
use crate::database::Database;
use crate::dialect::LockMode;
use crate::error::DataError;
use crate::meta::{Descriptor, ID_PROPERTY};
use crate::params::Params;
use crate::value::{FromValue, Row, Value};

/// Id assigned to an entity that is not (or no longer) persisted.
///
/// Auto-increment keys are positive, so any id `<= 0` counts as unsaved;
/// this keeps `Default`-constructed entities (id `0`) unsaved too.
pub const UNSAVED_ID: i64 = -1;

/// Declared persistence shape of an entity type.
///
/// Usually produced by `#[derive(Entity)]`:
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Entity)]
/// #[entity(table = "widget", key = "widget_id")]
/// #[entity(query(name = "by_mess", sql = "SELECT {readspec} FROM {table} WHERE `mess`=:mess"))]
/// pub struct Widget {
///     #[entity(id)]
///     pub id: i64,
///     pub a_date: i64,
///     pub mess: String,
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    pub table: &'static str,
    /// Key column; property `id` always maps to it.
    pub key: &'static str,
    /// Persistable property names, excluding `id`.
    pub properties: &'static [&'static str],
    /// Properties whose columns are never written by insert/update.
    pub manual: &'static [&'static str],
    /// Custom operations as `(name, template)`.
    pub queries: &'static [(&'static str, &'static str)],
}

/// A domain object persisted to one table row with an integer key.
///
/// Property access goes through [`Entity::property`] and
/// [`Entity::set_property`] so descriptors can map columns without knowing
/// the concrete type.
pub trait Entity: Send + Sync + 'static {
    fn schema() -> &'static EntitySchema;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Current value of a declared property, `None` for unknown names.
    fn property(&self, name: &str) -> Option<Value>;

    /// Assign a fetched value to a declared property.
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), DataError>;

    fn is_saved(&self) -> bool {
        self.id() > 0
    }
}

/// Build an entity from a fetched row, matching columns by derived name.
/// Columns the entity does not declare are ignored.
pub fn hydrate<E: Entity + Default>(row: &Row) -> Result<E, DataError> {
    let schema = E::schema();
    let mut entity = E::default();
    if let Some(value) = row.get(schema.key) {
        entity.set_id(i64::from_value(value.clone(), schema.key)?);
    }
    for property in schema.properties {
        if let Some(value) = row.get(&column_name(property)) {
            entity.set_property(property, value.clone())?;
        }
    }
    Ok(entity)
}

fn apply_row<E: Entity>(descriptor: &Descriptor, entity: &mut E, row: &Row) -> Result<(), DataError> {
    for (property, column) in descriptor.column_map() {
        if property == ID_PROPERTY {
            continue;
        }
        if let Some(value) = row.get(column) {
            entity.set_property(property, value.clone())?;
        }
    }
    Ok(())
}

fn key_params(descriptor: &Descriptor, id: i64) -> Params {
    let mut params = Params::None;
    if let Some(key) = descriptor.key() {
        params.bind(key, id);
    }
    params
}

fn label(descriptor: &Descriptor, op: &str) -> String {
    format!("{}::{op}", descriptor.table())
}

fn require_saved<E: Entity>(entity: &E, op: &str) -> Result<(), DataError> {
    if entity.is_saved() {
        Ok(())
    } else {
        Err(DataError::InvalidArgument(format!(
            "cannot {op} unsaved `{}` entity",
            E::schema().table
        )))
    }
}

/// Create, read, update and delete by key, plus custom named operations.
///
/// Implemented for every [`Entity`] with a `Default` value.
#[async_trait]
pub trait Crud: Entity + Default + Sized {
    /// Insert the automatic columns and adopt the generated id.
    ///
    /// The table is write-locked around the insert so the id read back is
    /// the one this statement generated. Fails without touching the
    /// connection when it already holds table locks.
    async fn create(&mut self, db: &mut Database) -> Result<i64, DataError>;

    /// Load the row with `id` into `self`. Returns `false` when no such
    /// row exists, leaving `self` unchanged.
    async fn fetch(&mut self, db: &mut Database, id: i64) -> Result<bool, DataError>;

    /// Write the automatic columns to the row keyed by `self.id()`.
    async fn update(&self, db: &mut Database) -> Result<u64, DataError>;

    /// Delete the row keyed by `self.id()` and mark `self` unsaved.
    async fn delete(&mut self, db: &mut Database) -> Result<(), DataError>;

    /// Create when unsaved, update otherwise.
    async fn save(&mut self, db: &mut Database) -> Result<(), DataError> {
        if self.is_saved() {
            self.update(db).await.map(|_| ())
        } else {
            self.create(db).await.map(|_| ())
        }
    }

    /// Fetch into a fresh instance.
    async fn load(db: &mut Database, id: i64) -> Result<Option<Self>, DataError> {
        let mut entity = Self::default();
        if entity.fetch(db, id).await? {
            Ok(Some(entity))
        } else {
            Ok(None)
        }
    }

    /// Run a registered operation (built-in or custom) with caller params.
    async fn run_query(db: &mut Database, op: &str, params: Params) -> Result<Cursor, DataError> {
        let descriptor = db.descriptor::<Self>().await?;
        let sql = descriptor.sql(op)?;
        db.query_with(&sql, params, &label(&descriptor, op)).await
    }
}

#[async_trait]
impl<E: Entity + Default> Crud for E {
    async fn create(&mut self, db: &mut Database) -> Result<i64, DataError> {
        let descriptor = db.descriptor::<E>().await?;
        let sql = descriptor.sql("insert")?;
        let params = descriptor.bind_columns(&descriptor.automatic_columns(), |p| self.property(p))?;
        let label = label(&descriptor, "insert");

        db.ensure_unlocked(&[descriptor.table()])?;
        let locked = db.lock(&[descriptor.table()], LockMode::Write).await;
        let inserted = match locked {
            Ok(()) => match db.query_with(&sql, params, &label).await {
                Ok(cursor) => {
                    cursor.free();
                    db.last_insert_id().ok_or_else(|| {
                        DataError::Other(format!("[{label}] driver reported no generated id"))
                    })
                }
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        let unlocked = db.unlock().await;

        let id = inserted?;
        unlocked?;
        self.set_id(id);
        tracing::debug!(table = descriptor.table(), id, "entity created");
        Ok(id)
    }

    async fn fetch(&mut self, db: &mut Database, id: i64) -> Result<bool, DataError> {
        let descriptor = db.descriptor::<E>().await?;
        let sql = descriptor.sql("select")?;
        let row = db
            .query_with(&sql, key_params(&descriptor, id), &label(&descriptor, "select"))
            .await?
            .row();
        match row {
            Some(row) => {
                apply_row(&descriptor, self, &row)?;
                self.set_id(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update(&self, db: &mut Database) -> Result<u64, DataError> {
        require_saved(self, "update")?;
        let descriptor = db.descriptor::<E>().await?;
        let automatic = descriptor.automatic_columns();
        if automatic.is_empty() {
            return Ok(0);
        }
        let sql = descriptor.sql("update")?;
        let mut params = descriptor.bind_columns(&automatic, |p| self.property(p))?;
        if let Some(key) = descriptor.key() {
            params.bind(key, self.id());
        }
        let cursor = db
            .query_with(&sql, params, &label(&descriptor, "update"))
            .await?;
        Ok(cursor.rows_affected())
    }

    async fn delete(&mut self, db: &mut Database) -> Result<(), DataError> {
        require_saved(self, "delete")?;
        let descriptor = db.descriptor::<E>().await?;
        let sql = descriptor.sql("delete")?;
        db.query_with(&sql, key_params(&descriptor, self.id()), &label(&descriptor, "delete"))
            .await?
            .free();
        self.set_id(UNSAVED_ID);
        Ok(())
    }
}
