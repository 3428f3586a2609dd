use async_trait::async_trait;
use orma_data::{DataError, Dialect, Driver, ExecOutcome, Row, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Column, Connection, Executor as _, Row as _};

use crate::error::SqlxErrorExt;

/// [`Driver`] over a single `sqlx` connection (MySQL or SQLite).
///
/// Statements without values go through the text protocol so that
/// `LOCK TABLES` and `DESCRIBE`, which MySQL refuses to prepare, work too.
pub struct SqlxDriver {
    conn: AnyConnection,
    dialect: Dialect,
    target: String,
}

impl SqlxDriver {
    /// Open a connection. The URL scheme selects the dialect.
    pub async fn connect(url: &str) -> Result<Self, DataError> {
        let dialect = Dialect::from_url(url).ok_or_else(|| {
            DataError::Config(format!("unsupported database URL scheme in `{url}`"))
        })?;
        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(url)
            .await
            .map_err(|e| DataError::Connect(Box::new(e)))?;
        Ok(Self {
            conn,
            dialect,
            target: url.to_string(),
        })
    }

    /// Name the registry target (defaults to the connection URL).
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// The underlying connection, for statements outside the mapping layer.
    pub fn connection_mut(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    values: &[Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

fn decode_value(row: &AnyRow, idx: usize) -> Result<Value, DataError> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::Int));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::Float));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::Text));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return Ok(v.map_or(Value::Null, Value::Bytes));
    }
    row.try_get::<Option<bool>, _>(idx)
        .map(|v| v.map_or(Value::Null, Value::Bool))
        .map_err(SqlxErrorExt::into_data_error)
}

fn decode_row(row: &AnyRow) -> Result<Row, DataError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.push(column.name(), decode_value(row, idx)?);
    }
    Ok(out)
}

#[async_trait]
impl Driver for SqlxDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn execute(&mut self, sql: &str, values: &[Value]) -> Result<ExecOutcome, DataError> {
        let result = if values.is_empty() {
            (&mut self.conn).execute(sqlx::raw_sql(sql)).await
        } else {
            bind_values(sqlx::query(sql), values)
                .execute(&mut self.conn)
                .await
        };
        let result = result.map_err(SqlxErrorExt::into_data_error)?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn fetch(&mut self, sql: &str, values: &[Value]) -> Result<Vec<Row>, DataError> {
        let rows = if values.is_empty() {
            (&mut self.conn).fetch_all(sqlx::raw_sql(sql)).await
        } else {
            bind_values(sqlx::query(sql), values)
                .fetch_all(&mut self.conn)
                .await
        };
        rows.map_err(SqlxErrorExt::into_data_error)?
            .iter()
            .map(decode_row)
            .collect()
    }
}

impl std::fmt::Debug for SqlxDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxDriver")
            .field("dialect", &self.dialect)
            .field("target", &self.target)
            .finish()
    }
}
