use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cursor::Cursor;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::dialect::{Dialect, LockMode};
use crate::driver::{returns_rows, Driver};
use crate::error::DataError;
use crate::params::Params;
use crate::registry::Registry;

/// Behavior switches of the execution wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Report every executed statement to the diagnostic sink.
    pub log_statements: bool,
    /// Measure every statement and include the elapsed time in the report.
    pub time_statements: bool,
    /// Fail descriptor construction when a declared property has no column.
    /// When off, such properties are silently left out of persistence.
    pub strict_schema: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            log_statements: false,
            time_statements: false,
            strict_schema: true,
        }
    }
}

/// A statement prepared for (repeated) parameterized execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    label: String,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name the statement in diagnostics.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Connection and execution wrapper.
///
/// Owns the live driver connection for one logical request. Every statement
/// goes through here so failures are reported to the diagnostic sink with
/// the offending SQL and operation label, and optionally logged and timed.
///
/// # Example
///
/// ```ignore
/// let mut db = Database::new(driver).with_options(DatabaseOptions {
///     log_statements: true,
///     ..Default::default()
/// });
/// let stmt = db.prepare("SELECT `mess` FROM `widget` WHERE `widget_id`=:id");
/// let mess = db.execute(&stmt, Params::named([("id", 1i64)])).await?.scalar();
/// ```
pub struct Database {
    driver: Box<dyn Driver>,
    options: DatabaseOptions,
    sink: Arc<dyn DiagnosticSink>,
    registry: Arc<Registry>,
    open_cursors: Arc<AtomicUsize>,
    last_insert_id: Option<i64>,
    locked: bool,
}

impl Database {
    /// Wrap a connected driver using the process-wide descriptor registry.
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    pub fn from_boxed(driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            options: DatabaseOptions::default(),
            sink: Arc::new(TracingSink),
            registry: Registry::global(),
            open_cursors: Arc::new(AtomicUsize::new(0)),
            last_insert_id: None,
            locked: false,
        }
    }

    pub fn with_options(mut self, options: DatabaseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a private descriptor registry instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    pub fn target(&self) -> &str {
        self.driver.target()
    }

    pub fn options(&self) -> DatabaseOptions {
        self.options
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    pub(crate) fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Number of cursors handed out and not yet freed.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Whether a table lock is currently held on this connection.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Execute a statement without parameters and return the affected row count.
    pub async fn perform(&mut self, sql: &str, label: &str) -> Result<u64, DataError> {
        let cursor = self.run(sql, &Params::None, label).await?;
        Ok(cursor.rows_affected())
    }

    /// Prepare a statement. Binding happens at [`Database::execute`].
    pub fn prepare(&self, sql: impl Into<String>) -> Statement {
        Statement {
            sql: sql.into(),
            label: "execute".to_string(),
        }
    }

    /// Execute a prepared statement with positional or named values.
    pub async fn execute(&mut self, stmt: &Statement, params: Params) -> Result<Cursor, DataError> {
        self.run(&stmt.sql, &params, &stmt.label).await
    }

    /// One-shot unparameterized query.
    pub async fn query(&mut self, sql: &str) -> Result<Cursor, DataError> {
        self.run(sql, &Params::None, "query").await
    }

    /// Prepare and execute in one step.
    pub async fn query_with(
        &mut self,
        sql: &str,
        params: Params,
        label: &str,
    ) -> Result<Cursor, DataError> {
        self.run(sql, &params, label).await
    }

    /// Identity generated by the most recent non-row-returning statement on
    /// this connection, `None` when the driver reported none for it.
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    /// Fail when this connection already holds table locks.
    ///
    /// Taking a second set of locks would release the first on MySQL, so
    /// nested locking is rejected before any statement is issued.
    pub fn ensure_unlocked(&self, tables: &[&str]) -> Result<(), DataError> {
        if self.locked {
            tracing::warn!(?tables, "lock requested while tables are already locked");
            return Err(DataError::InvalidArgument(format!(
                "cannot lock {tables:?}: tables are already locked on this connection"
            )));
        }
        Ok(())
    }

    /// Acquire coarse table locks. Every successful `lock` must be followed
    /// by exactly one [`Database::unlock`], on success and failure paths alike.
    /// Locks do not nest: see [`Database::ensure_unlocked`].
    pub async fn lock(&mut self, tables: &[&str], mode: LockMode) -> Result<(), DataError> {
        self.ensure_unlocked(tables)?;
        if let Some(sql) = self.dialect().lock_sql(tables, mode) {
            self.run(&sql, &Params::None, "lock").await?;
        }
        self.locked = true;
        Ok(())
    }

    /// Release all table locks held by this connection. The connection
    /// counts as locked until the release statement succeeds.
    pub async fn unlock(&mut self) -> Result<(), DataError> {
        if let Some(sql) = self.dialect().unlock_sql() {
            self.run(&sql, &Params::None, "unlock").await?;
        }
        self.locked = false;
        Ok(())
    }

    async fn run(&mut self, sql: &str, params: &Params, label: &str) -> Result<Cursor, DataError> {
        let (resolved, values) = match params.resolve(sql, self.dialect()) {
            Ok(r) => r,
            Err(err) => {
                self.sink.error(&format!("[{label}] {err}: {sql}"));
                return Err(err);
            }
        };

        let started = Instant::now();
        let result = if returns_rows(&resolved) {
            self.driver
                .fetch(&resolved, &values)
                .await
                .map(|rows| (rows, 0))
        } else {
            self.driver.execute(&resolved, &values).await.map(|outcome| {
                self.last_insert_id = outcome.last_insert_id;
                (Vec::new(), outcome.rows_affected)
            })
        };
        let elapsed = started.elapsed();

        match result {
            Ok((rows, affected)) => {
                if self.options.time_statements {
                    self.sink.info(&format!(
                        "[{label}] {:.3} ms: {sql}",
                        elapsed.as_secs_f64() * 1000.0
                    ));
                } else if self.options.log_statements {
                    self.sink.info(&format!("[{label}] {sql}"));
                }
                Ok(Cursor::new(
                    rows,
                    affected,
                    label,
                    Arc::clone(&self.open_cursors),
                ))
            }
            Err(err) => {
                self.sink.error(&format!("[{label}] {err}: {sql}"));
                Err(DataError::Statement {
                    label: label.to_string(),
                    sql: sql.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("target", &self.driver.target())
            .field("dialect", &self.driver.dialect())
            .field("options", &self.options)
            .field("open_cursors", &self.open_cursors())
            .field("locked", &self.locked)
            .finish()
    }
}
