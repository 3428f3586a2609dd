use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use orma_data::{DataError, Dialect, Driver, ExecOutcome, Row, Value};

/// Whether a recorded statement went through `fetch` or `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedKind {
    Fetch,
    Execute,
}

/// One statement as it reached the driver: positional SQL plus values.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub kind: RecordedKind,
    pub sql: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Row>),
    Exec(ExecOutcome),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    /// Only match statements bound with exactly these values.
    values: Option<Vec<Value>>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, sql: &str, values: &[Value]) -> bool {
        sql.contains(&self.pattern) && self.values.as_deref().map_or(true, |v| v == values)
    }
}

#[derive(Debug, Default)]
struct State {
    log: Vec<Recorded>,
    rules: Vec<Rule>,
    next_id: i64,
}

/// Error returned for statements scripted to fail.
#[derive(Debug)]
struct ScriptedFailure(String);

impl std::fmt::Display for ScriptedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scripted failure: {}", self.0)
    }
}

impl std::error::Error for ScriptedFailure {}

fn guard(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`Driver`] that records every statement and answers from
/// scripted rules.
///
/// Rules match when their pattern is a substring of the statement (and,
/// for value-scoped rules, the bound values are equal); the most recently
/// added rule wins. Unmatched statements succeed:
/// row-returning ones with no rows, others with one affected row and, for
/// `INSERT`, a fresh incrementing id.
///
/// # Example
///
/// ```ignore
/// let driver = RecordingDriver::mysql()
///     .with_column("widget", "widget_id", "int(11)")
///     .with_column("widget", "a_date", "date");
/// let recording = driver.recording();
/// let mut db = Database::new(driver);
/// // ...
/// assert_eq!(recording.count("LOCK TABLES"), 1);
/// ```
#[derive(Debug)]
pub struct RecordingDriver {
    dialect: Dialect,
    target: String,
    state: Arc<Mutex<State>>,
}

impl RecordingDriver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            target: "recording".to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn mysql() -> Self {
        Self::new(Dialect::MySql)
    }

    pub fn sqlite() -> Self {
        Self::new(Dialect::Sqlite)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Answer the dialect's introspection query for `table.column`.
    pub fn with_column(self, table: &str, column: &str, native_type: &str) -> Self {
        self.recording().describe(table, column, native_type);
        self
    }

    /// [`RecordingDriver::with_column`] for several columns of one table.
    pub fn with_table(self, table: &str, columns: &[(&str, &str)]) -> Self {
        let recording = self.recording();
        for (column, native_type) in columns {
            recording.describe(table, column, native_type);
        }
        self
    }

    pub fn on_fetch(self, pattern: &str, rows: Vec<Row>) -> Self {
        self.recording().on_fetch(pattern, rows);
        self
    }

    pub fn on_fetch_for(self, pattern: &str, values: Vec<Value>, rows: Vec<Row>) -> Self {
        self.recording().on_fetch_for(pattern, values, rows);
        self
    }

    pub fn on_execute(self, pattern: &str, rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        self.recording().on_execute(pattern, rows_affected, last_insert_id);
        self
    }

    pub fn fail_on(self, pattern: &str, message: &str) -> Self {
        self.recording().fail_on(pattern, message);
        self
    }

    /// Handle for inspecting the log (and adding rules) after the driver
    /// has moved into a `Database`.
    pub fn recording(&self) -> Recording {
        Recording {
            dialect: self.dialect,
            state: Arc::clone(&self.state),
        }
    }

    fn answer(&self, kind: RecordedKind, sql: &str, values: &[Value]) -> Reply {
        let mut state = guard(&self.state);
        state.log.push(Recorded {
            kind,
            sql: sql.to_string(),
            values: values.to_vec(),
        });
        let scripted = state
            .rules
            .iter()
            .rev()
            .find(|rule| rule.matches(sql, values))
            .map(|rule| rule.reply.clone());
        match scripted {
            Some(reply) => reply,
            None => match kind {
                RecordedKind::Fetch => Reply::Rows(Vec::new()),
                RecordedKind::Execute => {
                    let inserted = sql.trim_start().to_ascii_uppercase().starts_with("INSERT");
                    let last_insert_id = inserted.then(|| {
                        state.next_id += 1;
                        state.next_id
                    });
                    Reply::Exec(ExecOutcome {
                        rows_affected: 1,
                        last_insert_id,
                    })
                }
            },
        }
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn execute(&mut self, sql: &str, values: &[Value]) -> Result<ExecOutcome, DataError> {
        match self.answer(RecordedKind::Execute, sql, values) {
            Reply::Exec(outcome) => Ok(outcome),
            Reply::Rows(rows) => Ok(ExecOutcome {
                rows_affected: rows.len() as u64,
                last_insert_id: None,
            }),
            Reply::Fail(message) => {
                tracing::debug!(%sql, "scripted statement failure");
                Err(DataError::database(ScriptedFailure(message)))
            }
        }
    }

    async fn fetch(&mut self, sql: &str, values: &[Value]) -> Result<Vec<Row>, DataError> {
        match self.answer(RecordedKind::Fetch, sql, values) {
            Reply::Rows(rows) => Ok(rows),
            Reply::Exec(_) => Ok(Vec::new()),
            Reply::Fail(message) => {
                tracing::debug!(%sql, "scripted statement failure");
                Err(DataError::database(ScriptedFailure(message)))
            }
        }
    }
}

/// Shared view of a [`RecordingDriver`]'s log and rules.
#[derive(Debug, Clone)]
pub struct Recording {
    dialect: Dialect,
    state: Arc<Mutex<State>>,
}

impl Recording {
    fn push_rule(&self, pattern: impl Into<String>, values: Option<Vec<Value>>, reply: Reply) {
        guard(&self.state).rules.push(Rule {
            pattern: pattern.into(),
            values,
            reply,
        });
    }

    /// Script the introspection answer for one column (nullable).
    pub fn describe(&self, table: &str, column: &str, native_type: &str) {
        let row = Row::new()
            .with("Field", column)
            .with("Type", native_type)
            .with("Null", "YES");
        self.push_rule(
            self.dialect.describe_sql(table, column),
            None,
            Reply::Rows(vec![row]),
        );
    }

    pub fn on_fetch(&self, pattern: &str, rows: Vec<Row>) {
        self.push_rule(pattern, None, Reply::Rows(rows));
    }

    /// Like [`Recording::on_fetch`], but only for statements bound with
    /// exactly `values` (e.g. a load by one particular id).
    pub fn on_fetch_for(&self, pattern: &str, values: Vec<Value>, rows: Vec<Row>) {
        self.push_rule(pattern, Some(values), Reply::Rows(rows));
    }

    pub fn on_execute(&self, pattern: &str, rows_affected: u64, last_insert_id: Option<i64>) {
        self.push_rule(
            pattern,
            None,
            Reply::Exec(ExecOutcome {
                rows_affected,
                last_insert_id,
            }),
        );
    }

    /// Make every statement containing `pattern` fail at the driver.
    pub fn fail_on(&self, pattern: &str, message: &str) {
        self.push_rule(pattern, None, Reply::Fail(message.to_string()));
    }

    pub fn entries(&self) -> Vec<Recorded> {
        guard(&self.state).log.clone()
    }

    /// SQL of every recorded statement, in execution order.
    pub fn statements(&self) -> Vec<String> {
        guard(&self.state).log.iter().map(|r| r.sql.clone()).collect()
    }

    /// Number of recorded statements containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        guard(&self.state)
            .log
            .iter()
            .filter(|r| r.sql.contains(pattern))
            .count()
    }

    /// Most recent statement containing `pattern`.
    pub fn last_matching(&self, pattern: &str) -> Option<Recorded> {
        guard(&self.state)
            .log
            .iter()
            .rev()
            .find(|r| r.sql.contains(pattern))
            .cloned()
    }

    /// Forget the log, keeping the rules.
    pub fn clear(&self) {
        guard(&self.state).log.clear();
    }
}
