use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::DataError;
use crate::value::{Row, Value};

/// Result of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Identity generated by the statement, when it inserted into a table
    /// with an auto-increment key.
    pub last_insert_id: Option<i64>,
}

/// The database driver boundary.
///
/// A driver owns exactly one live connection. Statements arrive with
/// positional `?` placeholders only; named parameters are resolved by
/// [`Database`](crate::Database) before they reach the driver.
///
/// Implemented by `orma-data-sqlx` for real databases and by
/// `orma-test::RecordingDriver` for tests.
#[async_trait]
pub trait Driver: Send {
    fn dialect(&self) -> Dialect;

    /// Identity of the connection target (database), used to key the
    /// descriptor registry. Must not contain credentials.
    fn target(&self) -> &str;

    /// Run a statement that does not produce rows.
    async fn execute(&mut self, sql: &str, values: &[Value]) -> Result<ExecOutcome, DataError>;

    /// Run a statement and fetch all of its rows.
    async fn fetch(&mut self, sql: &str, values: &[Value]) -> Result<Vec<Row>, DataError>;
}

/// Whether a statement produces a result set, judged by its leading keyword.
pub fn returns_rows(sql: &str) -> bool {
    let head = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        head.as_str(),
        "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH" | "PRAGMA" | "VALUES"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  select * from t"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));
        assert!(returns_rows("DESCRIBE `t` `c`"));
        assert!(!returns_rows("INSERT INTO t SET a=1"));
        assert!(!returns_rows("LOCK TABLES `t` WRITE"));
        assert!(!returns_rows("DELETE FROM t"));
    }
}
