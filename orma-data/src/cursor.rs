use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::entity::{hydrate, Entity};
use crate::error::DataError;
use crate::value::{Row, Value};

/// Live result handle of one query or prepared execution.
///
/// Each call to [`Database::query`](crate::Database::query) or
/// [`Database::execute`](crate::Database::execute) returns its own cursor,
/// so nested loads never disturb an outer result. The consuming accessors
/// (`row`, `scalar`, `object`) read one unit and free the cursor; the
/// `next_*` accessors keep it open. Dropping a cursor frees it.
pub struct Cursor {
    rows: VecDeque<Row>,
    rows_affected: u64,
    label: String,
    ledger: Arc<AtomicUsize>,
}

impl Cursor {
    pub(crate) fn new(
        rows: Vec<Row>,
        rows_affected: u64,
        label: impl Into<String>,
        ledger: Arc<AtomicUsize>,
    ) -> Self {
        ledger.fetch_add(1, Ordering::SeqCst);
        Self {
            rows: rows.into(),
            rows_affected,
            label: label.into(),
            ledger,
        }
    }

    /// Rows changed by the statement (0 for row-returning statements).
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn next_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// First column of the next row.
    pub fn next_scalar(&mut self) -> Option<Value> {
        self.next_row()
            .and_then(|row| row.into_values().into_iter().next())
    }

    /// Next row hydrated into a fresh entity.
    pub fn next_object<E: Entity + Default>(&mut self) -> Result<Option<E>, DataError> {
        match self.next_row() {
            Some(row) => hydrate::<E>(&row).map(Some),
            None => Ok(None),
        }
    }

    /// Read the first row and free the cursor.
    pub fn row(mut self) -> Option<Row> {
        self.next_row()
    }

    /// Read the first column of the first row and free the cursor.
    pub fn scalar(mut self) -> Option<Value> {
        self.next_scalar()
    }

    /// Hydrate the first row into an entity and free the cursor.
    pub fn object<E: Entity + Default>(mut self) -> Result<Option<E>, DataError> {
        self.next_object()
    }

    /// Release the handle.
    pub fn free(self) {}
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.next_row()
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.ledger.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(label = %self.label, unread = self.rows.len(), "cursor freed");
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("label", &self.label)
            .field("remaining", &self.rows.len())
            .field("rows_affected", &self.rows_affected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(rows: Vec<Row>, ledger: &Arc<AtomicUsize>) -> Cursor {
        Cursor::new(rows, 0, "test", Arc::clone(ledger))
    }

    #[test]
    fn test_consuming_accessors_free() {
        let ledger = Arc::new(AtomicUsize::new(0));
        let c = cursor(vec![Row::new().with("n", 3i64)], &ledger);
        assert_eq!(ledger.load(Ordering::SeqCst), 1);
        assert_eq!(c.scalar(), Some(Value::Int(3)));
        assert_eq!(ledger.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nested_cursors_are_independent() {
        let ledger = Arc::new(AtomicUsize::new(0));
        let mut outer = cursor(
            vec![Row::new().with("id", 1i64), Row::new().with("id", 2i64)],
            &ledger,
        );
        let first = outer.next_scalar();
        {
            let inner = cursor(vec![Row::new().with("x", "inner")], &ledger);
            assert_eq!(ledger.load(Ordering::SeqCst), 2);
            inner.free();
        }
        assert_eq!(first, Some(Value::Int(1)));
        assert_eq!(outer.next_scalar(), Some(Value::Int(2)));
        assert_eq!(outer.next_scalar(), None);
        drop(outer);
        assert_eq!(ledger.load(Ordering::SeqCst), 0);
    }
}
