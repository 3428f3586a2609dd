use crate::column::{ColumnDef, ColumnKind};
use crate::value::Row;

/// SQL dialect spoken by the connected database.
///
/// Affects identifier quoting, placeholder style, the functions used to
/// move temporal columns across the integer boundary, column
/// introspection, and table locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL / MariaDB: `FROM_UNIXTIME`, `DESCRIBE`, `LOCK TABLES`.
    MySql,
    /// SQLite: `strftime`/`datetime`, `pragma_table_info`, no table locks.
    Sqlite,
}

/// Table lock mode for [`Dialect::lock_sql`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

impl LockMode {
    fn keyword(self) -> &'static str {
        match self {
            LockMode::Read => "READ",
            LockMode::Write => "WRITE",
        }
    }
}

impl Dialect {
    /// Guess the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }

    pub fn placeholder(self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_char(self) -> char {
        // SQLite accepts MySQL-style backticks as identifier quotes.
        '`'
    }

    /// Quote an identifier, handling `table.column` paths and `*`.
    pub fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        ident
            .split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    let escaped = part.replace(q, &format!("{q}{q}"));
                    format!("{q}{escaped}{q}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Wrap a column expression so the value surfaces as integer seconds.
    pub fn project_temporal(self, kind: ColumnKind, expr: &str) -> String {
        match (self, kind) {
            (_, ColumnKind::Plain) => expr.to_string(),
            (Dialect::MySql, ColumnKind::Time) => format!("TIME_TO_SEC({expr})"),
            (Dialect::MySql, _) => format!("UNIX_TIMESTAMP({expr})"),
            (Dialect::Sqlite, ColumnKind::Time) => {
                format!("(CAST(strftime('%s', {expr}) AS INTEGER) % 86400)")
            }
            (Dialect::Sqlite, _) => format!("CAST(strftime('%s', {expr}) AS INTEGER)"),
        }
    }

    /// Wrap a bind expression so integer seconds are stored as the native type.
    pub fn bind_temporal(self, kind: ColumnKind, bind: &str) -> String {
        match (self, kind) {
            (_, ColumnKind::Plain) => bind.to_string(),
            (Dialect::MySql, ColumnKind::Time) => format!("SEC_TO_TIME({bind})"),
            (Dialect::MySql, _) => format!("FROM_UNIXTIME({bind})"),
            (Dialect::Sqlite, ColumnKind::Date) => format!("date({bind}, 'unixepoch')"),
            (Dialect::Sqlite, ColumnKind::Time) => format!("time({bind}, 'unixepoch')"),
            (Dialect::Sqlite, _) => format!("datetime({bind}, 'unixepoch')"),
        }
    }

    /// Statement returning the definition rows of one column.
    ///
    /// Rows carry `Field`, `Type` and `Null` (`YES`/`NO`) columns in both
    /// dialects. MySQL treats the column argument as a `LIKE` pattern, so
    /// callers must pick the exact match with [`Dialect::parse_describe`].
    pub fn describe_sql(self, table: &str, column: &str) -> String {
        match self {
            Dialect::MySql => format!("DESCRIBE {} {}", self.quote(table), self.quote(column)),
            Dialect::Sqlite => format!(
                "SELECT \"name\" AS \"Field\", \"type\" AS \"Type\", \
                 CASE WHEN \"notnull\" = 0 THEN 'YES' ELSE 'NO' END AS \"Null\" \
                 FROM pragma_table_info({}) WHERE \"name\" = {}",
                string_literal(table),
                string_literal(column)
            ),
        }
    }

    /// Pick the definition of `column` out of introspection rows.
    pub fn parse_describe(self, column: &str, rows: &[Row]) -> Option<ColumnDef> {
        rows.iter().find_map(|row| {
            let field = row.get("Field").and_then(|v| v.as_text())?;
            if field != column {
                return None;
            }
            let native = row.get("Type").and_then(|v| v.as_text())?;
            let nullable = row
                .get("Null")
                .and_then(|v| v.as_text())
                .is_some_and(|n| n.eq_ignore_ascii_case("YES"));
            Some(ColumnDef::new(field, native, nullable))
        })
    }

    /// `LOCK TABLES` statement, or `None` where the dialect has no table locks.
    pub fn lock_sql(self, tables: &[&str], mode: LockMode) -> Option<String> {
        match self {
            Dialect::MySql => {
                let list = tables
                    .iter()
                    .map(|t| format!("{} {}", self.quote(t), mode.keyword()))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("LOCK TABLES {list}"))
            }
            Dialect::Sqlite => None,
        }
    }

    pub fn unlock_sql(self) -> Option<String> {
        match self {
            Dialect::MySql => Some("UNLOCK TABLES".to_string()),
            Dialect::Sqlite => None,
        }
    }

    /// Built-in `insert` template for plain entities.
    pub fn insert_template(self) -> &'static str {
        match self {
            Dialect::MySql => "INSERT INTO {table} SET {fieldset}",
            Dialect::Sqlite => "INSERT INTO {table} ({columns}) VALUES ({values})",
        }
    }

    /// Built-in `insert` template for link rows.
    pub fn link_insert_template(self) -> &'static str {
        match self {
            Dialect::MySql => "INSERT INTO {table} SET {keyset}{+fieldset}",
            Dialect::Sqlite => {
                "INSERT INTO {table} ({keycolumns}{+columns}) VALUES ({keyvalues}{+values})"
            }
        }
    }

    /// Trailing limiting clause.
    pub fn limit_sql(self, count: u64, offset: u64) -> String {
        if offset == 0 {
            format!(" LIMIT {count}")
        } else {
            format!(" LIMIT {count} OFFSET {offset}")
        }
    }
}

fn string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_quote_paths() {
        assert_eq!(Dialect::MySql.quote("widget"), "`widget`");
        assert_eq!(Dialect::MySql.quote("widget.mess"), "`widget`.`mess`");
        assert_eq!(Dialect::MySql.quote("widget.*"), "`widget`.*");
        assert_eq!(Dialect::MySql.quote("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_temporal_wrapping() {
        let d = Dialect::MySql;
        assert_eq!(d.project_temporal(ColumnKind::Date, "`a_date`"), "UNIX_TIMESTAMP(`a_date`)");
        assert_eq!(d.project_temporal(ColumnKind::Time, "`t`"), "TIME_TO_SEC(`t`)");
        assert_eq!(d.bind_temporal(ColumnKind::DateTime, ":a"), "FROM_UNIXTIME(:a)");
        assert_eq!(d.bind_temporal(ColumnKind::Time, ":t"), "SEC_TO_TIME(:t)");
        assert_eq!(d.bind_temporal(ColumnKind::Plain, ":m"), ":m");

        let s = Dialect::Sqlite;
        assert_eq!(s.bind_temporal(ColumnKind::Date, "?"), "date(?, 'unixepoch')");
        assert_eq!(
            s.project_temporal(ColumnKind::Timestamp, "`ts`"),
            "CAST(strftime('%s', `ts`) AS INTEGER)"
        );
    }

    #[test]
    fn test_lock_sql() {
        assert_eq!(
            Dialect::MySql.lock_sql(&["a_b", "a"], LockMode::Write).unwrap(),
            "LOCK TABLES `a_b` WRITE, `a` WRITE"
        );
        assert_eq!(Dialect::MySql.unlock_sql().unwrap(), "UNLOCK TABLES");
        assert!(Dialect::Sqlite.lock_sql(&["a"], LockMode::Read).is_none());
    }

    #[test]
    fn test_parse_describe_exact_match() {
        // `a_date` as a LIKE pattern also matches `axdate`
        let rows = vec![
            Row::new()
                .with("Field", "axdate")
                .with("Type", "int")
                .with("Null", "NO"),
            Row::new()
                .with("Field", Value::Bytes(b"a_date".to_vec()))
                .with("Type", Value::Bytes(b"date".to_vec()))
                .with("Null", "YES"),
        ];
        let def = Dialect::MySql.parse_describe("a_date", &rows).unwrap();
        assert_eq!(def.kind, ColumnKind::Date);
        assert!(def.nullable);
        assert!(Dialect::MySql.parse_describe("nope", &rows).is_none());
    }

    #[test]
    fn test_from_url() {
        assert_eq!(Dialect::from_url("mysql://u:p@host/db"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("sqlite::memory:"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_url("postgres://x"), None);
    }
}
