use crate::dialect::Dialect;
use crate::error::DataError;
use crate::value::{ToValue, Value};

/// Values bound to a prepared statement.
///
/// A flat sequence binds to positional `?` markers in order. A mapping binds
/// to `:name` markers; the wrapper rewrites those to positional markers
/// before the statement reaches the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToValue,
    {
        Params::Positional(values.into_iter().map(|v| v.to_value()).collect())
    }

    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToValue,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_value()))
                .collect(),
        )
    }

    /// Add a named value, converting `None`/positional params as needed.
    pub fn bind(&mut self, name: impl Into<String>, value: impl ToValue) {
        let entry = (name.into(), value.to_value());
        match self {
            Params::Named(pairs) => pairs.push(entry),
            Params::None => *self = Params::Named(vec![entry]),
            Params::Positional(_) => {
                tracing::warn!(name = %entry.0, "named bind ignored on positional params");
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(v) => v.is_empty(),
            Params::Named(v) => v.is_empty(),
        }
    }

    fn lookup(pairs: &[(String, Value)], name: &str) -> Option<Value> {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    /// Produce the driver-ready SQL and the ordered positional values.
    pub fn resolve(&self, sql: &str, dialect: Dialect) -> Result<(String, Vec<Value>), DataError> {
        match self {
            Params::None => Ok((sql.to_string(), Vec::new())),
            Params::Positional(values) => Ok((sql.to_string(), values.clone())),
            Params::Named(pairs) => rewrite_named(sql, dialect, |name| Self::lookup(pairs, name)),
        }
    }
}

/// Replace every `:name` marker outside string literals and quoted
/// identifiers with a positional placeholder, collecting values in order.
///
/// `::` (cast syntax) and a `:` not followed by an identifier are copied as is.
fn rewrite_named(
    sql: &str,
    dialect: Dialect,
    lookup: impl Fn(&str) -> Option<Value>,
) -> Result<(String, Vec<Value>), DataError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && q != '`' {
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                    i += 1;
                }
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = lookup(&name)
                    .ok_or_else(|| DataError::Bind(format!("no value for `:{name}`")))?;
                values.push(value);
                out.push_str(&dialect.placeholder(values.len()));
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok((out, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_rewrite_orders_values() {
        let params = Params::named([("mess", Value::from("x")), ("a_date", Value::Int(7))]);
        let (sql, values) = params
            .resolve(
                "INSERT INTO `widget` SET `a_date`=FROM_UNIXTIME(:a_date), `mess`=:mess",
                Dialect::MySql,
            )
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `widget` SET `a_date`=FROM_UNIXTIME(?), `mess`=?"
        );
        assert_eq!(values, vec![Value::Int(7), Value::from("x")]);
    }

    #[test]
    fn test_named_rewrite_skips_literals() {
        let params = Params::named([("d", 1i64)]);
        let (sql, values) = params
            .resolve(
                "SELECT date(:d, 'unixepoch'), ':not_a_bind', x::int",
                Dialect::Sqlite,
            )
            .unwrap();
        assert_eq!(sql, "SELECT date(?, 'unixepoch'), ':not_a_bind', x::int");
        assert_eq!(values, vec![Value::Int(1)]);
    }

    #[test]
    fn test_named_rewrite_repeated_name() {
        let params = Params::named([("id", 3i64)]);
        let (sql, values) = params
            .resolve("SELECT :id, :id", Dialect::MySql)
            .unwrap();
        assert_eq!(sql, "SELECT ?, ?");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_missing_named_value() {
        let err = Params::named([("a", 1i64)])
            .resolve("SELECT :b", Dialect::MySql)
            .unwrap_err();
        assert!(matches!(err, DataError::Bind(_)));
    }

    #[test]
    fn test_positional_passthrough() {
        let (sql, values) = Params::positional([1i64, 2])
            .resolve("SELECT ?, ?", Dialect::MySql)
            .unwrap();
        assert_eq!(sql, "SELECT ?, ?");
        assert_eq!(values, vec![Value::Int(1), Value::Int(2)]);
    }
}
