use crate::error::DataError;

/// A single SQL value as exchanged with the driver.
///
/// Temporal columns never surface as dates: the generated SQL converts them
/// to integer seconds (epoch seconds for date-like columns, seconds since
/// midnight for `TIME`), so they travel as [`Value::Int`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Textual view of the value. Binary values are decoded as UTF-8
    /// (MySQL reports `SHOW`/`DESCRIBE` columns as binary strings).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Conversion of a property into a bindable [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion of a fetched [`Value`] back into a property type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as an entity property type",
    label = "not a valid property type",
    note = "built-in types: bool, integers, f32/f64, String, Vec<u8>, Option<T>, chrono::DateTime<Utc>, chrono::NaiveDate. Implement `FromValue` for custom types."
)]
pub trait FromValue: Sized {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError>;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value, _target: &str) -> Result<Self, DataError> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        value
            .as_i64()
            .ok_or_else(|| DataError::conversion(target, "i64"))
    }
}

impl FromValue for bool {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::Text(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(DataError::conversion(target, "bool")),
            },
            _ => Err(DataError::conversion(target, "bool")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| DataError::conversion(target, "f64")),
            _ => Err(DataError::conversion(target, "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        f64::from_value(value, target).map(|f| f as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        match value {
            Value::Null => Err(DataError::conversion(target, "String")),
            other => other
                .as_text()
                .ok_or_else(|| DataError::conversion(target, "String")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(DataError::conversion(
                format!("{target} ({})", other.kind()),
                "Vec<u8>",
            )),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v, target).map(Some),
        }
    }
}

// ── Integer types via i64 with range check ──────────────────────────────

macro_rules! impl_int_value {
    ($($ty:ty),+) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
                    let i = i64::from_value(value, target)?;
                    <$ty>::try_from(i).map_err(|_| DataError::conversion(target, stringify!($ty)))
                }
            }
        )+
    };
}

impl ToValue for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
}

impl_int_value!(i8, i16, i32, u8, u16, u32);

impl ToValue for u64 {
    fn to_value(&self) -> Value {
        Value::Int(i64::try_from(*self).unwrap_or(i64::MAX))
    }
}

impl FromValue for u64 {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        let i = i64::from_value(value, target)?;
        u64::try_from(i).map_err(|_| DataError::conversion(target, "u64"))
    }
}

// ── chrono: temporal properties travel as epoch seconds ─────────────────

impl ToValue for chrono::DateTime<chrono::Utc> {
    fn to_value(&self) -> Value {
        Value::Int(self.timestamp())
    }
}

impl FromValue for chrono::DateTime<chrono::Utc> {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        let secs = i64::from_value(value, target)?;
        chrono::DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| DataError::conversion(target, "DateTime<Utc>"))
    }
}

impl ToValue for chrono::NaiveDate {
    fn to_value(&self) -> Value {
        Value::Int(self.and_time(chrono::NaiveTime::MIN).and_utc().timestamp())
    }
}

impl FromValue for chrono::NaiveDate {
    fn from_value(value: Value, target: &str) -> Result<Self, DataError> {
        chrono::DateTime::<chrono::Utc>::from_value(value, target).map(|dt| dt.date_naive())
    }
}

/// One fetched result row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style push, handy for drivers and tests.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Typed access by column name.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T, DataError> {
        let value = self
            .get(column)
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("column `{column}` in result row")))?;
        T::from_value(value, column)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

impl_value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_range_check() {
        assert_eq!(u8::from_value(Value::Int(200), "x").unwrap(), 200);
        assert!(u8::from_value(Value::Int(300), "x").is_err());
        assert!(u32::from_value(Value::Int(-1), "x").is_err());
    }

    #[test]
    fn test_option_null() {
        let v: Option<String> = FromValue::from_value(Value::Null, "mess").unwrap();
        assert!(v.is_none());
        assert!(String::from_value(Value::Null, "mess").is_err());
    }

    #[test]
    fn test_text_from_bytes() {
        let v = Value::Bytes(b"varchar(255)".to_vec());
        assert_eq!(v.as_text().as_deref(), Some("varchar(255)"));
    }

    #[test]
    fn test_naive_date_is_midnight_epoch() {
        let date = chrono::NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
        assert_eq!(date.to_value(), Value::Int(1_699_920_000));
        let back = chrono::NaiveDate::from_value(Value::Int(1_699_920_000), "d").unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn test_row_lookup() {
        let row = Row::new().with("mess", "hi").with("a_date", 5i64);
        assert_eq!(row.get("mess"), Some(&Value::Text("hi".into())));
        assert_eq!(row.get_index(1), Some(&Value::Int(5)));
        assert_eq!(row.try_get::<i64>("a_date").unwrap(), 5);
        assert!(!row.contains("missing"));
    }
}
