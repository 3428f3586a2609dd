/// How a column's values cross the SQL boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Stored and exchanged as is.
    Plain,
    /// `DATE`: exchanged as epoch seconds (midnight of the stored day).
    Date,
    /// `DATETIME`: exchanged as epoch seconds.
    DateTime,
    /// `TIMESTAMP`: exchanged as epoch seconds.
    Timestamp,
    /// `TIME`: exchanged as seconds since midnight.
    Time,
}

impl ColumnKind {
    /// Classify a native type string as reported by introspection
    /// (`date`, `datetime(6)`, `timestamp`, `time`, `varchar(255)`, ...).
    pub fn from_native_type(native: &str) -> Self {
        let t = native.trim().to_ascii_lowercase();
        if t.starts_with("datetime") {
            ColumnKind::DateTime
        } else if t.starts_with("timestamp") {
            ColumnKind::Timestamp
        } else if t.starts_with("date") {
            ColumnKind::Date
        } else if t.starts_with("time") {
            ColumnKind::Time
        } else {
            ColumnKind::Plain
        }
    }

    pub fn is_temporal(self) -> bool {
        !matches!(self, ColumnKind::Plain)
    }
}

/// Introspected definition of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub native_type: String,
    pub nullable: bool,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>, nullable: bool) -> Self {
        let native_type = native_type.into();
        Self {
            name: name.into(),
            kind: ColumnKind::from_native_type(&native_type),
            native_type,
            nullable,
        }
    }
}

/// Derive a column name from a property name: an underscore is inserted
/// before each uppercase letter, which is lowercased (`someField` →
/// `some_field`). Snake-case names pass through unchanged.
pub fn column_name(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_name_derivation() {
        assert_eq!(column_name("someFieldName"), "some_field_name");
        assert_eq!(column_name("aDate"), "a_date");
        assert_eq!(column_name("mess"), "mess");
        assert_eq!(column_name("already_snake"), "already_snake");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(ColumnKind::from_native_type("DATE"), ColumnKind::Date);
        assert_eq!(ColumnKind::from_native_type("datetime(6)"), ColumnKind::DateTime);
        assert_eq!(ColumnKind::from_native_type("timestamp"), ColumnKind::Timestamp);
        assert_eq!(ColumnKind::from_native_type("time"), ColumnKind::Time);
        assert_eq!(ColumnKind::from_native_type("varchar(64)"), ColumnKind::Plain);
        assert_eq!(ColumnKind::from_native_type("int(11) unsigned"), ColumnKind::Plain);
        assert!(!ColumnKind::Plain.is_temporal());
        assert!(ColumnKind::Time.is_temporal());
    }
}
