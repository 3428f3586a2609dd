/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// A type's declared shape cannot be turned into a descriptor (missing
    /// table or key, custom query shadowing a built-in, unknown operation).
    Config(String),
    /// Declared properties whose columns could not be introspected.
    Schema { table: String, missing: Vec<String> },
    /// Rejected at the API boundary before any SQL was issued.
    InvalidArgument(String),
    /// A statement failed at the driver. Already reported to the diagnostic sink.
    Statement {
        label: String,
        sql: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The driver could not open a connection.
    Connect(Box<dyn std::error::Error + Send + Sync>),
    /// A named parameter could not be resolved.
    Bind(String),
    /// A stored value could not be converted to the requested Rust type.
    Conversion { target: String, expected: &'static str },
    NotFound(String),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by driver crates (e.g. `orma-data-sqlx`) to wrap driver-specific
    /// errors before the wrapper attaches the statement context.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub(crate) fn conversion(target: impl Into<String>, expected: &'static str) -> Self {
        DataError::Conversion {
            target: target.into(),
            expected,
        }
    }

    /// Whether this error came from executing SQL (as opposed to a
    /// configuration or argument problem caught before any SQL ran).
    pub fn is_statement_failure(&self) -> bool {
        matches!(self, DataError::Statement { .. } | DataError::Database(_))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Config(msg) => write!(f, "Configuration error: {msg}"),
            DataError::Schema { table, missing } => write!(
                f,
                "Schema error: table `{table}` has no column(s) {}",
                missing.join(", ")
            ),
            DataError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            DataError::Statement { label, sql, source } => {
                write!(f, "Statement `{label}` failed: {source} [{sql}]")
            }
            DataError::Connect(err) => write!(f, "Cannot connect: {err}"),
            DataError::Bind(msg) => write!(f, "Bind error: {msg}"),
            DataError::Conversion { target, expected } => {
                write!(f, "Conversion error: `{target}` is not a valid {expected}")
            }
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Statement { source, .. } => Some(source.as_ref()),
            DataError::Connect(err) | DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type DataResult<T> = Result<T, DataError>;
