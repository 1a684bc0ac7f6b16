//! Error types for pgnamed

use std::fmt;
use thiserror::Error;

/// Result type alias for pgnamed operations
pub type OrmResult<T> = Result<T, OrmError>;

/// The write operation a runner was performing when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `INSERT INTO ...`
    Insert,
    /// `INSERT INTO ... RETURNING <id>`
    InsertReturning,
    /// `UPDATE ... SET ...`
    Update,
}

impl Operation {
    /// Short name used in log events.
    pub fn label(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::InsertReturning => "insert_returning",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert | Self::InsertReturning => "insert into",
            Self::Update => "update",
        };
        f.write_str(s)
    }
}

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The value passed as a record is neither a struct nor a string-keyed map.
    #[error("Unsupported record shape: expected a struct or a string-keyed map, found {shape}")]
    UnsupportedRecordShape { shape: &'static str },

    /// Flattened records nest deeper than the configured limit.
    #[error("Record nesting exceeds the maximum flatten depth of {depth}")]
    RecursionLimit { depth: usize },

    /// A `:name` placeholder has no matching record field.
    #[error("Missing value for named parameter ':{0}'")]
    MissingParameter(String),

    /// A statement built for `table` failed while running `op`.
    #[error("Cannot {op} table '{table}': {source}")]
    Execution {
        op: Operation,
        table: String,
        source: Box<OrmError>,
    },

    /// An error annotated with caller-supplied context.
    #[error("{message}: {source}")]
    Context {
        message: String,
        source: Box<OrmError>,
    },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap `source` with the operation and table it was raised for.
    pub fn execution(op: Operation, table: impl Into<String>, source: OrmError) -> Self {
        Self::Execution {
            op,
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Annotate this error with a message, keeping it as the source.
    pub fn wrap(self, message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping every `Execution` and `Context` layer.
    pub fn root_cause(&self) -> &OrmError {
        let mut current = self;
        loop {
            match current {
                Self::Execution { source, .. } | Self::Context { source, .. } => current = source,
                other => return other,
            }
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self.root_cause(), Self::UniqueViolation(_))
    }

    /// Check if this is a not found error, however many times it was wrapped.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::NotFound(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

/// Returns true when `err` means "the query ran but matched no row".
pub fn is_not_found_error(err: &OrmError) -> bool {
    err.is_not_found()
}

/// Context annotation for `OrmResult`.
pub trait ResultExt<T> {
    /// Wrap the error (if any) with a fixed message.
    fn context(self, message: impl Into<String>) -> OrmResult<T>;

    /// Wrap the error (if any) with a lazily built message.
    fn with_context<S, F>(self, f: F) -> OrmResult<T>
    where
        S: Into<String>,
        F: FnOnce() -> S;
}

impl<T> ResultExt<T> for OrmResult<T> {
    fn context(self, message: impl Into<String>) -> OrmResult<T> {
        self.map_err(|e| e.wrap(message))
    }

    fn with_context<S, F>(self, f: F) -> OrmResult<T>
    where
        S: Into<String>,
        F: FnOnce() -> S,
    {
        self.map_err(|e| e.wrap(f()))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_survives_double_wrapping() {
        let err = OrmError::not_found("Expected one row, got none");
        let err = OrmError::execution(Operation::Update, "users", err);
        let err = err.wrap("loading profile");

        assert!(err.is_not_found());
        assert!(is_not_found_error(&err));
        assert!(matches!(err.root_cause(), OrmError::NotFound(_)));
    }

    #[test]
    fn context_helpers_wrap_errors() {
        let res: OrmResult<()> = Err(OrmError::not_found("none"));
        let err = res
            .context("first")
            .with_context(|| format!("second {}", 2))
            .unwrap_err();

        assert_eq!(err.to_string(), "second 2: first: Not found: none");
        assert!(err.is_not_found());
    }

    #[test]
    fn other_errors_are_not_not_found() {
        let err = OrmError::execution(
            Operation::Insert,
            "users",
            OrmError::UniqueViolation("users_email_key: duplicate".into()),
        );
        assert!(!err.is_not_found());
        assert!(err.is_unique_violation());
    }

    #[test]
    fn execution_message_names_operation_and_table() {
        let err = OrmError::execution(
            Operation::InsertReturning,
            "users",
            OrmError::Other("boom".into()),
        );
        assert_eq!(err.to_string(), "Cannot insert into table 'users': boom");

        let err = OrmError::execution(Operation::Update, "users", OrmError::Other("boom".into()));
        assert_eq!(err.to_string(), "Cannot update table 'users': boom");
    }

    #[test]
    fn source_chain_is_exposed() {
        use std::error::Error as _;

        let err = OrmError::not_found("none").wrap("outer");
        let source = err.source().expect("wrapped error has a source");
        assert_eq!(source.to_string(), "Not found: none");
    }
}
