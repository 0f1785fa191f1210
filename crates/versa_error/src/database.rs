//! Database error types.

/// Database error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum DatabaseErrorKind {
    /// Connection failed
    #[display("Database connection error: {}", _0)]
    Connection(String),
    /// Connection pool could not hand out a connection
    #[display("Database pool error: {}", _0)]
    Pool(String),
    /// Query execution failed
    #[display("Database query error: {}", _0)]
    Query(String),
    /// Serialization/deserialization error
    #[display("Serialization error: {}", _0)]
    Serialization(String),
    /// Migration error
    #[display("Migration error: {}", _0)]
    Migration(String),
    /// Record not found
    #[display("Record not found")]
    NotFound,
    /// No stored record for a model that is never created implicitly
    #[display("{} {} does not exist", model, key)]
    DoesNotExist {
        /// Model kind (e.g. "guild")
        model: String,
        /// Printable primary key
        key: String,
    },
    /// User has never registered
    #[display("User {} does not exist", _0)]
    UserDoesNotExist(i64),
    /// User record exists but the user opted out
    #[display("User {} is inactive", _0)]
    InactiveUser(i64),
    /// A row with the same key was written first
    #[display("Record already exists: {}", _0)]
    AlreadyExists(String),
    /// Value handed to the adapter has no record type
    #[display("Unsupported object: {}", _0)]
    UnsupportedObject(String),
    /// Database backend is not available in this build
    #[display("Unsupported database backend: {}", _0)]
    UnsupportedBackend(String),
}

/// Database error with source location tracking.
///
/// # Examples
///
/// ```
/// use versa_error::{DatabaseError, DatabaseErrorKind};
///
/// let err = DatabaseError::new(DatabaseErrorKind::UserDoesNotExist(42));
/// assert!(format!("{}", err).contains("does not exist"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Database Error: {} at line {} in {}", kind, line, file)]
pub struct DatabaseError {
    /// The kind of error that occurred
    pub kind: DatabaseErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl DatabaseError {
    /// Create a new DatabaseError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error means the user has no record at all.
    pub fn is_user_missing(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::UserDoesNotExist(_))
    }

    /// Whether this error is a unique key conflict.
    pub fn is_already_exists(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::AlreadyExists(_))
    }

    /// Whether this error means the user record is inactive.
    pub fn is_user_inactive(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::InactiveUser(_))
    }
}

#[cfg(feature = "database")]
impl From<diesel::result::Error> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => DatabaseError::new(DatabaseErrorKind::NotFound),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => DatabaseError::new(DatabaseErrorKind::AlreadyExists(info.message().to_string())),
            _ => DatabaseError::new(DatabaseErrorKind::Query(err.to_string())),
        }
    }
}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Pool(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<serde_json::Error> for DatabaseError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::new(DatabaseErrorKind::Serialization(err.to_string()))
    }
}
