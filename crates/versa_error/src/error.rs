//! Top-level error wrapper types.

use crate::{CacheError, CommandError, ConfigError, DatabaseError, DiscordError};

/// Every error family produced by the framework.
///
/// # Examples
///
/// ```
/// use versa_error::{ConfigError, VersaError};
///
/// let err: VersaError = ConfigError::new("DB_TYPE must be sqlite or postgres").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum VersaErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Database error
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Cache error
    #[from(CacheError)]
    Cache(CacheError),
    /// Discord client error
    #[from(DiscordError)]
    Discord(DiscordError),
    /// Command dispatch error
    #[from(CommandError)]
    Command(CommandError),
}

/// Versa error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Versa Error: {}", _0)]
pub struct VersaError(Box<VersaErrorKind>);

impl VersaError {
    /// Create a new error from a kind.
    pub fn new(kind: VersaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VersaErrorKind {
        &self.0
    }

    /// The database error inside, if this is one.
    pub fn as_database(&self) -> Option<&DatabaseError> {
        match self.kind() {
            VersaErrorKind::Database(err) => Some(err),
            _ => None,
        }
    }

    /// The command error inside, if this is one.
    pub fn as_command(&self) -> Option<&CommandError> {
        match self.kind() {
            VersaErrorKind::Command(err) => Some(err),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to VersaErrorKind
impl<T> From<T> for VersaError
where
    T: Into<VersaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Versa operations.
pub type VersaResult<T> = std::result::Result<T, VersaError>;
