//! Error types for the session store.
//!
//! Configuration problems are reported once, synchronously, while the store is
//! being built ([`ConfigError`]). Everything that can go wrong afterwards is
//! returned from the failing operation as an [`Error`]; no operation panics.

use sea_orm::DbErr;
use thiserror::Error;
use tower_sessions::session_store;

/// Result alias used by every store operation.
pub type Result<T> = std::result::Result<T, Error>;

/// A configuration value that failed validation.
///
/// Raised only while resolving a [`StoreConfig`](crate::StoreConfig), before
/// the database is ever contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field has the wrong type, e.g. a number where a string is expected.
    #[error("invalid configuration: `{field}` must be {expected}, got {actual}")]
    InvalidType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A port that cannot be coerced to a TCP port number.
    #[error("invalid configuration: {origin} value `{value}` is not a valid port")]
    InvalidPort { origin: String, value: String },

    /// A table or column name that is empty.
    #[error("invalid configuration: `{field}` must not be empty")]
    EmptyName { field: &'static str },

    #[error("invalid configuration: unknown backend `{0}` (expected mysql, postgres or sqlite)")]
    UnknownBackend(String),

    /// The connection parameters do not form a valid connection URL.
    #[error("invalid configuration: cannot build a connection url for host `{host}`")]
    InvalidHost { host: String },
}

/// Errors reported by store operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The database rejected or could not run a statement. A connection that
    /// failed to open also ends up here, on the first statement issued on it.
    #[error("session query failed: {0}")]
    Query(#[from] DbErr),

    #[error("failed to encode session payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode session payload: {0}")]
    Decode(#[source] serde_json::Error),
}

impl From<Error> for session_store::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Encode(e) => session_store::Error::Encode(e.to_string()),
            Error::Decode(e) => session_store::Error::Decode(e.to_string()),
            other => session_store::Error::Backend(other.to_string()),
        }
    }
}
