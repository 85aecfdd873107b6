//! # Single-Table SQL Session Store on Sea-ORM
//!
//! A session persistence backend that keeps one row per session in a single
//! relational table, using [Sea-ORM](https://crates.io/crates/sea-orm) to talk
//! to MySQL/MariaDB, PostgreSQL or SQLite.
//!
//! The store exposes the classic session-store contract (`get`, `set`,
//! `touch`, `destroy`, `all`, `length`, `clear`) plus expiry-aware extensions
//! (`expired`, `expired_length`, `expired_clear`, `destroy_user`,
//! `create_table`) through the [`SessionRepository`] trait, and can be plugged
//! straight into [`tower-sessions`](https://crates.io/crates/tower-sessions).
//!
//! ## Features
//!
//! - Configurable table and column names
//! - Environment variables override caller options, which override defaults;
//!   invalid configuration fails at construction
//! - A fresh connection per operation, always closed afterwards, or an opt-in
//!   shared pool
//! - Every value bound as a statement parameter
//! - Lazy expiry: expired rows are filtered out at read time and removed only
//!   when asked to
//! - Session payloads stored as JSON text
//!
//! ## Quick Start
//!
//! ```no_run
//! use seaorm_session_store::{SessionRepository, SqlSessionStore, StoreOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // HOST, DATABASE_PORT, DATABASE_USER, DATABASE_PASSWORD and DATABASE_NAME
//! // take precedence over these options when set.
//! let store = SqlSessionStore::new(
//!     StoreOptions::default()
//!         .with_host("localhost")
//!         .with_database("sessions")
//!         .with_table_name("web_sessions"),
//! )?;
//!
//! store.create_table().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Axum Integration Example
//!
//! ```no_run
//! use axum::{Router, routing::get};
//! use time::Duration;
//! use tower_sessions::{Expiry, SessionManagerLayer};
//! use seaorm_session_store::{SessionRepository, SqlSessionStore, StoreOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqlSessionStore::new(StoreOptions::default())?;
//! store.create_table().await?;
//!
//! let session_layer = SessionManagerLayer::new(store)
//!     .with_expiry(Expiry::OnInactivity(Duration::days(1)))
//!     .with_secure(true);
//!
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "Hello, world!" }))
//!     .layer(session_layer);
//! # Ok(())
//! # }
//! ```
//!
//! ## `set` Does Not Overwrite
//!
//! [`SessionRepository::set`] is an insert that ignores conflicts. Setting a
//! session ID that already exists leaves the stored row untouched; updates go
//! through [`SessionRepository::touch`].

mod completion;
pub mod config;
mod connection;
mod error;
mod payload;
mod repository;
mod statements;
mod store;
mod tower;

pub use config::{
    resolve, Backend, ColumnNames, ColumnOptions, ConnectionMode, Defaults, StoreConfig,
    StoreOptions,
};
pub use error::{ConfigError, Error, Result};
pub use payload::{SessionData, SessionRow};
pub use repository::SessionRepository;
pub use store::SqlSessionStore;

// Re-export necessary types from tower-sessions for convenience
/// Session storage error types and results
///
/// These are re-exported from the `tower-sessions` crate for convenience.
pub use tower_sessions::session_store;

/// Trait for implementing session store expiration cleanup
///
/// Implemented by `SqlSessionStore` on top of
/// [`SessionRepository::expired_clear`].
pub use tower_sessions::ExpiredDeletion;

/// Session identifier type
pub use tower_sessions::session::Id;

/// Session record type
///
/// Stored by the `tower-sessions` integration; also implements [`SessionData`].
pub use tower_sessions::session::Record;

/// Trait for implementing session storage backends
pub use tower_sessions::SessionStore;
