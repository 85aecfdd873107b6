use async_trait::async_trait;

use crate::error::Result;
use crate::payload::{SessionData, SessionRow};

/// The operations a session framework may invoke on a store.
///
/// Expiry is lazy: nothing deletes expired rows on its own. Reads compare the
/// stored expiry against the current time, and the `expired*` operations let
/// the caller find and reclaim what has lapsed.
///
/// None of the operations treat "nothing matched" as an error.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// All rows that have not expired yet (`expires >= now`).
    async fn all(&self) -> Result<Vec<SessionRow>>;

    /// All rows that have expired (`expires < now`).
    async fn expired(&self) -> Result<Vec<SessionRow>>;

    /// Number of rows that have not expired yet.
    async fn length(&self) -> Result<u64>;

    /// Number of expired rows.
    async fn expired_length(&self) -> Result<u64>;

    /// Removes every row in the table.
    async fn clear(&self) -> Result<()>;

    /// Removes expired rows only.
    async fn expired_clear(&self) -> Result<()>;

    /// Removes one session. Unknown IDs are not an error.
    async fn destroy(&self, session_id: &str) -> Result<()>;

    /// Removes every session that belongs to `user`.
    async fn destroy_user(&self, user: &str) -> Result<()>;

    /// Loads a session payload, or `None` if it is unknown or expired.
    async fn get<P: SessionData>(&self, session_id: &str) -> Result<Option<P>>;

    /// Stores a new session.
    ///
    /// This is an insert that ignores conflicts, **not** an upsert: when a row
    /// with `session_id` already exists it is left untouched. Use
    /// [`touch`](Self::touch) to update an existing session.
    async fn set<P: SessionData>(&self, session_id: &str, payload: &P) -> Result<()>;

    /// Overwrites the payload and expiry of an existing session. Does nothing
    /// if the session does not exist.
    async fn touch<P: SessionData>(&self, session_id: &str, payload: &P) -> Result<()>;

    /// Creates the session table if it does not exist yet.
    async fn create_table(&self) -> Result<()>;
}
