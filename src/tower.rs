//! [`tower_sessions`] integration.
//!
//! Lets a [`SqlSessionStore`] back a `SessionManagerLayer` directly. The
//! records are stored in the same table, in the same format, as payloads
//! written through [`SessionRepository`].

use async_trait::async_trait;
use tower_sessions::{session::Id, session::Record, session_store, ExpiredDeletion, SessionStore};
use tracing::warn;

use crate::error::Result;
use crate::repository::SessionRepository;
use crate::store::SqlSessionStore;

/// Attempts at finding a free session ID before `create` gives up.
const MAX_CREATE_ATTEMPTS: usize = 8;

impl SqlSessionStore {
    async fn create_record(&self, record: &mut Record) -> session_store::Result<()> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let inserted = self
                .insert_ignore("create", &record.id.to_string(), &*record)
                .await?;
            if inserted > 0 {
                return Ok(());
            }
            // Session ID collision
            record.id = Id::default();
        }

        warn!(
            attempts = MAX_CREATE_ATTEMPTS,
            "could not find a free session id"
        );
        Err(session_store::Error::Backend(
            "could not find a free session id".to_string(),
        ))
    }

    /// `save` must write the record whether or not it exists yet. The owner
    /// is rewritten too, so a session that logs in after creation can be
    /// found by [`destroy_user`](SessionRepository::destroy_user).
    async fn save_record(&self, record: &Record) -> Result<()> {
        let session_id = record.id.to_string();
        if self.update_with_user("save", &session_id, record).await? == 0 {
            self.insert_ignore("save", &session_id, record).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    /// Inserts a new record, picking a fresh ID if the current one is taken.
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.traced("create", self.create_record(record)).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        Ok(self.traced("save", self.save_record(record)).await?)
    }

    /// Returns `None` for unknown and expired sessions alike.
    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let record: Option<Record> = self.get(&session_id.to_string()).await?;
        Ok(record)
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        Ok(self.destroy(&session_id.to_string()).await?)
    }
}

#[async_trait]
impl ExpiredDeletion for SqlSessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        Ok(self.expired_clear().await?)
    }
}
