//! What the store needs to know about a session payload.
//!
//! The payload itself is opaque: it is serialized to JSON text and stored in
//! the data column as-is. The store only ever asks it for two things, its
//! expiry and the user it belongs to.

use chrono::DateTime;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use tower_sessions::session::Record;

use crate::error::{Error, Result};

/// A session payload the store can persist.
pub trait SessionData: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Expiry as milliseconds since the Unix epoch, if the payload tracks one.
    fn expires_at(&self) -> Option<i64>;

    /// Owner reference used by [`destroy_user`](crate::SessionRepository::destroy_user).
    fn user(&self) -> Option<String> {
        None
    }
}

/// Express-style session JSON.
///
/// Expiry is read from `cookie.expires` (an RFC 3339 timestamp or epoch
/// milliseconds), the user from the top-level `user` field.
impl SessionData for JsonValue {
    fn expires_at(&self) -> Option<i64> {
        match self.pointer("/cookie/expires")? {
            JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis()),
            JsonValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    fn user(&self) -> Option<String> {
        user_reference(self.get("user")?)
    }
}

impl SessionData for Record {
    fn expires_at(&self) -> Option<i64> {
        Some(epoch_millis(self.expiry_date))
    }

    fn user(&self) -> Option<String> {
        user_reference(self.data.get("user")?)
    }
}

/// One stored row, as returned by [`all`](crate::SessionRepository::all) and
/// [`expired`](crate::SessionRepository::expired).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRow {
    pub session_id: String,
    pub expires: i64,
    /// Serialized payload.
    pub data: String,
    pub user: Option<String>,
}

impl SessionRow {
    /// Decodes the stored payload.
    pub fn payload<P: DeserializeOwned>(&self) -> Result<P> {
        serde_json::from_str(&self.data).map_err(Error::Decode)
    }
}

pub(crate) fn epoch_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn now_millis() -> i64 {
    epoch_millis(OffsetDateTime::now_utc())
}

fn user_reference(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use tower_sessions::session::Id;

    use super::*;

    #[test]
    fn json_expiry_from_rfc3339_cookie() {
        let payload = json!({ "cookie": { "expires": "2030-01-01T00:00:00.250Z" } });
        assert_eq!(payload.expires_at(), Some(1_893_456_000_250));
    }

    #[test]
    fn json_expiry_from_millis_cookie() {
        let payload = json!({ "cookie": { "expires": 1_700_000_000_000_i64 } });
        assert_eq!(payload.expires_at(), Some(1_700_000_000_000));
    }

    #[test]
    fn json_without_expiry() {
        assert_eq!(json!({ "cookie": { "expires": null } }).expires_at(), None);
        assert_eq!(json!({ "views": 3 }).expires_at(), None);
        let unparsable = json!({ "cookie": { "expires": "tomorrow" } });
        assert_eq!(unparsable.expires_at(), None);
    }

    #[test]
    fn json_user_reference() {
        assert_eq!(json!({ "user": "alice" }).user().as_deref(), Some("alice"));
        assert_eq!(json!({ "user": 42 }).user().as_deref(), Some("42"));
        assert_eq!(json!({ "user": "" }).user(), None);
        assert_eq!(json!({ "user": { "id": 1 } }).user(), None);
        assert_eq!(json!({}).user(), None);
    }

    #[test]
    fn record_fields() {
        let expiry_date = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let record = Record {
            id: Id::default(),
            data: HashMap::from([("user".to_string(), json!("bob"))]),
            expiry_date,
        };

        assert_eq!(record.expires_at(), Some(1_700_000_000_000));
        assert_eq!(record.user().as_deref(), Some("bob"));
    }

    #[test]
    fn row_payload_decodes() {
        let row = SessionRow {
            session_id: "abc".into(),
            expires: 0,
            data: r#"{"views":2}"#.into(),
            user: None,
        };
        assert_eq!(row.payload::<JsonValue>().unwrap(), json!({ "views": 2 }));

        let bad = SessionRow {
            data: "not json".into(),
            ..row
        };
        assert!(matches!(bad.payload::<JsonValue>(), Err(Error::Decode(_))));
    }
}
