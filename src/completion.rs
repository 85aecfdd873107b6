//! Completion of a store operation.
//!
//! Every operation ends here: the connection is closed first, then the
//! statement's outcome is handed back to the caller as a [`Result`]. Query
//! failures are logged and returned, never raised.

use sea_orm::DbErr;
use tracing::{debug, error};

use crate::connection::Connection;
use crate::error::{Error, Result};

pub(crate) async fn complete<T>(
    op: &'static str,
    mut conn: Connection,
    outcome: std::result::Result<T, DbErr>,
) -> Result<T> {
    conn.close().await;

    match outcome {
        Ok(value) => {
            debug!(op, "session store operation completed");
            Ok(value)
        }
        Err(err) => {
            error!(op, error = %err, "session store operation failed");
            Err(Error::Query(err))
        }
    }
}
