//! Connection lifecycle.
//!
//! Every store operation acquires a [`Connection`] right before it issues its
//! statement and closes it once the statement completed, whatever the
//! outcome. In the default per-operation mode that is a dedicated SeaORM
//! connection capped at a single physical connection; in pooled mode it is a
//! handle onto a shared pool that is created on first use.

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, ExecResult, QueryResult,
    RuntimeErr, Statement,
};
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use crate::config::{ConnectionMode, StoreConfig};

/// Opens connections for store operations.
#[derive(Debug)]
pub(crate) struct Connector {
    url: String,
    mode: ConnectionMode,
    pool: OnceCell<DatabaseConnection>,
}

impl Connector {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            url: config.connection_url().to_owned(),
            mode: config.connection_mode,
            pool: OnceCell::new(),
        }
    }

    /// Acquires a connection.
    ///
    /// A failure is logged and yields a [`Connection`] without a handle; the
    /// statement issued on it fails and reports the error to the caller.
    pub async fn open(&self) -> Connection {
        match self.mode {
            ConnectionMode::PerOperation => match Database::connect(self.options(1)).await {
                Ok(db) => Connection::owned(db),
                Err(err) => {
                    error!(error = %err, "failed to open session store connection");
                    Connection::unavailable(err)
                }
            },
            ConnectionMode::Pooled { max_connections } => {
                let pool = self
                    .pool
                    .get_or_try_init(|| async {
                        debug!(max_connections, "creating session store connection pool");
                        Database::connect(self.options(max_connections)).await
                    })
                    .await;
                match pool {
                    Ok(db) => Connection::shared(db.clone()),
                    Err(err) => {
                        error!(error = %err, "failed to open session store connection pool");
                        Connection::unavailable(err)
                    }
                }
            }
        }
    }

    /// Closes the shared pool, if one was created.
    pub async fn shutdown(&self) {
        // Clones share the pool, so closing one closes all of them.
        if let Some(db) = self.pool.get() {
            if let Err(err) = db.clone().close().await {
                warn!(error = %err, "failed to close session store connection pool");
            }
        }
    }

    fn options(&self, max_connections: u32) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.max_connections(max_connections)
            .min_connections(0)
            .sqlx_logging(false);
        opt
    }
}

/// A connection scoped to one operation.
#[derive(Debug)]
pub(crate) struct Connection {
    db: Option<DatabaseConnection>,
    /// Whether closing also tears down the underlying SeaORM connection.
    owned: bool,
    /// Why the connection could not be opened.
    failure: Option<String>,
}

impl Connection {
    fn owned(db: DatabaseConnection) -> Self {
        Self {
            db: Some(db),
            owned: true,
            failure: None,
        }
    }

    fn shared(db: DatabaseConnection) -> Self {
        Self {
            db: Some(db),
            owned: false,
            failure: None,
        }
    }

    fn unavailable(err: DbErr) -> Self {
        Self {
            db: None,
            owned: false,
            failure: Some(err.to_string()),
        }
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    pub async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.handle()?.execute(stmt).await
    }

    pub async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.handle()?.query_one(stmt).await
    }

    pub async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.handle()?.query_all(stmt).await
    }

    /// Releases the connection. Calling it again, or on a connection that
    /// never opened, does nothing.
    pub async fn close(&mut self) {
        let Some(db) = self.db.take() else {
            return;
        };
        if self.owned {
            if let Err(err) = db.close().await {
                warn!(error = %err, "failed to close session store connection");
            }
        }
    }

    fn handle(&self) -> Result<&DatabaseConnection, DbErr> {
        self.db.as_ref().ok_or_else(|| {
            let reason = match &self.failure {
                Some(cause) => format!("session store connection is not open: {cause}"),
                None => "session store connection is closed".to_string(),
            };
            DbErr::Conn(RuntimeErr::Internal(reason))
        })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbBackend;

    use super::*;
    use crate::config::{resolve, Backend, Defaults, StoreOptions};

    fn sqlite_config(path: &std::path::Path, options: StoreOptions) -> StoreConfig {
        let options = options
            .with_backend(Backend::Sqlite)
            .with_database(path.display().to_string());
        resolve(|_| None, &options, &Defaults::default()).unwrap()
    }

    fn select_one() -> Statement {
        Statement::from_string(DbBackend::Sqlite, "SELECT 1 AS one")
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(&dir.path().join("s.db"), StoreOptions::default());
        let connector = Connector::new(&config);

        let mut conn = connector.open().await;
        assert!(conn.is_open());
        assert!(conn.query_one(select_one()).await.unwrap().is_some());

        conn.close().await;
        assert!(!conn.is_open());
        conn.close().await;

        let err = conn.query_one(select_one()).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn failed_open_surfaces_on_first_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("s.db");
        let connector = Connector::new(&sqlite_config(&path, StoreOptions::default()));

        let mut conn = connector.open().await;
        assert!(!conn.is_open());

        let err = conn.execute(select_one()).await.unwrap_err();
        assert!(matches!(err, DbErr::Conn(_)));
        assert!(err.to_string().contains("not open"));

        conn.close().await;
    }

    #[tokio::test]
    async fn pooled_connections_share_one_pool() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Connector::new(&sqlite_config(
            &dir.path().join("s.db"),
            StoreOptions::default().with_pool(2),
        ));

        let mut first = connector.open().await;
        first.close().await;

        let mut second = connector.open().await;
        assert!(second.query_one(select_one()).await.unwrap().is_some());
        second.close().await;

        connector.shutdown().await;
    }
}
