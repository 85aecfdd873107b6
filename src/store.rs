use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{QueryResult, Value};
use tracing::instrument::WithSubscriber;
use tracing::{debug, debug_span, Dispatch, Instrument};

use crate::completion::complete;
use crate::config::{StoreConfig, StoreOptions};
use crate::connection::Connector;
use crate::error::{ConfigError, Error, Result};
use crate::payload::{now_millis, SessionData, SessionRow};
use crate::repository::SessionRepository;
use crate::statements::{Expiry, SqlTemplates, COUNT_ALIAS};

/// A session store backed by a single SQL table, accessed through Sea-ORM.
///
/// Each operation opens its own connection, runs one parameterized statement
/// and closes the connection again before returning, whether the statement
/// succeeded or not. Expired sessions are never removed in the background;
/// they are filtered out when read and can be reclaimed with
/// [`expired_clear`](SessionRepository::expired_clear).
///
/// # Usage
///
/// ```no_run
/// use seaorm_session_store::{SessionRepository, SqlSessionStore, StoreOptions};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqlSessionStore::new(
///     StoreOptions::default()
///         .with_host("localhost")
///         .with_credentials("app", "secret")
///         .with_database("web"),
/// )?;
/// store.create_table().await?;
///
/// let payload = json!({ "cookie": { "expires": "2030-01-01T00:00:00Z" }, "user": "alice" });
/// store.set("abc", &payload).await?;
///
/// let loaded: Option<serde_json::Value> = store.get("abc").await?;
/// assert_eq!(loaded, Some(payload));
/// # Ok(())
/// # }
/// ```
///
/// # Database Schema
///
/// Table and column names are configurable; with the defaults:
///
/// | Column     | Type                     | Description                          |
/// |------------|--------------------------|--------------------------------------|
/// | SESSION_ID | VARCHAR(128) primary key | Session ID                           |
/// | EXPIRES    | BIGINT                   | Expiry, epoch milliseconds           |
/// | DATA       | MEDIUMTEXT / TEXT        | JSON serialized session payload      |
/// | USER       | VARCHAR(255)             | Owner reference, empty when unknown  |
///
/// # Error Handling
///
/// Construction fails with a [`ConfigError`] if the configuration is invalid.
/// After that, operations report failures through their returned
/// [`Result`]:
///
/// - database errors, including a connection that could not be opened → [`Error::Query`]
/// - payload serialization errors → [`Error::Encode`]
/// - payload deserialization errors → [`Error::Decode`]
#[derive(Debug, Clone)]
pub struct SqlSessionStore {
    config: Arc<StoreConfig>,
    sql: Arc<SqlTemplates>,
    connector: Arc<Connector>,
    /// Logger the operations run under instead of the default one.
    dispatch: Option<Dispatch>,
}

impl SqlSessionStore {
    /// Creates a store from `options`, with `HOST`, `DATABASE_PORT`,
    /// `DATABASE_USER`, `DATABASE_PASSWORD` and `DATABASE_NAME` taking
    /// precedence when set in the environment.
    ///
    /// Fails without touching the database when the configuration is
    /// invalid.
    pub fn new(options: StoreOptions) -> std::result::Result<Self, ConfigError> {
        StoreConfig::from_env(&options).map(Self::from_config)
    }

    /// Creates a store from an already resolved configuration.
    ///
    /// Use this to resolve against something other than the process
    /// environment, or to keep a copy of the configuration around.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use seaorm_session_store::{resolve, Defaults, SqlSessionStore, StoreOptions};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let options = StoreOptions::default().with_database("web");
    /// let config = resolve(|_| None, &options, &Defaults::default())?;
    /// let store = SqlSessionStore::from_config(config);
    /// assert_eq!(store.config().database, "web");
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: StoreConfig) -> Self {
        let sql = SqlTemplates::new(
            config.backend.db_backend(),
            &config.table_name,
            &config.column_names,
        );
        let connector = Connector::new(&config);

        Self {
            config: Arc::new(config),
            sql: Arc::new(sql),
            connector: Arc::new(connector),
            dispatch: None,
        }
    }

    /// Runs every operation of this store under `dispatch`, so log output can
    /// be routed, silenced or captured per store.
    pub fn with_dispatch(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    /// The resolved configuration this store runs with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Closes the shared connection pool. Only meaningful in pooled mode;
    /// with per-operation connections there is nothing left open.
    pub async fn shutdown(&self) {
        self.traced("shutdown", self.connector.shutdown()).await
    }

    pub(crate) async fn traced<F>(&self, op: &'static str, fut: F) -> F::Output
    where
        F: Future,
    {
        // The span has to be created under the injected dispatcher.
        let scoped = async move { fut.instrument(debug_span!("session_store", op)).await };
        match &self.dispatch {
            Some(dispatch) => scoped.with_subscriber(dispatch.clone()).await,
            None => scoped.await,
        }
    }

    /// Inserts unless the ID is taken. Returns the number of rows inserted.
    pub(crate) async fn insert_ignore<P: SessionData>(
        &self,
        op: &'static str,
        session_id: &str,
        payload: &P,
    ) -> Result<u64> {
        let (data, expires, user) = self.encode(payload)?;
        self.execute(
            op,
            &self.sql.insert_ignore,
            [session_id.into(), expires.into(), data.into(), user.into()],
        )
        .await
    }

    /// Updates data and expiry of an existing row. Returns the number of rows
    /// updated.
    pub(crate) async fn update<P: SessionData>(
        &self,
        op: &'static str,
        session_id: &str,
        payload: &P,
    ) -> Result<u64> {
        let (data, expires, _) = self.encode(payload)?;
        self.execute(
            op,
            &self.sql.update_by_id,
            [data.into(), expires.into(), session_id.into()],
        )
        .await
    }

    /// Like [`update`](Self::update), but also rewrites the owner column.
    pub(crate) async fn update_with_user<P: SessionData>(
        &self,
        op: &'static str,
        session_id: &str,
        payload: &P,
    ) -> Result<u64> {
        let (data, expires, user) = self.encode(payload)?;
        self.execute(
            op,
            &self.sql.update_with_user_by_id,
            [data.into(), expires.into(), user.into(), session_id.into()],
        )
        .await
    }

    fn encode<P: SessionData>(&self, payload: &P) -> Result<(String, i64, String)> {
        let data = serde_json::to_string(payload).map_err(Error::Encode)?;
        let expires = payload.expires_at().unwrap_or_else(|| {
            let max_age =
                i64::try_from(self.config.default_max_age.as_millis()).unwrap_or(i64::MAX);
            now_millis().saturating_add(max_age)
        });
        let user = payload.user().unwrap_or_default();
        Ok((data, expires, user))
    }

    async fn execute<const N: usize>(
        &self,
        op: &'static str,
        sql: &str,
        values: [Value; N],
    ) -> Result<u64> {
        let stmt = self.sql.statement(sql, values);
        let conn = self.connector.open().await;
        let outcome = conn.execute(stmt).await.map(|res| res.rows_affected());
        complete(op, conn, outcome).await
    }

    async fn fetch_one<const N: usize>(
        &self,
        op: &'static str,
        sql: &str,
        values: [Value; N],
    ) -> Result<Option<QueryResult>> {
        let stmt = self.sql.statement(sql, values);
        let conn = self.connector.open().await;
        let outcome = conn.query_one(stmt).await;
        complete(op, conn, outcome).await
    }

    async fn fetch_all<const N: usize>(
        &self,
        op: &'static str,
        sql: &str,
        values: [Value; N],
    ) -> Result<Vec<QueryResult>> {
        let stmt = self.sql.statement(sql, values);
        let conn = self.connector.open().await;
        let outcome = conn.query_all(stmt).await;
        complete(op, conn, outcome).await
    }

    async fn rows(&self, op: &'static str, expiry: Expiry) -> Result<Vec<SessionRow>> {
        self.fetch_all(op, self.sql.select(expiry), [now_millis().into()])
            .await?
            .iter()
            .map(|row| self.session_row(row))
            .collect()
    }

    async fn count(&self, op: &'static str, expiry: Expiry) -> Result<u64> {
        let row = self
            .fetch_one(op, self.sql.count(expiry), [now_millis().into()])
            .await?;
        let total = match row {
            Some(row) => row.try_get::<i64>("", COUNT_ALIAS)?,
            None => 0,
        };
        Ok(u64::try_from(total).unwrap_or_default())
    }

    fn session_row(&self, row: &QueryResult) -> Result<SessionRow> {
        let cols = &self.config.column_names;
        let user: String = row.try_get("", &cols.user)?;

        Ok(SessionRow {
            session_id: row.try_get("", &cols.session_id)?,
            expires: row.try_get("", &cols.expires)?,
            data: row.try_get("", &cols.data)?,
            user: (!user.is_empty()).then_some(user),
        })
    }
}

#[async_trait]
impl SessionRepository for SqlSessionStore {
    async fn all(&self) -> Result<Vec<SessionRow>> {
        self.traced("all", self.rows("all", Expiry::Live)).await
    }

    async fn expired(&self) -> Result<Vec<SessionRow>> {
        self.traced("expired", self.rows("expired", Expiry::Expired))
            .await
    }

    async fn length(&self) -> Result<u64> {
        self.traced("length", self.count("length", Expiry::Live))
            .await
    }

    async fn expired_length(&self) -> Result<u64> {
        self.traced(
            "expired_length",
            self.count("expired_length", Expiry::Expired),
        )
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.traced("clear", async {
            self.execute("clear", &self.sql.truncate, []).await?;
            debug!("all sessions cleared");
            Ok::<_, Error>(())
        })
        .await
    }

    async fn expired_clear(&self) -> Result<()> {
        self.traced("expired_clear", async {
            let rows_affected = self
                .execute(
                    "expired_clear",
                    &self.sql.delete_expired,
                    [now_millis().into()],
                )
                .await?;
            debug!(rows_affected, "expired sessions cleared");
            Ok::<_, Error>(())
        })
        .await
    }

    async fn destroy(&self, session_id: &str) -> Result<()> {
        self.traced("destroy", async {
            let rows_affected = self
                .execute("destroy", &self.sql.delete_by_id, [session_id.into()])
                .await?;
            if rows_affected == 0 {
                debug!(session_id, "no session to destroy");
            } else {
                debug!(session_id, rows_affected, "session destroyed");
            }
            Ok::<_, Error>(())
        })
        .await
    }

    async fn destroy_user(&self, user: &str) -> Result<()> {
        self.traced("destroy_user", async {
            let rows_affected = self
                .execute("destroy_user", &self.sql.delete_by_user, [user.into()])
                .await?;
            debug!(user, rows_affected, "user sessions destroyed");
            Ok::<_, Error>(())
        })
        .await
    }

    async fn get<P: SessionData>(&self, session_id: &str) -> Result<Option<P>> {
        self.traced("get", async {
            let row = self
                .fetch_one(
                    "get",
                    &self.sql.get,
                    [session_id.into(), now_millis().into()],
                )
                .await?;

            // Unknown and expired sessions look the same from here.
            let Some(row) = row else {
                return Ok(None);
            };
            let data: String = row.try_get("", &self.config.column_names.data)?;
            serde_json::from_str(&data).map(Some).map_err(Error::Decode)
        })
        .await
    }

    async fn set<P: SessionData>(&self, session_id: &str, payload: &P) -> Result<()> {
        self.traced("set", async {
            let rows_affected = self.insert_ignore("set", session_id, payload).await?;
            if rows_affected == 0 {
                debug!(session_id, "session already exists, insert ignored");
            }
            Ok::<_, Error>(())
        })
        .await
    }

    async fn touch<P: SessionData>(&self, session_id: &str, payload: &P) -> Result<()> {
        self.traced("touch", async {
            let rows_affected = self.update("touch", session_id, payload).await?;
            if rows_affected == 0 {
                debug!(session_id, "no session to touch");
            }
            Ok::<_, Error>(())
        })
        .await
    }

    async fn create_table(&self) -> Result<()> {
        self.traced("create_table", async {
            self.execute("create_table", &self.sql.create_table, [])
                .await?;
            debug!(table = %self.config.table_name, "session table ready");
            Ok::<_, Error>(())
        })
        .await
    }
}
