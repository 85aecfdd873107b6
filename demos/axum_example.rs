//! Axum Example for seaorm-session-store
//!
//! This example demonstrates how to use `SqlSessionStore` as the backend of a
//! `tower-sessions` layer in an Axum application. It shows how to configure the
//! store, create the session table, sweep expired sessions, and use sessions
//! to store and retrieve values across requests.
//!
//! # Running the example
//!
//! 1. Make sure you have a MySQL or MariaDB server running
//! 2. Point the store at it through the environment (a `.env` file works too):
//!    ```bash
//!    export HOST=127.0.0.1
//!    export DATABASE_USER=root
//!    export DATABASE_PASSWORD=password
//!    export DATABASE_NAME=sessions
//!    ```
//! 3. Run the example:
//!    ```bash
//!    cargo run --example axum_example
//!    ```
//! 4. The server will start on http://127.0.0.1:3000
//!
//! # Testing the example
//!
//! Once the server is running, you can test it with curl:
//!
//! ```bash
//! # Set a session value
//! curl -v -c cookies.txt -X POST "http://127.0.0.1:3000/set?name=username&value=john_doe"
//!
//! # Get the session value
//! curl -v -b cookies.txt "http://127.0.0.1:3000/get?name=username"
//!
//! # Clear the session
//! curl -v -b cookies.txt -c cookies.txt -X POST http://127.0.0.1:3000/clear
//! ```

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use seaorm_session_store::{SessionRepository, SqlSessionStore, StoreOptions};
use std::{collections::HashMap, net::SocketAddr, time::Duration};
use time::Duration as TimeDuration;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Application state that will be shared across handlers
#[derive(Clone)]
struct AppState {
    store: SqlSessionStore,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for better logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    // Load environment variables from .env file if present
    dotenv().ok();

    // Environment variables take precedence over these options
    let store = SqlSessionStore::new(
        StoreOptions::default()
            .with_database("sessions")
            .with_table_name("SESSIONS"),
    )?;

    info!(config = ?store.config(), "Session store configured");

    store.create_table().await?;

    // Expired sessions are only filtered out on read; reclaim them periodically
    let sweeper = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.expired_clear().await {
                warn!(error = %e, "Failed to clear expired sessions");
            }
        }
    });

    // Create the app state
    let state = AppState {
        store: store.clone(),
    };

    // Session expiry - sessions will expire after 24 hours of inactivity
    let session_expiry = Expiry::OnInactivity(TimeDuration::hours(24));

    // Create the session layer with our store and configuration
    let session_layer = SessionManagerLayer::new(store)
        .with_secure(false) // Allow non-HTTPS for development
        .with_expiry(session_expiry);

    // Set up routes with middleware
    let app = Router::new()
        .route("/", get(index))
        .route("/set", post(set_session_value))
        .route("/get", get(get_session_value))
        .route("/clear", post(clear_session))
        .route("/stats", get(session_stats))
        .with_state(state)
        .layer(session_layer);

    // Run the server
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("Server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// Route handlers

/// Index route that shows basic usage information
async fn index() -> impl IntoResponse {
    Html(
        r#"
        <html>
            <head><title>SQL Session Store Example</title></head>
            <body>
                <h1>SQL Session Store Example</h1>
                <p>This example demonstrates tower-sessions backed by the single-table SqlSessionStore.</p>
                
                <h2>Available Routes:</h2>
                <ul>
                    <li><code>POST /set?name=key&value=some_value</code> - Set a session value</li>
                    <li><code>GET /get?name=key</code> - Get a session value</li>
                    <li><code>POST /clear</code> - Clear the session</li>
                    <li><code>GET /stats</code> - Count live and expired sessions</li>
                </ul>
            </body>
        </html>
        "#,
    )
}

/// Set a value in the session
///
/// Example: POST /set?name=username&value=john_doe
async fn set_session_value(
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let name = params.get("name");
    let value = params.get("value");

    match (name, value) {
        (Some(name), Some(value)) => {
            // Set the value in the session
            if let Err(e) = session.insert(name, value).await {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to set session value: {}", e),
                );
            }

            (
                StatusCode::OK,
                format!("Successfully set session value '{}' to '{}'", name, value),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            "Missing name or value parameter".to_string(),
        ),
    }
}

/// Get a value from the session
///
/// Example: GET /get?name=username
async fn get_session_value(
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let name = params.get("name");

    match name {
        Some(name) => {
            // Try to get the value from the session
            match session.get::<String>(name).await {
                Ok(Some(value)) => (
                    StatusCode::OK,
                    format!("Session value '{}' = '{}'", name, value),
                ),
                Ok(None) => (
                    StatusCode::NOT_FOUND,
                    format!("No session value found for '{}'", name),
                ),
                Err(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to get session value: {}", e),
                ),
            }
        }
        None => (
            StatusCode::BAD_REQUEST,
            "Missing name parameter".to_string(),
        ),
    }
}

/// Clear the session by destroying it
///
/// This will remove all session data and invalidate the session cookie
async fn clear_session(session: Session) -> impl IntoResponse {
    match session.flush().await {
        Ok(_) => (StatusCode::OK, "Session cleared successfully".to_string()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to clear session: {}", e),
        ),
    }
}

/// Count live and expired sessions straight from the store
async fn session_stats(State(state): State<AppState>) -> impl IntoResponse {
    let live = state.store.length().await;
    let expired = state.store.expired_length().await;

    match (live, expired) {
        (Ok(live), Ok(expired)) => (
            StatusCode::OK,
            format!(
                "{} live sessions, {} expired sessions awaiting cleanup",
                live, expired
            ),
        ),
        (Err(e), _) | (_, Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to count sessions: {}", e),
        ),
    }
}
