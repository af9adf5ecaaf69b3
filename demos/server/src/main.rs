//! Run with
//!
//! ```not_rust
//! AUTH_TYPE=session_db_auth SESSION_DURATION=60 cargo run -p demo-server
//! ```

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use session_auth::{
    web, AuthType, BasicAuth, CurrentUser, SessionAuth, SessionBackend, SessionConfig,
    SqliteRecordStore,
};
use sqlx::sqlite::SqlitePoolOptions;

use crate::users::{User, Users};

mod users;

type Sessions = SessionAuth<SessionBackend<SqliteRecordStore>, Users>;
type Basic = BasicAuth<Users>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| "session_auth=debug,sqlx=warn,tower_http=debug".into(),
        )))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    let config = SessionConfig::from_env()?;
    let users = users::seeded().await?;

    let api = Router::new()
        .route("/status", get(status))
        .route("/unauthorized", get(unauthorized))
        .route("/forbidden", get(forbidden))
        .route("/users/me", get(me));

    let app = if config.auth_type == AuthType::Basic {
        let gate = web::AuthGate::new(BasicAuth::new(users), config.excluded_paths);
        Router::new()
            .nest("/api/v1", api)
            .layer(from_fn_with_state(gate, web::require_auth::<Basic>))
    } else {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let records = SqliteRecordStore::new(pool);
        records.migrate().await?;

        let auth: Sessions = SessionAuth::from_config(&config, users, records)?;
        let gate = web::AuthGate::new(auth.clone(), config.excluded_paths);
        Router::new()
            .nest("/api/v1", api.merge(web::session_router(auth)))
            .layer(from_fn_with_state(gate, web::require_auth::<Sessions>))
    };

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!(auth_type = %config.auth_type, "listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

async fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
}

async fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "error": "Forbidden" }))).into_response()
}

async fn me(CurrentUser(user): CurrentUser<User>) -> Json<User> {
    Json(user)
}
