//! Password, Basic and session-cookie authentication for web APIs.
//!
//! This crate tracks which user a request is made on behalf of. Users log in
//! once with an email and a password; in return they receive an opaque
//! session identifier in a cookie, which every later request presents until
//! the user logs out or the session expires.
//!
//! # Sessions
//!
//! Session lifecycles are defined by [`SessionPolicy`]. Three variants are
//! provided and all of them share one identifier generator:
//!
//! 1. [`MemorySessionStore`]: sessions live in process memory and never
//!    expire,
//! 2. [`ExpiringSessionStore`]: sessions live in process memory and expire
//!    after the configured [`SessionDuration`],
//! 3. [`PersistedSessionStore`]: sessions are rows of a [`RecordStore`] and
//!    expire like the previous variant.
//!
//! [`SessionBackend`] picks one of them from a [`SessionConfig`]. Expiration
//! is measured against a [`Clock`](clock::Clock), so tests can move time
//! forward with [`ManualClock`](clock::ManualClock).
//!
//! # Users
//!
//! User storage is decoupled from authentication: any storage engine for which
//! [`UserStore`] is implemented is supported. Likewise any user type which
//! implements [`AuthUser`] may be used. Passwords are stored as Argon2 hashes,
//! see [`password`].
//!
//! # Stores
//!
//! Record stores for sqlx are provided when the requisite feature flag is
//! given. As an example, SQLite backends can be used via
//! [`SqliteRecordStore`](sqlx_store::SqliteRecordStore).
//!
//! # Example
//!
//! Most applications will use this crate via axum.
//!
//! ```rust,no_run
//! use axum::{middleware::from_fn_with_state, routing::get, Router};
//! use serde::Serialize;
//! use session_auth::{
//!     password, web, AuthUser, CurrentUser, MemoryRecordStore, MemoryUserStore, SessionAuth,
//!     SessionBackend, SessionConfig, UserId,
//! };
//!
//! #[derive(Debug, Clone, Serialize)]
//! struct User {
//!     id: UserId,
//!     email: String,
//!     #[serde(skip)]
//!     password_hash: String,
//! }
//!
//! impl AuthUser for User {
//!     fn id(&self) -> UserId {
//!         self.id.clone()
//!     }
//!
//!     fn email(&self) -> &str {
//!         &self.email
//!     }
//!
//!     fn password_hash(&self) -> &str {
//!         &self.password_hash
//!     }
//! }
//!
//! type Auth = SessionAuth<SessionBackend, MemoryUserStore<User>>;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::from_env()?;
//!
//!     let users = MemoryUserStore::new();
//!     users
//!         .insert(User {
//!             id: UserId::parse("1")?,
//!             email: "ferris@example.com".to_string(),
//!             password_hash: password::hash_password("hunter42"),
//!         })
//!         .await;
//!
//!     let auth: Auth = SessionAuth::from_config(&config, users, MemoryRecordStore::default())?;
//!     let gate = web::AuthGate::new(auth.clone(), config.excluded_paths);
//!
//!     async fn me(CurrentUser(user): CurrentUser<User>) -> String {
//!         format!("Logged in as: {}", user.email)
//!     }
//!
//!     let app = Router::new()
//!         .route("/api/v1/users/me", get(me))
//!         .nest("/api/v1", web::session_router(auth))
//!         .layer(from_fn_with_state(gate, web::require_auth::<Auth>));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(
    clippy::all,
    nonstandard_style,
    future_incompatible,
    missing_debug_implementations
)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use crate::{
    accounts::Accounts,
    auth::{SessionAuth, DEFAULT_SESSION_NAME},
    backend::{require_auth, Authenticator},
    basic::{BasicAuth, Credentials},
    config::{AuthType, SessionConfig},
    db_store::PersistedSessionStore,
    error::Error,
    expiring_store::ExpiringSessionStore,
    expiry::{ExpirationPolicy, SessionDuration},
    extract::CurrentUser,
    memory_store::MemorySessionStore,
    policy::{SessionBackend, SessionPolicy},
    record_store::{MemoryRecordStore, NewSessionRecord, RecordStore},
    request::RequestContext,
    session::{SessionId, SessionRecord, UserId},
    user_store::{
        AuthUser, MemoryUserStore, RegistrableUser, UserQuery, UserRegistry, UserStore, UserUpdate,
    },
};
#[cfg(feature = "postgres")]
pub use crate::sqlx_store::PostgresRecordStore;
#[cfg(feature = "sqlite")]
pub use crate::sqlx_store::SqliteRecordStore;
#[cfg(feature = "sqlx")]
pub use crate::sqlx_store::SqlxRecordStore;

mod accounts;
mod auth;
mod backend;
mod basic;
pub mod clock;
pub mod config;
mod db_store;
mod error;
mod expiring_store;
mod expiry;
mod extract;
pub mod id;
mod memory_store;
pub mod password;
mod policy;
mod record_store;
pub mod request;
mod session;
#[cfg(feature = "sqlx")]
pub mod sqlx_store;
mod user_store;
pub mod web;

/// Results of session operations.
pub type Result<T = (), E = Error> = std::result::Result<T, E>;
