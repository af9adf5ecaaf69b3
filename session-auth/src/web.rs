//! Axum routes and middleware.
//!
//! ```rust,no_run
//! use axum::{middleware::from_fn_with_state, routing::get, Router};
//! use session_auth::{
//!     web::{self, AuthGate},
//!     MemorySessionStore, MemoryUserStore, SessionAuth, SessionConfig,
//! };
//! # use serde::Serialize;
//! # use session_auth::{AuthUser, UserId};
//! # #[derive(Debug, Clone, Serialize)]
//! # struct User;
//! # impl AuthUser for User {
//! #     fn id(&self) -> UserId { UserId::parse("1").unwrap() }
//! #     fn email(&self) -> &str { "" }
//! #     fn password_hash(&self) -> &str { "" }
//! # }
//!
//! type Auth = SessionAuth<MemorySessionStore, MemoryUserStore<User>>;
//!
//! let config = SessionConfig::default();
//! let auth: Auth = SessionAuth::new(MemorySessionStore::new(), MemoryUserStore::<User>::new());
//! let gate = AuthGate::new(auth.clone(), config.excluded_paths);
//!
//! let app: Router = Router::new()
//!     .route("/api/v1/status", get(|| async { "OK" }))
//!     .nest("/api/v1", web::session_router(auth.clone()))
//!     .layer(from_fn_with_state(gate, web::require_auth::<Auth>));
//! ```

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{delete, post},
    Form, Json, Router,
};
use cookie::Cookie;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::SessionAuth,
    backend::{self, Authenticator},
    policy::SessionPolicy,
    user_store::{AuthUser, UserQuery, UserStore},
    Error,
};

fn error(status: StatusCode, message: &'static str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// The credentials posted to the login route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    /// The email address.
    pub email: Option<String>,

    /// The plaintext password.
    pub password: Option<String>,
}

fn present(field: Option<&str>) -> Option<&str> {
    field.filter(|value| !value.trim().is_empty())
}

/// Routes issuing and destroying session cookies.
///
/// - `POST /auth_session/login`
/// - `DELETE /auth_session/logout`
pub fn session_router<Policy, Users>(auth: SessionAuth<Policy, Users>) -> Router
where
    Policy: SessionPolicy,
    Users: UserStore,
{
    Router::new()
        .route("/auth_session/login", post(login::<Policy, Users>))
        .route("/auth_session/login/", post(login::<Policy, Users>))
        .route("/auth_session/logout", delete(logout::<Policy, Users>))
        .route("/auth_session/logout/", delete(logout::<Policy, Users>))
        .with_state(auth)
}

#[tracing::instrument(level = "debug", skip_all, fields(user.email))]
async fn login<Policy, Users>(
    State(auth): State<SessionAuth<Policy, Users>>,
    Form(form): Form<LoginForm>,
) -> Response
where
    Policy: SessionPolicy,
    Users: UserStore,
{
    let Some(email) = present(form.email.as_deref()) else {
        return error(StatusCode::BAD_REQUEST, "email missing");
    };
    let Some(password) = present(form.password.as_deref()) else {
        return error(StatusCode::BAD_REQUEST, "password missing");
    };
    tracing::Span::current().record("user.email", email);

    let user = match auth
        .users()
        .search(&UserQuery::by_email(email))
        .await
        .map_err(Error::users)
    {
        Ok(users) => users.into_iter().next(),
        Err(err) => {
            tracing::error!(err = %err, "could not search users");
            None
        }
    };
    let Some(user) = user else {
        return error(StatusCode::NOT_FOUND, "no user found for this email");
    };

    if !user.is_valid_password(password) {
        return error(StatusCode::UNAUTHORIZED, "wrong password");
    }

    let Some(session_id) = auth.create_session(user.id()).await else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "could not create session");
    };

    let cookie = Cookie::build((auth.session_name().to_string(), session_id.to_string()))
        .path("/")
        .build();

    (AppendHeaders([(SET_COOKIE, cookie.to_string())]), Json(user)).into_response()
}

async fn logout<Policy, Users>(
    State(auth): State<SessionAuth<Policy, Users>>,
    headers: HeaderMap,
) -> Response
where
    Policy: SessionPolicy,
    Users: UserStore,
{
    if !auth.destroy_session(&headers).await {
        return StatusCode::NOT_FOUND.into_response();
    }

    Json(json!({})).into_response()
}

/// State of the [`require_auth`] middleware.
#[derive(Debug, Clone)]
pub struct AuthGate<Auth> {
    auth: Auth,
    excluded_paths: Arc<[String]>,
}

impl<Auth: Authenticator> AuthGate<Auth> {
    /// Guards every path outside `excluded_paths` with `auth`.
    pub fn new(auth: Auth, excluded_paths: impl Into<Arc<[String]>>) -> Self {
        Self {
            auth,
            excluded_paths: excluded_paths.into(),
        }
    }

    /// The authenticator requests are checked with.
    pub fn auth(&self) -> &Auth {
        &self.auth
    }
}

/// Middleware rejecting unauthenticated requests.
///
/// Requests for excluded paths pass through untouched. Any other request must
/// present credentials, or it is answered with 401, and those credentials
/// must resolve to a user, or it is answered with 403. The resolved user is
/// stored in the request extensions for [`CurrentUser`](crate::CurrentUser).
pub async fn require_auth<Auth: Authenticator>(
    State(gate): State<AuthGate<Auth>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if !backend::require_auth(Some(&path), &gate.excluded_paths) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();

    if !gate.auth.presents_credentials(&parts) {
        tracing::debug!(path = %path, "no credentials presented");
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let Some(user) = gate.auth.current_user(&parts).await else {
        tracing::debug!(path = %path, "credentials did not resolve to a user");
        return error(StatusCode::FORBIDDEN, "Forbidden");
    };

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(user);
    next.run(request).await
}
