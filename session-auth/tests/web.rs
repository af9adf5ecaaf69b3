use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        Request, StatusCode,
    },
    middleware::from_fn_with_state,
    response::Response,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{json, Value};
use session_auth::{
    clock::ManualClock, password, web, AuthUser, BasicAuth, CurrentUser, ExpirationPolicy,
    ExpiringSessionStore, MemorySessionStore, MemoryUserStore, SessionAuth, SessionConfig,
    SessionDuration, UserId,
};
use tower::ServiceExt;

#[derive(Debug, Clone, Serialize)]
struct User {
    id: UserId,
    email: String,
    #[serde(skip)]
    password_hash: String,
}

impl AuthUser for User {
    fn id(&self) -> UserId {
        self.id.clone()
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

type Auth = SessionAuth<ExpiringSessionStore, MemoryUserStore<User>>;

async fn users() -> MemoryUserStore<User> {
    let users = MemoryUserStore::new();
    users
        .insert(User {
            id: UserId::parse("7").unwrap(),
            email: "ferris@example.com".to_string(),
            password_hash: password::hash_password("hunter42"),
        })
        .await;
    users
}

async fn me(CurrentUser(user): CurrentUser<User>) -> String {
    user.email
}

async fn session_app(clock: ManualClock) -> Router {
    let store = ExpiringSessionStore::new(
        MemorySessionStore::new(),
        ExpirationPolicy::with_clock(SessionDuration::from_secs(5), clock),
    );
    let auth: Auth = SessionAuth::new(store, users().await);
    let gate = web::AuthGate::new(auth.clone(), SessionConfig::default().excluded_paths);

    Router::new()
        .route("/api/v1/status", get(|| async { "OK" }))
        .route("/api/v1/users/me", get(me))
        .nest("/api/v1", web::session_router(auth))
        .layer(from_fn_with_state(gate, web::require_auth::<Auth>))
}

async fn json_body(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn login(email: &str, password: &str) -> Request<Body> {
    Request::post("/api/v1/auth_session/login")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "email={}&password={}",
            email.replace('@', "%40"),
            password
        )))
        .unwrap()
}

fn with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn session_login_flow() {
    let clock = ManualClock::default();
    let app = session_app(clock.clone()).await;

    // Public paths need no session.
    let res = app
        .clone()
        .oneshot(Request::get("/api/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Protected paths do.
    let res = app
        .clone()
        .oneshot(Request::get("/api/v1/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await, json!({ "error": "Unauthorized" }));

    // Log in with invalid credentials.
    let res = app
        .clone()
        .oneshot(login("ferris@example.com", "bogus"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await, json!({ "error": "wrong password" }));

    let res = app
        .clone()
        .oneshot(login("crab@example.com", "hunter42"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "no user found for this email" })
    );

    // Log in with valid credentials.
    let res = app
        .clone()
        .oneshot(login("ferris@example.com", "hunter42"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("_my_session_id="));
    assert_eq!(
        json_body(res).await,
        json!({ "id": "7", "email": "ferris@example.com" })
    );

    // The session authenticates until it expires.
    clock.advance(time::Duration::seconds(3));
    let res = app
        .clone()
        .oneshot(with_cookie("GET", "/api/v1/users/me", &cookie))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ferris@example.com");

    clock.advance(time::Duration::seconds(3));
    let res = app
        .clone()
        .oneshot(with_cookie("GET", "/api/v1/users/me", &cookie))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(res).await, json!({ "error": "Forbidden" }));
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let app = session_app(ManualClock::default()).await;

    let res = app
        .clone()
        .oneshot(login("ferris@example.com", "hunter42"))
        .await
        .unwrap();
    let cookie = res.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let res = app
        .clone()
        .oneshot(with_cookie("DELETE", "/api/v1/auth_session/logout", &cookie))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({}));

    // The cookie no longer resolves, so the middleware turns it away.
    let res = app
        .clone()
        .oneshot(with_cookie("DELETE", "/api/v1/auth_session/logout", &cookie))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(with_cookie("GET", "/api/v1/users/me", &cookie))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = session_app(ManualClock::default()).await;

    let res = app
        .clone()
        .oneshot(login("", "hunter42"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await, json!({ "error": "email missing" }));

    let res = app
        .oneshot(login("ferris@example.com", ""))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await, json!({ "error": "password missing" }));
}

#[tokio::test]
async fn basic_auth_guards_routes() {
    type Basic = BasicAuth<MemoryUserStore<User>>;

    let auth: Basic = BasicAuth::new(users().await);
    let gate = web::AuthGate::new(auth, SessionConfig::default().excluded_paths);
    let app = Router::new()
        .route("/api/v1/users/me", get(me))
        .layer(from_fn_with_state(gate, web::require_auth::<Basic>));

    let request = |credentials: &str| {
        Request::get("/api/v1/users/me")
            .header(AUTHORIZATION, format!("Basic {}", STANDARD.encode(credentials)))
            .body(Body::empty())
            .unwrap()
    };

    let res = app
        .clone()
        .oneshot(request("ferris@example.com:hunter42"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(request("ferris@example.com:bogus"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(Request::get("/api/v1/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
