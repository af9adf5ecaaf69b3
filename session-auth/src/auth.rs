use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    backend::Authenticator,
    config::SessionConfig,
    policy::{SessionBackend, SessionPolicy},
    record_store::RecordStore,
    request::RequestContext,
    session::{SessionId, UserId},
    user_store::{AuthUser, UserStore},
    Error, Result,
};

/// Session-cookie authentication.
///
/// This is the entry point the HTTP layer talks to: it issues a session when
/// a user logs in, resolves the session cookie to a user on every request,
/// and destroys the session on logout. Which storage and expiration rules
/// apply is decided by the policy it was built with.
///
/// Failures never surface: every operation answers `None` or `false`, and the
/// cause is logged.
///
/// # Example
///
/// ```rust
/// use session_auth::{MemorySessionStore, MemoryUserStore, SessionAuth};
/// # use serde::Serialize;
/// # use session_auth::{AuthUser, UserId};
/// # #[derive(Debug, Clone, Serialize)]
/// # struct User;
/// # impl AuthUser for User {
/// #     fn id(&self) -> UserId { UserId::parse("1").unwrap() }
/// #     fn email(&self) -> &str { "" }
/// #     fn password_hash(&self) -> &str { "" }
/// # }
///
/// # #[tokio::main]
/// # async fn main() {
/// let auth = SessionAuth::new(MemorySessionStore::new(), MemoryUserStore::<User>::new());
///
/// let session_id = auth.create_session("42").await.unwrap();
/// let user_id = auth.user_id_for_session_id(session_id.as_str()).await;
/// assert_eq!(user_id.as_ref().map(|id| id.as_str()), Some("42"));
/// # }
/// ```
#[derive(Debug)]
pub struct SessionAuth<Policy, Users> {
    policy: Arc<Policy>,
    users: Users,
    session_name: Arc<str>,
}

impl<Policy, Users: Clone> Clone for SessionAuth<Policy, Users> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            users: self.users.clone(),
            session_name: self.session_name.clone(),
        }
    }
}

/// The default session cookie name.
pub const DEFAULT_SESSION_NAME: &str = "_my_session_id";

impl<Policy, Users> SessionAuth<Policy, Users>
where
    Policy: SessionPolicy,
    Users: UserStore,
{
    /// Creates an authenticator reading the default session cookie.
    pub fn new(policy: Policy, users: Users) -> Self {
        Self {
            policy: Arc::new(policy),
            users,
            session_name: Arc::from(DEFAULT_SESSION_NAME),
        }
    }

    /// Sets the name of the session cookie.
    pub fn with_session_name(mut self, session_name: impl AsRef<str>) -> Self {
        self.session_name = Arc::from(session_name.as_ref());
        self
    }

    /// The name of the session cookie.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// The session policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The identity collaborator.
    pub fn users(&self) -> &Users {
        &self.users
    }

    /// Issues a session for the user, returning its identifier.
    ///
    /// Blank user IDs are rejected and nothing is stored.
    #[tracing::instrument(level = "debug", skip_all, fields(user.id = user_id.as_ref()))]
    pub async fn create_session(&self, user_id: impl AsRef<str>) -> Option<SessionId> {
        let user_id = match UserId::parse(user_id.as_ref()) {
            Ok(user_id) => user_id,
            Err(err) => {
                tracing::debug!(err = %err, "session not created");
                return None;
            }
        };

        match self.policy.create(&user_id).await {
            Ok(session_id) => Some(session_id),
            Err(err) => {
                tracing::error!(err = %err, "could not create session");
                None
            }
        }
    }

    /// Returns the session identifier carried by the request's cookie.
    pub fn session_cookie<Req: RequestContext>(&self, request: &Req) -> Option<String> {
        request.cookie(&self.session_name)
    }

    /// Returns the user ID a live session belongs to.
    pub async fn user_id_for_session_id(&self, session_id: impl AsRef<str>) -> Option<UserId> {
        let session_id = SessionId::parse(session_id.as_ref()).ok()?;
        self.resolve(&session_id).await
    }

    /// Destroys the session carried by the request's cookie.
    ///
    /// Returns `false` when the request carries no session, or the session
    /// cannot be destroyed.
    #[tracing::instrument(level = "debug", skip_all, ret)]
    pub async fn destroy_session<Req>(&self, request: &Req) -> bool
    where
        Req: RequestContext + Sync,
    {
        let Some(session_id) = self
            .session_cookie(request)
            .and_then(|raw| SessionId::parse(raw).ok())
        else {
            return false;
        };

        self.policy.destroy(&session_id).await.unwrap_or_else(|err| {
            tracing::error!(err = %err, "could not destroy session");
            false
        })
    }

    async fn resolve(&self, session_id: &SessionId) -> Option<UserId> {
        self.policy
            .user_id_for_session_id(session_id)
            .await
            .unwrap_or_else(|err| {
                tracing::error!(err = %err, "could not resolve session");
                None
            })
    }
}

impl<Records, Users> SessionAuth<SessionBackend<Records>, Users>
where
    Records: RecordStore,
    Users: UserStore,
{
    /// Builds the session variant named by the configuration, reading the
    /// configured session cookie.
    pub fn from_config(config: &SessionConfig, users: Users, records: Records) -> Result<Self> {
        let policy = SessionBackend::from_config(config, records)?;
        Ok(Self::new(policy, users).with_session_name(&config.session_name))
    }
}

#[async_trait]
impl<Policy, Users> Authenticator for SessionAuth<Policy, Users>
where
    Policy: SessionPolicy,
    Users: UserStore,
{
    type User = Users::User;

    #[tracing::instrument(level = "debug", skip_all, fields(user.id))]
    async fn current_user<Req>(&self, request: &Req) -> Option<Self::User>
    where
        Req: RequestContext + Sync,
    {
        let session_id = SessionId::parse(self.session_cookie(request)?).ok()?;
        let user_id = self.resolve(&session_id).await?;

        match self.users.get_user(&user_id).await.map_err(Error::users) {
            Ok(Some(user)) => {
                tracing::Span::current().record("user.id", user.id().as_str());
                Some(user)
            }
            Ok(None) => {
                tracing::debug!(user.id = %user_id, "session user no longer exists");
                None
            }
            Err(err) => {
                tracing::error!(err = %err, "could not load session user");
                None
            }
        }
    }

    fn presents_credentials<Req: RequestContext>(&self, request: &Req) -> bool {
        request.authorization_header().is_some() || self.session_cookie(request).is_some()
    }
}

#[cfg(test)]
mod tests {
    use http::{header::COOKIE, Request};
    use time::Duration;

    use super::*;
    use crate::{
        clock::ManualClock,
        config::AuthType,
        expiring_store::ExpiringSessionStore,
        expiry::{ExpirationPolicy, SessionDuration},
        memory_store::MemorySessionStore,
        record_store::MemoryRecordStore,
        user_store::{tests::TestUser, MemoryUserStore},
    };

    fn request_with_cookie(cookie: &str) -> Request<()> {
        Request::builder().header(COOKIE, cookie).body(()).unwrap()
    }

    async fn users() -> MemoryUserStore<TestUser> {
        let users = MemoryUserStore::new();
        users.insert(TestUser::new("42", "ferris@example.com", "hunter42")).await;
        users
    }

    #[tokio::test]
    async fn session_round_trip() {
        let auth = SessionAuth::new(MemorySessionStore::new(), users().await);

        let session_id = auth.create_session("42").await.unwrap();
        assert_eq!(
            auth.user_id_for_session_id(&session_id).await,
            Some(UserId::parse("42").unwrap())
        );

        let request = request_with_cookie(&format!("_my_session_id={session_id}"));
        let user = auth.current_user(&request).await.unwrap();
        assert_eq!(user.email, "ferris@example.com");

        assert!(auth.destroy_session(&request).await);
        assert!(!auth.destroy_session(&request).await);
        assert!(auth.current_user(&request).await.is_none());
        assert!(auth.user_id_for_session_id(&session_id).await.is_none());
    }

    #[tokio::test]
    async fn blank_user_ids_are_rejected() {
        let store = MemorySessionStore::new();
        let auth = SessionAuth::new(store.clone(), users().await);

        assert!(auth.create_session("").await.is_none());
        assert!(auth.create_session("   ").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn blank_session_ids_resolve_to_nothing() {
        let auth = SessionAuth::new(MemorySessionStore::new(), users().await);
        assert!(auth.user_id_for_session_id("").await.is_none());
    }

    #[tokio::test]
    async fn requests_without_a_session_are_anonymous() {
        let auth = SessionAuth::new(MemorySessionStore::new(), users().await);
        let request = Request::builder().body(()).unwrap();

        assert!(auth.current_user(&request).await.is_none());
        assert!(!auth.destroy_session(&request).await);
        assert!(!auth.presents_credentials(&request));
    }

    #[tokio::test]
    async fn cookie_name_is_configurable() {
        let auth = SessionAuth::new(MemorySessionStore::new(), users().await)
            .with_session_name("sid");
        let session_id = auth.create_session("42").await.unwrap();

        let wrong_name = request_with_cookie(&format!("_my_session_id={session_id}"));
        assert!(auth.current_user(&wrong_name).await.is_none());
        assert!(!auth.presents_credentials(&wrong_name));

        let right_name = request_with_cookie(&format!("sid={session_id}"));
        assert!(auth.current_user(&right_name).await.is_some());
        assert!(auth.presents_credentials(&right_name));
    }

    #[tokio::test]
    async fn sessions_of_deleted_users_resolve_to_nothing() {
        let auth = SessionAuth::new(MemorySessionStore::new(), users().await);
        let session_id = auth.create_session("1000").await.unwrap();

        let request = request_with_cookie(&format!("_my_session_id={session_id}"));
        assert!(auth.current_user(&request).await.is_none());
        // The session itself still resolves.
        assert!(auth.user_id_for_session_id(&session_id).await.is_some());
    }

    #[tokio::test]
    async fn expired_sessions_resolve_to_nothing() {
        let clock = ManualClock::default();
        let store = ExpiringSessionStore::new(
            MemorySessionStore::new(),
            ExpirationPolicy::with_clock(SessionDuration::from_secs(5), clock.clone()),
        );
        let auth = SessionAuth::new(store, users().await);
        let session_id = auth.create_session("42").await.unwrap();
        let request = request_with_cookie(&format!("_my_session_id={session_id}"));

        clock.advance(Duration::seconds(3));
        assert!(auth.current_user(&request).await.is_some());

        clock.advance(Duration::seconds(3));
        assert!(auth.current_user(&request).await.is_none());
        assert!(!auth.destroy_session(&request).await);
    }

    #[tokio::test]
    async fn built_from_config() {
        let config = SessionConfig::default()
            .with_auth_type(AuthType::SessionDb)
            .with_session_name("sid");
        let records = MemoryRecordStore::default();
        let auth = SessionAuth::from_config(&config, users().await, records.clone()).unwrap();

        let session_id = auth.create_session("42").await.unwrap();
        assert_eq!(records.rows().await.len(), 1);
        assert_eq!(auth.session_name(), "sid");

        let request = request_with_cookie(&format!("sid={session_id}"));
        assert!(auth.current_user(&request).await.is_some());
        assert!(auth.destroy_session(&request).await);
        assert!(records.rows().await.is_empty());

        let basic = SessionConfig::default().with_auth_type(AuthType::Basic);
        assert!(SessionAuth::from_config(&basic, users().await, records).is_err());
    }
}
