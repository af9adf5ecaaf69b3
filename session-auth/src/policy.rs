//! The session lifecycle contract and its configured variants.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;

use crate::{
    config::{AuthType, SessionConfig},
    db_store::PersistedSessionStore,
    expiring_store::ExpiringSessionStore,
    expiry::ExpirationPolicy,
    memory_store::MemorySessionStore,
    record_store::{MemoryRecordStore, RecordStore},
    session::{SessionId, UserId},
    Error, Result,
};

/// Issues, resolves and destroys sessions.
///
/// Implementations must be safe to share between concurrently running
/// requests.
#[async_trait]
pub trait SessionPolicy: Debug + Send + Sync + 'static {
    /// Issues a new session for the user and returns its identifier.
    async fn create(&self, user_id: &UserId) -> Result<SessionId>;

    /// Returns the user a live session belongs to.
    ///
    /// Unknown and expired sessions both resolve to `None`.
    async fn user_id_for_session_id(&self, session_id: &SessionId) -> Result<Option<UserId>>;

    /// Removes a session, returning `false` when there was nothing to remove.
    async fn destroy(&self, session_id: &SessionId) -> Result<bool>;
}

#[async_trait]
impl<P> SessionPolicy for Arc<P>
where
    P: SessionPolicy + ?Sized,
{
    async fn create(&self, user_id: &UserId) -> Result<SessionId> {
        (**self).create(user_id).await
    }

    async fn user_id_for_session_id(&self, session_id: &SessionId) -> Result<Option<UserId>> {
        (**self).user_id_for_session_id(session_id).await
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<bool> {
        (**self).destroy(session_id).await
    }
}

/// The session variant selected by configuration.
#[derive(Debug, Clone)]
pub enum SessionBackend<Records = MemoryRecordStore> {
    /// Sessions live in process memory and never expire.
    Memory(MemorySessionStore),

    /// Sessions live in process memory and expire.
    Expiring(ExpiringSessionStore),

    /// Sessions are rows of a record store and expire.
    Persisted(PersistedSessionStore<Records>),
}

impl<Records: RecordStore> SessionBackend<Records> {
    /// Builds the variant named by `config.auth_type`.
    ///
    /// The record store is only used by `session_db_auth`. Basic
    /// authentication issues no sessions and is rejected.
    pub fn from_config(config: &SessionConfig, records: Records) -> Result<Self> {
        let backend = match config.auth_type {
            AuthType::Session => Self::Memory(MemorySessionStore::new()),
            AuthType::SessionExp => Self::Expiring(ExpiringSessionStore::new(
                MemorySessionStore::new(),
                ExpirationPolicy::new(config.session_duration),
            )),
            AuthType::SessionDb => Self::Persisted(PersistedSessionStore::new(
                records,
                ExpirationPolicy::new(config.session_duration),
            )),
            auth_type @ AuthType::Basic => return Err(Error::UnsupportedAuthType(auth_type)),
        };

        tracing::debug!(
            auth_type = %config.auth_type,
            session.duration = %config.session_duration,
            "session backend configured"
        );

        Ok(backend)
    }
}

#[async_trait]
impl<Records: RecordStore> SessionPolicy for SessionBackend<Records> {
    async fn create(&self, user_id: &UserId) -> Result<SessionId> {
        match self {
            Self::Memory(store) => store.create(user_id).await,
            Self::Expiring(store) => store.create(user_id).await,
            Self::Persisted(store) => store.create(user_id).await,
        }
    }

    async fn user_id_for_session_id(&self, session_id: &SessionId) -> Result<Option<UserId>> {
        match self {
            Self::Memory(store) => store.user_id_for_session_id(session_id).await,
            Self::Expiring(store) => store.user_id_for_session_id(session_id).await,
            Self::Persisted(store) => store.user_id_for_session_id(session_id).await,
        }
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<bool> {
        match self {
            Self::Memory(store) => store.destroy(session_id).await,
            Self::Expiring(store) => store.destroy(session_id).await,
            Self::Persisted(store) => store.destroy(session_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::SessionDuration;

    fn config(auth_type: AuthType) -> SessionConfig {
        SessionConfig::default()
            .with_auth_type(auth_type)
            .with_session_duration(SessionDuration::from_secs(60))
    }

    #[test]
    fn selects_variant_from_auth_type() {
        let records = MemoryRecordStore::default();

        assert!(matches!(
            SessionBackend::from_config(&config(AuthType::Session), records.clone()),
            Ok(SessionBackend::Memory(_))
        ));
        assert!(matches!(
            SessionBackend::from_config(&config(AuthType::SessionExp), records.clone()),
            Ok(SessionBackend::Expiring(_))
        ));
        assert!(matches!(
            SessionBackend::from_config(&config(AuthType::SessionDb), records.clone()),
            Ok(SessionBackend::Persisted(_))
        ));
        assert!(matches!(
            SessionBackend::from_config(&config(AuthType::Basic), records),
            Err(Error::UnsupportedAuthType(AuthType::Basic))
        ));
    }

    #[tokio::test]
    async fn every_variant_resolves_its_own_sessions() {
        for auth_type in [AuthType::Session, AuthType::SessionExp, AuthType::SessionDb] {
            let backend =
                SessionBackend::from_config(&config(auth_type), MemoryRecordStore::default())
                    .unwrap();
            let user_id = UserId::parse("42").unwrap();

            let session_id = backend.create(&user_id).await.unwrap();
            assert_eq!(
                backend.user_id_for_session_id(&session_id).await.unwrap(),
                Some(user_id),
                "{auth_type}"
            );
            assert!(backend.destroy(&session_id).await.unwrap());
            assert!(!backend.destroy(&session_id).await.unwrap());
            assert_eq!(backend.user_id_for_session_id(&session_id).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn shared_policies_delegate() {
        let policy: Arc<dyn SessionPolicy> = Arc::new(MemorySessionStore::new());
        let user_id = UserId::parse("9").unwrap();

        let session_id = policy.create(&user_id).await.unwrap();
        assert_eq!(policy.user_id_for_session_id(&session_id).await.unwrap(), Some(user_id));
    }
}
