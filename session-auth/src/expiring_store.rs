//! In-memory sessions with a time-to-live.

use async_trait::async_trait;

use crate::{
    expiry::ExpirationPolicy,
    memory_store::MemorySessionStore,
    policy::SessionPolicy,
    session::{SessionId, UserId},
    Result,
};

/// Wraps a [`MemorySessionStore`] so that sessions stop resolving once their
/// duration has elapsed.
///
/// Expired records stay in the map until they are destroyed; lookups simply
/// treat them as absent. Because destroying requires the session's user to
/// resolve, an expired session cannot be destroyed either.
#[derive(Clone, Debug)]
pub struct ExpiringSessionStore {
    store: MemorySessionStore,
    policy: ExpirationPolicy,
}

impl ExpiringSessionStore {
    /// Creates a new expiring store.
    ///
    /// New records are stamped by the policy's clock, so creation times and
    /// expiry checks always agree.
    pub fn new(store: MemorySessionStore, policy: ExpirationPolicy) -> Self {
        let store = store.with_shared_clock(policy.clock());
        Self { store, policy }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &MemorySessionStore {
        &self.store
    }

    /// The expiration policy.
    pub fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }
}

#[async_trait]
impl SessionPolicy for ExpiringSessionStore {
    async fn create(&self, user_id: &UserId) -> Result<SessionId> {
        self.store.create(user_id).await
    }

    async fn user_id_for_session_id(&self, session_id: &SessionId) -> Result<Option<UserId>> {
        let Some(record) = self.store.get(session_id).await else {
            return Ok(None);
        };
        Ok(self.policy.resolve(&record).cloned())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(session.id = %session_id), ret, err)]
    async fn destroy(&self, session_id: &SessionId) -> Result<bool> {
        Ok(self
            .store
            .remove_if(session_id, |record| self.policy.resolve(record).is_some())
            .await)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::{
        clock::{Clock, ManualClock},
        expiry::SessionDuration,
    };

    fn store(secs: i64) -> (ExpiringSessionStore, ManualClock) {
        let clock = ManualClock::default();
        let policy = ExpirationPolicy::with_clock(SessionDuration::from_secs(secs), clock.clone());
        (ExpiringSessionStore::new(MemorySessionStore::new(), policy), clock)
    }

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn lookup_within_duration() {
        let (store, clock) = store(5);
        let session_id = store.create(&user("7")).await.unwrap();

        clock.advance(Duration::seconds(3));
        assert_eq!(store.user_id_for_session_id(&session_id).await.unwrap(), Some(user("7")));

        clock.advance(Duration::seconds(3));
        assert_eq!(store.user_id_for_session_id(&session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expiry_edges_for_many_durations() {
        for secs in [1, 2, 5, 60, 3_600, 86_400 * 30] {
            let (store, clock) = store(secs);
            let created_at = clock.now();
            let session_id = store.create(&user("7")).await.unwrap();

            clock.set(created_at + Duration::seconds(secs - 1));
            assert!(store.user_id_for_session_id(&session_id).await.unwrap().is_some(), "{secs}");

            clock.set(created_at + Duration::seconds(secs + 1));
            assert!(store.user_id_for_session_id(&session_id).await.unwrap().is_none(), "{secs}");
        }
    }

    #[tokio::test]
    async fn zero_duration_never_expires() {
        let (store, clock) = store(0);
        let session_id = store.create(&user("42")).await.unwrap();

        clock.advance(Duration::seconds(1_000_000_000));
        assert_eq!(store.user_id_for_session_id(&session_id).await.unwrap(), Some(user("42")));

        assert!(store.destroy(&session_id).await.unwrap());
        assert_eq!(store.user_id_for_session_id(&session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_records_are_kept() {
        let (store, clock) = store(5);
        let session_id = store.create(&user("7")).await.unwrap();

        clock.advance(Duration::seconds(6));
        assert_eq!(store.user_id_for_session_id(&session_id).await.unwrap(), None);
        assert_eq!(store.inner().len().await, 1);
    }

    #[tokio::test]
    async fn expired_sessions_cannot_be_destroyed() {
        let (store, clock) = store(5);
        let session_id = store.create(&user("7")).await.unwrap();

        clock.advance(Duration::seconds(6));
        assert!(!store.destroy(&session_id).await.unwrap());
        assert_eq!(store.inner().len().await, 1);
    }

    #[tokio::test]
    async fn live_sessions_are_destroyed_once() {
        let (store, _clock) = store(5);
        let session_id = store.create(&user("7")).await.unwrap();

        assert!(store.destroy(&session_id).await.unwrap());
        assert!(!store.destroy(&session_id).await.unwrap());
        assert!(store.inner().is_empty().await);
    }
}
