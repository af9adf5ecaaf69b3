//! Sessions persisted through a record store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    expiry::ExpirationPolicy,
    id::{IdGenerator, UuidGenerator},
    policy::SessionPolicy,
    record_store::{NewSessionRecord, RecordStore},
    session::{SessionId, UserId},
    Error, Result,
};

/// Sessions stored as rows of a [`RecordStore`], expiring like
/// [`ExpiringSessionStore`](crate::ExpiringSessionStore).
///
/// The record store is the only source of truth; nothing is cached in memory.
/// Expired rows are left in place. Unlike the in-memory variants, destroying a
/// session only requires its row to exist, so expired sessions can still be
/// destroyed.
#[derive(Clone, Debug)]
pub struct PersistedSessionStore<Records> {
    records: Records,
    policy: ExpirationPolicy,
    generator: Arc<dyn IdGenerator>,
}

impl<Records: RecordStore> PersistedSessionStore<Records> {
    /// Creates a new store on top of the given records.
    ///
    /// ```rust
    /// use session_auth::{
    ///     ExpirationPolicy, MemoryRecordStore, PersistedSessionStore, SessionDuration,
    /// };
    ///
    /// let store = PersistedSessionStore::new(
    ///     MemoryRecordStore::default(),
    ///     ExpirationPolicy::new(SessionDuration::from_secs(3_600)),
    /// );
    /// ```
    pub fn new(records: Records, policy: ExpirationPolicy) -> Self {
        Self {
            records,
            policy,
            generator: Arc::new(UuidGenerator),
        }
    }

    /// Sets the identifier generator.
    pub fn with_generator(mut self, generator: impl IdGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// The underlying record store.
    pub fn records(&self) -> &Records {
        &self.records
    }
}

#[async_trait]
impl<Records: RecordStore> SessionPolicy for PersistedSessionStore<Records> {
    #[tracing::instrument(level = "debug", skip_all, fields(user.id = %user_id, session.id), err)]
    async fn create(&self, user_id: &UserId) -> Result<SessionId> {
        let session_id = SessionId::from_trusted(self.generator.generate());
        tracing::Span::current().record("session.id", session_id.as_str());

        let record = self
            .records
            .insert(NewSessionRecord {
                session_id,
                user_id: user_id.clone(),
            })
            .await
            .map_err(Error::records)?;

        Ok(record.session_id)
    }

    async fn user_id_for_session_id(&self, session_id: &SessionId) -> Result<Option<UserId>> {
        let records = self
            .records
            .find_by_session_id(session_id)
            .await
            .map_err(Error::records)?;

        let Some(record) = records.first() else {
            return Ok(None);
        };

        Ok(self.policy.resolve(record).cloned())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(session.id = %session_id), ret, err)]
    async fn destroy(&self, session_id: &SessionId) -> Result<bool> {
        let records = self
            .records
            .find_by_session_id(session_id)
            .await
            .map_err(Error::records)?;

        let Some(record) = records.first() else {
            return Ok(false);
        };

        self.records.delete(record).await.map_err(Error::records)
    }
}
