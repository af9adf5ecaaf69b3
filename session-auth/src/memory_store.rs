//! An in-memory implementation of `SessionPolicy`.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    clock::{Clock, SystemClock},
    id::{IdGenerator, UuidGenerator},
    policy::SessionPolicy,
    session::{SessionId, SessionRecord, UserId},
    Error, Result,
};

const MAX_ID_ATTEMPTS: usize = 8;

/// Sessions held in process memory. They never expire.
///
/// Clones share the same map, so one store can be constructed at startup and
/// handed to every request handler. Records are only removed by
/// [`destroy`](SessionPolicy::destroy).
#[derive(Clone, Debug)]
pub struct MemorySessionStore {
    records: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
    generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    /// Creates an empty store issuing UUID identifiers.
    ///
    /// ```rust
    /// use session_auth::MemorySessionStore;
    ///
    /// let store = MemorySessionStore::new();
    /// ```
    pub fn new() -> Self {
        Self {
            records: Default::default(),
            generator: Arc::new(UuidGenerator),
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the identifier generator.
    pub fn with_generator(mut self, generator: impl IdGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Sets the clock used to stamp new records.
    pub fn with_clock(self, clock: impl Clock) -> Self {
        self.with_shared_clock(Arc::new(clock))
    }

    pub(crate) fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` when no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Stores a new record under an identifier that is not live.
    ///
    /// The generator is asked again when it returns a live identifier.
    pub(crate) async fn insert(&self, user_id: &UserId) -> Result<SessionRecord> {
        let mut records = self.records.write().await;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let session_id = SessionId::from_trusted(self.generator.generate());
            match records.entry(session_id) {
                Entry::Vacant(entry) => {
                    let record = SessionRecord::new(
                        entry.key().clone(),
                        user_id.clone(),
                        self.clock.now(),
                    );
                    return Ok(entry.insert(record).clone());
                }
                Entry::Occupied(entry) => {
                    tracing::warn!(session.id = %entry.key(), attempt, "generated session id is already live");
                }
            }
        }

        Err(Error::IdExhausted(MAX_ID_ATTEMPTS))
    }

    pub(crate) async fn get(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.records.read().await.get(session_id).cloned()
    }

    /// Removes the record when `predicate` accepts it. The check and the
    /// removal happen under one write lock.
    pub(crate) async fn remove_if<F>(&self, session_id: &SessionId, predicate: F) -> bool
    where
        F: FnOnce(&SessionRecord) -> bool,
    {
        let mut records = self.records.write().await;
        let removable = records.get(session_id).is_some_and(predicate);
        removable && records.remove(session_id).is_some()
    }
}

#[async_trait]
impl SessionPolicy for MemorySessionStore {
    #[tracing::instrument(level = "debug", skip_all, fields(user.id = %user_id, session.id), err)]
    async fn create(&self, user_id: &UserId) -> Result<SessionId> {
        let record = self.insert(user_id).await?;
        tracing::Span::current().record("session.id", record.session_id.as_str());
        Ok(record.session_id)
    }

    async fn user_id_for_session_id(&self, session_id: &SessionId) -> Result<Option<UserId>> {
        Ok(self.get(session_id).await.map(|record| record.user_id))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(session.id = %session_id), ret, err)]
    async fn destroy(&self, session_id: &SessionId) -> Result<bool> {
        // The record's user must still resolve; without expiration it always
        // does once the record exists.
        Ok(self.remove_if(session_id, |_| true).await)
    }
}
