//! The durable record collaborator behind persisted sessions.

use std::{convert::Infallible, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    clock::{Clock, SystemClock},
    session::{SessionId, SessionRecord, UserId},
};

/// A session row to be inserted. The store records the creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionRecord {
    /// The session identifier.
    pub session_id: SessionId,

    /// The user the session belongs to.
    pub user_id: UserId,
}

/// A trait which defines the record operations persisted sessions rely on.
///
/// Any durable storage engine can back
/// [`PersistedSessionStore`](crate::PersistedSessionStore) by implementing
/// this trait: a SQL table, a document collection or, for tests, a vector in
/// memory.
#[async_trait]
pub trait RecordStore: Debug + Clone + Send + Sync + 'static {
    /// An error which can occur while talking to the storage engine.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stores a record, stamping it with the current time.
    async fn insert(&self, record: NewSessionRecord) -> Result<SessionRecord, Self::Error>;

    /// Returns every record with the given session identifier.
    ///
    /// An empty vector means the session is unknown. Callers use the first
    /// record.
    async fn find_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<SessionRecord>, Self::Error>;

    /// Deletes the record's session identifier.
    ///
    /// Returns `true` only when this call removed a row, so that of several
    /// racing deletes exactly one succeeds.
    async fn delete(&self, record: &SessionRecord) -> Result<bool, Self::Error>;
}

/// An ephemeral record store, useful for testing and demonstration purposes.
#[derive(Clone, Debug)]
pub struct MemoryRecordStore {
    rows: Arc<RwLock<Vec<SessionRecord>>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl MemoryRecordStore {
    /// Creates an empty store stamping rows with the given clock.
    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            rows: Default::default(),
            clock: Arc::new(clock),
        }
    }

    /// Returns a snapshot of every stored row.
    pub async fn rows(&self) -> Vec<SessionRecord> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    type Error = Infallible;

    async fn insert(&self, record: NewSessionRecord) -> Result<SessionRecord, Self::Error> {
        let record = SessionRecord::new(record.session_id, record.user_id, self.clock.now());
        self.rows.write().await.push(record.clone());
        Ok(record)
    }

    async fn find_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<SessionRecord>, Self::Error> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| &row.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, record: &SessionRecord) -> Result<bool, Self::Error> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.session_id != record.session_id);
        Ok(rows.len() < before)
    }
}
