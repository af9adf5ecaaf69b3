//! Session records stored in SQL databases through sqlx.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "postgres")]
use sqlx::PgPool;
#[cfg(feature = "sqlite")]
use sqlx::SqlitePool;
use time::OffsetDateTime;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
use crate::record_store::{NewSessionRecord, RecordStore};
use crate::{
    clock::{Clock, SystemClock},
    session::{SessionId, SessionRecord, UserId},
    Error, Result,
};

const DEFAULT_TABLE_NAME: &str = "user_sessions";

#[derive(Debug, sqlx::FromRow)]
#[cfg_attr(not(any(feature = "postgres", feature = "sqlite")), allow(dead_code))]
struct SessionRow {
    session_id: String,
    user_id: String,
    created_at: Option<OffsetDateTime>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            session_id: SessionId::from_trusted(row.session_id),
            user_id: UserId::from_trusted(row.user_id),
            created_at: row.created_at,
        }
    }
}

/// A generic SQLx record store.
///
/// Rows have the shape `(session_id, user_id, created_at)` with `session_id`
/// as primary key. Concrete aliases are provided and should usually be used
/// unless generics are required by the application.
#[derive(Clone, Debug)]
pub struct SqlxRecordStore<Pool> {
    pool: Pool,
    table_name: String,
    clock: Arc<dyn Clock>,
}

impl<Pool> SqlxRecordStore<Pool> {
    /// Creates a new store with the provided pool, using the `user_sessions`
    /// table.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the table rows are stored in.
    ///
    /// Only ASCII alphanumerics and underscores are accepted since the name is
    /// interpolated into queries.
    pub fn with_table_name(mut self, table_name: impl AsRef<str>) -> Result<Self> {
        let table_name = table_name.as_ref();
        if !is_valid_identifier(table_name) {
            return Err(Error::InvalidInput(
                "table name must be ASCII alphanumerics and underscores",
            ));
        }
        self.table_name = table_name.to_string();
        Ok(self)
    }

    /// Sets the clock used to stamp inserted rows.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

macro_rules! impl_record_store {
    ( $pool:ident, $create_table:literal ) => {
        impl SqlxRecordStore<$pool> {
            /// Creates the sessions table when it does not exist.
            pub async fn migrate(&self) -> sqlx::Result<()> {
                let query = format!($create_table, table = self.table_name);
                sqlx::query(&query).execute(&self.pool).await?;
                Ok(())
            }
        }

        #[async_trait]
        impl RecordStore for SqlxRecordStore<$pool> {
            type Error = sqlx::Error;

            async fn insert(&self, record: NewSessionRecord) -> Result<SessionRecord, Self::Error> {
                let created_at = self.clock.now();
                let query = format!(
                    "INSERT INTO {} (session_id, user_id, created_at) VALUES ($1, $2, $3)",
                    self.table_name
                );
                sqlx::query(&query)
                    .bind(record.session_id.as_str())
                    .bind(record.user_id.as_str())
                    .bind(created_at)
                    .execute(&self.pool)
                    .await?;

                Ok(SessionRecord::new(record.session_id, record.user_id, created_at))
            }

            async fn find_by_session_id(
                &self,
                session_id: &SessionId,
            ) -> Result<Vec<SessionRecord>, Self::Error> {
                let query = format!(
                    "SELECT session_id, user_id, created_at FROM {} WHERE session_id = $1",
                    self.table_name
                );
                let rows: Vec<SessionRow> = sqlx::query_as(&query)
                    .bind(session_id.as_str())
                    .fetch_all(&self.pool)
                    .await?;

                Ok(rows.into_iter().map(SessionRecord::from).collect())
            }

            async fn delete(&self, record: &SessionRecord) -> Result<bool, Self::Error> {
                let query = format!("DELETE FROM {} WHERE session_id = $1", self.table_name);
                let result = sqlx::query(&query)
                    .bind(record.session_id.as_str())
                    .execute(&self.pool)
                    .await?;

                Ok(result.rows_affected() > 0)
            }
        }
    };
}

/// A Postgres record store via sqlx.
#[cfg(feature = "postgres")]
pub type PostgresRecordStore = SqlxRecordStore<PgPool>;

/// A SQLite record store via sqlx.
#[cfg(feature = "sqlite")]
pub type SqliteRecordStore = SqlxRecordStore<SqlitePool>;

#[cfg(feature = "postgres")]
impl_record_store!(
    PgPool,
    "CREATE TABLE IF NOT EXISTS {table} (
        session_id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        created_at TIMESTAMPTZ
    )"
);
#[cfg(feature = "sqlite")]
impl_record_store!(
    SqlitePool,
    "CREATE TABLE IF NOT EXISTS {table} (
        session_id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        created_at TEXT
    )"
);
