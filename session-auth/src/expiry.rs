//! Time-based session expiration.

use std::{fmt, sync::Arc};

use time::{Duration, OffsetDateTime};

use crate::{
    clock::{Clock, SystemClock},
    session::{SessionRecord, UserId},
};

/// How long a session stays valid after it was issued, in whole seconds.
///
/// Zero or a negative value disables expiration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SessionDuration(i64);

impl SessionDuration {
    /// Sessions never expire.
    pub const UNBOUNDED: Self = Self(0);

    /// Creates a duration of `secs` seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Parses a configured value, falling back to [`UNBOUNDED`] when the value
    /// is not an integer.
    ///
    /// [`UNBOUNDED`]: Self::UNBOUNDED
    pub fn parse_or_unbounded(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(secs) => Self(secs),
            Err(err) => {
                tracing::warn!(value = raw, err = %err, "invalid session duration, sessions will not expire");
                Self::UNBOUNDED
            }
        }
    }

    /// Returns the number of seconds.
    pub const fn as_secs(&self) -> i64 {
        self.0
    }

    /// Returns `true` when sessions expire at all.
    pub const fn is_enabled(&self) -> bool {
        self.0 > 0
    }

    /// Returns the instant a session created at `created_at` stops being valid,
    /// or `None` when it never does.
    pub fn expires_at(&self, created_at: OffsetDateTime) -> Option<OffsetDateTime> {
        if !self.is_enabled() {
            return None;
        }
        created_at.checked_add(Duration::seconds(self.0))
    }
}

impl fmt::Display for SessionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Decides whether a session record is still valid.
///
/// Both the in-memory expiring store and the persisted store resolve records
/// through this policy, so their expiration arithmetic is identical.
#[derive(Debug, Clone)]
pub struct ExpirationPolicy {
    duration: SessionDuration,
    clock: Arc<dyn Clock>,
}

impl ExpirationPolicy {
    /// Creates a policy reading the system clock.
    pub fn new(duration: SessionDuration) -> Self {
        Self::with_clock(duration, SystemClock)
    }

    /// Creates a policy reading the given clock.
    pub fn with_clock(duration: SessionDuration, clock: impl Clock) -> Self {
        Self {
            duration,
            clock: Arc::new(clock),
        }
    }

    /// The configured session duration.
    pub fn duration(&self) -> SessionDuration {
        self.duration
    }

    /// The current time according to the policy's clock.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Returns the record's user when the record is valid right now.
    ///
    /// A record is valid when expiration is disabled, or when it carries a
    /// creation time and the current time is not past `created_at + duration`.
    /// Expired records are left in place.
    pub fn resolve<'a>(&self, record: &'a SessionRecord) -> Option<&'a UserId> {
        if !self.duration.is_enabled() {
            return Some(&record.user_id);
        }

        let Some(created_at) = record.created_at else {
            tracing::debug!(session.id = %record.session_id, "session record has no creation time");
            return None;
        };

        match self.duration.expires_at(created_at) {
            Some(expires_at) if self.now() > expires_at => {
                tracing::debug!(session.id = %record.session_id, %expires_at, "session expired");
                None
            }
            _ => Some(&record.user_id),
        }
    }
}
