//! Runtime configuration read from the environment.
//!
//! | Variable           | Meaning                              | Default                 |
//! |--------------------|--------------------------------------|-------------------------|
//! | `SESSION_NAME`     | name of the session cookie           | `_my_session_id`        |
//! | `SESSION_DURATION` | session lifetime in seconds          | `0` (never expires)     |
//! | `AUTH_TYPE`        | which authenticator to build         | `session_auth`          |
//! | `EXCLUDED_PATHS`   | comma-separated public paths         | the public API routes   |
//!
//! Malformed values never abort start-up: they are logged and replaced by
//! their default.

use std::{fmt, str::FromStr};

use config::{Config, ConfigError, Environment};

use crate::{auth::DEFAULT_SESSION_NAME, expiry::SessionDuration, Result};

/// The authentication mechanism an application is configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// HTTP Basic credentials on every request.
    Basic,

    /// In-memory sessions that never expire.
    #[default]
    Session,

    /// In-memory sessions that expire.
    SessionExp,

    /// Sessions persisted as records, which expire.
    SessionDb,
}

impl AuthType {
    /// The configuration name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic_auth",
            Self::Session => "session_auth",
            Self::SessionExp => "session_exp_auth",
            Self::SessionDb => "session_db_auth",
        }
    }

    /// Returns `true` when this type issues session cookies.
    pub fn issues_sessions(&self) -> bool {
        !matches!(self, Self::Basic)
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The name did not match any [`AuthType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown auth type `{0}`")]
pub struct UnknownAuthType(String);

impl FromStr for AuthType {
    type Err = UnknownAuthType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "basic_auth" => Ok(Self::Basic),
            "session_auth" => Ok(Self::Session),
            "session_exp_auth" => Ok(Self::SessionExp),
            "session_db_auth" => Ok(Self::SessionDb),
            other => Err(UnknownAuthType(other.to_string())),
        }
    }
}

/// Paths served without authentication unless configured otherwise.
pub const DEFAULT_EXCLUDED_PATHS: [&str; 4] = [
    "/api/v1/status/",
    "/api/v1/unauthorized/",
    "/api/v1/forbidden/",
    "/api/v1/auth_session/login/",
];

/// Authentication settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub session_name: String,

    /// How long sessions stay valid.
    pub session_duration: SessionDuration,

    /// Which authenticator to build.
    pub auth_type: AuthType,

    /// Paths that never require authentication.
    pub excluded_paths: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_name: DEFAULT_SESSION_NAME.to_string(),
            session_duration: SessionDuration::UNBOUNDED,
            auth_type: AuthType::default(),
            excluded_paths: DEFAULT_EXCLUDED_PATHS
                .iter()
                .map(|path| path.to_string())
                .collect(),
        }
    }
}

impl SessionConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let config = Config::builder()
            .add_source(Environment::default())
            .build()?;
        Self::from_config(&config)
    }

    /// Reads the configuration from an already built source.
    ///
    /// Keys are the lower-cased variable names, e.g. `session_duration`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut session_config = Self::default();

        if let Some(name) = optional_string(config, "session_name")? {
            if name.trim().is_empty() {
                tracing::warn!("blank session name, using the default");
            } else {
                session_config.session_name = name;
            }
        }

        if let Some(duration) = optional_string(config, "session_duration")? {
            session_config.session_duration = SessionDuration::parse_or_unbounded(&duration);
        }

        if let Some(auth_type) = optional_string(config, "auth_type")? {
            session_config.auth_type = auth_type.parse().unwrap_or_else(|err| {
                tracing::warn!(err = %err, "falling back to {}", AuthType::default());
                AuthType::default()
            });
        }

        if let Some(paths) = optional_string(config, "excluded_paths")? {
            session_config.excluded_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(str::to_string)
                .collect();
        }

        tracing::debug!(
            session.name = %session_config.session_name,
            session.duration = %session_config.session_duration,
            auth_type = %session_config.auth_type,
            "configuration loaded"
        );

        Ok(session_config)
    }

    /// Sets the session cookie name.
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    /// Sets the session duration.
    pub fn with_session_duration(mut self, session_duration: SessionDuration) -> Self {
        self.session_duration = session_duration;
        self
    }

    /// Sets the authentication type.
    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    /// Replaces the excluded paths.
    pub fn with_excluded_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }
}

fn optional_string(config: &Config, key: &str) -> Result<Option<String>> {
    match config.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
