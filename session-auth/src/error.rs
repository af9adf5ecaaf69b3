use crate::config::AuthType;

/// A boxed collaborator error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error which can occur while issuing, resolving or destroying sessions.
///
/// None of these reach an HTTP client: [`SessionAuth`](crate::SessionAuth)
/// collapses every variant to `None` or `false` so that an unknown, an expired
/// and a malformed session all look the same from the outside.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An argument failed validation at the API boundary.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The identifier generator kept returning identifiers that are live.
    #[error("no unused session id after {0} attempts")]
    IdExhausted(usize),

    /// The record collaborator failed.
    #[error("record store: {0}")]
    Records(#[source] BoxError),

    /// The identity collaborator failed.
    #[error("user store: {0}")]
    Users(#[source] BoxError),

    /// A user with this email is already registered.
    #[error("user {0} already exists")]
    UserExists(String),

    /// No user has the given email.
    #[error("user not found")]
    UnknownEmail,

    /// No user holds the given password reset token.
    #[error("invalid reset token")]
    InvalidResetToken,

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// The configured authentication type does not issue sessions.
    #[error("`{0}` does not issue sessions")]
    UnsupportedAuthType(AuthType),
}

impl Error {
    pub(crate) fn records<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Records(Box::new(err))
    }

    pub(crate) fn users<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Users(Box::new(err))
    }
}
