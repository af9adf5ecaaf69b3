//! HTTP Basic authentication.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    backend::Authenticator,
    request::RequestContext,
    user_store::{AuthUser, UserQuery, UserStore},
    Error,
};

const BASIC_PREFIX: &str = "Basic ";

/// An email and password pair taken from an `Authorization` header.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// The email address.
    pub email: String,

    /// The plaintext password.
    pub password: SecretString,
}

/// Authenticates every request from its `Authorization: Basic` header.
///
/// Each step of decoding is exposed on its own and answers `None` on any
/// malformed input.
#[derive(Debug, Clone)]
pub struct BasicAuth<Users> {
    users: Users,
}

impl<Users: UserStore> BasicAuth<Users> {
    /// Creates an authenticator looking users up in `users`.
    pub fn new(users: Users) -> Self {
        Self { users }
    }

    /// The identity collaborator.
    pub fn users(&self) -> &Users {
        &self.users
    }

    /// Returns the Base64 part of a `Basic` authorization header.
    pub fn extract_base64_authorization_header<'a>(&self, header: &'a str) -> Option<&'a str> {
        header.strip_prefix(BASIC_PREFIX)
    }

    /// Decodes a Base64 value to UTF-8 text.
    pub fn decode_base64_authorization_header(&self, encoded: &str) -> Option<String> {
        let bytes = STANDARD.decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Splits decoded `email:password` text at its first colon, so that
    /// passwords may themselves contain colons.
    pub fn extract_user_credentials(&self, decoded: &str) -> Option<Credentials> {
        let (email, password) = decoded.split_once(':')?;
        Some(Credentials {
            email: email.to_string(),
            password: SecretString::new(password.to_string()),
        })
    }

    /// Returns the first user with this email whose password matches.
    #[tracing::instrument(level = "debug", skip_all, fields(user.email = %credentials.email))]
    pub async fn user_object_from_credentials(
        &self,
        credentials: &Credentials,
    ) -> Option<Users::User> {
        let password = credentials.password.expose_secret();
        if credentials.email.is_empty() || password.is_empty() {
            return None;
        }

        let users = match self
            .users
            .search(&UserQuery::by_email(&credentials.email))
            .await
            .map_err(Error::users)
        {
            Ok(users) => users,
            Err(err) => {
                tracing::error!(err = %err, "could not search users");
                return None;
            }
        };

        users
            .into_iter()
            .find(|user| user.is_valid_password(password))
    }
}

#[async_trait]
impl<Users: UserStore> Authenticator for BasicAuth<Users> {
    type User = Users::User;

    async fn current_user<Req>(&self, request: &Req) -> Option<Self::User>
    where
        Req: RequestContext + Sync,
    {
        let credentials = {
            let header = request.authorization_header()?;
            let encoded = self.extract_base64_authorization_header(header)?;
            let decoded = self.decode_base64_authorization_header(encoded)?;
            self.extract_user_credentials(&decoded)?
        };
        self.user_object_from_credentials(&credentials).await
    }
}
