//! User registration and password resets.

use std::sync::Arc;

use crate::{
    id::{IdGenerator, UuidGenerator},
    password,
    user_store::{AuthUser, UserQuery, UserRegistry, UserUpdate},
    Error, Result,
};

/// Account management on top of a [`UserRegistry`].
///
/// Passwords are hashed with [`password::hash_password`] before they reach the
/// registry, and reset tokens are drawn from the same generator as session
/// identifiers.
#[derive(Debug, Clone)]
pub struct Accounts<Users> {
    users: Users,
    generator: Arc<dyn IdGenerator>,
}

impl<Users: UserRegistry> Accounts<Users> {
    /// Manages the users of `users`, issuing UUID reset tokens.
    pub fn new(users: Users) -> Self {
        Self {
            users,
            generator: Arc::new(UuidGenerator),
        }
    }

    /// Sets the reset token generator.
    pub fn with_generator(mut self, generator: impl IdGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// The identity collaborator.
    pub fn users(&self) -> &Users {
        &self.users
    }

    /// Registers a user with a hashed password.
    ///
    /// Fails with [`Error::UserExists`] when the email is already registered.
    #[tracing::instrument(level = "debug", skip_all, fields(user.email = email, user.id), err)]
    pub async fn register_user(&self, email: &str, password: &str) -> Result<Users::User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::InvalidInput("email and password are required"));
        }

        let user = self
            .users
            .add_user(email, password::hash_password(password))
            .await
            .map_err(Error::users)?
            .ok_or_else(|| Error::UserExists(email.to_string()))?;

        tracing::Span::current().record("user.id", user.id().as_str());
        Ok(user)
    }

    /// Returns `true` when a user with this email exists and `password`
    /// matches their hash.
    pub async fn valid_login(&self, email: &str, password: &str) -> bool {
        match self
            .users
            .search(&UserQuery::by_email(email))
            .await
            .map_err(Error::users)
        {
            Ok(users) => users
                .first()
                .is_some_and(|user| user.is_valid_password(password)),
            Err(err) => {
                tracing::error!(err = %err, "could not search users");
                false
            }
        }
    }

    /// Stores a fresh reset token on the user and returns it.
    ///
    /// A later call replaces the token. Fails with [`Error::UnknownEmail`]
    /// when no user has this email.
    #[tracing::instrument(level = "debug", skip_all, fields(user.email = email), err)]
    pub async fn get_reset_password_token(&self, email: &str) -> Result<String> {
        let reset_token = self.generator.generate();

        self.users
            .update_user(
                &UserQuery::by_email(email),
                UserUpdate {
                    reset_token: Some(Some(reset_token.clone())),
                    ..Default::default()
                },
            )
            .await
            .map_err(Error::users)?
            .ok_or(Error::UnknownEmail)?;

        Ok(reset_token)
    }

    /// Replaces the password of the user holding `reset_token` and clears
    /// the token, so it can only be used once.
    ///
    /// Fails with [`Error::InvalidResetToken`] when no user holds the token.
    #[tracing::instrument(level = "debug", skip_all, fields(user.id), err)]
    pub async fn update_password(&self, reset_token: &str, password: &str) -> Result {
        if reset_token.is_empty() {
            return Err(Error::InvalidResetToken);
        }
        if password.is_empty() {
            return Err(Error::InvalidInput("password is required"));
        }

        let user = self
            .users
            .update_user(
                &UserQuery::by_reset_token(reset_token),
                UserUpdate {
                    password_hash: Some(password::hash_password(password)),
                    reset_token: Some(None),
                },
            )
            .await
            .map_err(Error::users)?
            .ok_or(Error::InvalidResetToken)?;

        tracing::Span::current().record("user.id", user.id().as_str());
        Ok(())
    }
}
