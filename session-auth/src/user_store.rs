use std::{collections::HashMap, convert::Infallible, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{password, session::UserId};

/// A trait which defines methods that allow an arbitrary user type to be
/// authenticated.
///
/// # Examples
///
/// ```rust
/// use serde::Serialize;
/// use session_auth::{AuthUser, UserId};
///
/// #[derive(Debug, Clone, Serialize)]
/// struct User {
///     id: UserId,
///     email: String,
///     #[serde(skip)]
///     password_hash: String,
/// }
///
/// impl AuthUser for User {
///     fn id(&self) -> UserId {
///         self.id.clone()
///     }
///
///     fn email(&self) -> &str {
///         &self.email
///     }
///
///     fn password_hash(&self) -> &str {
///         &self.password_hash
///     }
/// }
/// ```
pub trait AuthUser: Debug + Clone + Serialize + Send + Sync + 'static {
    /// Returns the ID of the user.
    ///
    /// We assume this value is globally unique and will not change.
    fn id(&self) -> UserId;

    /// Returns the email address the user logs in with.
    fn email(&self) -> &str;

    /// Returns the stored password hash, a PHC string.
    fn password_hash(&self) -> &str;

    /// Returns the outstanding password reset token, if any.
    fn reset_token(&self) -> Option<&str> {
        None
    }

    /// Returns `true` when `password` matches the stored hash.
    fn is_valid_password(&self, password: &str) -> bool {
        password::verify_password(password, self.password_hash())
    }
}

/// A user that can be created and have its credentials changed.
///
/// Implementors must also override [`AuthUser::reset_token`] to return the
/// token stored by [`set_reset_token`](Self::set_reset_token).
pub trait RegistrableUser: AuthUser {
    /// Builds a newly registered user.
    fn register(id: UserId, email: String, password_hash: String) -> Self;

    /// Replaces the stored password hash.
    fn set_password_hash(&mut self, password_hash: String);

    /// Stores or clears the password reset token.
    fn set_reset_token(&mut self, reset_token: Option<String>);
}

/// Field filters for [`UserStore::search`]. Unset fields match every user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    /// Match on the user ID.
    pub id: Option<UserId>,

    /// Match on the email address.
    pub email: Option<String>,

    /// Match on the outstanding password reset token.
    pub reset_token: Option<String>,
}

impl UserQuery {
    /// Matches the user with the given ID.
    pub fn by_id(id: UserId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    /// Matches users with the given email address.
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    /// Matches the user holding the given reset token.
    pub fn by_reset_token(reset_token: impl Into<String>) -> Self {
        Self {
            reset_token: Some(reset_token.into()),
            ..Default::default()
        }
    }

    /// Returns `true` when `user` satisfies every set field.
    pub fn matches<User: AuthUser>(&self, user: &User) -> bool {
        self.id.as_ref().map_or(true, |id| &user.id() == id)
            && self.email.as_deref().map_or(true, |email| user.email() == email)
            && self
                .reset_token
                .as_deref()
                .map_or(true, |token| user.reset_token() == Some(token))
    }
}

/// Changes applied by [`UserRegistry::update_user`]. Unset fields are left
/// alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// A new password hash.
    pub password_hash: Option<String>,

    /// A new reset token, or `Some(None)` to clear it.
    pub reset_token: Option<Option<String>>,
}

impl UserUpdate {
    fn apply<User: RegistrableUser>(self, user: &mut User) {
        if let Some(password_hash) = self.password_hash {
            user.set_password_hash(password_hash);
        }
        if let Some(reset_token) = self.reset_token {
            user.set_reset_token(reset_token);
        }
    }
}

/// A trait which defines methods that allow retrieval of users from an
/// arbitrary backend.
#[async_trait]
pub trait UserStore: Debug + Clone + Send + Sync + 'static {
    /// An associated user type which will be loaded from the store.
    type User: AuthUser;

    /// An error which can occur while querying the store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns every user matching the query.
    async fn search(&self, query: &UserQuery) -> Result<Vec<Self::User>, Self::Error>;

    /// Loads a user by ID.
    ///
    /// This provides a generic interface for loading a user from some store.
    /// For example, this might be a database or cache.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<Self::User>, Self::Error> {
        Ok(self
            .search(&UserQuery::by_id(user_id.clone()))
            .await?
            .into_iter()
            .next())
    }
}

/// A user store that can also add and change users.
///
/// Each method checks and writes in one step, so racing registrations of the
/// same email create one user, and a reset token is consumed once.
#[async_trait]
pub trait UserRegistry: UserStore {
    /// Adds a user under a fresh ID.
    ///
    /// Returns `None`, and stores nothing, when the email is already taken.
    async fn add_user(
        &self,
        email: &str,
        password_hash: String,
    ) -> Result<Option<Self::User>, Self::Error>;

    /// Applies `update` to the first user matching `query`, returning the
    /// updated user.
    async fn update_user(
        &self,
        query: &UserQuery,
        update: UserUpdate,
    ) -> Result<Option<Self::User>, Self::Error>;
}

/// An ephemeral store, useful for testing and demonstration purposes.
#[derive(Clone, Debug)]
pub struct MemoryUserStore<User> {
    inner: Arc<RwLock<HashMap<UserId, User>>>,
}

impl<User> Default for MemoryUserStore<User> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
        }
    }
}

impl<User: AuthUser> MemoryUserStore<User> {
    /// Creates a new memory store.
    ///
    /// ```rust
    /// # use serde::Serialize;
    /// # use session_auth::{AuthUser, UserId};
    /// # #[derive(Debug, Clone, Serialize)]
    /// # struct User;
    /// # impl AuthUser for User {
    /// #     fn id(&self) -> UserId { UserId::parse("1").unwrap() }
    /// #     fn email(&self) -> &str { "" }
    /// #     fn password_hash(&self) -> &str { "" }
    /// # }
    /// use session_auth::MemoryUserStore;
    ///
    /// let users = MemoryUserStore::<User>::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn insert(&self, user: User) {
        self.inner.write().await.insert(user.id(), user);
    }
}

#[async_trait]
impl<User: AuthUser> UserStore for MemoryUserStore<User> {
    type User = User;
    type Error = Infallible;

    async fn search(&self, query: &UserQuery) -> Result<Vec<Self::User>, Self::Error> {
        let users = self.inner.read().await;
        let mut found = users
            .values()
            .filter(|user| query.matches(*user))
            .cloned()
            .collect::<Vec<_>>();
        found.sort_by_key(|user| user.id());
        Ok(found)
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.inner.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl<User: RegistrableUser> UserRegistry for MemoryUserStore<User> {
    async fn add_user(
        &self,
        email: &str,
        password_hash: String,
    ) -> Result<Option<Self::User>, Self::Error> {
        let mut users = self.inner.write().await;
        if users.values().any(|user| user.email() == email) {
            return Ok(None);
        }

        let mut next = users.len() + 1;
        let id = loop {
            let id = UserId::from_trusted(next.to_string());
            if !users.contains_key(&id) {
                break id;
            }
            next += 1;
        };

        let user = User::register(id.clone(), email.to_string(), password_hash);
        users.insert(id, user.clone());
        Ok(Some(user))
    }

    async fn update_user(
        &self,
        query: &UserQuery,
        update: UserUpdate,
    ) -> Result<Option<Self::User>, Self::Error> {
        let mut users = self.inner.write().await;
        let Some(user) = users
            .values_mut()
            .filter(|user| query.matches(&**user))
            .min_by_key(|user| user.id())
        else {
            return Ok(None);
        };

        update.apply(user);
        Ok(Some(user.clone()))
    }
}
