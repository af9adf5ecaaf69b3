use serde::Serialize;
use session_auth::{password, AuthUser, MemoryUserStore, UserId};

#[derive(Clone, Serialize)]
pub struct User {
    id: UserId,
    pub email: String,
    first_name: String,
    #[serde(skip)]
    password_hash: String,
}

// Here we've implemented `Debug` manually to avoid accidentally logging the
// password hash.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .finish()
    }
}

impl AuthUser for User {
    fn id(&self) -> UserId {
        self.id.clone()
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

pub type Users = MemoryUserStore<User>;

/// Seeds the demo user `ferris@example.com` / `hunter42`.
pub async fn seeded() -> Result<Users, session_auth::Error> {
    let users = Users::new();
    users
        .insert(User {
            id: UserId::parse("1")?,
            email: "ferris@example.com".to_string(),
            first_name: "Ferris".to_string(),
            password_hash: password::hash_password("hunter42"),
        })
        .await;
    Ok(users)
}
