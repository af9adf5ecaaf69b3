use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::user_store::AuthUser;

/// The user the current request authenticated as.
///
/// Only available behind [`require_auth`](crate::web::require_auth), which
/// resolves the user and stores it in the request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser<User>(pub User);

#[async_trait]
impl<S, User> FromRequestParts<S> for CurrentUser<User>
where
    S: Send + Sync,
    User: AuthUser,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<User>().cloned().map(CurrentUser).ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Can't extract current user. Is the `require_auth` middleware enabled?",
        ))
    }
}
