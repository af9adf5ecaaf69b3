use async_trait::async_trait;

use crate::{request::RequestContext, user_store::AuthUser};

/// The contract shared by every authentication mechanism.
///
/// Given a request, an authenticator either resolves the user the request is
/// made on behalf of or resolves nothing. It never reports why: a missing
/// header, a wrong password and an expired session are indistinguishable.
#[async_trait]
pub trait Authenticator: Clone + Send + Sync + 'static {
    /// Authenticating user type.
    type User: AuthUser;

    /// Returns the user the request authenticates as.
    async fn current_user<Req>(&self, request: &Req) -> Option<Self::User>
    where
        Req: RequestContext + Sync;

    /// Returns `true` when the request carries any credentials at all.
    fn presents_credentials<Req: RequestContext>(&self, request: &Req) -> bool {
        request.authorization_header().is_some()
    }
}

/// Returns `true` when `path` must be authenticated.
///
/// Paths are compared without their trailing slash. An excluded path ending
/// in `*` excludes every path starting with what precedes the `*`. A missing
/// path, or an empty exclusion list, always requires authentication.
///
/// ```rust
/// use session_auth::require_auth;
///
/// let excluded = ["/api/v1/status/".to_string(), "/api/v1/stat*".to_string()];
///
/// assert!(!require_auth(Some("/api/v1/status"), &excluded));
/// assert!(!require_auth(Some("/api/v1/stats"), &excluded));
/// assert!(require_auth(Some("/api/v1/users"), &excluded));
/// ```
pub fn require_auth(path: Option<&str>, excluded_paths: &[String]) -> bool {
    let Some(path) = path else {
        return true;
    };

    let path = trim_trailing_slash(path);

    !excluded_paths.iter().any(|excluded| {
        let excluded = trim_trailing_slash(excluded);
        match excluded.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => path == excluded,
        }
    })
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}
