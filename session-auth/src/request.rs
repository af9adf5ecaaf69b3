//! Read-only access to the parts of an HTTP request authentication needs.

use cookie::Cookie;
use http::{
    header::{AUTHORIZATION, COOKIE},
    request::Parts,
    HeaderMap, Request,
};

/// A request as seen by an authenticator.
pub trait RequestContext {
    /// The request headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the `Authorization` header when it is present and valid UTF-8.
    fn authorization_header(&self) -> Option<&str> {
        self.headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the value of the named cookie.
    ///
    /// Every `Cookie` header is searched; unparsable pairs are skipped.
    fn cookie(&self, name: &str) -> Option<String> {
        self.headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }
}

impl RequestContext for HeaderMap {
    fn headers(&self) -> &HeaderMap {
        self
    }
}

impl RequestContext for Parts {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl<B> RequestContext for Request<B> {
    fn headers(&self) -> &HeaderMap {
        Request::headers(self)
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    #[test]
    fn reads_cookies_from_every_header() {
        let request = Request::builder()
            .header(COOKIE, "theme=dark; lang=en")
            .header(COOKIE, "_my_session_id=abc-123")
            .body(())
            .unwrap();

        assert_eq!(request.cookie("_my_session_id"), Some("abc-123".to_string()));
        assert_eq!(request.cookie("lang"), Some("en".to_string()));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn reads_authorization_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(headers.authorization_header(), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Ym9iOnB3"));
        assert_eq!(headers.authorization_header(), Some("Basic Ym9iOnB3"));
    }

    #[test]
    fn parts_expose_headers() {
        let (parts, _) = Request::builder()
            .header(COOKIE, "sid=1")
            .body(())
            .unwrap()
            .into_parts();

        assert_eq!(parts.cookie("sid"), Some("1".to_string()));
    }
}
