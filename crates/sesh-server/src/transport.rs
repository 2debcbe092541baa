//! Cookie transport over HTTP headers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, CookieJar};
use sesh_session::{CookieTransport, SessionCookie};
use tracing::warn;

/// Reads session cookies from a request's `Cookie` headers and turns the
/// manager's cookie instructions into `Set-Cookie` headers.
///
/// Works as an extractor and as response parts, so a handler can take it by
/// value, hand it to the manager, and return it alongside its body.
#[derive(Debug, Default)]
pub struct HttpTransport {
    jar: CookieJar,
    outgoing: Vec<SessionCookie>,
}

impl HttpTransport {
    /// Parse every `Cookie` header. Malformed pairs are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut jar = CookieJar::new();
        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(value.to_owned()).flatten() {
                jar.add_original(cookie);
            }
        }
        Self {
            jar,
            outgoing: Vec::new(),
        }
    }

    /// Cookies queued for the response.
    pub fn response_cookies(&self) -> &[SessionCookie] {
        &self.outgoing
    }

    /// Render the queued cookies as `Set-Cookie` header values.
    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.outgoing
            .iter()
            .filter_map(|cookie| {
                let rendered = render(cookie).to_string();
                match HeaderValue::from_str(&rendered) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(cookie = %cookie.name, error = %e, "Dropping unencodable cookie");
                        None
                    }
                }
            })
            .collect()
    }
}

impl CookieTransport for HttpTransport {
    fn cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|c| c.value().to_string())
    }

    fn set_cookie(&mut self, cookie: SessionCookie) {
        self.outgoing.push(cookie);
    }
}

impl<S> FromRequestParts<S> for HttpTransport
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        Ok(Self::from_headers(&parts.headers))
    }
}

impl IntoResponseParts for HttpTransport {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Infallible> {
        for value in self.set_cookie_headers() {
            res.headers_mut().append(SET_COOKIE, value);
        }
        Ok(res)
    }
}

/// Cookies are scoped to the whole site so every route sees the session.
fn render(cookie: &SessionCookie) -> Cookie<'static> {
    let max_age = if cookie.is_removal() {
        CookieDuration::ZERO
    } else {
        CookieDuration::seconds(cookie.max_age)
    };

    let mut builder = Cookie::build((cookie.name.clone(), cookie.value.clone()))
        .path("/")
        .http_only(cookie.http_only)
        .max_age(max_age);

    if let Some(at) = cookie.expires
        && let Ok(at) = OffsetDateTime::from_unix_timestamp(at.timestamp())
    {
        builder = builder.expires(at);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn headers(cookie_header: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie_header).unwrap());
        headers
    }

    #[test]
    fn test_reads_named_cookie() {
        let transport = HttpTransport::from_headers(&headers("theme=dark; sesh_id=abc%3D"));
        assert_eq!(transport.cookie("sesh_id").as_deref(), Some("abc%3D"));
        assert_eq!(transport.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(transport.cookie("missing"), None);
    }

    #[test]
    fn test_multiple_cookie_headers() {
        let mut map = HeaderMap::new();
        map.append(COOKIE, HeaderValue::from_static("a=1"));
        map.append(COOKIE, HeaderValue::from_static("b=2"));

        let transport = HttpTransport::from_headers(&map);
        assert_eq!(transport.cookie("a").as_deref(), Some("1"));
        assert_eq!(transport.cookie("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_no_cookie_header() {
        let transport = HttpTransport::from_headers(&HeaderMap::new());
        assert_eq!(transport.cookie("sesh_id"), None);
        assert!(transport.set_cookie_headers().is_empty());
    }

    #[test]
    fn test_renders_session_cookie() {
        let mut transport = HttpTransport::default();
        transport.set_cookie(SessionCookie::session("sesh_id", "abc", Duration::from_secs(10)));

        let values = transport.set_cookie_headers();
        assert_eq!(values.len(), 1);
        let rendered = values[0].to_str().unwrap();
        assert!(rendered.starts_with("sesh_id=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Max-Age=10"));
        assert!(rendered.contains("Path=/"));
        assert!(!rendered.contains("Expires"));
    }

    #[test]
    fn test_renders_removal_cookie() {
        let mut transport = HttpTransport::default();
        transport.set_cookie(SessionCookie::expired("sesh_id"));

        let values = transport.set_cookie_headers();
        let rendered = values[0].to_str().unwrap();
        assert!(rendered.starts_with("sesh_id=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Expires="));
        assert!(rendered.contains("HttpOnly"));
    }
}
