//! Cookie transport contract.
//!
//! The manager does not know how cookies travel over the wire. It asks a
//! [`CookieTransport`] to read the session cookie from the inbound request
//! and to queue cookies on the outbound response; HTTP adapters implement it
//! over their own request/response types.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Read/write access to the cookies of one request/response exchange.
pub trait CookieTransport {
    /// Value of the request cookie named `name`, if present.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Queue `cookie` on the response.
    fn set_cookie(&mut self, cookie: SessionCookie);
}

/// A cookie the manager wants written to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,

    /// Lifetime in seconds. Negative means "delete now".
    pub max_age: i64,

    /// Absolute expiry, only set when the cookie is being cleared.
    pub expires: Option<DateTime<Utc>>,

    pub http_only: bool,
}

impl SessionCookie {
    /// Cookie carrying a live session identifier.
    pub fn session(name: impl Into<String>, value: impl Into<String>, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX),
            expires: None,
            http_only: true,
        }
    }

    /// Cookie that tells the client to drop `name` immediately.
    pub fn expired(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            max_age: -1,
            expires: Some(Utc::now()),
            http_only: true,
        }
    }

    /// Whether this cookie removes the session on the client.
    pub fn is_removal(&self) -> bool {
        self.max_age < 0
    }
}

/// In-memory transport, useful for tests and for non-HTTP front ends.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    request: Vec<(String, String)>,
    response: Vec<SessionCookie>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie to the simulated request.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.push((name.into(), value.into()));
        self
    }

    /// Cookies queued on the response so far.
    pub fn response_cookies(&self) -> &[SessionCookie] {
        &self.response
    }

    /// Build the transport for the next request, as a client honouring the
    /// response's cookies would send it.
    pub fn follow_up(&self) -> Self {
        let mut request = self.request.clone();
        for cookie in &self.response {
            request.retain(|(name, _)| name != &cookie.name);
            if !cookie.is_removal() {
                request.push((cookie.name.clone(), cookie.value.clone()));
            }
        }
        Self {
            request,
            response: Vec::new(),
        }
    }
}

impl CookieTransport for MemoryTransport {
    fn cookie(&self, name: &str) -> Option<String> {
        self.request
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn set_cookie(&mut self, cookie: SessionCookie) {
        self.response.push(cookie);
    }
}
