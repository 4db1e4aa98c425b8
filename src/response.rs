//! Outgoing HTTP response state.
//!
//! Every request starts with a [`Response`] at `200 OK`, no body, and a set of
//! hardened security headers. Layers mutate it through the
//! [`Context`](crate::Context); the server serializes whatever is left once
//! the pipeline returns.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use tracing::warn;

use crate::body::Body;
use crate::error::Error;

/// Headers every response starts with.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "Content-Security-Policy",
        "default-src 'self';base-uri 'self';block-all-mixed-content;font-src 'self' https: data:;\
         frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';\
         script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests;\
         require-trusted-types-for 'script'",
    ),
    ("Expect-CT", "max-age=0"),
    ("Origin-Agent-Cluster", "?1"),
    ("Referrer-Policy", "no-referrer"),
    ("X-Content-Type-Options", "nosniff"),
    ("X-DNS-Prefetch-Control", "off"),
    ("X-Download-Options", "noopen"),
    ("X-Frame-Options", "SAMEORIGIN"),
    ("X-Permitted-Cross-Domain-Policies", "none"),
    ("X-XSS-Protection", "0"),
];

const CONTENT_TYPE: &str = "Content-Type";

// ── Response ─────────────────────────────────────────────────────────────────

/// The response being built for the current request.
///
/// Setters return `&mut Self` so calls chain:
///
/// ```rust
/// use shallot::{Response, StatusCode};
/// use serde_json::json;
///
/// let mut res = Response::default();
/// res.set_status(StatusCode::CREATED)
///     .set_header("location", "/users/42")
///     .set_body(json!({ "id": 42 }));
///
/// assert_eq!(res.header("Content-Type"), Some("application/json"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    /// Assigning this field directly skips `Content-Type` inference.
    pub body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: SECURITY_HEADERS
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            body: Body::Empty,
        }
    }
}

impl Response {
    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Body { &self.body }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any entry with the same name in any case.
    /// The name is stored as given.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.remove_header(name);
        self.headers.push((name.to_owned(), value.into()));
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self
    }

    /// Sets the body and infers `Content-Type` from it: JSON values get
    /// `application/json`, text gets `text/plain`, an empty body drops the
    /// header.
    pub fn set_body(&mut self, body: impl Into<Body>) -> &mut Self {
        self.body = body.into();
        let content_type = match &self.body {
            b if b.is_empty() => None,
            Body::Json(_) => Some("application/json"),
            _ => Some("text/plain"),
        };
        match content_type {
            Some(ct) => self.set_header(CONTENT_TYPE, ct),
            None => self.remove_header(CONTENT_TYPE),
        }
    }

    /// Serializes `value` into a JSON body.
    ///
    /// # Errors
    ///
    /// [`Error::InternalServerError`] if `value` cannot be represented as JSON
    /// (e.g. a map with non-string keys).
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, Error> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::InternalServerError(e.to_string()))?;
        Ok(self.set_body(value))
    }

    /// Converts into the transport's representation. Headers that are not
    /// valid HTTP are dropped with a warning.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body.to_bytes())));
        *res.status_mut() = self.status;

        let headers = res.headers_mut();
        for (name, value) in self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(n), Ok(v)) => { headers.append(n, v); }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}
