//! Incoming HTTP request view.
//!
//! Method, path, query and headers are fixed when the request arrives. Two
//! slots change during dispatch: the path parameters a matching
//! [`Resource`](crate::Resource) writes, and the body, which is read from the
//! transport the first time a layer asks for it and cached for the rest of
//! the request.

use std::sync::Mutex;

use bytes::{Bytes, BytesMut};
use http::HeaderMap;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::body::Body;
use crate::error::{BoxError, Error};
use crate::method::Method;
use crate::pattern::Params;
use crate::sync::lock;

type Payload = UnsyncBoxBody<Bytes, BoxError>;

/// The transport side of the body: the stream still to be drained and the
/// bytes drained so far. Both stay put between polls, so a read that is
/// dropped halfway resumes where it stopped.
#[derive(Default)]
struct Inbound {
    stream: Option<Payload>,
    received: BytesMut,
}

// ── MediaType ─────────────────────────────────────────────────────────────────

/// Request media types [`Request::body`] knows how to parse.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MediaType {
    Json,           // application/json
    FormUrlEncoded, // application/x-www-form-urlencoded
    Text,           // text/plain
}

impl MediaType {
    /// Parses a `content-type` value, ignoring parameters and case.
    pub fn parse(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("application/json") {
            Some(Self::Json)
        } else if essence.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            Some(Self::FormUrlEncoded)
        } else if essence.eq_ignore_ascii_case("text/plain") {
            Some(Self::Text)
        } else {
            None
        }
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// An incoming HTTP request.
pub struct Request {
    method: http::Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    path_params: Mutex<Option<Params>>,
    payload: tokio::sync::Mutex<Inbound>,
    body: OnceCell<Result<Body, Error>>,
}

impl Request {
    /// Builds a request view from any `http::Request` whose body yields
    /// [`Bytes`]: hyper's `Incoming` in production, `Full` in tests.
    pub fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let query = parts.uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query,
            headers: parts.headers,
            path_params: Mutex::new(None),
            payload: tokio::sync::Mutex::new(Inbound {
                stream: Some(body.map_err(Into::into).boxed_unsync()),
                received: BytesMut::new(),
            }),
            body: OnceCell::new(),
        }
    }

    /// The method, or `None` when it is not one of the nine [`Method`]s.
    pub fn method(&self) -> Option<Method> {
        Method::try_from(&self.method).ok()
    }

    /// The method exactly as received.
    pub fn http_method(&self) -> &http::Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn query_pairs(&self) -> &[(String, String)] { &self.query }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parameters captured by the resource that matched this request, if any.
    pub fn path_params(&self) -> Option<Params> {
        lock(&self.path_params).clone()
    }

    /// Returns a named path parameter.
    ///
    /// For a resource `/users/{id}`, `param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<String> {
        lock(&self.path_params).as_ref()?.get(key).cloned()
    }

    /// Replaces (never merges) the path parameters.
    pub fn set_path_params(&self, params: Params) {
        *lock(&self.path_params) = Some(params);
    }

    /// The parsed body.
    ///
    /// The first call reads the payload to the end and parses it by
    /// `content-type`; every later call returns the same value, or the same
    /// error, without touching the stream again. Concurrent first calls share
    /// one read. Dropping a pending call loses nothing: the next call picks
    /// up the stream where the dropped one left it.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedMediaType`] when `content-type` is missing or not
    ///   JSON, form-urlencoded or plain text.
    /// - [`Error::BadRequest`] for malformed JSON.
    /// - [`Error::Transport`] when the stream fails.
    pub async fn body(&self) -> Result<&Body, Error> {
        match self.body.get_or_init(|| self.read_body()).await {
            Ok(body) => Ok(body),
            Err(e) => Err(e.clone()),
        }
    }

    async fn read_body(&self) -> Result<Body, Error> {
        let media_type = self.header("content-type")
            .and_then(MediaType::parse)
            .ok_or(Error::UnsupportedMediaType)?;

        let bytes = self.drain().await?;

        let parsed = parse_body(media_type, &bytes);
        if let Err(e) = &parsed {
            debug!(path = %self.path, error = %e, "request body rejected");
        }
        parsed
    }

    /// Reads the stream to its end, frame by frame.
    async fn drain(&self) -> Result<Bytes, Error> {
        let mut guard = self.payload.lock().await;
        let inbound = &mut *guard;

        while let Some(stream) = inbound.stream.as_mut() {
            match stream.frame().await {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        inbound.received.extend_from_slice(&data);
                    }
                }
                Some(Err(e)) => {
                    inbound.stream = None;
                    return Err(Error::transport(e));
                }
                None => inbound.stream = None,
            }
        }
        Ok(inbound.received.split().freeze())
    }
}

fn parse_body(media_type: MediaType, bytes: &[u8]) -> Result<Body, Error> {
    match media_type {
        MediaType::Json if bytes.is_empty() => Ok(Body::Empty),
        MediaType::Json => serde_json::from_slice(bytes)
            .map(Body::Json)
            .map_err(|e| Error::BadRequest(e.to_string())),
        MediaType::FormUrlEncoded => Ok(Body::Json(Value::Object(decode_form(bytes)))),
        MediaType::Text => Ok(Body::Text(String::from_utf8_lossy(bytes).into_owned())),
    }
}

/// Flat key/value decoding. A key seen more than once collects its values
/// into an array, in order.
fn decode_form(bytes: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes).into_owned() {
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures_util::{StreamExt, stream};
    use http_body_util::{Full, StreamBody};
    use hyper::body::Frame;
    use serde_json::json;

    use super::*;

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = http::Request::builder().method("POST").uri("/users?page=2&tag=a&tag=b");
        if let Some(ct) = content_type {
            builder = builder.header("Content-Type", ct);
        }
        Request::from_http(builder.body(Full::new(Bytes::from_static(body.as_bytes()))).unwrap())
    }

    #[test]
    fn splits_path_and_query() {
        let req = request(None, "");
        assert_eq!(req.path(), "/users");
        assert_eq!(req.query("page"), Some("2"));
        assert_eq!(req.query("tag"), Some("a"));
        assert_eq!(req.query_pairs().len(), 3);
        assert_eq!(req.method(), Some(Method::Post));
        assert_eq!(req.path_params(), None);
    }

    #[test]
    fn unknown_methods_read_as_none() {
        let req = Request::from_http(
            http::Request::builder().method("PURGE").uri("/").body(Full::new(Bytes::new())).unwrap(),
        );
        assert_eq!(req.method(), None);
        assert_eq!(req.http_method().as_str(), "PURGE");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request(Some("text/plain"), "");
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn path_params_are_replaced() {
        let req = request(None, "");
        req.set_path_params(Params::from([("a".to_owned(), "1".to_owned())]));
        req.set_path_params(Params::from([("b".to_owned(), "2".to_owned())]));
        assert_eq!(req.param("a"), None);
        assert_eq!(req.param("b").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn parses_json() {
        let req = request(Some("application/json"), r#"{"a":1}"#);
        assert_eq!(req.body().await.unwrap(), &Body::Json(json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn media_type_parameters_are_ignored() {
        let req = request(Some("Application/JSON; charset=utf-8"), "[1,2]");
        assert_eq!(req.body().await.unwrap(), &Body::Json(json!([1, 2])));
    }

    #[tokio::test]
    async fn empty_json_is_empty_body() {
        let req = request(Some("application/json"), "");
        assert_eq!(req.body().await.unwrap(), &Body::Empty);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = request(Some("application/json"), "{nope");
        assert!(matches!(req.body().await, Err(Error::BadRequest(_))));
        // The failure is cached too.
        assert!(matches!(req.body().await, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn decodes_forms() {
        let req = request(Some("application/x-www-form-urlencoded"), "name=J%C3%BCrgen&x=1&x=2&x=3");
        assert_eq!(
            req.body().await.unwrap(),
            &Body::Json(json!({ "name": "Jürgen", "x": ["1", "2", "3"] })),
        );
    }

    #[tokio::test]
    async fn reads_plain_text() {
        let req = request(Some("text/plain"), "hello");
        assert_eq!(req.body().await.unwrap().as_text(), Some("hello"));
    }

    #[tokio::test]
    async fn missing_content_type_is_unsupported() {
        let req = request(None, "{}");
        assert!(matches!(req.body().await, Err(Error::UnsupportedMediaType)));
    }

    #[tokio::test]
    async fn unknown_content_type_is_unsupported() {
        let req = request(Some("application/xml"), "<a/>");
        assert!(matches!(req.body().await, Err(Error::UnsupportedMediaType)));
    }

    fn counted(chunks: &'static [&'static str], polls: Arc<AtomicUsize>) -> Request {
        let frames = stream::iter(chunks.iter().copied().map(move |c: &'static str| {
            polls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(Frame::data(Bytes::from_static(c.as_bytes())))
        }));
        Request::from_http(
            http::Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(StreamBody::new(frames))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn body_is_read_once_and_memoized() {
        let polls = Arc::new(AtomicUsize::new(0));
        let req = counted(&[r#"{"a""#, ":1}"], Arc::clone(&polls));

        let first = req.body().await.unwrap();
        let second = req.body().await.unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(first, &Body::Json(json!({ "a": 1 })));
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_first_reads_share_one_read() {
        let polls = Arc::new(AtomicUsize::new(0));
        let req = counted(&["[1,", "2]"], Arc::clone(&polls));

        let (a, b) = tokio::join!(req.body(), req.body());

        assert!(std::ptr::eq(a.unwrap(), b.unwrap()));
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_read_resumes_on_next_call() {
        let head = stream::once(async {
            Ok::<_, std::convert::Infallible>(Frame::data(Bytes::from_static(br#"{"a""#)))
        });
        let tail = stream::once(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(Frame::data(Bytes::from_static(b":1}")))
        });
        let req = Request::from_http(
            http::Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(StreamBody::new(head.chain(tail)))
                .unwrap(),
        );

        let first = tokio::time::timeout(Duration::from_millis(10), req.body()).await;
        assert!(first.is_err());

        assert_eq!(req.body().await.unwrap(), &Body::Json(json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn stream_failures_are_transport_errors() {
        let frames = stream::iter(vec![
            Ok(Frame::data(Bytes::from_static(b"{"))),
            Err(std::io::Error::other("reset")),
        ]);
        let req = Request::from_http(
            http::Request::builder()
                .uri("/")
                .header("content-type", "application/json")
                .body(StreamBody::new(frames))
                .unwrap(),
        );
        assert!(matches!(req.body().await, Err(Error::Transport(_))));
    }
}
