//! Path-pattern resources.
//!
//! A [`Resource`] is a [`Layer`] that only acts on requests whose path matches
//! its [`PathPattern`]. On a match it records the path parameters on the
//! request and hands the request to the handler registered for its method.
//! Everything else falls through to the next layer, so resources stack like
//! any other layer:
//!
//! ```rust,no_run
//! use shallot::{Context, Error, Next, Pipeline, Resource, middleware};
//!
//! async fn get_user(cx: Context, _next: Next) -> Result<(), Error> {
//!     let id = cx.request().param("id").unwrap_or_default();
//!     cx.response().set_body(serde_json::json!({ "id": id }));
//!     Ok(())
//! }
//!
//! let app = Pipeline::new()
//!     .add_layer(middleware::catch_errors)
//!     .add_layer(Resource::new("/users/{id}").get(get_user))
//!     .add_layer(middleware::not_found);   // reached by every unmatched path
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::trace;

use crate::context::Context;
use crate::error::{Error, PatternError};
use crate::layer::{BoxFuture, BoxedLayer, Layer};
use crate::method::Method;
use crate::pattern::PathPattern;
use crate::pipeline::Next;

/// A path pattern plus one handler per method and an optional fallback.
///
/// Each builder method returns `self` so registrations chain naturally.
pub struct Resource {
    pattern: PathPattern,
    handlers: HashMap<Method, BoxedLayer>,
    fallback: Option<BoxedLayer>,
}

impl Resource {
    /// Creates a resource for `pattern`. See [`PathPattern`] for the syntax.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is malformed. Use [`Resource::try_new`] to handle
    /// the error instead.
    pub fn new(pattern: &str) -> Self {
        Self::try_new(pattern).unwrap_or_else(|e| panic!("invalid resource pattern `{pattern}`: {e}"))
    }

    pub fn try_new(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self::from_pattern(PathPattern::compile(pattern)?))
    }

    /// Creates a resource matching a hand-written regex; its named groups
    /// become path parameters.
    pub fn with_regex(regex: Regex) -> Self {
        Self::from_pattern(PathPattern::from_regex(regex))
    }

    pub fn from_pattern(pattern: PathPattern) -> Self {
        Self { pattern, handlers: HashMap::new(), fallback: None }
    }

    /// Registers `handler` for `method`, replacing any previous one.
    pub fn on(mut self, method: Method, handler: impl Layer) -> Self {
        self.handlers.insert(method, Arc::new(handler));
        self
    }

    pub fn get(self, handler: impl Layer) -> Self { self.on(Method::Get, handler) }
    pub fn head(self, handler: impl Layer) -> Self { self.on(Method::Head, handler) }
    pub fn post(self, handler: impl Layer) -> Self { self.on(Method::Post, handler) }
    pub fn put(self, handler: impl Layer) -> Self { self.on(Method::Put, handler) }
    pub fn delete(self, handler: impl Layer) -> Self { self.on(Method::Delete, handler) }
    pub fn connect(self, handler: impl Layer) -> Self { self.on(Method::Connect, handler) }
    pub fn options(self, handler: impl Layer) -> Self { self.on(Method::Options, handler) }
    pub fn trace(self, handler: impl Layer) -> Self { self.on(Method::Trace, handler) }
    pub fn patch(self, handler: impl Layer) -> Self { self.on(Method::Patch, handler) }

    /// Layer used when the path matches but no handler is registered for the
    /// request method, including methods outside [`Method`].
    pub fn fallback(mut self, handler: impl Layer) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The handler a matched request with `method` is dispatched to.
    fn select(&self, method: Option<Method>) -> Option<&BoxedLayer> {
        method
            .and_then(|m| self.handlers.get(&m))
            .or(self.fallback.as_ref())
    }
}

impl Layer for Resource {
    fn call(&self, cx: Context, next: Next) -> BoxFuture<Result<(), Error>> {
        let request = cx.request();

        let Some(params) = self.pattern.matches(request.path()) else {
            return pass(next);
        };
        trace!(pattern = self.pattern.as_str(), path = request.path(), "resource matched");
        request.set_path_params(params);

        match self.select(request.method()) {
            Some(handler) => handler.call(cx, next),
            None => pass(next),
        }
    }
}

/// Hands the request to the rest of the stack.
fn pass(next: Next) -> BoxFuture<Result<(), Error>> {
    Box::pin(async move {
        next.run().await?;
        Ok(())
    })
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.handlers.keys().map(|m| m.as_str()).collect();
        methods.sort_unstable();
        f.debug_struct("Resource")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &methods)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use serde_json::json;

    use super::*;
    use crate::pattern::Params;
    use crate::pipeline::Pipeline;
    use crate::request::Request;
    use crate::response::Response;

    async fn run(pipeline: &Pipeline, method: &str, path: &str) -> Response {
        let req = http::Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap();
        pipeline.handle(Request::from_http(req)).await.unwrap()
    }

    /// Answers with `label` in the body.
    fn answer(label: &'static str) -> impl Layer {
        move |cx: Context, _next: Next| async move {
            cx.response().set_body(label);
            Ok::<(), Error>(())
        }
    }

    /// Terminal layer recording the path parameters it sees.
    fn terminal(seen: Arc<Mutex<Vec<Option<Params>>>>) -> impl Layer {
        move |cx: Context, _next: Next| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(cx.request().path_params());
                cx.response().set_status(StatusCode::NOT_FOUND);
                Ok::<(), Error>(())
            }
        }
    }

    #[tokio::test]
    async fn unmatched_paths_pass_through() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .add_layer(Resource::new("/users/{id}").get(answer("user")))
            .add_layer(terminal(Arc::clone(&seen)));

        let res = run(&pipeline, "GET", "/other").await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(*seen.lock().unwrap(), [None]);
    }

    #[tokio::test]
    async fn dispatches_by_method_with_params() {
        let pipeline = Pipeline::new().add_layer(
            Resource::new("/users/{userId}/friends/{friendId}")
                .get(|cx: Context, _next: Next| async move {
                    let params = cx.request().path_params().unwrap_or_default();
                    cx.response().set_body(json!(params));
                    Ok::<(), Error>(())
                })
                .delete(answer("deleted")),
        );

        let res = run(&pipeline, "GET", "/users/1/friends/2").await;
        assert_eq!(res.body().as_json(), Some(&json!({ "userId": "1", "friendId": "2" })));

        let res = run(&pipeline, "DELETE", "/users/1/friends/2").await;
        assert_eq!(res.body().as_text(), Some("deleted"));
    }

    #[tokio::test]
    async fn unhandled_method_falls_through_with_params_set() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .add_layer(Resource::new("/users/{id}").get(answer("user")))
            .add_layer(terminal(Arc::clone(&seen)));

        let res = run(&pipeline, "POST", "/users/9").await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let expected = Params::from([("id".to_owned(), "9".to_owned())]);
        assert_eq!(*seen.lock().unwrap(), [Some(expected)]);
    }

    #[tokio::test]
    async fn fallback_handles_unbound_and_unknown_methods() {
        let pipeline = Pipeline::new()
            .add_layer(
                Resource::new("/users")
                    .get(answer("list"))
                    .fallback(|cx: Context, _next: Next| async move {
                        cx.response().set_status(StatusCode::METHOD_NOT_ALLOWED);
                        Ok::<(), Error>(())
                    }),
            )
            .add_layer(answer("unreachable"));

        assert_eq!(run(&pipeline, "GET", "/users").await.body().as_text(), Some("list"));
        assert_eq!(run(&pipeline, "PUT", "/users").await.status(), StatusCode::METHOD_NOT_ALLOWED);

        let res = run(&pipeline, "PROPFIND", "/users").await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(res.body().is_empty());
    }

    #[tokio::test]
    async fn handler_can_delegate_to_next() {
        let pipeline = Pipeline::new()
            .add_layer(Resource::new("/users/").get(|cx: Context, next: Next| async move {
                cx.state().insert("visited", true);
                next.run().await?;
                Ok::<(), Error>(())
            }))
            .add_layer(|cx: Context, _next: Next| async move {
                let visited = cx.state().get::<bool>("visited").copied().unwrap_or(false);
                cx.response().set_body(json!({ "visited": visited }));
                Ok::<(), Error>(())
            });

        let res = run(&pipeline, "GET", "/users").await;
        assert_eq!(res.body().as_json(), Some(&json!({ "visited": true })));
    }

    #[tokio::test]
    async fn later_match_replaces_params() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .add_layer(Resource::new("/a/{x}/*"))
            .add_layer(Resource::new("/a/{y}/b"))
            .add_layer(terminal(Arc::clone(&seen)));

        run(&pipeline, "GET", "/a/1/b").await;

        let expected = Params::from([("y".to_owned(), "1".to_owned())]);
        assert_eq!(*seen.lock().unwrap(), [Some(expected)]);
    }

    #[test]
    fn try_new_reports_bad_patterns() {
        assert!(Resource::try_new("/users/{id").is_err());
    }

    #[test]
    #[should_panic(expected = "invalid resource pattern")]
    fn new_panics_on_bad_patterns() {
        let _ = Resource::new("/users/{}");
    }
}
