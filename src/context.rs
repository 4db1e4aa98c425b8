//! Per-request context handed to every layer.
//!
//! A [`Context`] is a cheap handle (one `Arc`) to the request view, the
//! response under construction, and a [`State`] bag layers use to pass data
//! to each other. One context exists per request; it is dropped once the
//! response has been flushed.
//!
//! The response and state live behind short-lived locks. Keep the guards
//! inside a single statement, or at least never across an `.await`:
//!
//! ```rust,ignore
//! cx.response().set_status(StatusCode::NOT_FOUND);   // guard dropped here
//! next.run().await?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::request::Request;
use crate::response::Response;
use crate::sync::lock;

/// Handle to the state of one in-flight request.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    request: Request,
    response: Mutex<Response>,
    state: Mutex<State>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            inner: Arc::new(Inner {
                request,
                response: Mutex::new(Response::default()),
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// Locks the response for mutation.
    pub fn response(&self) -> MutexGuard<'_, Response> {
        lock(&self.inner.response)
    }

    /// Locks the cross-layer state bag.
    pub fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner.state)
    }

    /// Moves the finished response out, leaving a fresh default behind.
    pub(crate) fn take_response(&self) -> Response {
        std::mem::take(&mut *self.response())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.inner.request.http_method())
            .field("path", &self.inner.request.path())
            .finish_non_exhaustive()
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// String-keyed, type-erased values scoped to one request.
///
/// This is the only place layers should share mutable data: an
/// authentication layer stores the user, a handler further in reads it back.
///
/// ```rust
/// use shallot::State;
///
/// let mut state = State::default();
/// state.insert("user_id", 42_u64);
/// assert_eq!(state.get::<u64>("user_id"), Some(&42));
/// assert_eq!(state.get::<String>("user_id"), None); // wrong type
/// ```
#[derive(Default)]
pub struct State {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl State {
    /// Stores `value` under `key`, replacing whatever was there.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// The value under `key`, if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut()
    }

    /// Removes and returns the value under `key` if it is a `T`. A value of
    /// another type is left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key)?.is::<T>() {
            return None;
        }
        let boxed = self.values.remove(key)?;
        boxed.downcast().ok().map(|b| *b)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
