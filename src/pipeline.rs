//! The layer pipeline.
//!
//! Layers wrap each other like the rings of an onion. Layer *i* runs first,
//! hands control to layer *i + 1* through its [`Next`], and gets control back
//! once everything inside it has finished:
//!
//! ```text
//! enter A ─► enter B ─► enter C
//!                          │
//! exit  A ◄─ exit  B ◄─ exit  C
//! ```
//!
//! The pipeline never catches errors. An `Err` returned by an inner layer
//! surfaces from `next.run()` in every outer layer that awaited it, and
//! finally from [`Pipeline::dispatch`]. Put an error-handling layer such as
//! [`middleware::catch_errors`](crate::middleware::catch_errors) near the head
//! of the stack.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use crate::context::Context;
use crate::error::Error;
use crate::layer::{BoxFuture, BoxedLayer, Layer};
use crate::request::Request;
use crate::response::Response;

/// An ordered stack of layers.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Pipeline::add_layer`] call returns `self` so registrations chain.
///
/// ```rust,no_run
/// use shallot::{Pipeline, Resource, middleware};
/// # async fn list_users(_: shallot::Context, _: shallot::Next) -> Result<(), shallot::Error> { Ok(()) }
///
/// let app = Pipeline::new()
///     .add_layer(middleware::catch_errors)
///     .add_layer(Resource::new("/users").get(list_users))
///     .add_layer(middleware::not_found);
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    layers: Arc<Vec<BoxedLayer>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `layer` as the innermost layer so far.
    ///
    /// Pushes in place while this pipeline is the only owner of its stack;
    /// a pipeline that has been cloned copies the stack first, so the clones
    /// never see each other's additions.
    pub fn add_layer(mut self, layer: impl Layer) -> Self {
        Arc::make_mut(&mut self.layers).push(Arc::new(layer));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Runs `cx` through every layer, starting at the outermost one, and
    /// resolves when that layer's call completes.
    pub async fn dispatch(&self, cx: Context) -> Result<(), Error> {
        traverse(Arc::clone(&self.layers), 0, cx).await
    }

    /// Wraps `request` in a fresh [`Context`], dispatches it, and returns the
    /// response the layers built.
    pub async fn handle(&self, request: Request) -> Result<Response, Error> {
        let cx = Context::new(request);
        self.dispatch(cx.clone()).await?;
        Ok(cx.take_response())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("layers", &self.layers.len()).finish()
    }
}

/// Invokes the layer at `index`, or resolves immediately past the end.
fn traverse(layers: Arc<Vec<BoxedLayer>>, index: usize, cx: Context) -> BoxFuture<Result<(), Error>> {
    let Some(layer) = layers.get(index).map(Arc::clone) else {
        return Box::pin(async { Ok(()) });
    };
    let next = Next { layers, index: index + 1, cx: cx.clone(), fired: AtomicBool::new(false) };
    layer.call(cx, next)
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the stack, as seen from one layer.
///
/// Single-use: the first [`run`](Next::run) (or [`detach`](Next::detach))
/// traverses the inner layers; any later call does nothing and resolves to
/// `Ok(None)`. A layer can therefore never run its inner layers twice and
/// produce two responses for one request.
pub struct Next {
    layers: Arc<Vec<BoxedLayer>>,
    index: usize,
    cx: Context,
    fired: AtomicBool,
}

impl Next {
    /// Runs the inner layers and waits for them.
    ///
    /// Returns `Ok(Some(()))` when the inner layers ran (including the case
    /// where there were none), `Ok(None)` when this continuation had already
    /// been used, and the inner error otherwise.
    pub async fn run(&self) -> Result<Option<()>, Error> {
        if self.fire() {
            traverse(Arc::clone(&self.layers), self.index, self.cx.clone()).await?;
            Ok(Some(()))
        } else {
            Ok(None)
        }
    }

    /// Starts the inner layers on a separate task without waiting for them.
    ///
    /// The inner layers still run exactly once, but nothing orders their
    /// effects against whatever the calling layer does afterwards, including
    /// the server flushing the response. Await the handle if the order
    /// matters.
    pub fn detach(self) -> JoinHandle<Result<Option<()>, Error>> {
        tokio::spawn(async move { self.run().await })
    }

    /// `true` once this continuation has been used.
    pub fn is_spent(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    fn fire(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("spent", &self.is_spent())
            .finish()
    }
}
