//! The `Layer` trait and type erasure.
//!
//! # How layers are stored
//!
//! A [`Pipeline`](crate::Pipeline) holds layers of *different* concrete types
//! (closures, `async fn` items, [`Resource`](crate::Resource)s) in one
//! `Vec`. We hide each behind `dyn Layer` and share it through an `Arc`:
//!
//! ```text
//! async fn auth(cx: Context, next: Next) -> Result<(), Error> { … }   ← user writes this
//!        ↓ pipeline.add_layer(auth)                 ← Layer blanket impl below
//! Arc::new(auth)  stored as BoxedLayer = Arc<dyn Layer>
//!        ↓
//! layer.call(cx, next)  at request time            ← one vtable dispatch
//!        ↓
//! Box::pin(auth(cx, next))                         ← BoxFuture
//! ```
//!
//! The only runtime cost per layer per request is one virtual call and one
//! boxed future.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::pipeline::Next;

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` let tokio move it across worker threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A type-erased layer shared across concurrent requests.
pub type BoxedLayer = Arc<dyn Layer>;

/// A unit of request handling that wraps everything after it.
///
/// A layer gets the request [`Context`] and a [`Next`] continuation. It may
/// work on the context, call `next.run().await` to let the inner layers run,
/// then work on the context again once they are done. Skipping `next`
/// short-circuits the rest of the stack.
///
/// Implemented automatically for any function or closure with the shape
///
/// ```text
/// async fn name(cx: Context, next: Next) -> Result<(), Error>
/// ```
///
/// and for [`Resource`](crate::Resource). Implement it by hand for layers
/// that carry configuration.
pub trait Layer: Send + Sync + 'static {
    fn call(&self, cx: Context, next: Next) -> BoxFuture<Result<(), Error>>;
}

impl<F, Fut> Layer for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, cx: Context, next: Next) -> BoxFuture<Result<(), Error>> {
        Box::pin(self(cx, next))
    }
}
