//! Per-request tracing.

use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use crate::context::Context;
use crate::error::Error;
use crate::pipeline::Next;

/// Opens a span carrying the method and path, runs the rest of the stack
/// inside it, and logs the final status and latency.
///
/// Errors pass through untouched; put this layer outside
/// [`catch_errors`](super::catch_errors) to log the status they were mapped
/// to.
pub async fn trace(cx: Context, next: Next) -> Result<(), Error> {
    let span = info_span!(
        "request",
        method = %cx.request().http_method(),
        path = cx.request().path(),
    );

    async move {
        let started = Instant::now();
        let result = next.run().await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => {
                let status = cx.response().status().as_u16();
                info!(status, latency_ms, "request completed");
            }
            Err(e) => warn!(error = %e, latency_ms, "request failed"),
        }
        result.map(drop)
    }
    .instrument(span)
    .await
}
