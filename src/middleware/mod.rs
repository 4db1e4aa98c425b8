//! Built-in layers.
//!
//! The usual stack, outermost first:
//!
//! ```rust,no_run
//! use shallot::{Pipeline, middleware};
//!
//! let app = Pipeline::new()
//!     .add_layer(middleware::trace)          // span + status/latency log
//!     .add_layer(middleware::catch_errors)   // errors → status + JSON body
//!     // … resources and application layers …
//!     .add_layer(middleware::not_found);     // nothing matched
//! ```

mod trace;

pub use trace::trace;

use serde_json::json;
use tracing::{error, warn};

use crate::context::Context;
use crate::error::Error;
use crate::pipeline::Next;

/// Turns any error raised further in into a response.
///
/// Sets the status from [`Error::status`] and a JSON body
/// `{"message": "<reason phrase>"}`. The error is logged, not rethrown, so
/// outer layers see a successful call.
pub async fn catch_errors(cx: Context, next: Next) -> Result<(), Error> {
    let Err(err) = next.run().await else {
        return Ok(());
    };

    let status = err.status();
    if status.is_server_error() {
        error!(path = cx.request().path(), error = %err, "request failed");
    } else {
        warn!(path = cx.request().path(), error = %err, "request rejected");
    }

    let message = status.canonical_reason().unwrap_or("Error");
    cx.response()
        .set_status(status)
        .set_body(json!({ "message": message }));
    Ok(())
}

/// Terminal layer answering `404 Not Found` with `{"message": "Not Found"}`.
pub async fn not_found(cx: Context, _next: Next) -> Result<(), Error> {
    cx.response()
        .set_status(http::StatusCode::NOT_FOUND)
        .set_body(json!({ "message": "Not Found" }));
    Ok(())
}
