//! Built-in Kubernetes health-check layers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Mount them as resources:
//!
//! ```rust,no_run
//! use shallot::{Pipeline, Resource, health};
//!
//! let app = Pipeline::new()
//!     .add_layer(Resource::new("/healthz").get(health::liveness))
//!     .add_layer(Resource::new("/readyz").get(health::readiness));
//! ```
//!
//! Replace `readiness` with your own layer if the pod must wait for its
//! dependencies before taking traffic.

use crate::{Context, Error, Next};

/// Always answers `200 OK` with body `"ok"`.
pub async fn liveness(cx: Context, _next: Next) -> Result<(), Error> {
    cx.response().set_body("ok");
    Ok(())
}

/// Answers `200 OK` with body `"ready"`.
pub async fn readiness(cx: Context, _next: Next) -> Result<(), Error> {
    cx.response().set_body("ready");
    Ok(())
}
