//! Minimal shallot example: a users resource, health checks, error handling.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/users -d 'oops'     # 415
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl -X PATCH http://localhost:3000/users/42           # 405 via fallback
//!   curl http://localhost:3000/healthz

use serde_json::json;
use shallot::{Context, Error, Next, Pipeline, Resource, Server, StatusCode, health, middleware};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = Pipeline::new()
        .add_layer(middleware::trace)
        .add_layer(middleware::catch_errors)
        .add_layer(request_id)
        .add_layer(Resource::new("/users").post(create_user))
        .add_layer(
            Resource::new("/users/{id}")
                .get(get_user)
                .delete(delete_user)
                .fallback(method_not_allowed),
        )
        .add_layer(Resource::new("/healthz").get(health::liveness))
        .add_layer(Resource::new("/readyz").get(health::readiness))
        .add_layer(middleware::not_found);

    Server::port(3000).serve(app).await
}

// Stores a request id in the state bag and echoes it on the way out.
async fn request_id(cx: Context, next: Next) -> Result<(), Error> {
    let id = cx.request()
        .header("x-request-id")
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{:016x}", rand_id()));
    cx.state().insert("request_id", id.clone());

    next.run().await?;

    cx.response().set_header("X-Request-Id", id);
    Ok(())
}

fn rand_id() -> u64 {
    use std::hash::{BuildHasher, RandomState};
    RandomState::new().hash_one(std::time::SystemTime::now())
}

// GET /users/{id}
async fn get_user(cx: Context, _next: Next) -> Result<(), Error> {
    let id = cx.request().param("id").unwrap_or_default();
    cx.response().set_body(json!({ "id": id, "name": "alice" }));
    Ok(())
}

// POST /users
async fn create_user(cx: Context, _next: Next) -> Result<(), Error> {
    let body = cx.request().body().await?;
    let Some(name) = body.as_json().and_then(|v| v["name"].as_str()) else {
        return Err(Error::BadRequest("`name` is required".into()));
    };

    cx.response()
        .set_status(StatusCode::CREATED)
        .set_header("Location", "/users/99")
        .set_body(json!({ "id": "99", "name": name }));
    Ok(())
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(cx: Context, _next: Next) -> Result<(), Error> {
    cx.response().set_status(StatusCode::NO_CONTENT).set_body(());
    Ok(())
}

async fn method_not_allowed(cx: Context, _next: Next) -> Result<(), Error> {
    cx.response()
        .set_status(StatusCode::METHOD_NOT_ALLOWED)
        .set_header("Allow", "GET, DELETE")
        .set_body(json!({ "message": "Method Not Allowed" }));
    Ok(())
}
