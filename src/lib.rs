//! # shallot
//!
//! A minimal HTTP framework with a single abstraction: layers.
//!
//! ## The model
//!
//! A [`Pipeline`] is an ordered stack of [`Layer`]s. Each layer receives the
//! request [`Context`] and a [`Next`] continuation. Work done before
//! `next.run().await` happens on the way in, work done after it happens on
//! the way out, once every inner layer has finished. That's the whole
//! framework: logging, error handling, authentication and routing are all
//! layers.
//!
//! Routing is a layer too. A [`Resource`] matches a declarative
//! [`PathPattern`] (`/users/{id}`, `/files/*`, `/users/`), records the path
//! parameters, and dispatches on the request [`Method`]. Requests it does not
//! match keep travelling down the stack.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use shallot::{Context, Error, Next, Pipeline, Resource, Server, StatusCode, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let app = Pipeline::new()
//!         .add_layer(middleware::trace)
//!         .add_layer(middleware::catch_errors)
//!         .add_layer(Resource::new("/users/{id}").get(get_user))
//!         .add_layer(Resource::new("/users").post(create_user))
//!         .add_layer(middleware::not_found);
//!
//!     Server::port(3000).serve(app).await
//! }
//!
//! async fn get_user(cx: Context, _next: Next) -> Result<(), Error> {
//!     let id = cx.request().param("id").unwrap_or_default();
//!     cx.response().set_body(json!({ "id": id, "name": "alice" }));
//!     Ok(())
//! }
//!
//! async fn create_user(cx: Context, _next: Next) -> Result<(), Error> {
//!     // 400 on malformed JSON, 415 on a missing content-type; catch_errors
//!     // turns either into a response.
//!     let user = cx.request().body().await?.clone();
//!     cx.response()
//!         .set_status(StatusCode::CREATED)
//!         .set_header("Location", "/users/99")
//!         .set_body(user);
//!     Ok(())
//! }
//! ```

mod body;
mod context;
mod error;
mod layer;
mod method;
mod pattern;
mod pipeline;
mod request;
mod resource;
mod response;
mod server;
mod sync;

pub mod health;
pub mod middleware;

pub use body::Body;
pub use context::{Context, State};
pub use error::{BoxError, Error, PatternError};
pub use layer::{BoxFuture, BoxedLayer, Layer};
pub use method::Method;
pub use pattern::{Params, PathPattern};
pub use pipeline::{Next, Pipeline};
pub use request::{MediaType, Request};
pub use resource::Resource;
pub use response::Response;
pub use server::Server;

pub use http::StatusCode;
