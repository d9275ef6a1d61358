//! # tsu-action
//!
//! A small HTTP front end made of two cooperating pieces:
//!
//! - a [`FilterManager`] that nests cross-cutting [`Filter`]s (logging,
//!   content-type gating, path gating) around a terminal handler, and
//! - an [`ActionMux`] that serves one path and routes each request to a
//!   handler chosen by its form-encoded `Action` field, resolving the
//!   caller's request id and tokens into an [`ActionRequest`] on the way.
//!
//! A request flows filter chain → dispatcher → action handler.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_action::{ActionMux, ActionRequest, FilterManager, Response, Server, Status, filters};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mux = ActionMux::new("/api", "host-1");
//!     mux.register_handle_func("CreateUser", create_user);
//!
//!     let chain = FilterManager::new();
//!     chain.add_filter(filters::timing_log);
//!     chain.add_filter(filters::content_type(["application/x-www-form-urlencoded"]));
//!
//!     Server::bind("0.0.0.0:3000").serve(chain.wrap(mux)).await.unwrap();
//! }
//!
//! async fn create_user(req: ActionRequest) -> Response {
//!     if req.user_id.is_empty() {
//!         return Response::status(Status::Unauthorized);
//!     }
//!     Response::builder()
//!         .status(Status::Created)
//!         .text(format!("request {}", req.request_id))
//! }
//! ```

mod action;
mod error;
mod filter;
mod handler;
mod method;
mod request;
mod response;
mod server;
mod status;

pub mod filters;

pub use action::{
    ACTION_FIELD, ADMIN_TOKEN_HEADER, ActionMux, ActionRequest, BoxedAction, CLIENT_TOKEN_HEADER,
    REQUEST_ID_HEADER, REQUEST_ID_PREFIX, TRACE_HEADER, USER_ID_HEADER, generate_id,
};
pub use error::Error;
pub use filter::{Filter, FilterManager};
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use method::Method;
pub use request::{Request, RequestContext};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::Server;
pub use status::Status;
