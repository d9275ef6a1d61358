//! Built-in filters.
//!
//! Each function here is a [`Filter`] (or returns one) ready for
//! [`FilterManager::add_filter`](crate::FilterManager::add_filter):
//!
//! ```rust
//! use tsu_action::{FilterManager, filters};
//!
//! let manager = FilterManager::new();
//! manager.add_filter(filters::timing_log);
//! manager.add_filter(filters::content_type(["application/json"]));
//! ```
//!
//! The filters share no state. Their only interaction is the order the
//! manager nests them in.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::filter::Filter;
use crate::handler::{BoxedHandler, Handler};
use crate::request::{Request, media_type};
use crate::response::Response;
use crate::status::Status;

/// Logs an `entering` marker, runs downstream, logs an `exiting` marker.
pub fn bracket_log(name: &'static str) -> impl Filter {
    move |next: BoxedHandler| {
        BoxedHandler::new(move |req: Request| {
            let next = next.clone();
            async move {
                info!(filter = name, "entering");
                let res = next.call(req).await;
                info!(filter = name, "exiting");
                res
            }
        })
    }
}

/// Passes through only requests whose path is exactly `path`.
///
/// Any other path is dropped silently: downstream is not called, nothing
/// further is logged and the reply is [`Response::empty`]. Callers that need
/// a 404 or a redirect for other paths must add it themselves.
pub fn path_gate(path: &'static str) -> impl Filter {
    move |next: BoxedHandler| {
        BoxedHandler::new(move |req: Request| {
            let next = next.clone();
            async move {
                info!(filter = "path_gate", gate = path, "entering");
                if req.path() != path {
                    return Response::empty();
                }
                let res = next.call(req).await;
                info!(filter = "path_gate", gate = path, "exiting");
                res
            }
        })
    }
}

/// [`path_gate`] on `/`.
pub fn root_only() -> impl Filter {
    path_gate("/")
}

/// Runs downstream and logs method, URL and elapsed time once it returns.
pub fn timing_log(next: BoxedHandler) -> BoxedHandler {
    BoxedHandler::new(move |req: Request| {
        let next = next.clone();
        async move {
            let method = req.method();
            let url = req.uri().to_string();
            let started = Instant::now();
            let res = next.call(req).await;
            info!(%method, url = ?url, elapsed = ?started.elapsed(), status = res.status_code(), "served");
            res
        }
    })
}

/// Rejects `POST`, `PUT` and `PATCH` requests whose content type is not in
/// `allowed` with `415 Unsupported Media Type`.
///
/// Parameters after `;` are ignored and the comparison is case-sensitive.
/// Requests with any other method pass through untouched.
pub fn content_type<I, S>(allowed: I) -> ContentTypeFilter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ContentTypeFilter { allowed: allowed.into_iter().map(Into::into).collect() }
}

/// The filter returned by [`content_type`].
#[derive(Clone, Debug)]
pub struct ContentTypeFilter {
    allowed: Arc<[String]>,
}

impl Filter for ContentTypeFilter {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        content_type_handler_shared(next, Arc::clone(&self.allowed))
    }
}

/// Wraps `next` with the [`content_type`] check directly, without a manager.
pub fn content_type_handler<I, S>(next: impl Handler, allowed: I) -> BoxedHandler
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: Arc<[String]> = allowed.into_iter().map(Into::into).collect();
    content_type_handler_shared(next.into_boxed_handler(), allowed)
}

fn content_type_handler_shared(next: BoxedHandler, allowed: Arc<[String]>) -> BoxedHandler {
    BoxedHandler::new(move |req: Request| {
        let next = next.clone();
        let allowed = Arc::clone(&allowed);
        async move {
            if !req.method().is_mutating() {
                return next.call(req).await;
            }

            let declared = media_type(req.content_type());
            if allowed.iter().any(|ct| ct == declared) {
                return next.call(req).await;
            }

            Response::error(
                Status::UnsupportedMediaType,
                format!(
                    "Unsupported content type {:?}; expected one of {:?}",
                    req.content_type(),
                    allowed,
                ),
            )
        }
    })
}
