//! Single-endpoint action dispatcher.
//!
//! Every request to the dispatcher's path names its operation in the form
//! field `Action`. The dispatcher looks the action up, resolves the caller's
//! identity headers into an [`ActionRequest`], and hands that to the
//! registered action handler:
//!
//! ```text
//! path != pattern           → 404 "404 page not found"
//! Action field empty        → 400 "Bad Request"
//! Action not registered     → 404 "Not Found"
//! otherwise                 → handler(ActionRequest), then X-Requst-Trace: <hostname>
//! ```
//!
//! A request without a `Request-Id` header gets a fresh `req-<uuid>` id,
//! echoed back in the response's `Request-Id` header. A supplied id is passed
//! through unchanged and not echoed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, private};
use crate::request::{Request, RequestContext};
use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// Form field naming the action.
pub const ACTION_FIELD: &str = "Action";
pub const REQUEST_ID_HEADER: &str = "Request-Id";
pub const CLIENT_TOKEN_HEADER: &str = "Client-Token";
pub const USER_ID_HEADER: &str = "User-Id";
pub const ADMIN_TOKEN_HEADER: &str = "AdminToken-Token";
/// Set on every dispatched response to the serving hostname. The spelling is
/// part of the wire contract.
pub const TRACE_HEADER: &str = "X-Requst-Trace";
/// Prefix of generated request ids.
pub const REQUEST_ID_PREFIX: &str = "req";

/// Returns `"<prefix>-<uuid v4>"`.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// The request as an action handler sees it.
///
/// `request_id` is never empty. The other identity fields are empty strings
/// when the caller did not send the header.
#[derive(Clone, Debug)]
pub struct ActionRequest {
    /// The underlying request; its [`context`](Request::context) carries
    /// `request_id` as well.
    pub raw: Request,
    pub action: String,
    pub request_id: String,
    pub user_id: String,
    pub client_token: String,
    pub admin_token: String,
}

/// A registered action handler, type-erased.
pub type BoxedAction = Arc<dyn Fn(ActionRequest) -> BoxFuture + Send + Sync + 'static>;

/// Maps action names to handlers for one path.
///
/// Cloning is cheap and every clone shares the same registry, so handlers can
/// still be registered after the mux has been wrapped and is serving.
///
/// ```rust
/// use tsu_action::{ActionMux, ActionRequest, Response};
///
/// let mux = ActionMux::new("/api", "host-1");
/// mux.register_handle_func("CreateUser", |req: ActionRequest| async move {
///     Response::text(format!("created by {}", req.user_id))
/// });
/// ```
#[derive(Clone)]
pub struct ActionMux {
    inner: Arc<Inner>,
}

struct Inner {
    pattern: String,
    hostname: String,
    handlers: RwLock<HashMap<String, BoxedAction>>,
}

impl ActionMux {
    /// A mux serving exactly `pattern` and stamping `hostname` on responses.
    ///
    /// `pattern` is compared with the request path as it arrived, without
    /// percent-decoding: `/%61pi` does not match `/api`.
    pub fn new(pattern: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                pattern: pattern.into(),
                hostname: hostname.into(),
                handlers: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn pattern(&self) -> &str { &self.inner.pattern }
    pub fn hostname(&self) -> &str { &self.inner.hostname }

    /// Registers `handler` for `action`, replacing any earlier one.
    /// Action names are case-sensitive.
    pub fn register_handle_func<F, Fut, R>(&self, action: impl Into<String>, handler: F)
    where
        F: Fn(ActionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        let action = action.into();
        let boxed: BoxedAction = Arc::new(move |req: ActionRequest| -> BoxFuture {
            let fut = handler(req);
            Box::pin(async move { fut.await.into_response() })
        });

        let replaced = self.inner.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(action.clone(), boxed);
        if replaced.is_some() {
            debug!(%action, "replaced action handler");
        }
    }

    /// Returns the handler registered for `action`.
    pub fn get_handle_func(&self, action: &str) -> Result<BoxedAction, Error> {
        self.inner.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(action)
            .cloned()
            .ok_or_else(|| Error::ActionNotFound(action.to_owned()))
    }

    /// Routes one request. The lock is released before the handler runs.
    pub async fn dispatch(&self, req: Request) -> Response {
        if req.path() != self.inner.pattern {
            return Response::error(Status::NotFound, "404 page not found");
        }

        let action = req.form_value(ACTION_FIELD).await;
        if action.is_empty() {
            return Response::error(Status::BadRequest, Status::BadRequest.text());
        }

        let handler = match self.get_handle_func(&action) {
            Ok(h) => h,
            Err(e) => {
                debug!(error = %e, "action lookup failed");
                return Response::error(Status::NotFound, Status::NotFound.text());
            }
        };

        let (request_id, generated) = match non_empty_header(&req, REQUEST_ID_HEADER) {
            Some(id) => (id, false),
            None => (generate_id(REQUEST_ID_PREFIX), true),
        };
        let client_token = non_empty_header(&req, CLIENT_TOKEN_HEADER).unwrap_or_default();
        let user_id = non_empty_header(&req, USER_ID_HEADER).unwrap_or_default();
        let admin_token = non_empty_header(&req, ADMIN_TOKEN_HEADER).unwrap_or_default();

        let raw = req.with_context(RequestContext { request_id: Some(request_id.clone()) });

        debug!(%action, %request_id, generated, "dispatching action");

        let mut res = handler(ActionRequest {
            raw,
            action,
            request_id: request_id.clone(),
            user_id,
            client_token,
            admin_token,
        })
        .await;

        // A handler may set its own Request-Id; the generated one only fills the gap.
        if generated && res.header(REQUEST_ID_HEADER).is_none() {
            res.set_header(REQUEST_ID_HEADER, &request_id);
        }
        res.set_header(TRACE_HEADER, &self.inner.hostname);
        res
    }
}

fn non_empty_header(req: &Request, name: &str) -> Option<String> {
    req.header_text(name).filter(|v| !v.is_empty()).map(|v| v.into_owned())
}

impl ErasedHandler for ActionMux {
    fn call(&self, req: Request) -> BoxFuture {
        let mux = self.clone();
        Box::pin(async move { mux.dispatch(req).await })
    }
}

impl private::Sealed for ActionMux {}

impl Handler for ActionMux {
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler::from_erased(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::Uri;

    use super::*;
    use crate::Method;

    const FORM: &str = "application/x-www-form-urlencoded";

    fn post(body: &'static str) -> Request {
        Request::new(Method::Post, Uri::from_static("/api"))
            .with_header("content-type", FORM)
            .with_body(body)
    }

    /// A mux with `CreateUser` registered, recording every request it sees.
    fn mux_with_recorder() -> (ActionMux, Arc<Mutex<Vec<ActionRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mux = ActionMux::new("/api", "host-1");
        let record = Arc::clone(&seen);
        mux.register_handle_func("CreateUser", move |req: ActionRequest| {
            record.lock().unwrap().push(req);
            async { Response::builder().status(Status::Created).text("created") }
        });
        (mux, seen)
    }

    #[tokio::test]
    async fn generates_request_id_when_absent() {
        let (mux, seen) = mux_with_recorder();

        let res = mux.dispatch(post("Action=CreateUser")).await;

        assert_eq!(res.status_code(), 201);
        assert_eq!(res.header(TRACE_HEADER), Some("host-1"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let req = &seen[0];
        assert_eq!(req.action, "CreateUser");
        assert!(req.request_id.starts_with("req-"));
        assert!(req.request_id.len() > "req-".len());
        assert_eq!(res.header(REQUEST_ID_HEADER), Some(req.request_id.as_str()));
        assert_eq!(req.raw.context().request_id.as_deref(), Some(req.request_id.as_str()));
    }

    #[tokio::test]
    async fn supplied_request_id_passes_through() {
        let (mux, seen) = mux_with_recorder();

        let res = mux
            .dispatch(post("Action=CreateUser").with_header("Request-Id", "caller-42"))
            .await;

        assert_eq!(res.header(REQUEST_ID_HEADER), None);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].request_id, "caller-42");
        assert_eq!(seen[0].raw.context().request_id.as_deref(), Some("caller-42"));
    }

    #[tokio::test]
    async fn empty_request_id_header_is_replaced() {
        let (mux, seen) = mux_with_recorder();

        let res = mux
            .dispatch(post("Action=CreateUser").with_header("Request-Id", ""))
            .await;

        let seen = seen.lock().unwrap();
        assert!(seen[0].request_id.starts_with("req-"));
        assert_eq!(res.header(REQUEST_ID_HEADER), Some(seen[0].request_id.as_str()));
    }

    #[tokio::test]
    async fn identity_headers_default_to_empty() {
        let (mux, seen) = mux_with_recorder();

        mux.dispatch(
            post("Action=CreateUser")
                .with_header("User-Id", "u-7")
                .with_header("AdminToken-Token", "root"),
        )
        .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].user_id, "u-7");
        assert_eq!(seen[0].admin_token, "root");
        assert_eq!(seen[0].client_token, "");
    }

    #[tokio::test]
    async fn unknown_action_is_404_without_invocation() {
        let (mux, seen) = mux_with_recorder();

        let res = mux.dispatch(post("Action=DeleteAll")).await;

        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body(), b"Not Found\n");
        assert_eq!(res.header(TRACE_HEADER), None);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn action_names_are_case_sensitive() {
        let (mux, seen) = mux_with_recorder();

        let res = mux.dispatch(post("Action=createuser")).await;
        assert_eq!(res.status_code(), 404);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_action_is_400() {
        let (mux, _) = mux_with_recorder();

        let res = mux.dispatch(post("Name=alice")).await;
        assert_eq!(res.status_code(), 400);
        assert_eq!(res.body(), b"Bad Request\n");

        let res = mux.dispatch(post("Action=")).await;
        assert_eq!(res.status_code(), 400);
    }

    #[tokio::test]
    async fn wrong_path_is_404() {
        let (mux, seen) = mux_with_recorder();

        let req = Request::new(Method::Post, Uri::from_static("/api/?Action=CreateUser"));
        let res = mux.dispatch(req).await;

        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body(), b"404 page not found\n");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_ascii_identity_headers_pass_through() {
        let (mux, seen) = mux_with_recorder();

        let res = mux
            .dispatch(
                post("Action=CreateUser")
                    .with_header("Request-Id", "café-1")
                    .with_header("User-Id", "café-1"),
            )
            .await;

        assert_eq!(res.header(REQUEST_ID_HEADER), None);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].request_id, "café-1");
        assert_eq!(seen[0].user_id, "café-1");
    }

    #[tokio::test]
    async fn multipart_action_is_dispatched() {
        let (mux, seen) = mux_with_recorder();

        let req = Request::new(Method::Post, Uri::from_static("/api"))
            .with_header("content-type", "multipart/form-data; boundary=XX")
            .with_body(
                "--XX\r\nContent-Disposition: form-data; name=\"Action\"\r\n\r\nCreateUser\r\n--XX--\r\n",
            );
        assert_eq!(mux.dispatch(req).await.status_code(), 201);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mixed_case_form_type_is_dispatched() {
        let (mux, seen) = mux_with_recorder();

        let req = Request::new(Method::Post, Uri::from_static("/api"))
            .with_header("content-type", "Application/X-WWW-Form-Urlencoded")
            .with_body("Action=CreateUser");
        assert_eq!(mux.dispatch(req).await.status_code(), 201);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pattern_matches_raw_path() {
        let (mux, seen) = mux_with_recorder();

        let req = Request::new(Method::Get, Uri::from_static("/%61pi?Action=CreateUser"));
        assert_eq!(mux.dispatch(req).await.status_code(), 404);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn action_from_query_string() {
        let (mux, seen) = mux_with_recorder();

        let req = Request::new(Method::Get, Uri::from_static("/api?Action=CreateUser"));
        assert_eq!(mux.dispatch(req).await.status_code(), 201);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn later_registration_overwrites() {
        let mux = ActionMux::new("/api", "host-1");
        mux.register_handle_func("Ping", |_req: ActionRequest| async { "first" });
        mux.register_handle_func("Ping", |_req: ActionRequest| async { "second" });

        let res = mux.dispatch(post("Action=Ping")).await;
        assert_eq!(res.body(), b"second");
    }

    #[tokio::test]
    async fn trace_header_overrides_handler_value() {
        let mux = ActionMux::new("/api", "host-1");
        mux.register_handle_func("Ping", |_req: ActionRequest| async {
            Response::builder().header("x-requst-trace", "spoofed").text("pong")
        });

        let res = mux.dispatch(post("Action=Ping")).await;
        let traces: Vec<_> = res.headers().iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(TRACE_HEADER))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(traces, ["host-1"]);
    }

    #[test]
    fn get_handle_func_reports_missing_action() {
        let mux = ActionMux::new("/api", "host-1");
        match mux.get_handle_func("Nope") {
            Err(Error::ActionNotFound(name)) => assert_eq!(name, "Nope"),
            _ => panic!("expected ActionNotFound"),
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_id("req");
        let b = generate_id("req");
        assert!(a.starts_with("req-"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn registration_while_dispatching() {
        let mux = ActionMux::new("/api", "host-1");
        let handler = mux.clone().into_boxed_handler();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let mux = mux.clone();
            let handler = handler.clone();
            tasks.spawn(async move {
                if i % 2 == 0 {
                    mux.register_handle_func(format!("A{i}"), |_req: ActionRequest| async { "ok" });
                } else {
                    let res = handler.call(post("Action=A0")).await;
                    assert!(matches!(res.status_code(), 200 | 404));
                }
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }
        assert!(mux.get_handle_func("A30").is_ok());
    }
}
