//! Minimal tsu-action example — a filter chain in front of an action endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i -X POST http://localhost:3000/api \
//!        -H 'content-type: application/x-www-form-urlencoded' \
//!        -H 'User-Id: alice' \
//!        -d 'Action=CreateUser'
//!   curl -i 'http://localhost:3000/api?Action=DescribeUser' -H 'Request-Id: my-id'
//!   curl -i -X PUT http://localhost:3000/api -H 'content-type: text/xml' -d '<x/>'
//!   curl -i -X POST http://localhost:3000/api -d 'Action=DeleteAll'

use tracing_subscriber::EnvFilter;
use tsu_action::{ActionMux, ActionRequest, FilterManager, Response, Server, Status, filters};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::var("TSU_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_owned());

    let mux = ActionMux::new("/api", hostname);
    mux.register_handle_func("CreateUser", create_user);
    mux.register_handle_func("DescribeUser", describe_user);

    let chain = FilterManager::new();
    chain.add_filter(filters::timing_log);
    chain.add_filter(filters::bracket_log("outer"));
    chain.add_filter(filters::content_type([
        "application/json",
        "application/x-www-form-urlencoded",
    ]));

    if let Err(e) = Server::bind(addr).serve(chain.wrap(mux)).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

// Action=CreateUser → 201, or 401 without a User-Id header.
async fn create_user(req: ActionRequest) -> Response {
    if req.user_id.is_empty() {
        return Response::error(Status::Unauthorized, Status::Unauthorized.text());
    }
    Response::builder()
        .status(Status::Created)
        .json(format!(r#"{{"user":"{}","request_id":"{}"}}"#, req.user_id, req.request_id).into_bytes())
}

// Action=DescribeUser → echoes what the dispatcher resolved.
async fn describe_user(req: ActionRequest) -> Response {
    Response::text(format!(
        "action={} request_id={} client_token={:?}",
        req.action, req.request_id, req.client_token
    ))
}
