//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted — `Response::status()`,
//! `Response::builder().status()`, `Response::error()`, or as a bare action
//! handler return value.
//!
//! ```rust
//! use tsu_action::{Response, Status};
//!
//! Response::status(Status::NoContent);
//! Response::error(Status::Conflict, "user already exists");
//!
//! async fn delete_user(_req: tsu_action::ActionRequest) -> Status {
//!     Status::NoContent
//! }
//! ```

/// The status codes produced by the dispatcher, the filters, and typical
/// action handlers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                   // 200
    Created,              // 201
    Accepted,             // 202
    NoContent,            // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,           // 400
    Unauthorized,         // 401
    Forbidden,            // 403
    NotFound,             // 404
    MethodNotAllowed,     // 405
    Conflict,             // 409
    UnsupportedMediaType, // 415
    UnprocessableContent, // 422
    TooManyRequests,      // 429

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,  // 500
    ServiceUnavailable,   // 503
}

impl Status {
    /// The canonical reason phrase, e.g. `"Not Found"`.
    pub fn text(self) -> &'static str {
        http::StatusCode::from_u16(self.into())
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                   => 200,
            Status::Created              => 201,
            Status::Accepted             => 202,
            Status::NoContent            => 204,
            Status::BadRequest           => 400,
            Status::Unauthorized         => 401,
            Status::Forbidden            => 403,
            Status::NotFound             => 404,
            Status::MethodNotAllowed     => 405,
            Status::Conflict             => 409,
            Status::UnsupportedMediaType => 415,
            Status::UnprocessableContent => 422,
            Status::TooManyRequests      => 429,
            Status::InternalServerError  => 500,
            Status::ServiceUnavailable   => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_phrases_come_from_http() {
        assert_eq!(Status::BadRequest.text(), "Bad Request");
        assert_eq!(Status::NotFound.text(), "Not Found");
        assert_eq!(Status::UnsupportedMediaType.text(), "Unsupported Media Type");
    }
}
