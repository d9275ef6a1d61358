//! Unified error type.

use std::fmt;

/// The error type returned by tsu-action's fallible operations.
///
/// Routing and validation failures (404, 400, 415) are expressed as HTTP
/// [`Response`](crate::Response) values written at the point of detection,
/// not as `Error`s. This type surfaces infrastructure failures and registry
/// lookups made outside the request path.
#[derive(Debug)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    Io(std::io::Error),
    /// The bind address is not a valid `host:port` string.
    Addr(std::net::AddrParseError),
    /// No handler is registered for the named action.
    ActionNotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Addr(e) => write!(f, "invalid socket address: {e}"),
            Self::ActionNotFound(action) => write!(f, "handle function not found: {action}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Addr(e) => Some(e),
            Self::ActionNotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(e: std::net::AddrParseError) -> Self {
        Self::Addr(e)
    }
}
