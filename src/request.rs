//! Incoming HTTP request type and its typed context.

use std::borrow::Cow;
use std::convert::Infallible;

use bytes::Bytes;
use futures_util::stream;
use http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::method::Method;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Values attached to a request while it travels through the pipeline.
///
/// The dispatcher records the resolved request id here before invoking an
/// action handler, so anything holding the raw [`Request`] can read it back.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestContext {
    pub request_id: Option<String>,
}

/// An incoming HTTP request with its body fully read.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    context: RequestContext,
}

impl Request {
    /// A request with no headers, no body and an empty context.
    ///
    /// ```rust
    /// use tsu_action::{Method, Request};
    /// use http::Uri;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let req = Request::new(Method::Post, Uri::from_static("/api"))
    ///     .with_header("content-type", "application/x-www-form-urlencoded")
    ///     .with_body("Action=CreateUser");
    /// assert_eq!(req.form_value("Action").await, "CreateUser");
    /// # }
    /// ```
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            context: RequestContext::default(),
        }
    }

    pub(crate) fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self { method, uri, headers, body, context: RequestContext::default() }
    }

    /// Appends a header. Invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::from_bytes(value.as_bytes())) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(name, "skipping invalid request header"),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns a derived request carrying `context` in place of the current one.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn context(&self) -> &RequestContext { &self.context }

    /// Case-insensitive header lookup. Returns the first value if the header
    /// repeats, `None` if it is absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Like [`header`](Request::header), but keeps values carrying non-ASCII
    /// bytes, decoding them as UTF-8 with replacement characters.
    pub fn header_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers.get(name).map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    /// The declared `Content-Type`, parameters included. Empty when absent.
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    /// First value of the form field `name`, or an empty string.
    ///
    /// For `POST`, `PUT` and `PATCH` requests with an
    /// `application/x-www-form-urlencoded` or `multipart/form-data` body,
    /// body fields take precedence over URL query fields. Media types are
    /// matched case-insensitively here. Every other request only consults
    /// the query.
    pub async fn form_value(&self, name: &str) -> String {
        if self.method.is_mutating() {
            let declared = media_type(self.content_type()).trim();
            let from_body = if declared.eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
                first_pair(&self.body, name)
            } else if declared.eq_ignore_ascii_case(MULTIPART_CONTENT_TYPE) {
                self.multipart_value(name).await
            } else {
                None
            };
            if let Some(value) = from_body {
                return value;
            }
        }
        self.uri
            .query()
            .and_then(|q| first_pair(q.as_bytes(), name))
            .unwrap_or_default()
    }

    /// First non-file part named `name` in a `multipart/form-data` body.
    /// A malformed body yields `None`.
    async fn multipart_value(&self, name: &str) -> Option<String> {
        let boundary = match multer::parse_boundary(self.content_type()) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("unusable multipart content type: {e}");
                return None;
            }
        };

        let body = stream::iter([Ok::<_, Infallible>(self.body.clone())]);
        let mut multipart = multer::Multipart::new(body, boundary);
        loop {
            match multipart.next_field().await {
                Ok(Some(field)) => {
                    if field.file_name().is_some() || field.name() != Some(name) {
                        continue;
                    }
                    return field.text().await.ok();
                }
                Ok(None) => return None,
                Err(e) => {
                    tracing::debug!("malformed multipart body: {e}");
                    return None;
                }
            }
        }
    }
}

/// Strips `;`-delimited parameters from a content type.
pub(crate) fn media_type(content_type: &str) -> &str {
    match content_type.find(';') {
        Some(i) => &content_type[..i],
        None => content_type,
    }
}

fn first_pair(encoded: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(encoded)
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
