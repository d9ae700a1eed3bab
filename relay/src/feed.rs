//! HTTP feed of recent dings.

use crate::errors::RelayError;
use crate::history::{DingHistory, Timestamp};
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::{full_body, make_boxed_error_response};
use std::fmt::Write;
use std::future::Future;
use std::pin::Pin;

/// UTC timestamp format used in `<updated>` elements.
pub const UPDATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Renders one `<entry>` line per timestamp, in the order given.
pub fn render_feed(entries: &[Timestamp]) -> String {
    let mut out = String::new();
    for updated in entries {
        let _ = writeln!(
            out,
            "<entry><updated>{}</updated></entry>",
            updated.format(UPDATED_FORMAT)
        );
    }
    out
}

/// Serves the feed on `/`. There are no other routes.
pub struct FeedService {
    history: DingHistory,
}

impl FeedService {
    pub fn new(history: DingHistory) -> Self {
        Self { history }
    }
}

impl<B> Service<Request<B>> for FeedService {
    type Response = Response<BoxBody<Bytes, RelayError>>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let res = match req.uri().path() {
            "/" if req.method() == Method::GET || req.method() == Method::HEAD => {
                let body = render_feed(&self.history.snapshot());
                let mut response = Response::new(full_body(body));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                response
            }
            "/" => make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED),
            _ => make_boxed_error_response(StatusCode::NOT_FOUND),
        };

        Box::pin(async move { Ok(res) })
    }
}
