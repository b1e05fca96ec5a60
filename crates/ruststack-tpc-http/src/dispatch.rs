//! Continuation for requests that are not third-party copies.
//!
//! The gateway itself only implements TPC. Everything else, including local
//! `COPY`/`MOVE` and plain WebDAV traffic, is handed unchanged to a
//! [`FallbackHandler`]. The default [`NotImplementedHandler`] answers `501`.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::combinators::BoxBody;

use crate::body::TpcResponseBody;

/// Request body handed to the continuation.
pub type RequestBody = BoxBody<Bytes, hyper::Error>;

/// Future returned by a [`FallbackHandler`].
pub type FallbackFuture = Pin<Box<dyn Future<Output = http::Response<TpcResponseBody>> + Send>>;

/// Downstream handler invoked for every request the TPC filter passes through.
///
/// # Object Safety
///
/// The future is boxed so the handler can be stored as `Arc<dyn FallbackHandler>`.
pub trait FallbackHandler: Send + Sync + 'static {
    /// Handle the untouched request.
    fn handle(&self, req: http::Request<RequestBody>) -> FallbackFuture;
}

/// Answers `501 Not Implemented` for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotImplementedHandler;

impl FallbackHandler for NotImplementedHandler {
    fn handle(&self, req: http::Request<RequestBody>) -> FallbackFuture {
        let method = req.method().clone();
        Box::pin(async move {
            tracing::debug!(%method, "no handler for request");
            let mut response = http::Response::new(TpcResponseBody::from_string(format!(
                "{method} is not implemented by this gateway"
            )));
            *response.status_mut() = StatusCode::NOT_IMPLEMENTED;
            response
        })
    }
}
