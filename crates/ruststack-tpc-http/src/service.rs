//! The gateway's hyper `Service`.
//!
//! [`TpcHttpService`] runs every inbound request through:
//!
//! 1. Health check interception (`GET /health`)
//! 2. Metrics scrape interception (`GET /metrics`)
//! 3. The [`TpcFilter`]
//! 4. The [`FallbackHandler`] for everything the filter passes through
//! 5. Common response headers (`X-Request-Id`, `Server`)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::body::TpcResponseBody;
use crate::dispatch::FallbackHandler;
use crate::filter::{Decision, TpcFilter};

/// Name of the per-request identifier header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Value of the `Server` header.
pub const SERVER_NAME: &str = "RustStackTPC";

/// hyper service of the TPC gateway.
pub struct TpcHttpService<H: FallbackHandler> {
    filter: Arc<TpcFilter>,
    fallback: Arc<H>,
}

impl<H: FallbackHandler> TpcHttpService<H> {
    /// Create the service.
    #[must_use]
    pub fn new(filter: TpcFilter, fallback: H) -> Self {
        Self {
            filter: Arc::new(filter),
            fallback: Arc::new(fallback),
        }
    }
}

impl<H: FallbackHandler> std::fmt::Debug for TpcHttpService<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TpcHttpService")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<H: FallbackHandler> Clone for TpcHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
            fallback: Arc::clone(&self.fallback),
        }
    }
}

impl<H: FallbackHandler> Service<http::Request<Incoming>> for TpcHttpService<H> {
    type Response = http::Response<TpcResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let filter = Arc::clone(&self.filter);
        let fallback = Arc::clone(&self.fallback);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();

            let (parts, body) = req.into_parts();
            let response = match route(&filter, &parts, &request_id).await {
                Some(response) => response,
                None => {
                    fallback
                        .handle(http::Request::from_parts(parts, body.boxed()))
                        .await
                }
            };

            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Serve built-in endpoints and third-party copies; `None` means the request
/// belongs to the continuation.
async fn route(
    filter: &TpcFilter,
    parts: &http::request::Parts,
    request_id: &str,
) -> Option<http::Response<TpcResponseBody>> {
    debug!(method = %parts.method, uri = %parts.uri, request_id, "processing request");

    if is_health_check(&parts.method, parts.uri.path()) {
        return Some(health_check_response());
    }
    if is_metrics_endpoint(&parts.method, parts.uri.path()) {
        return Some(match filter.metrics().render_prometheus() {
            Ok(text) => metrics_response(&text),
            Err(e) => {
                warn!(error = %e, "failed to encode metrics");
                metrics_error_response()
            }
        });
    }

    match filter.process(parts, request_id).await {
        Decision::Respond(response) => Some(response),
        Decision::Passthrough => None,
    }
}

fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

fn health_check_response() -> http::Response<TpcResponseBody> {
    let mut response = http::Response::new(TpcResponseBody::from_string(
        r#"{"status":"running","service":"tpc"}"#,
    ));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn is_metrics_endpoint(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && path == "/metrics"
}

fn metrics_response(text: &str) -> http::Response<TpcResponseBody> {
    let mut response = http::Response::new(TpcResponseBody::from_string(text));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    response
}

fn metrics_error_response() -> http::Response<TpcResponseBody> {
    let mut response = http::Response::new(TpcResponseBody::empty());
    *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn add_common_headers(
    mut response: http::Response<TpcResponseBody>,
    request_id: &str,
) -> http::Response<TpcResponseBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(http::header::SERVER, HeaderValue::from_static(SERVER_NAME));
    response
}
