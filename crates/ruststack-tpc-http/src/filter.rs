//! Third-party-copy request interceptor.
//!
//! [`TpcFilter::process`] looks at every inbound request once:
//!
//! ```text
//! NEW -> PASSTHROUGH
//! NEW -> VALIDATING -> REJECTED
//!                   -> VALID -> EXECUTING -> SUCCESS | FAILURE(kind)
//! ```
//!
//! Only `COPY` requests on a storage area path whose `Source` or `Destination`
//! names a remote endpoint are intercepted. All other requests are returned as
//! [`Decision::Passthrough`] for the continuation to serve.

use std::sync::Arc;

use http::request::Parts;
use percent_encoding::percent_decode_str;
use ruststack_tpc_client::TransferClient;
use ruststack_tpc_core::{CorrelationContext, PathResolver, TpcConfig, TransferMetrics};
use tracing::{Instrument, debug, info, warn};

use crate::body::TpcResponseBody;
use crate::headers::{COPY_METHOD, DESTINATION_HEADER, SOURCE_HEADER, is_remote_uri};
use crate::response::{created_response, error_to_response};
use crate::validator::Validator;

/// What to do with an inbound request.
#[derive(Debug)]
pub enum Decision {
    /// Not a third-party copy; invoke the continuation unchanged.
    Passthrough,
    /// The copy was handled; write this response and stop.
    Respond(http::Response<TpcResponseBody>),
}

/// Intercepts and executes third-party copies.
#[derive(Debug, Clone)]
pub struct TpcFilter {
    resolver: Arc<dyn PathResolver>,
    validator: Validator,
    client: Arc<dyn TransferClient>,
    metrics: Arc<TransferMetrics>,
}

impl TpcFilter {
    /// Create the filter.
    #[must_use]
    pub fn new(
        config: &TpcConfig,
        resolver: Arc<dyn PathResolver>,
        client: Arc<dyn TransferClient>,
        metrics: Arc<TransferMetrics>,
    ) -> Self {
        Self {
            validator: Validator::new(config, Arc::clone(&resolver)),
            resolver,
            client,
            metrics,
        }
    }

    /// Transfer timers shared with the metrics endpoint.
    #[must_use]
    pub fn metrics(&self) -> &Arc<TransferMetrics> {
        &self.metrics
    }

    /// Whether the request is a third-party copy: `COPY` with a `Source` or
    /// `Destination` header naming a remote URI.
    #[must_use]
    pub fn is_tpc(parts: &Parts) -> bool {
        parts.method.as_str() == COPY_METHOD
            && [SOURCE_HEADER, DESTINATION_HEADER].iter().any(|name| {
                parts
                    .headers
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(is_remote_uri)
            })
    }

    /// Run one request through the interceptor.
    pub async fn process(&self, parts: &Parts, request_id: &str) -> Decision {
        if !Self::is_tpc(parts) {
            return Decision::Passthrough;
        }

        let Ok(path) = percent_decode_str(parts.uri.path()).decode_utf8() else {
            debug!(uri = %parts.uri, request_id, "undecodable path, passing through");
            return Decision::Passthrough;
        };
        let Some(scoped) = self.resolver.scope(&path) else {
            debug!(%path, request_id, "path outside storage areas, passing through");
            return Decision::Passthrough;
        };

        let context = CorrelationContext::new(request_id, parts.method.as_str(), &path);
        let span = context.span().clone();

        let response = async {
            let request = match self.validator.validate(parts, &scoped) {
                Ok(request) => request,
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "rejected TPC request");
                    return error_to_response(&err);
                }
            };

            info!(
                direction = %request.direction(),
                local_path = request.local_path(),
                remote = %request.remote_uri(),
                "routed TPC request"
            );

            let outcome = self
                .metrics
                .timer(request.direction())
                .time(self.client.handle(&request, &context))
                .await;

            match outcome {
                Ok(summary) => created_response(&summary),
                Err(err) => error_to_response(&err),
            }
        }
        .instrument(span)
        .await;

        Decision::Respond(response)
    }
}
