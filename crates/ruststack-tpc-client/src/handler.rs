//! Outbound response status handling.

use http::StatusCode;
use hyper::ext::ReasonPhrase;
use ruststack_tpc_core::{CorrelationContext, TpcError};
use tracing::{debug, warn};

/// Checks the status of one outbound response.
///
/// The request's [`CorrelationContext`] is entered for the duration of
/// [`ResponseHandler::handle`] and left on return, whatever the result.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHandler<'a> {
    context: &'a CorrelationContext,
}

impl<'a> ResponseHandler<'a> {
    /// Create a handler bound to the request context.
    #[must_use]
    pub fn new(context: &'a CorrelationContext) -> Self {
        Self { context }
    }

    /// Accept any 2xx response; turn anything else into
    /// [`TpcError::OutboundResponse`].
    pub fn handle(&self, response: &reqwest::Response) -> Result<(), TpcError> {
        let _entered = self.context.enter();
        debug!(
            status = response.status().as_u16(),
            url = %response.url(),
            "received outbound response"
        );
        check_status(response.status(), stated_reason(response))
    }
}

/// Reason phrase sent by the remote, when it differs from the canonical one.
fn stated_reason(response: &reqwest::Response) -> Option<&str> {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
}

/// Map a raw status to success or [`TpcError::OutboundResponse`].
///
/// The remote's own reason phrase wins over the canonical one.
pub(crate) fn check_status(status: StatusCode, stated: Option<&str>) -> Result<(), TpcError> {
    if status.is_success() {
        return Ok(());
    }
    let reason = stated
        .or_else(|| status.canonical_reason())
        .unwrap_or("Unknown status");
    warn!(status = status.as_u16(), reason, "remote endpoint rejected transfer");
    Err(TpcError::OutboundResponse {
        status: status.as_u16(),
        reason: reason.to_owned(),
    })
}
