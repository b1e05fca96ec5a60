//! Per-request diagnostic correlation.
//!
//! A [`CorrelationContext`] is created once per inbound TPC request and passed
//! explicitly into the transfer client and the response handler. It wraps a
//! [`tracing::Span`] carrying the request id, so log lines emitted while the
//! outbound call runs, on whichever worker thread, are attributed to the
//! originating request.

use tracing::Span;
use tracing::span::Entered;

/// Correlation context of one inbound request.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    request_id: String,
    span: Span,
}

impl CorrelationContext {
    /// Create the context for a request.
    #[must_use]
    pub fn new(request_id: impl Into<String>, method: &str, path: &str) -> Self {
        let request_id = request_id.into();
        let span = tracing::info_span!("tpc", request_id = %request_id, method, path);
        Self { request_id, span }
    }

    /// Identifier of the inbound request.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The span to instrument asynchronous work with.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the context for the current scope.
    ///
    /// The context is left when the returned guard is dropped, on every exit
    /// path of the enclosing scope.
    #[must_use = "the context is left as soon as the guard is dropped"]
    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }
}
