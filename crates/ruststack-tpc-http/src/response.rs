//! Final responses of third-party copies.

use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use ruststack_tpc_core::{TpcError, TransferSummary};

use crate::body::TpcResponseBody;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// `201 Created` for a completed transfer.
#[must_use]
pub fn created_response(summary: &TransferSummary) -> http::Response<TpcResponseBody> {
    let mut builder = http::Response::builder()
        .status(StatusCode::CREATED)
        .header(CONTENT_LENGTH, 0);
    if let Some(checksum) = summary.checksum.as_deref() {
        builder = builder.header("Digest", checksum);
    }
    builder
        .body(TpcResponseBody::empty())
        .unwrap_or_else(|_| fallback(StatusCode::CREATED))
}

/// Map a failure to its status with the message as a plain-text body.
#[must_use]
pub fn error_to_response(err: &TpcError) -> http::Response<TpcResponseBody> {
    let status = err.status_code();
    http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .body(TpcResponseBody::from_string(err.to_string()))
        .unwrap_or_else(|_| fallback(status))
}

fn fallback(status: StatusCode) -> http::Response<TpcResponseBody> {
    let mut response = http::Response::new(TpcResponseBody::empty());
    *response.status_mut() = status;
    response
}
