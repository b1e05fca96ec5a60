//! Outbound transfer client for the RustStack TPC gateway.
//!
//! Executes the single outbound HTTP call implied by a validated
//! [`TransferRequest`](ruststack_tpc_core::TransferRequest):
//!
//! - **Pull**: `GET` the remote URI and stream the body into local storage,
//!   verifying the checksum advertised in the `Digest` response header.
//! - **Push**: `PUT` the local file to the remote URI.
//!
//! Every outbound response goes through the [`ResponseHandler`], which maps any
//! non-2xx status to a typed failure inside the request's correlation context.
//! Nothing is retried.

pub mod client;
pub mod handler;
mod staging;

pub use client::{HttpTransferClient, TransferClient, outbound_url};
pub use handler::ResponseHandler;
