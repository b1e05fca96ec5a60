//! HTTP layer of the RustStack third-party-copy gateway.
//!
//! - **Headers** ([`headers`]): the negotiation header table and transfer
//!   header prefix handling.
//! - **Validator** ([`validator`]): ordered checks turning a `COPY` request into
//!   a [`TransferRequest`](ruststack_tpc_core::TransferRequest).
//! - **Filter** ([`filter`]): the TPC interceptor that validates, runs the
//!   transfer client under the metrics timer, and writes the final status.
//! - **Dispatch** ([`dispatch`]): the continuation for non-TPC requests.
//! - **Service** ([`service`]): the hyper `Service` tying it together.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> TpcHttpService (hyper Service)
//!     -> Health check / metrics interception
//!     -> TpcFilter
//!          not TPC -> FallbackHandler
//!          TPC     -> Validator -> TransferClient (timed) -> 201 / 4xx
//!     -> Common response headers (X-Request-Id, Server)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ruststack_tpc_client::HttpTransferClient;
//! use ruststack_tpc_core::{StorageAreas, TpcConfig, TransferMetrics};
//! use ruststack_tpc_http::{NotImplementedHandler, TpcFilter, TpcHttpService};
//!
//! let config = TpcConfig::from_env().unwrap();
//! let areas = Arc::new(StorageAreas::new(&config.storage_areas).unwrap());
//! let client = HttpTransferClient::new(&config, areas.clone()).unwrap();
//! let filter = TpcFilter::new(&config, areas, Arc::new(client), Arc::new(TransferMetrics::new().unwrap()));
//! let service = TpcHttpService::new(filter, NotImplementedHandler);
//! // Use `service` with hyper server.
//! ```

pub mod body;
pub mod dispatch;
pub mod filter;
pub mod headers;
pub mod response;
pub mod service;
pub mod validator;

pub use body::TpcResponseBody;
pub use dispatch::{FallbackHandler, NotImplementedHandler, RequestBody};
pub use filter::{Decision, TpcFilter};
pub use service::TpcHttpService;
pub use validator::Validator;
