//! Core types for the RustStack third-party-copy (TPC) gateway.
//!
//! This crate holds everything the HTTP layer and the outbound transfer client
//! share: the immutable description of one transfer, the closed error taxonomy,
//! storage area resolution, checksum negotiation, per-request correlation
//! context, transfer metrics, and configuration.
//!
//! # Architecture
//!
//! ```text
//! COPY request
//!   -> ruststack-tpc-http (TpcFilter + validator)
//!        builds TransferRequest        (transfer)
//!        checks PathResolver           (storage)
//!   -> ruststack-tpc-client (pull / push)
//!        CorrelationContext            (context)
//!        Digest / Want-Digest          (checksums)
//!   <- TransferOutcome = Result<TransferSummary, TpcError>   (error)
//! ```

pub mod checksums;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod transfer;

pub use config::{StorageAreaConfig, TpcConfig};
pub use context::CorrelationContext;
pub use error::{ConfigError, TpcError};
pub use metrics::TransferMetrics;
pub use storage::{PathResolver, ScopedPath, StorageAreas};
pub use transfer::{
    TransferDirection, TransferHeaders, TransferOutcome, TransferRequest, TransferSummary,
};
