//! Transfer value objects.
//!
//! A [`TransferRequest`] is the immutable, request-scoped description of one
//! third-party copy. It is only built once the inbound request has passed
//! validation, so an instance always carries an absolute local path and an
//! allowed remote URI.

use std::fmt;

use http::{HeaderName, HeaderValue};
use url::Url;

use crate::error::TpcError;

/// Direction of a third-party copy, relative to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Fetch from the remote endpoint into local storage (`Source` header).
    Pull,
    /// Send local content to the remote endpoint (`Destination` header).
    Push,
}

impl TransferDirection {
    /// Lowercase name used in logs and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered multimap of headers forwarded verbatim on the outbound call.
///
/// Names need not be unique; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferHeaders {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl TransferHeaders {
    /// Create an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any previous value for the same name.
    pub fn push(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.push((name, value));
    }

    /// Iterate over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    /// All values recorded for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Whether at least one value is recorded for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get_all(name).next().is_some()
    }

    /// Number of recorded pairs (duplicates counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no header is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for TransferHeaders {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Immutable description of one third-party copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    direction: TransferDirection,
    local_path: String,
    remote_uri: Url,
    overwrite: bool,
    verify_checksum: bool,
    transfer_headers: TransferHeaders,
}

impl TransferRequest {
    /// Create a transfer with `overwrite` and `verify_checksum` enabled and no
    /// transfer headers.
    ///
    /// # Errors
    ///
    /// Returns [`TpcError::Validation`] if `local_path` is not absolute.
    pub fn new(
        direction: TransferDirection,
        local_path: impl Into<String>,
        remote_uri: Url,
    ) -> Result<Self, TpcError> {
        let local_path = local_path.into();
        if !local_path.starts_with('/') {
            return Err(TpcError::validation(format!(
                "Invalid local path: {local_path}"
            )));
        }
        Ok(Self {
            direction,
            local_path,
            remote_uri,
            overwrite: true,
            verify_checksum: true,
            transfer_headers: TransferHeaders::new(),
        })
    }

    /// Set the overwrite flag.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the checksum verification flag.
    #[must_use]
    pub fn with_verify_checksum(mut self, verify_checksum: bool) -> Self {
        self.verify_checksum = verify_checksum;
        self
    }

    /// Replace the forwarded headers.
    #[must_use]
    pub fn with_transfer_headers(mut self, headers: TransferHeaders) -> Self {
        self.transfer_headers = headers;
        self
    }

    /// Transfer direction.
    #[must_use]
    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    /// Logical local path, e.g. `/sa1/dir/file`.
    #[must_use]
    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    /// Remote endpoint.
    #[must_use]
    pub fn remote_uri(&self) -> &Url {
        &self.remote_uri
    }

    /// Whether an existing local target may be replaced.
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Whether the pulled bytes must match the remote checksum.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        self.verify_checksum
    }

    /// Headers forwarded on the outbound call.
    #[must_use]
    pub fn transfer_headers(&self) -> &TransferHeaders {
        &self.transfer_headers
    }
}

/// What a successful transfer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    /// Direction of the completed transfer.
    pub direction: TransferDirection,
    /// Bytes moved over the wire.
    pub bytes: u64,
    /// Verified checksum as `algorithm=value`, when verification ran.
    pub checksum: Option<String>,
}

/// Result of executing one transfer.
pub type TransferOutcome = Result<TransferSummary, TpcError>;
