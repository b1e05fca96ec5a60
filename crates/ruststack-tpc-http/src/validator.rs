//! Validation of third-party-copy requests.
//!
//! [`Validator::validate`] turns the parts of an inbound `COPY` request into a
//! [`TransferRequest`], or rejects it with the first failing check. Checks run
//! in a fixed order, which decides the single error reported when several
//! apply:
//!
//! 1. local path shape (`400`)
//! 2. existing target with `Overwrite: F` (`412`)
//! 3. missing parent (`409`)
//! 4. `Source` and `Destination` both present (`400`)
//! 5. [`NEGOTIATION_HEADERS`] in table order (`400`)
//!
//! The only I/O is [`PathResolver::path_exists`]; for the same headers, path and
//! namespace state the result is always the same.

use std::sync::Arc;

use http::HeaderName;
use http::request::Parts;
use ruststack_tpc_core::storage::logical_parent;
use ruststack_tpc_core::{
    PathResolver, ScopedPath, TpcConfig, TpcError, TransferHeaders, TransferRequest,
};
use tracing::{debug, warn};

use crate::headers::{
    DESTINATION_HEADER, NEGOTIATION_HEADERS, OVERWRITE_HEADER, ParseContext, SOURCE_HEADER,
    Setting, transfer_header_suffix,
};

/// Validates TPC requests against the storage namespace.
#[derive(Debug, Clone)]
pub struct Validator {
    resolver: Arc<dyn PathResolver>,
    supported_schemes: Vec<String>,
    default_verify_checksum: bool,
}

impl Validator {
    /// Create a validator.
    #[must_use]
    pub fn new(config: &TpcConfig, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            resolver,
            supported_schemes: config
                .tpc_supported_schemes
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            default_verify_checksum: config.tpc_verify_checksum,
        }
    }

    /// Validate a request already scoped to a storage area.
    pub fn validate(&self, parts: &Parts, scoped: &ScopedPath) -> Result<TransferRequest, TpcError> {
        let local_path = self.check_local_path(parts, scoped)?;

        if parts.headers.contains_key(SOURCE_HEADER)
            && parts.headers.contains_key(DESTINATION_HEADER)
        {
            return Err(TpcError::validation(
                "Source and Destination headers are both present!",
            ));
        }

        let ctx = ParseContext {
            supported_schemes: &self.supported_schemes,
        };
        let mut remote = None;
        let mut overwrite = true;
        let mut verify_checksum = self.default_verify_checksum;

        for header in &NEGOTIATION_HEADERS {
            let Some(raw) = parts.headers.get(header.name) else {
                continue;
            };
            let value = String::from_utf8_lossy(raw.as_bytes());
            match header.parse(&value, &ctx)? {
                Setting::Remote(direction, url) => remote = Some((direction, url)),
                Setting::Overwrite(v) => overwrite = v,
                Setting::VerifyChecksum(v) => verify_checksum = v,
            }
        }

        let (direction, remote_uri) = remote.ok_or_else(|| {
            TpcError::validation("Missing Source or Destination header")
        })?;

        let request = TransferRequest::new(direction, local_path, remote_uri)?
            .with_overwrite(overwrite)
            .with_verify_checksum(verify_checksum)
            .with_transfer_headers(transfer_headers(parts));
        debug!(?request, "validated transfer request");
        Ok(request)
    }

    fn check_local_path(&self, parts: &Parts, scoped: &ScopedPath) -> Result<String, TpcError> {
        let path_info = match scoped.path_info.as_deref() {
            Some(info) if !info.trim().is_empty() => info,
            _ => return Err(TpcError::validation("Null or empty local path information!")),
        };
        if !path_info.starts_with('/')
            || path_info.split('/').any(|s| s == "." || s == "..")
        {
            return Err(TpcError::validation(format!(
                "Invalid local path: {path_info}"
            )));
        }

        let local_path = join_local_path(&scoped.mount_point, path_info);

        if !overwrite_requested(parts) && self.resolver.path_exists(&local_path) {
            return Err(TpcError::Precondition);
        }

        let parent_exists =
            logical_parent(&local_path).is_some_and(|parent| self.resolver.path_exists(parent));
        if !parent_exists {
            return Err(TpcError::Conflict);
        }

        Ok(local_path)
    }
}

/// Lenient overwrite read used by the existence check: anything but `T` is
/// false. Malformed values are rejected later by the header table.
fn overwrite_requested(parts: &Parts) -> bool {
    parts
        .headers
        .get(OVERWRITE_HEADER)
        .is_none_or(|v| v.as_bytes().eq_ignore_ascii_case(b"T"))
}

/// Join the mount prefix and path info, collapsing empty segments.
fn join_local_path(mount_point: &str, path_info: &str) -> String {
    let mut joined = String::with_capacity(mount_point.len() + path_info.len());
    for segment in mount_point
        .split('/')
        .chain(path_info.split('/'))
        .filter(|s| !s.is_empty())
    {
        joined.push('/');
        joined.push_str(segment);
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

/// Collect `TransferHeader<Name>` headers as `(Name, value)`.
///
/// `HeaderMap` groups values by name, ordered by each name's first arrival, so
/// that is the order kept here: values of one name stay in arrival order, but
/// interleaving across names (`X:a, Y:b, X:c`) comes out grouped
/// (`X:a, X:c, Y:b`). The raw header order is gone once hyper has parsed the
/// request.
fn transfer_headers(parts: &Parts) -> TransferHeaders {
    let mut headers = TransferHeaders::new();
    for (name, value) in &parts.headers {
        let Some(suffix) = transfer_header_suffix(name.as_str()) else {
            continue;
        };
        if suffix.is_empty() {
            warn!(header = %name, "ignoring invalid transfer header");
            continue;
        }
        match HeaderName::from_bytes(suffix.as_bytes()) {
            Ok(forwarded) => headers.push(forwarded, value.clone()),
            Err(e) => warn!(header = %name, error = %e, "ignoring invalid transfer header"),
        }
    }
    headers
}
