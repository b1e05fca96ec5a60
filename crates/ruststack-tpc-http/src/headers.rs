//! Third-party-copy negotiation headers.
//!
//! The recognized request headers form a fixed table, [`NEGOTIATION_HEADERS`].
//! Each entry pairs a header name with a typed parser that turns the raw value
//! into a [`Setting`] or rejects it with a [`TpcError::Validation`] naming the
//! header and the offending value. The validator folds over the table in
//! order, so the table order is the error precedence among header checks.

use ruststack_tpc_core::{TpcError, TransferDirection};
use url::Url;

/// Remote source of a pull.
pub const SOURCE_HEADER: &str = "Source";

/// Remote destination of a push.
pub const DESTINATION_HEADER: &str = "Destination";

/// `T` / `F`, whether an existing local target may be replaced.
pub const OVERWRITE_HEADER: &str = "Overwrite";

/// `true` / `false`, whether pulled bytes are checksum-verified.
pub const REQUIRE_CHECKSUM_HEADER: &str = "RequireChecksumVerification";

/// Prefix of headers forwarded on the outbound call.
pub const TRANSFER_HEADER_PREFIX: &str = "TransferHeader";

/// `COPY`, the only method that can carry a third-party copy.
pub const COPY_METHOD: &str = "COPY";

/// A typed value extracted from one negotiation header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// `Source` or `Destination`.
    Remote(TransferDirection, Url),
    /// `Overwrite`.
    Overwrite(bool),
    /// `RequireChecksumVerification`.
    VerifyChecksum(bool),
}

/// Inputs a header parser may depend on.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Lowercase URI schemes accepted for transfer URIs.
    pub supported_schemes: &'a [String],
}

type Parser = fn(&str, &ParseContext<'_>) -> Result<Setting, TpcError>;

/// One recognized header and its parser.
#[derive(Debug, Clone, Copy)]
pub struct NegotiationHeader {
    /// Canonical header name.
    pub name: &'static str,
    parse: Parser,
}

impl NegotiationHeader {
    /// Parse a raw value of this header.
    pub fn parse(&self, value: &str, ctx: &ParseContext<'_>) -> Result<Setting, TpcError> {
        (self.parse)(value, ctx)
    }
}

/// Recognized negotiation headers, in validation order.
pub const NEGOTIATION_HEADERS: [NegotiationHeader; 4] = [
    NegotiationHeader {
        name: SOURCE_HEADER,
        parse: parse_source,
    },
    NegotiationHeader {
        name: DESTINATION_HEADER,
        parse: parse_destination,
    },
    NegotiationHeader {
        name: OVERWRITE_HEADER,
        parse: parse_overwrite,
    },
    NegotiationHeader {
        name: REQUIRE_CHECKSUM_HEADER,
        parse: parse_require_checksum,
    },
];

fn parse_source(value: &str, ctx: &ParseContext<'_>) -> Result<Setting, TpcError> {
    let url = parse_transfer_uri(value, ctx)
        .ok_or_else(|| TpcError::validation(format!("Invalid {SOURCE_HEADER} header: {value}")))?;
    Ok(Setting::Remote(TransferDirection::Pull, url))
}

fn parse_destination(value: &str, ctx: &ParseContext<'_>) -> Result<Setting, TpcError> {
    let url = parse_transfer_uri(value, ctx).ok_or_else(|| {
        TpcError::validation(format!("Invalid {DESTINATION_HEADER} header: {value}"))
    })?;
    Ok(Setting::Remote(TransferDirection::Push, url))
}

fn parse_overwrite(value: &str, _ctx: &ParseContext<'_>) -> Result<Setting, TpcError> {
    if value.eq_ignore_ascii_case("T") {
        Ok(Setting::Overwrite(true))
    } else if value.eq_ignore_ascii_case("F") {
        Ok(Setting::Overwrite(false))
    } else {
        Err(TpcError::validation(format!(
            "Invalid {OVERWRITE_HEADER} header value: {value}"
        )))
    }
}

fn parse_require_checksum(value: &str, _ctx: &ParseContext<'_>) -> Result<Setting, TpcError> {
    match value {
        "true" => Ok(Setting::VerifyChecksum(true)),
        "false" => Ok(Setting::VerifyChecksum(false)),
        _ => Err(TpcError::validation(format!(
            "Invalid {REQUIRE_CHECKSUM_HEADER} header value: {value}"
        ))),
    }
}

/// A transfer URI must parse, use an allowed scheme, and carry a path.
fn parse_transfer_uri(value: &str, ctx: &ParseContext<'_>) -> Option<Url> {
    let url = match Url::parse(value) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(uri = value, error = %e, "error parsing transfer URI");
            return None;
        }
    };
    let supported = ctx
        .supported_schemes
        .iter()
        .any(|s| s.as_str() == url.scheme());
    if !supported || url.cannot_be_a_base() || url.path().is_empty() {
        tracing::warn!(uri = %url, "unsupported transfer URI");
        return None;
    }
    Some(url)
}

/// Whether a `Source` / `Destination` value names a remote endpoint rather than
/// a local path: an absolute URL with a network host.
#[must_use]
pub fn is_remote_uri(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| url.has_host())
}

/// The forwarded name carried by a transfer header, if `name` is one.
///
/// Returns `Some("")` for a transfer header with a blank suffix.
#[must_use]
pub fn transfer_header_suffix(name: &str) -> Option<&str> {
    let prefix_len = TRANSFER_HEADER_PREFIX.len();
    if name.len() < prefix_len || !name.is_char_boundary(prefix_len) {
        return None;
    }
    let (prefix, rest) = name.split_at(prefix_len);
    prefix
        .eq_ignore_ascii_case(TRANSFER_HEADER_PREFIX)
        .then(|| rest.trim())
}
