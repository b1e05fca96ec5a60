//! Checksum negotiation for pulled data.
//!
//! Pulls ask the remote endpoint for an instance digest with `Want-Digest`
//! and compare the `Digest` it returns (RFC 3230) with a checksum computed
//! while the body is streamed to disk.
//!
//! Supported algorithms and their wire encodings:
//!
//! | Token | Encoding |
//! |-------|----------|
//! | `adler32` | 8 hex digits |
//! | `md5` | base64 |
//! | `sha-256` | base64 |

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use digest::Digest;
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// `Digest` response header name.
pub const DIGEST_HEADER: &str = "digest";

/// `Want-Digest` request header name.
pub const WANT_DIGEST_HEADER: &str = "want-digest";

// ---------------------------------------------------------------------------
// DigestAlgorithm
// ---------------------------------------------------------------------------

/// Instance digest algorithms understood by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// Adler-32, the default for grid storage endpoints.
    #[serde(rename = "adler32")]
    Adler32,
    /// MD5.
    #[serde(rename = "md5")]
    Md5,
    /// SHA-256.
    #[serde(rename = "sha-256")]
    Sha256,
}

impl DigestAlgorithm {
    /// Token used in `Want-Digest` and `Digest` headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adler32 => "adler32",
            Self::Md5 => "md5",
            Self::Sha256 => "sha-256",
        }
    }

    /// Encode a raw digest the way it appears in a `Digest` header.
    #[must_use]
    pub fn encode(&self, raw: &[u8]) -> String {
        match self {
            Self::Adler32 => hex::encode(raw),
            Self::Md5 | Self::Sha256 => BASE64_STANDARD.encode(raw),
        }
    }

    /// Decode a `Digest` header value into raw bytes.
    fn decode(&self, encoded: &str) -> Option<Vec<u8>> {
        match self {
            Self::Adler32 => u32::from_str_radix(encoded, 16)
                .ok()
                .map(|v| v.to_be_bytes().to_vec()),
            Self::Md5 | Self::Sha256 => BASE64_STANDARD.decode(encoded).ok(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adler32" => Ok(Self::Adler32),
            "md5" => Ok(Self::Md5),
            "sha-256" | "sha256" => Ok(Self::Sha256),
            _ => Err(ConfigError::UnsupportedDigest(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote digests
// ---------------------------------------------------------------------------

/// A checksum advertised by the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDigest {
    /// Algorithm of the advertised checksum.
    pub algorithm: DigestAlgorithm,
    /// Raw digest bytes.
    pub value: Vec<u8>,
}

impl fmt::Display for RemoteDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.algorithm, self.algorithm.encode(&self.value))
    }
}

/// Parse every supported entry out of the `Digest` headers of a response.
///
/// Unknown algorithms and undecodable values are skipped.
#[must_use]
pub fn parse_digests(headers: &HeaderMap) -> Vec<RemoteDigest> {
    headers
        .get_all(DIGEST_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|entry| {
            let (token, encoded) = entry.trim().split_once('=')?;
            let algorithm = token.parse::<DigestAlgorithm>().ok()?;
            let value = algorithm.decode(encoded.trim())?;
            Some(RemoteDigest { algorithm, value })
        })
        .collect()
}

/// Pick the digest to verify against: `preferred` if advertised, otherwise
/// the first supported one.
#[must_use]
pub fn select_digest(headers: &HeaderMap, preferred: DigestAlgorithm) -> Option<RemoteDigest> {
    let mut digests = parse_digests(headers);
    let index = digests
        .iter()
        .position(|d| d.algorithm == preferred)
        .unwrap_or(0);
    (!digests.is_empty()).then(|| digests.swap_remove(index))
}

// ---------------------------------------------------------------------------
// StreamingDigest
// ---------------------------------------------------------------------------

/// Incremental hasher for one algorithm, fed chunk by chunk while a body is
/// written to disk.
///
/// # Examples
///
/// ```
/// use ruststack_tpc_core::checksums::{DigestAlgorithm, StreamingDigest};
///
/// let mut hasher = StreamingDigest::new(DigestAlgorithm::Adler32);
/// hasher.update(b"Wikipe");
/// hasher.update(b"dia");
/// assert_eq!(DigestAlgorithm::Adler32.encode(&hasher.finish()), "11e60398");
/// ```
#[derive(Debug)]
pub enum StreamingDigest {
    /// Adler-32 state.
    Adler32(adler2::Adler32),
    /// MD5 state.
    Md5(md5::Md5),
    /// SHA-256 state.
    Sha256(sha2::Sha256),
}

impl StreamingDigest {
    /// Create a hasher for `algorithm`.
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Adler32 => Self::Adler32(adler2::Adler32::new()),
            DigestAlgorithm::Md5 => Self::Md5(<md5::Md5 as Digest>::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(<sha2::Sha256 as Digest>::new()),
        }
    }

    /// Algorithm computed by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::Adler32(_) => DigestAlgorithm::Adler32,
            Self::Md5(_) => DigestAlgorithm::Md5,
            Self::Sha256(_) => DigestAlgorithm::Sha256,
        }
    }

    /// Feed more data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Adler32(h) => h.write_slice(data),
            Self::Md5(h) => Digest::update(h, data),
            Self::Sha256(h) => Digest::update(h, data),
        }
    }

    /// Finalize and return the raw digest bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        match self {
            Self::Adler32(h) => h.checksum().to_be_bytes().to_vec(),
            Self::Md5(h) => Digest::finalize(h).as_slice().to_vec(),
            Self::Sha256(h) => Digest::finalize(h).as_slice().to_vec(),
        }
    }
}
