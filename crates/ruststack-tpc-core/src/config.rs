//! TPC gateway configuration.
//!
//! Provides [`TpcConfig`] for configuring the RustStack TPC gateway. Values are
//! loaded from environment variables in the same manner as the other RustStack
//! services.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::checksums::DigestAlgorithm;
use crate::error::ConfigError;

/// One `name=/root/dir` storage area entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAreaConfig {
    /// Storage area name; also its mount prefix (`/<name>`).
    pub name: String,
    /// Absolute filesystem root backing the area.
    pub root: String,
}

impl StorageAreaConfig {
    /// Create a storage area entry.
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }
}

/// TPC gateway configuration.
///
/// # Examples
///
/// ```
/// use ruststack_tpc_core::config::TpcConfig;
///
/// let config = TpcConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8085");
/// assert!(config.tpc_verify_checksum);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct TpcConfig {
    /// Bind address for the gateway (e.g. `"0.0.0.0:8085"`).
    #[builder(default = String::from("0.0.0.0:8085"))]
    pub gateway_listen: String,

    /// Maximum number of inbound connections served at once.
    #[builder(default = 256)]
    pub gateway_max_connections: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Storage areas exposed over HTTP.
    #[builder(default)]
    pub storage_areas: Vec<StorageAreaConfig>,

    /// URI schemes accepted in `Source` / `Destination`.
    #[builder(default = default_schemes())]
    pub tpc_supported_schemes: Vec<String>,

    /// Checksum verification when `RequireChecksumVerification` is absent.
    #[builder(default = true)]
    pub tpc_verify_checksum: bool,

    /// Algorithm requested with `Want-Digest` on pulls.
    #[builder(default = DigestAlgorithm::Adler32)]
    pub tpc_digest_algorithm: DigestAlgorithm,

    /// Outbound connect timeout in seconds.
    #[builder(default = 30)]
    pub tpc_connect_timeout_secs: u64,

    /// Outbound read timeout in seconds (0 disables it).
    #[builder(default = 300)]
    pub tpc_read_timeout_secs: u64,

    /// Redirects followed on outbound calls.
    #[builder(default = 10)]
    pub tpc_max_redirects: usize,
}

impl Default for TpcConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8085"),
            gateway_max_connections: 256,
            log_level: String::from("info"),
            storage_areas: Vec::new(),
            tpc_supported_schemes: default_schemes(),
            tpc_verify_checksum: true,
            tpc_digest_algorithm: DigestAlgorithm::Adler32,
            tpc_connect_timeout_secs: 30,
            tpc_read_timeout_secs: 300,
            tpc_max_redirects: 10,
        }
    }
}

impl TpcConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables, falling back to defaults.
    /// Unparsable numbers and booleans are ignored; an unknown
    /// `TPC_DIGEST_ALGORITHM` is an error, since it would silently change which
    /// checksum pulls are verified with.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8085` |
    /// | `GATEWAY_MAX_CONNECTIONS` | `256` |
    /// | `LOG_LEVEL` | `info` |
    /// | `STORAGE_AREAS` | *(none)*, e.g. `sa1=/data/sa1,sa2=/data/sa2` |
    /// | `TPC_SUPPORTED_SCHEMES` | `http,https,dav,davs` |
    /// | `TPC_VERIFY_CHECKSUM` | `true` |
    /// | `TPC_DIGEST_ALGORITHM` | `adler32` |
    /// | `TPC_CONNECT_TIMEOUT_SECS` | `30` |
    /// | `TPC_READ_TIMEOUT_SECS` | `300` |
    /// | `TPC_MAX_REDIRECTS` | `10` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_MAX_CONNECTIONS") {
            if let Ok(n) = v.parse::<usize>() {
                config.gateway_max_connections = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("STORAGE_AREAS") {
            config.storage_areas = parse_storage_areas(&v);
        }
        if let Ok(v) = std::env::var("TPC_SUPPORTED_SCHEMES") {
            config.tpc_supported_schemes = parse_list(&v);
        }
        if let Ok(v) = std::env::var("TPC_VERIFY_CHECKSUM") {
            config.tpc_verify_checksum = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("TPC_DIGEST_ALGORITHM") {
            config.tpc_digest_algorithm = parse_digest_algorithm(&v)?;
        }
        if let Ok(v) = std::env::var("TPC_CONNECT_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.tpc_connect_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("TPC_READ_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.tpc_read_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("TPC_MAX_REDIRECTS") {
            if let Ok(n) = v.parse::<usize>() {
                config.tpc_max_redirects = n;
            }
        }

        Ok(config)
    }
}

fn parse_digest_algorithm(value: &str) -> Result<DigestAlgorithm, ConfigError> {
    value.parse()
}

fn default_schemes() -> Vec<String> {
    ["http", "https", "dav", "davs"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Parse `name=/root,name2=/root2`. Entries without `=` keep an empty root so
/// that storage area validation reports them.
fn parse_storage_areas(value: &str) -> Vec<StorageAreaConfig> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, root)) => StorageAreaConfig::new(name.trim(), root.trim()),
            None => StorageAreaConfig::new(entry, ""),
        })
        .collect()
}

/// Parse a comma-separated list, lowercasing and dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
