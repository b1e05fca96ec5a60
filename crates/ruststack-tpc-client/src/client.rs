//! Pull and push transfer execution.
//!
//! [`TransferClient`] is the seam between the HTTP interceptor and the outbound
//! call. [`HttpTransferClient`] implements it with `reqwest`, selecting the pull
//! or push path from the request's direction.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_LENGTH;
use ruststack_tpc_core::checksums::{DigestAlgorithm, StreamingDigest, WANT_DIGEST_HEADER, select_digest};
use ruststack_tpc_core::{
    CorrelationContext, PathResolver, TpcConfig, TpcError, TransferDirection, TransferHeaders,
    TransferOutcome, TransferRequest, TransferSummary,
};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{Instrument, debug, info, warn};
use url::Url;

use crate::handler::ResponseHandler;
use crate::staging::StagingFile;

/// Executes one third-party transfer.
#[async_trait]
pub trait TransferClient: Send + Sync + fmt::Debug + 'static {
    /// Perform the single outbound call described by `request`.
    async fn handle(
        &self,
        request: &TransferRequest,
        context: &CorrelationContext,
    ) -> TransferOutcome;
}

/// `reqwest`-backed transfer client.
#[derive(Debug, Clone)]
pub struct HttpTransferClient {
    http: reqwest::Client,
    resolver: Arc<dyn PathResolver>,
    digest_algorithm: DigestAlgorithm,
}

impl HttpTransferClient {
    /// Build a client with timeouts and redirect policy from `config`.
    pub fn new(config: &TpcConfig, resolver: Arc<dyn PathResolver>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("ruststack-tpc/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.tpc_connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.tpc_max_redirects));
        if config.tpc_read_timeout_secs > 0 {
            builder = builder.read_timeout(Duration::from_secs(config.tpc_read_timeout_secs));
        }

        Ok(Self::with_http_client(
            builder.build()?,
            resolver,
            config.tpc_digest_algorithm,
        ))
    }

    /// Wrap an already configured `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(
        http: reqwest::Client,
        resolver: Arc<dyn PathResolver>,
        digest_algorithm: DigestAlgorithm,
    ) -> Self {
        Self {
            http,
            resolver,
            digest_algorithm,
        }
    }

    fn local_file(&self, request: &TransferRequest) -> Result<PathBuf, TpcError> {
        self.resolver
            .resolve_path(request.local_path())
            .ok_or_else(|| {
                TpcError::transfer(format!("Cannot resolve local path: {}", request.local_path()))
            })
    }

    async fn pull(&self, request: &TransferRequest, context: &CorrelationContext) -> TransferOutcome {
        let target = self.local_file(request)?;
        let url = outbound_url(request.remote_uri())?;

        let mut builder = forward_headers(self.http.get(url), request.transfer_headers());
        if request.verify_checksum() && !request.transfer_headers().contains(WANT_DIGEST_HEADER) {
            builder = builder.header(WANT_DIGEST_HEADER, self.digest_algorithm.as_str());
        }

        let mut response = builder.send().await.map_err(outbound_error)?;
        ResponseHandler::new(context).handle(&response)?;

        let expected = if request.verify_checksum() {
            let digest = select_digest(response.headers(), self.digest_algorithm).ok_or_else(|| {
                TpcError::checksum(format!(
                    "Checksum verification error: remote endpoint did not provide a supported \
                     digest (requested {})",
                    self.digest_algorithm
                ))
            })?;
            Some(digest)
        } else {
            None
        };

        let staging = StagingFile::for_target(&target)?;
        let mut file = tokio::fs::File::create(staging.path())
            .await
            .map_err(|e| local_error(request.local_path(), &e))?;
        let mut hasher = expected.as_ref().map(|d| StreamingDigest::new(d.algorithm));
        let mut bytes: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(outbound_error)? {
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| local_error(request.local_path(), &e))?;
            bytes += chunk.len() as u64;
        }
        file.sync_all()
            .await
            .map_err(|e| local_error(request.local_path(), &e))?;
        drop(file);

        let mut checksum = None;
        if let (Some(expected), Some(hasher)) = (expected, hasher) {
            let algorithm = hasher.algorithm();
            let computed = hasher.finish();
            if computed != expected.value {
                warn!(
                    %expected,
                    computed = %algorithm.encode(&computed),
                    "checksum mismatch, discarding pulled data"
                );
                return Err(TpcError::checksum(format!(
                    "Checksum verification error: expected {expected}, computed {algorithm}={}",
                    algorithm.encode(&computed)
                )));
            }
            checksum = Some(expected.to_string());
        }

        staging.commit(&target, request.overwrite()).await?;

        Ok(TransferSummary {
            direction: TransferDirection::Pull,
            bytes,
            checksum,
        })
    }

    async fn push(&self, request: &TransferRequest, context: &CorrelationContext) -> TransferOutcome {
        let source = self.local_file(request)?;
        let url = outbound_url(request.remote_uri())?;

        let file = tokio::fs::File::open(&source)
            .await
            .map_err(|e| local_error(request.local_path(), &e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| local_error(request.local_path(), &e))?;
        if !metadata.is_file() {
            return Err(TpcError::transfer(format!(
                "Not a regular file: {}",
                request.local_path()
            )));
        }
        let bytes = metadata.len();

        let response = forward_headers(self.http.put(url), request.transfer_headers())
            .header(CONTENT_LENGTH, bytes)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(outbound_error)?;
        ResponseHandler::new(context).handle(&response)?;

        Ok(TransferSummary {
            direction: TransferDirection::Push,
            bytes,
            checksum: None,
        })
    }
}

#[async_trait]
impl TransferClient for HttpTransferClient {
    async fn handle(
        &self,
        request: &TransferRequest,
        context: &CorrelationContext,
    ) -> TransferOutcome {
        let fut = async {
            info!(
                direction = %request.direction(),
                local_path = request.local_path(),
                remote = %request.remote_uri(),
                "starting transfer"
            );
            let outcome = match request.direction() {
                TransferDirection::Pull => self.pull(request, context).await,
                TransferDirection::Push => self.push(request, context).await,
            };
            match &outcome {
                Ok(summary) => info!(bytes = summary.bytes, checksum = ?summary.checksum, "transfer completed"),
                Err(err) => warn!(kind = err.kind(), error = %err, "transfer failed"),
            }
            outcome
        };
        fut.instrument(context.span().clone()).await
    }
}

/// Map a transfer URI to the URL actually requested: `dav` becomes `http`
/// and `davs` becomes `https`; other schemes are used as given.
///
/// ```
/// use ruststack_tpc_client::outbound_url;
///
/// let uri = url::Url::parse("davs://example.org:8443/sa/file").unwrap();
/// assert_eq!(outbound_url(&uri).unwrap().as_str(), "https://example.org:8443/sa/file");
/// ```
pub fn outbound_url(uri: &Url) -> Result<Url, TpcError> {
    let scheme = match uri.scheme() {
        "dav" => "http",
        "davs" => "https",
        _ => return Ok(uri.clone()),
    };
    let rest = &uri.as_str()[uri.scheme().len()..];
    Url::parse(&format!("{scheme}{rest}"))
        .map_err(|e| TpcError::transfer(format!("Invalid transfer URI {uri}: {e}")))
}

fn forward_headers(
    mut builder: reqwest::RequestBuilder,
    headers: &TransferHeaders,
) -> reqwest::RequestBuilder {
    for (name, value) in headers.iter() {
        debug!(header = %name, "forwarding transfer header");
        builder = builder.header(name.clone(), value.clone());
    }
    builder
}

fn outbound_error(err: reqwest::Error) -> TpcError {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    TpcError::OutboundProtocol(message)
}

fn local_error(path: &str, err: &std::io::Error) -> TpcError {
    TpcError::transfer(format!("Local I/O error on {path}: {err}"))
}
