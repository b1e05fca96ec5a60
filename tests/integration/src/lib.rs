//! End-to-end tests for the RustStack TPC gateway.
//!
//! Each test starts two in-process servers on ephemeral ports:
//!
//! - a [`FakeRemote`], the third-party endpoint serving `GET` and accepting
//!   `PUT`, recording every request it sees;
//! - a [`Gateway`], the real `TpcHttpService` over a temporary storage area.
//!
//! Tests then drive the gateway with `reqwest` and check both sides.
//!
//! ```text
//! cargo test -p ruststack-tpc-integration
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ruststack_tpc_client::HttpTransferClient;
use ruststack_tpc_core::checksums::{DigestAlgorithm, StreamingDigest};
use ruststack_tpc_core::{StorageAreaConfig, StorageAreas, TpcConfig, TransferMetrics};
use ruststack_tpc_http::{NotImplementedHandler, TpcFilter, TpcHttpService};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// `algorithm=value` digest of `data`, as a remote would advertise it.
#[must_use]
pub fn digest_header(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    let mut digest = StreamingDigest::new(algorithm);
    digest.update(data);
    format!("{algorithm}={}", algorithm.encode(&digest.finish()))
}

/// One object served by the fake remote.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    /// Status to answer with.
    pub status: StatusCode,
    /// Response body.
    pub body: Bytes,
    /// `Digest` response header, if any.
    pub digest: Option<String>,
}

impl RemoteObject {
    /// A `200 OK` object advertising its own digest.
    #[must_use]
    pub fn with_digest(body: &'static [u8], algorithm: DigestAlgorithm) -> Self {
        Self {
            status: StatusCode::OK,
            body: Bytes::from_static(body),
            digest: Some(digest_header(algorithm, body)),
        }
    }

    /// A `200 OK` object without a `Digest` header.
    #[must_use]
    pub fn plain(body: &'static [u8]) -> Self {
        Self {
            status: StatusCode::OK,
            body: Bytes::from_static(body),
            digest: None,
        }
    }

    /// An error status with an empty body.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: Bytes::new(),
            digest: None,
        }
    }
}

/// A request the fake remote received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

#[derive(Debug, Default)]
struct RemoteState {
    objects: Mutex<HashMap<String, RemoteObject>>,
    put_status: Mutex<Option<StatusCode>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// In-process third-party endpoint.
#[derive(Debug, Clone)]
pub struct FakeRemote {
    addr: SocketAddr,
    state: Arc<RemoteState>,
}

impl FakeRemote {
    /// Start the remote on an ephemeral port.
    pub async fn start() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind remote");
        let addr = listener.local_addr().expect("remote addr");
        let state = Arc::new(RemoteState::default());

        let served = Arc::clone(&state);
        tokio::spawn(async move {
            let http = HttpConnBuilder::new(TokioExecutor::new());
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&served);
                let svc = service_fn(move |req| remote_handle(Arc::clone(&state), req));
                let conn = http.serve_connection(TokioIo::new(stream), svc).into_owned();
                tokio::spawn(conn);
            }
        });

        Self { addr, state }
    }

    /// `http://127.0.0.1:<port><path>`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Serve `object` at `path`.
    pub fn serve(&self, path: &str, object: RemoteObject) {
        self.state
            .objects
            .lock()
            .expect("lock")
            .insert(path.to_owned(), object);
    }

    /// Answer every `PUT` with `status` instead of `201`.
    pub fn fail_puts(&self, status: StatusCode) {
        *self.state.put_status.lock().expect("lock") = Some(status);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("lock").clone()
    }
}

async fn remote_handle(
    state: Arc<RemoteState>,
    req: http::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let path = parts.uri.path().to_owned();
    state.requests.lock().expect("lock").push(RecordedRequest {
        method: parts.method.clone(),
        path: path.clone(),
        headers: parts.headers.clone(),
        body,
    });

    let mut response = http::Response::new(Full::new(Bytes::new()));
    match parts.method {
        Method::GET => {
            let object = state.objects.lock().expect("lock").get(&path).cloned();
            match object {
                Some(object) => {
                    *response.status_mut() = object.status;
                    if let Some(digest) = object.digest {
                        response
                            .headers_mut()
                            .insert("digest", digest.parse().expect("digest header"));
                    }
                    *response.body_mut() = Full::new(object.body);
                }
                None => *response.status_mut() = StatusCode::NOT_FOUND,
            }
        }
        Method::PUT => {
            let status = *state.put_status.lock().expect("lock");
            *response.status_mut() = status.unwrap_or(StatusCode::CREATED);
        }
        _ => *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED,
    }
    Ok(response)
}

/// Start a bare endpoint that answers every request with `response`, written
/// verbatim, then closes the connection.
///
/// Used where the remote must send something hyper would not produce on its
/// own, such as a custom reason phrase.
pub async fn start_raw_remote(response: &'static str) -> SocketAddr {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind raw remote");
    let addr = listener.local_addr().expect("raw remote addr");
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0_u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// The gateway under test, serving storage area `sa1` from a temporary dir.
#[derive(Debug)]
pub struct Gateway {
    addr: SocketAddr,
    root: TempDir,
    http: reqwest::Client,
}

impl Gateway {
    /// Start a gateway with default configuration.
    pub async fn start() -> Self {
        Self::start_with(TpcConfig::default()).await
    }

    /// Start a gateway; `sa1` is added to the configured storage areas.
    pub async fn start_with(mut config: TpcConfig) -> Self {
        init_tracing();
        let root = tempfile::tempdir().expect("storage root");
        config
            .storage_areas
            .push(StorageAreaConfig::new("sa1", root.path().to_string_lossy()));

        let areas = Arc::new(StorageAreas::new(&config.storage_areas).expect("storage areas"));
        let client = HttpTransferClient::new(&config, areas.clone()).expect("outbound client");
        let filter = TpcFilter::new(
            &config,
            areas,
            Arc::new(client),
            Arc::new(TransferMetrics::new().expect("metrics")),
        );
        let service = TpcHttpService::new(filter, NotImplementedHandler);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind gateway");
        let addr = listener.local_addr().expect("gateway addr");
        tokio::spawn(async move {
            let http = HttpConnBuilder::new(TokioExecutor::new());
            while let Ok((stream, _)) = listener.accept().await {
                let conn = http
                    .serve_connection(TokioIo::new(stream), service.clone())
                    .into_owned();
                tokio::spawn(conn);
            }
        });

        Self {
            addr,
            root,
            http: reqwest::Client::new(),
        }
    }

    /// Filesystem root of `sa1`.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Filesystem path of `rel` inside `sa1`.
    #[must_use]
    pub fn file(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// `http://127.0.0.1:<port><path>`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Send a `COPY` to `path` with the given headers.
    pub async fn copy(&self, path: &str, headers: &[(&str, &str)]) -> (StatusCode, HeaderMap, String) {
        let method = Method::from_bytes(b"COPY").expect("COPY method");
        let mut builder = self.http.request(method, self.url(path));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = builder.send().await.expect("gateway response");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.expect("gateway body");
        (status, headers, body)
    }

    /// `GET` a gateway path.
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let response = self.http.get(self.url(path)).send().await.expect("gateway response");
        let status = response.status();
        (status, response.text().await.expect("gateway body"))
    }

    /// Whether any staging file is left in `dir` (relative to `sa1`).
    #[must_use]
    pub fn has_staging_leftovers(&self, dir: &str) -> bool {
        std::fs::read_dir(self.file(dir))
            .expect("read dir")
            .filter_map(Result::ok)
            .any(|e| e.file_name().to_string_lossy().contains(".tpc-"))
    }
}

mod test_push;
mod test_service;
