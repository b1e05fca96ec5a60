//! RustStack TPC Server - HTTP third-party-copy gateway.
//!
//! Serves `COPY` requests with a remote `Source` (pull) or `Destination`
//! (push) against the configured storage areas, plus health and metrics
//! endpoints for orchestration systems.
//!
//! # Usage
//!
//! ```text
//! STORAGE_AREAS=sa1=/data/sa1 GATEWAY_LISTEN=0.0.0.0:8085 ruststack-tpc-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8085` | Bind address |
//! | `GATEWAY_MAX_CONNECTIONS` | `256` | Connections served at once |
//! | `STORAGE_AREAS` | *(none)* | `name=/root,...` |
//! | `TPC_VERIFY_CHECKSUM` | `true` | Default for `RequireChecksumVerification` |
//! | `TPC_DIGEST_ALGORITHM` | `adler32` | Digest requested on pulls |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ruststack_tpc_client::HttpTransferClient;
use ruststack_tpc_core::{StorageAreas, TpcConfig, TransferMetrics};
use ruststack_tpc_http::{FallbackHandler, NotImplementedHandler, TpcFilter, TpcHttpService};

/// Server version logged at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Wire storage areas, the outbound client and the filter into a service.
fn build_service(config: &TpcConfig) -> Result<TpcHttpService<NotImplementedHandler>> {
    let areas = Arc::new(
        StorageAreas::new(&config.storage_areas).context("invalid storage area configuration")?,
    );
    if areas.is_empty() {
        warn!("no storage areas configured, every request will be passed through");
    }
    for area in areas.areas() {
        info!(name = area.name(), root = %area.root().display(), "serving storage area");
    }

    let client = HttpTransferClient::new(config, areas.clone())
        .context("failed to build outbound HTTP client")?;
    let filter = TpcFilter::new(
        config,
        areas,
        Arc::new(client),
        Arc::new(TransferMetrics::new().context("failed to register transfer metrics")?),
    );

    Ok(TpcHttpService::new(filter, NotImplementedHandler))
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<H: FallbackHandler>(
    listener: TcpListener,
    service: TpcHttpService<H>,
    max_connections: usize,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    let permits = Arc::new(Semaphore::new(max_connections.max(1)));

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        let permit = tokio::select! {
            permit = Arc::clone(&permits).acquire_owned() => {
                permit.context("connection limiter closed")?
            }
            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        };

        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                    drop(permit);
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight transfers to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the gateway and requesting the health endpoint.
///
/// Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let healthy = match TpcConfig::from_env() {
            Ok(config) => {
                let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
                run_health_check(&addr).await.is_ok()
            }
            Err(_) => false,
        };
        std::process::exit(i32::from(!healthy));
    }

    let config = TpcConfig::from_env().context("invalid configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        storage_areas = config.storage_areas.len(),
        verify_checksum = config.tpc_verify_checksum,
        digest = %config.tpc_digest_algorithm,
        version = VERSION,
        "starting RustStack TPC Server",
    );
    debug!(config = %serde_json::to_string(&config)?, "effective configuration");

    let service = build_service(&config)?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, max_connections = config.gateway_max_connections, "listening for connections");

    serve(listener, service, config.gateway_max_connections).await
}
