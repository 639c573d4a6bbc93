//! TCP accept loop and per-connection handling.
//!
//! One task per connection, tracked in a `JoinSet` so shutdown can drain
//! outstanding work instead of abandoning detached threads. Admission
//! control runs before the first read; framing limits and the read timeout
//! bound what an abusive peer can cost.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::DomainError;

use super::framer::{FrameState, RejectReason, RequestFramer};
use super::rate_limit::RateLimiter;
use super::response::Response;
use super::router::Router;

/// Per-connection read timeout (slowloris guard).
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const READ_BUF_SIZE: usize = 16 * 1024;

pub struct Server {
    router: Arc<Router>,
    rate_limiter: Arc<RateLimiter>,
}

impl Server {
    pub fn new(router: Arc<Router>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            router,
            rate_limiter,
        }
    }

    /// Accept connections until `shutdown` fires, then drain the in-flight
    /// handlers before returning.
    pub async fn run(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), DomainError> {
        info!("Serving on {}", listener.local_addr()?);
        let mut connections: JoinSet<()> = JoinSet::new();

        loop {
            // Reap finished handlers so the set stays small.
            while connections.try_join_next().is_some() {}

            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("Accept failed: {e}");
                            continue;
                        }
                    };

                    // Admission control before any request byte is read.
                    let source = peer.ip().to_string();
                    if !self.rate_limiter.admit(&source, Instant::now()) {
                        let err = DomainError::rate_limited(source);
                        warn!("{err}");
                        let mut stream = stream;
                        let reply =
                            Response::error(err.status_code(), err.to_string()).to_bytes();
                        let _ = stream.write_all(&reply).await;
                        continue;
                    }

                    let router = Arc::clone(&self.router);
                    connections.spawn(async move {
                        handle_connection(stream, router).await;
                    });
                }
            }
        }

        info!("Draining {} open connections", connections.len());
        while connections.join_next().await.is_some() {}
        Ok(())
    }
}

/// Read, frame, dispatch, respond. Any error inside ends this connection
/// only; the response defaults to a 500 when dispatch itself blew up.
async fn handle_connection(mut stream: TcpStream, router: Arc<Router>) {
    let response = match read_request(&mut stream, &router).await {
        Ok(response) => response,
        Err(e) => {
            debug!("Connection error: {e}");
            Response::error(e.status_code(), e.to_string())
        }
    };

    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        debug!("Failed to write response: {e}");
    }
    let _ = stream.shutdown().await;
}

async fn read_request(
    stream: &mut TcpStream,
    router: &Router,
) -> Result<Response, DomainError> {
    let mut framer = RequestFramer::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf))
            .await
            .map_err(|_| DomainError::protocol("read timeout"))??;
        if n == 0 {
            return Err(DomainError::protocol("connection closed mid-request"));
        }

        match framer.push(&buf[..n]) {
            FrameState::HeaderIncomplete | FrameState::BodyIncomplete => continue,
            FrameState::Complete(request) => {
                debug!("{} {}", request.method, request.path);
                return Ok(router.route(&request).await);
            }
            FrameState::Reject(reason) => {
                // Stop reading immediately; the caller answers once and
                // closes.
                return Err(match reason {
                    RejectReason::TooLarge => {
                        DomainError::resource_limit("request exceeds size cap")
                    }
                    RejectReason::Malformed => DomainError::protocol("malformed request"),
                });
            }
        }
    }
}
