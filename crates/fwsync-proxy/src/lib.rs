// # Observing DNS Forwarder
//
// This crate provides the DNS-proxy observation source for fwsync. Clients
// point their resolver at the proxy; every request is forwarded to the
// upstream resolver and the reply is relayed back unchanged.
//
// ## Observation
//
// Before the reply is relayed, each question name is resolved through the
// answer section (following alias chains) and the observer is called with
// the resulting addresses. The observer runs to completion first, so by the
// time the client sees an address it has already been pushed to the device
// (or the push has failed).
//
// ## Failure Handling
//
// - Malformed requests are dropped without a reply
// - Upstream timeouts and socket errors produce a SERVFAIL reply
// - Upstream replies that cannot be decoded are relayed without observation
//
// ## Shutdown
//
// `run` stops receiving as soon as its token fires, then waits for requests
// already in flight. Each of those is bounded by the upstream timeout.

pub mod forward;

use fwsync_core::dns::{answer_records, resolve};
use fwsync_core::traits::Observer;
use fwsync_core::Result;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default upstream reply timeout
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest client request accepted
const MAX_REQUEST_SIZE: usize = 4096;

/// UDP DNS forwarder feeding an [`Observer`]
pub struct DnsProxy {
    /// Listening socket, shared with request tasks for replies
    socket: Arc<UdpSocket>,

    /// Upstream resolver
    upstream: SocketAddr,

    /// Upstream reply timeout
    timeout: Duration,

    /// Receiver of resolved answers
    observer: Arc<dyn Observer>,
}

impl DnsProxy {
    /// Bind the listening socket
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn bind(
        listen: SocketAddr,
        upstream: SocketAddr,
        timeout: Duration,
        observer: Arc<dyn Observer>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(listen).await?;
        Ok(Self {
            socket: Arc::new(socket),
            upstream,
            timeout,
            observer,
        })
    }

    /// Address the proxy is listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve requests until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(
            "Starting DNS proxy on {}, forwarding to {}",
            self.local_addr()?,
            self.upstream
        );

        let mut in_flight = JoinSet::new();
        let mut buf = vec![0u8; MAX_REQUEST_SIZE];

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("DNS request task failed: {}", e);
                    }
                }

                received = self.socket.recv_from(&mut buf) => {
                    let (n, peer) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("DNS proxy receive error: {}", e);
                            continue;
                        }
                    };

                    let request = RequestContext {
                        socket: self.socket.clone(),
                        upstream: self.upstream,
                        timeout: self.timeout,
                        observer: self.observer.clone(),
                    };
                    let bytes = buf[..n].to_vec();
                    in_flight.spawn(async move { request.handle(bytes, peer).await });
                }
            }
        }

        debug!("Waiting for {} in-flight DNS request(s)", in_flight.len());
        while in_flight.join_next().await.is_some() {}

        info!("DNS proxy server terminated");
        Ok(())
    }
}

/// Everything one request task needs
struct RequestContext {
    socket: Arc<UdpSocket>,
    upstream: SocketAddr,
    timeout: Duration,
    observer: Arc<dyn Observer>,
}

impl RequestContext {
    async fn handle(self, bytes: Vec<u8>, peer: SocketAddr) {
        let request = match forward::decode(&bytes) {
            Ok(m) => m,
            Err(e) => {
                debug!("Dropping request from {}: {}", peer, e);
                return;
            }
        };

        let reply = match forward::exchange(&bytes, request.id(), self.upstream, self.timeout).await
        {
            Ok(reply) => {
                match forward::decode(&reply) {
                    Ok(message) => self.observe(&request, &message).await,
                    Err(e) => debug!("Relaying reply from {} unobserved: {}", self.upstream, e),
                }
                reply
            }
            Err(e) => {
                warn!("Failed to forward request: {}", e);
                match forward::encode(&forward::servfail(&request)) {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!("SERVFAIL reply not sent: {}", e);
                        return;
                    }
                }
            }
        };

        if let Err(e) = self.socket.send_to(&reply, peer).await {
            warn!("Failed to write response: {}", e);
        }
    }

    /// Report the resolved addresses of every question
    async fn observe(&self, request: &Message, reply: &Message) {
        let records = answer_records(reply);
        if records.is_empty() {
            return;
        }

        for query in request.queries() {
            let name = query.name().to_string();
            let addresses = resolve(&records, &name);
            if !addresses.is_empty() {
                self.observer.on_observation(&name, &addresses).await;
            }
        }
    }
}
