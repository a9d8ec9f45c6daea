//! Upstream exchange and failure replies

use fwsync_core::{Error, Result};
use hickory_proto::op::{Message, ResponseCode};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Largest upstream reply accepted (EDNS0 UDP payload size)
pub const MAX_REPLY_SIZE: usize = 4096;

/// Send `request` to `upstream` and wait for the reply carrying the same id
///
/// Datagrams with a different id (late replies to an earlier exchange on a
/// reused port) are ignored until `timeout` runs out.
pub async fn exchange(
    request: &[u8],
    request_id: u16,
    upstream: SocketAddr,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let local: SocketAddr = if upstream.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(upstream).await?;
    socket.send(request).await?;

    let receive = async {
        let mut buf = vec![0u8; MAX_REPLY_SIZE];
        loop {
            let n = socket.recv(&mut buf).await?;
            if n >= 2 && u16::from_be_bytes([buf[0], buf[1]]) == request_id {
                buf.truncate(n);
                return Ok::<_, Error>(buf);
            }
            tracing::debug!("Ignoring unexpected datagram from {}", upstream);
        }
    };

    tokio::time::timeout(timeout, receive).await.map_err(|_| {
        Error::timeout(format!("No reply from {} within {:?}", upstream, timeout))
    })?
}

/// Decode a DNS message
pub fn decode(bytes: &[u8]) -> Result<Message> {
    Message::from_vec(bytes).map_err(|e| Error::dns(format!("Malformed message: {}", e)))
}

/// Encode a DNS message
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    message
        .to_vec()
        .map_err(|e| Error::dns(format!("Failed to encode message: {}", e)))
}

/// SERVFAIL reply to `request`, echoing its questions
pub fn servfail(request: &Message) -> Message {
    let mut reply = Message::error_msg(request.id(), request.op_code(), ResponseCode::ServFail);
    reply.set_recursion_desired(request.recursion_desired());
    reply.add_queries(request.queries().iter().cloned());
    reply
}
