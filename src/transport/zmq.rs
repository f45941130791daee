//! ZMQ transport implementation.
//!
//! `ZmqResponder` is the REP end the service binds; `ZmqRequester` is the REQ
//! end a client connects. Both are plain blocking sockets: the service is a
//! single thread that alternates receive and send.

use std::time::Duration;

use tracing::{debug, trace};

use super::{duration_to_ms, Channel, Received, Transport};
use crate::error::Result;

/// Default requester receive timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Requester send timeout.
const SEND_TIMEOUT_MS: i32 = 5_000;

/// Bound REP socket serving one request at a time.
pub struct ZmqResponder {
    socket: zmq::Socket,
    endpoint: String,
}

impl ZmqResponder {
    /// Create a REP socket on `context`, bind it, and arm the receive timeout.
    pub fn bind(context: &zmq::Context, endpoint: &str, recv_timeout: Duration) -> Result<Self> {
        let socket = context.socket(zmq::REP)?;
        socket.set_rcvtimeo(duration_to_ms(recv_timeout))?;
        socket.bind(endpoint)?;

        debug!(
            "REP socket bound to {} (receive timeout {} ms)",
            endpoint,
            duration_to_ms(recv_timeout)
        );

        Ok(Self {
            socket,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Channel for ZmqResponder {
    fn recv(&mut self) -> Result<Received> {
        let mut body = match self.socket.recv_bytes(0) {
            Ok(bytes) => bytes,
            Err(zmq::Error::EAGAIN) => return Ok(Received::TimedOut),
            Err(zmq::Error::EINTR) => return Ok(Received::Interrupted),
            Err(e) => return Err(e.into()),
        };

        // A multipart request is one logical body.
        while self.socket.get_rcvmore()? {
            body.extend(self.socket.recv_bytes(0)?);
        }

        trace!("Received {} bytes on {}", body.len(), self.endpoint);
        Ok(Received::Message(body))
    }

    fn send(&mut self, reply: &[u8]) -> Result<()> {
        trace!("Sending {} bytes on {}", reply.len(), self.endpoint);
        self.socket.send(reply, 0)?;
        Ok(())
    }

    fn set_linger(&mut self, linger: Duration) -> Result<()> {
        self.socket.set_linger(duration_to_ms(linger))?;
        Ok(())
    }
}

/// Synchronous ZMQ REQ socket transport.
pub struct ZmqRequester {
    socket: zmq::Socket,
    endpoint: String,
}

impl ZmqRequester {
    /// Create a REQ socket on `context` connected to `endpoint`.
    pub fn connect(context: &zmq::Context, endpoint: &str, timeout: Duration) -> Result<Self> {
        let socket = context.socket(zmq::REQ)?;
        socket.set_rcvtimeo(duration_to_ms(timeout))?;
        socket.set_sndtimeo(SEND_TIMEOUT_MS)?;
        socket.set_linger(0)?;
        socket.connect(endpoint)?;

        debug!("ZMQ transport connected to {}", endpoint);

        Ok(Self {
            socket,
            endpoint: endpoint.to_string(),
        })
    }
}

impl Transport for ZmqRequester {
    fn call(&self, request: &[u8]) -> Result<Vec<u8>> {
        trace!("Sending {} bytes to {}", request.len(), self.endpoint);
        self.socket.send(request, 0)?;

        let response = self.socket.recv_bytes(0)?;
        trace!("Received {} bytes from {}", response.len(), self.endpoint);

        Ok(response)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
