//! Transport layer.
//!
//! This module provides:
//! - `Channel`: the responder side, one blocking receive then one send
//! - `Received`: the tagged outcome of a receive (message, timeout, interrupt)
//! - `Transport`: the requester side, a blocking request/reply call
//! - ZeroMQ implementations of both, over a shared process context

pub mod context;
pub mod zmq;

pub use self::context::{create as create_context, global_context, io_thread_count};
pub use self::zmq::{ZmqRequester, ZmqResponder};

use std::time::Duration;

use crate::error::Result;

/// Outcome of one blocking receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A complete request body.
    Message(Vec<u8>),
    /// Nothing arrived within the receive timeout.
    TimedOut,
    /// The blocking call was interrupted by a signal.
    Interrupted,
}

/// Responder side of a strictly alternating request/reply exchange.
///
/// Callers must follow every `Received::Message` with exactly one `send`.
pub trait Channel {
    /// Block until a request arrives, the receive timeout expires, or a
    /// signal interrupts the wait. Any other failure is an error.
    fn recv(&mut self) -> Result<Received>;

    /// Send the reply for the request last received.
    fn send(&mut self, reply: &[u8]) -> Result<()>;

    /// Grace period for queued outbound data when the channel is closed.
    fn set_linger(&mut self, linger: Duration) -> Result<()>;
}

/// Synchronous requester transport.
///
/// Implementations provide blocking request/response communication.
pub trait Transport {
    /// Send a request and wait for response.
    fn call(&self, request: &[u8]) -> Result<Vec<u8>>;

    /// Endpoint this transport talks to.
    fn endpoint(&self) -> &str;
}

/// Millisecond value for a zmq socket option, clamped to the `i32` range.
pub(crate) fn duration_to_ms(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_to_ms_clamps() {
        assert_eq!(duration_to_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_to_ms(Duration::from_secs(u64::MAX / 1000)), i32::MAX);
    }
}
