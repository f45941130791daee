//! Per-request dispatch: classify, act, build the reply.

use chrono::Utc;
use tracing::info;

use super::command::Category;
use super::{normalize, response, DEFAULT_PING_REPLY, SHUTDOWN_REPLY};
use crate::engine::Ranker;
use crate::error::Result;

/// Run state of the service. `terminated` flips to true at most once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    terminated: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }
}

/// Turns one request into one reply.
pub struct Dispatcher<R> {
    ranker: R,
    ping_reply: Vec<u8>,
}

impl<R: Ranker> Dispatcher<R> {
    pub fn new(ranker: R) -> Self {
        Self {
            ranker,
            ping_reply: DEFAULT_PING_REPLY.as_bytes().to_vec(),
        }
    }

    /// Replace the `PONG` acknowledgement with an application-defined one.
    pub fn with_ping_reply(mut self, reply: impl Into<Vec<u8>>) -> Self {
        self.ping_reply = reply.into();
        self
    }

    pub fn ranker(&self) -> &R {
        &self.ranker
    }

    /// Handle one request and return the reply owed for it.
    ///
    /// Request text never reaches the log; inference requests are recorded by
    /// size and arrival time only.
    pub fn dispatch(&self, request: &[u8], state: &mut RunState) -> Result<Vec<u8>> {
        let category = Category::classify(request);
        match category {
            Category::Shutdown => {
                info!("Received {} command, shutting down", category.literal().unwrap_or_default());
                state.terminate();
                Ok(SHUTDOWN_REPLY.to_vec())
            }
            Category::Ping => {
                info!("Received {} command", category.literal().unwrap_or_default());
                Ok(self.ping_reply.clone())
            }
            Category::Inference => {
                info!(
                    bytes = request.len(),
                    arrived = %Utc::now().to_rfc3339(),
                    "Received inference request"
                );
                let text = String::from_utf8_lossy(request);
                let text = normalize(&text);
                let ranked = self.ranker.rank(&text)?;
                response::encode(&ranked)
            }
        }
    }
}
