//! Control command classification.

/// Stops the service after replying.
pub const SHUTDOWN: &[u8] = b"[CMD:SHUTDOWN]";

/// Liveness probe.
pub const PING: &[u8] = b"[CMD:PING]";

/// What a request asks the service to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Shutdown,
    Ping,
    Inference,
}

impl Category {
    /// Classify a raw request body.
    ///
    /// Exact byte equality only: no trimming, no case folding, no prefix
    /// matching. SHUTDOWN is checked before PING, and both before falling
    /// through to inference.
    pub fn classify(request: &[u8]) -> Self {
        if request == SHUTDOWN {
            Category::Shutdown
        } else if request == PING {
            Category::Ping
        } else {
            Category::Inference
        }
    }

    /// The literal for command categories, safe to log.
    pub fn literal(self) -> Option<&'static str> {
        match self {
            Category::Shutdown => Some("[CMD:SHUTDOWN]"),
            Category::Ping => Some("[CMD:PING]"),
            Category::Inference => None,
        }
    }
}
