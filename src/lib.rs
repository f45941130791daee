//! Text classification served over a ZeroMQ request/reply socket.
//!
//! A client sends one line of text and gets back the best label and its
//! probability as `[{"label":"..","prob":..}]`. Two control commands share the
//! channel: `[CMD:PING]` and `[CMD:SHUTDOWN]`.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod service;
pub mod signals;
pub mod transport;

// Re-export commonly used types
pub use config::{IdleTimeout, ServiceConfig};
pub use engine::{LinearClassifier, Ranked, Ranker};
pub use error::{Error, ModelError, Result};
pub use service::{Service, ShutdownReason};
pub use signals::InterruptFlag;
