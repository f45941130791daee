//! Request/reply protocol.
//!
//! One request, one reply. A request body that is byte-for-byte equal to a
//! control command is a command; anything else is text to classify.
//!
//! | Request | Reply |
//! |---|---|
//! | `[CMD:SHUTDOWN]` | `OK`, then the service stops |
//! | `[CMD:PING]` | `PONG` (or the configured acknowledgement) |
//! | any other text | `[{"label":"<L>","prob":<p>}]` or `[]` |

pub mod command;
pub mod dispatch;
pub mod normalize;
pub mod response;

pub use command::{Category, PING, SHUTDOWN};
pub use dispatch::{Dispatcher, RunState};
pub use normalize::normalize;
pub use response::encode;

/// Reply to `[CMD:SHUTDOWN]`.
pub const SHUTDOWN_REPLY: &[u8] = b"OK";

/// Default reply to `[CMD:PING]`.
pub const DEFAULT_PING_REPLY: &str = "PONG";
