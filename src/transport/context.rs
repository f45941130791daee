//! ZMQ context management
//!
//! Two ways to get a context:
//! - [`create`]: an owned context. Dropping the last handle terminates it,
//!   which is what gives socket linger its effect, so the service uses this.
//! - [`global_context`]: a lazily created process-wide context, shared so that
//!   `inproc://` endpoints connect across components. Never terminated.

use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{debug, warn};

/// Environment variable for configuring ZMQ IO threads
const ZMQ_IO_THREADS_ENV: &str = "LABELSERVE_ZMQ_IO_THREADS";

/// Default number of IO threads for ZMQ context
const DEFAULT_IO_THREADS: i32 = 1;

static ZMQ_CONTEXT: Lazy<Arc<zmq::Context>> = Lazy::new(|| Arc::new(create(io_thread_count())));

/// Create a new context with `io_threads` IO threads.
///
/// A single responder socket never needs more than one.
pub fn create(io_threads: i32) -> zmq::Context {
    debug!("initializing ZMQ context with {} IO thread(s)", io_threads);

    let ctx = zmq::Context::new();
    if let Err(e) = ctx.set_io_threads(io_threads) {
        warn!("Failed to set ZMQ IO threads to {}: {}, using default", io_threads, e);
    }
    ctx
}

/// Get the global ZMQ context, creating it on first access.
pub fn global_context() -> Arc<zmq::Context> {
    Arc::clone(&ZMQ_CONTEXT)
}

/// IO threads for the global context: `LABELSERVE_ZMQ_IO_THREADS`, default 1.
pub fn io_thread_count() -> i32 {
    std::env::var(ZMQ_IO_THREADS_ENV)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &i32| *n > 0)
        .unwrap_or(DEFAULT_IO_THREADS)
}
