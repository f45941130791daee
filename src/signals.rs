//! Unix signal handling for graceful shutdown
//!
//! SIGINT and SIGTERM are captured by a handler that does exactly one thing:
//! store `true` into the process interrupt flag. The handler is installed
//! without `SA_RESTART`, so a blocking receive in progress fails with EINTR
//! and the service loop gets to look at the flag.
//!
//! # Example
//!
//! ```ignore
//! use labelserve_core::signals;
//!
//! let interrupt = signals::install()?;
//! // ... blocking receive returns Received::Interrupted ...
//! if interrupt.is_set() {
//!     // clean shutdown
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::error::Result;

/// Flag shared with the installed signal handler.
static HANDLER_FLAG: OnceCell<Arc<AtomicBool>> = OnceCell::new();

/// Signals that request a graceful shutdown.
pub const SHUTDOWN_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

/// Shutdown request raised by a captured signal.
///
/// Set only by the signal handler (or [`InterruptFlag::raise`] in tests and
/// embedders); read by the service loop right after each receive returns.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    inner: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// A flag not connected to any signal handler.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    pub fn raise(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }
}

extern "C" fn capture(_signal: nix::libc::c_int) {
    // Only an atomic store here: anything else is not async-signal-safe.
    if let Some(flag) = HANDLER_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Install the SIGINT/SIGTERM handler and return the flag it sets.
///
/// Calling this more than once returns the same flag.
pub fn install() -> Result<InterruptFlag> {
    let inner = Arc::clone(HANDLER_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false))));

    let action = SigAction::new(SigHandler::Handler(capture), SaFlags::empty(), SigSet::empty());
    for signal in SHUTDOWN_SIGNALS {
        // SAFETY: `capture` only performs an atomic store on a flag that is
        // initialized before the handler is registered.
        unsafe { sigaction(signal, &action) }?;
    }

    info!("Signal handler installed (SIGINT, SIGTERM)");
    Ok(InterruptFlag { inner })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_flag() {
        let flag = InterruptFlag::detached();
        assert!(!flag.is_set());
        let clone = flag.clone();
        clone.raise();
        assert!(flag.is_set());
    }

    #[test]
    fn test_install_returns_shared_flag() {
        let first = install().unwrap();
        let second = install().unwrap();
        assert!(Arc::ptr_eq(&first.inner, &second.inner));
    }
}
