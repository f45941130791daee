//! Request/reply service loop.
//!
//! The loop is single-threaded and fully synchronous: block on receive,
//! dispatch, send the reply, repeat. It ends on one of three triggers:
//!
//! - a `[CMD:SHUTDOWN]` request, after its `OK` has been sent
//! - the receive timeout expiring with no request (no reply is owed)
//! - a captured SIGINT/SIGTERM, observed right after a receive returns
//!
//! Any other transport failure is logged with its error code and ends the
//! loop with an error. Whatever the trigger, linger is configured before the
//! channel is released so a queued reply still gets out.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::engine::Ranker;
use crate::error::{Error, Result};
use crate::protocol::{Dispatcher, RunState};
use crate::signals::InterruptFlag;
use crate::transport::{Channel, Received, ZmqResponder};

/// Why the service loop stopped cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// `[CMD:SHUTDOWN]` was received and acknowledged.
    Command,
    /// No request arrived within the idle timeout.
    IdleTimeout,
    /// SIGINT or SIGTERM was captured.
    Interrupted,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Command => write!(f, "shutdown command"),
            ShutdownReason::IdleTimeout => write!(f, "idle timeout"),
            ShutdownReason::Interrupted => write!(f, "interrupt signal"),
        }
    }
}

/// The service: one channel, one dispatcher, one run state.
pub struct Service<C, R> {
    channel: C,
    dispatcher: Dispatcher<R>,
    interrupt: InterruptFlag,
    linger: Duration,
    state: RunState,
}

impl<R: Ranker> Service<ZmqResponder, R> {
    /// Bind a REP socket at `endpoint` and wrap it in a service.
    pub fn bind(
        context: &zmq::Context,
        endpoint: &str,
        ranker: R,
        config: &ServiceConfig,
        interrupt: InterruptFlag,
    ) -> Result<Self> {
        let idle_timeout = config.idle_timeout();
        let channel = ZmqResponder::bind(context, endpoint, idle_timeout.as_duration())?;
        info!(
            "Listening on {} (idle timeout {} ms)",
            endpoint,
            idle_timeout.as_millis()
        );

        let dispatcher = Dispatcher::new(ranker).with_ping_reply(config.ping_reply.as_bytes());
        Ok(Self::new(channel, dispatcher, interrupt, config.linger()))
    }
}

impl<C: Channel, R: Ranker> Service<C, R> {
    pub fn new(channel: C, dispatcher: Dispatcher<R>, interrupt: InterruptFlag, linger: Duration) -> Self {
        Self {
            channel,
            dispatcher,
            interrupt,
            linger,
            state: RunState::new(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn dispatcher(&self) -> &Dispatcher<R> {
        &self.dispatcher
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Serve requests until a termination trigger fires.
    pub fn run(&mut self) -> Result<ShutdownReason> {
        let outcome = self.serve();

        if let Err(e) = self.channel.set_linger(self.linger) {
            warn!("Failed to set linger to {} ms: {}", self.linger.as_millis(), e);
        }

        match &outcome {
            Ok(reason) => info!("Service stopping: {}", reason),
            Err(e) => error!("Service stopping after failure: {}", e),
        }
        outcome
    }

    fn serve(&mut self) -> Result<ShutdownReason> {
        info!("Waiting for requests...");
        while !self.state.is_terminated() {
            let request = match self.channel.recv()? {
                Received::Message(body) => body,
                Received::TimedOut => {
                    info!("No request within the idle timeout");
                    return Ok(ShutdownReason::IdleTimeout);
                }
                Received::Interrupted if self.interrupt.is_set() => {
                    info!("Receive interrupted by shutdown signal");
                    return Ok(ShutdownReason::Interrupted);
                }
                Received::Interrupted => return Err(Error::UncapturedInterrupt),
            };

            let reply = self.dispatcher.dispatch(&request, &mut self.state)?;
            self.channel.send(&reply)?;

            // A signal that landed outside the blocking receive.
            if !self.state.is_terminated() && self.interrupt.is_set() {
                info!("Shutdown signal received while serving");
                return Ok(ShutdownReason::Interrupted);
            }
        }
        Ok(ShutdownReason::Command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Ranked;
    use std::collections::VecDeque;

    struct Fixed;

    impl Ranker for Fixed {
        fn rank(&self, _text: &str) -> Result<Vec<Ranked>> {
            Ok(vec![Ranked::new("positive", -0.1)])
        }
    }

    #[derive(Default)]
    struct Script {
        incoming: VecDeque<Received>,
        sent: Vec<Vec<u8>>,
        linger: Option<Duration>,
    }

    impl Channel for Script {
        fn recv(&mut self) -> Result<Received> {
            Ok(self.incoming.pop_front().unwrap_or(Received::TimedOut))
        }

        fn send(&mut self, reply: &[u8]) -> Result<()> {
            self.sent.push(reply.to_vec());
            Ok(())
        }

        fn set_linger(&mut self, linger: Duration) -> Result<()> {
            self.linger = Some(linger);
            Ok(())
        }
    }

    fn service(incoming: Vec<Received>, interrupt: InterruptFlag) -> Service<Script, Fixed> {
        let channel = Script {
            incoming: incoming.into(),
            ..Script::default()
        };
        Service::new(channel, Dispatcher::new(Fixed), interrupt, Duration::from_millis(250))
    }

    #[test]
    fn test_shutdown_replies_then_stops() {
        let mut svc = service(
            vec![
                Received::Message(b"[CMD:SHUTDOWN]".to_vec()),
                Received::Message(b"never read".to_vec()),
            ],
            InterruptFlag::detached(),
        );
        assert_eq!(svc.run().unwrap(), ShutdownReason::Command);
        assert_eq!(svc.channel().sent, vec![b"OK".to_vec()]);
        assert_eq!(svc.channel().incoming.len(), 1);
        assert!(svc.state().is_terminated());
        assert_eq!(svc.channel().linger, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_interrupted_without_flag_is_error() {
        let mut svc = service(vec![Received::Interrupted], InterruptFlag::detached());
        assert!(matches!(svc.run(), Err(Error::UncapturedInterrupt)));
        assert!(svc.channel().sent.is_empty());
        assert!(svc.channel().linger.is_some());
    }

    #[test]
    fn test_flag_raised_during_request_still_replies() {
        let flag = InterruptFlag::detached();
        flag.raise();
        let mut svc = service(vec![Received::Message(b"text".to_vec())], flag);
        assert_eq!(svc.run().unwrap(), ShutdownReason::Interrupted);
        assert_eq!(svc.channel().sent.len(), 1);
    }

    #[test]
    fn test_display_reason() {
        assert_eq!(ShutdownReason::IdleTimeout.to_string(), "idle timeout");
    }
}
