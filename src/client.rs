//! Request-side driver.
//!
//! Sends a liveness probe, then each non-empty input line as one request,
//! writing every reply to the output on its own line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::{PING, SHUTDOWN};
use crate::transport::Transport;

/// Open the client input: `-` for stdin, anything else as a file path.
pub fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Options for a client session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientOptions {
    /// Send `[CMD:SHUTDOWN]` once the input is exhausted.
    pub shutdown_after: bool,
}

/// Drive one client session over `transport`. Returns the number of text
/// requests sent.
pub fn run<T, I, W>(transport: &T, input: I, mut output: W, options: ClientOptions) -> Result<usize>
where
    T: Transport,
    I: BufRead,
    W: Write,
{
    let pong = transport.call(PING)?;
    info!(
        "PING response from {}: {}",
        transport.endpoint(),
        String::from_utf8_lossy(&pong)
    );

    let mut sent = 0;
    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let reply = transport.call(line.as_bytes())?;
        writeln!(output, "{}", String::from_utf8_lossy(&reply))?;
        sent += 1;
    }
    output.flush()?;
    debug!("Sent {} requests", sent);

    if options.shutdown_after {
        let ack = transport.call(SHUTDOWN)?;
        info!("SHUTDOWN response: {}", String::from_utf8_lossy(&ack));
    }

    Ok(sent)
}
