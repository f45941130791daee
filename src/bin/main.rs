//! labelserve binary.
//!
//! `serve` binds the classification service; `client` drives a running one
//! with lines read from a file or stdin.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use labelserve_core::client::{self, ClientOptions};
use labelserve_core::transport::{create_context, ZmqRequester};
use labelserve_core::{signals, LinearClassifier, Service, ServiceConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "LABELSERVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve classification requests on a REP socket
    Serve {
        /// Endpoint to bind, e.g. tcp://*:5555 or ipc:///tmp/labelserve.sock
        bind: String,

        /// Model file (.json or bincode)
        model: PathBuf,

        /// Exit after this many milliseconds without a request
        idle_timeout_ms: Option<String>,
    },

    /// Send each line of INPUT to a running service
    Client {
        /// Endpoint to connect, e.g. tcp://localhost:5555
        connect: String,

        /// Input file, or `-` for stdin
        input: String,

        /// Per-request reply timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Stop the service once the input is exhausted
        #[arg(long)]
        shutdown: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Dropping the guard stops the background logging thread
    let _log_guard = init_tracing(default_log_level(&cli.command));

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// The client stays quiet apart from its session log, which carries the
/// PING and SHUTDOWN acknowledgements.
fn default_log_level(command: &Commands) -> &'static str {
    match command {
        Commands::Serve { .. } => "labelserve=info",
        Commands::Client { .. } => "labelserve=warn,labelserve_core::client=info",
    }
}

fn init_tracing(default_log_level: &str) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        EnvFilter::builder().parse_lossy(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level.to_string()),
        )
    };

    // File logging is opt-in via LABELSERVE_LOG_DIR
    if let Ok(log_dir) = std::env::var("LABELSERVE_LOG_DIR") {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "labelserve.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking)
            .init();

        info!("File logging enabled to {}/labelserve.log", log_dir);
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve {
            bind,
            model,
            idle_timeout_ms,
        } => {
            let config = config.with_idle_timeout_arg(idle_timeout_ms.as_deref());
            serve(&bind, model, &config)
        }
        Commands::Client {
            connect,
            input,
            timeout_ms,
            shutdown,
        } => {
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.client_timeout());
            run_client(&connect, &input, timeout, &config, shutdown)
        }
    }
}

fn serve(bind: &str, model: PathBuf, config: &ServiceConfig) -> Result<()> {
    info!("labelserve v{} starting up", env!("CARGO_PKG_VERSION"));

    let interrupt = signals::install().context("Failed to install signal handlers")?;

    let classifier = LinearClassifier::load(&model)
        .with_context(|| format!("Failed to load model from {}", model.display()))?;
    info!(
        "Loaded model {} with {} labels",
        model.display(),
        classifier.labels().len()
    );

    let context = create_context(config.io_threads);
    let mut service = Service::bind(&context, bind, classifier, config, interrupt)
        .with_context(|| format!("Failed to bind {}", bind))?;

    let outcome = service.run();

    // Terminating the context blocks for up to the linger period while the
    // last reply is flushed.
    drop(service);
    drop(context);

    let reason = outcome.context("Service loop failed")?;
    info!("labelserve stopped ({})", reason);
    Ok(())
}

fn run_client(
    connect: &str,
    input: &str,
    timeout: Duration,
    config: &ServiceConfig,
    shutdown: bool,
) -> Result<()> {
    let reader =
        client::open_input(input).with_context(|| format!("Unable to open input file {}", input))?;

    let context = create_context(config.io_threads);
    let transport = ZmqRequester::connect(&context, connect, timeout)
        .with_context(|| format!("Failed to connect to {}", connect))?;

    let stdout = std::io::stdout();
    let sent = client::run(
        &transport,
        reader,
        stdout.lock(),
        ClientOptions {
            shutdown_after: shutdown,
        },
    )
    .context("Client session failed")?;

    info!("Client sent {} requests to {}", sent, connect);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn enables_info(directive: &str) -> bool {
        let filter = EnvFilter::builder().parse_lossy(directive);
        filter.max_level_hint().map_or(true, |max| max >= Level::INFO)
    }

    #[test]
    fn test_client_acknowledgements_visible_by_default() {
        let cli = Cli::try_parse_from(["labelserve", "client", "tcp://localhost:5555", "-"]).unwrap();
        assert!(enables_info(default_log_level(&cli.command)));
    }

    #[test]
    fn test_serve_logs_info_by_default() {
        let cli = Cli::try_parse_from(["labelserve", "serve", "tcp://*:5555", "model.json"]).unwrap();
        assert!(enables_info(default_log_level(&cli.command)));
    }

    #[test]
    fn test_usage_error_is_failure() {
        let err = Cli::try_parse_from(["labelserve", "serve"]).err().unwrap();
        assert!(err.use_stderr());
        let help = Cli::try_parse_from(["labelserve", "--help"]).err().unwrap();
        assert!(!help.use_stderr());
    }
}
