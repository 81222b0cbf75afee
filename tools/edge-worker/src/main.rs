//! Edge worker - per-request render worker process.
//!
//! Reads render requests from the host over a framed channel, renders each
//! with the configured engine, and streams the response back:
//! - `edge-worker` - channel on stdin/stdout
//! - `edge-worker 4000` - channel on a TCP connection to 127.0.0.1:4000

mod config;
mod engine;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use edge_ipc::{receiver, sender, MessageSink, MessageStream};
use edge_observability::{LogFormat, LogLevel, StructuredLogger};
use edge_core::WorkerError;
use edge_render::RenderBridge;
use tracing_subscriber::EnvFilter;

use config::WorkerConfig;
use engine::CommandEngine;

/// Edge worker - render routes for a supervising host
#[derive(Parser)]
#[command(name = "edge-worker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port of the host's channel on 127.0.0.1 (stdin/stdout when omitted)
    port: Option<u16>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Use JSON log format
    #[arg(long)]
    json: bool,

    /// Minimum structured log level (overrides the config file)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn min_level(&self, configured: LogLevel) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            self.log_level.unwrap_or(configured)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}

async fn connect(port: Option<u16>) -> Result<(MessageStream, MessageSink)> {
    match port {
        Some(port) => {
            let stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .with_context(|| format!("Failed to connect to 127.0.0.1:{port}"))?;
            stream.set_nodelay(true)?;
            let (read, write) = stream.into_split();
            Ok((receiver(read), sender(write)))
        }
        None => Ok((receiver(tokio::io::stdin()), sender(tokio::io::stdout()))),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = WorkerConfig::resolve(cli.config.as_deref(), &cwd)?;
    let metadata = Arc::new(config.metadata()?);
    let engine = CommandEngine::from_config(&config.engine)?;

    let logger = StructuredLogger::new()
        .with_worker(config.worker.name.clone())
        .with_min_level(cli.min_level(config.logging.level))
        .with_format(if cli.json {
            LogFormat::Json
        } else {
            config.logging.format
        });

    let (incoming, outgoing) = connect(cli.port).await?;
    logger
        .info_builder("worker ready")
        .field("channel", match cli.port {
            Some(port) => format!("tcp:{port}"),
            None => "stdio".to_string(),
        })
        .field_u64("layout_records", metadata.layout.len() as u64)
        .emit();

    let served = RenderBridge::new(incoming, outgoing, engine, metadata)
        .with_logger(logger)
        .run()
        .await?;
    tracing::info!(served, "worker exiting");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        if !logged_by_bridge(&e) {
            tracing::error!("{e:#}");
        }
        std::process::exit(1);
    }
}

/// Bridge errors were already written to the structured log.
fn logged_by_bridge(err: &anyhow::Error) -> bool {
    err.downcast_ref::<WorkerError>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    // === CLI Tests ===

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from(["edge-worker", "--log-level", "warning"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Warn));
        assert_eq!(cli.min_level(LogLevel::Info), LogLevel::Warn);

        let cli = Cli::try_parse_from(["edge-worker", "4000"]).unwrap();
        assert_eq!(cli.port, Some(4000));
        assert_eq!(cli.min_level(LogLevel::Error), LogLevel::Error);

        let cli = Cli::try_parse_from(["edge-worker", "-v", "--log-level", "error"]).unwrap();
        assert_eq!(cli.min_level(LogLevel::Info), LogLevel::Debug);

        assert!(Cli::try_parse_from(["edge-worker", "--log-level", "loud"]).is_err());
    }

    // === Exit Tests ===

    #[test]
    fn test_bridge_errors_not_logged_twice() {
        let bridge: anyhow::Error = WorkerError::EmptyRenderResult.into();
        assert!(logged_by_bridge(&bridge));

        let setup = anyhow::anyhow!("No renderer configured");
        assert!(!logged_by_bridge(&setup));

        let wrapped = anyhow::Error::from(WorkerError::MissingPageModule).context("serving");
        assert!(logged_by_bridge(&wrapped));
    }
}
