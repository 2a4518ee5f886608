//! extscaled — the extscale daemon.
//!
//! Serves the KEDA external scaler contract backed by one data source:
//! - a socket feed (one JSON line per connection), or
//! - a shared JSON file rewritten by a scaling agent.
//!
//! # Usage
//!
//! ```text
//! extscaled serve --config /etc/extscale/extscale.toml
//! extscaled serve --source file --path /tmp/shared_file.json
//! extscaled probe --source socket --address 127.0.0.1:8082
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use extscale_core::{ConfigFile, ScalerConfig, SourceKind};

mod probe;
mod serve;

const DEFAULT_LOG_FILTER: &str = "info,extscaled=debug,extscale=debug";

#[derive(Parser)]
#[command(name = "extscaled", about = "KEDA external scaler daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the external scaler gRPC API until interrupted.
    Serve {
        #[command(flatten)]
        source: SourceArgs,

        /// gRPC listen address (overrides server.listen).
        #[arg(long)]
        listen: Option<String>,
    },
    /// Fetch one reading and print how it would be reported.
    Probe {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Path to an extscale.toml config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data source transport: socket or file (overrides source.kind).
    #[arg(long = "source")]
    kind: Option<SourceKind>,

    /// Socket feed address, host:port (overrides source.address).
    #[arg(long)]
    address: Option<String>,

    /// Shared file path (overrides source.path).
    #[arg(long)]
    path: Option<PathBuf>,
}

impl SourceArgs {
    /// Load the config file (if any), apply flag overrides, resolve defaults.
    fn resolve(&self, listen: Option<String>) -> anyhow::Result<ScalerConfig> {
        let mut file = match &self.config {
            Some(path) => ConfigFile::from_file(path)?,
            None => ConfigFile::default(),
        };

        if let Some(kind) = self.kind {
            file.source.kind = Some(kind);
        }
        if let Some(address) = &self.address {
            file.source.address = Some(address.clone());
        }
        if let Some(path) = &self.path {
            file.source.path = Some(path.clone());
        }
        if let Some(listen) = listen {
            file.server.listen = Some(listen);
        }

        Ok(file.resolve()?)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve { source, listen } => {
            let config = source.resolve(listen)?;
            serve::run_serve(config).await
        }
        Command::Probe { source, json } => {
            let config = source.resolve(None)?;
            probe::run_probe(config, json).await
        }
    }
}
