use std::path::PathBuf;
use std::time::Duration;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::filter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use globepin::cli::{self, AddArgs};
use globepin::config::{AppConfig, DEFAULT_BIND_ADDR, DEFAULT_PUBLIC_URL};
use globepin::geocode::DEFAULT_ENDPOINT;
use globepin::http;
use globepin::ingest::DEFAULT_TRANSFER_TIMEOUT;

#[derive(Parser, Debug)]
#[command(name = "globepin", about = "Pin geo-located memories onto an interactive globe", version)]
struct Cli {
    /// Working directory holding the operation log and uploaded blobs
    #[arg(long, env = "GLOBEPIN_WORKDIR", global = true)]
    workdir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Submit a memory from the command line
    Add(AddArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "GLOBEPIN_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Public URL prefix under which stored blobs are reachable
    #[arg(long, env = "GLOBEPIN_PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL)]
    public_url: String,

    #[arg(long, env = "GLOBEPIN_GEOCODE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    geocode_endpoint: String,

    /// Per-file transfer timeout, e.g. "30s"
    #[arg(long, env = "GLOBEPIN_TRANSFER_TIMEOUT", value_parser = humantime::parse_duration, default_value = "30s")]
    transfer_timeout: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Serve(args) => {
            let config = AppConfig::new(
                cli.workdir,
                args.bind,
                args.public_url,
                args.geocode_endpoint,
                args.transfer_timeout,
            )?;
            http::serve(config).await
        }
        Command::Add(args) => {
            let config = AppConfig::new(
                cli.workdir,
                DEFAULT_BIND_ADDR.to_string(),
                DEFAULT_PUBLIC_URL.to_string(),
                DEFAULT_ENDPOINT.to_string(),
                DEFAULT_TRANSFER_TIMEOUT,
            )?;
            cli::add(config, args).await
        }
    }
}

fn init_tracing() {
    let tracing_layer = tracing_subscriber::fmt::layer();
    let filter = filter::Targets::new()
        .with_target("tower_http::trace::on_response", Level::DEBUG)
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_default(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_layer)
        .with(filter)
        .init();
}
