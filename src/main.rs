use clap::Parser;
use tracing_subscriber::EnvFilter;

use skoslens::server::{run_server, ServerOptions};

#[derive(Parser)]
#[command(
    name = "skoslens",
    version,
    about = "Language server showing skos:prefLabel values for Turtle IRIs"
)]
struct Cli {
    /// Log filter, e.g. `info` or `skoslens=debug` (default: $SKOSLENS_LOG, else `warn`)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
    /// Never fetch labels over the network
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_env("SKOSLENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    run_server(ServerOptions {
        offline: cli.offline,
    })
    .await;

    anyhow::Ok(())
}
