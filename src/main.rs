use anyhow::Result;
use clap::Parser;
use rsvp_desk::config::Config;
use rsvp_desk::session::Session;
use rsvp_desk::store::SurrealStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Event check-in console backed by SurrealDB
#[derive(Parser, Debug)]
#[command(name = "rsvp-desk", version, about)]
struct Cli {
    /// Path to the configuration file (overrides RSVP_DESK_CONFIG)
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    rsvp_desk::load_env();
    let cli = Cli::parse();
    let config = Config::load_from(cli.config.as_deref())?;

    // The TUI owns stdout; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.runtime.log_level))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting rsvp-desk");

    let store = Arc::new(SurrealStore::connect(&config).await?);
    let session = Session::new(store.clone(), store, config.event.clone());
    rsvp_desk::console::run(session, &config).await?;

    Ok(())
}
