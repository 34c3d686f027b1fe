mod console;
mod session;

use anyhow::Result;
use askdoc_core::Config;
use clap::Parser;
use console::Console;
use session::PanelSession;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "askdoc-panel")]
#[command(about = "Operator console for the askdoc query service", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "askdoc.yaml")]
    config: PathBuf,

    /// Path to the server binary to launch
    #[arg(long, default_value = "askdoc-server")]
    server_bin: PathBuf,

    /// Document folder (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Embedding model passed to the server on start
    #[arg(long)]
    embed_model: Option<String>,

    /// Generation model passed to the server on start
    #[arg(long)]
    llm_model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the console clean; diagnostics go to stderr on demand.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).unwrap_or_default();
    if let Some(data_dir) = cli.data_dir {
        config.service.data_dir = data_dir;
    }

    let embed_model = cli
        .embed_model
        .unwrap_or_else(|| config.rag.embedding_model.clone());
    let llm_model = cli.llm_model.unwrap_or_else(|| config.llm.model.clone());

    let (session, events) = PanelSession::new(
        cli.server_bin,
        PathBuf::from(&config.service.data_dir),
        format!("http://{}", config.service.bind_addr),
        Duration::from_secs(config.service.grace_period_secs),
    );

    Console::new(session, events, embed_model, llm_model).run().await
}
