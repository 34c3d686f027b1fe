use anyhow::{Context, Result};
use askdoc_server::app;
use askdoc_core::{detect_ollama, Config, OllamaProvider, QueryEngine};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "askdoc-server")]
#[command(about = "Answers questions against an indexed document folder", long_about = None)]
#[command(version)]
struct Cli {
    /// Embedding model name resolved by the Ollama daemon
    #[arg(value_name = "EMBED_MODEL")]
    embed_model: Option<String>,

    /// Generation model name resolved by the Ollama daemon
    #[arg(value_name = "LLM_MODEL")]
    llm_model: Option<String>,

    #[arg(short, long, default_value = "askdoc.yaml")]
    config: PathBuf,

    /// Document folder to index (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Address to serve on (overrides config)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).unwrap_or_default();
    if let Some(embed_model) = cli.embed_model {
        config.rag.embedding_model = embed_model;
    }
    if let Some(llm_model) = cli.llm_model {
        config.llm.model = llm_model;
    }
    if let Some(data_dir) = cli.data_dir {
        config.service.data_dir = data_dir;
    }
    if let Some(bind) = cli.bind {
        config.service.bind_addr = bind;
    }

    info!(
        embedding_model = %config.rag.embedding_model,
        llm_model = %config.llm.model,
        data_dir = %config.service.data_dir,
        "Starting model initialization"
    );

    detect_ollama().context("Ollama daemon is not available")?;

    let provider = Arc::new(
        OllamaProvider::new(
            config.llm.base_url.clone(),
            Duration::from_secs(config.llm.request_timeout_secs),
        )
        .context("Failed to build Ollama client")?,
    );

    let engine = QueryEngine::build(&config, provider)
        .await
        .context("Failed to build document index")?;

    info!(
        documents = engine.document_count(),
        chunks = engine.chunk_count().await,
        "Model initialized"
    );

    let state = app::AppState {
        engine: Arc::new(engine),
    };

    let listener = tokio::net::TcpListener::bind(&config.service.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.service.bind_addr))?;

    info!(addr = %config.service.bind_addr, "Serving queries");

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutting down");
}
