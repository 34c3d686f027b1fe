//! Ollama availability detection and installation guidance.
//!
//! Both backends (embedding and generation) resolve through the local
//! Ollama daemon, so a missing daemon is a fatal configuration error
//! caught before the index build starts.

use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Ollama is not installed or not in PATH")]
    NotInstalled,

    #[error("Ollama is installed but not running")]
    NotRunning,

    #[error("Failed to check Ollama status: {0}")]
    CheckFailed(String),
}

pub type Result<T> = std::result::Result<T, DetectionError>;

/// Checks that Ollama is available and prints setup guidance if not.
///
/// Called during server startup; can also be called manually to verify
/// the daemon before attempting operations.
pub fn detect_ollama() -> Result<()> {
    match check_ollama_silent() {
        Ok(()) => Ok(()),
        Err(e @ DetectionError::NotInstalled) => {
            print_installation_help();
            Err(e)
        }
        Err(e @ DetectionError::NotRunning) => {
            print_startup_help();
            Err(e)
        }
        Err(e) => {
            eprintln!("Could not verify Ollama status: {}", e);
            Err(e)
        }
    }
}

/// Quietly checks if Ollama is available without printing help messages.
///
/// The panel uses this to warn the operator before launching a server
/// that would only fail its own startup check.
pub fn check_ollama_silent() -> Result<()> {
    if !is_ollama_installed() {
        return Err(DetectionError::NotInstalled);
    }

    match is_ollama_running() {
        Ok(true) => Ok(()),
        Ok(false) => Err(DetectionError::NotRunning),
        Err(e) => Err(DetectionError::CheckFailed(e)),
    }
}

fn is_ollama_installed() -> bool {
    Command::new("which")
        .arg("ollama")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn is_ollama_running() -> std::result::Result<bool, String> {
    let output = Command::new("ollama")
        .arg("list")
        .output()
        .map_err(|e| e.to_string())?;

    Ok(output.status.success())
}

fn print_installation_help() {
    eprintln!("Ollama not found!");
    eprintln!();
    eprintln!("  askdoc requires Ollama for embeddings and generation.");
    eprintln!();
    eprintln!("  Install Ollama:");
    eprintln!("   curl -fsSL https://ollama.ai/install.sh | sh");
    eprintln!();
    eprintln!("  Then pull the models askdoc uses by default:");
    eprintln!("   ollama pull bge-large-en");
    eprintln!("   ollama pull llama2:13b-chat");
}

fn print_startup_help() {
    eprintln!("Ollama is installed but not running!");
    eprintln!();
    eprintln!("  Start it with:");
    eprintln!("   ollama serve");
    eprintln!();
    eprintln!("  Verify it's running:");
    eprintln!("   ollama list");
}
