//! The operator console loop.
//!
//! A single task owns the screen and the session. Stdin commands and
//! background events (server log lines, query answers) are multiplexed
//! with `select!`; background tasks never print, they send events.

use crate::session::{PanelEvent, PanelSession, StartOutcome};
use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    session: PanelSession,
    events: mpsc::UnboundedReceiver<PanelEvent>,
    embed_model: String,
    llm_model: String,
    show_server_log: bool,
    pending_queries: usize,
}

impl Console {
    pub fn new(
        session: PanelSession,
        events: mpsc::UnboundedReceiver<PanelEvent>,
        embed_model: String,
        llm_model: String,
    ) -> Self {
        Self {
            session,
            events,
            embed_model,
            llm_model,
            show_server_log: true,
            pending_queries: 0,
        }
    }

    /// Runs until the operator quits, stdin closes, or ctrl-c.
    ///
    /// Every exit path stops the managed server before returning.
    pub async fn run(mut self) -> Result<()> {
        println!("{}", "askdoc control panel".bold());
        println!("Type {} for commands.", "help".cyan());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        prompt();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        None => break,
                        Some(line) => {
                            match self.handle_command(line.trim()).await {
                                Flow::Quit => break,
                                Flow::Continue => prompt(),
                            }
                        }
                    }
                }
                Some(event) = self.events.recv() => {
                    self.handle_event(event);
                }
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            }
        }

        // The one cleanup guarantee: no orphaned server process.
        self.session.stop().await?;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }

        Ok(())
    }

    async fn handle_command(&mut self, line: &str) -> Flow {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" => print_help(),
            "ls" => match self.session.list_documents() {
                Ok(names) if names.is_empty() => println!("No documents."),
                Ok(names) => {
                    for name in names {
                        println!("  {name}");
                    }
                }
                Err(e) => print_error(&e.to_string()),
            },
            "add" => {
                if rest.is_empty() {
                    print_error("Usage: add <path>");
                } else {
                    match self.session.add_document(Path::new(rest)) {
                        Ok(name) => println!("Added {}", name.cyan()),
                        Err(e) => print_error(&e.to_string()),
                    }
                }
            }
            "rm" => {
                if rest.is_empty() {
                    print_error("Usage: rm <name>");
                } else {
                    match self.session.remove_document(rest) {
                        Ok(()) => println!("Deleted {}", rest.cyan()),
                        Err(e) => print_error(&e.to_string()),
                    }
                }
            }
            "start" => {
                // Preflight so the operator hears about a missing daemon
                // here, not as a server startup failure in the log.
                if let Err(e) = askdoc_core::check_ollama_silent() {
                    println!("{} {e}", "Warning:".yellow().bold());
                }
                match self
                    .session
                    .start(&self.embed_model, &self.llm_model)
                {
                    Ok(StartOutcome::Started) => {
                        println!(
                            "Starting server ({} / {})...",
                            self.embed_model.cyan(),
                            self.llm_model.cyan()
                        );
                    }
                    Ok(StartOutcome::AlreadyRunning) => {
                        println!("{}", "Server is already running.".yellow());
                    }
                    Err(e) => print_error(&e.to_string()),
                }
            }
            "stop" => {
                if !self.session.is_running() {
                    println!("No server running.");
                }
                if let Err(e) = self.session.stop().await {
                    print_error(&e.to_string());
                }
            }
            "log" => {
                self.show_server_log = !self.show_server_log;
                println!(
                    "Server log {}.",
                    if self.show_server_log { "shown" } else { "hidden" }
                );
            }
            "ask" => {
                if rest.is_empty() {
                    print_error("Usage: ask <question>");
                } else {
                    self.pending_queries += 1;
                    println!("{}", "thinking...".dimmed());
                    self.session.dispatch_query(rest.to_string());
                }
            }
            "quit" | "exit" => return Flow::Quit,
            _ => print_error(&format!("Unknown command: {command} (try 'help')")),
        }

        Flow::Continue
    }

    fn handle_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::ServerLog(line) => {
                if self.show_server_log {
                    println!("{} {}", "[server]".dimmed(), line.dimmed());
                }
            }
            PanelEvent::ServerExit => {
                self.session.reap();
                println!("{}", "[server] process exited".dimmed());
            }
            PanelEvent::Answer { question, answer } => {
                self.pending_queries = self.pending_queries.saturating_sub(1);
                println!("{} {question}", "You:".bold());
                println!("{} {answer}", "askdoc:".bold().green());
                if self.pending_queries > 0 {
                    println!("{}", format!("({} still thinking...)", self.pending_queries).dimmed());
                }
                println!();
            }
            PanelEvent::QueryFailed { question, error } => {
                self.pending_queries = self.pending_queries.saturating_sub(1);
                println!("{} {question}", "You:".bold());
                print_error(&format!("Failed to get response: {error}"));
            }
        }
    }
}

fn prompt() {
    print!("{} ", "askdoc>".green());
    let _ = std::io::stdout().flush();
}

fn print_error(message: &str) {
    println!("{} {message}", "Error:".red().bold());
}

fn print_help() {
    println!("  {}              list documents", "ls".bold());
    println!("  {}      copy a file into the document folder", "add <path>".bold());
    println!("  {}       delete a document by name", "rm <name>".bold());
    println!("  {}           start the query server", "start".bold());
    println!("  {}            stop the query server", "stop".bold());
    println!("  {}             toggle the server log", "log".bold());
    println!("  {}  ask a question", "ask <question>".bold());
    println!("  {}            exit (stops the server)", "quit".bold());
}
