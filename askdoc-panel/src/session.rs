//! Panel session: the one owner of the managed server process, the
//! document folder, and query dispatch.
//!
//! Background work never touches the display directly. The per-stream
//! reader tasks and the per-question dispatch tasks all report back
//! through a single event channel; the console loop is the only consumer
//! and the only writer of the screen.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::warn;

/// Events marshaled back to the console loop.
#[derive(Debug)]
pub enum PanelEvent {
    /// A line of the server's combined stdout/stderr output.
    ServerLog(String),
    /// The server closed its output stream.
    ServerExit,
    /// A dispatched question came back with an answer.
    Answer { question: String, answer: String },
    /// A dispatched question failed at the HTTP or protocol level.
    QueryFailed { question: String, error: String },
}

/// Result of a start request.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A tracked process is still alive; nothing was spawned.
    AlreadyRunning,
}

/// Owns the tracked server child process for one panel session.
///
/// At most one server process is live per session: starting while one is
/// running is a no-op, and every exit path stops the child so no orphan
/// survives the panel.
pub struct PanelSession {
    server_bin: PathBuf,
    data_dir: PathBuf,
    base_url: String,
    grace_period: Duration,
    http: reqwest::Client,
    child: Option<Child>,
    events: mpsc::UnboundedSender<PanelEvent>,
}

impl PanelSession {
    pub fn new(
        server_bin: PathBuf,
        data_dir: PathBuf,
        base_url: String,
        grace_period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PanelEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            server_bin,
            data_dir,
            base_url,
            grace_period,
            http: reqwest::Client::new(),
            child: None,
            events,
        };
        (session, receiver)
    }

    /// Whether a tracked child is still alive.
    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// OS pid of the tracked child, if one is live.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Clears the tracked handle if the child has already exited.
    pub fn reap(&mut self) {
        if let Some(child) = &mut self.child {
            if !matches!(child.try_wait(), Ok(None)) {
                self.child = None;
            }
        }
    }

    /// Spawns the server with the given backend identifiers.
    ///
    /// No-op when a tracked process is still alive. One reader task per
    /// output stream forwards each line to the event channel until the
    /// stream closes.
    pub fn start(&mut self, embed_model: &str, llm_model: &str) -> Result<StartOutcome> {
        if self.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.child = None;

        let mut child = Command::new(&self.server_bin)
            .arg(embed_model)
            .arg(llm_model)
            .arg("--data-dir")
            .arg(&self.data_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.server_bin.display()))?;

        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, self.events.clone(), true);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, self.events.clone(), false);
        }

        self.child = Some(child);
        Ok(StartOutcome::Started)
    }

    /// Stops the tracked server, if any.
    ///
    /// Requests graceful termination, waits up to the grace period, then
    /// force-kills. The handle is always cleared, so the next `start` is
    /// a fresh launch.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if matches!(child.try_wait(), Ok(None)) {
            if let Some(pid) = child.id() {
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }

            match tokio::time::timeout(self.grace_period, child.wait()).await {
                Ok(status) => {
                    status.context("Failed waiting for server to stop")?;
                }
                Err(_) => {
                    warn!("Server did not stop within grace period, killing");
                    child
                        .kill()
                        .await
                        .context("Failed to kill server process")?;
                }
            }
        }

        let _ = self.events.send(PanelEvent::ServerLog("server stopped.".to_string()));
        Ok(())
    }

    /// Dispatches a question to the running server without blocking.
    ///
    /// The HTTP call runs on its own task; the outcome comes back as an
    /// [`PanelEvent::Answer`] or [`PanelEvent::QueryFailed`] event. There
    /// is no cancellation of an in-flight question.
    pub fn dispatch_query(&self, question: String) {
        let http = self.http.clone();
        let url = format!("{}/query", self.base_url);
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = match post_query(&http, &url, &question).await {
                Ok(answer) => PanelEvent::Answer { question, answer },
                Err(error) => PanelEvent::QueryFailed { question, error },
            };
            let _ = events.send(event);
        });
    }

    /// Copies a file into the document folder, creating it if needed.
    /// Returns the filename the document is stored under.
    pub fn add_document(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("Not a file path: {}", path.display()))?;

        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        std::fs::copy(path, self.data_dir.join(&name))
            .with_context(|| format!("Failed to add document {}", path.display()))?;

        Ok(name)
    }

    /// Deletes a document from the folder by filename.
    pub fn remove_document(&self, name: &str) -> Result<()> {
        if name.contains(std::path::MAIN_SEPARATOR) || name.contains("..") {
            bail!("Document names are plain filenames: {name}");
        }

        std::fs::remove_file(self.data_dir.join(name))
            .with_context(|| format!("Failed to delete document {name}"))
    }

    /// Lists the document folder, sorted by filename.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            // A folder that doesn't exist yet is just empty.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.data_dir.display()))
            }
        };

        for entry in entries {
            let entry = entry.context("Failed to read document folder entry")?;
            if entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

impl Drop for PanelSession {
    // Last-resort cleanup; every ordinary exit path calls stop() first.
    fn drop(&mut self) {
        if let Some(child) = &mut self.child {
            let _ = child.start_kill();
        }
    }
}

fn spawn_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    events: mpsc::UnboundedSender<PanelEvent>,
    notify_exit: bool,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if events.send(PanelEvent::ServerLog(line)).is_err() {
                return;
            }
        }
        if notify_exit {
            let _ = events.send(PanelEvent::ServerExit);
        }
    });
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    error: String,
}

async fn post_query(
    http: &reqwest::Client,
    url: &str,
    question: &str,
) -> std::result::Result<String, String> {
    let response = http
        .post(url)
        .json(&serde_json::json!({ "query": question }))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if status.is_success() {
        let body: QueryResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.response)
    } else {
        let detail = match response.json::<QueryError>().await {
            Ok(body) => body.error,
            Err(_) => "unreadable error body".to_string(),
        };
        Err(format!("{status}: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;
    use tokio::time::timeout;

    const GRACE: Duration = Duration::from_millis(300);

    fn script_session(
        script: &str,
        grace: Duration,
    ) -> (
        PanelSession,
        mpsc::UnboundedReceiver<PanelEvent>,
        TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("fake-server.sh");
        std::fs::write(&bin, script).unwrap();
        let mut perms = std::fs::metadata(&bin).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&bin, perms).unwrap();

        let (session, receiver) = PanelSession::new(
            bin,
            dir.path().join("data"),
            "http://127.0.0.1:9".to_string(),
            grace,
        );
        (session, receiver, dir)
    }

    fn process_gone(pid: u32) -> bool {
        unsafe { libc::kill(pid as libc::pid_t, 0) != 0 }
    }

    fn process_gone_or_zombie(pid: u32) -> bool {
        if process_gone(pid) {
            return true;
        }
        std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .map(|stat| stat.contains(") Z "))
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn second_start_is_a_noop() {
        let (mut session, _rx, _dir) =
            script_session("#!/bin/sh\nexec sleep 30\n", GRACE);

        assert_eq!(session.start("e", "l").unwrap(), StartOutcome::Started);
        let pid = session.pid().unwrap();

        assert_eq!(
            session.start("e", "l").unwrap(),
            StartOutcome::AlreadyRunning
        );
        assert_eq!(session.pid(), Some(pid), "no second process spawned");

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_terminates_gracefully() {
        let (mut session, mut rx, _dir) =
            script_session("#!/bin/sh\nexec sleep 30\n", Duration::from_secs(5));

        session.start("e", "l").unwrap();
        let pid = session.pid().unwrap();

        session.stop().await.unwrap();

        assert!(!session.is_running());
        assert!(session.pid().is_none());
        assert!(process_gone(pid), "child must be fully reaped");

        // The stopped marker is always appended.
        let mut saw_marker = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(&event, PanelEvent::ServerLog(line) if line == "server stopped.") {
                saw_marker = true;
            }
        }
        assert!(saw_marker);
    }

    #[tokio::test]
    async fn stop_force_kills_after_grace_period() {
        let (mut session, _rx, _dir) = script_session(
            "#!/bin/sh\ntrap '' TERM\nwhile :; do sleep 1; done\n",
            GRACE,
        );

        session.start("e", "l").unwrap();
        let pid = session.pid().unwrap();

        let started = std::time::Instant::now();
        session.stop().await.unwrap();

        assert!(process_gone(pid), "kill path must fire for a stuck child");
        assert!(
            started.elapsed() >= GRACE,
            "graceful wait should have run its course first"
        );
    }

    #[tokio::test]
    async fn stop_without_child_is_a_noop() {
        let (mut session, mut rx, _dir) =
            script_session("#!/bin/sh\nexec sleep 30\n", GRACE);

        session.stop().await.unwrap();
        assert!(rx.try_recv().is_err(), "no marker without a tracked process");
    }

    #[tokio::test]
    async fn drop_leaves_no_orphan() {
        let (mut session, _rx, _dir) =
            script_session("#!/bin/sh\nexec sleep 30\n", GRACE);

        session.start("e", "l").unwrap();
        let pid = session.pid().unwrap();
        drop(session);

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while std::time::Instant::now() < deadline {
            if process_gone_or_zombie(pid) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("child survived session drop");
    }

    #[tokio::test]
    async fn reader_forwards_output_lines() {
        let (mut session, mut rx, _dir) = script_session(
            "#!/bin/sh\necho hello from server\nexec sleep 30\n",
            GRACE,
        );

        session.start("e", "l").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("log line should arrive")
            .expect("channel open");
        assert!(
            matches!(&event, PanelEvent::ServerLog(line) if line == "hello from server"),
            "got {event:?}"
        );

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_after_child_exit_is_fresh() {
        let (mut session, mut rx, _dir) =
            script_session("#!/bin/sh\nexit 0\n", GRACE);

        session.start("e", "l").unwrap();

        // Wait for the child to finish via the exit event, then reap.
        loop {
            let event = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("exit event should arrive")
                .expect("channel open");
            if matches!(event, PanelEvent::ServerExit) {
                break;
            }
        }
        session.reap();
        assert!(session.pid().is_none());

        assert_eq!(session.start("e", "l").unwrap(), StartOutcome::Started);
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn dispatch_query_reports_network_failure() {
        let (session, mut rx, _dir) =
            script_session("#!/bin/sh\nexec sleep 30\n", GRACE);

        // Nothing is listening on the session's base URL.
        session.dispatch_query("What is X?".to_string());

        let event = timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("failure event should arrive")
            .expect("channel open");
        match event {
            PanelEvent::QueryFailed { question, .. } => assert_eq!(question, "What is X?"),
            other => panic!("expected QueryFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn document_folder_management() {
        let (session, _rx, dir) = script_session("#!/bin/sh\nexit 0\n", GRACE);

        assert!(session.list_documents().unwrap().is_empty());

        let source = dir.path().join("guide.txt");
        std::fs::write(&source, "contents").unwrap();
        let name = session.add_document(&source).unwrap();
        assert_eq!(name, "guide.txt");
        assert_eq!(session.list_documents().unwrap(), vec!["guide.txt"]);

        session.remove_document("guide.txt").unwrap();
        assert!(session.list_documents().unwrap().is_empty());

        assert!(session.remove_document("../escape").is_err());
        assert!(session.remove_document("missing.txt").is_err());
    }
}
