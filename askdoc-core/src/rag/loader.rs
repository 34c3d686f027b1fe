//! Flat-folder document loading.
//!
//! The document store is a single flat directory: identity is the
//! filename, files are added or removed whole by the operator, never
//! edited in place. A missing or unreadable folder is fatal at startup;
//! an unreadable individual file is skipped with a warning.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Document folder {0:?} is missing or unreadable: {1}")]
    Folder(PathBuf, #[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LoaderError>;

/// A source document read from the folder.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Filename within the document folder.
    pub name: String,
    pub content: String,
}

/// Reads every regular file in the document folder.
///
/// Subdirectories are ignored (the layout is flat by contract). File
/// contents are decoded as UTF-8, lossily. Results are sorted by
/// filename so the index build is deterministic.
pub(crate) async fn load_dir(dir: &Path) -> Result<Vec<LoadedDocument>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| LoaderError::Folder(dir.to_path_buf(), e))?;

    let mut documents = Vec::new();

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return Err(LoaderError::Folder(dir.to_path_buf(), e)),
        };

        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        match fs::read(&path).await {
            Ok(bytes) => documents.push(LoadedDocument {
                name,
                content: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable document");
            }
        }
    }

    documents.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(documents)
}
