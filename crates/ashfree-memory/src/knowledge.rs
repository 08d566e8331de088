use std::path::{Path, PathBuf};
use std::sync::Arc;

use ashfree_schema::KnowledgePassage;
use tokio::sync::RwLock;

use crate::error::{MemoryError, Result};

type Snapshot = Arc<Vec<KnowledgePassage>>;

/// Reference passages the retriever scans.
///
/// The backing file (a JSON array of passages) is read on first access.
/// Readers get an `Arc` snapshot and never hold the lock while they work.
pub struct KnowledgeStore {
    path: Option<PathBuf>,
    passages: RwLock<Option<Snapshot>>,
}

impl KnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            passages: RwLock::new(None),
        }
    }

    /// A store with no backing file.
    pub fn in_memory(passages: Vec<KnowledgePassage>) -> Self {
        Self {
            path: None,
            passages: RwLock::new(Some(Arc::new(passages))),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        if let Some(loaded) = self.passages.read().await.as_ref() {
            return Ok(loaded.clone());
        }

        let mut slot = self.passages.write().await;
        if let Some(loaded) = slot.as_ref() {
            return Ok(loaded.clone());
        }
        let loaded = Arc::new(self.load().await?);
        tracing::info!(passages = loaded.len(), "knowledge base loaded");
        *slot = Some(loaded.clone());
        Ok(loaded)
    }

    /// Adds a passage. Returns `Ok(false)` when a passage with identical
    /// text already exists.
    ///
    /// The in-memory copy is updated before the file is written, so a
    /// persistence error still leaves the passage retrievable.
    pub async fn append(&self, passage: KnowledgePassage) -> Result<bool> {
        let current = self.snapshot().await?;
        let mut slot = self.passages.write().await;
        let current = slot.clone().unwrap_or(current);

        if current.iter().any(|p| p.text == passage.text) {
            return Ok(false);
        }

        let mut next = current.as_ref().clone();
        next.push(passage);
        let next = Arc::new(next);
        *slot = Some(next.clone());

        // Writer lock stays held so file writes land in append order.
        self.persist(&next).await?;
        Ok(true)
    }

    /// Swaps the whole passage set, the only way passages are removed.
    pub async fn replace(&self, passages: Vec<KnowledgePassage>) -> Result<()> {
        let next = Arc::new(passages);
        let mut slot = self.passages.write().await;
        *slot = Some(next.clone());
        self.persist(&next).await
    }

    async fn load(&self) -> Result<Vec<KnowledgePassage>> {
        let Some(path) = self.path.as_ref() else {
            return Ok(Vec::new());
        };
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "knowledge base file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(MemoryError::Load {
                    path: path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| MemoryError::Malformed {
            path: path.clone(),
            source,
        })
    }

    async fn persist(&self, passages: &[KnowledgePassage]) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let body = serde_json::to_vec_pretty(passages)?;
        write_atomic(path, &body).await
    }
}

/// Write to a sibling temp file, then rename over the target.
/// `None` when the file does not exist.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(MemoryError::Load {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| MemoryError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) async fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    let persistence = |source| MemoryError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await.map_err(persistence)?;
    tokio::fs::rename(&tmp, path).await.map_err(persistence)
}
