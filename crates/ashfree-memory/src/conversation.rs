use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ashfree_schema::ConversationTurn;
use async_trait::async_trait;
use chrono::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{validate_user_id, MemoryError, Result};
use crate::user_lock::UserLockManager;

/// Where conversation turns live between process restarts.
#[async_trait]
pub trait TurnPersistence: Send + Sync {
    /// Every stored turn for `user_id`, oldest first.
    async fn load(&self, user_id: &str) -> Result<Vec<ConversationTurn>>;
    async fn append(&self, user_id: &str, turn: &ConversationTurn) -> Result<()>;
}

/// One JSONL file per user: `{dir}/{user_id}.jsonl`.
pub struct JsonlTurnStore {
    dir: PathBuf,
}

impl JsonlTurnStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}.jsonl"))
    }
}

#[async_trait]
impl TurnPersistence for JsonlTurnStore {
    async fn load(&self, user_id: &str) -> Result<Vec<ConversationTurn>> {
        let path = self.path(user_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(MemoryError::Load { path, source }),
        };

        let mut turns = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ConversationTurn>(line) {
                Ok(turn) => turns.push(turn),
                Err(error) => warn!(user_id, line = index + 1, %error, "skipping unparsable turn"),
            }
        }
        Ok(turns)
    }

    async fn append(&self, user_id: &str, turn: &ConversationTurn) -> Result<()> {
        let path = self.path(user_id);
        let persistence = |source| MemoryError::Persistence {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(persistence)?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(persistence)?;
        let mut line = serde_json::to_string(turn)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await.map_err(persistence)?;
        file.flush().await.map_err(persistence)
    }
}

/// Volatile persistence, used when no conversation directory is configured.
#[derive(Default)]
pub struct InMemoryTurnStore {
    turns: Mutex<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TurnPersistence for InMemoryTurnStore {
    async fn load(&self, user_id: &str) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .turns
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, user_id: &str, turn: &ConversationTurn) -> Result<()> {
        self.turns
            .lock()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(turn.clone());
        Ok(())
    }
}

/// Turns kept in memory per user when no window is configured.
pub const DEFAULT_TAIL_WINDOW: usize = 50;

/// The newest turns of one user's log.
struct Tail {
    turns: VecDeque<ConversationTurn>,
    /// Older turns exist in persistence but not here.
    truncated: bool,
}

impl Tail {
    fn from_loaded(mut turns: Vec<ConversationTurn>, window: usize) -> Self {
        let start = turns.len().saturating_sub(window);
        Self {
            truncated: start > 0,
            turns: turns.drain(start..).collect(),
        }
    }

    fn push(&mut self, turn: ConversationTurn, window: usize) {
        self.turns.push_back(turn);
        while self.turns.len() > window {
            self.turns.pop_front();
            self.truncated = true;
        }
    }
}

/// Append-only per-user conversation log.
///
/// Only the newest `tail_window` turns per user stay cached; longer reads go
/// to persistence. Appends for one user are serialized; different users never
/// contend.
pub struct ConversationStore {
    persistence: Arc<dyn TurnPersistence>,
    cache: Mutex<HashMap<String, Arc<Mutex<Tail>>>>,
    locks: UserLockManager,
    tail_window: usize,
}

impl ConversationStore {
    pub fn new(persistence: Arc<dyn TurnPersistence>) -> Self {
        Self {
            persistence,
            cache: Mutex::new(HashMap::new()),
            locks: UserLockManager::new(),
            tail_window: DEFAULT_TAIL_WINDOW,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryTurnStore::new()))
    }

    /// Caps the cached turns per user. Values below 1 are raised to 1.
    pub fn with_tail_window(mut self, window: usize) -> Self {
        self.tail_window = window.max(1);
        self
    }

    async fn tail_for(&self, user_id: &str) -> Result<Arc<Mutex<Tail>>> {
        if let Some(tail) = self.cache.lock().await.get(user_id) {
            return Ok(tail.clone());
        }
        let loaded = self.persistence.load(user_id).await?;
        let mut cache = self.cache.lock().await;
        Ok(cache
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Tail::from_loaded(loaded, self.tail_window))))
            .clone())
    }

    /// Stores `turn` at the end of the user's log and returns the stored copy.
    ///
    /// A timestamp that is not strictly after the previous turn's is moved to
    /// one microsecond past it. The turn is kept in memory even when writing
    /// it through to persistence fails; that failure is returned.
    pub async fn append(
        &self,
        user_id: &str,
        mut turn: ConversationTurn,
    ) -> Result<ConversationTurn> {
        validate_user_id(user_id)?;
        let _guard = self.locks.acquire(user_id).await;
        let tail = self.tail_for(user_id).await?;
        let mut tail = tail.lock().await;

        if let Some(last) = tail.turns.back() {
            if turn.timestamp <= last.timestamp {
                turn.timestamp = last.timestamp + Duration::microseconds(1);
            }
        }
        tail.push(turn.clone(), self.tail_window);
        drop(tail);

        self.persistence.append(user_id, &turn).await?;
        Ok(turn)
    }

    /// The last `n` turns, oldest first.
    pub async fn recent(&self, user_id: &str, n: usize) -> Result<Vec<ConversationTurn>> {
        validate_user_id(user_id)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        {
            let tail = self.tail_for(user_id).await?;
            let tail = tail.lock().await;
            if n <= tail.turns.len() || !tail.truncated {
                let start = tail.turns.len().saturating_sub(n);
                return Ok(tail.turns.range(start..).cloned().collect());
            }
        }

        let _guard = self.locks.acquire(user_id).await;
        let mut turns = self.persistence.load(user_id).await?;
        let start = turns.len().saturating_sub(n);
        Ok(turns.split_off(start))
    }

    #[cfg(test)]
    async fn cached_len(&self, user_id: &str) -> usize {
        match self.cache.lock().await.get(user_id) {
            Some(tail) => tail.lock().await.turns.len(),
            None => 0,
        }
    }
}
