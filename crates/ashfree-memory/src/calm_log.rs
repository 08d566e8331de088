use std::path::{Path, PathBuf};

use ashfree_schema::CalmRecord;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{MemoryError, Result};

/// Append-only JSONL journal of calm-down sessions, shared by all users.
pub struct CalmJournal {
    path: PathBuf,
    write: Mutex<()>,
}

impl CalmJournal {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write: Mutex::new(()),
        }
    }

    pub async fn record(&self, record: &CalmRecord) -> Result<()> {
        let persistence = |source| MemoryError::Persistence {
            path: self.path.clone(),
            source,
        };
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(persistence)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(persistence)?;
        file.write_all(line.as_bytes()).await.map_err(persistence)?;
        file.flush().await.map_err(persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashfree_schema::UserContext;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(user_id: &str, emergency_mode: bool) -> CalmRecord {
        CalmRecord {
            user_id: user_id.into(),
            timestamp: Utc::now(),
            context: UserContext::default(),
            message: "Breathe.".into(),
            emergency_mode,
        }
    }

    #[tokio::test]
    async fn records_are_appended_one_per_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("calm_interactions.jsonl");
        let journal = Arc::new(CalmJournal::new(&path));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let journal = journal.clone();
                tokio::spawn(async move {
                    journal.record(&record(&format!("u{i}"), i % 2 == 0)).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<CalmRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 10);
        assert_eq!(parsed.iter().filter(|r| r.emergency_mode).count(), 5);
    }
}
