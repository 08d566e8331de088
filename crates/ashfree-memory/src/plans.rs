use std::path::{Path, PathBuf};

use ashfree_schema::QuitPlan;

use crate::error::{validate_user_id, Result};
use crate::knowledge::{read_json, write_atomic};
use crate::user_lock::UserLockManager;

/// Quit plans stored as `{dir}/{user_id}_plan.json`.
#[derive(Clone)]
pub struct PlanStore {
    dir: PathBuf,
    locks: UserLockManager,
}

impl PlanStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            locks: UserLockManager::new(),
        }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}_plan.json"))
    }

    /// The stored plan, or None if the user never saved one.
    pub async fn get(&self, user_id: &str) -> Result<Option<QuitPlan>> {
        validate_user_id(user_id)?;
        read_json(&self.path(user_id)).await
    }

    /// Replaces the user's plan wholesale.
    pub async fn put(&self, user_id: &str, plan: QuitPlan) -> Result<QuitPlan> {
        validate_user_id(user_id)?;
        let _guard = self.locks.acquire(user_id).await;
        write_atomic(&self.path(user_id), &serde_json::to_vec_pretty(&plan)?).await?;
        tracing::debug!(user_id, quit_date = ?plan.quit_date, "quit plan saved");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_plan_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = PlanStore::new(tmp.path());
        assert!(store.get("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_and_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = PlanStore::new(tmp.path());
        let plan = QuitPlan {
            quit_date: NaiveDate::from_ymd_opt(2026, 1, 5),
            triggers: vec!["coffee".into()],
            ..QuitPlan::default()
        };
        store.put("alice", plan.clone()).await.unwrap();
        assert_eq!(store.get("alice").await.unwrap(), Some(plan));
        assert!(tmp.path().join("alice_plan.json").exists());

        store.put("alice", QuitPlan::default()).await.unwrap();
        let stored = store.get("alice").await.unwrap().unwrap();
        assert!(stored.triggers.is_empty());
        assert!(stored.quit_date.is_none());
    }

    #[tokio::test]
    async fn corrupt_plan_is_reported() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bob_plan.json"), "{not json").unwrap();
        let store = PlanStore::new(tmp.path());
        assert!(matches!(
            store.get("bob").await,
            Err(MemoryError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_invalid_user_ids() {
        let tmp = TempDir::new().unwrap();
        let store = PlanStore::new(tmp.path());
        assert!(store.put("../x", QuitPlan::default()).await.is_err());
    }
}
