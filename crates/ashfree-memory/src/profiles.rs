use std::path::{Path, PathBuf};

use ashfree_schema::UserProfile;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{validate_user_id, MemoryError, Result};
use crate::knowledge::{read_json, write_atomic};
use crate::user_lock::UserLockManager;

const PROFILE_SUFFIX: &str = ".profile.json";

/// Files sharing the user's stem that go away with the profile.
const RELATED_SUFFIXES: &[&str] = &["_plan.json", "_cravings.json"];

/// User profiles stored as `{dir}/{user_id}.profile.json`.
#[derive(Clone)]
pub struct ProfileStore {
    dir: PathBuf,
    locks: UserLockManager,
}

impl ProfileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            locks: UserLockManager::new(),
        }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}{PROFILE_SUFFIX}"))
    }

    /// Stores a new profile. A blank id is replaced by a fresh UUID.
    pub async fn create(&self, mut profile: UserProfile) -> Result<UserProfile> {
        if profile.id.trim().is_empty() {
            profile.id = Uuid::new_v4().to_string();
        }
        validate_user_id(&profile.id)?;
        let _guard = self.locks.acquire(&profile.id).await;

        let path = self.path(&profile.id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(MemoryError::AlreadyExists(format!("user {}", profile.id)));
        }
        profile.created_at = Some(Utc::now());
        profile.updated_at = None;
        write_atomic(&path, &serde_json::to_vec_pretty(&profile)?).await?;
        tracing::info!(user_id = %profile.id, "profile created");
        Ok(profile)
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        validate_user_id(user_id)?;
        read_json(&self.path(user_id)).await
    }

    /// Merges `patch` into the stored profile. None if the user does not exist.
    ///
    /// `id` and `created_at` never change; present fields overwrite, extra keys
    /// are merged.
    pub async fn update(&self, user_id: &str, patch: UserProfile) -> Result<Option<UserProfile>> {
        validate_user_id(user_id)?;
        let _guard = self.locks.acquire(user_id).await;
        let path = self.path(user_id);
        let Some(mut profile) = read_json::<UserProfile>(&path).await? else {
            return Ok(None);
        };

        if patch.name.is_some() {
            profile.name = patch.name;
        }
        if patch.email.is_some() {
            profile.email = patch.email;
        }
        profile.extra.extend(patch.extra);
        profile.updated_at = Some(Utc::now());

        write_atomic(&path, &serde_json::to_vec_pretty(&profile)?).await?;
        Ok(Some(profile))
    }

    /// Removes the profile and the user's plan and craving files. False if
    /// there was no profile.
    pub async fn delete(&self, user_id: &str) -> Result<bool> {
        validate_user_id(user_id)?;
        let _guard = self.locks.acquire(user_id).await;
        let path = self.path(user_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(MemoryError::Persistence { path, source }),
        }

        for suffix in RELATED_SUFFIXES {
            let related = self.dir.join(format!("{user_id}{suffix}"));
            match tokio::fs::remove_file(&related).await {
                Ok(()) => tracing::debug!(path = %related.display(), "removed user file"),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    tracing::warn!(%error, path = %related.display(), "failed to remove user file")
                }
            }
        }
        tracing::info!(user_id, "profile deleted");
        Ok(true)
    }

    /// Every readable profile, ordered by id.
    pub async fn list(&self) -> Result<Vec<UserProfile>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MemoryError::Load {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut profiles = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(MemoryError::Load {
                        path: self.dir.clone(),
                        source,
                    })
                }
            };
            let path = entry.path();
            let is_profile = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(PROFILE_SUFFIX));
            if !is_profile {
                continue;
            }
            match read_json::<UserProfile>(&path).await {
                Ok(Some(profile)) => profiles.push(profile),
                Ok(None) => {}
                Err(error) => tracing::warn!(%error, "skipping unreadable profile"),
            }
        }
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn named(id: &str, name: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            name: Some(name.into()),
            ..UserProfile::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamp() {
        let tmp = TempDir::new().unwrap();
        let store = ProfileStore::new(tmp.path());
        let created = store.create(named("", "Sam")).await.unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());
        assert!(created.created_at.is_some());
        assert_eq!(store.get(&created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = ProfileStore::new(tmp.path());
        store.create(named("alice", "Alice")).await.unwrap();
        let err = store.create(named("alice", "Other")).await.unwrap_err();
        assert!(matches!(err, MemoryError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let tmp = TempDir::new().unwrap();
        let store = ProfileStore::new(tmp.path());
        let mut original = named("bob", "Bob");
        original.extra.insert("packsPerDay".into(), serde_json::json!(1));
        let created = store.create(original).await.unwrap();

        let mut patch = UserProfile {
            email: Some("bob@example.com".into()),
            ..UserProfile::default()
        };
        patch.extra.insert("brand".into(), serde_json::json!("none"));
        let updated = store.update("bob", patch).await.unwrap().unwrap();

        assert_eq!(updated.id, "bob");
        assert_eq!(updated.name.as_deref(), Some("Bob"));
        assert_eq!(updated.email.as_deref(), Some("bob@example.com"));
        assert_eq!(updated.extra["packsPerDay"], 1);
        assert_eq!(updated.extra["brand"], "none");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());

        assert!(store
            .update("nobody", UserProfile::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_removes_related_files() {
        let tmp = TempDir::new().unwrap();
        let store = ProfileStore::new(tmp.path());
        store.create(named("carol", "Carol")).await.unwrap();
        std::fs::write(tmp.path().join("carol_plan.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("carol_cravings.json"), "[]").unwrap();
        std::fs::write(tmp.path().join("dave_plan.json"), "{}").unwrap();

        assert!(store.delete("carol").await.unwrap());
        assert!(!tmp.path().join("carol_plan.json").exists());
        assert!(!tmp.path().join("carol_cravings.json").exists());
        assert!(tmp.path().join("dave_plan.json").exists());
        assert!(store.get("carol").await.unwrap().is_none());
        assert!(!store.delete("carol").await.unwrap());
    }

    #[tokio::test]
    async fn list_ignores_other_user_files() {
        let tmp = TempDir::new().unwrap();
        let store = ProfileStore::new(tmp.path());
        assert!(store.list().await.unwrap().is_empty());

        store.create(named("zed", "Zed")).await.unwrap();
        store.create(named("amy", "Amy")).await.unwrap();
        std::fs::write(tmp.path().join("amy_plan.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("broken.profile.json"), "nope").unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["amy".to_string(), "zed".to_string()]);
    }
}
