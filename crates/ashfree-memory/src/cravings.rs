use std::path::{Path, PathBuf};

use ashfree_schema::{CravingEntry, CravingLevel, CravingStats, CravingSummary};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{validate_user_id, MemoryError, Result};
use crate::knowledge::write_atomic;
use crate::user_lock::UserLockManager;

const UNKNOWN_TRIGGER: &str = "Unknown";
const NO_STRATEGY: &str = "None";

/// Per-user craving journal stored as `{dir}/{user_id}_cravings.json`.
#[derive(Clone)]
pub struct CravingLog {
    dir: PathBuf,
    locks: UserLockManager,
}

impl CravingLog {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            locks: UserLockManager::new(),
        }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}_cravings.json"))
    }

    async fn load(&self, user_id: &str) -> Result<Vec<CravingEntry>> {
        let path = self.path(user_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(MemoryError::Load { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| MemoryError::Malformed { path, source })
    }

    /// Records a craving, filling in `id` and `timestamp` when absent.
    pub async fn log(&self, user_id: &str, mut entry: CravingEntry) -> Result<CravingEntry> {
        validate_user_id(user_id)?;
        let _guard = self.locks.acquire(user_id).await;

        entry.id.get_or_insert_with(|| format!("craving_{}", Uuid::now_v7()));
        entry.timestamp.get_or_insert_with(Utc::now);

        let mut entries = self.load(user_id).await?;
        entries.push(entry.clone());
        let body = serde_json::to_vec_pretty(&entries)?;
        write_atomic(&self.path(user_id), &body).await?;

        tracing::debug!(user_id, intensity = ?entry.intensity, "craving logged");
        Ok(entry)
    }

    /// Up to `limit` entries, newest first.
    pub async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<CravingEntry>> {
        validate_user_id(user_id)?;
        let mut entries = self.load(user_id).await?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    pub async fn stats(&self, user_id: &str) -> Result<CravingStats> {
        validate_user_id(user_id)?;
        Ok(compute_stats(&self.load(user_id).await?))
    }

    /// Prompt-sized digest, or None when the user never logged a craving.
    pub async fn summary(&self, user_id: &str) -> Result<Option<CravingSummary>> {
        validate_user_id(user_id)?;
        let entries = self.load(user_id).await?;
        if entries.is_empty() {
            return Ok(None);
        }

        let total = entries.len();
        let sum: u32 = entries.iter().map(|e| u32::from(e.intensity.score())).sum();
        let cutoff = Utc::now() - Duration::hours(24);
        let last_24h = entries
            .iter()
            .filter(|e| e.timestamp.is_some_and(|ts| ts >= cutoff))
            .count();

        Ok(Some(CravingSummary {
            total,
            average_intensity: Some(sum as f32 / total as f32),
            last_24h,
        }))
    }
}

pub fn compute_stats(entries: &[CravingEntry]) -> CravingStats {
    let mut stats = CravingStats {
        total_cravings: entries.len(),
        ..CravingStats::default()
    };
    for level in [CravingLevel::Low, CravingLevel::Medium, CravingLevel::High] {
        stats.intensities.insert(level, 0);
    }

    for entry in entries {
        let trigger = entry.trigger.as_deref().unwrap_or(UNKNOWN_TRIGGER);
        *stats.triggers.entry(trigger.to_string()).or_default() += 1;
        *stats.intensities.entry(entry.intensity).or_default() += 1;
        let strategy = entry.coping_strategy.as_deref().unwrap_or(NO_STRATEGY);
        *stats
            .coping_strategies
            .entry(strategy.to_string())
            .or_default() += 1;
    }

    if !entries.is_empty() {
        let resisted = entries.iter().filter(|e| !e.smoked).count();
        let rate = resisted as f64 / entries.len() as f64 * 100.0;
        stats.success_rate = (rate * 10.0).round() / 10.0;
    }
    stats
}
