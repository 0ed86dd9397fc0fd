//! Remembers which campaigns are under scheduled optimization so jobs come
//! back after a restart.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::OptimizerResult;

pub const ACTIVE_JOBS_FILE_NAME: &str = "active_jobs.json";

/// JSON list of campaign ids, rewritten on every start/stop.
#[derive(Clone, Debug, Default)]
pub struct ActiveJobStore {
    path: Option<PathBuf>,
}

impl ActiveJobStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Keeps nothing; restarts begin with no jobs.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Places the file next to the optimization log.
    pub fn beside_log(log_path: Option<&Path>) -> Self {
        Self::new(log_path.map(|p| p.with_file_name(ACTIVE_JOBS_FILE_NAME)))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A missing file means no jobs.
    pub fn load(&self) -> OptimizerResult<Vec<String>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            debug!("[JOBS] No active job file at {}", path.display());
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(path)?;
        let ids: Vec<String> = serde_json::from_str(&raw)?;
        info!("[JOBS] Loaded {} active job(s) from {}", ids.len(), path.display());
        Ok(ids)
    }

    pub fn save(&self, campaign_ids: &[String]) -> OptimizerResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(campaign_ids)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimizerError;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActiveJobStore::new(Some(dir.path().join("active_jobs.json")));
        assert!(store.load().unwrap().is_empty());
        assert!(ActiveJobStore::in_memory().load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("logs").join("optimizations.jsonl");
        let store = ActiveJobStore::beside_log(Some(&log_path));
        assert_eq!(store.path(), Some(dir.path().join("logs").join(ACTIVE_JOBS_FILE_NAME).as_path()));

        store.save(&["c1".to_string(), "c2".to_string()]).unwrap();
        assert_eq!(store.load().unwrap(), vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACTIVE_JOBS_FILE_NAME);
        std::fs::write(&path, "{not json").unwrap();

        let err = ActiveJobStore::new(Some(path)).load().unwrap_err();
        assert!(matches!(err, OptimizerError::Serialization(_)));
    }
}
