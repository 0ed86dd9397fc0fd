use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::engine::model::{CycleDigest, CycleReport, OptimizationResult};
use crate::error::OptimizerResult;

pub const SUMMARY_FILE_NAME: &str = "optimization_summary.json";

/// One line of the append-only audit log.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Result {
        cycle_id: uuid::Uuid,
        #[serde(flatten)]
        result: OptimizationResult,
    },
    Cycle(CycleDigest),
    Aborted {
        ts: DateTime<Utc>,
        campaign_id: String,
        reason: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub cycles: u64,
    pub aborted_cycles: u64,

    /// Recommendations the gate let through
    pub attempted: u64,
    pub executed: u64,
    /// Held back by the gate
    pub gated: u64,
    pub failed: u64,

    pub last_confidence: Option<u8>,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Appends cycle outcomes to a JSONL file and keeps per-campaign totals.
///
/// File problems are logged and never reach the caller.
pub struct OptimizationLog {
    log_path: Option<PathBuf>,
    summaries: DashMap<String, OptimizationSummary>,
    /// Serializes appends so lines from concurrent cycles never interleave
    write_lock: Mutex<()>,
}

impl OptimizationLog {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        match &log_path {
            Some(path) => info!("📈 [REPORT] Optimization log: {}", path.display()),
            None => info!("📈 [REPORT] Optimization log kept in memory only"),
        }
        Self {
            log_path,
            summaries: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn summary(&self, campaign_id: &str) -> Option<OptimizationSummary> {
        self.summaries.get(campaign_id).map(|s| s.clone())
    }

    pub async fn record(&self, report: &CycleReport) {
        {
            let mut s = self.summaries.entry(report.campaign_id.clone()).or_default();
            s.cycles += 1;
            s.attempted += report.results.iter().filter(|r| r.was_attempted()).count() as u64;
            s.executed += report.executed_count() as u64;
            s.gated += report.gated_count() as u64;
            s.failed += report.failed_count() as u64;
            s.last_confidence = Some(report.confidence);
            s.last_cycle_at = Some(report.finished_at);
        }

        let mut entries: Vec<LogEntry> = report
            .results
            .iter()
            .map(|result| LogEntry::Result {
                cycle_id: report.cycle_id,
                result: result.clone(),
            })
            .collect();
        entries.push(LogEntry::Cycle(report.digest()));

        self.write(&entries).await;
    }

    pub async fn record_aborted(&self, campaign_id: &str, reason: &str) {
        {
            let mut s = self.summaries.entry(campaign_id.to_string()).or_default();
            s.aborted_cycles += 1;
        }

        let entry = LogEntry::Aborted {
            ts: Utc::now(),
            campaign_id: campaign_id.to_string(),
            reason: reason.to_string(),
        };
        self.write(std::slice::from_ref(&entry)).await;
    }

    async fn write(&self, entries: &[LogEntry]) {
        let Some(log_path) = &self.log_path else {
            return;
        };

        let _guard = self.write_lock.lock().await;
        if let Err(e) = append_jsonl(log_path, entries) {
            error!("[REPORT] Failed to append to {}: {}", log_path.display(), e);
        }
        if let Err(e) = self.flush_summary(log_path) {
            error!("[REPORT] Failed to flush summary: {}", e);
        }
    }

    fn flush_summary(&self, log_path: &Path) -> OptimizerResult<()> {
        let summary_path = log_path.with_file_name(SUMMARY_FILE_NAME);

        let snapshot: std::collections::BTreeMap<String, OptimizationSummary> = self
            .summaries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        std::fs::write(summary_path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }
}

fn append_jsonl(path: &Path, entries: &[LogEntry]) -> OptimizerResult<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut f = std::fs::OpenOptions::new().create(true).append(true).open(path)?;

    for entry in entries {
        let line = serde_json::to_string(entry)?;
        writeln!(f, "{}", line)?;
    }
    Ok(())
}
