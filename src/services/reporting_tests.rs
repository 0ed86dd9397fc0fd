//! Unit tests for the reporting module - audit log and per-campaign summaries.

#[cfg(test)]
mod reporting_tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::engine::model::{
        CycleReport, CycleTrigger, OptimizationAction, OptimizationResult, Priority, Recommendation,
    };
    use crate::services::reporting::*;

    fn rec(priority: Priority) -> Recommendation {
        Recommendation {
            action: OptimizationAction::BidIncrease {
                platform: "google_ads".to_string(),
                adjustment: 0.1,
            },
            priority,
            reason: "CPA below target".to_string(),
        }
    }

    fn report(results: Vec<OptimizationResult>) -> CycleReport {
        let now = Utc::now();
        CycleReport {
            cycle_id: Uuid::new_v4(),
            campaign_id: "c1".to_string(),
            trigger: CycleTrigger::Manual,
            started_at: now,
            finished_at: now,
            confidence: 92,
            data_points: 500,
            omitted: vec![],
            anomalies: vec![],
            opportunities: vec![],
            results,
        }
    }

    // ============= Summary Tests =============

    #[tokio::test]
    async fn test_summary_counts() {
        let log = OptimizationLog::in_memory();
        log.record(&report(vec![
            OptimizationResult::failed(rec(Priority::High), "c1", 92, None, "timeout".to_string()),
            OptimizationResult::gated(rec(Priority::Low), "c1", 92),
        ]))
        .await;
        log.record_aborted("c1", "no data").await;

        let s = log.summary("c1").unwrap();
        assert_eq!(s.cycles, 1);
        assert_eq!(s.aborted_cycles, 1);
        assert_eq!(s.attempted, 1);
        assert_eq!(s.executed, 0);
        assert_eq!(s.failed, 1);
        assert_eq!(s.gated, 1);
        assert_eq!(s.last_confidence, Some(92));
        assert!(log.summary("c2").is_none());
    }

    // ============= JSONL Tests =============

    #[tokio::test]
    async fn test_log_appends_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("optimizations.jsonl");
        let log = OptimizationLog::new(Some(path.clone()));

        log.record(&report(vec![OptimizationResult::gated(rec(Priority::Medium), "c1", 92)]))
            .await;
        log.record(&report(vec![])).await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        // result + cycle, then cycle
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "result");
        assert_eq!(lines[0]["executed"], false);
        assert_eq!(lines[0]["recommendation"]["type"], "bid-increase");
        assert_eq!(lines[1]["kind"], "cycle");
        assert_eq!(lines[1]["recommendations"], 1);
        assert_eq!(lines[2]["kind"], "cycle");

        let summary_path = path.with_file_name(SUMMARY_FILE_NAME);
        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
        assert_eq!(summary["c1"]["cycles"], 2);
    }

    #[tokio::test]
    async fn test_aborted_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("optimizations.jsonl");
        let log = OptimizationLog::new(Some(path.clone()));

        log.record_aborted("c1", "all platforms unreachable").await;

        let content = std::fs::read_to_string(&path).unwrap();
        let entry: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry["kind"], "aborted");
        assert_eq!(entry["campaign_id"], "c1");
    }

    #[tokio::test]
    async fn test_unwritable_log_keeps_summary() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        let log = OptimizationLog::new(Some(blocker.join("optimizations.jsonl")));

        log.record(&report(vec![])).await;

        assert_eq!(log.log_path(), Some(blocker.join("optimizations.jsonl").as_path()));
        assert_eq!(log.summary("c1").unwrap().cycles, 1);
    }
}
