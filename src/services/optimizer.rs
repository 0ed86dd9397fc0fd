use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::OptimizationRules;
use crate::constants::events;
use crate::engine::model::{CycleReport, CycleTrigger, OptimizationResult};
use crate::engine::{self, ExecutionGate};
use crate::error::OptimizerResult;
use crate::events::LiveEvent;
use crate::notifier::LiveNotifier;

use super::executor::OptimizationExecutor;
use super::fetcher::SnapshotFetcher;
use super::history::PerformanceHistory;
use super::reporting::OptimizationLog;

/// Runs one complete fetch → analyze → recommend → score → gate → execute cycle.
#[derive(Clone)]
pub struct CampaignOptimizer {
    fetcher: Arc<SnapshotFetcher>,
    executor: Arc<OptimizationExecutor>,
    gate: ExecutionGate,
    rules: Arc<OptimizationRules>,
    history: Arc<PerformanceHistory>,
    notifier: LiveNotifier,
    log: Arc<OptimizationLog>,
}

impl CampaignOptimizer {
    pub fn new(
        fetcher: SnapshotFetcher,
        executor: OptimizationExecutor,
        rules: OptimizationRules,
        history: PerformanceHistory,
        notifier: LiveNotifier,
        log: Arc<OptimizationLog>,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            executor: Arc::new(executor),
            gate: ExecutionGate::from_rules(&rules.budget),
            rules: Arc::new(rules),
            history: Arc::new(history),
            notifier,
            log,
        }
    }

    pub fn notifier(&self) -> &LiveNotifier {
        &self.notifier
    }

    /// Only a data-source failure is returned as an error. Per-action
    /// failures are inside the report.
    pub async fn run_cycle(&self, campaign_id: &str, trigger: CycleTrigger) -> OptimizerResult<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            event = events::CYCLE_STARTED,
            "🔄 [OPTIMIZER] Cycle {} for {} ({:?})", cycle_id, campaign_id, trigger
        );

        let snapshot = match self.fetcher.fetch(campaign_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(event = events::CYCLE_ABORTED, "🛑 [OPTIMIZER] Cycle {} aborted: {}", cycle_id, e);
                self.log.record_aborted(campaign_id, &e.to_string()).await;
                self.notifier.publish(
                    campaign_id,
                    LiveEvent::CycleAborted {
                        campaign_id: campaign_id.to_string(),
                        reason: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        let analysis = engine::analyze(&snapshot, &self.rules);
        let recommendations = engine::generate(&analysis, &self.rules);
        let confidence = engine::score(analysis.data_points, &self.history.stats(campaign_id));

        info!(
            "🧠 [OPTIMIZER] {}: {} anomalies, {} opportunities, {} recommendations, confidence {}",
            campaign_id,
            analysis.anomalies.len(),
            analysis.opportunities.len(),
            recommendations.len(),
            confidence
        );

        let mut results = Vec::with_capacity(recommendations.len());
        for recommendation in recommendations {
            if !self.gate.should_execute(&recommendation, confidence) {
                info!(
                    event = events::ACTION_GATED,
                    "⏸️ [OPTIMIZER] {} {} held back ({:?} priority, confidence {})",
                    campaign_id,
                    recommendation.kind(),
                    recommendation.priority,
                    confidence
                );
                results.push(OptimizationResult::gated(recommendation, campaign_id, confidence));
                continue;
            }

            let result = self.executor.execute(&recommendation, campaign_id, confidence).await;
            self.notifier
                .publish(campaign_id, LiveEvent::OptimizationExecuted(result.clone()));
            results.push(result);
        }

        self.history
            .record_cycle(campaign_id, snapshot.blended_roas(), &results);

        let report = CycleReport {
            cycle_id,
            campaign_id: campaign_id.to_string(),
            trigger,
            started_at,
            finished_at: Utc::now(),
            confidence,
            data_points: analysis.data_points,
            omitted: snapshot.omitted,
            anomalies: analysis.anomalies,
            opportunities: analysis.opportunities,
            results,
        };

        self.log.record(&report).await;

        let digest = report.digest();
        info!(
            event = events::CYCLE_COMPLETED,
            "✅ [OPTIMIZER] Cycle {} done: {} executed, {} gated, {} failed ({}ms)",
            cycle_id,
            digest.executed,
            digest.gated,
            digest.failed,
            digest.duration_ms
        );
        self.notifier.publish(campaign_id, LiveEvent::CycleCompleted(digest));

        Ok(report)
    }
}
