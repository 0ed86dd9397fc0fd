use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::constants::events;
use crate::engine::model::{ActionOutcome, OptimizationAction, OptimizationResult, Recommendation};
use crate::error::OptimizerError;
use crate::platforms::{BidAction, BudgetAction, CreativeTrigger, PlatformResult};

/// Applies recommendations through the platform collaborators.
///
/// Failures are captured into the returned result; one failed action never
/// affects the others in the same cycle.
#[derive(Clone)]
pub struct OptimizationExecutor {
    budget: Arc<dyn BudgetAction>,
    bids: Arc<dyn BidAction>,
    creatives: Arc<dyn CreativeTrigger>,
    timeout: Duration,
}

impl OptimizationExecutor {
    pub fn new(
        budget: Arc<dyn BudgetAction>,
        bids: Arc<dyn BidAction>,
        creatives: Arc<dyn CreativeTrigger>,
        timeout: Duration,
    ) -> Self {
        Self {
            budget,
            bids,
            creatives,
            timeout,
        }
    }

    pub async fn execute(
        &self,
        recommendation: &Recommendation,
        campaign_id: &str,
        confidence: u8,
    ) -> OptimizationResult {
        let action = recommendation.kind();
        let outcome = match &recommendation.action {
            OptimizationAction::BudgetReallocation { from, to, amount, .. } => self
                .bounded(action, self.budget.reallocate_budget(campaign_id, from, to, *amount))
                .await
                .map(|change| (change.success, ActionOutcome::Budget(change))),
            OptimizationAction::BidIncrease { platform, adjustment }
            | OptimizationAction::BidDecrease { platform, adjustment } => self
                .bounded(action, self.bids.adjust_bids(campaign_id, platform, *adjustment))
                .await
                .map(|change| (change.success, ActionOutcome::Bid(change))),
            OptimizationAction::CreativeRefresh { platforms } => self
                .bounded(action, self.creatives.request_creatives(campaign_id, platforms))
                .await
                .map(|req| (req.success, ActionOutcome::Creative(req))),
        };

        match outcome {
            Ok((true, outcome)) => {
                info!(
                    event = events::ACTION_EXECUTED,
                    "✅ [EXECUTOR] {} {} ({})", campaign_id, action, recommendation.reason
                );
                OptimizationResult::succeeded(recommendation.clone(), campaign_id, confidence, outcome)
            }
            Ok((false, outcome)) => {
                let err = OptimizerError::ActionExecution {
                    action: action.to_string(),
                    reason: "platform reported success=false".to_string(),
                };
                warn!(event = events::ACTION_FAILED, "❌ [EXECUTOR] {} {}", campaign_id, err);
                OptimizationResult::failed(
                    recommendation.clone(),
                    campaign_id,
                    confidence,
                    Some(outcome),
                    err.to_string(),
                )
            }
            Err(err) => {
                warn!(event = events::ACTION_FAILED, "❌ [EXECUTOR] {} {}", campaign_id, err);
                OptimizationResult::failed(recommendation.clone(), campaign_id, confidence, None, err.to_string())
            }
        }
    }

    async fn bounded<T>(
        &self,
        action: &str,
        call: impl Future<Output = PlatformResult<T>>,
    ) -> Result<T, OptimizerError> {
        match timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OptimizerError::ActionExecution {
                action: action.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(OptimizerError::Timeout {
                operation: format!("action {}", action),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
