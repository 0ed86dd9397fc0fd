use serde::{Deserialize, Serialize};

use crate::engine::model::{CycleDigest, OptimizationResult};

/// Pushed to live observers of a campaign.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum LiveEvent {
    /// Emitted for every recommendation the gate let through, successful or not
    OptimizationExecuted(OptimizationResult),
    CycleCompleted(CycleDigest),
    CycleAborted { campaign_id: String, reason: String },
}

impl LiveEvent {
    pub fn campaign_id(&self) -> &str {
        match self {
            LiveEvent::OptimizationExecuted(result) => &result.campaign_id,
            LiveEvent::CycleCompleted(digest) => &digest.campaign_id,
            LiveEvent::CycleAborted { campaign_id, .. } => campaign_id,
        }
    }
}
