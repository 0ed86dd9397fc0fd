//! Domain types flowing through one optimization cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::platforms::types::{BidChange, BudgetChange, CreativeRequest};

/// Raw per-platform measurements for one campaign.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub cost: f64,
    pub revenue: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub conversions: u64,
    pub daily_budget: f64,
    /// Underlying events backing these numbers
    #[serde(default)]
    pub data_points: u64,
}

impl PlatformMetrics {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("cost", self.cost),
            ("revenue", self.revenue),
            ("daily_budget", self.daily_budget),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }
        if self.clicks > self.impressions {
            return Err(format!(
                "clicks ({}) exceed impressions ({})",
                self.clicks, self.impressions
            ));
        }
        if self.conversions > self.clicks {
            return Err(format!(
                "conversions ({}) exceed clicks ({})",
                self.conversions, self.clicks
            ));
        }
        Ok(())
    }

    /// Traffic without any backing data points, usually a gateway that left
    /// the field out.
    pub fn lacks_data_points(&self) -> bool {
        self.data_points == 0 && self.impressions > 0
    }
}

/// Immutable record of one measurement cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub campaign_id: String,
    pub captured_at: DateTime<Utc>,
    pub platforms: BTreeMap<String, PlatformMetrics>,
    pub total_impressions: u64,
    pub data_points: u64,
    /// Platforms that were unreachable this cycle. Never zero-filled.
    pub omitted: Vec<String>,
}

impl CampaignSnapshot {
    pub fn new(
        campaign_id: impl Into<String>,
        platforms: BTreeMap<String, PlatformMetrics>,
        omitted: Vec<String>,
    ) -> Self {
        let total_impressions = platforms.values().map(|m| m.impressions).sum();
        let data_points = platforms.values().map(|m| m.data_points).sum();
        Self {
            campaign_id: campaign_id.into(),
            captured_at: Utc::now(),
            platforms,
            total_impressions,
            data_points,
            omitted,
        }
    }

    /// Total revenue over total cost across the reporting platforms.
    pub fn blended_roas(&self) -> Option<f64> {
        let cost: f64 = self.platforms.values().map(|m| m.cost).sum();
        let revenue: f64 = self.platforms.values().map(|m| m.revenue).sum();
        if cost > 0.0 {
            Some(revenue / cost)
        } else {
            None
        }
    }
}

/// Derived ratios for one platform. `None` means the denominator was zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformAnalysis {
    pub roas: Option<f64>,
    pub ctr: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub cpa: Option<f64>,
    pub impression_share: Option<f64>,
    pub daily_budget: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    LowCtr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub platform: String,
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpportunityKind {
    ScaleHighPerformer,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub platform: String,
    pub kind: OpportunityKind,
    pub roas: f64,
    pub potential_budget_increase: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    pub campaign_id: String,
    pub data_points: u64,
    pub platforms: BTreeMap<String, PlatformAnalysis>,
    pub anomalies: Vec<Anomaly>,
    pub opportunities: Vec<Opportunity>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpectedImpact {
    pub revenue: f64,
    pub roas: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OptimizationAction {
    BudgetReallocation {
        from: String,
        to: String,
        amount: f64,
        expected_impact: ExpectedImpact,
    },
    BidIncrease {
        platform: String,
        /// Signed fraction, positive
        adjustment: f64,
    },
    BidDecrease {
        platform: String,
        /// Signed fraction, negative
        adjustment: f64,
    },
    CreativeRefresh {
        platforms: Vec<String>,
    },
}

impl OptimizationAction {
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizationAction::BudgetReallocation { .. } => "budget-reallocation",
            OptimizationAction::BidIncrease { .. } => "bid-increase",
            OptimizationAction::BidDecrease { .. } => "bid-decrease",
            OptimizationAction::CreativeRefresh { .. } => "creative-refresh",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub action: OptimizationAction,
    pub priority: Priority,
    pub reason: String,
}

impl Recommendation {
    pub fn kind(&self) -> &'static str {
        self.action.kind()
    }
}

/// What the platform collaborator reported back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ActionOutcome {
    Budget(BudgetChange),
    Bid(BidChange),
    Creative(CreativeRequest),
}

/// One attempted (or deliberately skipped) recommendation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub id: Uuid,
    pub campaign_id: String,
    pub recommendation: Recommendation,
    pub executed: bool,
    pub timestamp: DateTime<Utc>,
    pub confidence: u8,
    pub result: Option<ActionOutcome>,
    pub error: Option<String>,
}

impl OptimizationResult {
    fn base(recommendation: Recommendation, campaign_id: &str, confidence: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id: campaign_id.to_string(),
            recommendation,
            executed: false,
            timestamp: Utc::now(),
            confidence,
            result: None,
            error: None,
        }
    }

    /// Held back by the execution gate. Not a failure.
    pub fn gated(recommendation: Recommendation, campaign_id: &str, confidence: u8) -> Self {
        Self::base(recommendation, campaign_id, confidence)
    }

    pub fn succeeded(
        recommendation: Recommendation,
        campaign_id: &str,
        confidence: u8,
        outcome: ActionOutcome,
    ) -> Self {
        Self {
            executed: true,
            result: Some(outcome),
            ..Self::base(recommendation, campaign_id, confidence)
        }
    }

    pub fn failed(
        recommendation: Recommendation,
        campaign_id: &str,
        confidence: u8,
        outcome: Option<ActionOutcome>,
        error: String,
    ) -> Self {
        Self {
            result: outcome,
            error: Some(error),
            ..Self::base(recommendation, campaign_id, confidence)
        }
    }

    /// The gate let it through and a collaborator was called.
    pub fn was_attempted(&self) -> bool {
        self.executed || self.error.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleTrigger {
    Scheduled,
    Manual,
}

/// Everything one completed cycle produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub campaign_id: String,
    pub trigger: CycleTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub confidence: u8,
    pub data_points: u64,
    pub omitted: Vec<String>,
    pub anomalies: Vec<Anomaly>,
    pub opportunities: Vec<Opportunity>,
    pub results: Vec<OptimizationResult>,
}

impl CycleReport {
    pub fn executed_count(&self) -> usize {
        self.results.iter().filter(|r| r.executed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }

    pub fn gated_count(&self) -> usize {
        self.results.iter().filter(|r| !r.was_attempted()).count()
    }

    pub fn digest(&self) -> CycleDigest {
        CycleDigest {
            cycle_id: self.cycle_id,
            campaign_id: self.campaign_id.clone(),
            trigger: self.trigger,
            finished_at: self.finished_at,
            confidence: self.confidence,
            data_points: self.data_points,
            omitted: self.omitted.clone(),
            anomalies: self.anomalies.len(),
            opportunities: self.opportunities.len(),
            recommendations: self.results.len(),
            executed: self.executed_count(),
            gated: self.gated_count(),
            failed: self.failed_count(),
            duration_ms: (self.finished_at - self.started_at).num_milliseconds().max(0) as u64,
        }
    }
}

/// Compact cycle summary for the audit log and the live feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleDigest {
    pub cycle_id: Uuid,
    pub campaign_id: String,
    pub trigger: CycleTrigger,
    pub finished_at: DateTime<Utc>,
    pub confidence: u8,
    pub data_points: u64,
    pub omitted: Vec<String>,
    pub anomalies: usize,
    pub opportunities: usize,
    pub recommendations: usize,
    pub executed: usize,
    pub gated: usize,
    pub failed: usize,
    pub duration_ms: u64,
}
