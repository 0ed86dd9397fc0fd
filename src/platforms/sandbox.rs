//! Fixture-backed platforms for dry runs and tests.
//!
//! Sandbox sources report a fixed set of metrics for every campaign. Sandbox
//! actions always succeed and keep per-campaign budgets and bid modifiers in
//! memory so repeated cycles see their own effects in the responses.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tracing::info;

use crate::constants::sandbox::{CREATIVES_PER_REQUEST, CREATIVE_TURNAROUND_SECS};
use crate::engine::model::PlatformMetrics;

use super::traits::{BidAction, BudgetAction, CreativeTrigger, MetricsSource, PlatformResult};
use super::types::{BidChange, BudgetChange, CreativeRequest};

#[derive(Clone, Debug)]
pub struct SandboxMetricsSource {
    platform: String,
    metrics: Option<PlatformMetrics>,
}

impl SandboxMetricsSource {
    /// `None` behaves as a platform the campaign is not connected to.
    pub fn new(platform: impl Into<String>, metrics: Option<PlatformMetrics>) -> Self {
        Self {
            platform: platform.into(),
            metrics,
        }
    }
}

#[async_trait]
impl MetricsSource for SandboxMetricsSource {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn get_metrics(&self, _campaign_id: &str) -> PlatformResult<Option<PlatformMetrics>> {
        Ok(self.metrics.clone())
    }
}

#[derive(Clone, Default)]
pub struct SandboxActions {
    /// Starting daily budget per platform
    initial_budgets: Arc<HashMap<String, f64>>,
    /// (campaign, platform) -> current daily budget
    budgets: Arc<DashMap<(String, String), f64>>,
    /// (campaign, platform) -> current bid modifier
    bid_modifiers: Arc<DashMap<(String, String), f64>>,
}

impl SandboxActions {
    pub fn new(initial_budgets: HashMap<String, f64>) -> Self {
        Self {
            initial_budgets: Arc::new(initial_budgets),
            budgets: Arc::new(DashMap::new()),
            bid_modifiers: Arc::new(DashMap::new()),
        }
    }

    pub fn budget(&self, campaign_id: &str, platform: &str) -> f64 {
        let key = (campaign_id.to_string(), platform.to_string());
        self.budgets
            .get(&key)
            .map(|b| *b)
            .unwrap_or_else(|| self.initial_budgets.get(platform).copied().unwrap_or(0.0))
    }

    pub fn bid_modifier(&self, campaign_id: &str, platform: &str) -> f64 {
        let key = (campaign_id.to_string(), platform.to_string());
        self.bid_modifiers.get(&key).map(|m| *m).unwrap_or(1.0)
    }
}

#[async_trait]
impl BudgetAction for SandboxActions {
    async fn reallocate_budget(
        &self,
        campaign_id: &str,
        from_platform: &str,
        to_platform: &str,
        amount: f64,
    ) -> PlatformResult<BudgetChange> {
        let from_budget = (self.budget(campaign_id, from_platform) - amount).max(0.0);
        let to_budget = self.budget(campaign_id, to_platform) + amount;

        self.budgets
            .insert((campaign_id.to_string(), from_platform.to_string()), from_budget);
        self.budgets
            .insert((campaign_id.to_string(), to_platform.to_string()), to_budget);

        info!(
            "🧪 [SANDBOX] {} budget {} -> {}: {:.2} (now {:.2} / {:.2})",
            campaign_id, from_platform, to_platform, amount, from_budget, to_budget
        );

        let mut new_budgets = BTreeMap::new();
        new_budgets.insert(from_platform.to_string(), from_budget);
        new_budgets.insert(to_platform.to_string(), to_budget);

        Ok(BudgetChange {
            success: true,
            new_budgets,
        })
    }
}

#[async_trait]
impl BidAction for SandboxActions {
    async fn adjust_bids(&self, campaign_id: &str, platform: &str, adjustment: f64) -> PlatformResult<BidChange> {
        let key = (campaign_id.to_string(), platform.to_string());
        let mut modifier = self.bid_modifiers.entry(key).or_insert(1.0);
        *modifier *= 1.0 + adjustment;
        let new_modifier = *modifier;
        drop(modifier);

        info!(
            "🧪 [SANDBOX] {} bids on {} adjusted by {:+.0}% (modifier {:.3})",
            campaign_id,
            platform,
            adjustment * 100.0,
            new_modifier
        );

        Ok(BidChange {
            success: true,
            new_bid_modifier: Some(new_modifier),
        })
    }
}

#[async_trait]
impl CreativeTrigger for SandboxActions {
    async fn request_creatives(&self, campaign_id: &str, platforms: &[String]) -> PlatformResult<CreativeRequest> {
        info!(
            "🧪 [SANDBOX] {} creative refresh requested for {:?}",
            campaign_id, platforms
        );
        Ok(CreativeRequest {
            success: true,
            creatives_requested: CREATIVES_PER_REQUEST,
            estimated_completion: Some(Utc::now() + ChronoDuration::seconds(CREATIVE_TURNAROUND_SECS)),
        })
    }
}
