use async_trait::async_trait;

use crate::engine::model::PlatformMetrics;

use super::types::{BidChange, BudgetChange, CreativeRequest};

pub type PlatformResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Per-platform metrics feed.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    fn platform(&self) -> &str;

    /// `Ok(None)` when the campaign does not run on this platform.
    /// `Err` when the platform could not be reached.
    async fn get_metrics(&self, campaign_id: &str) -> PlatformResult<Option<PlatformMetrics>>;
}

#[async_trait]
pub trait BudgetAction: Send + Sync {
    async fn reallocate_budget(
        &self,
        campaign_id: &str,
        from_platform: &str,
        to_platform: &str,
        amount: f64,
    ) -> PlatformResult<BudgetChange>;
}

#[async_trait]
pub trait BidAction: Send + Sync {
    async fn adjust_bids(
        &self,
        campaign_id: &str,
        platform: &str,
        adjustment: f64,
    ) -> PlatformResult<BidChange>;
}

#[async_trait]
pub trait CreativeTrigger: Send + Sync {
    async fn request_creatives(
        &self,
        campaign_id: &str,
        platforms: &[String],
    ) -> PlatformResult<CreativeRequest>;
}
