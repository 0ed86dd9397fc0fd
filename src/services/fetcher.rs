use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::constants::events;
use crate::engine::model::CampaignSnapshot;
use crate::error::{OptimizerError, OptimizerResult};
use crate::platforms::MetricsSource;

/// Gathers one snapshot per cycle from every configured metrics source.
#[derive(Clone)]
pub struct SnapshotFetcher {
    sources: Vec<Arc<dyn MetricsSource>>,
    timeout: Duration,
}

impl SnapshotFetcher {
    pub fn new(sources: Vec<Arc<dyn MetricsSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    /// Unreachable or invalid platforms are omitted, never zero-filled.
    /// Fails only when no platform reported at all.
    pub async fn fetch(&self, campaign_id: &str) -> OptimizerResult<CampaignSnapshot> {
        let mut platforms = BTreeMap::new();
        let mut omitted = Vec::new();

        for source in &self.sources {
            let platform = source.platform().to_string();

            match timeout(self.timeout, source.get_metrics(campaign_id)).await {
                Ok(Ok(Some(metrics))) => match metrics.validate() {
                    Ok(()) => {
                        if metrics.lacks_data_points() {
                            warn!(
                                event = events::DATA_POINTS_MISSING,
                                "⚠️ [FETCHER] {} / {} reports {} impressions but 0 data points; confidence will be penalized",
                                campaign_id,
                                platform,
                                metrics.impressions
                            );
                        }
                        debug!("[FETCHER] {} / {}: {:?}", campaign_id, platform, metrics);
                        platforms.insert(platform, metrics);
                    }
                    Err(reason) => {
                        let err = OptimizerError::InvalidMetrics {
                            platform: platform.clone(),
                            reason,
                        };
                        warn!(event = events::PLATFORM_OMITTED, "⚠️ [FETCHER] {} - {}", campaign_id, err);
                        omitted.push(platform);
                    }
                },
                Ok(Ok(None)) => {
                    debug!("[FETCHER] {} not connected to {}", campaign_id, platform);
                }
                Ok(Err(e)) => {
                    warn!(
                        event = events::PLATFORM_OMITTED,
                        "⚠️ [FETCHER] {} - {} unreachable: {}", campaign_id, platform, e
                    );
                    omitted.push(platform);
                }
                Err(_) => {
                    let err = OptimizerError::Timeout {
                        operation: format!("metrics fetch ({})", platform),
                        timeout_ms: self.timeout.as_millis() as u64,
                    };
                    warn!(event = events::PLATFORM_OMITTED, "⚠️ [FETCHER] {} - {}", campaign_id, err);
                    omitted.push(platform);
                }
            }
        }

        if platforms.is_empty() {
            return Err(OptimizerError::DataSource {
                campaign_id: campaign_id.to_string(),
                unreachable: omitted,
            });
        }

        if !omitted.is_empty() {
            warn!(
                "⚠️ [FETCHER] Partial data for {}: proceeding without {:?}",
                campaign_id, omitted
            );
        }

        let snapshot = CampaignSnapshot::new(campaign_id, platforms, omitted);
        info!(
            "[FETCHER] {} snapshot: {} platform(s), {} impressions, {} data points",
            campaign_id,
            snapshot.platforms.len(),
            snapshot.total_impressions,
            snapshot.data_points
        );
        Ok(snapshot)
    }
}
