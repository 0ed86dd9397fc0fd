//! Rolling per-campaign record feeding the confidence scorer.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::engine::model::OptimizationResult;
use crate::engine::HistoryStats;

#[derive(Debug, Default)]
struct CampaignHistory {
    /// Blended ROAS per cycle, oldest first
    roas: VecDeque<f64>,
    /// One entry per completed cycle: (executed, attempted). Fully gated
    /// cycles push (0, 0) so old failures age out.
    outcomes: VecDeque<(usize, usize)>,
}

pub struct PerformanceHistory {
    window: usize,
    default_accuracy: f64,
    campaigns: DashMap<String, CampaignHistory>,
}

impl PerformanceHistory {
    pub fn new(window: usize, default_accuracy: f64) -> Self {
        Self {
            window: window.max(1),
            default_accuracy,
            campaigns: DashMap::new(),
        }
    }

    pub fn stats(&self, campaign_id: &str) -> HistoryStats {
        match self.campaigns.get(campaign_id) {
            Some(history) => HistoryStats {
                historical_accuracy: accuracy(&history.outcomes).unwrap_or(self.default_accuracy),
                volatility: coefficient_of_variation(&history.roas),
            },
            None => HistoryStats {
                historical_accuracy: self.default_accuracy,
                volatility: 0.0,
            },
        }
    }

    /// Gated results are not counted against accuracy.
    pub fn record_cycle(&self, campaign_id: &str, blended_roas: Option<f64>, results: &[OptimizationResult]) {
        let mut history = self.campaigns.entry(campaign_id.to_string()).or_default();

        if let Some(roas) = blended_roas.filter(|r| r.is_finite()) {
            history.roas.push_back(roas);
            while history.roas.len() > self.window {
                history.roas.pop_front();
            }
        }

        let attempted = results.iter().filter(|r| r.was_attempted()).count();
        let executed = results.iter().filter(|r| r.executed).count();
        history.outcomes.push_back((executed, attempted));
        while history.outcomes.len() > self.window {
            history.outcomes.pop_front();
        }
    }
}

fn accuracy(outcomes: &VecDeque<(usize, usize)>) -> Option<f64> {
    let (executed, attempted) = outcomes
        .iter()
        .fold((0usize, 0usize), |(e, a), (oe, oa)| (e + oe, a + oa));
    if attempted == 0 {
        None
    } else {
        Some(executed as f64 / attempted as f64)
    }
}

/// Population std-dev over mean. 0 with fewer than two samples or a zero mean.
fn coefficient_of_variation(samples: &VecDeque<f64>) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::{OptimizationAction, Priority, Recommendation};

    fn rec() -> Recommendation {
        Recommendation {
            action: OptimizationAction::CreativeRefresh {
                platforms: vec!["google_ads".to_string()],
            },
            priority: Priority::High,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_defaults_without_history() {
        let history = PerformanceHistory::new(24, 0.88);
        let stats = history.stats("c1");
        assert_eq!(stats.historical_accuracy, 0.88);
        assert_eq!(stats.volatility, 0.0);
    }

    #[test]
    fn test_volatility_is_coefficient_of_variation() {
        let history = PerformanceHistory::new(24, 0.88);
        history.record_cycle("c1", Some(2.0), &[]);
        history.record_cycle("c1", Some(4.0), &[]);

        // mean 3, population std-dev 1
        let stats = history.stats("c1");
        assert!((stats.volatility - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.historical_accuracy, 0.88);
    }

    #[test]
    fn test_window_drops_old_samples() {
        let history = PerformanceHistory::new(2, 0.88);
        history.record_cycle("c1", Some(100.0), &[]);
        history.record_cycle("c1", Some(5.0), &[]);
        history.record_cycle("c1", Some(5.0), &[]);

        assert_eq!(history.stats("c1").volatility, 0.0);
    }

    #[test]
    fn test_accuracy_counts_attempted_only() {
        let history = PerformanceHistory::new(24, 0.88);
        let results = vec![
            OptimizationResult::succeeded(
                rec(),
                "c1",
                95,
                crate::engine::model::ActionOutcome::Creative(crate::platforms::types::CreativeRequest {
                    success: true,
                    creatives_requested: 3,
                    estimated_completion: None,
                }),
            ),
            OptimizationResult::failed(rec(), "c1", 95, None, "boom".to_string()),
            OptimizationResult::gated(rec(), "c1", 40),
        ];
        history.record_cycle("c1", None, &results);

        assert_eq!(history.stats("c1").historical_accuracy, 0.5);
        // Other campaigns keep the default
        assert_eq!(history.stats("c2").historical_accuracy, 0.88);
    }

    #[test]
    fn test_failures_age_out_through_gated_cycles() {
        let history = PerformanceHistory::new(3, 0.88);
        let failed = vec![OptimizationResult::failed(rec(), "c1", 95, None, "boom".to_string())];
        let gated = vec![OptimizationResult::gated(rec(), "c1", 75)];

        history.record_cycle("c1", None, &failed);
        assert_eq!(history.stats("c1").historical_accuracy, 0.0);

        // Still inside the window
        for _ in 0..2 {
            history.record_cycle("c1", None, &gated);
        }
        assert_eq!(history.stats("c1").historical_accuracy, 0.0);

        history.record_cycle("c1", None, &gated);
        assert_eq!(history.stats("c1").historical_accuracy, 0.88);

        // Empty cycles count as cycles too
        history.record_cycle("c1", None, &failed);
        for _ in 0..3 {
            history.record_cycle("c1", None, &[]);
        }
        assert_eq!(history.stats("c1").historical_accuracy, 0.88);
    }
}
