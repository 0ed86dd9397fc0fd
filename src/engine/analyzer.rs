//! Performance analysis: derived ratios, anomalies and opportunities.
//!
//! Pure function of the snapshot and the rules. Every division is guarded;
//! a zero denominator yields `None`, never NaN or infinity.

use std::collections::BTreeMap;

use crate::config::OptimizationRules;

use super::model::{
    Anomaly, AnomalyKind, CampaignSnapshot, Opportunity, OpportunityKind, PerformanceAnalysis,
    PlatformAnalysis, PlatformMetrics, Severity,
};

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 {
        Some(numerator / denominator)
    } else {
        None
    }
}

pub fn analyze_platform(metrics: &PlatformMetrics, total_impressions: u64) -> PlatformAnalysis {
    PlatformAnalysis {
        roas: ratio(metrics.revenue, metrics.cost),
        ctr: ratio(metrics.clicks as f64, metrics.impressions as f64),
        conversion_rate: ratio(metrics.conversions as f64, metrics.clicks as f64),
        cpa: ratio(metrics.cost, metrics.conversions as f64),
        impression_share: ratio(metrics.impressions as f64, total_impressions as f64),
        daily_budget: metrics.daily_budget,
    }
}

pub fn analyze(snapshot: &CampaignSnapshot, rules: &OptimizationRules) -> PerformanceAnalysis {
    let perf = &rules.performance;
    let budget = &rules.budget;

    let mut platforms = BTreeMap::new();
    let mut anomalies = Vec::new();
    let mut opportunities = Vec::new();

    for (name, metrics) in &snapshot.platforms {
        let analysis = analyze_platform(metrics, snapshot.total_impressions);

        // No impressions, no CTR: the platform sits out both scans this cycle.
        if let Some(ctr) = analysis.ctr {
            if ctr < perf.ctr_critical_threshold {
                anomalies.push(Anomaly {
                    platform: name.clone(),
                    kind: AnomalyKind::LowCtr,
                    severity: Severity::Critical,
                    value: ctr,
                    threshold: perf.ctr_critical_threshold,
                });
            } else if ctr < perf.ctr_warning_threshold {
                anomalies.push(Anomaly {
                    platform: name.clone(),
                    kind: AnomalyKind::LowCtr,
                    severity: Severity::Warning,
                    value: ctr,
                    threshold: perf.ctr_warning_threshold,
                });
            }

            if let Some(roas) = analysis.roas {
                if roas > budget.max_roas {
                    opportunities.push(Opportunity {
                        platform: name.clone(),
                        kind: OpportunityKind::ScaleHighPerformer,
                        roas,
                        potential_budget_increase: budget.max_budget_increase,
                    });
                }
            }
        }

        platforms.insert(name.clone(), analysis);
    }

    PerformanceAnalysis {
        campaign_id: snapshot.campaign_id.clone(),
        data_points: snapshot.data_points,
        platforms,
        anomalies,
        opportunities,
    }
}
