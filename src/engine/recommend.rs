//! Turns an analysis into typed recommendations.
//!
//! Output order is budget, then bid, then creative. Consumers must read the
//! `priority` field rather than rely on position.

use std::cmp::Ordering;

use crate::config::OptimizationRules;
use crate::constants::recommend::{
    CPA_DECREASE_FACTOR, CPA_INCREASE_FACTOR, MAX_SOURCE_BUDGET_SHARE,
};

use super::model::{
    AnomalyKind, ExpectedImpact, OptimizationAction, PerformanceAnalysis, Priority,
    Recommendation, Severity,
};

pub fn generate(analysis: &PerformanceAnalysis, rules: &OptimizationRules) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    recommendations.extend(budget_reallocation(analysis, rules));
    recommendations.extend(bid_adjustments(analysis, rules));
    recommendations.extend(creative_refresh(analysis));
    recommendations
}

/// Compares only the global best and worst ROAS platforms; at most one move per cycle.
pub fn budget_reallocation(
    analysis: &PerformanceAnalysis,
    rules: &OptimizationRules,
) -> Option<Recommendation> {
    let mut ranked: Vec<(&String, f64, f64)> = analysis
        .platforms
        .iter()
        .filter_map(|(name, p)| p.roas.map(|roas| (name, roas, p.daily_budget)))
        .collect();

    if ranked.len() < 2 {
        return None;
    }

    // ROAS descending, name ascending on ties (BTreeMap order is kept by the stable sort)
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let (best_name, best_roas, best_budget) = ranked[0];
    let (worst_name, worst_roas, worst_budget) = ranked[ranked.len() - 1];

    let difference = best_roas - worst_roas;
    if difference <= 0.0 {
        return None;
    }

    let relative = if worst_roas > 0.0 {
        difference / worst_roas
    } else {
        f64::INFINITY
    };

    if relative <= rules.budget.reallocation_threshold {
        return None;
    }

    let amount = (worst_budget * MAX_SOURCE_BUDGET_SHARE)
        .min(best_budget * rules.budget.max_budget_increase);

    if amount <= 0.0 {
        return None;
    }

    Some(Recommendation {
        action: OptimizationAction::BudgetReallocation {
            from: worst_name.clone(),
            to: best_name.clone(),
            amount,
            expected_impact: ExpectedImpact {
                revenue: amount * best_roas,
                roas: best_roas,
            },
        },
        priority: Priority::High,
        reason: format!("ROAS difference: {:.2}x", difference),
    })
}

/// At most one bid recommendation per platform.
pub fn bid_adjustments(analysis: &PerformanceAnalysis, rules: &OptimizationRules) -> Vec<Recommendation> {
    let target_cpa = rules.bidding.target_cpa;
    let rate = rules.bidding.bid_adjustment_rate;

    analysis
        .platforms
        .iter()
        .filter_map(|(name, p)| {
            let cpa = p.cpa?;

            if cpa > target_cpa * CPA_DECREASE_FACTOR {
                return Some(Recommendation {
                    action: OptimizationAction::BidDecrease {
                        platform: name.clone(),
                        adjustment: -rate,
                    },
                    priority: Priority::Medium,
                    reason: format!("CPA {:.2} is above target {:.2}", cpa, target_cpa),
                });
            }

            let share = p.impression_share?;
            if cpa < target_cpa * CPA_INCREASE_FACTOR
                && share < rules.performance.impression_share_target
            {
                return Some(Recommendation {
                    action: OptimizationAction::BidIncrease {
                        platform: name.clone(),
                        adjustment: rate,
                    },
                    priority: Priority::Medium,
                    reason: format!(
                        "CPA {:.2} below target with low impression share ({:.1}%)",
                        cpa,
                        share * 100.0
                    ),
                });
            }

            None
        })
        .collect()
}

pub fn creative_refresh(analysis: &PerformanceAnalysis) -> Option<Recommendation> {
    let platforms: Vec<String> = analysis
        .anomalies
        .iter()
        .filter(|a| a.kind == AnomalyKind::LowCtr && a.severity == Severity::Critical)
        .map(|a| a.platform.clone())
        .collect();

    if platforms.is_empty() {
        return None;
    }

    Some(Recommendation {
        action: OptimizationAction::CreativeRefresh { platforms },
        priority: Priority::High,
        reason: "CTR below critical threshold".to_string(),
    })
}
