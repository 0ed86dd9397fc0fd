use crate::config::BudgetRules;
use crate::constants::gate::*;

use super::model::{OptimizationAction, Priority, Recommendation};

/// Decides whether a recommendation may auto-execute at a given confidence.
#[derive(Clone, Debug)]
pub struct ExecutionGate {
    safe_mode: bool,
    safe_mode_max_reallocation: f64,
}

impl ExecutionGate {
    pub fn new(safe_mode: bool, safe_mode_max_reallocation: f64) -> Self {
        Self {
            safe_mode,
            safe_mode_max_reallocation,
        }
    }

    pub fn from_rules(rules: &BudgetRules) -> Self {
        Self::new(rules.safe_mode, rules.safe_mode_max_reallocation)
    }

    pub fn should_execute(&self, recommendation: &Recommendation, confidence: u8) -> bool {
        // Safe mode owns budget moves outright; priority is not consulted.
        if self.safe_mode {
            if let OptimizationAction::BudgetReallocation { amount, .. } = &recommendation.action {
                return *amount < self.safe_mode_max_reallocation
                    && confidence > SAFE_MODE_MIN_CONFIDENCE;
            }
        }

        match recommendation.priority {
            Priority::High => confidence > HIGH_PRIORITY_MIN_CONFIDENCE,
            Priority::Medium => confidence > MEDIUM_PRIORITY_MIN_CONFIDENCE,
            Priority::Low => confidence > LOW_PRIORITY_MIN_CONFIDENCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::ExpectedImpact;

    fn reallocation(amount: f64, priority: Priority) -> Recommendation {
        Recommendation {
            action: OptimizationAction::BudgetReallocation {
                from: "facebook_ads".to_string(),
                to: "google_ads".to_string(),
                amount,
                expected_impact: ExpectedImpact {
                    revenue: amount * 5.0,
                    roas: 5.0,
                },
            },
            priority,
            reason: "test".to_string(),
        }
    }

    fn bid(priority: Priority) -> Recommendation {
        Recommendation {
            action: OptimizationAction::BidDecrease {
                platform: "google_ads".to_string(),
                adjustment: -0.1,
            },
            priority,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn test_safe_mode_small_move_high_confidence_executes() {
        let gate = ExecutionGate::new(true, 500.0);
        assert!(gate.should_execute(&reallocation(40.0, Priority::High), 95));
        // Priority does not matter under safe mode
        assert!(gate.should_execute(&reallocation(40.0, Priority::Low), 95));
    }

    #[test]
    fn test_safe_mode_blocks_large_or_uncertain_moves() {
        let gate = ExecutionGate::new(true, 500.0);
        assert!(!gate.should_execute(&reallocation(500.0, Priority::High), 99));
        // 88 would pass the high-priority rule but safe mode takes precedence
        assert!(!gate.should_execute(&reallocation(40.0, Priority::High), 88));
        assert!(!gate.should_execute(&reallocation(40.0, Priority::High), 90));
    }

    #[test]
    fn test_safe_mode_ceiling_is_configurable() {
        let gate = ExecutionGate::new(true, 1_000.0);
        assert!(gate.should_execute(&reallocation(750.0, Priority::High), 91));
    }

    #[test]
    fn test_without_safe_mode_priority_rules_apply() {
        let gate = ExecutionGate::new(false, 500.0);
        assert!(gate.should_execute(&reallocation(5_000.0, Priority::High), 86));
        assert!(!gate.should_execute(&reallocation(40.0, Priority::High), 85));
    }

    #[test]
    fn test_priority_thresholds() {
        let gate = ExecutionGate::new(true, 500.0);

        assert!(gate.should_execute(&bid(Priority::High), 86));
        assert!(!gate.should_execute(&bid(Priority::High), 85));

        assert!(gate.should_execute(&bid(Priority::Medium), 91));
        assert!(!gate.should_execute(&bid(Priority::Medium), 90));

        assert!(gate.should_execute(&bid(Priority::Low), 96));
        assert!(!gate.should_execute(&bid(Priority::Low), 95));
    }
}
