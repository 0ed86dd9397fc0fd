use serde::{Deserialize, Serialize};

use crate::constants::confidence::*;

/// Inputs the scorer needs from past cycles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub historical_accuracy: f64,
    pub volatility: f64,
}

/// 0..=100 confidence for the current cycle. Adjustments are additive and the
/// two data-volume penalties stack.
pub fn score(data_points: u64, history: &HistoryStats) -> u8 {
    let mut confidence = BASE;

    if data_points < LOW_DATA_POINTS {
        confidence -= LOW_DATA_PENALTY;
    }
    if data_points < VERY_LOW_DATA_POINTS {
        confidence -= VERY_LOW_DATA_PENALTY;
    }

    if history.historical_accuracy > HIGH_ACCURACY {
        confidence += HIGH_ACCURACY_BONUS;
    }
    if history.historical_accuracy < LOW_ACCURACY {
        confidence -= LOW_ACCURACY_PENALTY;
    }

    if history.volatility > HIGH_VOLATILITY {
        confidence -= HIGH_VOLATILITY_PENALTY;
    }

    confidence.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(historical_accuracy: f64, volatility: f64) -> HistoryStats {
        HistoryStats {
            historical_accuracy,
            volatility,
        }
    }

    #[test]
    fn test_base_confidence() {
        assert_eq!(score(150, &history(0.88, 0.15)), 85);
    }

    #[test]
    fn test_low_data_penalties_stack() {
        assert_eq!(score(99, &history(0.8, 0.0)), 65);
        assert_eq!(score(49, &history(0.8, 0.0)), 35);
    }

    #[test]
    fn test_combined_adjustments_stay_unclamped() {
        // 85 - 20 - 30 + 10 - 15
        assert_eq!(score(30, &history(0.95, 0.5)), 30);
    }

    #[test]
    fn test_upper_bound() {
        assert_eq!(score(1_000, &history(0.99, 0.0)), 95);
    }

    #[test]
    fn test_worst_case_inputs() {
        // 85 - 20 - 30 - 10 - 15
        assert_eq!(score(0, &history(0.1, 0.9)), 10);
    }

    #[test]
    fn test_threshold_boundaries_are_strict() {
        assert_eq!(score(100, &history(0.9, 0.3)), 85);
        assert_eq!(score(50, &history(0.7, 0.3)), 65);
    }
}
