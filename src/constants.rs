//! Engine-wide constants and tuning values
//!
//! Anything that is a rule threshold lives in `config::OptimizationRules`
//! instead; these are the fixed parts of the algorithms.

use std::time::Duration;

/// Scheduling defaults
pub mod scheduling {
    use super::*;

    /// Default cycle interval (15 minutes)
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);

    /// Default bound on one metrics-source call
    pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

    /// Default bound on one platform-action call
    pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 15_000;

    /// Prefix for job names in the timer facility
    pub const JOB_NAME_PREFIX: &str = "optimize-";
}

/// Confidence scoring
pub mod confidence {
    pub const BASE: i32 = 85;

    pub const LOW_DATA_POINTS: u64 = 100;
    pub const LOW_DATA_PENALTY: i32 = 20;

    /// Stacks on top of the low-data penalty
    pub const VERY_LOW_DATA_POINTS: u64 = 50;
    pub const VERY_LOW_DATA_PENALTY: i32 = 30;

    pub const HIGH_ACCURACY: f64 = 0.9;
    pub const HIGH_ACCURACY_BONUS: i32 = 10;
    pub const LOW_ACCURACY: f64 = 0.7;
    pub const LOW_ACCURACY_PENALTY: i32 = 10;

    pub const HIGH_VOLATILITY: f64 = 0.3;
    pub const HIGH_VOLATILITY_PENALTY: i32 = 15;
}

/// Execution gate thresholds (strictly greater than)
pub mod gate {
    pub const HIGH_PRIORITY_MIN_CONFIDENCE: u8 = 85;
    pub const MEDIUM_PRIORITY_MIN_CONFIDENCE: u8 = 90;
    pub const LOW_PRIORITY_MIN_CONFIDENCE: u8 = 95;
    pub const SAFE_MODE_MIN_CONFIDENCE: u8 = 90;
}

/// Recommendation heuristics
pub mod recommend {
    /// Largest share of the worst performer's daily budget moved in one cycle
    pub const MAX_SOURCE_BUDGET_SHARE: f64 = 0.2;

    /// CPA above target * this => bid decrease
    pub const CPA_DECREASE_FACTOR: f64 = 1.2;

    /// CPA below target * this (and low impression share) => bid increase
    pub const CPA_INCREASE_FACTOR: f64 = 0.8;
}

/// Sandbox platform defaults
pub mod sandbox {
    pub const CREATIVES_PER_REQUEST: u32 = 3;
    pub const CREATIVE_TURNAROUND_SECS: i64 = 3600;
}

/// Logging event names for structured logging
pub mod events {
    pub const CYCLE_STARTED: &str = "cycle_started";
    pub const CYCLE_COMPLETED: &str = "cycle_completed";
    pub const CYCLE_ABORTED: &str = "cycle_aborted";
    pub const CYCLE_SKIPPED: &str = "cycle_skipped";
    pub const PLATFORM_OMITTED: &str = "platform_omitted";
    pub const DATA_POINTS_MISSING: &str = "data_points_missing";
    pub const ACTION_EXECUTED: &str = "action_executed";
    pub const ACTION_FAILED: &str = "action_failed";
    pub const ACTION_GATED: &str = "action_gated";
    pub const JOB_STARTED: &str = "job_started";
    pub const JOB_STOPPED: &str = "job_stopped";
}
