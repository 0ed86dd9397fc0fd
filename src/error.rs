//! Error types for the optimization engine
//!
//! Only `DataSource` aborts a cycle. Everything else is recorded against the
//! smallest unit it affects (one platform, one recommendation) and logged.

use thiserror::Error;

pub type OptimizerResult<T> = Result<T, OptimizerError>;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("No platform data available for campaign {campaign_id} (unreachable: {unreachable:?})")]
    DataSource {
        campaign_id: String,
        unreachable: Vec<String>,
    },

    #[error("Invalid metrics from {platform}: {reason}")]
    InvalidMetrics { platform: String, reason: String },

    #[error("Action {action} failed: {reason}")]
    ActionExecution { action: String, reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Optimization not found for campaign {campaign_id}")]
    JobNotFound { campaign_id: String },

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<serde_yaml::Error> for OptimizerError {
    fn from(err: serde_yaml::Error) -> Self {
        OptimizerError::Config(err.to_string())
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for OptimizerError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        OptimizerError::Scheduler(err.to_string())
    }
}

impl OptimizerError {
    /// True for the one failure class that aborts a whole cycle.
    pub fn aborts_cycle(&self) -> bool {
        matches!(self, OptimizerError::DataSource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_data_source_aborts_cycle() {
        let err = OptimizerError::DataSource {
            campaign_id: "c1".to_string(),
            unreachable: vec!["google_ads".to_string()],
        };
        assert!(err.aborts_cycle());

        let err = OptimizerError::ActionExecution {
            action: "bid-decrease".to_string(),
            reason: "boom".to_string(),
        };
        assert!(!err.aborts_cycle());
    }

    #[test]
    fn test_error_messages() {
        let err = OptimizerError::JobNotFound {
            campaign_id: "c42".to_string(),
        };
        assert_eq!(err.to_string(), "Optimization not found for campaign c42");

        let err = OptimizerError::Timeout {
            operation: "metrics fetch (meta_ads)".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "metrics fetch (meta_ads) timed out after 250ms");
    }
}
