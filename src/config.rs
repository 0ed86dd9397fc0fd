use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::scheduling;
use crate::engine::model::PlatformMetrics;
use crate::error::{OptimizerError, OptimizerResult};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const CONFIG_PATH_ENV: &str = "OPTIMIZER_CONFIG";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BudgetRules {
    /// ROAS above this flags a scale-high-performer opportunity
    pub max_roas: f64,
    /// Relative ROAS gap between best and worst that triggers reallocation
    pub reallocation_threshold: f64,
    /// Largest fractional increase applied to the receiving platform
    pub max_budget_increase: f64,
    pub safe_mode: bool,
    /// Reallocations at or above this amount never auto-execute in safe mode
    pub safe_mode_max_reallocation: f64,
}

impl Default for BudgetRules {
    fn default() -> Self {
        Self {
            max_roas: 8.0,
            reallocation_threshold: 0.15,
            max_budget_increase: 0.25,
            safe_mode: true,
            safe_mode_max_reallocation: 500.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BiddingRules {
    pub target_cpa: f64,
    pub bid_adjustment_rate: f64,
}

impl Default for BiddingRules {
    fn default() -> Self {
        Self {
            target_cpa: 45.0,
            bid_adjustment_rate: 0.1,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PerformanceRules {
    pub ctr_warning_threshold: f64,
    pub ctr_critical_threshold: f64,
    pub impression_share_target: f64,
}

impl Default for PerformanceRules {
    fn default() -> Self {
        Self {
            ctr_warning_threshold: 0.015,
            ctr_critical_threshold: 0.01,
            impression_share_target: 0.3,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OptimizationRules {
    pub budget: BudgetRules,
    pub bidding: BiddingRules,
    pub performance: PerformanceRules,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// tokio interval loop
    #[default]
    Interval,
    /// tokio-cron-scheduler repeated job
    Cron,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub interval_secs: u64,
    pub fetch_timeout_ms: u64,
    pub action_timeout_ms: u64,
    pub scheduler: SchedulerKind,
    /// JSONL audit log; `null` keeps the log in memory only
    pub log_path: Option<PathBuf>,
    /// Number of cycles kept for volatility/accuracy
    pub history_window: usize,
    /// Accuracy assumed until any action has been attempted
    pub default_historical_accuracy: f64,
    /// Per-observer queue depth for the live feed
    pub observer_buffer: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            interval_secs: scheduling::DEFAULT_INTERVAL.as_secs(),
            fetch_timeout_ms: scheduling::DEFAULT_FETCH_TIMEOUT_MS,
            action_timeout_ms: scheduling::DEFAULT_ACTION_TIMEOUT_MS,
            scheduler: SchedulerKind::Interval,
            log_path: Some(PathBuf::from("./data/optimizations.jsonl")),
            history_window: 24,
            default_historical_accuracy: 0.88,
            observer_buffer: 64,
        }
    }
}

impl OptimizerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Http,
    /// Fixture-backed platform, no network
    #[default]
    Sandbox,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    #[serde(default)]
    pub kind: PlatformKind,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Fixture reported by sandbox platforms
    pub metrics: Option<PlatformMetrics>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActionsConfig {
    #[serde(default)]
    pub kind: PlatformKind,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub rules: OptimizationRules,
    pub platforms: Vec<PlatformConfig>,
    #[serde(default)]
    pub actions: ActionsConfig,
}

impl AppConfig {
    /// Load from `$OPTIMIZER_CONFIG`, falling back to `config.yaml`.
    pub fn load() -> OptimizerResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> OptimizerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            OptimizerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> OptimizerResult<Self> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let config: AppConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OptimizerResult<()> {
        if self.platforms.is_empty() {
            return Err(OptimizerError::Config("at least one platform is required".to_string()));
        }

        let mut seen = HashSet::new();
        for platform in &self.platforms {
            if platform.name.trim().is_empty() {
                return Err(OptimizerError::Config("platform name must not be empty".to_string()));
            }
            if !seen.insert(platform.name.as_str()) {
                return Err(OptimizerError::Config(format!("duplicate platform '{}'", platform.name)));
            }
            if platform.kind == PlatformKind::Http && platform.base_url.is_none() {
                return Err(OptimizerError::Config(format!(
                    "platform '{}' is kind http but has no base_url",
                    platform.name
                )));
            }
        }

        if self.actions.kind == PlatformKind::Http && self.actions.base_url.is_none() {
            return Err(OptimizerError::Config("actions.kind is http but actions.base_url is missing".to_string()));
        }

        if self.optimizer.interval_secs == 0 {
            return Err(OptimizerError::Config("optimizer.interval_secs must be > 0".to_string()));
        }

        let perf = &self.rules.performance;
        if perf.ctr_critical_threshold > perf.ctr_warning_threshold {
            return Err(OptimizerError::Config(format!(
                "ctr_critical_threshold ({}) must not exceed ctr_warning_threshold ({})",
                perf.ctr_critical_threshold, perf.ctr_warning_threshold
            )));
        }

        Ok(())
    }
}
