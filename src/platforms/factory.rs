use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, PlatformKind};
use crate::error::{OptimizerError, OptimizerResult};

use super::{
    http::{HttpActionClient, HttpMetricsSource},
    sandbox::{SandboxActions, SandboxMetricsSource},
    traits::{BidAction, BudgetAction, CreativeTrigger, MetricsSource},
};

/// Every collaborator the engine talks to.
#[derive(Clone)]
pub struct PlatformSet {
    pub sources: Vec<Arc<dyn MetricsSource>>,
    pub budget: Arc<dyn BudgetAction>,
    pub bids: Arc<dyn BidAction>,
    pub creatives: Arc<dyn CreativeTrigger>,
}

pub fn build_platforms(config: &AppConfig) -> OptimizerResult<PlatformSet> {
    let mut sources: Vec<Arc<dyn MetricsSource>> = Vec::with_capacity(config.platforms.len());
    let mut sandbox_budgets = HashMap::new();

    for platform in &config.platforms {
        match platform.kind {
            PlatformKind::Http => {
                let base_url = platform.base_url.as_deref().ok_or_else(|| {
                    OptimizerError::Config(format!("platform '{}' has no base_url", platform.name))
                })?;
                sources.push(Arc::new(HttpMetricsSource::new(
                    platform.name.clone(),
                    base_url,
                    platform.api_key.clone(),
                )?));
            }
            PlatformKind::Sandbox => {
                if let Some(m) = &platform.metrics {
                    sandbox_budgets.insert(platform.name.clone(), m.daily_budget);
                }
                sources.push(Arc::new(SandboxMetricsSource::new(
                    platform.name.clone(),
                    platform.metrics.clone(),
                )));
            }
        }
        info!("🔌 Registered {:?} platform: {}", platform.kind, platform.name);
    }

    let set = match config.actions.kind {
        PlatformKind::Http => {
            let base_url = config.actions.base_url.as_deref().ok_or_else(|| {
                OptimizerError::Config("actions.base_url is required for http actions".to_string())
            })?;
            let client = Arc::new(HttpActionClient::new(base_url, config.actions.api_key.clone())?);
            info!("🔌 Platform actions routed to {}", base_url);
            PlatformSet {
                sources,
                budget: client.clone(),
                bids: client.clone(),
                creatives: client,
            }
        }
        PlatformKind::Sandbox => {
            let sandbox = Arc::new(SandboxActions::new(sandbox_budgets));
            info!("🧪 Platform actions run in sandbox mode");
            PlatformSet {
                sources,
                budget: sandbox.clone(),
                bids: sandbox.clone(),
                creatives: sandbox,
            }
        }
    };

    Ok(set)
}
