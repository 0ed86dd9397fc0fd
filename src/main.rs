use std::sync::Arc;

use campaign_optimizer::api::{run_server, AppState};
use campaign_optimizer::config::{AppConfig, SchedulerKind};
use campaign_optimizer::services::{CronFacility, IntervalFacility, JobFacility};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Campaign Optimizer...");

    // Load Configuration
    let config = AppConfig::load()?;
    info!(
        "Loaded Configuration: {} platform(s), interval {}s, safe mode {}",
        config.platforms.len(),
        config.optimizer.interval_secs,
        config.rules.budget.safe_mode
    );

    let facility: Arc<dyn JobFacility> = match config.optimizer.scheduler {
        SchedulerKind::Interval => Arc::new(IntervalFacility::new()),
        SchedulerKind::Cron => Arc::new(CronFacility::new().await?),
    };
    info!("⏱️ Using {:?} job facility", config.optimizer.scheduler);

    let app_state = Arc::new(AppState::from_config(config, facility)?);

    // Resume jobs that were running before the last shutdown
    if let Err(e) = app_state.scheduler.restore().await {
        warn!("⚠️ Could not restore optimization jobs: {}", e);
    }

    // Start API Server
    info!("Initializing API Server...");
    run_server(app_state).await?;

    Ok(())
}
