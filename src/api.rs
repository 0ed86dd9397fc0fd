use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{OptimizerError, OptimizerResult};
use crate::notifier::LiveNotifier;
use crate::platforms::build_platforms;
use crate::services::{
    ActiveJobStore, CampaignOptimizer, JobFacility, OptimizationExecutor, OptimizationLog, OptimizationScheduler,
    PerformanceHistory, SnapshotFetcher, StartOutcome,
};

pub struct AppState {
    pub scheduler: OptimizationScheduler,
    pub notifier: LiveNotifier,
    pub log: Arc<OptimizationLog>,
    pub config: AppConfig,
}

impl AppState {
    /// Wire platforms, engine and scheduler from configuration.
    pub fn from_config(config: AppConfig, facility: Arc<dyn JobFacility>) -> OptimizerResult<Self> {
        let platforms = build_platforms(&config)?;
        let opt = &config.optimizer;

        let notifier = LiveNotifier::new();
        let log = Arc::new(OptimizationLog::new(opt.log_path.clone()));

        let optimizer = CampaignOptimizer::new(
            SnapshotFetcher::new(platforms.sources, opt.fetch_timeout()),
            OptimizationExecutor::new(
                platforms.budget,
                platforms.bids,
                platforms.creatives,
                opt.action_timeout(),
            ),
            config.rules.clone(),
            PerformanceHistory::new(opt.history_window, opt.default_historical_accuracy),
            notifier.clone(),
            log.clone(),
        );
        let scheduler = OptimizationScheduler::new(optimizer, facility, opt.interval())
            .with_store(ActiveJobStore::beside_log(log.log_path()));

        Ok(Self {
            scheduler,
            notifier,
            log,
            config,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/campaigns/{id}/optimization/start", post(start_optimization))
        .route("/campaigns/{id}/optimization/stop", post(stop_optimization))
        .route("/campaigns/{id}/optimization/run", post(run_optimization))
        .route("/campaigns/{id}/optimization/status", get(optimization_status))
        .route("/campaigns/{id}/optimization/report", get(optimization_report))
        .route("/campaigns/{id}/optimization/live", get(live_updates))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>) -> OptimizerResult<()> {
    let bind_addr = state.config.server.bind_addr.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("🌐 API Server listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": message.into() }))).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let active = state.scheduler.active_jobs().await;
    Json(json!({ "status": "ok", "active_jobs": active.len() }))
}

async fn start_optimization(State(state): State<Arc<AppState>>, Path(campaign_id): Path<String>) -> Response {
    match state.scheduler.start(&campaign_id).await {
        Ok(outcome) => {
            let message = match outcome {
                StartOutcome::Started => "Optimization started",
                StartOutcome::AlreadyRunning => "Optimization already running",
            };
            Json(json!({
                "success": true,
                "message": message,
                "status": outcome,
                "campaign_id": campaign_id,
                "interval_secs": state.scheduler.interval().as_secs(),
            }))
            .into_response()
        }
        Err(e) => {
            error!("[API] start {} failed: {}", campaign_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn stop_optimization(State(state): State<Arc<AppState>>, Path(campaign_id): Path<String>) -> Response {
    match state.scheduler.stop(&campaign_id).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Optimization stopped",
            "campaign_id": campaign_id,
        }))
        .into_response(),
        Err(OptimizerError::JobNotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, "Optimization not found")
        }
        Err(e) => {
            error!("[API] stop {} failed: {}", campaign_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn optimization_status(State(state): State<Arc<AppState>>, Path(campaign_id): Path<String>) -> Response {
    let status = state.scheduler.status(&campaign_id).await;
    Json(json!({
        "success": true,
        "campaign_id": campaign_id,
        "active": status.active,
        "interval_secs": status.interval_secs,
        "next_run_at": status.next_run_at,
        "last_run_at": status.last_run_at,
        "cycles_completed": status.cycles_completed,
    }))
    .into_response()
}

async fn run_optimization(State(state): State<Arc<AppState>>, Path(campaign_id): Path<String>) -> Response {
    match state.scheduler.trigger(&campaign_id).await {
        Ok(report) => Json(json!({
            "success": true,
            "campaign_id": campaign_id,
            "result": report,
        }))
        .into_response(),
        Err(e) if e.aborts_cycle() => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        Err(e) => {
            error!("[API] run {} failed: {}", campaign_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn optimization_report(State(state): State<Arc<AppState>>, Path(campaign_id): Path<String>) -> Response {
    match state.log.summary(&campaign_id) {
        Some(summary) => Json(json!({
            "success": true,
            "campaign_id": campaign_id,
            "summary": summary,
        }))
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No optimization report yet"),
    }
}

async fn live_updates(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Response {
    let notifier = state.notifier.clone();
    let buffer = state.config.optimizer.observer_buffer;
    ws.on_upgrade(move |socket| handle_live(socket, notifier, campaign_id, buffer))
}

/// Pushes live events for one campaign until the client goes away.
async fn handle_live(socket: WebSocket, notifier: LiveNotifier, campaign_id: String, buffer: usize) {
    let (observer_id, mut rx) = notifier.subscribe_channel(&campaign_id, buffer);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("[API] Failed to serialize live event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    warn!("[API] Live observer {} send failed: {}", observer_id, e);
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                None | Some(Ok(Message::Close(_))) => break,
                Some(Err(e)) => {
                    warn!("[API] Live observer {} error: {}", observer_id, e);
                    break;
                }
                Some(Ok(_)) => debug!("[API] Ignoring client message from {}", observer_id),
            }
        }
    }

    notifier.unsubscribe(&campaign_id, observer_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::IntervalFacility;

    const CONFIG: &str = r#"
optimizer:
  interval_secs: 60
  log_path: null
platforms:
  - name: google_ads
    metrics: { cost: 250, revenue: 1200, clicks: 450, impressions: 15000, conversions: 25, daily_budget: 300, data_points: 1500 }
  - name: facebook_ads
    metrics: { cost: 180, revenue: 720, clicks: 360, impressions: 12000, conversions: 18, daily_budget: 200, data_points: 900 }
"#;

    fn state(yaml: &str) -> Arc<AppState> {
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        Arc::new(AppState::from_config(config, Arc::new(IntervalFacility::new())).unwrap())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_start_then_already_running() {
        let state = state(CONFIG);

        let resp = start_optimization(State(state.clone()), Path("c1".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "started");
        assert_eq!(body["interval_secs"], 60);

        let body = body_json(start_optimization(State(state.clone()), Path("c1".to_string())).await).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "already_running");

        state.scheduler.stop("c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_unknown_is_404() {
        let state = state(CONFIG);
        let resp = stop_optimization(State(state), Path("ghost".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Optimization not found");
    }

    #[tokio::test]
    async fn test_run_then_report() {
        let state = state(CONFIG);

        let resp = optimization_report(State(state.clone()), Path("c1".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = run_optimization(State(state.clone()), Path("c1".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["result"]["campaign_id"], "c1");
        assert_eq!(body["result"]["trigger"], "manual");

        let body = body_json(optimization_report(State(state.clone()), Path("c1".to_string())).await).await;
        assert_eq!(body["summary"]["cycles"], 1);

        // One-off runs are not tracked as jobs
        let body = body_json(optimization_status(State(state.clone()), Path("c1".to_string())).await).await;
        assert_eq!(body["active"], false);
        assert_eq!(body["cycles_completed"], 0);

        start_optimization(State(state.clone()), Path("c1".to_string())).await;
        run_optimization(State(state.clone()), Path("c1".to_string())).await;
        let body = body_json(optimization_status(State(state.clone()), Path("c1".to_string())).await).await;
        assert_eq!(body["active"], true);
        assert_eq!(body["cycles_completed"], 1);
        assert!(body["next_run_at"].is_string());

        state.scheduler.stop("c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_jobs_restored_from_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("optimizations.jsonl");
        let yaml = CONFIG.replace("log_path: null", &format!("log_path: {:?}", log_path.display().to_string()));

        let first = state(&yaml);
        start_optimization(State(first.clone()), Path("c1".to_string())).await;
        assert!(dir.path().join(crate::services::job_store::ACTIVE_JOBS_FILE_NAME).exists());

        let second = state(&yaml);
        assert_eq!(second.scheduler.restore().await.unwrap(), 1);
        let body = body_json(optimization_status(State(second.clone()), Path("c1".to_string())).await).await;
        assert_eq!(body["active"], true);

        first.scheduler.stop("c1").await.unwrap();
        second.scheduler.stop("c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_run_without_data_is_502() {
        let state = state(
            r#"
optimizer:
  log_path: null
platforms:
  - name: google_ads
"#,
        );
        let resp = run_optimization(State(state), Path("c1".to_string())).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
