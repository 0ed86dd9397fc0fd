//! Per-campaign recurring optimization jobs.
//!
//! A campaign is either Stopped (no registry entry) or Running (one job in the
//! timer facility). The registry lock is held across the whole start/stop
//! transition, so two concurrent starts for one campaign yield one job.
//!
//! Cycles of one campaign never overlap: every cycle holds that campaign's
//! guard. A tick that finds the guard taken is skipped; a manual trigger waits.
//!
//! Per-campaign state lives while the campaign is scheduled or a cycle is in
//! flight. Status of an unscheduled campaign therefore reads as empty.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::constants::{events, scheduling::JOB_NAME_PREFIX};
use crate::engine::model::{CycleReport, CycleTrigger};
use crate::error::{OptimizerError, OptimizerResult};

use super::job_store::ActiveJobStore;
use super::optimizer::CampaignOptimizer;

pub type JobTask = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Timer facility that runs a task every `every`, first run one period out.
#[async_trait]
pub trait JobFacility: Send + Sync {
    async fn schedule(&self, name: &str, every: Duration, task: JobTask) -> OptimizerResult<Uuid>;
    async fn remove(&self, job_id: Uuid) -> OptimizerResult<()>;
}

/// tokio interval loop per job. Missed ticks are delayed, not burst.
#[derive(Default)]
pub struct IntervalFacility {
    stops: DashMap<Uuid, watch::Sender<bool>>,
}

impl IntervalFacility {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobFacility for IntervalFacility {
    async fn schedule(&self, name: &str, every: Duration, task: JobTask) -> OptimizerResult<Uuid> {
        if every.is_zero() {
            return Err(OptimizerError::Scheduler(format!("{}: interval must be > 0", name)));
        }

        let job_id = Uuid::new_v4();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.stops.insert(job_id, stop_tx);

        let name = name.to_string();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // Only ever flips to true; a dropped sender also ends the job
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => task().await,
                }
            }
            info!("[SCHEDULER] Interval job {} ended", name);
        });

        Ok(job_id)
    }

    async fn remove(&self, job_id: Uuid) -> OptimizerResult<()> {
        match self.stops.remove(&job_id) {
            Some((_, stop_tx)) => {
                let _ = stop_tx.send(true);
                Ok(())
            }
            None => Err(OptimizerError::Scheduler(format!("unknown job {}", job_id))),
        }
    }
}

/// tokio-cron-scheduler backed facility.
pub struct CronFacility {
    scheduler: JobScheduler,
}

impl CronFacility {
    pub async fn new() -> OptimizerResult<Self> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        Ok(Self { scheduler })
    }
}

#[async_trait]
impl JobFacility for CronFacility {
    async fn schedule(&self, name: &str, every: Duration, task: JobTask) -> OptimizerResult<Uuid> {
        let job = Job::new_repeated_async(every, move |_uuid, _l| task())?;
        let job_id = self.scheduler.add(job).await?;
        info!("🔔 [SCHEDULER] Cron job {} registered as {}", name, job_id);
        Ok(job_id)
    }

    async fn remove(&self, job_id: Uuid) -> OptimizerResult<()> {
        self.scheduler.remove(&job_id).await?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobStatus {
    pub active: bool,
    pub interval_secs: u64,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub cycles_completed: u64,
}

#[derive(Default)]
struct CampaignState {
    guard: Arc<Mutex<()>>,
    scheduled: AtomicBool,
    last_run_at: RwLock<Option<DateTime<Utc>>>,
    next_run_at: RwLock<Option<DateTime<Utc>>>,
    cycles_completed: AtomicU64,
}

type CampaignStates = DashMap<String, Arc<CampaignState>>;

#[derive(Clone)]
pub struct OptimizationScheduler {
    optimizer: CampaignOptimizer,
    facility: Arc<dyn JobFacility>,
    interval: Duration,
    store: ActiveJobStore,
    /// campaign_id -> job id in the facility
    jobs: Arc<Mutex<HashMap<String, Uuid>>>,
    /// Scheduled campaigns plus any with a cycle in flight
    states: Arc<CampaignStates>,
}

impl OptimizationScheduler {
    pub fn new(optimizer: CampaignOptimizer, facility: Arc<dyn JobFacility>, interval: Duration) -> Self {
        Self {
            optimizer,
            facility,
            interval,
            store: ActiveJobStore::in_memory(),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            states: Arc::new(DashMap::new()),
        }
    }

    /// Persist the active campaign set on every start/stop.
    pub fn with_store(mut self, store: ActiveJobStore) -> Self {
        self.store = store;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn state(&self, campaign_id: &str) -> Arc<CampaignState> {
        self.states
            .entry(campaign_id.to_string())
            .or_default()
            .clone()
    }

    fn persist(&self, jobs: &HashMap<String, Uuid>) {
        let mut ids: Vec<String> = jobs.keys().cloned().collect();
        ids.sort();
        if let Err(e) = self.store.save(&ids) {
            error!("[SCHEDULER] Failed to persist active jobs: {}", e);
        }
    }

    pub async fn start(&self, campaign_id: &str) -> OptimizerResult<StartOutcome> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(campaign_id) {
            info!("[SCHEDULER] {} already running", campaign_id);
            return Ok(StartOutcome::AlreadyRunning);
        }

        let state = self.state(campaign_id);
        let task = self.tick_task(campaign_id);
        let name = format!("{}{}", JOB_NAME_PREFIX, campaign_id);
        let job_id = match self.facility.schedule(&name, self.interval, task).await {
            Ok(job_id) => job_id,
            Err(e) => {
                drop(state);
                release_state(&self.states, campaign_id);
                return Err(e);
            }
        };

        state.scheduled.store(true, Ordering::SeqCst);
        *state.next_run_at.write().await = Some(Utc::now() + to_chrono(self.interval));
        jobs.insert(campaign_id.to_string(), job_id);
        self.persist(&jobs);

        info!(
            event = events::JOB_STARTED,
            "▶️ [SCHEDULER] Optimization started for {} (every {}s)",
            campaign_id,
            self.interval.as_secs()
        );
        Ok(StartOutcome::Started)
    }

    /// An in-flight cycle is allowed to finish.
    pub async fn stop(&self, campaign_id: &str) -> OptimizerResult<()> {
        let mut jobs = self.jobs.lock().await;
        let Some(job_id) = jobs.get(campaign_id).copied() else {
            return Err(OptimizerError::JobNotFound {
                campaign_id: campaign_id.to_string(),
            });
        };

        self.facility.remove(job_id).await?;
        jobs.remove(campaign_id);
        self.persist(&jobs);

        let state = self.states.get(campaign_id).map(|s| s.clone());
        if let Some(state) = state {
            state.scheduled.store(false, Ordering::SeqCst);
            *state.next_run_at.write().await = None;
        }
        release_state(&self.states, campaign_id);

        info!(event = events::JOB_STOPPED, "⏹️ [SCHEDULER] Optimization stopped for {}", campaign_id);
        Ok(())
    }

    /// Starts a job for every campaign saved in the store. Returns how many
    /// were started; ids already running are left alone.
    pub async fn restore(&self) -> OptimizerResult<usize> {
        let mut restored = 0;
        for campaign_id in self.store.load()? {
            match self.start(&campaign_id).await {
                Ok(StartOutcome::Started) => restored += 1,
                Ok(StartOutcome::AlreadyRunning) => {}
                Err(e) => error!("[SCHEDULER] Could not restore {}: {}", campaign_id, e),
            }
        }
        if restored > 0 {
            info!("🔁 [SCHEDULER] Restored {} optimization job(s)", restored);
        }
        Ok(restored)
    }

    pub async fn status(&self, campaign_id: &str) -> JobStatus {
        let active = self.jobs.lock().await.contains_key(campaign_id);
        let state = self.states.get(campaign_id).map(|s| s.clone());

        let (next_run_at, last_run_at, cycles_completed) = match state {
            Some(state) => (
                *state.next_run_at.read().await,
                *state.last_run_at.read().await,
                state.cycles_completed.load(Ordering::Relaxed),
            ),
            None => (None, None, 0),
        };

        JobStatus {
            active,
            interval_secs: self.interval.as_secs(),
            next_run_at: if active { next_run_at } else { None },
            last_run_at,
            cycles_completed,
        }
    }

    pub async fn active_jobs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[cfg(test)]
    pub(crate) fn tracked_campaigns(&self) -> usize {
        self.states.len()
    }

    /// Run one cycle now. Waits for an in-flight cycle of the same campaign
    /// and leaves the schedule untouched.
    pub async fn trigger(&self, campaign_id: &str) -> OptimizerResult<CycleReport> {
        let state = self.state(campaign_id);
        let result = {
            let _guard = state.guard.lock().await;
            Self::run_guarded(&self.optimizer, campaign_id, &state, CycleTrigger::Manual).await
        };
        drop(state);
        release_state(&self.states, campaign_id);
        result
    }

    fn tick_task(&self, campaign_id: &str) -> JobTask {
        let optimizer = self.optimizer.clone();
        let states = self.states.clone();
        let campaign_id = campaign_id.to_string();
        let interval = self.interval;

        Arc::new(move || {
            let optimizer = optimizer.clone();
            let states = states.clone();
            let campaign_id = campaign_id.clone();

            let tick: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
                let state = match states.get(&campaign_id) {
                    Some(state) if state.scheduled.load(Ordering::SeqCst) => state.clone(),
                    _ => return,
                };
                *state.next_run_at.write().await = Some(Utc::now() + to_chrono(interval));

                let Ok(guard) = state.guard.clone().try_lock_owned() else {
                    warn!(
                        event = events::CYCLE_SKIPPED,
                        "⏭️ [SCHEDULER] {} previous cycle still running, skipping tick", campaign_id
                    );
                    return;
                };

                if let Err(e) = Self::run_guarded(&optimizer, &campaign_id, &state, CycleTrigger::Scheduled).await {
                    // Job stays scheduled; next tick retries.
                    error!("❌ [SCHEDULER] {} cycle failed: {}", campaign_id, e);
                }

                drop(guard);
                drop(state);
                // Stopped while this cycle ran
                release_state(&states, &campaign_id);
            });
            tick
        })
    }

    async fn run_guarded(
        optimizer: &CampaignOptimizer,
        campaign_id: &str,
        state: &CampaignState,
        trigger: CycleTrigger,
    ) -> OptimizerResult<CycleReport> {
        let result = optimizer.run_cycle(campaign_id, trigger).await;
        *state.last_run_at.write().await = Some(Utc::now());
        if result.is_ok() {
            state.cycles_completed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

/// Drops a campaign's state once it is unscheduled and nobody else holds it.
/// Callers release their own clone first.
fn release_state(states: &CampaignStates, campaign_id: &str) {
    states.remove_if(campaign_id, |_, state| {
        !state.scheduled.load(Ordering::SeqCst) && Arc::strong_count(state) == 1
    });
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}
