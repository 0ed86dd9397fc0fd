pub mod executor;
pub mod fetcher;
pub mod history;
pub mod job_store;
pub mod optimizer;
pub mod reporting;
pub mod scheduler;

pub use executor::OptimizationExecutor;
pub use fetcher::SnapshotFetcher;
pub use history::PerformanceHistory;
pub use job_store::ActiveJobStore;
pub use optimizer::CampaignOptimizer;
pub use reporting::{OptimizationLog, OptimizationSummary};
pub use scheduler::{
    CronFacility, IntervalFacility, JobFacility, JobStatus, OptimizationScheduler, StartOutcome,
};

#[cfg(test)]
mod reporting_tests;
