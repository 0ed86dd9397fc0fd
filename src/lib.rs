//! Campaign Optimizer - continuous cross-platform ad campaign optimization
//!
//! This library fetches per-platform campaign metrics on a schedule, analyzes
//! them, generates budget/bid/creative recommendations, scores confidence and
//! auto-executes what passes the execution gate.

pub mod api;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod notifier;
pub mod platforms;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{OptimizerError, OptimizerResult};
pub use events::LiveEvent;
pub use notifier::LiveNotifier;

#[cfg(test)]
mod config_tests;
