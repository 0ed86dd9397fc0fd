pub mod factory;
pub mod traits;
pub mod types;

pub mod http;
pub mod sandbox;

pub use factory::{build_platforms, PlatformSet};
pub use traits::{BidAction, BudgetAction, CreativeTrigger, MetricsSource, PlatformResult};
