//! In-memory pipeline stages. Nothing in here awaits.

pub mod analyzer;
pub mod confidence;
pub mod gate;
pub mod model;
pub mod recommend;

pub use analyzer::analyze;
pub use confidence::{score, HistoryStats};
pub use gate::ExecutionGate;
pub use recommend::generate;
