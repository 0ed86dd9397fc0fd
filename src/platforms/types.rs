use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetChange {
    pub success: bool,
    /// Daily budgets after the move, keyed by platform
    #[serde(default)]
    pub new_budgets: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidChange {
    pub success: bool,
    pub new_bid_modifier: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreativeRequest {
    pub success: bool,
    #[serde(default)]
    pub creatives_requested: u32,
    pub estimated_completion: Option<DateTime<Utc>>,
}

/// Request bodies sent by the HTTP adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReallocateBudgetBody {
    pub from_platform: String,
    pub to_platform: String,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdjustBidsBody {
    pub adjustment: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestCreativesBody {
    pub platforms: Vec<String>,
}
