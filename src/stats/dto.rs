use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::GlobalStats;
use super::services::WeeklyAggregate;
use super::window::RecapWindow;

#[derive(Debug, Deserialize)]
pub struct DebugQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DebugUser {
    pub email: String,
    pub id: Option<Uuid>,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DebugWeek {
    pub window: RecapWindow,
    #[serde(flatten)]
    pub aggregate: WeeklyAggregate,
    pub degraded: Option<String>,
}

/// Snapshot of what a recap would be built from.
#[derive(Debug, Serialize)]
pub struct StatsProbe {
    pub store_connected: bool,
    pub total_users: usize,
    pub emails_sample: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_user: Option<DebugUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_user_stats: Option<GlobalStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_user_last_week: Option<DebugWeek>,
}
