//! Notification sweep reports

use serde::Serialize;
use utoipa::ToSchema;

/// Counters for one sweep over borrow records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub examined: usize,
    pub notified: usize,
    /// Records whose stored status or fine was brought up to date
    pub updated: usize,
    pub failed: usize,
}

/// Settled state of one sweep task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskOutcome {
    pub task: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response of the externally triggered sweep
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CronSummary {
    pub success: bool,
    pub summary: Vec<TaskOutcome>,
}
