//! Externally triggered notification sweep

use axum::{extract::State, Json};

use crate::{models::notification::CronSummary, AppState};

/// Run the overdue and due-soon sweeps now.
///
/// Open to an external scheduler; each task settles independently and its
/// outcome is reported in the summary.
#[utoipa::path(
    get,
    path = "/cron/notifications",
    tag = "cron",
    responses(
        (status = 200, description = "Per-task outcome", body = CronSummary)
    )
)]
pub async fn run_notifications(State(state): State<AppState>) -> Json<CronSummary> {
    tracing::info!("Received cron request for notifications");
    Json(state.services.notifications.run_sweep().await)
}
