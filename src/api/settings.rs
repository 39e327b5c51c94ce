//! Library configuration endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::system_config::{ExamPeriod, SystemConfig, UpdateExamPeriods},
    AppState,
};

use super::AuthenticatedUser;

/// Configured exam periods
#[utoipa::path(
    get,
    path = "/settings/exam-periods",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Exam periods", body = Vec<ExamPeriod>)
    )
)]
pub async fn get_exam_periods(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ExamPeriod>>> {
    let periods = state.services.settings.exam_periods().await?;
    Ok(Json(periods))
}

/// Replace the exam periods
#[utoipa::path(
    put,
    path = "/settings/exam-periods",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateExamPeriods,
    responses(
        (status = 200, description = "Updated configuration", body = SystemConfig),
        (status = 400, description = "A period ends before it starts"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn update_exam_periods(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<UpdateExamPeriods>,
) -> AppResult<Json<SystemConfig>> {
    claims.require_admin()?;

    let config = state.services.settings.update_exam_periods(request).await?;
    Ok(Json(config))
}
