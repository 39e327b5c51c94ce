//! Circulation analytics

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{analytics::AnalyticsResponse, loan::CirculationStats},
    AppState,
};

use super::AuthenticatedUser;

/// Dashboard summary, copies per genre and borrows per day
#[utoipa::path(
    get,
    path = "/analytics",
    tag = "analytics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library dashboard", body = AnalyticsResponse),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<AnalyticsResponse>> {
    claims.require_admin()?;

    let analytics = state.services.stats.dashboard().await?;
    Ok(Json(analytics))
}

#[utoipa::path(
    get,
    path = "/analytics/circulation",
    tag = "analytics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Circulation totals", body = CirculationStats),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn circulation_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<CirculationStats>> {
    claims.require_admin()?;

    let stats = state.services.stats.circulation().await?;
    Ok(Json(stats))
}
