//! Administrator mail tooling

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    AppState,
};

use super::{AuthenticatedUser, MessageResponse};

/// New SMTP account credentials
#[derive(Deserialize, ToSchema)]
pub struct UpdateEmailConfigRequest {
    /// SMTP account, also used as the sender address
    pub email: Option<String>,
    /// App password for the account
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TestEmailRequest {
    /// Recipient of the test message
    pub email: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Swap the mail credentials used by every notification
#[utoipa::path(
    post,
    path = "/admin-tools/update-email-config",
    tag = "admin-tools",
    security(("bearer_auth" = [])),
    request_body = UpdateEmailConfigRequest,
    responses(
        (status = 200, description = "Credentials reloaded", body = MessageResponse),
        (status = 400, description = "Email and password are required"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn update_email_config(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<UpdateEmailConfigRequest>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    let (Some(email), Some(password)) = (present(request.email), present(request.password)) else {
        return Err(AppError::Validation("Email and App Password are required.".to_string()));
    };

    state.services.email.settings().reload(&email, &password);
    Ok(Json(MessageResponse::new(
        "Configuration updated successfully! You can now send a test email.",
    )))
}

/// Send a test message through the current mail settings
#[utoipa::path(
    post,
    path = "/admin-tools/test-email",
    tag = "admin-tools",
    security(("bearer_auth" = [])),
    request_body = TestEmailRequest,
    responses(
        (status = 200, description = "Test email sent", body = MessageResponse),
        (status = 400, description = "Target email is required"),
        (status = 500, description = "Delivery failed")
    )
)]
pub async fn send_test_email(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<TestEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    let to = present(request.email)
        .ok_or_else(|| AppError::Validation("Target email is required".to_string()))?;

    state.services.email.send_test(&to).await?;
    Ok(Json(MessageResponse::new("Test email sent successfully!")))
}
