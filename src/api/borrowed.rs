//! Borrow record endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::loan::{
        BorrowListResponse, BorrowQuery, BorrowedBook, BulkDeleteRequest, CreateBorrowRecord,
        PayFineRequest, UpdateBorrowRecord,
    },
    AppState,
};

use super::{AuthenticatedUser, MessageResponse};

/// Bulk delete outcome
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub message: String,
    pub deleted_count: u64,
}

/// List borrow records. Students only see their own.
#[utoipa::path(
    get,
    path = "/borrowed",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Page of borrow records", body = BorrowListResponse),
        (status = 400, description = "Invalid search pattern")
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<BorrowListResponse>> {
    let page = state.services.circulation.list(&query, &claims).await?;
    Ok(Json(page))
}

/// Record a loan on behalf of a student
#[utoipa::path(
    post,
    path = "/borrowed",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRecord,
    responses(
        (status = 201, description = "Borrow record created", body = BorrowedBook),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn create_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowRecord>,
) -> AppResult<(StatusCode, Json<BorrowedBook>)> {
    claims.require_admin()?;

    let record = state.services.circulation.create_record(request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Update a borrow record; marking it returned assesses the late fine
#[utoipa::path(
    put,
    path = "/borrowed/{id}",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    request_body = UpdateBorrowRecord,
    responses(
        (status = 200, description = "Updated record", body = BorrowedBook),
        (status = 400, description = "Invalid update"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn update_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateBorrowRecord>,
) -> AppResult<Json<BorrowedBook>> {
    claims.require_admin()?;

    let record = state.services.circulation.update(id, patch).await?;
    Ok(Json(record))
}

/// Flip the self-service payment gate
#[utoipa::path(
    patch,
    path = "/borrowed/{id}/toggle-payment",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Updated record", body = BorrowedBook),
        (status = 404, description = "Record not found")
    )
)]
pub async fn toggle_payment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowedBook>> {
    claims.require_admin()?;

    let record = state.services.circulation.toggle_payment(id).await?;
    Ok(Json(record))
}

/// Settle the fine on a record
#[utoipa::path(
    patch,
    path = "/borrowed/{id}/pay-fine",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    request_body = PayFineRequest,
    responses(
        (status = 200, description = "Fine paid", body = BorrowedBook),
        (status = 403, description = "Payment not enabled by librarian"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<PayFineRequest>,
) -> AppResult<Json<BorrowedBook>> {
    let record = state
        .services
        .circulation
        .pay_fine(id, request.payment_method, &claims)
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/borrowed/{id}",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Record deleted", body = MessageResponse),
        (status = 404, description = "Record not found")
    )
)]
pub async fn delete_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.circulation.delete(id).await?;
    Ok(Json(MessageResponse::new("Record deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/borrowed/bulk-delete",
    tag = "borrowed",
    security(("bearer_auth" = [])),
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Records deleted", body = BulkDeleteResponse),
        (status = 400, description = "No ids supplied")
    )
)]
pub async fn bulk_delete(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResponse>> {
    claims.require_admin()?;

    let deleted_count = state.services.circulation.bulk_delete(&request.ids).await?;
    Ok(Json(BulkDeleteResponse {
        message: "Records deleted".to_string(),
        deleted_count,
    }))
}
