//! Catalog copy endpoints and self-service borrowing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::copy::{BookCopy, BorrowResponse, CatalogQuery, CatalogResponse, CreateBookCopy},
    AppState,
};

use super::{AuthenticatedUser, MessageResponse};

/// Add a physical copy to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBookCopy,
    responses(
        (status = 201, description = "Copy created", body = BookCopy),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn create_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBookCopy>,
) -> AppResult<(StatusCode, Json<BookCopy>)> {
    claims.require_admin()?;

    let copy = state.services.catalog.create_copy(request).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// Catalog grouped by title and author
#[utoipa::path(
    get,
    path = "/books/bulk",
    tag = "books",
    security(("bearer_auth" = [])),
    params(CatalogQuery),
    responses(
        (status = 200, description = "Grouped catalog page", body = CatalogResponse),
        (status = 400, description = "Invalid search pattern")
    )
)]
pub async fn list_grouped(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<CatalogResponse>> {
    let page = state.services.catalog.list_grouped(&query).await?;
    Ok(Json(page))
}

/// Every copy sharing the given copy's title and author
#[utoipa::path(
    get,
    path = "/books/copies/{copy_id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("copy_id" = Uuid, Path, description = "Any copy of the title")
    ),
    responses(
        (status = 200, description = "Copies of the title", body = Vec<BookCopy>),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn list_copies(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(copy_id): Path<Uuid>,
) -> AppResult<Json<Vec<BookCopy>>> {
    claims.require_admin()?;

    let copies = state.services.catalog.copies_of(copy_id).await?;
    Ok(Json(copies))
}

/// Remove a copy from the catalog
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy deleted", body = MessageResponse),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn delete_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.catalog.delete_copy(id).await?;
    Ok(Json(MessageResponse::new("Book deleted successfully")))
}

/// Borrow one copy for the calling user
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy borrowed", body = BorrowResponse),
        (status = 400, description = "Copy is currently unavailable"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn borrow_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowResponse>> {
    let response = state.services.circulation.borrow(id, &claims).await?;
    Ok(Json(response))
}
