//! Student registry endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::student::{CreateStudent, Student, StudentQuery, UpdateStudent},
    AppState,
};

use super::{AuthenticatedUser, MessageResponse};

#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    params(StudentQuery),
    responses(
        (status = 200, description = "Registered students", body = Vec<Student>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_students(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<StudentQuery>,
) -> AppResult<Json<Vec<Student>>> {
    claims.require_admin()?;

    let students = state.services.students.list(query.search.as_deref()).await?;
    Ok(Json(students))
}

#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    security(("bearer_auth" = [])),
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student registered", body = Student),
        (status = 400, description = "Invalid request or duplicate roll number")
    )
)]
pub async fn create_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateStudent>,
) -> AppResult<(StatusCode, Json<Student>)> {
    claims.require_admin()?;

    let student = state.services.students.create(request).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    put,
    path = "/students/{roll_no}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("roll_no" = String, Path, description = "Roll number")
    ),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Student not found")
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(roll_no): Path<String>,
    Json(request): Json<UpdateStudent>,
) -> AppResult<Json<Student>> {
    claims.require_admin()?;

    let student = state.services.students.update(&roll_no, request).await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/students/{roll_no}",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("roll_no" = String, Path, description = "Roll number")
    ),
    responses(
        (status = 200, description = "Student deleted", body = MessageResponse),
        (status = 404, description = "Student not found")
    )
)]
pub async fn delete_student(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(roll_no): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.students.delete(&roll_no).await?;
    Ok(Json(MessageResponse::new("Student deleted successfully")))
}
