//! Athenaeum Library Circulation Server
//!
//! REST JSON API for a college library's circulation desk: borrowing and
//! returning physical copies, late fines, reservations and the notices sent
//! to borrowers.

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Books
        .route("/books", post(api::books::create_copy))
        .route("/books/bulk", get(api::books::list_grouped))
        .route("/books/copies/:copy_id", get(api::books::list_copies))
        .route("/books/:id", delete(api::books::delete_copy))
        .route("/books/:id/borrow", post(api::books::borrow_copy))
        // Borrow records
        .route(
            "/borrowed",
            get(api::borrowed::list_records).post(api::borrowed::create_record),
        )
        .route("/borrowed/bulk-delete", post(api::borrowed::bulk_delete))
        .route(
            "/borrowed/:id",
            put(api::borrowed::update_record).delete(api::borrowed::delete_record),
        )
        .route("/borrowed/:id/toggle-payment", patch(api::borrowed::toggle_payment))
        .route("/borrowed/:id/pay-fine", patch(api::borrowed::pay_fine))
        // Reservations
        .route(
            "/reservations",
            get(api::reservations::list_reservations).post(api::reservations::create_reservation),
        )
        .route("/reservations/:id/cancel", patch(api::reservations::cancel_reservation))
        .route("/reservations/:id/status", patch(api::reservations::update_status))
        // Students
        .route(
            "/students",
            get(api::students::list_students).post(api::students::create_student),
        )
        .route(
            "/students/:roll_no",
            put(api::students::update_student).delete(api::students::delete_student),
        )
        // Settings
        .route(
            "/settings/exam-periods",
            get(api::settings::get_exam_periods).put(api::settings::update_exam_periods),
        )
        // Admin tools
        .route(
            "/admin-tools/update-email-config",
            post(api::admin_tools::update_email_config),
        )
        .route("/admin-tools/test-email", post(api::admin_tools::send_test_email))
        // Notification sweep
        .route("/cron/notifications", get(api::cron::run_notifications))
        // Analytics
        .route("/analytics", get(api::analytics::dashboard))
        .route("/analytics/circulation", get(api::analytics::circulation_stats))
        .with_state(state);

    Router::new()
        .nest("/api", routes)
        .merge(api::openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
