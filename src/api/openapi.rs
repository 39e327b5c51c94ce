//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    admin_tools, analytics, books, borrowed, cron, health, reservations, settings, students,
};

/// Registers the bearer JWT scheme referenced by the secured paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Athenaeum API",
        version = "1.0.0",
        description = "Library circulation REST API: loans, fines, reservations and notices",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Athenaeum Team")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::create_copy,
        books::list_grouped,
        books::list_copies,
        books::delete_copy,
        books::borrow_copy,
        // Borrowed
        borrowed::list_records,
        borrowed::create_record,
        borrowed::update_record,
        borrowed::toggle_payment,
        borrowed::pay_fine,
        borrowed::delete_record,
        borrowed::bulk_delete,
        // Reservations
        reservations::create_reservation,
        reservations::list_reservations,
        reservations::cancel_reservation,
        reservations::update_status,
        // Students
        students::list_students,
        students::create_student,
        students::update_student,
        students::delete_student,
        // Settings
        settings::get_exam_periods,
        settings::update_exam_periods,
        // Admin tools
        admin_tools::update_email_config,
        admin_tools::send_test_email,
        // Cron
        cron::run_notifications,
        // Analytics
        analytics::dashboard,
        analytics::circulation_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::copy::BookCopy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CreateBookCopy,
            crate::models::copy::GroupedBook,
            crate::models::copy::CatalogQuery,
            crate::models::copy::CatalogResponse,
            crate::models::copy::BorrowResponse,
            // Borrowed
            crate::models::loan::BorrowedBook,
            crate::models::loan::ReturnStatus,
            crate::models::loan::PaymentMethod,
            crate::models::loan::CreateBorrowRecord,
            crate::models::loan::UpdateBorrowRecord,
            crate::models::loan::BorrowQuery,
            crate::models::loan::BorrowListResponse,
            crate::models::loan::PayFineRequest,
            crate::models::loan::BulkDeleteRequest,
            crate::models::loan::CirculationStats,
            crate::models::analytics::AnalyticsResponse,
            crate::models::analytics::AnalyticsSummary,
            crate::models::analytics::GroupCount,
            borrowed::BulkDeleteResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReservedBook,
            crate::models::reservation::ReservingStudent,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::ReservationQuery,
            crate::models::reservation::UpdateReservationStatus,
            // Students
            crate::models::student::Student,
            crate::models::student::CreateStudent,
            crate::models::student::UpdateStudent,
            crate::models::student::StudentQuery,
            // Settings
            crate::models::system_config::ExamPeriod,
            crate::models::system_config::SystemConfig,
            crate::models::system_config::UpdateExamPeriods,
            // Admin tools
            admin_tools::UpdateEmailConfigRequest,
            admin_tools::TestEmailRequest,
            // Notifications
            crate::models::notification::CronSummary,
            crate::models::notification::TaskOutcome,
            crate::models::notification::TaskStatus,
            crate::models::notification::SweepReport,
            // Health
            health::HealthResponse,
            // Common
            crate::api::MessageResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog copies and borrowing"),
        (name = "borrowed", description = "Borrow records, returns and fines"),
        (name = "reservations", description = "Reservation queue"),
        (name = "students", description = "Student registry"),
        (name = "settings", description = "Library configuration"),
        (name = "admin-tools", description = "Mail configuration"),
        (name = "cron", description = "Notification sweeps"),
        (name = "analytics", description = "Dashboard and circulation statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
