//! In-process HTTP tests against the full router and the in-memory store

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use athenaeum_server::{
    clock::SystemClock,
    config::{AppConfig, EmailConfig},
    create_router,
    error::AppResult,
    models::{
        student::CreateStudent,
        user::{Role, UserClaims},
    },
    repository::Repository,
    services::{
        email::{MailTransport, OutgoingMail},
        Services,
    },
    AppState,
};

/// Keeps every message instead of talking to an SMTP server
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, _settings: &EmailConfig, mail: &OutgoingMail) -> AppResult<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    services: Arc<Services>,
    secret: String,
}

fn build_test_app() -> TestApp {
    let config = AppConfig::default();
    let services = Arc::new(Services::new(
        Repository::in_memory(),
        &config,
        Arc::new(RecordingTransport::default()),
        Arc::new(SystemClock),
    ));
    let secret = config.auth.jwt_secret.clone();
    let state = AppState {
        config: Arc::new(config),
        services: services.clone(),
    };
    TestApp {
        router: create_router(state),
        services,
        secret,
    }
}

impl TestApp {
    fn token(&self, email: &str, role: Role) -> String {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: email.to_string(),
            email: email.to_string(),
            name: "Test User".to_string(),
            role,
            exp: now + 3600,
            iat: now,
        }
        .create_token(&self.secret)
        .unwrap()
    }

    fn admin(&self) -> String {
        self.token("librarian@college.edu", Role::Admin)
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create_copy(&self, title: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/books",
                Some(&self.admin()),
                Some(json!({ "title": title, "author": "Frank Herbert", "genre": "Fiction" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["_id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = build_test_app();
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = build_test_app();
    let (status, body) = app.send(Method::GET, "/api/borrowed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = app
        .send(Method::GET, "/api/borrowed", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_use_admin_routes() {
    let app = build_test_app();
    let student = app.token("asha@college.edu", Role::Student);
    let (status, body) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&student),
            Some(json!({ "title": "Dune" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Administrator privileges required");
}

#[tokio::test]
async fn borrow_then_list_uses_client_field_names() {
    let app = build_test_app();
    app.services
        .students
        .create(CreateStudent {
            name: "Asha".to_string(),
            roll_no: "CS-042".to_string(),
            email: Some("asha@college.edu".to_string()),
            year_of_study: Some(2),
            department: None,
        })
        .await
        .unwrap();
    let copy_id = app.create_copy("Dune").await;
    let student = app.token("asha@college.edu", Role::Student);

    let (status, body) = app
        .send(Method::POST, &format!("/api/books/{}/borrow", copy_id), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book borrowed successfully");
    assert_eq!(body["book"]["status"], "Borrowed");
    assert_eq!(body["book"]["borrower"], "asha@college.edu");

    let (status, body) = app
        .send(Method::POST, &format!("/api/books/{}/borrow", copy_id), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Book copy is currently unavailable");

    let (status, body) = app
        .send(Method::GET, "/api/borrowed?page=1&limit=5", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 5);
    let record = &body["records"][0];
    assert_eq!(record["returnStatus"], "Not Returned");
    assert_eq!(record["studentId"], "CS-042");
    assert_eq!(record["bookTitle"], "Dune");
    assert_eq!(record["fineAmount"], 0);
    assert_eq!(record["isFinePaid"], true);
    assert!(record["_id"].is_string());
}

#[tokio::test]
async fn listing_accepts_blank_filters_from_the_client() {
    let app = build_test_app();
    let copy_id = app.create_copy("Dune").await;
    let student = app.token("asha@college.edu", Role::Student);
    app.send(Method::POST, &format!("/api/books/{}/borrow", copy_id), Some(&student), None)
        .await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/borrowed?page=1&limit=8&search=&status=&sort=dueDate:asc",
            Some(&app.admin()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 8);
    assert_eq!(body["records"][0]["bookTitle"], "Dune");

    let (status, body) = app
        .send(
            Method::GET,
            "/api/reservations?studentId=&bookId=&status=",
            Some(&app.admin()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}

#[tokio::test]
async fn negative_fine_update_is_rejected() {
    let app = build_test_app();
    let (status, record) = app
        .send(
            Method::POST,
            "/api/borrowed",
            Some(&app.admin()),
            Some(json!({ "studentId": "XX-1", "studentName": "Walk-in", "bookTitle": "Dune" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/borrowed/{}", record["_id"].as_str().unwrap());

    let (status, _) = app
        .send(Method::PUT, &uri, Some(&app.admin()), Some(json!({ "fineAmount": -50 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&app.admin()), Some(json!({ "fineAmount": 25 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fineAmount"], 25);
}

#[tokio::test]
async fn analytics_dashboard_has_summary_genres_and_history() {
    let app = build_test_app();
    app.create_copy("Dune").await;
    app.create_copy("Children of Dune").await;

    let student = app.token("asha@college.edu", Role::Student);
    let (status, _) = app.send(Method::GET, "/api/analytics", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, "/api/analytics", Some(&app.admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["totalBooks"], 2);
    assert_eq!(body["summary"]["totalStudents"], 0);
    assert_eq!(body["summary"]["totalBorrowed"], 0);
    assert_eq!(body["summary"]["totalOverdue"], 0);
    assert_eq!(body["genreStats"][0]["_id"], "Fiction");
    assert_eq!(body["genreStats"][0]["count"], 2);
    assert_eq!(body["borrowHistory"], json!([]));
}

#[tokio::test]
async fn borrowing_unknown_copy_is_not_found() {
    let app = build_test_app();
    let student = app.token("asha@college.edu", Role::Student);
    let uri = format!("/api/books/{}/borrow", uuid::Uuid::new_v4());
    let (status, body) = app.send(Method::POST, &uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Book copy not found");
}

#[tokio::test]
async fn pay_fine_requires_the_librarian_gate() {
    let app = build_test_app();
    let copy_id = app.create_copy("Dune").await;
    let student = app.token("asha@college.edu", Role::Student);
    app.send(Method::POST, &format!("/api/books/{}/borrow", copy_id), Some(&student), None)
        .await;

    let (_, listing) = app
        .send(Method::GET, "/api/borrowed", Some(&app.admin()), None)
        .await;
    let record_id = listing["records"][0]["_id"].as_str().unwrap().to_string();
    let pay_uri = format!("/api/borrowed/{}/pay-fine", record_id);

    let (status, body) = app
        .send(Method::PATCH, &pay_uri, Some(&student), Some(json!({ "paymentMethod": "UPI" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Payment not enabled by librarian.");

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/borrowed/{}/toggle-payment", record_id),
            Some(&app.admin()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isPaymentEnabled"], true);

    let (status, body) = app
        .send(Method::PATCH, &pay_uri, Some(&student), Some(json!({ "paymentMethod": "UPI" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFinePaid"], true);
    assert_eq!(body["isPaymentEnabled"], false);
    assert_eq!(body["paymentMethod"], "UPI");
    assert!(body["paymentDate"].is_string());
}

#[tokio::test]
async fn bulk_delete_reports_count() {
    let app = build_test_app();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/borrowed/bulk-delete",
            Some(&app.admin()),
            Some(json!({ "ids": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, record) = app
        .send(
            Method::POST,
            "/api/borrowed",
            Some(&app.admin()),
            Some(json!({ "studentId": "XX-1", "studentName": "Walk-in", "bookTitle": "Dune" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/borrowed/bulk-delete",
            Some(&app.admin()),
            Some(json!({ "ids": [record["_id"]] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 1);
}

#[tokio::test]
async fn cron_reports_both_tasks() {
    let app = build_test_app();
    let (status, body) = app
        .send(Method::GET, "/api/cron/notifications", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"][0]["task"], "Overdue Check");
    assert_eq!(body["summary"][0]["status"], "fulfilled");
    assert_eq!(body["summary"][1]["task"], "Upcoming Due Check");
    assert!(body["summary"][1].get("reason").is_none());
}

#[tokio::test]
async fn admin_tools_validate_input() {
    let app = build_test_app();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin-tools/update-email-config",
            Some(&app.admin()),
            Some(json!({ "email": "library@college.edu" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email and App Password are required.");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/admin-tools/update-email-config",
            Some(&app.admin()),
            Some(json!({ "email": "library@college.edu", "password": "app-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.services.email.settings().has_credentials());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin-tools/test-email",
            Some(&app.admin()),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Target email is required");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = build_test_app();
    let (status, body) = app
        .send(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/borrowed"].is_object());
}
