//! API integration tests against a running server

use athenaeum_server::models::user::{Role, UserClaims};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:3000/api";

/// Sign a token with the server's secret (JWT_SECRET or the shipped default)
fn token(email: &str, role: Role) -> String {
    let secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    let now = Utc::now().timestamp();
    UserClaims {
        sub: email.to_string(),
        email: email.to_string(),
        name: "Integration Test".to_string(),
        role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&secret)
    .expect("Failed to sign token")
}

fn admin_token() -> String {
    token("librarian@college.edu", Role::Admin)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_missing_token_is_unauthorized() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowed", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_borrowed() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowed?page=1&limit=10", BASE_URL))
        .bearer_auth(admin_token())
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["records"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_copy() {
    let client = Client::new();
    let admin = admin_token();
    let student = token("integration.student@college.edu", Role::Student);

    // Create a copy
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Integration Test Book",
            "author": "Test Author",
            "genre": "Testing"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let copy: Value = response.json().await.expect("Failed to parse response");
    let copy_id = copy["_id"].as_str().expect("No copy ID").to_string();

    // Borrow it
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, copy_id))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // A second borrow is refused
    let response = client
        .post(format!("{}/books/{}/borrow", BASE_URL, copy_id))
        .bearer_auth(&student)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Find the record and return it
    let response = client
        .get(format!("{}/borrowed?search=Integration%20Test%20Book", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let record_id = body["records"][0]["_id"]
        .as_str()
        .expect("No record ID")
        .to_string();

    let response = client
        .put(format!("{}/borrowed/{}", BASE_URL, record_id))
        .bearer_auth(&admin)
        .json(&json!({ "returnStatus": "Returned" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let record: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(record["returnStatus"], "Returned");
    assert_eq!(record["fineAmount"], 0);

    // Clean up
    let response = client
        .delete(format!("{}/borrowed/{}", BASE_URL, record_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, copy_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_cron_notifications() {
    let client = Client::new();

    let response = client
        .get(format!("{}/cron/notifications", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"].as_array().map(|s| s.len()), Some(2));
}

#[tokio::test]
#[ignore]
async fn test_exam_periods_round_trip() {
    let client = Client::new();

    let response = client
        .get(format!("{}/settings/exam-periods", BASE_URL))
        .bearer_auth(admin_token())
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_circulation_stats() {
    let client = Client::new();

    let response = client
        .get(format!("{}/analytics/circulation", BASE_URL))
        .bearer_auth(admin_token())
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["totalRecords"].is_number());
    assert!(body["outstandingFines"].is_number());
}
