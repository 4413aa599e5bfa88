//! API Integration Tests
//!
//! Drive the full router with `oneshot` against the in-memory store.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use medibridge_api::{auth::token_digest, create_router, state::AppState};
use medibridge_core::{
    AppConfig, CredentialStore, HashingConfig, InvalidFieldPolicy, MemoryStore, Session,
    SessionStore, Stores,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    memory: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_policy(InvalidFieldPolicy::Drop)
    }

    fn with_policy(policy: InvalidFieldPolicy) -> Self {
        let mut config = AppConfig::default();
        config.reconcile.invalid_fields = policy;
        config.hashing = HashingConfig {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        };
        let memory = Arc::new(MemoryStore::new());
        let state = AppState::new(config, Stores::from_backend(memory.clone())).unwrap();
        Self {
            router: create_router(Arc::new(state)),
            memory,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json_body) => builder
                .body(Body::from(serde_json::to_string(&json_body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, set_cookie, json)
    }

    async fn signup(&self, email: &str, role: &str) {
        let (status, _, _) = self
            .send(
                "POST",
                "/v1/signup",
                None,
                Some(json!({
                    "fullname": "Staff Member",
                    "email": email,
                    "password": "password123",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    /// Sign up and sign in; returns the `name=value` cookie pair
    async fn login_as(&self, email: &str, role: &str) -> String {
        self.signup(email, role).await;
        let (status, set_cookie, _) = self
            .send(
                "POST",
                "/v1/signin",
                None,
                Some(json!({ "email": email, "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let set_cookie = set_cookie.expect("signin sets a cookie");
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn register_patient(&self, cookie: &str) -> Value {
        let (status, _, body) = self
            .send(
                "POST",
                "/v1/patient",
                Some(cookie),
                Some(json!({
                    "fullname": "Jane Roe",
                    "gender": "female",
                    "dob": "1990-01-01",
                    "contactNo": "0712345678",
                    "address": "12 Harbour Road",
                    "emergencyName": "John Roe",
                    "emergencyRelation": "Brother",
                    "emergencyPhone": "0798765432",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, _, body) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_login_issues_working_session() {
    let app = TestApp::new();
    let cookie = app.login_as("grey@clinic.test", "doctor").await;
    assert!(cookie.starts_with("medibridge-token="));

    let (status, _, body) = app.send("GET", "/v1/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["data"]["email"], "grey@clinic.test");
    assert_eq!(body["data"]["role"], "doctor");
}

#[tokio::test]
async fn test_signin_cookie_attributes() {
    let app = TestApp::new();
    app.signup("grey@clinic.test", "doctor").await;
    let (_, set_cookie, _) = app
        .send(
            "POST",
            "/v1/signin",
            None,
            Some(json!({ "email": "grey@clinic.test", "password": "password123" })),
        )
        .await;

    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Expires="));
}

#[tokio::test]
async fn test_wrong_password_creates_no_session() {
    let app = TestApp::new();
    app.signup("grey@clinic.test", "doctor").await;

    let (status, set_cookie, body) = app
        .send(
            "POST",
            "/v1/signin",
            None,
            Some(json!({ "email": "grey@clinic.test", "password": "not-the-password" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert_eq!(body["error"], "invalid email or password");
    assert!(set_cookie.is_none());
    assert_eq!(app.memory.session_count().await, 0);
}

#[tokio::test]
async fn test_unknown_email_same_response_as_wrong_password() {
    let app = TestApp::new();
    let (status, _, body) = app
        .send(
            "POST",
            "/v1/signin",
            None,
            Some(json!({ "email": "nobody@clinic.test", "password": "password123" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid email or password");
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = TestApp::new();
    app.signup("grey@clinic.test", "doctor").await;

    let (status, _, _) = app
        .send(
            "POST",
            "/v1/signup",
            None,
            Some(json!({
                "fullname": "Another Grey",
                "email": " GREY@clinic.test ",
                "password": "password123",
                "role": "receptionist",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation_lists_fields() {
    let app = TestApp::new();
    let (status, _, body) = app
        .send(
            "POST",
            "/v1/signup",
            None,
            Some(json!({
                "fullname": "Al",
                "email": "not-an-email",
                "password": "password123",
                "role": "nurse",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"], json!(["email", "fullname", "role"]));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/signin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_cookie_is_unauthenticated() {
    let app = TestApp::new();
    let (status, _, body) = app.send("GET", "/v1/patient/list", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let app = TestApp::new();
    let (status, _, _) = app
        .send("GET", "/v1/me", Some("medibridge-token=forged"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_is_unauthenticated() {
    let app = TestApp::new();
    app.signup("grey@clinic.test", "doctor").await;
    let user = CredentialStore::find_by_email(app.memory.as_ref(), "grey@clinic.test")
        .await
        .unwrap();

    let token = "expired-token";
    SessionStore::create(
        app.memory.as_ref(),
        Session {
            token_digest: token_digest(token),
            user_id: user.id,
            expires_at: Utc::now() - Duration::seconds(1),
        },
    )
    .await
    .unwrap();

    let cookie = format!("medibridge-token={token}");
    let (status, _, body) = app.send("GET", "/v1/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn test_logout_expires_cookie_and_revokes_session() {
    let app = TestApp::new();
    let cookie = app.login_as("grey@clinic.test", "doctor").await;

    let (status, set_cookie, _) = app.send("POST", "/v1/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.starts_with("medibridge-token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(set_cookie.contains("Path=/"));

    let (status, _, _) = app.send("GET", "/v1/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_receptionist_cannot_reach_doctor_routes() {
    let app = TestApp::new();
    let receptionist = app.login_as("desk@clinic.test", "receptionist").await;
    let patient = app.register_patient(&receptionist).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, _, body) = app
        .send(
            "POST",
            &format!("/v1/patient/{patient_id}/vitals"),
            Some(&receptionist),
            Some(json!({ "pulse": 72 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);

    // The handler never ran: no vitals were captured
    let (status, _, record) = app
        .send("GET", &format!("/v1/patient/{patient_id}"), Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(record["data"].get("vitals").is_none());
}

#[tokio::test]
async fn test_doctor_reaches_clinical_routes() {
    let app = TestApp::new();
    let doctor = app.login_as("grey@clinic.test", "doctor").await;
    let patient = app.register_patient(&doctor).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, _, vitals) = app
        .send(
            "POST",
            &format!("/v1/patient/{patient_id}/vitals"),
            Some(&doctor),
            Some(json!({ "pulse": 72, "temperatureC": 36.8 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{vitals}");

    let (status, _, _) = app
        .send(
            "POST",
            &format!("/v1/patient/{patient_id}/vitals"),
            Some(&doctor),
            Some(json!({ "pulse": 80 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _, record) = app
        .send("GET", &format!("/v1/patient/{patient_id}"), Some(&doctor), None)
        .await;
    let vitals = &record["data"]["vitals"];
    assert_eq!(vitals["pulse"], 72);
    assert!(vitals.get("heightCm").is_none());
}

// =============================================================================
// Patients
// =============================================================================

#[tokio::test]
async fn test_register_patient_defaults() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;
    let patient = app.register_patient(&cookie).await;

    assert_eq!(patient["gender"], "FEMALE");
    assert_eq!(patient["version"], 1);
    assert!(patient["age"].as_i64().unwrap() >= 30);
    assert!(patient.get("updatedAt").is_none());
}

#[tokio::test]
async fn test_register_patient_validation() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;

    let (status, _, body) = app
        .send(
            "POST",
            "/v1/patient",
            Some(&cookie),
            Some(json!({
                "fullname": "Jane Roe",
                "gender": "unknown",
                "dob": "1990-01-01",
                "contactNo": "12345",
                "address": "12 Harbour Road",
                "emergencyName": "John Roe",
                "emergencyRelation": "Brother",
                "emergencyPhone": "0798765432",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"], json!(["contact_number", "gender"]));
}

#[tokio::test]
async fn test_fullname_update_keeps_gender_and_bumps_version() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;
    let patient = app.register_patient(&cookie).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, _, body) = app
        .send(
            "PUT",
            &format!("/v1/patient/{patient_id}"),
            Some(&cookie),
            Some(json!({ "fullname": "Jane Doe" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let updated = &body["data"];
    assert_eq!(updated["fullname"], "Jane Doe");
    assert_eq!(updated["gender"], "FEMALE");
    assert_eq!(updated["contactNo"], patient["contactNo"]);
    assert_eq!(updated["version"], 2);
    assert!(updated.get("updatedAt").is_some());
}

#[tokio::test]
async fn test_empty_update_only_bumps_version() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;
    let patient = app.register_patient(&cookie).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, _, body) = app
        .send(
            "PUT",
            &format!("/v1/patient/{patient_id}"),
            Some(&cookie),
            Some(json!({ "gender": null })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let mut updated = body["data"].clone();
    assert_eq!(updated["version"], 2);

    let mut original = patient.clone();
    original.as_object_mut().unwrap().remove("version");
    updated.as_object_mut().unwrap().remove("version");
    assert_eq!(updated, original);
}

#[tokio::test]
async fn test_invalid_update_field_is_dropped() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;
    let patient = app.register_patient(&cookie).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, _, body) = app
        .send(
            "PUT",
            &format!("/v1/patient/{patient_id}"),
            Some(&cookie),
            Some(json!({ "gender": "unknown", "address": "7 Quay Street" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["gender"], "FEMALE");
    assert_eq!(body["data"]["address"], "7 Quay Street");
}

#[tokio::test]
async fn test_invalid_update_field_rejected_under_reject_policy() {
    let app = TestApp::with_policy(InvalidFieldPolicy::Reject);
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;
    let patient = app.register_patient(&cookie).await;
    let patient_id = patient["id"].as_str().unwrap();
    let uri = format!("/v1/patient/{patient_id}");

    let (status, _, body) = app
        .send(
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({
                "gender": "unknown",
                "contactNo": "123",
                "address": "7 Quay Street",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"], json!(["gender", "contactNo"]));

    // Nothing was written, not even the valid address or a version bump
    let (_, _, record) = app.send("GET", &uri, Some(&cookie), None).await;
    assert_eq!(record["data"]["patient"], patient);

    let (status, _, body) = app
        .send("PUT", &uri, Some(&cookie), Some(json!({ "address": "7 Quay Street" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], 2);
}

#[tokio::test]
async fn test_record_omits_absent_vitals() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;
    let patient = app.register_patient(&cookie).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, _, body) = app
        .send("GET", &format!("/v1/patient/{patient_id}"), Some(&cookie), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    let record = &body["data"];
    assert!(record.get("vitals").is_none());
    assert_eq!(record["allergies"], json!([]));
    assert_eq!(record["conditions"], json!([]));
    assert_eq!(record["diagnoses"], json!([]));
    assert_eq!(record["patient"]["id"], patient["id"]);
}

#[tokio::test]
async fn test_record_includes_sub_records() {
    let app = TestApp::new();
    let doctor = app.login_as("grey@clinic.test", "doctor").await;
    let patient = app.register_patient(&doctor).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, _, allergy) = app
        .send(
            "POST",
            &format!("/v1/patient/{patient_id}/allergy"),
            Some(&doctor),
            Some(json!({ "name": "Penicillin", "severity": "Severe", "reaction": "Hives" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{allergy}");
    assert_eq!(allergy["data"]["severity"], "severe");

    let (status, _, _) = app
        .send(
            "POST",
            &format!("/v1/patient/{patient_id}/condition"),
            Some(&doctor),
            Some(json!({ "condition": "Asthma" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = app
        .send(
            "POST",
            &format!("/v1/patient/{patient_id}/diagnoses"),
            Some(&doctor),
            Some(json!({ "name": "Bronchitis" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, _, body) = app
        .send("GET", &format!("/v1/patient/{patient_id}"), Some(&doctor), None)
        .await;
    let record = &body["data"];
    assert_eq!(record["allergies"][0]["name"], "Penicillin");
    assert_eq!(record["conditions"][0]["name"], "Asthma");
    assert_eq!(record["diagnoses"][0]["name"], "Bronchitis");
}

#[tokio::test]
async fn test_sub_record_update_and_delete() {
    let app = TestApp::new();
    let doctor = app.login_as("grey@clinic.test", "doctor").await;
    let patient = app.register_patient(&doctor).await;
    let patient_id = patient["id"].as_str().unwrap();

    let (_, _, created) = app
        .send(
            "POST",
            &format!("/v1/patient/{patient_id}/allergy"),
            Some(&doctor),
            Some(json!({ "name": "Peanuts", "severity": "mild", "reaction": "Rash" })),
        )
        .await;
    let allergy_id = created["data"]["id"].as_str().unwrap();
    let path = format!("/v1/patient/{patient_id}/allergy/{allergy_id}");

    let (status, _, updated) = app
        .send("PUT", &path, Some(&doctor), Some(json!({ "severity": "moderate" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["severity"], "moderate");
    assert_eq!(updated["data"]["reaction"], "Rash");

    let (status, _, _) = app.send("DELETE", &path, Some(&doctor), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app.send("DELETE", &path, Some(&doctor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_patient_id_is_unprocessable() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;

    let (status, _, body) = app
        .send("GET", "/v1/patient/not-a-uuid", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"], json!(["patientID"]));
}

#[tokio::test]
async fn test_unknown_patient_not_found() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;

    let uri = format!("/v1/patient/{}", uuid::Uuid::new_v4());
    let (status, _, body) = app.send("GET", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_list_patients_paginates() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;
    for _ in 0..3 {
        app.register_patient(&cookie).await;
    }

    let (status, _, body) = app
        .send(
            "GET",
            "/v1/patient/list?page=2&pageSize=2&searchTerm=jane",
            Some(&cookie),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["patients"].as_array().unwrap().len(), 1);
    assert_eq!(page["meta"]["totalItems"], 3);
    assert_eq!(page["meta"]["totalPages"], 2);
    assert_eq!(page["meta"]["hasPrevious"], true);
    assert_eq!(page["meta"]["hasNext"], false);

    let (status, _, _) = app
        .send("GET", "/v1/patient/list?pageSize=0", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_patients_rejects_overflowing_page() {
    let app = TestApp::new();
    let cookie = app.login_as("desk@clinic.test", "receptionist").await;

    let uri = format!("/v1/patient/list?page={}", i64::MAX);
    let (status, _, body) = app.send("GET", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"], json!(["page"]));

    // The router keeps serving after the rejected request
    let (status, _, _) = app.send("GET", "/v1/patient/list", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_patient_cascades() {
    let app = TestApp::new();
    let doctor = app.login_as("grey@clinic.test", "doctor").await;
    let patient = app.register_patient(&doctor).await;
    let patient_id = patient["id"].as_str().unwrap();

    app.send(
        "POST",
        &format!("/v1/patient/{patient_id}/vitals"),
        Some(&doctor),
        Some(json!({ "pulse": 70 })),
    )
    .await;

    let uri = format!("/v1/patient/{patient_id}");
    let (status, _, _) = app.send("DELETE", &uri, Some(&doctor), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app.send("GET", &uri, Some(&doctor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
