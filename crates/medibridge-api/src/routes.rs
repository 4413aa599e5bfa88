//! API route definitions
//!
//! Each group declares its interceptor pipeline explicitly:
//! - public: none
//! - session: authenticate
//! - staff: authenticate, then receptionist or doctor
//! - clinical: authenticate, then doctor
//!
//! Author: hephaex@gmail.com

use crate::handlers::{auth, health, patients, records, vitals};
use crate::middleware::{
    pipeline, security_headers_middleware, Authenticate, InterceptExt, RequireRole,
};
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use medibridge_core::Role;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Create API v1 routes
pub fn api_routes(state: &AppState) -> Router<Arc<AppState>> {
    let authenticate = Authenticate::new(state.auth.clone());

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/v1/signup", post(auth::signup_handler))
        .route("/v1/signin", post(auth::signin_handler));

    let session_routes = Router::new()
        .route("/v1/logout", post(auth::logout_handler))
        .route("/v1/me", get(auth::me_handler))
        .intercept_with(pipeline([authenticate.clone()]));

    let staff_routes = Router::new()
        .route("/v1/patient", post(patients::register_patient))
        .route("/v1/patient/list", get(patients::list_patients))
        .route(
            "/v1/patient/:patientID",
            get(patients::get_patient_record)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .intercept_with(pipeline([
            authenticate.clone(),
            RequireRole::any_of(&[Role::Receptionist, Role::Doctor]),
        ]));

    let clinical_routes = Router::new()
        .route(
            "/v1/patient/:patientID/vitals",
            post(vitals::capture_vitals)
                .put(vitals::update_vitals)
                .delete(vitals::delete_vitals),
        )
        .route("/v1/patient/:patientID/allergy", post(records::add_allergy))
        .route(
            "/v1/patient/:patientID/allergy/:allergyID",
            put(records::update_allergy).delete(records::delete_allergy),
        )
        .route("/v1/patient/:patientID/condition", post(records::add_condition))
        .route(
            "/v1/patient/:patientID/condition/:conditionID",
            put(records::update_condition).delete(records::delete_condition),
        )
        .route("/v1/patient/:patientID/diagnoses", post(records::add_diagnosis))
        .route(
            "/v1/patient/:patientID/diagnoses/:diagnosisID",
            put(records::update_diagnosis).delete(records::delete_diagnosis),
        )
        .intercept_with(pipeline([
            authenticate,
            RequireRole::any_of(&[Role::Doctor]),
        ]));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(staff_routes)
        .merge(clinical_routes)
}

/// CORS for the configured origins, with credentials so the cookie flows
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    api_routes(&state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
