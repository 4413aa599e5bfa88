//! Authentication API handlers
//!
//! Signup, signin, logout, and the current-user profile. Signin writes the
//! session cookie; logout replaces it with an expired one.
//!
//! Author: hephaex@gmail.com

use crate::audit::{extract_ip_address, extract_user_agent};
use crate::auth::{expired_cookie, read_cookie, session_cookie, ClientInfo, LoginRequest, SignupRequest};
use crate::error::{ApiResponse, AppError};
use crate::extract::{validated, JsonBody};
use crate::middleware::Authenticated;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        ip_address: extract_ip_address(headers),
        user_agent: extract_user_agent(headers),
    }
}

/// Register a staff account
///
/// # Responses
///
/// * `201 Created` - Account created
/// * `400 Bad Request` - Malformed body
/// * `409 Conflict` - Email already registered
/// * `422 Unprocessable Entity` - Field constraints failed
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = validated(request.normalized())?;
    let user = state.auth.signup(request, &client_info(&headers)).await?;

    Ok(ApiResponse::created("user registered successfully", user))
}

/// Sign in and receive the session cookie
///
/// # Responses
///
/// * `200 OK` - Session issued, `Set-Cookie` carries the token
/// * `401 Unauthorized` - Unknown email or wrong password (same message)
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    JsonBody(mut request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.email = request.email.trim().to_string();
    let request = validated(request)?;

    let issued = state.auth.login(request, &client_info(&headers)).await?;
    let session = state.auth.session_config();
    let cookie = session_cookie(
        &session.cookie_name,
        &issued.token,
        issued.expires_at,
        session.secure,
    );

    let (status, body) = ApiResponse::ok("user login successful", issued.user);
    Ok((status, jar.add(cookie), body))
}

/// End the current session
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth.session_config();
    let token = read_cookie(&jar, &session.cookie_name);
    state
        .auth
        .logout(&identity, token.as_deref(), &client_info(&headers))
        .await?;

    let cookie = expired_cookie(&session.cookie_name, session.secure);
    let (status, body) = ApiResponse::message("user logged out successfully");
    Ok((status, jar.add(cookie), body))
}

/// Current caller
pub async fn me_handler(Authenticated(identity): Authenticated) -> impl IntoResponse {
    ApiResponse::ok("current user", identity)
}
