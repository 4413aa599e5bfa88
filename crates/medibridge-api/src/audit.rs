//! Security and clinical-record audit logging
//!
//! Structured audit events for authentication, authorization, and record
//! mutations. Events are emitted at INFO with the `audit` target so they can
//! be routed separately from application logs. Passwords and raw session
//! tokens never appear in an event.
//!
//! Author: hephaex@gmail.com

use axum::http::{header, HeaderMap};
use chrono::Utc;
use medibridge_core::Role;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful signin; a session was issued
    LoginSuccess {
        user_id: Uuid,
        email: String,
        role: Role,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed signin; no session was issued
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    Logout {
        user_id: Uuid,
        email: String,
        session_revoked: bool,
        ip_address: Option<String>,
    },

    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        role: Role,
        ip_address: Option<String>,
    },

    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// Authenticated caller stopped by a role gate
    AccessDenied {
        user_id: Uuid,
        role: Role,
        allowed_roles: Vec<Role>,
        resource: String,
        ip_address: Option<String>,
    },

    /// Missing, unknown, or expired session cookie
    InvalidSession {
        reason: String,
        resource: String,
        ip_address: Option<String>,
    },

    /// A clinical record was created, updated, or deleted
    RecordMutated {
        actor_id: Uuid,
        actor_role: Role,
        entity: String,
        entity_id: Uuid,
        action: RecordAction,
        fields: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidSession { .. } => "Invalid session",
            AuditEvent::RecordMutated { .. } => "Record mutated",
        }
    }
}

/// Log an audit event with structured fields
///
/// The event is serialized to JSON for log aggregators, e.g.
///
/// ```json
/// {
///   "event_type": "access_denied",
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "role": "receptionist",
///   "allowed_roles": ["doctor"],
///   "resource": "POST /v1/patient/.../vitals",
///   "ip_address": "192.168.1.1"
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::AccessDenied {
            user_id,
            role,
            resource,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                role = %role,
                resource = %resource,
                "{}",
                event.summary()
            );
        }
        AuditEvent::RecordMutated {
            actor_id,
            entity,
            entity_id,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                actor_id = %actor_id,
                entity = %entity,
                entity_id = %entity_id,
                "{}",
                event.summary()
            );
        }
        _ => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                "{}",
                event.summary()
            );
        }
    }
}

/// Extract client IP from proxy headers
///
/// Checks X-Forwarded-For, then X-Real-IP. Connection info is not consulted.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
