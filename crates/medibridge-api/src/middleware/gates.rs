//! Authentication and role gates
//!
//! Author: hephaex@gmail.com

use super::pipeline::{Interceptor, RequestContext};
use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::auth::{read_cookie, AuthService};
use crate::error::AppError;
use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;
use medibridge_core::{CoreError, Role};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolve the session cookie to an [`Identity`](crate::auth::Identity)
///
/// Missing, unknown, and expired sessions all fail with `Unauthenticated`
/// and the same message. A context that already carries an identity passes
/// untouched.
pub struct Authenticate {
    auth: AuthService,
}

impl Authenticate {
    pub fn new(auth: AuthService) -> Arc<dyn Interceptor> {
        Arc::new(Self { auth })
    }

    fn reject(&self, ctx: &RequestContext, reason: &str) -> AppError {
        debug!(resource = %ctx.resource(), reason, "Unauthenticated request");
        audit_log(&AuditEvent::InvalidSession {
            reason: reason.to_string(),
            resource: ctx.resource(),
            ip_address: extract_ip_address(&ctx.headers),
        });
        AppError::Unauthenticated
    }
}

#[async_trait]
impl Interceptor for Authenticate {
    async fn intercept(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        if ctx.identity.is_some() {
            return Ok(());
        }

        let cookie_name = &self.auth.session_config().cookie_name;
        let jar = CookieJar::from_headers(&ctx.headers);
        let Some(token) = read_cookie(&jar, cookie_name) else {
            return Err(self.reject(ctx, "missing session cookie"));
        };

        match self.auth.resolve(&token).await {
            Ok(identity) => {
                ctx.identity = Some(identity);
                Ok(())
            }
            Err(CoreError::NotFound(_)) => Err(self.reject(ctx, "unknown or expired session")),
            Err(e) => Err(e.into()),
        }
    }
}

/// Allow only callers whose role is in the list
///
/// Never resolves identity itself; place it after [`Authenticate`].
pub struct RequireRole {
    allowed: Vec<Role>,
}

impl RequireRole {
    pub fn any_of(roles: &[Role]) -> Arc<dyn Interceptor> {
        Arc::new(Self {
            allowed: roles.to_vec(),
        })
    }
}

#[async_trait]
impl Interceptor for RequireRole {
    async fn intercept(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        let identity = ctx.identity.as_ref().ok_or(AppError::Unauthenticated)?;
        if self.allowed.contains(&identity.role) {
            return Ok(());
        }

        warn!(user_id = %identity.id, role = %identity.role, resource = %ctx.resource(), "Role not permitted");
        audit_log(&AuditEvent::AccessDenied {
            user_id: identity.id,
            role: identity.role,
            allowed_roles: self.allowed.clone(),
            resource: ctx.resource(),
            ip_address: extract_ip_address(&ctx.headers),
        });
        Err(AppError::Forbidden)
    }
}
