//! Authentication service layer
//!
//! Business logic for signup, signin, logout, and session resolution.
//! Every storage call runs under the configured deadline; password hashing
//! runs on the blocking pool.

use super::models::{normalize_email, Identity, IssuedSession, LoginRequest, SignupRequest, UserInfo};
use super::password::PasswordHasherService;
use super::token::{generate_session_token, token_digest};
use crate::audit::{audit_log, AuditEvent};
use crate::error::AppError;
use chrono::Utc;
use medibridge_core::{
    bounded, CoreError, CredentialStore, NewUser, Role, Session, SessionConfig, SessionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Client metadata recorded in audit events
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: PasswordHasherService,
    session: SessionConfig,
    timeout: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: PasswordHasherService,
        session: SessionConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            session,
            timeout,
        }
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Register a staff account
    ///
    /// # Returns
    ///
    /// * `Ok(UserInfo)` - Newly created account
    /// * `Err(AppError::Conflict)` - Email already registered
    pub async fn signup(
        &self,
        request: SignupRequest,
        client: &ClientInfo,
    ) -> Result<UserInfo, AppError> {
        let role: Role = request.role.parse()?;
        let password_hash = self.hash(request.password).await?;

        let created = bounded(
            self.timeout,
            "create user",
            self.users.create(NewUser {
                fullname: request.fullname,
                email: request.email.clone(),
                password_hash,
                role,
            }),
        )
        .await;

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                audit_log(&AuditEvent::RegistrationFailure {
                    email: request.email,
                    reason: e.to_string(),
                    ip_address: client.ip_address.clone(),
                });
                return Err(e.into());
            }
        };

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            ip_address: client.ip_address.clone(),
        });
        info!(user_id = %user.id, role = %user.role, "User registered");

        Ok(UserInfo::from(&user))
    }

    /// Verify credentials and open a session
    ///
    /// Unknown email and wrong password fail identically and create nothing.
    pub async fn login(
        &self,
        request: LoginRequest,
        client: &ClientInfo,
    ) -> Result<IssuedSession, AppError> {
        let email = normalize_email(&request.email);

        let user = match bounded(self.timeout, "find user", self.users.find_by_email(&email)).await
        {
            Ok(user) => user,
            Err(CoreError::NotFound(_)) => {
                self.login_failed(email, "unknown email", client);
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.verify(user.password_hash.clone(), request.password).await? {
            self.login_failed(email, "invalid password", client);
            return Err(AppError::InvalidCredentials);
        }

        let token = generate_session_token().map_err(|e| AppError::Internal(e.to_string()))?;
        let expires_at = Utc::now() + self.session.ttl();
        bounded(
            self.timeout,
            "create session",
            self.sessions.create(Session {
                token_digest: token_digest(&token),
                user_id: user.id,
                expires_at,
            }),
        )
        .await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(IssuedSession {
            token,
            expires_at,
            user: UserInfo::from(&user),
        })
    }

    /// End a session
    ///
    /// The server-side record is deleted only when `revoke_on_logout` is set;
    /// otherwise the token stays valid until it expires.
    pub async fn logout(
        &self,
        identity: &Identity,
        token: Option<&str>,
        client: &ClientInfo,
    ) -> Result<(), AppError> {
        let revoke = self.session.revoke_on_logout && token.is_some();
        if let Some(token) = token.filter(|_| revoke) {
            bounded(
                self.timeout,
                "revoke session",
                self.sessions.revoke(&token_digest(token)),
            )
            .await?;
        }

        audit_log(&AuditEvent::Logout {
            user_id: identity.id,
            email: identity.email.clone(),
            session_revoked: revoke,
            ip_address: client.ip_address.clone(),
        });
        Ok(())
    }

    /// Resolve a raw token to its caller; unknown and expired look the same
    pub async fn resolve(&self, token: &str) -> Result<Identity, CoreError> {
        let digest = token_digest(token);
        bounded(
            self.timeout,
            "session lookup",
            self.sessions.find_active_by_token(&digest, Utc::now()),
        )
        .await
        .map(Identity::from)
    }

    fn login_failed(&self, email: String, reason: &str, client: &ClientInfo) {
        warn!(reason, "Login failed");
        audit_log(&AuditEvent::LoginFailure {
            email,
            reason: reason.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
    }

    async fn hash(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn verify(&self, hash: String, candidate: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &candidate))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}
