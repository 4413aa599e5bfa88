//! Request and response models for staff authentication

use chrono::{DateTime, Utc};
use medibridge_core::{Role, UserRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Signup request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    /// Display name (3-30 characters)
    #[validate(length(min = 3, max = 30))]
    pub fullname: String,

    #[validate(email)]
    pub email: String,

    /// Plaintext password (8-64 characters); hashed before storage
    #[validate(length(min = 8, max = 64))]
    pub password: String,

    /// `doctor` or `receptionist`
    #[validate(custom(function = "validate_role"))]
    pub role: String,
}

impl SignupRequest {
    /// Trimmed copy with the email lower-cased
    pub fn normalized(self) -> Self {
        Self {
            fullname: self.fullname.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
            role: self.role.trim().to_lowercase(),
        }
    }
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    role.parse::<Role>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("role"))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Signin request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Public view of a staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub role: Role,
    pub activated: bool,
}

impl From<&UserRecord> for UserInfo {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            role: user.role,
            activated: user.activated,
        }
    }
}

/// Request-scoped caller, resolved once from the session cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub fullname: String,
    pub role: Role,
    pub activated: bool,
}

impl From<UserRecord> for Identity {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            fullname: user.fullname,
            role: user.role,
            activated: user.activated,
        }
    }
}

/// Successful signin, before the cookie is written
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(fullname: &str, email: &str, password: &str, role: &str) -> SignupRequest {
        SignupRequest {
            fullname: fullname.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_valid_signup() {
        assert!(signup("Meredith Grey", "grey@clinic.test", "password123", "doctor")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_signup_reports_every_failing_field() {
        let errors = signup("Al", "not-an-email", "short", "nurse")
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();
        for field in ["fullname", "email", "password", "role"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn test_normalized_email_and_role() {
        let request = signup(" Meredith Grey ", " Grey@Clinic.Test ", "password123", " Doctor ")
            .normalized();
        assert_eq!(request.fullname, "Meredith Grey");
        assert_eq!(request.email, "grey@clinic.test");
        assert_eq!(request.role, "doctor");
    }
}
