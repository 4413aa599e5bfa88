//! MediBridge Core - Domain models, reconciliation, and storage ports
//!
//! This crate defines the core abstractions used throughout MediBridge:
//! - Clinical record models (patients, vitals, allergies, conditions, diagnoses)
//! - Staff roles and credential records
//! - Sparse update requests built from [`UpdateField`]
//! - The generic partial-update reconciler and its field tables
//! - The patient record assembler
//! - Storage ports with in-memory and PostgreSQL implementations
//! - Configuration management

pub mod assemble;
pub mod config;
pub mod fields;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod reconcile;
pub mod store;
pub mod update;

pub use assemble::{assemble, PatientRecord};
pub use config::{AppConfig, ConfigError, DatabaseConfig, HashingConfig, SessionConfig};
pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;
pub use reconcile::{FieldValue, InvalidFieldPolicy, Mutation, MutationSet, Reconcilable, Reconciler};
pub use store::{
    bounded, CredentialStore, PatientStore, SessionStore, Stores, SubRecordStore, VitalsStore,
};
pub use update::UpdateField;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for MediBridge operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed for {entity}: {}", .fields.join(", "))]
    ValidationFailed { entity: String, fields: Vec<String> },

    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================================================
// Roles
// ============================================================================

/// Staff role, deciding which mutation endpoints a caller may reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Receptionist,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Role; 2] = [Role::Doctor, Role::Receptionist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            _ => Err(CoreError::ValidationFailed {
                entity: "user".to_string(),
                fields: vec!["role".to_string()],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" Doctor ".parse::<Role>().unwrap(), Role::Doctor);
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Receptionist).unwrap();
        assert_eq!(json, "\"receptionist\"");
    }

    #[test]
    fn test_validation_error_display() {
        let err = CoreError::ValidationFailed {
            entity: "patient".to_string(),
            fields: vec!["age".to_string(), "gender".to_string()],
        };
        assert_eq!(err.to_string(), "Validation failed for patient: age, gender");
    }
}
