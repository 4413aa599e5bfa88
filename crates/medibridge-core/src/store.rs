//! Storage ports
//!
//! The HTTP layer only talks to these traits. [`crate::MemoryStore`] and
//! [`crate::PgStore`] implement all of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    Allergy, Condition, Diagnosis, NewUser, Patient, PatientPage, PatientQuery, PatientScoped,
    Session, UserRecord, Vitals,
};
use crate::reconcile::{MutationSet, Reconcilable};
use crate::{CoreError, MemoryStore, PgStore, Result};

/// Staff accounts
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new account; `Conflict` when the email is taken
    async fn create(&self, user: NewUser) -> Result<UserRecord>;

    /// Look up by normalized email; `NotFound` when absent
    async fn find_by_email(&self, email: &str) -> Result<UserRecord>;
}

/// Server-side sessions, keyed by token digest
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> Result<()>;

    /// Resolve a session still active at `now` to its user
    ///
    /// Unknown and expired digests both fail with `NotFound`.
    async fn find_active_by_token(&self, token_digest: &str, now: DateTime<Utc>)
        -> Result<UserRecord>;

    /// Remove a session; unknown digests are ignored
    async fn revoke(&self, token_digest: &str) -> Result<()>;
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn create(&self, patient: Patient) -> Result<Patient>;

    async fn get(&self, id: Uuid) -> Result<Patient>;

    async fn list(&self, query: &PatientQuery) -> Result<PatientPage>;

    /// Apply a reconciled mutation set and return the stored result
    async fn update(&self, id: Uuid, mutations: &MutationSet<Patient>) -> Result<Patient>;

    /// Delete a patient together with every sub-record
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// One-to-one vitals
#[async_trait]
pub trait VitalsStore: Send + Sync {
    /// `NotFound` for an unknown patient, `Conflict` when vitals already exist
    async fn capture(&self, vitals: Vitals) -> Result<Vitals>;

    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Option<Vitals>>;

    async fn update(&self, patient_id: Uuid, mutations: &MutationSet<Vitals>) -> Result<Vitals>;

    /// Remove the patient's vitals, returning the deleted row's id
    async fn delete(&self, patient_id: Uuid) -> Result<Uuid>;
}

/// One-to-many sub-records (allergies, conditions, diagnoses)
///
/// Every call is scoped by patient; an id owned by another patient is
/// `NotFound`.
#[async_trait]
pub trait SubRecordStore<E>: Send + Sync
where
    E: PatientScoped + Reconcilable,
{
    /// `NotFound` for an unknown patient
    async fn add(&self, record: E) -> Result<E>;

    /// Oldest first
    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<E>>;

    async fn update(&self, patient_id: Uuid, id: Uuid, mutations: &MutationSet<E>) -> Result<E>;

    async fn delete(&self, patient_id: Uuid, id: Uuid) -> Result<()>;
}

/// Every storage port the API needs, behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub patients: Arc<dyn PatientStore>,
    pub vitals: Arc<dyn VitalsStore>,
    pub allergies: Arc<dyn SubRecordStore<Allergy>>,
    pub conditions: Arc<dyn SubRecordStore<Condition>>,
    pub diagnoses: Arc<dyn SubRecordStore<Diagnosis>>,
}

impl Stores {
    /// All ports served by one shared backend
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CredentialStore
            + SessionStore
            + PatientStore
            + VitalsStore
            + SubRecordStore<Allergy>
            + SubRecordStore<Condition>
            + SubRecordStore<Diagnosis>
            + 'static,
    {
        Self {
            users: backend.clone(),
            sessions: backend.clone(),
            patients: backend.clone(),
            vitals: backend.clone(),
            allergies: backend.clone(),
            conditions: backend.clone(),
            diagnoses: backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }

    pub fn postgres(store: PgStore) -> Self {
        Self::from_backend(Arc::new(store))
    }
}

/// Run a storage call under a deadline
///
/// Elapsed deadlines surface as `CoreError::Timeout`; no retry is attempted.
pub async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Storage call timed out");
            Err(CoreError::Timeout {
                operation: operation.to_string(),
            })
        }
    }
}
