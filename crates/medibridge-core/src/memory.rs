//! In-memory storage backend
//!
//! Backs every storage port with maps behind one `tokio::sync::RwLock`.
//! Used by tests and by `medibridge-api --in-memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Allergy, Condition, Diagnosis, NewUser, PageMeta, Patient, PatientPage, PatientQuery,
    PatientScoped, PatientSummary, Session, UserRecord, Vitals,
};
use crate::reconcile::MutationSet;
use crate::store::{CredentialStore, PatientStore, SessionStore, SubRecordStore, VitalsStore};
use crate::{CoreError, Result};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    sessions: HashMap<String, Session>,
    patients: HashMap<Uuid, Patient>,
    vitals: HashMap<Uuid, Vitals>,
    allergies: HashMap<Uuid, Allergy>,
    conditions: HashMap<Uuid, Condition>,
    diagnoses: HashMap<Uuid, Diagnosis>,
}

/// In-memory store implementing every port
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions; expired ones linger until the next create
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

fn patient_missing(id: Uuid) -> CoreError {
    CoreError::NotFound(format!("patient {id}"))
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(CoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            fullname: user.fullname,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            activated: true,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<UserRecord> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| CoreError::NotFound("user".to_string()))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: Session) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(CoreError::NotFound(format!("user {}", session.user_id)));
        }
        let now = Utc::now();
        tables.sessions.retain(|_, s| s.is_active_at(now));
        tables.sessions.insert(session.token_digest.clone(), session);
        Ok(())
    }

    async fn find_active_by_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecord> {
        let tables = self.tables.read().await;
        tables
            .sessions
            .get(token_digest)
            .filter(|s| s.is_active_at(now))
            .and_then(|s| tables.users.get(&s.user_id))
            .cloned()
            .ok_or_else(|| CoreError::NotFound("session".to_string()))
    }

    async fn revoke(&self, token_digest: &str) -> Result<()> {
        self.tables.write().await.sessions.remove(token_digest);
        Ok(())
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn create(&self, patient: Patient) -> Result<Patient> {
        let mut tables = self.tables.write().await;
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get(&self, id: Uuid) -> Result<Patient> {
        self.tables
            .read()
            .await
            .patients
            .get(&id)
            .cloned()
            .ok_or_else(|| patient_missing(id))
    }

    async fn list(&self, query: &PatientQuery) -> Result<PatientPage> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Patient> = tables
            .patients
            .values()
            .filter(|p| query.matches(&p.fullname))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let patients: Vec<PatientSummary> = matching
            .into_iter()
            .skip(query.offset().max(0) as usize)
            .take(query.page_size.max(0) as usize)
            .map(PatientSummary::from)
            .collect();
        let meta = PageMeta::new(query, total, patients.len());
        Ok(PatientPage { patients, meta })
    }

    async fn update(&self, id: Uuid, mutations: &MutationSet<Patient>) -> Result<Patient> {
        let mut tables = self.tables.write().await;
        let patient = tables.patients.get_mut(&id).ok_or_else(|| patient_missing(id))?;
        mutations.apply_to(patient);
        if mutations.has_field_changes() {
            patient.updated_at = Some(Utc::now());
        }
        Ok(patient.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.patients.remove(&id).ok_or_else(|| patient_missing(id))?;
        tables.vitals.remove(&id);
        tables.allergies.retain(|_, a| a.patient_id != id);
        tables.conditions.retain(|_, c| c.patient_id != id);
        tables.diagnoses.retain(|_, d| d.patient_id != id);
        Ok(())
    }
}

#[async_trait]
impl VitalsStore for MemoryStore {
    async fn capture(&self, vitals: Vitals) -> Result<Vitals> {
        let mut tables = self.tables.write().await;
        if !tables.patients.contains_key(&vitals.patient_id) {
            return Err(patient_missing(vitals.patient_id));
        }
        if tables.vitals.contains_key(&vitals.patient_id) {
            return Err(CoreError::Conflict(format!(
                "vitals already captured for patient {}",
                vitals.patient_id
            )));
        }
        tables.vitals.insert(vitals.patient_id, vitals.clone());
        Ok(vitals)
    }

    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Option<Vitals>> {
        Ok(self.tables.read().await.vitals.get(&patient_id).cloned())
    }

    async fn update(&self, patient_id: Uuid, mutations: &MutationSet<Vitals>) -> Result<Vitals> {
        let mut tables = self.tables.write().await;
        let vitals = tables
            .vitals
            .get_mut(&patient_id)
            .ok_or_else(|| CoreError::NotFound(format!("vitals for patient {patient_id}")))?;
        mutations.apply_to(vitals);
        if mutations.has_field_changes() {
            vitals.touch(Utc::now());
        }
        Ok(vitals.clone())
    }

    async fn delete(&self, patient_id: Uuid) -> Result<Uuid> {
        self.tables
            .write()
            .await
            .vitals
            .remove(&patient_id)
            .map(|vitals| vitals.id)
            .ok_or_else(|| CoreError::NotFound(format!("vitals for patient {patient_id}")))
    }
}

macro_rules! memory_sub_record_store {
    ($entity:ty, $table:ident, $label:literal) => {
        #[async_trait]
        impl SubRecordStore<$entity> for MemoryStore {
            async fn add(&self, record: $entity) -> Result<$entity> {
                let mut tables = self.tables.write().await;
                if !tables.patients.contains_key(&record.patient_id()) {
                    return Err(patient_missing(record.patient_id()));
                }
                tables.$table.insert(record.id(), record.clone());
                Ok(record)
            }

            async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<$entity>> {
                let tables = self.tables.read().await;
                let mut records: Vec<$entity> = tables
                    .$table
                    .values()
                    .filter(|r| r.patient_id() == patient_id)
                    .cloned()
                    .collect();
                records.sort_by_key(|r| r.recorded_at());
                Ok(records)
            }

            async fn update(
                &self,
                patient_id: Uuid,
                id: Uuid,
                mutations: &MutationSet<$entity>,
            ) -> Result<$entity> {
                let mut tables = self.tables.write().await;
                let record = tables
                    .$table
                    .get_mut(&id)
                    .filter(|r| r.patient_id() == patient_id)
                    .ok_or_else(|| CoreError::NotFound(format!("{} {id}", $label)))?;
                mutations.apply_to(record);
                if mutations.has_field_changes() {
                    record.touch(Utc::now());
                }
                Ok(record.clone())
            }

            async fn delete(&self, patient_id: Uuid, id: Uuid) -> Result<()> {
                let mut tables = self.tables.write().await;
                let owned = tables
                    .$table
                    .get(&id)
                    .is_some_and(|r| r.patient_id() == patient_id);
                if !owned {
                    return Err(CoreError::NotFound(format!("{} {id}", $label)));
                }
                tables.$table.remove(&id);
                Ok(())
            }
        }
    };
}

memory_sub_record_store!(Allergy, allergies, "allergy");
memory_sub_record_store!(Condition, conditions, "condition");
memory_sub_record_store!(Diagnosis, diagnoses, "diagnosis");
