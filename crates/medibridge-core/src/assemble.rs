//! Patient record assembly
//!
//! Composes a patient with its optional vitals and its allergy, condition,
//! and diagnosis lists into the read-only aggregate returned by
//! `GET /v1/patient/:patientID`. Missing vitals are omitted from the JSON
//! entirely; missing lists serialize as `[]`.

use serde::{Deserialize, Serialize};

use crate::models::{Allergy, Condition, Diagnosis, Patient, PatientScoped, Vitals};

/// Aggregate record for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient: Patient,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vitals>,
    pub allergies: Vec<Allergy>,
    pub conditions: Vec<Condition>,
    pub diagnoses: Vec<Diagnosis>,
}

/// Join a patient with its sub-records
///
/// Sub-records belonging to another patient are discarded, and each list is
/// ordered oldest first.
pub fn assemble(
    patient: Patient,
    vitals: Option<Vitals>,
    allergies: Vec<Allergy>,
    conditions: Vec<Condition>,
    diagnoses: Vec<Diagnosis>,
) -> PatientRecord {
    let owner = patient.id;
    PatientRecord {
        vitals: vitals.filter(|v| v.patient_id == owner),
        allergies: owned_in_order(owner, allergies),
        conditions: owned_in_order(owner, conditions),
        diagnoses: owned_in_order(owner, diagnoses),
        patient,
    }
}

fn owned_in_order<T: PatientScoped>(owner: uuid::Uuid, mut items: Vec<T>) -> Vec<T> {
    items.retain(|item| item.patient_id() == owner);
    items.sort_by_key(|item| item.recorded_at());
    items
}
