//! Clinical record and staff models

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::update::UpdateField;
use crate::Role;

// ============================================================================
// Staff and sessions
// ============================================================================

/// Stored staff account
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields persisted at signup
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Server-side session, keyed by the digest of the opaque token
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token_digest: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is active while `now` has not passed its expiry
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

// ============================================================================
// Patients
// ============================================================================

/// Registered patient; the only versioned entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub fullname: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub age: i32,
    #[serde(rename = "contactNo")]
    pub contact_number: String,
    pub address: String,
    pub emergency_name: String,
    pub emergency_relation: String,
    pub emergency_phone: String,
    #[serde(rename = "regById")]
    pub registered_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i64,
}

/// Validated registration input
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub fullname: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub contact_number: String,
    pub address: String,
    pub emergency_name: String,
    pub emergency_relation: String,
    pub emergency_phone: String,
    pub registered_by: Uuid,
}

impl Patient {
    /// Build a fresh patient at version 1
    pub fn register(new: NewPatient, now: DateTime<Utc>) -> Self {
        let age = age_on(new.dob, now.date_naive());
        Self {
            id: Uuid::new_v4(),
            fullname: new.fullname,
            gender: new.gender,
            dob: new.dob,
            age,
            contact_number: new.contact_number,
            address: new.address,
            emergency_name: new.emergency_name,
            emergency_relation: new.emergency_relation,
            emergency_phone: new.emergency_phone,
            registered_by: new.registered_by,
            created_at: now,
            updated_at: None,
            version: 1,
        }
    }
}

/// Whole years between `dob` and `today`
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// Sparse patient update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatientUpdate {
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub fullname: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub gender: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub dob: UpdateField<NaiveDate>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub age: UpdateField<i32>,
    #[serde(rename = "contactNo", skip_serializing_if = "UpdateField::is_absent")]
    pub contact_number: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub address: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub emergency_name: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub emergency_relation: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub emergency_phone: UpdateField<String>,
}

/// Row in the patient listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: Uuid,
    pub fullname: String,
    pub gender: String,
    pub age: i32,
    pub dob: NaiveDate,
}

impl From<&Patient> for PatientSummary {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id,
            fullname: p.fullname.clone(),
            gender: p.gender.clone(),
            age: p.age,
            dob: p.dob,
        }
    }
}

/// Listing parameters; `page` is 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientQuery {
    pub page: i64,
    pub page_size: i64,
    pub search_term: Option<String>,
}

impl PatientQuery {
    /// Rows skipped before this page; saturates instead of overflowing
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.page_size.max(0))
    }

    /// Case-insensitive fullname match
    pub fn matches(&self, fullname: &str) -> bool {
        match self.search_term.as_deref() {
            None | Some("") => true,
            Some(term) => fullname.to_lowercase().contains(&term.to_lowercase()),
        }
    }
}

/// Pagination metadata returned with listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub from: i64,
    pub to: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageMeta {
    pub fn new(query: &PatientQuery, total_items: i64, returned: usize) -> Self {
        let page_size = query.page_size.max(1);
        let total_pages = total_items.saturating_add(page_size - 1) / page_size;
        let (from, to) = if total_items == 0 || returned == 0 {
            (0, 0)
        } else {
            let offset = query.offset();
            (
                offset.saturating_add(1),
                offset.saturating_add(returned as i64),
            )
        };
        Self {
            current_page: query.page,
            page_size: query.page_size,
            total_items,
            total_pages,
            from,
            to,
            has_next: query.page < total_pages,
            has_previous: query.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPage {
    pub patients: Vec<PatientSummary>,
    pub meta: PageMeta,
}

// ============================================================================
// Sub-records
// ============================================================================

/// Sub-record owned by exactly one patient
pub trait PatientScoped: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn patient_id(&self) -> Uuid;
    /// Creation time; listings are ordered by it
    fn recorded_at(&self) -> DateTime<Utc>;
    fn touch(&mut self, now: DateTime<Utc>);
}

/// Vital signs; at most one row per patient, every measure optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub id: Uuid,
    #[serde(rename = "patientID")]
    pub patient_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_systolic: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_diastolic: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Measures supplied when vitals are first captured
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalsInput {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub bmi: Option<f64>,
    pub temperature_c: Option<f64>,
    pub pulse: Option<i32>,
    pub respiratory_rate: Option<i32>,
    pub blood_pressure_systolic: Option<i32>,
    pub blood_pressure_diastolic: Option<i32>,
    pub oxygen_saturation: Option<f64>,
}

impl Vitals {
    pub fn capture(patient_id: Uuid, input: VitalsInput, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            height_cm: input.height_cm,
            weight_kg: input.weight_kg,
            bmi: input.bmi,
            temperature_c: input.temperature_c,
            pulse: input.pulse,
            respiratory_rate: input.respiratory_rate,
            blood_pressure_systolic: input.blood_pressure_systolic,
            blood_pressure_diastolic: input.blood_pressure_diastolic,
            oxygen_saturation: input.oxygen_saturation,
            created_at: now,
            updated_at: None,
        }
    }
}

/// Sparse vitals update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VitalsUpdate {
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub height_cm: UpdateField<f64>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub weight_kg: UpdateField<f64>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub bmi: UpdateField<f64>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub temperature_c: UpdateField<f64>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub pulse: UpdateField<i32>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub respiratory_rate: UpdateField<i32>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub blood_pressure_systolic: UpdateField<i32>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub blood_pressure_diastolic: UpdateField<i32>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub oxygen_saturation: UpdateField<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub id: Uuid,
    #[serde(rename = "patientID")]
    pub patient_id: Uuid,
    pub name: String,
    pub severity: String,
    pub reaction: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Allergy {
    pub fn record(
        patient_id: Uuid,
        name: String,
        severity: String,
        reaction: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            name,
            severity,
            reaction,
            recorded_at: now,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllergyUpdate {
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub name: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub severity: UpdateField<String>,
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub reaction: UpdateField<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: Uuid,
    #[serde(rename = "patientID")]
    pub patient_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionUpdate {
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub name: UpdateField<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub id: Uuid,
    #[serde(rename = "patientID")]
    pub patient_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisUpdate {
    #[serde(skip_serializing_if = "UpdateField::is_absent")]
    pub name: UpdateField<String>,
}

impl Condition {
    pub fn new(patient_id: Uuid, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            name,
            created_at: now,
            updated_at: None,
        }
    }
}

impl Diagnosis {
    pub fn new(patient_id: Uuid, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            name,
            created_at: now,
            updated_at: None,
        }
    }
}

impl PatientScoped for Vitals {
    fn id(&self) -> Uuid {
        self.id
    }
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

impl PatientScoped for Allergy {
    fn id(&self) -> Uuid {
        self.id
    }
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

impl PatientScoped for Condition {
    fn id(&self) -> Uuid {
        self.id
    }
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

impl PatientScoped for Diagnosis {
    fn id(&self) -> Uuid {
        self.id
    }
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }
    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}
