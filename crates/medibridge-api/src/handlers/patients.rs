//! Patient API handlers
//!
//! Registration, paginated listing, the assembled patient record, sparse
//! updates through the reconciler, and deletion.
//!
//! Author: hephaex@gmail.com

use super::{record_mutation, RecordOp};
use crate::audit::RecordAction;
use crate::error::{ApiResponse, AppError};
use crate::extract::{parse_id, validated, JsonBody};
use crate::middleware::Authenticated;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use medibridge_core::{
    assemble, bounded, fields::GENDERS, NewPatient, Patient, PatientQuery, PatientUpdate,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

const MAX_AGE: i32 = 100;
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Patient registration body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPatientRequest {
    #[validate(length(min = 2, max = 100))]
    pub fullname: String,

    /// MALE, FEMALE, or OTHER (case-insensitive)
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,

    /// `YYYY-MM-DD`
    pub dob: NaiveDate,

    #[serde(rename = "contactNo")]
    #[validate(custom(function = "validate_phone"))]
    pub contact_number: String,

    #[validate(length(min = 5, max = 255))]
    pub address: String,

    #[validate(length(min = 1))]
    pub emergency_name: String,

    #[validate(length(min = 1))]
    pub emergency_relation: String,

    #[validate(custom(function = "validate_phone"))]
    pub emergency_phone: String,
}

impl RegisterPatientRequest {
    fn sanitize(self) -> Self {
        Self {
            fullname: self.fullname.trim().to_string(),
            gender: self.gender.trim().to_uppercase(),
            dob: self.dob,
            contact_number: self.contact_number.trim().to_string(),
            address: self.address.trim().to_string(),
            emergency_name: self.emergency_name.trim().to_string(),
            emergency_relation: self.emergency_relation.trim().to_string(),
            emergency_phone: self.emergency_phone.trim().to_string(),
        }
    }
}

fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    if GENDERS.contains(&gender) {
        Ok(())
    } else {
        Err(ValidationError::new("gender"))
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

/// Register a patient
///
/// Age is derived from `dob`; the caller becomes `regById`.
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    JsonBody(request): JsonBody<RegisterPatientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = validated(request.sanitize())?;

    let now = Utc::now();
    let patient = Patient::register(
        NewPatient {
            fullname: request.fullname,
            gender: request.gender,
            dob: request.dob,
            contact_number: request.contact_number,
            address: request.address,
            emergency_name: request.emergency_name,
            emergency_relation: request.emergency_relation,
            emergency_phone: request.emergency_phone,
            registered_by: identity.id,
        },
        now,
    );
    if !(0..=MAX_AGE).contains(&patient.age) {
        return Err(AppError::validation(["dob"]));
    }

    let patient = bounded(
        state.store_timeout(),
        "create patient",
        state.stores.patients.create(patient),
    )
    .await?;

    record_mutation(&identity, "patient", patient.id, RecordAction::Create, ["*"]);
    Ok(ApiResponse::created("patient registered successfully", patient))
}

/// Raw listing parameters; parsed by hand so bad values become 422
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search_term: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<PatientQuery, AppError> {
        let mut invalid = Vec::new();

        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw.parse::<i64>().ok().filter(|p| *p >= 1).unwrap_or_else(|| {
                invalid.push("page");
                1
            }),
        };
        let page_size = match self.page_size.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PAGE_SIZE,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
                .unwrap_or_else(|| {
                    invalid.push("pageSize");
                    DEFAULT_PAGE_SIZE
                }),
        };

        // Row offset must fit in i64
        if (page - 1).checked_mul(page_size).is_none() {
            invalid.push("page");
        }

        if !invalid.is_empty() {
            return Err(AppError::validation(invalid));
        }

        Ok(PatientQuery {
            page,
            page_size,
            search_term: self
                .search_term
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }
}

/// List patients, newest first
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query()?;
    let page = bounded(
        state.store_timeout(),
        "list patients",
        state.stores.patients.list(&query),
    )
    .await?;

    Ok(ApiResponse::ok("patients fetched successfully", page))
}

/// Assembled record: patient, vitals when captured, and every sub-record list
pub async fn get_patient_record(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("patientID", &patient_id)?;
    let timeout = state.store_timeout();
    let stores = &state.stores;

    let (patient, vitals, allergies, conditions, diagnoses) = tokio::try_join!(
        bounded(timeout, "get patient", stores.patients.get(id)),
        bounded(timeout, "get vitals", stores.vitals.find_by_patient(id)),
        bounded(timeout, "list allergies", stores.allergies.list_for_patient(id)),
        bounded(timeout, "list conditions", stores.conditions.list_for_patient(id)),
        bounded(timeout, "list diagnoses", stores.diagnoses.list_for_patient(id)),
    )?;

    let record = assemble(patient, vitals, allergies, conditions, diagnoses);
    Ok(ApiResponse::ok("patient record fetched successfully", record))
}

/// Sparse update; absent and null fields are left untouched
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
    JsonBody(update): JsonBody<PatientUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("patientID", &patient_id)?;
    let op = RecordOp::new(&identity, "patient", RecordAction::Update, id);
    let mutations = op.check(state.reconciler.reconcile::<Patient>(&update))?;

    let patient = op.check(
        bounded(
            state.store_timeout(),
            "update patient",
            state.stores.patients.update(id, &mutations),
        )
        .await,
    )?;

    record_mutation(&identity, "patient", id, RecordAction::Update, mutations.fields());
    Ok(ApiResponse::ok("patient data updated successfully", patient))
}

/// Delete a patient and every sub-record
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id("patientID", &patient_id)?;
    let op = RecordOp::new(&identity, "patient", RecordAction::Delete, id);
    op.check(
        bounded(
            state.store_timeout(),
            "delete patient",
            state.stores.patients.delete(id),
        )
        .await,
    )?;

    record_mutation(&identity, "patient", id, RecordAction::Delete, ["*"]);
    Ok(ApiResponse::message("patient deleted successfully"))
}
