//! Allergy, condition, and diagnosis handlers (doctor only)
//!
//! The three one-to-many sub-records share update and delete flows; only
//! creation differs per entity.
//!
//! Author: hephaex@gmail.com

use super::{record_mutation, RecordOp};
use crate::audit::RecordAction;
use crate::auth::Identity;
use crate::error::{ApiResponse, AppError};
use crate::extract::{parse_id, validated, JsonBody};
use crate::middleware::Authenticated;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use medibridge_core::{
    bounded, fields::SEVERITIES, Allergy, AllergyUpdate, Condition, ConditionUpdate, Diagnosis,
    DiagnosisUpdate, PatientScoped, Reconcilable, SubRecordStore,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ============================================================================
// Shared flows
// ============================================================================

async fn add_record<E>(
    state: &AppState,
    store: &dyn SubRecordStore<E>,
    identity: &Identity,
    record: E,
) -> Result<E, AppError>
where
    E: PatientScoped + Reconcilable,
{
    let op = RecordOp::new(identity, E::ENTITY, RecordAction::Create, record.patient_id());
    let operation = format!("add {}", E::ENTITY);
    let record = op.check(bounded(state.store_timeout(), &operation, store.add(record)).await)?;
    record_mutation(identity, E::ENTITY, record.id(), RecordAction::Create, ["*"]);
    Ok(record)
}

async fn update_record<E>(
    state: &AppState,
    store: &dyn SubRecordStore<E>,
    identity: &Identity,
    (patient_id, record_id): (Uuid, Uuid),
    update: &E::Update,
) -> Result<E, AppError>
where
    E: PatientScoped + Reconcilable,
{
    let op = RecordOp::new(identity, E::ENTITY, RecordAction::Update, patient_id).on(record_id);
    let mutations = op.check(state.reconciler.reconcile::<E>(update))?;
    let operation = format!("update {}", E::ENTITY);
    let record = op.check(
        bounded(
            state.store_timeout(),
            &operation,
            store.update(patient_id, record_id, &mutations),
        )
        .await,
    )?;
    record_mutation(identity, E::ENTITY, record_id, RecordAction::Update, mutations.fields());
    Ok(record)
}

async fn delete_record<E>(
    state: &AppState,
    store: &dyn SubRecordStore<E>,
    identity: &Identity,
    (patient_id, record_id): (Uuid, Uuid),
) -> Result<(), AppError>
where
    E: PatientScoped + Reconcilable,
{
    let op = RecordOp::new(identity, E::ENTITY, RecordAction::Delete, patient_id).on(record_id);
    let operation = format!("delete {}", E::ENTITY);
    op.check(
        bounded(
            state.store_timeout(),
            &operation,
            store.delete(patient_id, record_id),
        )
        .await,
    )?;
    record_mutation(identity, E::ENTITY, record_id, RecordAction::Delete, ["*"]);
    Ok(())
}

fn parse_ids(
    (patient_id, record_id): (String, String),
    record_param: &str,
) -> Result<(Uuid, Uuid), AppError> {
    Ok((
        parse_id("patientID", &patient_id)?,
        parse_id(record_param, &record_id)?,
    ))
}

// ============================================================================
// Allergies
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddAllergyRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    /// mild, moderate, or severe (case-insensitive)
    #[validate(custom(function = "validate_severity"))]
    pub severity: String,
    #[validate(length(min = 2, max = 255))]
    pub reaction: String,
}

fn validate_severity(severity: &str) -> Result<(), ValidationError> {
    if SEVERITIES.contains(&severity) {
        Ok(())
    } else {
        Err(ValidationError::new("severity"))
    }
}

pub async fn add_allergy(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
    JsonBody(request): JsonBody<AddAllergyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let patient_id = parse_id("patientID", &patient_id)?;
    let request = validated(AddAllergyRequest {
        name: request.name.trim().to_string(),
        severity: request.severity.trim().to_lowercase(),
        reaction: request.reaction.trim().to_string(),
    })?;

    let allergy = Allergy::record(
        patient_id,
        request.name,
        request.severity,
        request.reaction,
        Utc::now(),
    );
    let allergy = add_record(&state, state.stores.allergies.as_ref(), &identity, allergy).await?;
    Ok(ApiResponse::created("allergy recorded successfully", allergy))
}

pub async fn update_allergy(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(ids): Path<(String, String)>,
    JsonBody(update): JsonBody<AllergyUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let ids = parse_ids(ids, "allergyID")?;
    let allergy = update_record(&state, state.stores.allergies.as_ref(), &identity, ids, &update)
        .await?;
    Ok(ApiResponse::ok("allergy updated successfully", allergy))
}

pub async fn delete_allergy(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(ids): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let ids = parse_ids(ids, "allergyID")?;
    delete_record::<Allergy>(&state, state.stores.allergies.as_ref(), &identity, ids).await?;
    Ok(ApiResponse::message("allergy deleted successfully"))
}

// ============================================================================
// Conditions and diagnoses
// ============================================================================

/// Body for conditions and diagnoses
///
/// Conditions historically posted `{"condition": ...}`; both keys are read.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NamedRecordRequest {
    #[serde(alias = "condition")]
    #[validate(length(min = 2, max = 30))]
    pub name: String,
}

impl NamedRecordRequest {
    fn checked(self) -> Result<String, AppError> {
        let request = validated(Self {
            name: self.name.trim().to_string(),
        })?;
        Ok(request.name)
    }
}

pub async fn add_condition(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
    JsonBody(request): JsonBody<NamedRecordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let patient_id = parse_id("patientID", &patient_id)?;
    let condition = Condition::new(patient_id, request.checked()?, Utc::now());
    let condition =
        add_record(&state, state.stores.conditions.as_ref(), &identity, condition).await?;
    Ok(ApiResponse::created("condition recorded successfully", condition))
}

pub async fn update_condition(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(ids): Path<(String, String)>,
    JsonBody(update): JsonBody<ConditionUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let ids = parse_ids(ids, "conditionID")?;
    let condition =
        update_record(&state, state.stores.conditions.as_ref(), &identity, ids, &update).await?;
    Ok(ApiResponse::ok("condition updated successfully", condition))
}

pub async fn delete_condition(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(ids): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let ids = parse_ids(ids, "conditionID")?;
    delete_record::<Condition>(&state, state.stores.conditions.as_ref(), &identity, ids).await?;
    Ok(ApiResponse::message("condition deleted successfully"))
}

pub async fn add_diagnosis(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
    JsonBody(request): JsonBody<NamedRecordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let patient_id = parse_id("patientID", &patient_id)?;
    let diagnosis = Diagnosis::new(patient_id, request.checked()?, Utc::now());
    let diagnosis =
        add_record(&state, state.stores.diagnoses.as_ref(), &identity, diagnosis).await?;
    Ok(ApiResponse::created("diagnosis recorded successfully", diagnosis))
}

pub async fn update_diagnosis(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(ids): Path<(String, String)>,
    JsonBody(update): JsonBody<DiagnosisUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let ids = parse_ids(ids, "diagnosisID")?;
    let diagnosis =
        update_record(&state, state.stores.diagnoses.as_ref(), &identity, ids, &update).await?;
    Ok(ApiResponse::ok("diagnosis updated successfully", diagnosis))
}

pub async fn delete_diagnosis(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(ids): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let ids = parse_ids(ids, "diagnosisID")?;
    delete_record::<Diagnosis>(&state, state.stores.diagnoses.as_ref(), &identity, ids).await?;
    Ok(ApiResponse::message("diagnosis deleted successfully"))
}
