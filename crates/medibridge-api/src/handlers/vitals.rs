//! Vitals API handlers (doctor only)
//!
//! Author: hephaex@gmail.com

use super::{record_mutation, RecordOp};
use crate::audit::RecordAction;
use crate::error::{ApiResponse, AppError};
use crate::extract::{parse_id, validated, JsonBody};
use crate::middleware::Authenticated;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use medibridge_core::{bounded, Vitals, VitalsInput, VitalsUpdate};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// First capture; every measure optional, present ones must be positive
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CaptureVitalsRequest {
    #[validate(range(exclusive_min = 0.0))]
    pub height_cm: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub weight_kg: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub bmi: Option<f64>,
    #[validate(range(min = 30.0, max = 45.0))]
    pub temperature_c: Option<f64>,
    #[validate(range(min = 1))]
    pub pulse: Option<i32>,
    #[validate(range(min = 1))]
    pub respiratory_rate: Option<i32>,
    #[validate(range(min = 1))]
    pub blood_pressure_systolic: Option<i32>,
    #[validate(range(min = 1))]
    pub blood_pressure_diastolic: Option<i32>,
    #[validate(range(exclusive_min = 0.0, max = 100.0))]
    pub oxygen_saturation: Option<f64>,
}

impl From<CaptureVitalsRequest> for VitalsInput {
    fn from(r: CaptureVitalsRequest) -> Self {
        Self {
            height_cm: r.height_cm,
            weight_kg: r.weight_kg,
            bmi: r.bmi,
            temperature_c: r.temperature_c,
            pulse: r.pulse,
            respiratory_rate: r.respiratory_rate,
            blood_pressure_systolic: r.blood_pressure_systolic,
            blood_pressure_diastolic: r.blood_pressure_diastolic,
            oxygen_saturation: r.oxygen_saturation,
        }
    }
}

/// Capture vitals; a patient holds at most one vitals record
pub async fn capture_vitals(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
    JsonBody(request): JsonBody<CaptureVitalsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let patient_id = parse_id("patientID", &patient_id)?;
    let request = validated(request)?;
    let op = RecordOp::new(&identity, "vitals", RecordAction::Create, patient_id);

    let vitals = op.check(
        bounded(
            state.store_timeout(),
            "capture vitals",
            state
                .stores
                .vitals
                .capture(Vitals::capture(patient_id, request.into(), Utc::now())),
        )
        .await,
    )?;

    record_mutation(&identity, "vitals", vitals.id, RecordAction::Create, ["*"]);
    Ok(ApiResponse::created("vitals captured successfully", vitals))
}

pub async fn update_vitals(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
    JsonBody(update): JsonBody<VitalsUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let patient_id = parse_id("patientID", &patient_id)?;
    let op = RecordOp::new(&identity, "vitals", RecordAction::Update, patient_id);
    let mutations = op.check(state.reconciler.reconcile::<Vitals>(&update))?;

    let vitals = op.check(
        bounded(
            state.store_timeout(),
            "update vitals",
            state.stores.vitals.update(patient_id, &mutations),
        )
        .await,
    )?;

    record_mutation(&identity, "vitals", vitals.id, RecordAction::Update, mutations.fields());
    Ok(ApiResponse::ok("vitals updated successfully", vitals))
}

pub async fn delete_vitals(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    Path(patient_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let patient_id = parse_id("patientID", &patient_id)?;
    let op = RecordOp::new(&identity, "vitals", RecordAction::Delete, patient_id);
    let vitals_id = op.check(
        bounded(
            state.store_timeout(),
            "delete vitals",
            state.stores.vitals.delete(patient_id),
        )
        .await,
    )?;

    record_mutation(&identity, "vitals", vitals_id, RecordAction::Delete, ["*"]);
    Ok(ApiResponse::message("vitals deleted successfully"))
}
