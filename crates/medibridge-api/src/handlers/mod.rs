//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod health;
pub mod patients;
pub mod records;
pub mod vitals;

use crate::audit::{audit_log, AuditEvent, RecordAction};
use crate::auth::Identity;
use crate::error::AppError;
use tracing::warn;
use uuid::Uuid;

/// Emit the audit event every mutating endpoint owes
pub(crate) fn record_mutation<S: ToString>(
    actor: &Identity,
    entity: &str,
    entity_id: Uuid,
    action: RecordAction,
    fields: impl IntoIterator<Item = S>,
) {
    audit_log(&AuditEvent::RecordMutated {
        actor_id: actor.id,
        actor_role: actor.role,
        entity: entity.to_string(),
        entity_id,
        action,
        fields: fields.into_iter().map(|f| f.to_string()).collect(),
    });
}

/// Context for logging a failed operation on a clinical record
pub(crate) struct RecordOp<'a> {
    actor: &'a Identity,
    entity: &'a str,
    action: RecordAction,
    patient_id: Uuid,
    entity_id: Option<Uuid>,
}

impl<'a> RecordOp<'a> {
    pub fn new(actor: &'a Identity, entity: &'a str, action: RecordAction, patient_id: Uuid) -> Self {
        Self {
            actor,
            entity,
            action,
            patient_id,
            entity_id: None,
        }
    }

    /// Sub-record id, when the operation targets one
    pub fn on(mut self, entity_id: Uuid) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn failed(&self, err: &AppError) {
        let entity_id = self
            .entity_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        warn!(
            actor_id = %self.actor.id,
            role = %self.actor.role,
            entity = self.entity,
            action = ?self.action,
            patient_id = %self.patient_id,
            entity_id = %entity_id,
            status = err.status_code().as_u16(),
            error = %err,
            "Record operation failed"
        );
    }

    /// Convert into [`AppError`], logging the failure
    pub fn check<T, E: Into<AppError>>(&self, result: Result<T, E>) -> Result<T, AppError> {
        result.map_err(|e| {
            let err = e.into();
            self.failed(&err);
            err
        })
    }
}
