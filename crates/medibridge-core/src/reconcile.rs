//! Partial-update reconciliation
//!
//! Turns a sparse update request into a minimal [`MutationSet`] for an entity.
//! Every entity shares one routine; what differs is its static table of
//! [`FieldDescriptor`]s (see [`crate::fields`]), each naming the field, its
//! storage column, how to read it from the request, how to normalize and
//! check it, and how to write it onto the entity.
//!
//! Reconciliation is pure: the same request always yields the same set, and
//! nothing is written until a store applies the set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::{CoreError, Result};

// ============================================================================
// Field values
// ============================================================================

/// A single reconciled value, typed by storage column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i32),
    Float(f64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn assign_text(&self, slot: &mut String) {
        if let FieldValue::Text(value) = self {
            slot.clone_from(value);
        }
    }

    pub fn assign_int(&self, slot: &mut i32) {
        if let FieldValue::Int(value) = self {
            *slot = *value;
        }
    }

    pub fn assign_opt_int(&self, slot: &mut Option<i32>) {
        if let FieldValue::Int(value) = self {
            *slot = Some(*value);
        }
    }

    pub fn assign_opt_float(&self, slot: &mut Option<f64>) {
        if let FieldValue::Float(value) = self {
            *slot = Some(*value);
        }
    }

    pub fn assign_date(&self, slot: &mut NaiveDate) {
        if let FieldValue::Date(value) = self {
            *slot = *value;
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

// ============================================================================
// Normalization and constraints
// ============================================================================

/// Text normalization applied before a constraint is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    None,
    Trim,
    TrimUpper,
    TrimLower,
}

impl Normalize {
    fn apply(self, value: FieldValue) -> FieldValue {
        match (self, value) {
            (Normalize::Trim, FieldValue::Text(s)) => FieldValue::Text(s.trim().to_string()),
            (Normalize::TrimUpper, FieldValue::Text(s)) => {
                FieldValue::Text(s.trim().to_uppercase())
            }
            (Normalize::TrimLower, FieldValue::Text(s)) => {
                FieldValue::Text(s.trim().to_lowercase())
            }
            (_, other) => other,
        }
    }
}

/// Domain constraint for a single field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    Any,
    /// Character count within `min..=max`
    Length { min: usize, max: usize },
    OneOf(&'static [&'static str]),
    /// Exactly `len` ASCII digits
    Digits { len: usize },
    IntRange { min: i32, max: i32 },
    FloatRange { min: f64, max: f64 },
}

impl Constraint {
    pub const NON_EMPTY: Constraint = Constraint::Length {
        min: 1,
        max: usize::MAX,
    };

    pub fn admits(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Constraint::Any, _) => true,
            (Constraint::Length { min, max }, FieldValue::Text(s)) => {
                let count = s.chars().count();
                count >= *min && count <= *max
            }
            (Constraint::OneOf(allowed), FieldValue::Text(s)) => allowed.contains(&s.as_str()),
            (Constraint::Digits { len }, FieldValue::Text(s)) => {
                s.len() == *len && s.bytes().all(|b| b.is_ascii_digit())
            }
            (Constraint::IntRange { min, max }, FieldValue::Int(n)) => (*min..=*max).contains(n),
            (Constraint::FloatRange { min, max }, FieldValue::Float(x)) => {
                x.is_finite() && *x >= *min && *x <= *max
            }
            _ => false,
        }
    }
}

// ============================================================================
// Descriptors and mutation sets
// ============================================================================

/// One row of an entity's field table
pub struct FieldDescriptor<E, U> {
    /// Name as it appears in requests and validation errors
    pub name: &'static str,
    /// Storage column
    pub column: &'static str,
    pub read: fn(&U) -> Option<FieldValue>,
    pub normalize: Normalize,
    pub constraint: Constraint,
    pub apply: fn(&mut E, &FieldValue),
}

/// An entity that can be updated through the reconciler
pub trait Reconcilable: Sized + 'static {
    /// Sparse update request shape
    type Update;

    /// Entity name used in logs and errors
    const ENTITY: &'static str;

    /// Whether successful updates increment a version counter
    const VERSIONED: bool = false;

    fn fields() -> &'static [FieldDescriptor<Self, Self::Update>];

    /// Increment the version counter; no-op for unversioned entities
    fn bump_version(&mut self) {}
}

/// A single `set(field, value)` mutation
pub struct Mutation<E> {
    pub field: &'static str,
    pub column: &'static str,
    pub value: FieldValue,
    apply: fn(&mut E, &FieldValue),
}

impl<E> fmt::Debug for Mutation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("field", &self.field)
            .field("column", &self.column)
            .field("value", &self.value)
            .finish()
    }
}

/// The minimal set of mutations produced for one update request
pub struct MutationSet<E> {
    mutations: Vec<Mutation<E>>,
    dropped: Vec<&'static str>,
    bump_version: bool,
}

impl<E> fmt::Debug for MutationSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationSet")
            .field("mutations", &self.mutations)
            .field("dropped", &self.dropped)
            .field("bump_version", &self.bump_version)
            .finish()
    }
}

impl<E: Reconcilable> MutationSet<E> {
    pub fn mutations(&self) -> &[Mutation<E>] {
        &self.mutations
    }

    /// Names of the fields this set writes, in table order
    pub fn fields(&self) -> Vec<&'static str> {
        self.mutations.iter().map(|m| m.field).collect()
    }

    /// Present fields discarded for failing their constraint
    pub fn dropped(&self) -> &[&'static str] {
        &self.dropped
    }

    pub fn bumps_version(&self) -> bool {
        self.bump_version
    }

    /// True when at least one stored field changes
    pub fn has_field_changes(&self) -> bool {
        !self.mutations.is_empty()
    }

    /// True when applying the set changes nothing at all
    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty() && !self.bump_version
    }

    pub fn value_of(&self, field: &str) -> Option<&FieldValue> {
        self.mutations
            .iter()
            .find(|m| m.field == field)
            .map(|m| &m.value)
    }

    /// Apply every mutation in memory, then bump the version if required
    pub fn apply_to(&self, entity: &mut E) {
        for mutation in &self.mutations {
            (mutation.apply)(entity, &mutation.value);
        }
        if self.bump_version {
            entity.bump_version();
        }
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// What to do with a present field that fails its constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidFieldPolicy {
    /// Discard the field and keep the rest of the update
    #[default]
    Drop,
    /// Fail the whole update, listing every failing field
    Reject,
}

impl FromStr for InvalidFieldPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "reject" => Ok(Self::Reject),
            other => Err(CoreError::ConfigError(format!(
                "unknown invalid-field policy: {other}"
            ))),
        }
    }
}

/// Generic reconciliation routine, parameterized by an invalid-field policy
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    policy: InvalidFieldPolicy,
}

impl Reconciler {
    pub fn new(policy: InvalidFieldPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> InvalidFieldPolicy {
        self.policy
    }

    /// Build the mutation set for `update`
    ///
    /// # Returns
    ///
    /// * `Ok(MutationSet)` - Possibly empty (or version-only) set
    /// * `Err(CoreError::ValidationFailed)` - Only under [`InvalidFieldPolicy::Reject`]
    pub fn reconcile<E: Reconcilable>(&self, update: &E::Update) -> Result<MutationSet<E>> {
        let mut mutations = Vec::new();
        let mut dropped = Vec::new();

        for descriptor in E::fields() {
            let Some(raw) = (descriptor.read)(update) else {
                continue;
            };
            let value = descriptor.normalize.apply(raw);
            if descriptor.constraint.admits(&value) {
                mutations.push(Mutation {
                    field: descriptor.name,
                    column: descriptor.column,
                    value,
                    apply: descriptor.apply,
                });
            } else {
                dropped.push(descriptor.name);
            }
        }

        if !dropped.is_empty() {
            match self.policy {
                InvalidFieldPolicy::Reject => {
                    return Err(CoreError::ValidationFailed {
                        entity: E::ENTITY.to_string(),
                        fields: dropped.iter().map(|f| f.to_string()).collect(),
                    });
                }
                InvalidFieldPolicy::Drop => {
                    debug!(entity = E::ENTITY, fields = ?dropped, "Dropping invalid update fields");
                }
            }
        }

        Ok(MutationSet {
            mutations,
            dropped,
            bump_version: E::VERSIONED,
        })
    }
}
