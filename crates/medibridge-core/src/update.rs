//! Sparse update fields
//!
//! `UpdateField<T>` distinguishes "leave unchanged" from "set to this value",
//! including falsy values such as `0` or `""`. A missing JSON key and an
//! explicit `null` both decode to [`UpdateField::Absent`]; update request
//! structs carry `#[serde(default)]` so missing keys are accepted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::reconcile::FieldValue;

/// Per-field optional wrapper used by every update request shape
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UpdateField<T> {
    /// Leave the stored value untouched
    #[default]
    Absent,
    /// Overwrite the stored value
    Present(T),
}

impl<T> UpdateField<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, UpdateField::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    pub fn as_ref(&self) -> UpdateField<&T> {
        match self {
            UpdateField::Absent => UpdateField::Absent,
            UpdateField::Present(value) => UpdateField::Present(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            UpdateField::Absent => None,
            UpdateField::Present(value) => Some(value),
        }
    }
}

impl<T: Clone + Into<FieldValue>> UpdateField<T> {
    /// Present values as a reconciler input, `None` when absent
    pub fn to_field_value(&self) -> Option<FieldValue> {
        match self {
            UpdateField::Absent => None,
            UpdateField::Present(value) => Some(value.clone().into()),
        }
    }
}

impl<T> From<Option<T>> for UpdateField<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => UpdateField::Present(v),
            None => UpdateField::Absent,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for UpdateField<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(UpdateField::from)
    }
}

impl<T: Serialize> Serialize for UpdateField<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            UpdateField::Absent => serializer.serialize_none(),
            UpdateField::Present(value) => serializer.serialize_some(value),
        }
    }
}
