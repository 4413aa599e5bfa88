//! Field tables for every reconcilable entity
//!
//! Each table lists, in request order, the fields an update may touch and the
//! constraint a present value must satisfy. Columns are the PostgreSQL column
//! names used when a store applies the resulting mutation set.

use crate::models::{
    Allergy, AllergyUpdate, Condition, ConditionUpdate, Diagnosis, DiagnosisUpdate, Patient,
    PatientUpdate, Vitals, VitalsUpdate,
};
use crate::reconcile::{Constraint, FieldDescriptor, Normalize, Reconcilable};

pub const GENDERS: &[&str] = &["MALE", "FEMALE", "OTHER"];
pub const SEVERITIES: &[&str] = &["mild", "moderate", "severe"];

const PHONE: Constraint = Constraint::Digits { len: 10 };
const MEASURE: Constraint = Constraint::FloatRange {
    min: 0.0,
    max: f64::MAX,
};
const COUNT: Constraint = Constraint::IntRange {
    min: 0,
    max: i32::MAX,
};
const SHORT_NAME: Constraint = Constraint::Length { min: 2, max: 30 };

static PATIENT_FIELDS: &[FieldDescriptor<Patient, PatientUpdate>] = &[
    FieldDescriptor {
        name: "fullname",
        column: "full_name",
        read: |u| u.fullname.to_field_value(),
        normalize: Normalize::Trim,
        constraint: Constraint::Length { min: 2, max: 100 },
        apply: |p, v| v.assign_text(&mut p.fullname),
    },
    FieldDescriptor {
        name: "gender",
        column: "gender",
        read: |u| u.gender.to_field_value(),
        normalize: Normalize::TrimUpper,
        constraint: Constraint::OneOf(GENDERS),
        apply: |p, v| v.assign_text(&mut p.gender),
    },
    FieldDescriptor {
        name: "dob",
        column: "date_of_birth",
        read: |u| u.dob.to_field_value(),
        normalize: Normalize::None,
        constraint: Constraint::Any,
        apply: |p, v| v.assign_date(&mut p.dob),
    },
    FieldDescriptor {
        name: "age",
        column: "age",
        read: |u| u.age.to_field_value(),
        normalize: Normalize::None,
        constraint: Constraint::IntRange { min: 0, max: 100 },
        apply: |p, v| v.assign_int(&mut p.age),
    },
    FieldDescriptor {
        name: "contactNo",
        column: "contact_number",
        read: |u| u.contact_number.to_field_value(),
        normalize: Normalize::Trim,
        constraint: PHONE,
        apply: |p, v| v.assign_text(&mut p.contact_number),
    },
    FieldDescriptor {
        name: "address",
        column: "address",
        read: |u| u.address.to_field_value(),
        normalize: Normalize::Trim,
        constraint: Constraint::Length { min: 5, max: 255 },
        apply: |p, v| v.assign_text(&mut p.address),
    },
    FieldDescriptor {
        name: "emergencyName",
        column: "emergency_name",
        read: |u| u.emergency_name.to_field_value(),
        normalize: Normalize::Trim,
        constraint: Constraint::NON_EMPTY,
        apply: |p, v| v.assign_text(&mut p.emergency_name),
    },
    FieldDescriptor {
        name: "emergencyRelation",
        column: "emergency_relation",
        read: |u| u.emergency_relation.to_field_value(),
        normalize: Normalize::Trim,
        constraint: Constraint::NON_EMPTY,
        apply: |p, v| v.assign_text(&mut p.emergency_relation),
    },
    FieldDescriptor {
        name: "emergencyPhone",
        column: "emergency_phone",
        read: |u| u.emergency_phone.to_field_value(),
        normalize: Normalize::Trim,
        constraint: PHONE,
        apply: |p, v| v.assign_text(&mut p.emergency_phone),
    },
];

static VITALS_FIELDS: &[FieldDescriptor<Vitals, VitalsUpdate>] = &[
    FieldDescriptor {
        name: "heightCm",
        column: "height_cm",
        read: |u| u.height_cm.to_field_value(),
        normalize: Normalize::None,
        constraint: MEASURE,
        apply: |e, v| v.assign_opt_float(&mut e.height_cm),
    },
    FieldDescriptor {
        name: "weightKg",
        column: "weight_kg",
        read: |u| u.weight_kg.to_field_value(),
        normalize: Normalize::None,
        constraint: MEASURE,
        apply: |e, v| v.assign_opt_float(&mut e.weight_kg),
    },
    FieldDescriptor {
        name: "bmi",
        column: "bmi",
        read: |u| u.bmi.to_field_value(),
        normalize: Normalize::None,
        constraint: MEASURE,
        apply: |e, v| v.assign_opt_float(&mut e.bmi),
    },
    FieldDescriptor {
        name: "temperatureC",
        column: "temperature_c",
        read: |u| u.temperature_c.to_field_value(),
        normalize: Normalize::None,
        constraint: Constraint::FloatRange {
            min: 30.0,
            max: 45.0,
        },
        apply: |e, v| v.assign_opt_float(&mut e.temperature_c),
    },
    FieldDescriptor {
        name: "pulse",
        column: "pulse",
        read: |u| u.pulse.to_field_value(),
        normalize: Normalize::None,
        constraint: COUNT,
        apply: |e, v| v.assign_opt_int(&mut e.pulse),
    },
    FieldDescriptor {
        name: "respiratoryRate",
        column: "respiratory_rate",
        read: |u| u.respiratory_rate.to_field_value(),
        normalize: Normalize::None,
        constraint: COUNT,
        apply: |e, v| v.assign_opt_int(&mut e.respiratory_rate),
    },
    FieldDescriptor {
        name: "bloodPressureSystolic",
        column: "blood_pressure_systolic",
        read: |u| u.blood_pressure_systolic.to_field_value(),
        normalize: Normalize::None,
        constraint: COUNT,
        apply: |e, v| v.assign_opt_int(&mut e.blood_pressure_systolic),
    },
    FieldDescriptor {
        name: "bloodPressureDiastolic",
        column: "blood_pressure_diastolic",
        read: |u| u.blood_pressure_diastolic.to_field_value(),
        normalize: Normalize::None,
        constraint: COUNT,
        apply: |e, v| v.assign_opt_int(&mut e.blood_pressure_diastolic),
    },
    FieldDescriptor {
        name: "oxygenSaturation",
        column: "oxygen_saturation",
        read: |u| u.oxygen_saturation.to_field_value(),
        normalize: Normalize::None,
        constraint: Constraint::FloatRange {
            min: 0.0,
            max: 100.0,
        },
        apply: |e, v| v.assign_opt_float(&mut e.oxygen_saturation),
    },
];

static ALLERGY_FIELDS: &[FieldDescriptor<Allergy, AllergyUpdate>] = &[
    FieldDescriptor {
        name: "name",
        column: "name",
        read: |u| u.name.to_field_value(),
        normalize: Normalize::Trim,
        constraint: Constraint::Length { min: 2, max: 100 },
        apply: |e, v| v.assign_text(&mut e.name),
    },
    FieldDescriptor {
        name: "severity",
        column: "severity",
        read: |u| u.severity.to_field_value(),
        normalize: Normalize::TrimLower,
        constraint: Constraint::OneOf(SEVERITIES),
        apply: |e, v| v.assign_text(&mut e.severity),
    },
    FieldDescriptor {
        name: "reaction",
        column: "reaction",
        read: |u| u.reaction.to_field_value(),
        normalize: Normalize::Trim,
        constraint: Constraint::Length { min: 2, max: 255 },
        apply: |e, v| v.assign_text(&mut e.reaction),
    },
];

static CONDITION_FIELDS: &[FieldDescriptor<Condition, ConditionUpdate>] = &[FieldDescriptor {
    name: "name",
    column: "name",
    read: |u| u.name.to_field_value(),
    normalize: Normalize::Trim,
    constraint: SHORT_NAME,
    apply: |e, v| v.assign_text(&mut e.name),
}];

static DIAGNOSIS_FIELDS: &[FieldDescriptor<Diagnosis, DiagnosisUpdate>] = &[FieldDescriptor {
    name: "name",
    column: "name",
    read: |u| u.name.to_field_value(),
    normalize: Normalize::Trim,
    constraint: SHORT_NAME,
    apply: |e, v| v.assign_text(&mut e.name),
}];

impl Reconcilable for Patient {
    type Update = PatientUpdate;
    const ENTITY: &'static str = "patient";
    const VERSIONED: bool = true;

    fn fields() -> &'static [FieldDescriptor<Self, Self::Update>] {
        PATIENT_FIELDS
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl Reconcilable for Vitals {
    type Update = VitalsUpdate;
    const ENTITY: &'static str = "vitals";

    fn fields() -> &'static [FieldDescriptor<Self, Self::Update>] {
        VITALS_FIELDS
    }
}

impl Reconcilable for Allergy {
    type Update = AllergyUpdate;
    const ENTITY: &'static str = "allergy";

    fn fields() -> &'static [FieldDescriptor<Self, Self::Update>] {
        ALLERGY_FIELDS
    }
}

impl Reconcilable for Condition {
    type Update = ConditionUpdate;
    const ENTITY: &'static str = "condition";

    fn fields() -> &'static [FieldDescriptor<Self, Self::Update>] {
        CONDITION_FIELDS
    }
}

impl Reconcilable for Diagnosis {
    type Update = DiagnosisUpdate;
    const ENTITY: &'static str = "diagnosis";

    fn fields() -> &'static [FieldDescriptor<Self, Self::Update>] {
        DIAGNOSIS_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPatient;
    use crate::reconcile::{FieldValue, InvalidFieldPolicy, Reconciler};
    use crate::update::UpdateField;
    use crate::CoreError;
    use chrono::{NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn jane() -> Patient {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        Patient::register(
            NewPatient {
                fullname: "Jane Roe".to_string(),
                gender: "FEMALE".to_string(),
                dob: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                contact_number: "0712345678".to_string(),
                address: "12 Harbour Road".to_string(),
                emergency_name: "John Roe".to_string(),
                emergency_relation: "Brother".to_string(),
                emergency_phone: "0798765432".to_string(),
                registered_by: Uuid::new_v4(),
            },
            now,
        )
    }

    fn vitals() -> Vitals {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        Vitals::capture(Uuid::new_v4(), Default::default(), now)
    }

    #[test]
    fn test_all_absent_is_version_only() {
        let reconciler = Reconciler::default();
        let set = reconciler.reconcile::<Patient>(&PatientUpdate::default()).unwrap();
        assert!(!set.has_field_changes());
        assert!(set.bumps_version());

        let before = jane();
        let mut after = before.clone();
        set.apply_to(&mut after);
        assert_eq!(after.version, before.version + 1);
        after.version = before.version;
        assert_eq!(after, before);
    }

    #[test]
    fn test_all_absent_unversioned_is_noop() {
        let set = Reconciler::default()
            .reconcile::<Vitals>(&VitalsUpdate::default())
            .unwrap();
        assert!(set.is_noop());
    }

    #[test]
    fn test_fullname_update_keeps_gender() {
        let update = PatientUpdate {
            fullname: UpdateField::Present("Jane Doe".to_string()),
            ..Default::default()
        };
        let set = Reconciler::default().reconcile::<Patient>(&update).unwrap();
        assert_eq!(set.fields(), vec!["fullname"]);

        let mut patient = jane();
        set.apply_to(&mut patient);
        assert_eq!(patient.fullname, "Jane Doe");
        assert_eq!(patient.gender, "FEMALE");
        assert_eq!(patient.version, 2);
    }

    #[test]
    fn test_gender_is_normalized() {
        let update = PatientUpdate {
            gender: UpdateField::Present(" male ".to_string()),
            ..Default::default()
        };
        let set = Reconciler::default().reconcile::<Patient>(&update).unwrap();
        assert_eq!(set.value_of("gender"), Some(&FieldValue::Text("MALE".to_string())));
    }

    #[test]
    fn test_invalid_field_dropped_by_default() {
        let update = PatientUpdate {
            fullname: UpdateField::Present("Jane Doe".to_string()),
            age: UpdateField::Present(140),
            ..Default::default()
        };
        let set = Reconciler::default().reconcile::<Patient>(&update).unwrap();
        assert_eq!(set.fields(), vec!["fullname"]);
        assert_eq!(set.dropped(), &["age"]);
    }

    #[test]
    fn test_invalid_field_rejected_under_reject_policy() {
        let update = AllergyUpdate {
            name: UpdateField::Present("Penicillin".to_string()),
            severity: UpdateField::Present("lethal".to_string()),
            reaction: UpdateField::Present("x".to_string()),
        };
        let err = Reconciler::new(InvalidFieldPolicy::Reject)
            .reconcile::<Allergy>(&update)
            .unwrap_err();
        match err {
            CoreError::ValidationFailed { entity, fields } => {
                assert_eq!(entity, "allergy");
                assert_eq!(fields, vec!["severity", "reaction"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_is_a_present_value() {
        let update = VitalsUpdate {
            pulse: UpdateField::Present(0),
            ..Default::default()
        };
        let set = Reconciler::default().reconcile::<Vitals>(&update).unwrap();
        let mut v = vitals();
        set.apply_to(&mut v);
        assert_eq!(v.pulse, Some(0));
        assert_eq!(v.bmi, None);
    }

    #[test]
    fn test_bmi_not_derived() {
        let update = VitalsUpdate {
            height_cm: UpdateField::Present(180.0),
            weight_kg: UpdateField::Present(81.0),
            ..Default::default()
        };
        let set = Reconciler::default().reconcile::<Vitals>(&update).unwrap();
        assert_eq!(set.fields(), vec!["heightCm", "weightKg"]);
        let mut v = vitals();
        set.apply_to(&mut v);
        assert_eq!(v.bmi, None);
    }

    #[test]
    fn test_field_names_are_unique_per_table() {
        fn unique<E: Reconcilable>() {
            let mut names: Vec<_> = E::fields().iter().map(|f| f.name).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate field in {}", E::ENTITY);
        }
        unique::<Patient>();
        unique::<Vitals>();
        unique::<Allergy>();
        unique::<Condition>();
        unique::<Diagnosis>();
    }

    fn vitals_update_strategy() -> impl Strategy<Value = VitalsUpdate> {
        let float = || prop::option::of(-10.0f64..200.0).prop_map(UpdateField::from);
        let int = || prop::option::of(-10i32..300).prop_map(UpdateField::from);
        (
            (float(), float(), float(), float(), float()),
            (int(), int(), int(), int()),
        )
            .prop_map(|((h, w, b, t, o), (p, r, s, d))| VitalsUpdate {
                height_cm: h,
                weight_kg: w,
                bmi: b,
                temperature_c: t,
                pulse: p,
                respiratory_rate: r,
                blood_pressure_systolic: s,
                blood_pressure_diastolic: d,
                oxygen_saturation: o,
            })
    }

    proptest! {
        #[test]
        fn prop_reconcile_is_deterministic(update in vitals_update_strategy()) {
            let reconciler = Reconciler::default();
            let a = reconciler.reconcile::<Vitals>(&update).unwrap();
            let b = reconciler.reconcile::<Vitals>(&update).unwrap();
            prop_assert_eq!(a.fields(), b.fields());
            prop_assert_eq!(a.dropped(), b.dropped());
            for m in a.mutations() {
                prop_assert_eq!(Some(&m.value), b.value_of(m.field));
            }
        }

        #[test]
        fn prop_only_present_fields_are_touched(update in vitals_update_strategy()) {
            let set = Reconciler::default().reconcile::<Vitals>(&update).unwrap();
            let present: Vec<&str> = VITALS_FIELDS
                .iter()
                .filter(|f| (f.read)(&update).is_some())
                .map(|f| f.name)
                .collect();
            for field in set.fields().iter().chain(set.dropped()) {
                prop_assert!(present.contains(field));
            }
            prop_assert_eq!(set.fields().len() + set.dropped().len(), present.len());
        }

        #[test]
        fn prop_single_patient_field_independence(age in 0i32..=100, idx in 0usize..3) {
            let mut update = PatientUpdate::default();
            let expected = match idx {
                0 => { update.age = UpdateField::Present(age); "age" }
                1 => { update.address = UpdateField::Present(format!("{age} Long Street")); "address" }
                _ => { update.emergency_relation = UpdateField::Present("Sister".to_string()); "emergencyRelation" }
            };
            let set = Reconciler::default().reconcile::<Patient>(&update).unwrap();
            prop_assert_eq!(set.fields(), vec![expected]);

            let before = jane();
            let mut after = before.clone();
            set.apply_to(&mut after);
            prop_assert_eq!(after.version, before.version + 1);
            prop_assert_eq!(&after.fullname, &before.fullname);
            prop_assert_eq!(&after.gender, &before.gender);
            prop_assert_eq!(&after.contact_number, &before.contact_number);
            prop_assert_eq!(after.dob, before.dob);
        }
    }
}
