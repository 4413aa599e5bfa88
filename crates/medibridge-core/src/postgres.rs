//! PostgreSQL storage backend
//!
//! Implements every storage port with SQLx. Updates are built from a
//! [`MutationSet`] with `QueryBuilder`: column names come from the static
//! field tables, values are always bound.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, FromRow, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Allergy, Condition, Diagnosis, NewUser, PageMeta, Patient, PatientPage, PatientQuery,
    PatientScoped, PatientSummary, Session, UserRecord, Vitals,
};
use crate::reconcile::{FieldValue, MutationSet, Reconcilable};
use crate::store::{CredentialStore, PatientStore, SessionStore, SubRecordStore, VitalsStore};
use crate::{CoreError, Result};

const SCHEMA: &str = include_str!("../sql/schema.sql");

const USER_COLUMNS: &str = "id, full_name, email, password_hash, role, activated, created_at";
const PATIENT_COLUMNS: &str = "id, full_name, gender, date_of_birth, age, contact_number, address, \
     emergency_name, emergency_relation, emergency_phone, registered_by, created_at, updated_at, version";
const VITALS_COLUMNS: &str = "id, patient_id, height_cm, weight_kg, bmi, temperature_c, pulse, \
     respiratory_rate, blood_pressure_systolic, blood_pressure_diastolic, oxygen_saturation, \
     created_at, updated_at";

/// PostgreSQL store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes when missing
    pub async fn ensure_schema(&self) -> Result<()> {
        self.pool
            .execute(SCHEMA)
            .await
            .map_err(|e| CoreError::DatabaseError(format!("Schema bootstrap failed: {e}")))?;
        info!("Database schema ready");
        Ok(())
    }
}

/// Translate constraint violations into the domain taxonomy
fn db_error(entity: &str, err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return CoreError::Conflict(format!("{entity} already exists"));
        }
        if db.is_foreign_key_violation() {
            return CoreError::NotFound(format!("record referenced by {entity}"));
        }
    }
    CoreError::DatabaseError(format!("{entity}: {err}"))
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Text(s) => qb.push_bind(s.clone()),
        FieldValue::Int(n) => qb.push_bind(*n),
        FieldValue::Float(x) => qb.push_bind(*x),
        FieldValue::Date(d) => qb.push_bind(*d),
    };
}

/// `col = $n, ...` for every mutation, plus bookkeeping columns
fn push_assignments<E: Reconcilable>(qb: &mut QueryBuilder<'_, Postgres>, set: &MutationSet<E>) {
    let mut first = true;
    for mutation in set.mutations() {
        if !first {
            qb.push(", ");
        }
        first = false;
        qb.push(mutation.column).push(" = ");
        push_value(qb, &mutation.value);
    }
    if set.has_field_changes() {
        qb.push(", updated_at = NOW()");
    }
    if set.bumps_version() {
        if !first {
            qb.push(", ");
        }
        qb.push("version = version + 1");
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    email: String,
    password_hash: String,
    role: String,
    activated: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(UserRecord {
            id: row.id,
            fullname: row.full_name,
            email: row.email,
            password_hash: row.password_hash,
            role: row
                .role
                .parse()
                .map_err(|_| CoreError::DatabaseError(format!("unknown role {}", row.role)))?,
            activated: row.activated,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PatientRow {
    id: Uuid,
    full_name: String,
    gender: String,
    date_of_birth: NaiveDate,
    age: i32,
    contact_number: String,
    address: String,
    emergency_name: String,
    emergency_relation: String,
    emergency_phone: String,
    registered_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    version: i64,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            fullname: row.full_name,
            gender: row.gender,
            dob: row.date_of_birth,
            age: row.age,
            contact_number: row.contact_number,
            address: row.address,
            emergency_name: row.emergency_name,
            emergency_relation: row.emergency_relation,
            emergency_phone: row.emergency_phone,
            registered_by: row.registered_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: Uuid,
    full_name: String,
    gender: String,
    age: i32,
    date_of_birth: NaiveDate,
}

impl From<SummaryRow> for PatientSummary {
    fn from(row: SummaryRow) -> Self {
        PatientSummary {
            id: row.id,
            fullname: row.full_name,
            gender: row.gender,
            age: row.age,
            dob: row.date_of_birth,
        }
    }
}

#[derive(Debug, FromRow)]
struct VitalsRow {
    id: Uuid,
    patient_id: Uuid,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    bmi: Option<f64>,
    temperature_c: Option<f64>,
    pulse: Option<i32>,
    respiratory_rate: Option<i32>,
    blood_pressure_systolic: Option<i32>,
    blood_pressure_diastolic: Option<i32>,
    oxygen_saturation: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<VitalsRow> for Vitals {
    fn from(row: VitalsRow) -> Self {
        Vitals {
            id: row.id,
            patient_id: row.patient_id,
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
            bmi: row.bmi,
            temperature_c: row.temperature_c,
            pulse: row.pulse,
            respiratory_rate: row.respiratory_rate,
            blood_pressure_systolic: row.blood_pressure_systolic,
            blood_pressure_diastolic: row.blood_pressure_diastolic,
            oxygen_saturation: row.oxygen_saturation,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AllergyRow {
    id: Uuid,
    patient_id: Uuid,
    name: String,
    severity: String,
    reaction: String,
    recorded_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<AllergyRow> for Allergy {
    fn from(row: AllergyRow) -> Self {
        Allergy {
            id: row.id,
            patient_id: row.patient_id,
            name: row.name,
            severity: row.severity,
            reaction: row.reaction,
            recorded_at: row.recorded_at,
            updated_at: row.updated_at,
        }
    }
}

/// Shared row shape of conditions and diagnoses
#[derive(Debug, FromRow)]
struct NamedRow {
    id: Uuid,
    patient_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<NamedRow> for Condition {
    fn from(row: NamedRow) -> Self {
        Condition {
            id: row.id,
            patient_id: row.patient_id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<NamedRow> for Diagnosis {
    fn from(row: NamedRow) -> Self {
        Diagnosis {
            id: row.id,
            patient_id: row.patient_id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ============================================================================
// Credentials and sessions
// ============================================================================

#[async_trait]
impl CredentialStore for PgStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord> {
        let sql = format!(
            "INSERT INTO users (id, full_name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.fullname)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("user", e))?;

        row.try_into()
    }

    async fn find_by_email(&self, email: &str) -> Result<UserRecord> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("user", e))?;

        row.ok_or_else(|| CoreError::NotFound("user".to_string()))?
            .try_into()
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create(&self, session: Session) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("session", e))?;

        sqlx::query("INSERT INTO sessions (token_digest, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.token_digest)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("session", e))?;
        Ok(())
    }

    async fn find_active_by_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecord> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.full_name, u.email, u.password_hash, u.role, u.activated, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_digest = $1 AND s.expires_at >= $2
            "#,
        )
        .bind(token_digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("session", e))?;

        row.ok_or_else(|| CoreError::NotFound("session".to_string()))?
            .try_into()
    }

    async fn revoke(&self, token_digest: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
            .bind(token_digest)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("session", e))?;
        Ok(())
    }
}

// ============================================================================
// Patients
// ============================================================================

#[async_trait]
impl PatientStore for PgStore {
    async fn create(&self, patient: Patient) -> Result<Patient> {
        let sql = format!(
            "INSERT INTO patients (id, full_name, gender, date_of_birth, age, contact_number, \
             address, emergency_name, emergency_relation, emergency_phone, registered_by, \
             created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {PATIENT_COLUMNS}"
        );
        let row: PatientRow = sqlx::query_as(&sql)
            .bind(patient.id)
            .bind(&patient.fullname)
            .bind(&patient.gender)
            .bind(patient.dob)
            .bind(patient.age)
            .bind(&patient.contact_number)
            .bind(&patient.address)
            .bind(&patient.emergency_name)
            .bind(&patient.emergency_relation)
            .bind(&patient.emergency_phone)
            .bind(patient.registered_by)
            .bind(patient.created_at)
            .bind(patient.version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("patient", e))?;

        Ok(row.into())
    }

    async fn get(&self, id: Uuid) -> Result<Patient> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("patient", e))?;

        row.map(Patient::from)
            .ok_or_else(|| CoreError::NotFound(format!("patient {id}")))
    }

    async fn list(&self, query: &PatientQuery) -> Result<PatientPage> {
        let pattern = format!("%{}%", escape_like(query.search_term.as_deref().unwrap_or("")));

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM patients WHERE full_name ILIKE $1")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("patient", e))?;

        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, full_name, gender, age, date_of_birth
            FROM patients
            WHERE full_name ILIKE $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(query.page_size)
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("patient", e))?;

        let patients: Vec<PatientSummary> = rows.into_iter().map(PatientSummary::from).collect();
        let meta = PageMeta::new(query, total, patients.len());
        Ok(PatientPage { patients, meta })
    }

    async fn update(&self, id: Uuid, mutations: &MutationSet<Patient>) -> Result<Patient> {
        if mutations.is_noop() {
            return PatientStore::get(self, id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE patients SET ");
        push_assignments(&mut qb, mutations);
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PATIENT_COLUMNS);

        let row: Option<PatientRow> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("patient", e))?;

        row.map(Patient::from)
            .ok_or_else(|| CoreError::NotFound(format!("patient {id}")))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("patient", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("patient {id}")));
        }
        Ok(())
    }
}

// ============================================================================
// Vitals
// ============================================================================

#[async_trait]
impl VitalsStore for PgStore {
    async fn capture(&self, vitals: Vitals) -> Result<Vitals> {
        let sql = format!(
            "INSERT INTO vitals (id, patient_id, height_cm, weight_kg, bmi, temperature_c, pulse, \
             respiratory_rate, blood_pressure_systolic, blood_pressure_diastolic, \
             oxygen_saturation, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {VITALS_COLUMNS}"
        );
        let row: VitalsRow = sqlx::query_as(&sql)
            .bind(vitals.id)
            .bind(vitals.patient_id)
            .bind(vitals.height_cm)
            .bind(vitals.weight_kg)
            .bind(vitals.bmi)
            .bind(vitals.temperature_c)
            .bind(vitals.pulse)
            .bind(vitals.respiratory_rate)
            .bind(vitals.blood_pressure_systolic)
            .bind(vitals.blood_pressure_diastolic)
            .bind(vitals.oxygen_saturation)
            .bind(vitals.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("vitals", e))?;

        Ok(row.into())
    }

    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Option<Vitals>> {
        let sql = format!("SELECT {VITALS_COLUMNS} FROM vitals WHERE patient_id = $1");
        let row: Option<VitalsRow> = sqlx::query_as(&sql)
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("vitals", e))?;

        Ok(row.map(Vitals::from))
    }

    async fn update(&self, patient_id: Uuid, mutations: &MutationSet<Vitals>) -> Result<Vitals> {
        let missing = || CoreError::NotFound(format!("vitals for patient {patient_id}"));
        if mutations.is_noop() {
            return self.find_by_patient(patient_id).await?.ok_or_else(missing);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE vitals SET ");
        push_assignments(&mut qb, mutations);
        qb.push(" WHERE patient_id = ")
            .push_bind(patient_id)
            .push(" RETURNING ")
            .push(VITALS_COLUMNS);

        let row: Option<VitalsRow> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("vitals", e))?;

        row.map(Vitals::from).ok_or_else(missing)
    }

    async fn delete(&self, patient_id: Uuid) -> Result<Uuid> {
        let id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM vitals WHERE patient_id = $1 RETURNING id")
                .bind(patient_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("vitals", e))?;

        id.ok_or_else(|| CoreError::NotFound(format!("vitals for patient {patient_id}")))
    }
}

// ============================================================================
// Allergies, conditions, diagnoses
// ============================================================================

/// Table metadata for one-to-many sub-records
trait PgSubRecord: PatientScoped + Reconcilable {
    const TABLE: &'static str;
    const COLUMNS: &'static str;
    const ORDER_BY: &'static str;
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin + Into<Self>;

    /// `INSERT ... VALUES (...)` without a RETURNING clause
    fn insert_query(&self) -> QueryBuilder<'static, Postgres>;
}

impl PgSubRecord for Allergy {
    const TABLE: &'static str = "allergies";
    const COLUMNS: &'static str = "id, patient_id, name, severity, reaction, recorded_at, updated_at";
    const ORDER_BY: &'static str = "recorded_at";
    type Row = AllergyRow;

    fn insert_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(
            "INSERT INTO allergies (id, patient_id, name, severity, reaction, recorded_at) ",
        );
        qb.push_values([self], |mut row, a| {
            row.push_bind(a.id)
                .push_bind(a.patient_id)
                .push_bind(a.name.clone())
                .push_bind(a.severity.clone())
                .push_bind(a.reaction.clone())
                .push_bind(a.recorded_at);
        });
        qb
    }
}

macro_rules! named_sub_record {
    ($entity:ty, $table:literal) => {
        impl PgSubRecord for $entity {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static str = "id, patient_id, name, created_at, updated_at";
            const ORDER_BY: &'static str = "created_at";
            type Row = NamedRow;

            fn insert_query(&self) -> QueryBuilder<'static, Postgres> {
                let mut qb = QueryBuilder::new(concat!(
                    "INSERT INTO ",
                    $table,
                    " (id, patient_id, name, created_at) "
                ));
                qb.push_values([self], |mut row, r| {
                    row.push_bind(r.id)
                        .push_bind(r.patient_id)
                        .push_bind(r.name.clone())
                        .push_bind(r.created_at);
                });
                qb
            }
        }
    };
}

named_sub_record!(Condition, "conditions");
named_sub_record!(Diagnosis, "diagnoses");

async fn add_sub_record<E: PgSubRecord>(pool: &PgPool, record: &E) -> Result<E> {
    let mut qb = record.insert_query();
    qb.push(" RETURNING ").push(E::COLUMNS);
    let row: E::Row = qb
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(|e| db_error(E::ENTITY, e))?;
    Ok(row.into())
}

async fn list_sub_records<E: PgSubRecord>(pool: &PgPool, patient_id: Uuid) -> Result<Vec<E>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE patient_id = $1 ORDER BY {}",
        E::COLUMNS,
        E::TABLE,
        E::ORDER_BY
    );
    let rows: Vec<E::Row> = sqlx::query_as(&sql)
        .bind(patient_id)
        .fetch_all(pool)
        .await
        .map_err(|e| db_error(E::ENTITY, e))?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn fetch_sub_record<E: PgSubRecord>(pool: &PgPool, patient_id: Uuid, id: Uuid) -> Result<E> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1 AND patient_id = $2",
        E::COLUMNS,
        E::TABLE
    );
    let row: Option<E::Row> = sqlx::query_as(&sql)
        .bind(id)
        .bind(patient_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| db_error(E::ENTITY, e))?;
    row.map(Into::into)
        .ok_or_else(|| CoreError::NotFound(format!("{} {id}", E::ENTITY)))
}

async fn update_sub_record<E: PgSubRecord>(
    pool: &PgPool,
    patient_id: Uuid,
    id: Uuid,
    mutations: &MutationSet<E>,
) -> Result<E> {
    if mutations.is_noop() {
        return fetch_sub_record(pool, patient_id, id).await;
    }

    let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", E::TABLE));
    push_assignments(&mut qb, mutations);
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(" AND patient_id = ")
        .push_bind(patient_id)
        .push(" RETURNING ")
        .push(E::COLUMNS);

    let row: Option<E::Row> = qb
        .build_query_as()
        .fetch_optional(pool)
        .await
        .map_err(|e| db_error(E::ENTITY, e))?;
    row.map(Into::into)
        .ok_or_else(|| CoreError::NotFound(format!("{} {id}", E::ENTITY)))
}

async fn delete_sub_record<E: PgSubRecord>(pool: &PgPool, patient_id: Uuid, id: Uuid) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE id = $1 AND patient_id = $2", E::TABLE);
    let result = sqlx::query(&sql)
        .bind(id)
        .bind(patient_id)
        .execute(pool)
        .await
        .map_err(|e| db_error(E::ENTITY, e))?;

    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound(format!("{} {id}", E::ENTITY)));
    }
    Ok(())
}

macro_rules! pg_sub_record_store {
    ($entity:ty) => {
        #[async_trait]
        impl SubRecordStore<$entity> for PgStore {
            async fn add(&self, record: $entity) -> Result<$entity> {
                add_sub_record(&self.pool, &record).await
            }

            async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<$entity>> {
                list_sub_records(&self.pool, patient_id).await
            }

            async fn update(
                &self,
                patient_id: Uuid,
                id: Uuid,
                mutations: &MutationSet<$entity>,
            ) -> Result<$entity> {
                update_sub_record(&self.pool, patient_id, id, mutations).await
            }

            async fn delete(&self, patient_id: Uuid, id: Uuid) -> Result<()> {
                delete_sub_record::<$entity>(&self.pool, patient_id, id).await
            }
        }
    };
}

pg_sub_record_store!(Allergy);
pg_sub_record_store!(Condition);
pg_sub_record_store!(Diagnosis);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatientUpdate, VitalsUpdate};
    use crate::reconcile::Reconciler;
    use crate::update::UpdateField;

    #[test]
    fn test_patient_update_sql() {
        let update = PatientUpdate {
            fullname: UpdateField::Present("Jane Doe".to_string()),
            age: UpdateField::Present(41),
            ..Default::default()
        };
        let set = Reconciler::default().reconcile::<Patient>(&update).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE patients SET ");
        push_assignments(&mut qb, &set);
        assert_eq!(
            qb.sql(),
            "UPDATE patients SET full_name = $1, age = $2, updated_at = NOW(), version = version + 1"
        );
    }

    #[test]
    fn test_version_only_sql() {
        let set = Reconciler::default()
            .reconcile::<Patient>(&PatientUpdate::default())
            .unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE patients SET ");
        push_assignments(&mut qb, &set);
        assert_eq!(qb.sql(), "UPDATE patients SET version = version + 1");
    }

    #[test]
    fn test_unversioned_sql() {
        let update = VitalsUpdate {
            pulse: UpdateField::Present(80),
            ..Default::default()
        };
        let set = Reconciler::default().reconcile::<Vitals>(&update).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE vitals SET ");
        push_assignments(&mut qb, &set);
        assert_eq!(qb.sql(), "UPDATE vitals SET pulse = $1, updated_at = NOW()");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
