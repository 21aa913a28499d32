//! Repository pattern for database operations
//!
//! CRUD primitives for the SIGET entity hierarchy. Mutations that require
//! ownership bake the owner filter into the statement's WHERE clause, so a
//! zero-row result is deliberately ambiguous between "not found" and "not
//! yours". Helpers that composite operations must run inside a transaction
//! are generic over [`ConnectionTrait`].

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, Set, Statement,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Fields for a new patient (the "ficha")
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub full_name: String,
    pub rut: String,
    pub birth_date: Option<chrono::NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
}

/// Partial patient update; unset fields are preserved
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientPatch {
    pub full_name: Option<String>,
    pub rut: Option<String>,
    pub birth_date: Option<chrono::NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
}

/// Fields for a new academic record
#[derive(Debug, Clone, Deserialize)]
pub struct NewAcademicRecord {
    pub year: i32,
    pub course: String,
    pub diagnosis: Option<String>,
}

/// Partial academic record update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
    pub year: Option<i32>,
    pub course: Option<String>,
    pub diagnosis: Option<String>,
}

/// Partial professional profile update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfessionalPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
}

/// Fields for a new or replaced session
#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    pub session_date: chrono::DateTime<chrono::FixedOffset>,
    pub notes: Option<String>,
}

/// One activity within a session payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub description: String,
    pub rating: i32,
}

/// A session together with its activities
#[derive(Debug, Clone, Serialize)]
pub struct SessionWithActivities {
    #[serde(flatten)]
    pub session: Session,
    pub activities: Vec<Activity>,
}

/// Row of the current-patients listing: each patient the professional has
/// records for, shown at the most recent of that professional's own records
#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct CurrentPatientRow {
    pub id: Uuid,
    pub full_name: String,
    pub rut: String,
    pub course: String,
    pub year: i32,
}

/// Full patient view: the ficha plus the academic history (year descending)
#[derive(Debug, Clone, Serialize)]
pub struct PatientHistory {
    pub patient: Patient,
    pub records: Vec<AcademicRecord>,
}

#[derive(Debug, FromQueryResult)]
struct SessionReportRow {
    id: Uuid,
    session_date: chrono::DateTime<chrono::FixedOffset>,
    notes: Option<String>,
    patient_name: String,
    patient_rut: String,
    professional_name: String,
}

/// Data backing the single-session PDF report
#[derive(Debug, Clone, Serialize)]
pub struct SessionReportData {
    pub session_id: Uuid,
    pub session_date: chrono::DateTime<chrono::FixedOffset>,
    pub notes: Option<String>,
    pub patient_name: String,
    pub patient_rut: String,
    pub professional_name: String,
    pub activities: Vec<Activity>,
}

#[derive(Debug, FromQueryResult)]
struct RecordReportRow {
    id: Uuid,
    year: i32,
    course: String,
    diagnosis: Option<String>,
    patient_name: String,
    patient_rut: String,
    professional_name: String,
}

/// Data backing the consolidated record PDF report.
/// Sessions are ordered ascending by date (chronological reading order),
/// unlike the descending list view.
#[derive(Debug, Clone, Serialize)]
pub struct RecordReportData {
    pub record_id: Uuid,
    pub year: i32,
    pub course: String,
    pub diagnosis: Option<String>,
    pub patient_name: String,
    pub patient_rut: String,
    pub professional_name: String,
    pub sessions: Vec<SessionWithActivities>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Professional Operations
    // ========================================================================

    /// Register a new professional
    pub async fn create_professional(
        &self,
        full_name: String,
        email: String,
        password_hash: String,
        specialty: Option<String>,
    ) -> Result<Professional> {
        let professional = ProfessionalActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(full_name),
            email: Set(email),
            password_hash: Set(password_hash),
            specialty: Set(specialty),
            created_at: Set(Utc::now().into()),
        };

        professional
            .insert(self.conn())
            .await
            .map_err(|e| AppError::from_db_err(e, AppError::DuplicateEmail))
    }

    /// Find professional by email (login lookup)
    pub async fn find_professional_by_email(&self, email: &str) -> Result<Option<Professional>> {
        ProfessionalEntity::find()
            .filter(ProfessionalColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find professional by ID
    pub async fn find_professional_by_id(&self, id: Uuid) -> Result<Option<Professional>> {
        ProfessionalEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Partial profile update; unset fields keep their stored values
    pub async fn update_professional_profile(
        &self,
        id: Uuid,
        patch: ProfessionalPatch,
    ) -> Result<Professional> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE professionals SET
                full_name = COALESCE($1, full_name),
                email = COALESCE($2, email),
                specialty = COALESCE($3, specialty)
            WHERE id = $4
            RETURNING *
            "#,
            vec![
                patch.full_name.into(),
                patch.email.into(),
                patch.specialty.into(),
                id.into(),
            ],
        );

        ProfessionalEntity::find()
            .from_raw_sql(stmt)
            .one(self.conn())
            .await
            .map_err(|e| AppError::from_db_err(e, AppError::DuplicateEmail))?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "professional".into(),
                id: id.to_string(),
            })
    }

    // ========================================================================
    // Patient Operations
    // ========================================================================

    /// List the requesting professional's current patients: one row per
    /// patient, at the latest year among that professional's own records
    pub async fn list_current_patients(
        &self,
        professional_id: Uuid,
    ) -> Result<Vec<CurrentPatientRow>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT DISTINCT ON (p.id)
                p.id,
                p.full_name,
                p.rut,
                ra.course,
                ra.year
            FROM patients p
            JOIN academic_records ra ON p.id = ra.patient_id
            WHERE ra.professional_id = $1
            ORDER BY p.id, ra.year DESC
            "#,
            vec![professional_id.into()],
        );

        CurrentPatientRow::find_by_statement(stmt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Full patient view: ficha plus academic history, newest year first
    pub async fn get_patient_history(&self, patient_id: Uuid) -> Result<PatientHistory> {
        let patient = PatientEntity::find_by_id(patient_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "patient".into(),
                id: patient_id.to_string(),
            })?;

        let records = AcademicRecordEntity::find()
            .filter(AcademicRecordColumn::PatientId.eq(patient_id))
            .order_by_desc(AcademicRecordColumn::Year)
            .all(self.conn())
            .await?;

        Ok(PatientHistory { patient, records })
    }

    /// Partial patient update with the owner filter baked into the WHERE.
    /// Zero matched rows is reported as NotFound whether the row is absent
    /// or owned by someone else.
    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        professional_id: Uuid,
        patch: PatientPatch,
    ) -> Result<Patient> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE patients SET
                full_name = COALESCE($1, full_name),
                rut = COALESCE($2, rut),
                birth_date = COALESCE($3, birth_date),
                guardian_name = COALESCE($4, guardian_name),
                guardian_phone = COALESCE($5, guardian_phone),
                guardian_email = COALESCE($6, guardian_email)
            WHERE id = $7 AND professional_id = $8
            RETURNING *
            "#,
            vec![
                patch.full_name.into(),
                patch.rut.into(),
                patch.birth_date.into(),
                patch.guardian_name.into(),
                patch.guardian_phone.into(),
                patch.guardian_email.into(),
                patient_id.into(),
                professional_id.into(),
            ],
        );

        PatientEntity::find()
            .from_raw_sql(stmt)
            .one(self.conn())
            .await
            .map_err(|e| AppError::from_db_err(e, AppError::DuplicateRut))?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "patient".into(),
                id: patient_id.to_string(),
            })
    }

    /// Delete a patient and, through the cascade, all of their records,
    /// sessions and activities. Only the ficha's owner may delete it.
    pub async fn delete_patient(&self, patient_id: Uuid, professional_id: Uuid) -> Result<Patient> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM patients WHERE id = $1 AND professional_id = $2 RETURNING *",
            vec![patient_id.into(), professional_id.into()],
        );

        PatientEntity::find()
            .from_raw_sql(stmt)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "patient".into(),
                id: patient_id.to_string(),
            })
    }

    // ========================================================================
    // Academic Record Operations
    // ========================================================================

    /// Partial record update, owner-filtered
    pub async fn update_academic_record(
        &self,
        record_id: Uuid,
        professional_id: Uuid,
        patch: RecordPatch,
    ) -> Result<AcademicRecord> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE academic_records SET
                year = COALESCE($1, year),
                course = COALESCE($2, course),
                diagnosis = COALESCE($3, diagnosis)
            WHERE id = $4 AND professional_id = $5
            RETURNING *
            "#,
            vec![
                patch.year.into(),
                patch.course.into(),
                patch.diagnosis.into(),
                record_id.into(),
                professional_id.into(),
            ],
        );

        AcademicRecordEntity::find()
            .from_raw_sql(stmt)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::Ownership {
                resource_type: "academic record".into(),
                id: record_id.to_string(),
            })
    }

    /// Delete a record (and cascading sessions/activities), owner-filtered
    pub async fn delete_academic_record(
        &self,
        record_id: Uuid,
        professional_id: Uuid,
    ) -> Result<AcademicRecord> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM academic_records WHERE id = $1 AND professional_id = $2 RETURNING *",
            vec![record_id.into(), professional_id.into()],
        );

        AcademicRecordEntity::find()
            .from_raw_sql(stmt)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::Ownership {
                resource_type: "academic record".into(),
                id: record_id.to_string(),
            })
    }

    // ========================================================================
    // Session Operations
    // ========================================================================

    /// All sessions of a record with their activities, newest session first
    /// (list-view ordering)
    pub async fn list_sessions_for_record(
        &self,
        record_id: Uuid,
        professional_id: Uuid,
    ) -> Result<Vec<SessionWithActivities>> {
        super::ownership::assert_record_owner(self.conn(), record_id, professional_id).await?;

        let sessions = SessionEntity::find()
            .filter(SessionColumn::RecordId.eq(record_id))
            .order_by_desc(SessionColumn::SessionDate)
            .all(self.conn())
            .await?;

        self.attach_activities(sessions).await
    }

    /// Delete a session and its activities. Ownership is verified inside the
    /// DELETE itself via an EXISTS join to the record's author.
    pub async fn delete_session(&self, session_id: Uuid, professional_id: Uuid) -> Result<Session> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            DELETE FROM sessions s
            WHERE s.id = $1 AND EXISTS (
                SELECT 1 FROM academic_records ra
                WHERE ra.id = s.record_id AND ra.professional_id = $2
            )
            RETURNING *
            "#,
            vec![session_id.into(), professional_id.into()],
        );

        SessionEntity::find()
            .from_raw_sql(stmt)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::Ownership {
                resource_type: "session".into(),
                id: session_id.to_string(),
            })
    }

    // ========================================================================
    // Report Reads (PDF export)
    // ========================================================================

    /// Composite read for the single-session report
    pub async fn get_session_report(
        &self,
        session_id: Uuid,
        professional_id: Uuid,
    ) -> Result<SessionReportData> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT s.id, s.session_date, s.notes,
                   p.full_name AS patient_name, p.rut AS patient_rut,
                   pr.full_name AS professional_name
            FROM sessions s
            JOIN academic_records ra ON s.record_id = ra.id
            JOIN patients p ON ra.patient_id = p.id
            JOIN professionals pr ON ra.professional_id = pr.id
            WHERE s.id = $1 AND ra.professional_id = $2
            "#,
            vec![session_id.into(), professional_id.into()],
        );

        let row = SessionReportRow::find_by_statement(stmt)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::Ownership {
                resource_type: "session".into(),
                id: session_id.to_string(),
            })?;

        let activities = ActivityEntity::find()
            .filter(ActivityColumn::SessionId.eq(session_id))
            .order_by_asc(ActivityColumn::Id)
            .all(self.conn())
            .await?;

        Ok(SessionReportData {
            session_id: row.id,
            session_date: row.session_date,
            notes: row.notes,
            patient_name: row.patient_name,
            patient_rut: row.patient_rut,
            professional_name: row.professional_name,
            activities,
        })
    }

    /// Composite read for the consolidated record report; sessions ascending
    /// by date for chronological reading
    pub async fn get_record_report(
        &self,
        record_id: Uuid,
        professional_id: Uuid,
    ) -> Result<RecordReportData> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT ra.id, ra.year, ra.course, ra.diagnosis,
                   p.full_name AS patient_name, p.rut AS patient_rut,
                   pr.full_name AS professional_name
            FROM academic_records ra
            JOIN patients p ON ra.patient_id = p.id
            JOIN professionals pr ON ra.professional_id = pr.id
            WHERE ra.id = $1 AND ra.professional_id = $2
            "#,
            vec![record_id.into(), professional_id.into()],
        );

        let row = RecordReportRow::find_by_statement(stmt)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::Ownership {
                resource_type: "academic record".into(),
                id: record_id.to_string(),
            })?;

        let sessions = SessionEntity::find()
            .filter(SessionColumn::RecordId.eq(record_id))
            .order_by_asc(SessionColumn::SessionDate)
            .all(self.conn())
            .await?;

        let sessions = self.attach_activities(sessions).await?;

        Ok(RecordReportData {
            record_id: row.id,
            year: row.year,
            course: row.course,
            diagnosis: row.diagnosis,
            patient_name: row.patient_name,
            patient_rut: row.patient_rut,
            professional_name: row.professional_name,
            sessions,
        })
    }

    /// Load activities for a batch of sessions, preserving session order
    async fn attach_activities(
        &self,
        sessions: Vec<Session>,
    ) -> Result<Vec<SessionWithActivities>> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        // Ordered by id so list views and reports render the same activity
        // order on every read
        let activities = ActivityEntity::find()
            .filter(ActivityColumn::SessionId.is_in(ids))
            .order_by_asc(ActivityColumn::Id)
            .all(self.conn())
            .await?;

        let mut by_session: HashMap<Uuid, Vec<Activity>> = HashMap::new();
        for activity in activities {
            by_session
                .entry(activity.session_id)
                .or_default()
                .push(activity);
        }

        Ok(sessions
            .into_iter()
            .map(|session| {
                let activities = by_session.remove(&session.id).unwrap_or_default();
                SessionWithActivities {
                    session,
                    activities,
                }
            })
            .collect())
    }
}

// ============================================================================
// Transaction-scoped primitives (used by composite operations)
// ============================================================================

/// Lookup used for idempotent patient creation
pub(crate) async fn find_patient_by_rut<C: ConnectionTrait>(
    conn: &C,
    rut: &str,
) -> Result<Option<Patient>> {
    PatientEntity::find()
        .filter(PatientColumn::Rut.eq(rut))
        .one(conn)
        .await
        .map_err(Into::into)
}

pub(crate) async fn insert_patient<C: ConnectionTrait>(
    conn: &C,
    input: &NewPatient,
    professional_id: Uuid,
) -> Result<Patient> {
    let patient = PatientActiveModel {
        id: Set(Uuid::new_v4()),
        full_name: Set(input.full_name.clone()),
        rut: Set(input.rut.clone()),
        birth_date: Set(input.birth_date),
        guardian_name: Set(input.guardian_name.clone()),
        guardian_phone: Set(input.guardian_phone.clone()),
        guardian_email: Set(input.guardian_email.clone()),
        professional_id: Set(professional_id),
        created_at: Set(Utc::now().into()),
    };

    patient
        .insert(conn)
        .await
        .map_err(|e| AppError::from_db_err(e, AppError::DuplicateRut))
}

/// The duplicate-year pre-check. Must run on the same connection as the
/// subsequent insert to close the check-then-insert race window.
pub(crate) async fn find_record_for_year<C: ConnectionTrait>(
    conn: &C,
    patient_id: Uuid,
    year: i32,
) -> Result<Option<AcademicRecord>> {
    AcademicRecordEntity::find()
        .filter(AcademicRecordColumn::PatientId.eq(patient_id))
        .filter(AcademicRecordColumn::Year.eq(year))
        .one(conn)
        .await
        .map_err(Into::into)
}

pub(crate) async fn insert_academic_record<C: ConnectionTrait>(
    conn: &C,
    patient_id: Uuid,
    professional_id: Uuid,
    input: &NewAcademicRecord,
) -> Result<AcademicRecord> {
    let record = AcademicRecordActiveModel {
        id: Set(Uuid::new_v4()),
        patient_id: Set(patient_id),
        professional_id: Set(professional_id),
        year: Set(input.year),
        course: Set(input.course.clone()),
        diagnosis: Set(input.diagnosis.clone()),
        created_at: Set(Utc::now().into()),
    };

    record.insert(conn).await.map_err(Into::into)
}

pub(crate) async fn insert_session<C: ConnectionTrait>(
    conn: &C,
    record_id: Uuid,
    input: &NewSession,
) -> Result<Session> {
    let session = SessionActiveModel {
        id: Set(Uuid::new_v4()),
        record_id: Set(record_id),
        session_date: Set(input.session_date),
        notes: Set(input.notes.clone()),
        created_at: Set(Utc::now().into()),
    };

    session.insert(conn).await.map_err(Into::into)
}

pub(crate) async fn update_session_fields<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    input: &NewSession,
) -> Result<Session> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "UPDATE sessions SET session_date = $1, notes = $2 WHERE id = $3 RETURNING *",
        vec![
            input.session_date.into(),
            input.notes.clone().into(),
            session_id.into(),
        ],
    );

    SessionEntity::find()
        .from_raw_sql(stmt)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource_type: "session".into(),
            id: session_id.to_string(),
        })
}

/// Bulk-insert activities bound to a session. Rating bounds are enforced by
/// the store's CHECK constraint; a violation fails the enclosing transaction.
pub(crate) async fn insert_activities<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    activities: &[NewActivity],
) -> Result<Vec<Activity>> {
    let mut inserted = Vec::with_capacity(activities.len());

    for activity in activities {
        let model = ActivityActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            description: Set(activity.description.clone()),
            rating: Set(activity.rating),
        };
        inserted.push(model.insert(conn).await?);
    }

    Ok(inserted)
}

pub(crate) async fn delete_activities_for_session<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
) -> Result<u64> {
    let result = ActivityEntity::delete_many()
        .filter(ActivityColumn::SessionId.eq(session_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn current_patient_row(name: &str, rut: &str, course: &str, year: i32) -> BTreeMap<&'static str, Value> {
        let mut row = BTreeMap::new();
        row.insert("id", Uuid::new_v4().into());
        row.insert("full_name", name.into());
        row.insert("rut", rut.into());
        row.insert("course", course.into());
        row.insert("year", year.into());
        row
    }

    #[tokio::test]
    async fn test_current_patients_rows_carry_latest_year_view() {
        // Two professionals share a ficha through its records; each listing
        // row surfaces the requester's own most recent record
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                current_patient_row("Martina Rojas", "21.605.333-4", "4A", 2025),
                current_patient_row("Pedro Soto", "22.111.222-3", "2B", 2024),
            ]])
            .into_connection();

        let repo = Repository::new(DbPool::from_connection(db));
        let rows = repo.list_current_patients(Uuid::new_v4()).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].full_name, "Martina Rojas");
        assert_eq!(rows[0].year, 2025);
        assert_eq!(rows[0].course, "4A");
        assert_eq!(rows[1].rut, "22.111.222-3");
    }

    #[tokio::test]
    async fn test_session_listing_orders_sessions_and_activities() {
        let professional = Uuid::new_v4();
        let record = AcademicRecord {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            professional_id: professional,
            year: 2025,
            course: "3B".into(),
            diagnosis: None,
            created_at: Utc::now().into(),
        };
        let session = Session {
            id: Uuid::new_v4(),
            record_id: record.id,
            session_date: Utc::now().into(),
            notes: None,
            created_at: Utc::now().into(),
        };
        let activity = Activity {
            id: Uuid::new_v4(),
            session_id: session.id,
            description: "memory cards".into(),
            rating: 4,
        };

        let pool = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![record.clone()]])
                .append_query_results([vec![session.clone()]])
                .append_query_results([vec![activity]])
                .into_connection(),
        );

        let repo = Repository::new(pool.clone());
        let sessions = repo
            .list_sessions_for_record(record.id, professional)
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].activities.len(), 1);

        // Both orderings must be stated in the SQL: newest session first,
        // activities in stable id order
        drop(repo);
        let log = format!("{:?}", pool.into_inner().into_transaction_log());
        assert!(log.contains(r#"ORDER BY \"sessions\".\"session_date\" DESC"#));
        assert!(log.contains(r#"ORDER BY \"activities\".\"id\" ASC"#));
    }
}
