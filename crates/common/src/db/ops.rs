//! Transactional composite operations
//!
//! The multi-entity writes of the clinical workflow. Each one runs inside a
//! single transaction: either every row lands or none does. Database errors
//! raised mid-transaction are reported as [`AppError::Transaction`] after the
//! rollback; domain errors (conflicts, ownership) pass through unchanged.

use crate::db::models::*;
use crate::db::ownership::{assert_record_owner, assert_session_owner};
use crate::db::repository::{
    self, NewAcademicRecord, NewActivity, NewPatient, NewSession, Repository,
    SessionWithActivities,
};
use crate::errors::{AppError, Result};
use sea_orm::{EntityTrait, TransactionTrait};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of the intake operation. `patient_reused` is true when the RUT
/// matched an existing ficha and only the record was created.
#[derive(Debug, Clone, Serialize)]
pub struct PatientWithRecord {
    pub patient: Patient,
    pub record: AcademicRecord,
    pub patient_reused: bool,
}

fn mid_transaction(err: AppError) -> AppError {
    match err {
        AppError::Database(db) => AppError::Transaction {
            message: db.to_string(),
        },
        other => other,
    }
}

impl Repository {
    /// Intake: find-or-create the patient by RUT, then open an academic
    /// record for the given year.
    ///
    /// A patient whose RUT already exists is reused as-is, regardless of
    /// which professional first registered them. A record for the same
    /// (patient, year) pair is a conflict.
    pub async fn create_patient_with_first_record(
        &self,
        professional_id: Uuid,
        patient: NewPatient,
        record: NewAcademicRecord,
    ) -> Result<PatientWithRecord> {
        if patient.rut.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "rut".into(),
            });
        }
        if patient.full_name.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "full_name".into(),
            });
        }
        validate_record_input(&record)?;

        let txn = self.conn().begin().await?;

        let result = async {
            let (existing, reused) =
                match repository::find_patient_by_rut(&txn, &patient.rut).await? {
                    Some(found) => (found, true),
                    None => (
                        repository::insert_patient(&txn, &patient, professional_id).await?,
                        false,
                    ),
                };

            if let Some(dup) =
                repository::find_record_for_year(&txn, existing.id, record.year).await?
            {
                return Err(AppError::DuplicateRecordYear { year: dup.year });
            }

            let record =
                repository::insert_academic_record(&txn, existing.id, professional_id, &record)
                    .await?;

            Ok(PatientWithRecord {
                patient: existing,
                record,
                patient_reused: reused,
            })
        }
        .await;

        match result {
            Ok(created) => {
                txn.commit()
                    .await
                    .map_err(|e| mid_transaction(AppError::Database(e)))?;
                Ok(created)
            }
            Err(err) => {
                let _ = txn.rollback().await;
                Err(mid_transaction(err))
            }
        }
    }

    /// Open another yearly record for an existing patient
    pub async fn add_academic_record(
        &self,
        patient_id: Uuid,
        professional_id: Uuid,
        record: NewAcademicRecord,
    ) -> Result<AcademicRecord> {
        validate_record_input(&record)?;

        let txn = self.conn().begin().await?;

        let result = async {
            let patient = PatientEntity::find_by_id(patient_id).one(&txn).await?;
            if patient.is_none() {
                return Err(AppError::NotFound {
                    resource_type: "patient".into(),
                    id: patient_id.to_string(),
                });
            }

            if let Some(dup) =
                repository::find_record_for_year(&txn, patient_id, record.year).await?
            {
                return Err(AppError::DuplicateRecordYear { year: dup.year });
            }

            repository::insert_academic_record(&txn, patient_id, professional_id, &record).await
        }
        .await;

        match result {
            Ok(created) => {
                txn.commit()
                    .await
                    .map_err(|e| mid_transaction(AppError::Database(e)))?;
                Ok(created)
            }
            Err(err) => {
                let _ = txn.rollback().await;
                Err(mid_transaction(err))
            }
        }
    }

    /// Register a session together with its activities. A session cannot be
    /// created empty; the activity set is what gives it clinical meaning.
    pub async fn create_session_with_activities(
        &self,
        record_id: Uuid,
        professional_id: Uuid,
        session: NewSession,
        activities: Vec<NewActivity>,
    ) -> Result<SessionWithActivities> {
        assert_record_owner(self.conn(), record_id, professional_id).await?;

        if activities.is_empty() {
            return Err(AppError::Validation {
                message: "a session requires at least one activity".into(),
                field: Some("activities".into()),
            });
        }
        validate_activity_descriptions(&activities)?;

        let txn = self.conn().begin().await?;

        let result = async {
            let session = repository::insert_session(&txn, record_id, &session).await?;
            let activities = repository::insert_activities(&txn, session.id, &activities).await?;
            Ok(SessionWithActivities {
                session,
                activities,
            })
        }
        .await;

        match result {
            Ok(created) => {
                txn.commit()
                    .await
                    .map_err(|e| mid_transaction(AppError::Database(e)))?;
                Ok(created)
            }
            Err(err) => {
                let _ = txn.rollback().await;
                Err(mid_transaction(err))
            }
        }
    }

    /// Update a session and replace its whole activity set. Unlike creation,
    /// an empty set is accepted here: an edit may legitimately clear the
    /// activities.
    pub async fn replace_session_with_activities(
        &self,
        session_id: Uuid,
        professional_id: Uuid,
        session: NewSession,
        activities: Vec<NewActivity>,
    ) -> Result<SessionWithActivities> {
        validate_activity_descriptions(&activities)?;

        let txn = self.conn().begin().await?;

        let result = async {
            // Re-checked on the transaction connection so the session cannot
            // change hands between check and write
            assert_session_owner(&txn, session_id, professional_id).await?;

            let session = repository::update_session_fields(&txn, session_id, &session).await?;
            repository::delete_activities_for_session(&txn, session_id).await?;
            let activities = repository::insert_activities(&txn, session_id, &activities).await?;

            Ok(SessionWithActivities {
                session,
                activities,
            })
        }
        .await;

        match result {
            Ok(updated) => {
                txn.commit()
                    .await
                    .map_err(|e| mid_transaction(AppError::Database(e)))?;
                Ok(updated)
            }
            Err(err) => {
                let _ = txn.rollback().await;
                Err(mid_transaction(err))
            }
        }
    }
}

fn validate_record_input(record: &NewAcademicRecord) -> Result<()> {
    if record.course.trim().is_empty() {
        return Err(AppError::MissingField {
            field: "course".into(),
        });
    }
    Ok(())
}

fn validate_activity_descriptions(activities: &[NewActivity]) -> Result<()> {
    for activity in activities {
        if activity.description.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "description".into(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    fn repo(db: sea_orm::DatabaseConnection) -> Repository {
        Repository::new(DbPool::from_connection(db))
    }

    fn patient(professional_id: Uuid) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            full_name: "Martina Rojas".into(),
            rut: "21.605.333-4".into(),
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            guardian_email: None,
            professional_id,
            created_at: Utc::now().into(),
        }
    }

    fn record(patient_id: Uuid, professional_id: Uuid, year: i32) -> AcademicRecord {
        AcademicRecord {
            id: Uuid::new_v4(),
            patient_id,
            professional_id,
            year,
            course: "3B".into(),
            diagnosis: None,
            created_at: Utc::now().into(),
        }
    }

    fn session(record_id: Uuid) -> Session {
        Session {
            id: Uuid::new_v4(),
            record_id,
            session_date: Utc::now().into(),
            notes: None,
            created_at: Utc::now().into(),
        }
    }

    fn new_patient(rut: &str) -> NewPatient {
        NewPatient {
            full_name: "Martina Rojas".into(),
            rut: rut.into(),
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            guardian_email: None,
        }
    }

    fn new_record(year: i32) -> NewAcademicRecord {
        NewAcademicRecord {
            year,
            course: "3B".into(),
            diagnosis: None,
        }
    }

    fn new_session() -> NewSession {
        NewSession {
            session_date: Utc::now().into(),
            notes: Some("worked on phonemes".into()),
        }
    }

    #[tokio::test]
    async fn test_intake_reuses_patient_matched_by_rut() {
        let professional = Uuid::new_v4();
        let other_professional = Uuid::new_v4();
        let existing = patient(other_professional);
        let created = record(existing.id, professional, 2025);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]]) // find by rut
            .append_query_results([Vec::<AcademicRecord>::new()]) // year pre-check
            .append_query_results([vec![created.clone()]]) // record insert
            .into_connection();

        let out = repo(db)
            .create_patient_with_first_record(
                professional,
                new_patient(&existing.rut),
                new_record(2025),
            )
            .await
            .unwrap();

        assert!(out.patient_reused);
        assert_eq!(out.patient.id, existing.id);
        // The ficha is shared; the first registrant stays its owner
        assert_eq!(out.patient.professional_id, other_professional);
        assert_eq!(out.record.year, 2025);
    }

    #[tokio::test]
    async fn test_intake_rejects_duplicate_year() {
        let professional = Uuid::new_v4();
        let existing = patient(professional);
        let clash = record(existing.id, professional, 2025);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![clash]])
            .into_connection();

        let err = repo(db)
            .create_patient_with_first_record(
                professional,
                new_patient(&existing.rut),
                new_record(2025),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateRecordYear { year: 2025 }));
    }

    #[tokio::test]
    async fn test_intake_rejects_blank_rut_before_touching_db() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = repo(db)
            .create_patient_with_first_record(Uuid::new_v4(), new_patient("  "), new_record(2025))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_intake_rejects_blank_course_before_touching_db() {
        // No mock results appended: the check must fire before any query
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let mut record = new_record(2025);
        record.course = "   ".into();

        let err = repo(db)
            .create_patient_with_first_record(
                Uuid::new_v4(),
                new_patient("21.605.333-4"),
                record,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MissingField { ref field } if field == "course"));
    }

    #[tokio::test]
    async fn test_add_record_rejects_blank_course() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let mut record = new_record(2026);
        record.course = String::new();

        let err = repo(db)
            .add_academic_record(Uuid::new_v4(), Uuid::new_v4(), record)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MissingField { ref field } if field == "course"));
    }

    #[test]
    fn test_mid_transaction_translation() {
        // Database failures (including commit failures, which take this same
        // path) become Transaction; domain errors pass through untouched
        let translated = mid_transaction(AppError::Database(DbErr::Custom("boom".into())));
        assert!(matches!(translated, AppError::Transaction { .. }));

        let conflict = mid_transaction(AppError::DuplicateRecordYear { year: 2025 });
        assert!(matches!(
            conflict,
            AppError::DuplicateRecordYear { year: 2025 }
        ));

        let owned = mid_transaction(AppError::Ownership {
            resource_type: "session".into(),
            id: "x".into(),
        });
        assert!(matches!(owned, AppError::Ownership { .. }));
    }

    #[tokio::test]
    async fn test_session_creation_requires_an_activity() {
        let professional = Uuid::new_v4();
        let rec = record(Uuid::new_v4(), professional, 2025);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![rec.clone()]]) // ownership check
            .into_connection();

        let err = repo(db)
            .create_session_with_activities(rec.id, professional, new_session(), vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_session_creation_checks_record_ownership() {
        let rec = record(Uuid::new_v4(), Uuid::new_v4(), 2025);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![rec.clone()]])
            .into_connection();

        let err = repo(db)
            .create_session_with_activities(
                rec.id,
                Uuid::new_v4(), // not the record's author
                new_session(),
                vec![NewActivity {
                    description: "memory cards".into(),
                    rating: 4,
                }],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Ownership { .. }));
    }

    #[tokio::test]
    async fn test_session_creation_rolls_back_as_transaction_error() {
        let professional = Uuid::new_v4();
        let rec = record(Uuid::new_v4(), professional, 2025);
        let sess = session(rec.id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![rec.clone()]]) // ownership check
            .append_query_results([vec![sess]]) // session insert
            .append_query_errors([DbErr::Custom("check constraint violated".into())])
            .into_connection();

        let err = repo(db)
            .create_session_with_activities(
                rec.id,
                professional,
                new_session(),
                vec![NewActivity {
                    description: "memory cards".into(),
                    rating: 9,
                }],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transaction { .. }));
    }

    #[tokio::test]
    async fn test_replace_accepts_empty_activity_set() {
        let professional = Uuid::new_v4();
        let rec = record(Uuid::new_v4(), professional, 2025);
        let sess = session(rec.id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![(sess.clone(), rec.clone())]]) // owner join
            .append_query_results([vec![sess.clone()]]) // session update
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }]) // old activities cleared
            .into_connection();

        let out = repo(db)
            .replace_session_with_activities(sess.id, professional, new_session(), vec![])
            .await
            .unwrap();

        assert!(out.activities.is_empty());
        assert_eq!(out.session.id, sess.id);
    }

    #[tokio::test]
    async fn test_replace_rejects_foreign_session() {
        let rec = record(Uuid::new_v4(), Uuid::new_v4(), 2025);
        let sess = session(rec.id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![(sess.clone(), rec)]])
            .into_connection();

        let err = repo(db)
            .replace_session_with_activities(sess.id, Uuid::new_v4(), new_session(), vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Ownership { .. }));
    }
}
