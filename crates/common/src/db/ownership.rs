//! Ownership authorization helpers
//!
//! Every record- and session-scoped operation must prove that the resource
//! belongs to the requesting professional. Failures come back as
//! [`AppError::Ownership`], which renders externally as a 404 so callers
//! cannot probe which ids exist.

use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

/// Verify that `record_id` exists and was authored by `professional_id`,
/// returning the record.
pub async fn assert_record_owner<C: ConnectionTrait>(
    conn: &C,
    record_id: Uuid,
    professional_id: Uuid,
) -> Result<AcademicRecord> {
    let record = AcademicRecordEntity::find_by_id(record_id).one(conn).await?;

    match record {
        Some(record) if record.professional_id == professional_id => Ok(record),
        _ => Err(AppError::Ownership {
            resource_type: "academic record".into(),
            id: record_id.to_string(),
        }),
    }
}

/// Verify that `session_id` exists and its parent record was authored by
/// `professional_id`. Sessions carry no owner column; ownership is derived
/// through the record join.
pub async fn assert_session_owner<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    professional_id: Uuid,
) -> Result<Session> {
    let found = SessionEntity::find_by_id(session_id)
        .find_also_related(AcademicRecordEntity)
        .one(conn)
        .await?;

    match found {
        Some((session, Some(record))) if record.professional_id == professional_id => Ok(session),
        _ => Err(AppError::Ownership {
            resource_type: "session".into(),
            id: session_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn record(professional_id: Uuid) -> AcademicRecord {
        AcademicRecord {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            professional_id,
            year: 2024,
            course: "3B".into(),
            diagnosis: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_record_owner_accepted() {
        let owner = Uuid::new_v4();
        let rec = record(owner);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![rec.clone()]])
            .into_connection();

        let found = assert_record_owner(&db, rec.id, owner).await.unwrap();
        assert_eq!(found.id, rec.id);
    }

    #[tokio::test]
    async fn test_record_of_other_professional_rejected() {
        let rec = record(Uuid::new_v4());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![rec.clone()]])
            .into_connection();

        let err = assert_record_owner(&db, rec.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Ownership { .. }));
    }

    #[tokio::test]
    async fn test_missing_record_rejected_identically() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<AcademicRecord>::new()])
            .into_connection();

        let err = assert_record_owner(&db, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        // Same variant as the wrong-owner case, so the two are
        // indistinguishable to the caller
        assert!(matches!(err, AppError::Ownership { .. }));
    }
}
