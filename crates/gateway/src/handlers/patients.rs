//! Patient (ficha) handlers
//!
//! Intake takes the patient and the first academic record in one payload and
//! creates both atomically. A RUT that already exists reuses the stored ficha
//! and only opens the new record.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use siget_common::{
    auth::AuthContext,
    db::{
        CurrentPatientRow, NewAcademicRecord, NewPatient, PatientHistory, PatientPatch,
        PatientWithRecord, Repository,
    },
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePatientRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,

    #[validate(length(min = 1, max = 20))]
    pub rut: String,

    pub birth_date: Option<chrono::NaiveDate>,

    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,

    #[validate(email)]
    pub guardian_email: Option<String>,

    /// The first academic record, created in the same transaction
    #[validate(nested)]
    pub record: RecordInput,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordInput {
    #[validate(range(min = 1900, max = 2100))]
    pub year: i32,

    #[validate(length(min = 1, max = 100))]
    pub course: String,

    pub diagnosis: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePatientRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,

    #[validate(length(min = 1, max = 20))]
    pub rut: Option<String>,

    pub birth_date: Option<chrono::NaiveDate>,

    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,

    #[validate(email)]
    pub guardian_email: Option<String>,
}

fn check_rut_format(state: &AppState, rut: &str) -> Result<()> {
    if let Some(pattern) = &state.rut_pattern {
        if !pattern.is_match(rut) {
            return Err(AppError::Validation {
                message: "RUT does not match the expected format".into(),
                field: Some("rut".into()),
            });
        }
    }
    Ok(())
}

/// Intake: register a patient (or reuse an existing ficha by RUT) together
/// with their first academic record
pub async fn create_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<PatientWithRecord>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    check_rut_format(&state, &request.rut)?;

    let repo = Repository::new(state.db.clone());
    let created = repo
        .create_patient_with_first_record(
            auth.professional_id,
            NewPatient {
                full_name: request.full_name,
                rut: request.rut,
                birth_date: request.birth_date,
                guardian_name: request.guardian_name,
                guardian_phone: request.guardian_phone,
                guardian_email: request.guardian_email,
            },
            NewAcademicRecord {
                year: request.record.year,
                course: request.record.course,
                diagnosis: request.record.diagnosis,
            },
        )
        .await?;

    tracing::info!(
        patient_id = %created.patient.id,
        record_id = %created.record.id,
        patient_reused = created.patient_reused,
        "Patient intake completed"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// List the requesting professional's current patients, each at the most
/// recent year among that professional's own records
pub async fn list_patients(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<CurrentPatientRow>>> {
    let repo = Repository::new(state.db.clone());
    let patients = repo.list_current_patients(auth.professional_id).await?;
    Ok(Json(patients))
}

/// Full patient view: ficha plus academic history. Visible to the ficha's
/// owner and to any professional holding a record for the patient.
pub async fn get_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<PatientHistory>> {
    let repo = Repository::new(state.db.clone());
    let history = repo.get_patient_history(patient_id).await?;

    let involved = history.patient.professional_id == auth.professional_id
        || history
            .records
            .iter()
            .any(|r| r.professional_id == auth.professional_id);

    if !involved {
        return Err(AppError::Ownership {
            resource_type: "patient".into(),
            id: patient_id.to_string(),
        });
    }

    Ok(Json(history))
}

/// Partial ficha update; only the owner may edit
pub async fn update_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<siget_common::db::models::Patient>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    if let Some(rut) = &request.rut {
        check_rut_format(&state, rut)?;
    }

    let repo = Repository::new(state.db.clone());
    let patient = repo
        .update_patient(
            patient_id,
            auth.professional_id,
            PatientPatch {
                full_name: request.full_name,
                rut: request.rut,
                birth_date: request.birth_date,
                guardian_name: request.guardian_name,
                guardian_phone: request.guardian_phone,
                guardian_email: request.guardian_email,
            },
        )
        .await?;

    Ok(Json(patient))
}

/// Delete a ficha and everything under it (records, sessions, activities)
pub async fn delete_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    repo.delete_patient(patient_id, auth.professional_id)
        .await?;

    tracing::info!(patient_id = %patient_id, "Patient deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreatePatientRequest {
        CreatePatientRequest {
            full_name: "Martina Rojas".into(),
            rut: "21.605.333-4".into(),
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            guardian_email: None,
            record: RecordInput {
                year: 2025,
                course: "3B".into(),
                diagnosis: None,
            },
        }
    }

    #[test]
    fn test_intake_payload_valid() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_intake_rejects_implausible_year() {
        let mut request = valid_request();
        request.record.year = 215;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_intake_rejects_empty_course() {
        let mut request = valid_request();
        request.record.course = String::new();
        assert!(request.validate().is_err());
    }
}
