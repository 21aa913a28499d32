//! Academic record handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::patients::RecordInput;
use crate::AppState;
use siget_common::{
    auth::AuthContext,
    db::{models::AcademicRecord, NewAcademicRecord, RecordPatch, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecordRequest {
    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,

    #[validate(length(min = 1, max = 100))]
    pub course: Option<String>,

    pub diagnosis: Option<String>,
}

/// Open another yearly record for an existing patient. One record per
/// patient per year; a clash is a conflict.
pub async fn add_record(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<RecordInput>,
) -> Result<(StatusCode, Json<AcademicRecord>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let record = repo
        .add_academic_record(
            patient_id,
            auth.professional_id,
            NewAcademicRecord {
                year: request.year,
                course: request.course,
                diagnosis: request.diagnosis,
            },
        )
        .await?;

    tracing::info!(record_id = %record.id, patient_id = %patient_id, "Academic record opened");

    Ok((StatusCode::CREATED, Json(record)))
}

/// Partial record update; only the authoring professional may edit
pub async fn update_record(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(record_id): Path<Uuid>,
    Json(request): Json<UpdateRecordRequest>,
) -> Result<Json<AcademicRecord>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let record = repo
        .update_academic_record(
            record_id,
            auth.professional_id,
            RecordPatch {
                year: request.year,
                course: request.course,
                diagnosis: request.diagnosis,
            },
        )
        .await?;

    Ok(Json(record))
}

/// Delete a record and its sessions and activities
pub async fn delete_record(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(record_id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    repo.delete_academic_record(record_id, auth.professional_id)
        .await?;

    tracing::info!(record_id = %record_id, "Academic record deleted");

    Ok(StatusCode::NO_CONTENT)
}
