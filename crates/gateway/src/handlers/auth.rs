//! Authentication handlers
//!
//! Registration and login for professionals. Login failures are always
//! reported as the same invalid-credentials error, whether the email is
//! unknown or the password wrong.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use siget_common::{
    auth::{hash_password, verify_password},
    db::{models::Professional, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    pub specialty: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct ProfessionalResponse {
    pub id: uuid::Uuid,
    pub full_name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub created_at: String,
}

impl From<Professional> for ProfessionalResponse {
    fn from(p: Professional) -> Self {
        Self {
            id: p.id,
            full_name: p.full_name,
            email: p.email,
            specialty: p.specialty,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub professional: ProfessionalResponse,
}

/// Register a new professional and hand back a fresh token
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let password_hash = hash_password(&request.password)?;

    let repo = Repository::new(state.db.clone());
    let professional = repo
        .create_professional(
            request.full_name,
            request.email,
            password_hash,
            request.specialty,
        )
        .await?;

    let token = state.jwt.generate_token(
        professional.id,
        &professional.email,
        &professional.full_name,
    )?;

    tracing::info!(professional_id = %professional.id, "Professional registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            professional: professional.into(),
        }),
    ))
}

/// Exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let professional = repo
        .find_professional_by_email(&request.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&request.password, &professional.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.generate_token(
        professional.id,
        &professional.email,
        &professional.full_name,
    )?;

    tracing::info!(professional_id = %professional.id, "Professional logged in");

    Ok(Json(AuthResponse {
        token,
        professional: professional.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_rejects_short_password() {
        let request = RegisterRequest {
            full_name: "Ana Pérez".into(),
            email: "ana@example.cl".into(),
            password: "short".into(),
            specialty: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_rejects_bad_email() {
        let request = RegisterRequest {
            full_name: "Ana Pérez".into(),
            email: "not-an-email".into(),
            password: "correct-horse".into(),
            specialty: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_accepts_valid_input() {
        let request = RegisterRequest {
            full_name: "Ana Pérez".into(),
            email: "ana@example.cl".into(),
            password: "correct-horse".into(),
            specialty: Some("Psicopedagogía".into()),
        };
        assert!(request.validate().is_ok());
    }
}
