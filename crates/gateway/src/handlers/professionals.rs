//! Professional profile handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::handlers::auth::ProfessionalResponse;
use crate::AppState;
use siget_common::{
    auth::AuthContext,
    db::{ProfessionalPatch, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    pub specialty: Option<String>,
}

/// Current professional's profile
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProfessionalResponse>> {
    let repo = Repository::new(state.db.clone());

    let professional = repo
        .find_professional_by_id(auth.professional_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource_type: "professional".into(),
            id: auth.professional_id.to_string(),
        })?;

    Ok(Json(professional.into()))
}

/// Partial profile update; omitted fields keep their stored values
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfessionalResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let professional = repo
        .update_professional_profile(
            auth.professional_id,
            ProfessionalPatch {
                full_name: request.full_name,
                email: request.email,
                specialty: request.specialty,
            },
        )
        .await?;

    tracing::info!(professional_id = %professional.id, "Profile updated");

    Ok(Json(professional.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_pass_validation() {
        let request = UpdateProfileRequest {
            full_name: None,
            email: None,
            specialty: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_present_email_is_still_checked() {
        let request = UpdateProfileRequest {
            full_name: None,
            email: Some("broken".into()),
            specialty: None,
        };
        assert!(request.validate().is_err());
    }
}
