// src/models/jurisdiction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    pub id: Uuid,
    #[schema(example = "ar-santa-fe-rosario")]
    pub code: String,
    #[schema(example = "Rosario, Santa Fe, AR")]
    pub name: String,
    #[schema(example = "AR")]
    pub country: String,
    #[schema(example = "Santa Fe")]
    pub province: String,
    #[schema(example = "Rosario")]
    pub city: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `pais-provincia-cidade`: segmentos minúsculos [a-z0-9] separados por hífen,
/// no mínimo três.
pub fn validate_jurisdiction_code(code: &str) -> Result<(), ValidationError> {
    let segments: Vec<&str> = code.split('-').collect();
    let well_formed = segments.len() >= 3
        && segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        });

    if well_formed {
        Ok(())
    } else {
        let mut err = ValidationError::new("jurisdiction_code");
        err.message = Some("El código debe tener el formato pais-provincia-ciudad.".into());
        Err(err)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJurisdictionPayload {
    #[validate(custom(function = "validate_jurisdiction_code"))]
    #[schema(example = "ar-santa-fe-rosario")]
    pub code: String,
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio."))]
    pub name: String,
    #[validate(length(min = 2, max = 2, message = "El país debe ser un código de 2 letras."))]
    pub country: String,
    #[validate(length(min = 1, message = "La provincia es obligatoria."))]
    pub province: String,
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJurisdictionPayload {
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio."))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 2, message = "El país debe ser un código de 2 letras."))]
    pub country: Option<String>,
    #[validate(length(min = 1, message = "La provincia es obligatoria."))]
    pub province: Option<String>,
    pub city: Option<String>,
    pub is_active: Option<bool>,
}
