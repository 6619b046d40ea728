// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

// ---
// 1. Organization (o "tenant")
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plan_tier", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Basic,
    Professional,
    Enterprise,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    #[schema(example = "30712345678")]
    pub cuit: String,
    #[schema(example = "Bar La Esquina SRL")]
    pub name: String,
    pub plan: Plan,
    #[schema(example = 15)]
    pub threshold_yellow_days: i32,
    #[schema(example = 7)]
    pub threshold_red_days: i32,
    /// Meses de retenção de documentos; 0 = guardar para sempre.
    pub retention_months: i32,
    pub jurisdiction_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationWithRole {
    #[serde(flatten)]
    pub organization: Organization,
    pub role: MemberRole,
}

// ---
// 2. Membership (a "ponte" usuário-organização)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Admin,
    Accountant,
    Manager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

// ---
// 3. Location (o "local" físico)
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "Sucursal Centro")]
    pub name: String,
    #[schema(example = "Córdoba 1234, Rosario")]
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 4. Invitation
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invitation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role: MemberRole,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub token_hash: String,
    pub invited_by: Uuid,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// --- Payloads ---

/// CUIT: 11 dígitos; hífens são tolerados na entrada.
pub fn normalize_cuit(raw: &str) -> String {
    raw.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect()
}

pub fn validate_cuit(raw: &str) -> Result<(), ValidationError> {
    let cuit = normalize_cuit(raw);
    if cuit.len() == 11 && cuit.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("cuit");
        err.message = Some("El CUIT debe tener 11 dígitos.".into());
        Err(err)
    }
}

fn default_plan() -> Plan {
    Plan::Free
}

fn default_yellow() -> i32 {
    15
}

fn default_red() -> i32 {
    7
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationPayload {
    #[validate(custom(function = "validate_cuit"))]
    #[schema(example = "30-71234567-8")]
    pub cuit: String,
    #[validate(length(min = 1, max = 200, message = "El nombre es obligatorio."))]
    pub name: String,
    #[serde(default = "default_plan")]
    pub plan: Plan,
    #[serde(default = "default_yellow")]
    #[validate(range(min = 1, max = 365, message = "Debe ser un número de días positivo."))]
    pub threshold_yellow_days: i32,
    #[serde(default = "default_red")]
    #[validate(range(min = 1, max = 365, message = "Debe ser un número de días positivo."))]
    pub threshold_red_days: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 240, message = "La retención debe estar entre 0 y 240 meses."))]
    pub retention_months: i32,
    pub jurisdiction_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationPayload {
    #[validate(length(min = 1, max = 200, message = "El nombre es obligatorio."))]
    pub name: Option<String>,
    pub plan: Option<Plan>,
    #[validate(range(min = 1, max = 365, message = "Debe ser un número de días positivo."))]
    pub threshold_yellow_days: Option<i32>,
    #[validate(range(min = 1, max = 365, message = "Debe ser un número de días positivo."))]
    pub threshold_red_days: Option<i32>,
    #[validate(range(min = 0, max = 240, message = "La retención debe estar entre 0 y 240 meses."))]
    pub retention_months: Option<i32>,
    pub jurisdiction_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRolePayload {
    pub role: MemberRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationPayload {
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio."))]
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationPayload {
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio."))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationPayload {
    #[validate(email(message = "El e-mail es inválido."))]
    pub email: String,
    pub role: MemberRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuit_accepts_hyphens() {
        assert!(validate_cuit("30-71234567-8").is_ok());
        assert_eq!(normalize_cuit("30-71234567-8"), "30712345678");
        assert!(validate_cuit("3071234567").is_err());
        assert!(validate_cuit("30-7123456A-8").is_err());
    }
}
