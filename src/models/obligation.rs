// src/models/obligation.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::common::response::PageParams;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "obligation_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationType {
    Tax,
    Permit,
    Insurance,
    Inspection,
    Declaration,
    Renewal,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "obligation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
    NotApplicable,
}

impl ObligationStatus {
    /// Completed e NotApplicable não geram urgência nem lembretes.
    pub fn is_terminal(self) -> bool {
        matches!(self, ObligationStatus::Completed | ObligationStatus::NotApplicable)
    }

    pub fn is_open(self) -> bool {
        matches!(self, ObligationStatus::Pending | ObligationStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObligationStatus::Pending => "PENDING",
            ObligationStatus::InProgress => "IN_PROGRESS",
            ObligationStatus::Completed => "COMPLETED",
            ObligationStatus::Overdue => "OVERDUE",
            ObligationStatus::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficLight {
    Green,
    Yellow,
    Red,
}

impl TrafficLight {
    pub fn as_str(self) -> &'static str {
        match self {
            TrafficLight::Green => "GREEN",
            TrafficLight::Yellow => "YELLOW",
            TrafficLight::Red => "RED",
        }
    }
}

impl ObligationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObligationType::Tax => "TAX",
            ObligationType::Permit => "PERMIT",
            ObligationType::Insurance => "INSURANCE",
            ObligationType::Inspection => "INSPECTION",
            ObligationType::Declaration => "DECLARATION",
            ObligationType::Renewal => "RENEWAL",
            ObligationType::Other => "OTHER",
        }
    }
}

// --- Entidade ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Obligation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub location_id: Option<Uuid>,
    #[schema(example = "Habilitación comercial")]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub obligation_type: ObligationType,
    pub status: ObligationStatus,
    #[schema(example = "2025-06-30")]
    pub due_date: NaiveDate,
    #[schema(example = "FREQ=YEARLY;INTERVAL=1")]
    pub recurrence_rule: Option<String>,
    pub requires_review: bool,
    pub required_evidence_count: i32,
    pub owner_user_id: Uuid,
    pub template_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Obrigação com os campos derivados recalculados a cada leitura.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObligationView {
    #[serde(flatten)]
    pub obligation: Obligation,
    pub traffic_light: TrafficLight,
    pub days_until_due: i64,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateObligationPayload {
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio."))]
    #[schema(example = "Renovación de seguro de responsabilidad civil")]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub obligation_type: ObligationType,
    pub due_date: NaiveDate,
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub requires_review: bool,
    #[serde(default)]
    #[validate(range(min = 0, max = 50, message = "La cantidad de evidencias debe estar entre 0 y 50."))]
    pub required_evidence_count: i32,
    pub location_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateObligationPayload {
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio."))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub obligation_type: Option<ObligationType>,
    pub due_date: Option<NaiveDate>,
    pub recurrence_rule: Option<String>,
    pub requires_review: Option<bool>,
    #[validate(range(min = 0, max = 50, message = "La cantidad de evidencias debe estar entre 0 y 50."))]
    pub required_evidence_count: Option<i32>,
    pub location_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: ObligationStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ObligationQuery {
    pub status: Option<ObligationStatus>,
    #[serde(rename = "type")]
    pub obligation_type: Option<ObligationType>,
    pub location_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ObligationQuery {
    pub fn filter(&self) -> ObligationFilter {
        ObligationFilter {
            status: self.status,
            obligation_type: self.obligation_type,
            location_id: self.location_id,
            owner_user_id: self.owner_user_id,
            due_from: self.due_from,
            due_to: self.due_to,
        }
    }

    pub fn page_params(&self) -> PageParams {
        PageParams::new(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Filtro usado pelos repositórios.
#[derive(Debug, Clone, Default)]
pub struct ObligationFilter {
    pub status: Option<ObligationStatus>,
    pub obligation_type: Option<ObligationType>,
    pub location_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl ObligationFilter {
    pub fn matches(&self, o: &Obligation) -> bool {
        self.status.is_none_or(|s| o.status == s)
            && self.obligation_type.is_none_or(|t| o.obligation_type == t)
            && self.location_id.is_none_or(|l| o.location_id == Some(l))
            && self.owner_user_id.is_none_or(|u| o.owner_user_id == u)
            && self.due_from.is_none_or(|d| o.due_date >= d)
            && self.due_to.is_none_or(|d| o.due_date <= d)
    }
}
