// src/models/template.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{clock::add_months, response::PageParams},
    models::obligation::ObligationType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "periodicity", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Periodicity {
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
    Biennial,
    OneTime,
}

impl Periodicity {
    /// Vencimento inicial de uma obrigação criada a partir de um template.
    /// OneTime recebe um mês de prazo.
    pub fn initial_due_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            Periodicity::Weekly => today + chrono::Duration::days(7),
            Periodicity::Biweekly => today + chrono::Duration::days(14),
            Periodicity::Monthly | Periodicity::OneTime => add_months(today, 1),
            Periodicity::Bimonthly => add_months(today, 2),
            Periodicity::Quarterly => add_months(today, 3),
            Periodicity::Semiannual => add_months(today, 6),
            Periodicity::Annual => add_months(today, 12),
            Periodicity::Biennial => add_months(today, 24),
        }
    }

    /// Regra de recorrência no estilo iCalendar (RRULE), `None` para OneTime.
    pub fn recurrence_rule(self) -> Option<String> {
        let (freq, interval) = match self {
            Periodicity::Weekly => ("WEEKLY", 1),
            Periodicity::Biweekly => ("WEEKLY", 2),
            Periodicity::Monthly => ("MONTHLY", 1),
            Periodicity::Bimonthly => ("MONTHLY", 2),
            Periodicity::Quarterly => ("MONTHLY", 3),
            Periodicity::Semiannual => ("MONTHLY", 6),
            Periodicity::Annual => ("YEARLY", 1),
            Periodicity::Biennial => ("YEARLY", 2),
            Periodicity::OneTime => return None,
        };
        Some(format!("FREQ={};INTERVAL={}", freq, interval))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "severity", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObligationTemplate {
    pub id: Uuid,
    pub jurisdiction_id: Uuid,
    #[schema(example = "ros-habilitacion-comercial")]
    pub template_key: String,
    #[schema(example = "Habilitación comercial")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "gastronomia")]
    pub rubric: String,
    #[serde(rename = "type")]
    pub obligation_type: ObligationType,
    pub periodicity: Periodicity,
    pub requires_review: bool,
    pub required_evidence_count: i32,
    pub severity: Severity,
    // Links e notas livres (ordenanças, sites do município)
    #[sqlx(rename = "references_data")]
    #[schema(value_type = Option<Object>)]
    pub references: Option<serde_json::Value>,
    pub version: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateChecklistItem {
    pub id: Uuid,
    pub template_id: Uuid,
    #[schema(example = "Plano del local aprobado")]
    pub description: String,
    pub is_required: bool,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    #[serde(flatten)]
    pub template: ObligationTemplate,
    pub checklist: Vec<TemplateChecklistItem>,
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemPayload {
    #[validate(length(min = 1, max = 500, message = "La descripción es obligatoria."))]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_required: bool,
}

fn default_true() -> bool {
    true
}

fn default_severity() -> Severity {
    Severity::Medium
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplatePayload {
    pub jurisdiction_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "La clave del template es obligatoria."))]
    pub template_key: String,
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio."))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 80, message = "El rubro es obligatorio."))]
    pub rubric: String,
    #[serde(rename = "type")]
    pub obligation_type: ObligationType,
    pub periodicity: Periodicity,
    #[serde(default)]
    pub requires_review: bool,
    #[serde(default)]
    #[validate(range(min = 0, max = 50, message = "La cantidad de evidencias debe estar entre 0 y 50."))]
    pub required_evidence_count: i32,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[schema(value_type = Option<Object>)]
    pub references: Option<serde_json::Value>,
    #[serde(default)]
    #[validate(nested)]
    pub checklist: Vec<ChecklistItemPayload>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplatePayload {
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio."))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 80, message = "El rubro es obligatorio."))]
    pub rubric: Option<String>,
    #[serde(rename = "type")]
    pub obligation_type: Option<ObligationType>,
    pub periodicity: Option<Periodicity>,
    pub requires_review: Option<bool>,
    #[validate(range(min = 0, max = 50, message = "La cantidad de evidencias debe estar entre 0 y 50."))]
    pub required_evidence_count: Option<i32>,
    pub severity: Option<Severity>,
    #[schema(value_type = Option<Object>)]
    pub references: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    /// Quando presente, substitui o checklist inteiro.
    #[validate(nested)]
    pub checklist: Option<Vec<ChecklistItemPayload>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TemplateQuery {
    pub jurisdiction_id: Option<Uuid>,
    pub rubric: Option<String>,
    #[serde(rename = "type")]
    pub obligation_type: Option<ObligationType>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TemplateQuery {
    pub fn filter(&self) -> TemplateFilter {
        TemplateFilter {
            jurisdiction_id: self.jurisdiction_id,
            rubric: self.rubric.as_deref().map(normalize_rubric),
            obligation_type: self.obligation_type,
            is_active: self.is_active,
        }
    }

    pub fn page_params(&self) -> PageParams {
        PageParams::new(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RubricQuery {
    pub jurisdiction_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub jurisdiction_id: Option<Uuid>,
    pub rubric: Option<String>,
    pub obligation_type: Option<ObligationType>,
    pub is_active: Option<bool>,
}

impl TemplateFilter {
    pub fn matches(&self, t: &ObligationTemplate) -> bool {
        self.jurisdiction_id.is_none_or(|j| t.jurisdiction_id == j)
            && self.rubric.as_ref().is_none_or(|r| &t.rubric == r)
            && self.obligation_type.is_none_or(|ty| t.obligation_type == ty)
            && self.is_active.is_none_or(|a| t.is_active == a)
    }
}

/// Rubros são comparados sem diferenciar maiúsculas.
pub fn normalize_rubric(rubric: &str) -> String {
    rubric.trim().to_lowercase()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTemplatesPayload {
    #[validate(length(min = 1, max = 80, message = "El rubro es obligatorio."))]
    #[schema(example = "gastronomia")]
    pub rubric: String,
    pub jurisdiction_id: Option<Uuid>,
    pub template_ids: Option<Vec<Uuid>>,
    pub location_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTemplatesResult {
    pub obligations_created: u32,
    pub tasks_created: u32,
    pub obligation_ids: Vec<Uuid>,
    /// Títulos ignorados porque já existiam para a organização/local.
    pub skipped_titles: Vec<String>,
}
