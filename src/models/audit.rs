// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};

use crate::common::response::PageParams;

/// Fato imutável: só é inserido, nunca alterado ou apagado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[schema(example = "obligation")]
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    #[schema(example = "obligation.status_changed")]
    pub action: String,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AuditQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams::new(self.page, self.limit)
    }

    pub fn matches(&self, e: &AuditEvent) -> bool {
        self.action.as_ref().is_none_or(|a| &e.action == a)
            && self.entity_type.as_ref().is_none_or(|t| e.entity_type.as_ref() == Some(t))
            && self.entity_id.is_none_or(|id| e.entity_id == Some(id))
            && self.user_id.is_none_or(|u| e.user_id == Some(u))
    }
}
