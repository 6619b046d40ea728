// src/models/document.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::common::response::PageParams;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub obligation_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    #[schema(example = "constancia-pago.pdf")]
    pub file_name: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub storage_key: String,
    #[schema(example = "application/pdf")]
    pub declared_mime_type: String,
    #[schema(example = "application/pdf")]
    pub detected_mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    /// URL pré-assinada gerada a cada leitura.
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestUploadUrlPayload {
    #[validate(length(min = 1, max = 255, message = "El nombre del archivo es obligatorio."))]
    pub file_name: String,
    #[validate(length(min = 1, message = "El tipo MIME es obligatorio."))]
    #[schema(example = "application/pdf")]
    pub mime_type: String,
    #[validate(range(min = 1, message = "El archivo no puede estar vacío."))]
    pub size_bytes: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub storage_key: String,
    pub upload_url: String,
    /// Segundos de validade da URL.
    pub expires_in: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDocumentPayload {
    #[validate(length(min = 1, message = "La clave de almacenamiento es obligatoria."))]
    pub storage_key: String,
    #[validate(length(min = 1, max = 255, message = "El nombre del archivo es obligatorio."))]
    pub file_name: String,
    #[validate(length(min = 1, message = "El tipo MIME es obligatorio."))]
    pub mime_type: String,
    pub obligation_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DocumentQuery {
    pub obligation_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl DocumentQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams::new(self.page, self.limit)
    }

    pub fn matches(&self, d: &Document) -> bool {
        self.obligation_id.is_none_or(|o| d.obligation_id == Some(o))
            && self.task_id.is_none_or(|t| d.task_id == Some(t))
    }
}
