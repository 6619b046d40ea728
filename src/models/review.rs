// src/models/review.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::obligation::ObligationView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "review_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub obligation_id: Uuid,
    pub reviewer_user_id: Uuid,
    pub status: ReviewStatus,
    #[schema(example = "Falta el comprobante de pago.")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewPayload {
    pub obligation_id: Uuid,
    pub status: ReviewStatus,
    #[validate(length(max = 2000, message = "El comentario es demasiado largo."))]
    pub comment: Option<String>,
}

/// Obrigação aguardando aprovação, com a revisão mais recente (se houver).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingReview {
    pub obligation: ObligationView,
    pub last_review: Option<Review>,
}
