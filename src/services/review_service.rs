// src/services/review_service.rs

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::Repositories,
    models::{
        obligation::ObligationStatus,
        review::{CreateReviewPayload, PendingReview, Review, ReviewStatus},
        tenancy::{MemberRole, Membership, Organization},
    },
    services::{
        audit_service::{AuditEntry, AuditService},
        traffic_light::{enrich, Thresholds},
    },
};

/// Papéis que podem aprovar ou rejeitar.
pub const REVIEWER_ROLES: [MemberRole; 3] = [MemberRole::Owner, MemberRole::Accountant, MemberRole::Manager];

#[derive(Clone)]
pub struct ReviewService {
    repos: Repositories,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(repos: Repositories, audit: AuditService, clock: Arc<dyn Clock>) -> Self {
        Self { repos, audit, clock }
    }

    /// Rejeição devolve a obrigação para InProgress.
    pub async fn create(
        &self,
        org: &Organization,
        reviewer: &Membership,
        payload: &CreateReviewPayload,
    ) -> Result<Review, AppError> {
        let comment = payload.comment.as_ref().map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if payload.status == ReviewStatus::Rejected && comment.is_none() {
            return Err(AppError::field("comment", "El comentario es obligatorio al rechazar."));
        }

        let mut obligation = self
            .repos
            .obligations
            .find(org.id, payload.obligation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Obligación"))?;
        if !obligation.requires_review {
            return Err(AppError::BadRequest("La obligación no requiere revisión.".into()));
        }
        if !REVIEWER_ROLES.contains(&reviewer.role) {
            return Err(AppError::Forbidden("Tu rol no puede revisar obligaciones.".into()));
        }

        let now = self.clock.now();
        let review = self
            .repos
            .reviews
            .insert(&Review {
                id: Uuid::new_v4(),
                organization_id: org.id,
                obligation_id: obligation.id,
                reviewer_user_id: reviewer.user_id,
                status: payload.status,
                comment,
                created_at: now,
            })
            .await?;

        self.audit
            .record(
                AuditEntry::new("review.created")
                    .org(org.id)
                    .user(reviewer.user_id)
                    .entity("review", review.id)
                    .meta(json!({ "obligationId": obligation.id, "status": review.status })),
            )
            .await;

        if review.status == ReviewStatus::Rejected && obligation.status != ObligationStatus::InProgress {
            let from = obligation.status;
            obligation.status = ObligationStatus::InProgress;
            obligation.updated_at = now;
            self.repos.obligations.update(&obligation).await?;

            self.audit
                .record(
                    AuditEntry::new("obligation.status_changed")
                        .org(org.id)
                        .user(reviewer.user_id)
                        .entity("obligation", obligation.id)
                        .meta(json!({ "from": from.as_str(), "to": ObligationStatus::InProgress.as_str(), "reviewId": review.id })),
                )
                .await;
        }
        Ok(review)
    }

    pub async fn list_pending(&self, org: &Organization) -> Result<Vec<PendingReview>, AppError> {
        let today = self.clock.today();
        let thresholds = Thresholds::of(org);
        let obligations = self.repos.obligations.list_pending_review(org.id).await?;

        let mut pending = Vec::with_capacity(obligations.len());
        for obligation in obligations {
            let last_review = self.repos.reviews.latest(obligation.id).await?;
            pending.push(PendingReview { obligation: enrich(obligation, thresholds, today), last_review });
        }
        Ok(pending)
    }

    pub async fn list_for_obligation(&self, org: &Organization, obligation_id: Uuid) -> Result<Vec<Review>, AppError> {
        self.repos
            .obligations
            .find(org.id, obligation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Obligación"))?;
        self.repos.reviews.list_for_obligation(org.id, obligation_id).await
    }
}
