// src/db/review_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{RepoResult, ReviewRepository},
    models::review::Review,
};

#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn insert(&self, r: &Review) -> RepoResult<Review> {
        let created = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, organization_id, obligation_id, reviewer_user_id, status, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(r.id)
        .bind(r.organization_id)
        .bind(r.obligation_id)
        .bind(r.reviewer_user_id)
        .bind(r.status)
        .bind(&r.comment)
        .bind(r.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_for_obligation(&self, organization_id: Uuid, obligation_id: Uuid) -> RepoResult<Vec<Review>> {
        let list = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE organization_id = $1 AND obligation_id = $2 ORDER BY created_at DESC",
        )
        .bind(organization_id)
        .bind(obligation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }

    async fn has_approved(&self, obligation_id: Uuid) -> RepoResult<bool> {
        let approved: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE obligation_id = $1 AND status = 'APPROVED')",
        )
        .bind(obligation_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(approved)
    }

    async fn latest(&self, obligation_id: Uuid) -> RepoResult<Option<Review>> {
        let r = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE obligation_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(obligation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(r)
    }
}
