// src/db/audit_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::response::{Page, PageParams},
    db::{AuditRepository, RepoResult},
    models::audit::{AuditEvent, AuditQuery},
};

#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILTER: &str = r#"
    organization_id = $1
    AND ($2::text IS NULL OR action = $2)
    AND ($3::text IS NULL OR entity_type = $3)
    AND ($4::uuid IS NULL OR entity_id = $4)
    AND ($5::uuid IS NULL OR user_id = $5)
"#;

#[async_trait]
impl AuditRepository for PgAuditRepository {
    // Só INSERT: a tabela não tem UPDATE nem DELETE em nenhum caminho do código
    async fn insert(&self, e: &AuditEvent) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (id, organization_id, user_id, entity_type, entity_id, action, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(e.id)
        .bind(e.organization_id)
        .bind(e.user_id)
        .bind(&e.entity_type)
        .bind(e.entity_id)
        .bind(&e.action)
        .bind(&e.metadata)
        .bind(e.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, organization_id: Uuid, q: &AuditQuery, page: PageParams) -> RepoResult<Page<AuditEvent>> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_events WHERE {}", FILTER))
            .bind(organization_id)
            .bind(&q.action)
            .bind(&q.entity_type)
            .bind(q.entity_id)
            .bind(q.user_id)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, AuditEvent>(&format!(
            "SELECT * FROM audit_events WHERE {} ORDER BY created_at DESC LIMIT $6 OFFSET $7",
            FILTER
        ))
        .bind(organization_id)
        .bind(&q.action)
        .bind(&q.entity_type)
        .bind(q.entity_id)
        .bind(q.user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { items, total })
    }
}
