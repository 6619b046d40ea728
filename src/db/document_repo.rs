// src/db/document_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::response::{Page, PageParams},
    db::{conflict_on_unique, DocumentRepository, RepoResult},
    models::document::{Document, DocumentQuery},
};

#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn insert(&self, d: &Document) -> RepoResult<Document> {
        sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                id, organization_id, obligation_id, task_id, file_name, storage_key,
                declared_mime_type, detected_mime_type, size_bytes, uploaded_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(d.id)
        .bind(d.organization_id)
        .bind(d.obligation_id)
        .bind(d.task_id)
        .bind(&d.file_name)
        .bind(&d.storage_key)
        .bind(&d.declared_mime_type)
        .bind(&d.detected_mime_type)
        .bind(d.size_bytes)
        .bind(d.uploaded_by)
        .bind(d.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Este archivo ya fue registrado."))
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Document>> {
        let d = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(d)
    }

    async fn list(&self, organization_id: Uuid, q: &DocumentQuery, page: PageParams) -> RepoResult<Page<Document>> {
        const FILTER: &str = r#"
            organization_id = $1
            AND ($2::uuid IS NULL OR obligation_id = $2)
            AND ($3::uuid IS NULL OR task_id = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM documents WHERE {}", FILTER))
            .bind(organization_id)
            .bind(q.obligation_id)
            .bind(q.task_id)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Document>(&format!(
            "SELECT * FROM documents WHERE {} ORDER BY created_at DESC LIMIT $4 OFFSET $5",
            FILTER
        ))
        .bind(organization_id)
        .bind(q.obligation_id)
        .bind(q.task_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { items, total })
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_for_obligation(&self, obligation_id: Uuid) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE obligation_id = $1")
            .bind(obligation_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn evidence_counts(&self, organization_id: Uuid) -> RepoResult<HashMap<Uuid, i64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT obligation_id, COUNT(*) FROM documents
            WHERE organization_id = $1 AND obligation_id IS NOT NULL
            GROUP BY obligation_id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn list_created_before(&self, organization_id: Uuid, cutoff: DateTime<Utc>) -> RepoResult<Vec<Document>> {
        let list = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE organization_id = $1 AND created_at < $2 ORDER BY created_at",
        )
        .bind(organization_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }
}
