// src/db/template_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::response::{Page, PageParams},
    db::{conflict_on_unique, RepoResult, TemplateRepository},
    models::template::{ObligationTemplate, TemplateChecklistItem, TemplateFilter},
};

#[derive(Clone)]
pub struct PgTemplateRepository {
    pool: PgPool,
}

impl PgTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_checklist(
        tx: &mut Transaction<'_, Postgres>,
        items: &[TemplateChecklistItem],
    ) -> RepoResult<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO template_checklist_items (id, template_id, description, is_required, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id)
            .bind(item.template_id)
            .bind(&item.description)
            .bind(item.is_required)
            .bind(item.position)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

const FILTER: &str = r#"
    ($1::uuid IS NULL OR jurisdiction_id = $1)
    AND ($2::text IS NULL OR rubric = $2)
    AND ($3::obligation_type IS NULL OR obligation_type = $3)
    AND ($4::boolean IS NULL OR is_active = $4)
"#;

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    async fn insert(
        &self,
        t: &ObligationTemplate,
        checklist: &[TemplateChecklistItem],
    ) -> RepoResult<ObligationTemplate> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, ObligationTemplate>(
            r#"
            INSERT INTO obligation_templates (
                id, jurisdiction_id, template_key, title, description, rubric, obligation_type,
                periodicity, requires_review, required_evidence_count, severity, references_data,
                version, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(t.id)
        .bind(t.jurisdiction_id)
        .bind(&t.template_key)
        .bind(&t.title)
        .bind(&t.description)
        .bind(&t.rubric)
        .bind(t.obligation_type)
        .bind(t.periodicity)
        .bind(t.requires_review)
        .bind(t.required_evidence_count)
        .bind(t.severity)
        .bind(&t.references)
        .bind(t.version)
        .bind(t.is_active)
        .bind(t.created_at)
        .bind(t.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya existe un template con esa clave."))?;

        Self::insert_checklist(&mut tx, checklist).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update(
        &self,
        t: &ObligationTemplate,
        checklist: Option<&[TemplateChecklistItem]>,
    ) -> RepoResult<ObligationTemplate> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, ObligationTemplate>(
            r#"
            UPDATE obligation_templates
            SET title = $2, description = $3, rubric = $4, obligation_type = $5, periodicity = $6,
                requires_review = $7, required_evidence_count = $8, severity = $9,
                references_data = $10, version = $11, is_active = $12, updated_at = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(t.id)
        .bind(&t.title)
        .bind(&t.description)
        .bind(&t.rubric)
        .bind(t.obligation_type)
        .bind(t.periodicity)
        .bind(t.requires_review)
        .bind(t.required_evidence_count)
        .bind(t.severity)
        .bind(&t.references)
        .bind(t.version)
        .bind(t.is_active)
        .bind(t.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(items) = checklist {
            sqlx::query("DELETE FROM template_checklist_items WHERE template_id = $1")
                .bind(t.id)
                .execute(&mut *tx)
                .await?;
            Self::insert_checklist(&mut tx, items).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ObligationTemplate>> {
        let t = sqlx::query_as::<_, ObligationTemplate>("SELECT * FROM obligation_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(t)
    }

    async fn checklist(&self, template_id: Uuid) -> RepoResult<Vec<TemplateChecklistItem>> {
        let items = sqlx::query_as::<_, TemplateChecklistItem>(
            "SELECT * FROM template_checklist_items WHERE template_id = $1 ORDER BY position",
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn list(&self, filter: &TemplateFilter, page: PageParams) -> RepoResult<Page<ObligationTemplate>> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM obligation_templates WHERE {}", FILTER))
            .bind(filter.jurisdiction_id)
            .bind(&filter.rubric)
            .bind(filter.obligation_type)
            .bind(filter.is_active)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, ObligationTemplate>(&format!(
            "SELECT * FROM obligation_templates WHERE {} ORDER BY rubric, title LIMIT $5 OFFSET $6",
            FILTER
        ))
        .bind(filter.jurisdiction_id)
        .bind(&filter.rubric)
        .bind(filter.obligation_type)
        .bind(filter.is_active)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { items, total })
    }

    async fn list_active_for(&self, jurisdiction_id: Uuid, rubric: &str) -> RepoResult<Vec<ObligationTemplate>> {
        let list = sqlx::query_as::<_, ObligationTemplate>(
            r#"
            SELECT * FROM obligation_templates
            WHERE jurisdiction_id = $1 AND rubric = $2 AND is_active
            ORDER BY title
            "#,
        )
        .bind(jurisdiction_id)
        .bind(rubric)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }

    async fn list_rubrics(&self, jurisdiction_id: Option<Uuid>) -> RepoResult<Vec<String>> {
        let rubrics = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT rubric FROM obligation_templates
            WHERE is_active AND ($1::uuid IS NULL OR jurisdiction_id = $1)
            ORDER BY rubric
            "#,
        )
        .bind(jurisdiction_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rubrics)
    }
}
