// src/db/obligation_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::response::{Page, PageParams},
    db::{NewChecklistTask, ObligationRepository, RepoResult},
    models::{
        obligation::{Obligation, ObligationFilter},
        task::{Task, TaskItem},
    },
};

#[derive(Clone)]
pub struct PgObligationRepository {
    pool: PgPool,
}

impl PgObligationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// $1 é sempre a organização
const FILTER: &str = r#"
    organization_id = $1
    AND ($2::obligation_status IS NULL OR status = $2)
    AND ($3::obligation_type IS NULL OR obligation_type = $3)
    AND ($4::uuid IS NULL OR location_id = $4)
    AND ($5::uuid IS NULL OR owner_user_id = $5)
    AND ($6::date IS NULL OR due_date >= $6)
    AND ($7::date IS NULL OR due_date <= $7)
"#;

/// Usado também pelo repositório de tarefas.
pub(crate) async fn insert_task(
    tx: &mut Transaction<'_, Postgres>,
    task: &Task,
    items: &[TaskItem],
) -> RepoResult<Task> {
    let created = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks (
            id, organization_id, obligation_id, title, description, assignee_user_id,
            status, due_date, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(task.id)
    .bind(task.organization_id)
    .bind(task.obligation_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.assignee_user_id)
    .bind(task.status)
    .bind(task.due_date)
    .bind(task.created_at)
    .bind(task.updated_at)
    .fetch_one(&mut **tx)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO task_items (id, task_id, description, done, position) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(item.id)
        .bind(item.task_id)
        .bind(&item.description)
        .bind(item.done)
        .bind(item.position)
        .execute(&mut **tx)
        .await?;
    }

    Ok(created)
}

#[async_trait]
impl ObligationRepository for PgObligationRepository {
    async fn insert(&self, o: &Obligation, checklist: Option<NewChecklistTask<'_>>) -> RepoResult<Obligation> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Obligation>(
            r#"
            INSERT INTO obligations (
                id, organization_id, location_id, title, description, obligation_type, status,
                due_date, recurrence_rule, requires_review, required_evidence_count,
                owner_user_id, template_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(o.id)
        .bind(o.organization_id)
        .bind(o.location_id)
        .bind(&o.title)
        .bind(&o.description)
        .bind(o.obligation_type)
        .bind(o.status)
        .bind(o.due_date)
        .bind(&o.recurrence_rule)
        .bind(o.requires_review)
        .bind(o.required_evidence_count)
        .bind(o.owner_user_id)
        .bind(o.template_id)
        .bind(o.created_at)
        .bind(o.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(NewChecklistTask { task, items }) = checklist {
            insert_task(&mut tx, task, items).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Obligation>> {
        let o = sqlx::query_as::<_, Obligation>("SELECT * FROM obligations WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(o)
    }

    async fn list(&self, organization_id: Uuid, f: &ObligationFilter, page: PageParams) -> RepoResult<Page<Obligation>> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM obligations WHERE {}", FILTER))
            .bind(organization_id)
            .bind(f.status)
            .bind(f.obligation_type)
            .bind(f.location_id)
            .bind(f.owner_user_id)
            .bind(f.due_from)
            .bind(f.due_to)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Obligation>(&format!(
            "SELECT * FROM obligations WHERE {} ORDER BY due_date, title LIMIT $8 OFFSET $9",
            FILTER
        ))
        .bind(organization_id)
        .bind(f.status)
        .bind(f.obligation_type)
        .bind(f.location_id)
        .bind(f.owner_user_id)
        .bind(f.due_from)
        .bind(f.due_to)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { items, total })
    }

    async fn list_all(&self, organization_id: Uuid, f: &ObligationFilter) -> RepoResult<Vec<Obligation>> {
        let items = sqlx::query_as::<_, Obligation>(&format!(
            "SELECT * FROM obligations WHERE {} ORDER BY due_date, title",
            FILTER
        ))
        .bind(organization_id)
        .bind(f.status)
        .bind(f.obligation_type)
        .bind(f.location_id)
        .bind(f.owner_user_id)
        .bind(f.due_from)
        .bind(f.due_to)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn update(&self, o: &Obligation) -> RepoResult<Obligation> {
        let updated = sqlx::query_as::<_, Obligation>(
            r#"
            UPDATE obligations
            SET location_id = $3, title = $4, description = $5, obligation_type = $6, status = $7,
                due_date = $8, recurrence_rule = $9, requires_review = $10,
                required_evidence_count = $11, owner_user_id = $12, updated_at = $13
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(o.organization_id)
        .bind(o.id)
        .bind(o.location_id)
        .bind(&o.title)
        .bind(&o.description)
        .bind(o.obligation_type)
        .bind(o.status)
        .bind(o.due_date)
        .bind(&o.recurrence_rule)
        .bind(o.requires_review)
        .bind(o.required_evidence_count)
        .bind(o.owner_user_id)
        .bind(o.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM obligations WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Sem local, compara com as obrigações também sem local
    async fn titles(&self, organization_id: Uuid, location_id: Option<Uuid>) -> RepoResult<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>(
            "SELECT title FROM obligations WHERE organization_id = $1 AND location_id IS NOT DISTINCT FROM $2",
        )
        .bind(organization_id)
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    async fn mark_overdue(&self, today: NaiveDate, at: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE obligations SET status = 'OVERDUE', updated_at = $2
            WHERE status IN ('PENDING', 'IN_PROGRESS') AND due_date < $1
            "#,
        )
        .bind(today)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_pending_review(&self, organization_id: Uuid) -> RepoResult<Vec<Obligation>> {
        let list = sqlx::query_as::<_, Obligation>(
            r#"
            SELECT o.* FROM obligations o
            WHERE o.organization_id = $1
              AND o.requires_review
              AND o.status NOT IN ('COMPLETED', 'NOT_APPLICABLE')
              AND NOT EXISTS (
                  SELECT 1 FROM reviews r WHERE r.obligation_id = o.id AND r.status = 'APPROVED'
              )
            ORDER BY o.due_date
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }
}
