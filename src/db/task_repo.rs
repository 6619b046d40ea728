// src/db/task_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{obligation_repo::insert_task, RepoResult, TaskRepository},
    models::task::{Task, TaskItem, TaskQuery},
};

#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert(&self, task: &Task, items: &[TaskItem]) -> RepoResult<Task> {
        let mut tx = self.pool.begin().await?;
        let created = insert_task(&mut tx, task, items).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Task>> {
        let t = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(t)
    }

    async fn list(&self, organization_id: Uuid, q: &TaskQuery) -> RepoResult<Vec<Task>> {
        let list = sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR obligation_id = $2)
              AND ($3::uuid IS NULL OR assignee_user_id = $3)
              AND ($4::task_status IS NULL OR status = $4)
            ORDER BY due_date NULLS LAST, created_at
            "#,
        )
        .bind(organization_id)
        .bind(q.obligation_id)
        .bind(q.assignee_user_id)
        .bind(q.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }

    async fn update(&self, t: &Task) -> RepoResult<Task> {
        let updated = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $3, description = $4, assignee_user_id = $5, status = $6, due_date = $7, updated_at = $8
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(t.organization_id)
        .bind(t.id)
        .bind(&t.title)
        .bind(&t.description)
        .bind(t.assignee_user_id)
        .bind(t.status)
        .bind(t.due_date)
        .bind(t.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn items(&self, task_ids: &[Uuid]) -> RepoResult<Vec<TaskItem>> {
        let items = sqlx::query_as::<_, TaskItem>(
            "SELECT * FROM task_items WHERE task_id = ANY($1) ORDER BY task_id, position",
        )
        .bind(task_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn insert_item(&self, item: &TaskItem) -> RepoResult<TaskItem> {
        let created = sqlx::query_as::<_, TaskItem>(
            r#"
            INSERT INTO task_items (id, task_id, description, done, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(item.task_id)
        .bind(&item.description)
        .bind(item.done)
        .bind(item.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_item(&self, task_id: Uuid, item_id: Uuid) -> RepoResult<Option<TaskItem>> {
        let item = sqlx::query_as::<_, TaskItem>("SELECT * FROM task_items WHERE task_id = $1 AND id = $2")
            .bind(task_id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn update_item(&self, item: &TaskItem) -> RepoResult<TaskItem> {
        let updated = sqlx::query_as::<_, TaskItem>(
            r#"
            UPDATE task_items SET description = $3, done = $4, position = $5
            WHERE task_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(item.task_id)
        .bind(item.id)
        .bind(&item.description)
        .bind(item.done)
        .bind(item.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_item(&self, task_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM task_items WHERE task_id = $1 AND id = $2")
            .bind(task_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
