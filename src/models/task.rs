// src/models/task.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub obligation_id: Uuid,
    #[schema(example = "Checklist: Habilitación comercial")]
    pub title: String,
    pub description: Option<String>,
    pub assignee_user_id: Option<Uuid>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub description: String,
    pub done: bool,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub items: Vec<TaskItem>,
    /// Percentual de itens concluídos (0-100), nunca persistido.
    pub progress: u8,
}

/// round(feitos / total * 100); checklist vazio = 0.
pub fn checklist_progress(items: &[TaskItem]) -> u8 {
    if items.is_empty() {
        return 0;
    }
    let done = items.iter().filter(|i| i.done).count() as f64;
    ((done / items.len() as f64) * 100.0).round() as u8
}

impl TaskView {
    pub fn new(task: Task, mut items: Vec<TaskItem>) -> Self {
        items.sort_by_key(|i| i.position);
        let progress = checklist_progress(&items);
        Self { task, items, progress }
    }
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub obligation_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio."))]
    pub title: String,
    pub description: Option<String>,
    pub assignee_user_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    /// Descrições dos itens iniciais do checklist.
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskPayload {
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio."))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_user_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskItemPayload {
    #[validate(length(min = 1, max = 500, message = "La descripción es obligatoria."))]
    pub description: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskItemPayload {
    #[validate(length(min = 1, max = 500, message = "La descripción es obligatoria."))]
    pub description: Option<String>,
    pub done: Option<bool>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    pub obligation_id: Option<Uuid>,
    pub assignee_user_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
}

impl TaskQuery {
    pub fn matches(&self, t: &Task) -> bool {
        self.obligation_id.is_none_or(|o| t.obligation_id == o)
            && self.assignee_user_id.is_none_or(|a| t.assignee_user_id == Some(a))
            && self.status.is_none_or(|s| t.status == s)
    }
}
