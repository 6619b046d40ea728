// src/services/task_service.rs

use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::Repositories,
    models::{
        task::{
            CreateTaskItemPayload, CreateTaskPayload, Task, TaskItem, TaskQuery, TaskStatus, TaskView,
            UpdateTaskItemPayload, UpdateTaskPayload,
        },
        tenancy::Organization,
    },
    services::audit_service::{AuditEntry, AuditService},
};

#[derive(Clone)]
pub struct TaskService {
    repos: Repositories,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

impl TaskService {
    pub fn new(repos: Repositories, audit: AuditService, clock: Arc<dyn Clock>) -> Self {
        Self { repos, audit, clock }
    }

    async fn load(&self, org: &Organization, id: Uuid) -> Result<Task, AppError> {
        self.repos
            .tasks
            .find(org.id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Tarea"))
    }

    async fn view(&self, task: Task) -> Result<TaskView, AppError> {
        let items = self.repos.tasks.items(&[task.id]).await?;
        Ok(TaskView::new(task, items))
    }

    async fn load_item(&self, org: &Organization, task_id: Uuid, item_id: Uuid) -> Result<TaskItem, AppError> {
        self.load(org, task_id).await?;
        self.repos
            .tasks
            .find_item(task_id, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Ítem"))
    }

    async fn check_assignee(&self, org: &Organization, assignee: Option<Uuid>) -> Result<(), AppError> {
        if let Some(user_id) = assignee {
            if self.repos.memberships.find(org.id, user_id).await?.is_none() {
                return Err(AppError::field("assigneeUserId", "El asignado debe ser miembro de la organización."));
            }
        }
        Ok(())
    }

    async fn record(&self, action: &'static str, org: &Organization, actor: Uuid, task_id: Uuid, meta: serde_json::Value) {
        self.audit
            .record(AuditEntry::new(action).org(org.id).user(actor).entity("task", task_id).meta(meta))
            .await;
    }

    pub async fn list(&self, org: &Organization, query: &TaskQuery) -> Result<Vec<TaskView>, AppError> {
        let tasks = self.repos.tasks.list(org.id, query).await?;
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

        let mut by_task: HashMap<Uuid, Vec<TaskItem>> = HashMap::new();
        for item in self.repos.tasks.items(&ids).await? {
            by_task.entry(item.task_id).or_default().push(item);
        }

        Ok(tasks
            .into_iter()
            .map(|t| {
                let items = by_task.remove(&t.id).unwrap_or_default();
                TaskView::new(t, items)
            })
            .collect())
    }

    pub async fn get(&self, org: &Organization, id: Uuid) -> Result<TaskView, AppError> {
        let task = self.load(org, id).await?;
        self.view(task).await
    }

    pub async fn create(&self, org: &Organization, actor: Uuid, payload: &CreateTaskPayload) -> Result<TaskView, AppError> {
        self.repos
            .obligations
            .find(org.id, payload.obligation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Obligación"))?;
        self.check_assignee(org, payload.assignee_user_id).await?;

        let now = self.clock.now();
        let task = Task {
            id: Uuid::new_v4(),
            organization_id: org.id,
            obligation_id: payload.obligation_id,
            title: payload.title.trim().to_string(),
            description: payload.description.clone(),
            assignee_user_id: payload.assignee_user_id,
            status: TaskStatus::Pending,
            due_date: payload.due_date,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<TaskItem> = payload
            .items
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .enumerate()
            .map(|(position, description)| TaskItem {
                id: Uuid::new_v4(),
                task_id: task.id,
                description: description.to_string(),
                done: false,
                position: position as i32,
            })
            .collect();

        let task = self.repos.tasks.insert(&task, &items).await?;
        self.record("task.created", org, actor, task.id, json!({ "obligationId": task.obligation_id }))
            .await;
        Ok(TaskView::new(task, items))
    }

    pub async fn update(
        &self,
        org: &Organization,
        actor: Uuid,
        id: Uuid,
        payload: &UpdateTaskPayload,
    ) -> Result<TaskView, AppError> {
        let mut task = self.load(org, id).await?;

        if let Some(title) = &payload.title {
            task.title = title.trim().to_string();
        }
        if payload.description.is_some() {
            task.description = payload.description.clone();
        }
        if payload.assignee_user_id.is_some() {
            self.check_assignee(org, payload.assignee_user_id).await?;
            task.assignee_user_id = payload.assignee_user_id;
        }
        if let Some(status) = payload.status {
            task.status = status;
        }
        if payload.due_date.is_some() {
            task.due_date = payload.due_date;
        }
        task.updated_at = self.clock.now();

        let task = self.repos.tasks.update(&task).await?;
        self.record("task.updated", org, actor, id, json!({ "status": task.status })).await;
        self.view(task).await
    }

    pub async fn delete(&self, org: &Organization, actor: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.repos.tasks.delete(org.id, id).await? {
            return Err(AppError::not_found("Tarea"));
        }
        self.record("task.deleted", org, actor, id, json!({})).await;
        Ok(())
    }

    // ---
    // Itens do checklist
    // ---

    /// Novo item vai para o fim da lista.
    pub async fn add_item(
        &self,
        org: &Organization,
        actor: Uuid,
        task_id: Uuid,
        payload: &CreateTaskItemPayload,
    ) -> Result<TaskView, AppError> {
        let task = self.load(org, task_id).await?;
        let items = self.repos.tasks.items(&[task_id]).await?;
        let position = items.iter().map(|i| i.position).max().map_or(0, |p| p + 1);

        let item = self
            .repos
            .tasks
            .insert_item(&TaskItem {
                id: Uuid::new_v4(),
                task_id,
                description: payload.description.trim().to_string(),
                done: false,
                position,
            })
            .await?;

        self.record("task.item_added", org, actor, task_id, json!({ "itemId": item.id })).await;
        self.view(task).await
    }

    pub async fn update_item(
        &self,
        org: &Organization,
        actor: Uuid,
        task_id: Uuid,
        item_id: Uuid,
        payload: &UpdateTaskItemPayload,
    ) -> Result<TaskView, AppError> {
        let mut item = self.load_item(org, task_id, item_id).await?;
        if let Some(description) = &payload.description {
            item.description = description.trim().to_string();
        }
        if let Some(done) = payload.done {
            item.done = done;
        }
        if let Some(position) = payload.position {
            item.position = position;
        }
        self.repos.tasks.update_item(&item).await?;

        self.record("task.item_updated", org, actor, task_id, json!({ "itemId": item_id })).await;
        self.get(org, task_id).await
    }

    pub async fn toggle_item(
        &self,
        org: &Organization,
        actor: Uuid,
        task_id: Uuid,
        item_id: Uuid,
    ) -> Result<TaskView, AppError> {
        let mut item = self.load_item(org, task_id, item_id).await?;
        item.done = !item.done;
        self.repos.tasks.update_item(&item).await?;

        self.record("task.item_toggled", org, actor, task_id, json!({ "itemId": item_id, "done": item.done }))
            .await;
        self.get(org, task_id).await
    }

    pub async fn delete_item(&self, org: &Organization, actor: Uuid, task_id: Uuid, item_id: Uuid) -> Result<TaskView, AppError> {
        self.load_item(org, task_id, item_id).await?;
        self.repos.tasks.delete_item(task_id, item_id).await?;

        self.record("task.item_deleted", org, actor, task_id, json!({ "itemId": item_id })).await;
        self.get(org, task_id).await
    }
}
