// src/handlers/tasks.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::data},
    config::AppState,
    middleware::{
        rbac::{RequireRole, TaskEditors},
        tenancy::OrgContext,
    },
    models::task::{
        CreateTaskItemPayload, CreateTaskPayload, TaskQuery, TaskView, UpdateTaskItemPayload, UpdateTaskPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/tasks",
    tag = "Tasks",
    params(("organization_id" = Uuid, Path, description = "ID de la organización"), TaskQuery),
    responses((status = 200, description = "Tareas con checklist y progreso", body = Vec<TaskView>)),
    security(("api_jwt" = []))
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<TaskQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.task_service.list(&ctx.organization, &query).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/tasks",
    tag = "Tasks",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = CreateTaskPayload,
    responses((status = 201, description = "Tarea creada", body = TaskView)),
    security(("api_jwt" = []))
)]
pub async fn create_task(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<TaskEditors>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let task = app_state
        .task_service
        .create(&ctx.organization, ctx.user_id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, data(task)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la tarea")
    ),
    responses(
        (status = 200, description = "Tarea", body = TaskView),
        (status = 404, description = "No encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_task(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.task_service.get(&ctx.organization, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{organization_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la tarea")
    ),
    request_body = UpdateTaskPayload,
    responses((status = 200, description = "Tarea actualizada", body = TaskView)),
    security(("api_jwt" = []))
)]
pub async fn update_task(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<TaskEditors>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let task = app_state
        .task_service
        .update(&ctx.organization, ctx.user_id(), id, &payload)
        .await?;
    Ok(data(task))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la tarea")
    ),
    responses((status = 204, description = "Tarea eliminada")),
    security(("api_jwt" = []))
)]
pub async fn delete_task(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<TaskEditors>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state.task_service.delete(&ctx.organization, ctx.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Itens do checklist
// ---

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/tasks/{id}/items",
    tag = "Tasks",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la tarea")
    ),
    request_body = CreateTaskItemPayload,
    responses((status = 201, description = "Ítem agregado al final", body = TaskView)),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<TaskEditors>,
    Path((_organization_id, task_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateTaskItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let task = app_state
        .task_service
        .add_item(&ctx.organization, ctx.user_id(), task_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, data(task)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{organization_id}/tasks/{id}/items/{item_id}",
    tag = "Tasks",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la tarea"),
        ("item_id" = Uuid, Path, description = "ID del ítem")
    ),
    request_body = UpdateTaskItemPayload,
    responses((status = 200, description = "Ítem actualizado", body = TaskView)),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<TaskEditors>,
    Path((_organization_id, task_id, item_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<UpdateTaskItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let task = app_state
        .task_service
        .update_item(&ctx.organization, ctx.user_id(), task_id, item_id, &payload)
        .await?;
    Ok(data(task))
}

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/tasks/{id}/items/{item_id}/toggle",
    tag = "Tasks",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la tarea"),
        ("item_id" = Uuid, Path, description = "ID del ítem")
    ),
    responses((status = 200, description = "Ítem marcado o desmarcado", body = TaskView)),
    security(("api_jwt" = []))
)]
pub async fn toggle_item(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<TaskEditors>,
    Path((_organization_id, task_id, item_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state
        .task_service
        .toggle_item(&ctx.organization, ctx.user_id(), task_id, item_id)
        .await?;
    Ok(data(task))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}/tasks/{id}/items/{item_id}",
    tag = "Tasks",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la tarea"),
        ("item_id" = Uuid, Path, description = "ID del ítem")
    ),
    responses((status = 200, description = "Ítem eliminado", body = TaskView)),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<TaskEditors>,
    Path((_organization_id, task_id, item_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state
        .task_service
        .delete_item(&ctx.organization, ctx.user_id(), task_id, item_id)
        .await?;
    Ok(data(task))
}
