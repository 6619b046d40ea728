// src/handlers/obligations.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        response::{data, paginated},
    },
    config::AppState,
    middleware::{
        rbac::{Managers, RequireRole},
        tenancy::OrgContext,
    },
    models::{
        dashboard::ObligationDashboard,
        obligation::{
            CalendarQuery, CreateObligationPayload, ObligationQuery, ObligationView, UpdateObligationPayload,
            UpdateStatusPayload,
        },
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/obligations",
    tag = "Obligations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización"), ObligationQuery),
    responses((status = 200, description = "Obligaciones con semáforo, paginadas", body = Vec<ObligationView>)),
    security(("api_jwt" = []))
)]
pub async fn list_obligations(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<ObligationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.obligation_service.list(&ctx.organization, &query).await?;
    Ok(paginated(page, query.page_params()))
}

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/obligations",
    tag = "Obligations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = CreateObligationPayload,
    responses(
        (status = 201, description = "Obligación creada", body = ObligationView),
        (status = 400, description = "Datos inválidos o responsable que no es miembro")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_obligation(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Managers>,
    Json(payload): Json<CreateObligationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let obligation = app_state
        .obligation_service
        .create(&ctx.organization, ctx.user_id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, data(obligation)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/obligations/dashboard",
    tag = "Obligations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses((status = 200, description = "Resumen y semáforo", body = ObligationDashboard)),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    ctx: OrgContext,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.obligation_service.dashboard(&ctx.organization).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/obligations/calendar",
    tag = "Obligations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización"), CalendarQuery),
    responses((status = 200, description = "Vencimientos del período (por defecto, el mes actual)", body = Vec<ObligationView>)),
    security(("api_jwt" = []))
)]
pub async fn get_calendar(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<CalendarQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.obligation_service.calendar(&ctx.organization, &query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/obligations/{id}",
    tag = "Obligations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la obligación")
    ),
    responses(
        (status = 200, description = "Obligación", body = ObligationView),
        (status = 404, description = "No encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_obligation(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.obligation_service.get(&ctx.organization, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{organization_id}/obligations/{id}",
    tag = "Obligations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la obligación")
    ),
    request_body = UpdateObligationPayload,
    responses((status = 200, description = "Obligación actualizada", body = ObligationView)),
    security(("api_jwt" = []))
)]
pub async fn update_obligation(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Managers>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateObligationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let obligation = app_state
        .obligation_service
        .update(&ctx.organization, ctx.user_id(), id, &payload)
        .await?;
    Ok(data(obligation))
}

#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{organization_id}/obligations/{id}/status",
    tag = "Obligations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la obligación")
    ),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Estado actualizado", body = ObligationView),
        (status = 400, description = "Faltan evidencias o la aprobación requerida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Managers>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let obligation = app_state
        .obligation_service
        .update_status(&ctx.organization, ctx.user_id(), id, payload.status)
        .await?;
    Ok(data(obligation))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}/obligations/{id}",
    tag = "Obligations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la obligación")
    ),
    responses((status = 204, description = "Obligación eliminada")),
    security(("api_jwt" = []))
)]
pub async fn delete_obligation(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Managers>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .obligation_service
        .delete(&ctx.organization, ctx.user_id(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
