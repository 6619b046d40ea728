// src/handlers/templates.rs

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
        auth::PlatformAdmin,
        rbac::{Managers, RequireRole},
    },
    models::template::{
        ApplyTemplatesPayload, ApplyTemplatesResult, CreateTemplatePayload, ObligationTemplate, RubricQuery,
        TemplateDetail, TemplateQuery, UpdateTemplatePayload,
    },
};

// ---
// Catálogo (leitura pública)
// ---

#[utoipa::path(
    get,
    path = "/api/v1/templates",
    tag = "Templates",
    params(TemplateQuery),
    responses((status = 200, description = "Templates paginados", body = Vec<ObligationTemplate>))
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.template_service.list(&query).await?;
    Ok(paginated(page, query.page_params()))
}

#[utoipa::path(
    get,
    path = "/api/v1/templates/rubrics",
    tag = "Templates",
    params(RubricQuery),
    responses((status = 200, description = "Rubros disponibles", body = Vec<String>))
)]
pub async fn list_rubrics(
    State(app_state): State<AppState>,
    Query(query): Query<RubricQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.template_service.list_rubrics(query.jurisdiction_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID del template")),
    responses(
        (status = 200, description = "Template con checklist", body = TemplateDetail),
        (status = 404, description = "No encontrado")
    )
)]
pub async fn get_template(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.template_service.get(id).await?))
}

// ---
// Catálogo (administração da plataforma)
// ---

#[utoipa::path(
    post,
    path = "/api/v1/templates",
    tag = "Templates",
    request_body = CreateTemplatePayload,
    responses(
        (status = 201, description = "Template creado", body = TemplateDetail),
        (status = 409, description = "Clave duplicada")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Json(payload): Json<CreateTemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let template = app_state.template_service.create(admin.id, &payload).await?;
    Ok((StatusCode::CREATED, data(template)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID del template")),
    request_body = UpdateTemplatePayload,
    responses((status = 200, description = "Template actualizado", body = TemplateDetail)),
    security(("api_jwt" = []))
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(data(app_state.template_service.update(admin.id, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID del template")),
    responses((status = 200, description = "Template desactivado", body = ObligationTemplate)),
    security(("api_jwt" = []))
)]
pub async fn deactivate_template(
    State(app_state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.template_service.deactivate(admin.id, id).await?))
}

// ---
// Aplicação a uma organização
// ---

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/templates/apply",
    tag = "Templates",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = ApplyTemplatesPayload,
    responses(
        (status = 201, description = "Obligaciones generadas", body = ApplyTemplatesResult),
        (status = 400, description = "No hay templates para el rubro"),
        (status = 404, description = "Jurisdicción, template o local inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_templates(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Managers>,
    Json(payload): Json<ApplyTemplatesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let result = app_state
        .template_service
        .apply_to_organization(&ctx.organization, ctx.user_id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, data(result)))
}
