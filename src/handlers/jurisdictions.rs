// src/handlers/jurisdictions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::data},
    config::AppState,
    middleware::auth::PlatformAdmin,
    models::jurisdiction::{CreateJurisdictionPayload, Jurisdiction, UpdateJurisdictionPayload},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct JurisdictionQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/jurisdictions",
    tag = "Jurisdictions",
    params(JurisdictionQuery),
    responses((status = 200, description = "Jurisdicciones", body = Vec<Jurisdiction>))
)]
pub async fn list_jurisdictions(
    State(app_state): State<AppState>,
    Query(query): Query<JurisdictionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let jurisdictions = app_state.jurisdiction_service.list(query.include_inactive).await?;
    Ok(data(jurisdictions))
}

#[utoipa::path(
    get,
    path = "/api/v1/jurisdictions/{id}",
    tag = "Jurisdictions",
    params(("id" = Uuid, Path, description = "ID de la jurisdicción")),
    responses(
        (status = 200, description = "Jurisdicción", body = Jurisdiction),
        (status = 404, description = "No encontrada")
    )
)]
pub async fn get_jurisdiction(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.jurisdiction_service.get(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/jurisdictions/code/{code}",
    tag = "Jurisdictions",
    params(("code" = String, Path, description = "Código, ej. ar-santa-fe-rosario")),
    responses(
        (status = 200, description = "Jurisdicción", body = Jurisdiction),
        (status = 404, description = "No encontrada")
    )
)]
pub async fn get_jurisdiction_by_code(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.jurisdiction_service.get_by_code(&code).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/jurisdictions",
    tag = "Jurisdictions",
    request_body = CreateJurisdictionPayload,
    responses(
        (status = 201, description = "Jurisdicción creada", body = Jurisdiction),
        (status = 403, description = "Solo administradores de la plataforma"),
        (status = 409, description = "Código duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_jurisdiction(
    State(app_state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Json(payload): Json<CreateJurisdictionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let jurisdiction = app_state.jurisdiction_service.create(admin.id, &payload).await?;
    Ok((StatusCode::CREATED, data(jurisdiction)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/jurisdictions/{id}",
    tag = "Jurisdictions",
    params(("id" = Uuid, Path, description = "ID de la jurisdicción")),
    request_body = UpdateJurisdictionPayload,
    responses((status = 200, description = "Jurisdicción actualizada", body = Jurisdiction)),
    security(("api_jwt" = []))
)]
pub async fn update_jurisdiction(
    State(app_state): State<AppState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJurisdictionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(data(app_state.jurisdiction_service.update(admin.id, id, &payload).await?))
}
