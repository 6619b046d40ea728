// src/handlers/documents.rs

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
    middleware::tenancy::OrgContext,
    models::document::{
        Document, DocumentQuery, DocumentView, RegisterDocumentPayload, RequestUploadUrlPayload, UploadUrlResponse,
    },
};

// Fluxo de upload: 1) pede a URL pré-assinada, 2) o cliente envia o arquivo
// direto ao storage, 3) registra os metadados para conferência.

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/documents/upload-url",
    tag = "Documents",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = RequestUploadUrlPayload,
    responses(
        (status = 200, description = "URL de subida pre-firmada", body = UploadUrlResponse),
        (status = 400, description = "Tipo de archivo no permitido o demasiado grande")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_upload_url(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Json(payload): Json<RequestUploadUrlPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state
        .document_service
        .request_upload_url(&ctx.organization, &payload)
        .await?;
    Ok(data(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/documents",
    tag = "Documents",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = RegisterDocumentPayload,
    responses(
        (status = 201, description = "Documento registrado", body = DocumentView),
        (status = 400, description = "Archivo inexistente, demasiado grande o de contenido no permitido")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_document(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Json(payload): Json<RegisterDocumentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let document = app_state
        .document_service
        .register(&ctx.organization, ctx.user_id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, data(document)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/documents",
    tag = "Documents",
    params(("organization_id" = Uuid, Path, description = "ID de la organización"), DocumentQuery),
    responses((status = 200, description = "Documentos paginados", body = Vec<Document>)),
    security(("api_jwt" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<DocumentQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.document_service.list(&ctx.organization, &query).await?;
    Ok(paginated(page, query.page_params()))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/documents/{id}",
    tag = "Documents",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID del documento")
    ),
    responses(
        (status = 200, description = "Documento con URL de descarga", body = DocumentView),
        (status = 404, description = "No encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_document(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.document_service.get(&ctx.organization, id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}/documents/{id}",
    tag = "Documents",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID del documento")
    ),
    responses((status = 204, description = "Documento eliminado")),
    security(("api_jwt" = []))
)]
pub async fn delete_document(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .document_service
        .delete(&ctx.organization, ctx.user_id(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
