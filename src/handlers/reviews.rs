// src/handlers/reviews.rs

use axum::{
    extract::{Path, State},
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
        rbac::{RequireRole, Reviewers},
        tenancy::OrgContext,
    },
    models::review::{CreateReviewPayload, PendingReview, Review},
};

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/reviews",
    tag = "Reviews",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = CreateReviewPayload,
    responses(
        (status = 201, description = "Revisión registrada", body = Review),
        (status = 400, description = "Rechazo sin comentario u obligación sin revisión")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_review(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Reviewers>,
    Json(payload): Json<CreateReviewPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let review = app_state
        .review_service
        .create(&ctx.organization, &ctx.membership, &payload)
        .await?;
    Ok((StatusCode::CREATED, data(review)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/reviews/pending",
    tag = "Reviews",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses((status = 200, description = "Obligaciones esperando aprobación", body = Vec<PendingReview>)),
    security(("api_jwt" = []))
)]
pub async fn list_pending_reviews(
    State(app_state): State<AppState>,
    ctx: OrgContext,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.review_service.list_pending(&ctx.organization).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/obligations/{id}/reviews",
    tag = "Reviews",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la obligación")
    ),
    responses((status = 200, description = "Historial de revisiones, la más reciente primero", body = Vec<Review>)),
    security(("api_jwt" = []))
)]
pub async fn list_obligation_reviews(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Path((_organization_id, obligation_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(
        app_state
            .review_service
            .list_for_obligation(&ctx.organization, obligation_id)
            .await?,
    ))
}
