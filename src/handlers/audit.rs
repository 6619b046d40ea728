// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    common::{error::AppError, response::paginated},
    config::AppState,
    middleware::rbac::{Reporters, RequireRole},
    models::audit::{AuditEvent, AuditQuery},
};

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/audit",
    tag = "Audit",
    params(("organization_id" = Uuid, Path, description = "ID de la organización"), AuditQuery),
    responses((status = 200, description = "Eventos de auditoría, los más recientes primero", body = Vec<AuditEvent>)),
    security(("api_jwt" = []))
)]
pub async fn list_audit_events(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Reporters>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.audit_service.list(ctx.organization.id, &query).await?;
    Ok(paginated(page, query.page_params()))
}
