// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    common::{error::AppError, response::data},
    config::AppState,
    middleware::rbac::{Reporters, RequireRole},
    models::{
        dashboard::ComplianceReport,
        obligation::{ObligationQuery, ObligationView},
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/reports/compliance",
    tag = "Reports",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses((status = 200, description = "Resumen de cumplimiento", body = ComplianceReport)),
    security(("api_jwt" = []))
)]
pub async fn compliance_report(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Reporters>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.report_service.compliance(&ctx.organization).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/reports/obligations",
    tag = "Reports",
    params(("organization_id" = Uuid, Path, description = "ID de la organización"), ObligationQuery),
    responses((status = 200, description = "Obligaciones filtradas, sin paginar", body = Vec<ObligationView>)),
    security(("api_jwt" = []))
)]
pub async fn obligations_report(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Reporters>,
    Query(query): Query<ObligationQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(
        app_state
            .report_service
            .obligations(&ctx.organization, &query.filter())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/reports/export/csv",
    tag = "Reports",
    params(("organization_id" = Uuid, Path, description = "ID de la organización"), ObligationQuery),
    responses((status = 200, description = "Planilla CSV", content_type = "text/csv", body = String)),
    security(("api_jwt" = []))
)]
pub async fn export_csv(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Reporters>,
    Query(query): Query<ObligationQuery>,
) -> Result<Response, AppError> {
    let csv = app_state
        .report_service
        .export_csv(&ctx.organization, &query.filter())
        .await?;

    // Configura os Headers para o navegador baixar o arquivo
    let filename = format!(
        "obligaciones_{}_{}.csv",
        ctx.organization.cuit,
        app_state.clock.today().format("%Y%m%d")
    );
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];

    Ok((headers, csv).into_response())
}
