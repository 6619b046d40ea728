// src/handlers/tenancy.rs

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
        auth::AuthenticatedUser,
        rbac::{Administrators, OwnersOnly, RequireRole},
        tenancy::OrgContext,
    },
    models::tenancy::{
        CreateInvitationPayload, CreateLocationPayload, CreateOrganizationPayload, Invitation, Location,
        MemberDetail, Membership, Organization, OrganizationWithRole, UpdateLocationPayload,
        UpdateMemberRolePayload, UpdateOrganizationPayload,
    },
};

// ---
// Organizações
// ---

#[utoipa::path(
    post,
    path = "/api/v1/organizations",
    tag = "Organizations",
    request_body = CreateOrganizationPayload,
    responses(
        (status = 201, description = "Organización creada; quien la crea queda como OWNER", body = OrganizationWithRole),
        (status = 409, description = "CUIT ya registrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_organization(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrganizationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let organization = app_state.tenancy_service.create_organization(&user, &payload).await?;
    Ok((StatusCode::CREATED, data(organization)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations",
    tag = "Organizations",
    responses((status = 200, description = "Mis organizaciones con mi rol", body = Vec<OrganizationWithRole>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_organizations(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.tenancy_service.list_mine(user.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}",
    tag = "Organizations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses(
        (status = 200, description = "Organización", body = OrganizationWithRole),
        (status = 403, description = "No sos miembro")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_organization(ctx: OrgContext) -> impl IntoResponse {
    data(OrganizationWithRole { organization: ctx.organization, role: ctx.membership.role })
}

#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{organization_id}",
    tag = "Organizations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = UpdateOrganizationPayload,
    responses((status = 200, description = "Organización actualizada", body = Organization)),
    security(("api_jwt" = []))
)]
pub async fn update_organization(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
    Json(payload): Json<UpdateOrganizationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let organization = app_state
        .tenancy_service
        .update_organization(&ctx.organization, ctx.user_id(), &payload)
        .await?;
    Ok(data(organization))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}",
    tag = "Organizations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses((status = 204, description = "Organización desactivada")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_organization(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<OwnersOnly>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .tenancy_service
        .deactivate_organization(&ctx.organization, ctx.user_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Membros
// ---

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/members",
    tag = "Organizations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses((status = 200, description = "Miembros", body = Vec<MemberDetail>)),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    ctx: OrgContext,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.tenancy_service.list_members(&ctx.organization).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{organization_id}/members/{user_id}",
    tag = "Organizations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("user_id" = Uuid, Path, description = "ID del usuario")
    ),
    request_body = UpdateMemberRolePayload,
    responses(
        (status = 200, description = "Rol actualizado", body = Membership),
        (status = 403, description = "No se puede cambiar el propio rol ni dejar la organización sin OWNER")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_member_role(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
    Path((_organization_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    let membership = app_state
        .tenancy_service
        .change_member_role(&ctx.organization, &ctx.membership, user_id, payload.role)
        .await?;
    Ok(data(membership))
}

// Owner/Admin removem qualquer um; qualquer membro pode sair sozinho
#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}/members/{user_id}",
    tag = "Organizations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("user_id" = Uuid, Path, description = "ID del usuario")
    ),
    responses((status = 204, description = "Miembro eliminado")),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    State(app_state): State<AppState>,
    ctx: OrgContext,
    Path((_organization_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .tenancy_service
        .remove_member(&ctx.organization, &ctx.membership, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Locais
// ---

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/locations",
    tag = "Locations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses((status = 200, description = "Locales", body = Vec<Location>)),
    security(("api_jwt" = []))
)]
pub async fn list_locations(
    State(app_state): State<AppState>,
    ctx: OrgContext,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.tenancy_service.list_locations(&ctx.organization).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/locations",
    tag = "Locations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = CreateLocationPayload,
    responses(
        (status = 201, description = "Local creado", body = Location),
        (status = 409, description = "Ya existe un local activo con ese nombre")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_location(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
    Json(payload): Json<CreateLocationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let location = app_state
        .tenancy_service
        .create_location(&ctx.organization, ctx.user_id(), &payload)
        .await?;
    Ok((StatusCode::CREATED, data(location)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{organization_id}/locations/{id}",
    tag = "Locations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID del local")
    ),
    request_body = UpdateLocationPayload,
    responses((status = 200, description = "Local actualizado", body = Location)),
    security(("api_jwt" = []))
)]
pub async fn update_location(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateLocationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let location = app_state
        .tenancy_service
        .update_location(&ctx.organization, ctx.user_id(), id, &payload)
        .await?;
    Ok(data(location))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}/locations/{id}",
    tag = "Locations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID del local")
    ),
    responses((status = 200, description = "Local desactivado", body = Location)),
    security(("api_jwt" = []))
)]
pub async fn deactivate_location(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let location = app_state
        .tenancy_service
        .deactivate_location(&ctx.organization, ctx.user_id(), id)
        .await?;
    Ok(data(location))
}

// ---
// Convites
// ---

#[utoipa::path(
    post,
    path = "/api/v1/organizations/{organization_id}/invitations",
    tag = "Invitations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    request_body = CreateInvitationPayload,
    responses(
        (status = 201, description = "Invitación enviada", body = Invitation),
        (status = 409, description = "Ya es miembro o tiene una invitación pendiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invitation(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
    Json(payload): Json<CreateInvitationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let invitation = app_state
        .tenancy_service
        .create_invitation(&ctx.organization, &ctx.membership, &payload)
        .await?;
    Ok((StatusCode::CREATED, data(invitation)))
}

#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}/invitations",
    tag = "Invitations",
    params(("organization_id" = Uuid, Path, description = "ID de la organización")),
    responses((status = 200, description = "Invitaciones", body = Vec<Invitation>)),
    security(("api_jwt" = []))
)]
pub async fn list_invitations(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
) -> Result<impl IntoResponse, AppError> {
    Ok(data(app_state.tenancy_service.list_invitations(&ctx.organization).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}/invitations/{id}",
    tag = "Invitations",
    params(
        ("organization_id" = Uuid, Path, description = "ID de la organización"),
        ("id" = Uuid, Path, description = "ID de la invitación")
    ),
    responses(
        (status = 204, description = "Invitación cancelada"),
        (status = 400, description = "La invitación ya no está pendiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_invitation(
    State(app_state): State<AppState>,
    RequireRole(ctx, _): RequireRole<Administrators>,
    Path((_organization_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .tenancy_service
        .cancel_invitation(&ctx.organization, ctx.user_id(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
