// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::{error::AppError, response::data},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::{
            AcceptInvitationPayload, AuthResponse, ChangePasswordPayload, ForgotPasswordPayload,
            LoginUserPayload, RefreshTokenPayload, RegisterUserPayload, ResetPasswordPayload, User,
        },
        tenancy::Membership,
    },
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuario registrado", body = AuthResponse),
        (status = 400, description = "Datos inválidos"),
        (status = 409, description = "E-mail ya registrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state.auth_service.register(&payload).await?;
    Ok((StatusCode::CREATED, data(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Sesión iniciada", body = AuthResponse),
        (status = 401, description = "Credenciales inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state.auth_service.login(&payload.email, &payload.password).await?;
    Ok(data(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses(
        (status = 200, description = "Nuevo par de tokens", body = AuthResponse),
        (status = 401, description = "Refresh token inválido, vencido o reutilizado")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(data(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses((status = 204, description = "Refresh token revocado")),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    app_state.auth_service.logout(&user, &payload.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Usuario autenticado", body = User)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    data(user)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordPayload,
    responses(
        (status = 204, description = "Contraseña actualizada"),
        (status = 400, description = "Contraseña actual incorrecta")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    app_state
        .auth_service
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// Sempre 200: não revela se o e-mail existe
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordPayload,
    responses((status = 200, description = "Si el e-mail existe, se envió un enlace"))
)]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    app_state.auth_service.forgot_password(&payload.email).await?;
    Ok(data(serde_json::json!({
        "message": "Si el e-mail está registrado, vas a recibir instrucciones para restablecer la contraseña."
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 204, description = "Contraseña restablecida"),
        (status = 400, description = "Token inválido o vencido")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    app_state.auth_service.reset_password(&payload.token, &payload.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/accept-invitation",
    tag = "Auth",
    request_body = AcceptInvitationPayload,
    responses(
        (status = 200, description = "Ahora sos miembro de la organización", body = Membership),
        (status = 400, description = "Invitación vencida o ya utilizada"),
        (status = 403, description = "La invitación es para otro e-mail")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<AcceptInvitationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let membership = app_state.tenancy_service.accept_invitation(&user, &payload.token).await?;
    Ok(data(membership))
}
