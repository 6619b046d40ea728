// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::request::Parts,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::User,
        tenancy::{Membership, Organization},
    },
};

// Nome do parâmetro de rota que identifica a organização
const ORGANIZATION_PARAM: &str = "organization_id";

/// Organização ativa da rota + a membership de quem chama.
/// Resolvido uma vez por requisição e guardado nos "extensions".
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub user: User,
    pub organization: Organization,
    pub membership: Membership,
}

impl OrgContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

impl<S> FromRequestParts<S> for OrgContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<OrgContext>() {
            return Ok(ctx.clone());
        }

        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::BadRequest("Ruta sin organización.".into()))?;
        let organization_id = params
            .get(ORGANIZATION_PARAM)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| AppError::BadRequest("El identificador de la organización es inválido.".into()))?;

        let app_state = AppState::from_ref(state);
        let (organization, membership) = app_state
            .tenancy_service
            .member_context(organization_id, user.id)
            .await?;

        let ctx = OrgContext { user, organization, membership };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}
