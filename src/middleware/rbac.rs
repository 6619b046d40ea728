// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::OrgContext,
    models::tenancy::MemberRole,
};

/// 1. O Trait que define um conjunto de papéis aceitos
pub trait RoleSet: Send + Sync + 'static {
    fn roles() -> &'static [MemberRole];
}

/// 2. O Extractor (Guardião): resolve o `OrgContext` e confere o papel.
pub struct RequireRole<T>(pub OrgContext, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleSet,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = OrgContext::from_request_parts(parts, state).await?;

        if !T::roles().contains(&ctx.membership.role) {
            tracing::debug!(
                user_id = %ctx.user.id,
                org_id = %ctx.organization.id,
                role = ?ctx.membership.role,
                "Papel sem permissão para a rota"
            );
            return Err(AppError::Forbidden("Tu rol no tiene permiso para realizar esta acción.".into()));
        }
        Ok(RequireRole(ctx, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS CONJUNTOS DE PAPÉIS (TIPOS)
// ---

/// Obrigações (escrita), aplicação de templates.
pub struct Managers;
impl RoleSet for Managers {
    fn roles() -> &'static [MemberRole] {
        &[MemberRole::Owner, MemberRole::Admin, MemberRole::Manager]
    }
}

/// Membros, convites, dados da organização.
pub struct Administrators;
impl RoleSet for Administrators {
    fn roles() -> &'static [MemberRole] {
        &[MemberRole::Owner, MemberRole::Admin]
    }
}

pub struct OwnersOnly;
impl RoleSet for OwnersOnly {
    fn roles() -> &'static [MemberRole] {
        &[MemberRole::Owner]
    }
}

/// Auditoria e relatórios.
pub struct Reporters;
impl RoleSet for Reporters {
    fn roles() -> &'static [MemberRole] {
        &[MemberRole::Owner, MemberRole::Admin, MemberRole::Accountant]
    }
}

pub struct TaskEditors;
impl RoleSet for TaskEditors {
    fn roles() -> &'static [MemberRole] {
        &[MemberRole::Owner, MemberRole::Admin, MemberRole::Manager, MemberRole::Accountant]
    }
}

pub struct Reviewers;
impl RoleSet for Reviewers {
    fn roles() -> &'static [MemberRole] {
        &crate::services::review_service::REVIEWER_ROLES
    }
}
