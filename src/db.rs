pub mod repository;
pub use repository::*;

pub mod audit_repo;
pub mod document_repo;
pub mod jurisdiction_repo;
pub mod obligation_repo;
pub mod review_repo;
pub mod task_repo;
pub mod template_repo;
pub mod tenancy_repo;
pub mod user_repo;

#[cfg(test)]
pub mod memory;

use sqlx::PgPool;
use std::sync::Arc;

use crate::common::error::AppError;

/// Todos os repositórios, já como trait objects, prontos para injetar nos serviços.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub auth_tokens: Arc<dyn AuthTokenRepository>,
    pub jurisdictions: Arc<dyn JurisdictionRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub organizations: Arc<dyn OrganizationRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub obligations: Arc<dyn ObligationRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(user_repo::PgUserRepository::new(pool.clone())),
            auth_tokens: Arc::new(user_repo::PgAuthTokenRepository::new(pool.clone())),
            jurisdictions: Arc::new(jurisdiction_repo::PgJurisdictionRepository::new(pool.clone())),
            templates: Arc::new(template_repo::PgTemplateRepository::new(pool.clone())),
            organizations: Arc::new(tenancy_repo::PgOrganizationRepository::new(pool.clone())),
            memberships: Arc::new(tenancy_repo::PgMembershipRepository::new(pool.clone())),
            locations: Arc::new(tenancy_repo::PgLocationRepository::new(pool.clone())),
            invitations: Arc::new(tenancy_repo::PgInvitationRepository::new(pool.clone())),
            obligations: Arc::new(obligation_repo::PgObligationRepository::new(pool.clone())),
            tasks: Arc::new(task_repo::PgTaskRepository::new(pool.clone())),
            documents: Arc::new(document_repo::PgDocumentRepository::new(pool.clone())),
            reviews: Arc::new(review_repo::PgReviewRepository::new(pool.clone())),
            audit: Arc::new(audit_repo::PgAuditRepository::new(pool)),
        }
    }

    /// Um único `MemoryStore` compartilhado por todos os traits.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            auth_tokens: store.clone(),
            jurisdictions: store.clone(),
            templates: store.clone(),
            organizations: store.clone(),
            memberships: store.clone(),
            locations: store.clone(),
            invitations: store.clone(),
            obligations: store.clone(),
            tasks: store.clone(),
            documents: store.clone(),
            reviews: store.clone(),
            audit: store,
        }
    }
}

/// Violação de UNIQUE vira Conflict com a mensagem dada; o resto segue como erro de banco.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    err.into()
}
