// src/db/repository.rs

// Contratos de acesso a dados. Os serviços só conhecem estes traits;
// as implementações Postgres vivem nos `*_repo.rs` e a de memória em `memory.rs`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{Page, PageParams},
    },
    models::{
        audit::{AuditEvent, AuditQuery},
        auth::{AuthToken, TokenKind, User},
        document::{Document, DocumentQuery},
        jurisdiction::Jurisdiction,
        obligation::{Obligation, ObligationFilter},
        review::Review,
        task::{Task, TaskItem, TaskQuery},
        template::{ObligationTemplate, TemplateChecklistItem, TemplateFilter},
        tenancy::{
            Invitation, InvitationStatus, Location, MemberDetail, MemberRole, Membership,
            Organization, OrganizationWithRole,
        },
    },
};

pub type RepoResult<T> = Result<T, AppError>;

// ---
// Identidade
// ---

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// E-mail duplicado => Conflict.
    async fn insert(&self, user: &User) -> RepoResult<User>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>>;
    async fn update_password(&self, id: Uuid, password_hash: &str, at: DateTime<Utc>) -> RepoResult<()>;
}

#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    async fn insert(&self, token: &AuthToken) -> RepoResult<()>;
    async fn find(&self, id: Uuid) -> RepoResult<Option<AuthToken>>;
    /// Consome o token só se ainda não foi usado; `false` indica reuso.
    async fn mark_used(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<bool>;
    async fn revoke_all(&self, user_id: Uuid, kind: TokenKind, at: DateTime<Utc>) -> RepoResult<u64>;
}

// ---
// Catálogo
// ---

#[async_trait]
pub trait JurisdictionRepository: Send + Sync {
    /// Código duplicado => Conflict.
    async fn insert(&self, jurisdiction: &Jurisdiction) -> RepoResult<Jurisdiction>;
    async fn update(&self, jurisdiction: &Jurisdiction) -> RepoResult<Jurisdiction>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Jurisdiction>>;
    async fn find_by_code(&self, code: &str) -> RepoResult<Option<Jurisdiction>>;
    async fn list(&self, include_inactive: bool) -> RepoResult<Vec<Jurisdiction>>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Template + checklist numa transação; chave duplicada => Conflict.
    async fn insert(
        &self,
        template: &ObligationTemplate,
        checklist: &[TemplateChecklistItem],
    ) -> RepoResult<ObligationTemplate>;
    /// Quando `checklist` é `Some`, o checklist anterior é substituído inteiro.
    async fn update(
        &self,
        template: &ObligationTemplate,
        checklist: Option<&[TemplateChecklistItem]>,
    ) -> RepoResult<ObligationTemplate>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ObligationTemplate>>;
    async fn checklist(&self, template_id: Uuid) -> RepoResult<Vec<TemplateChecklistItem>>;
    async fn list(&self, filter: &TemplateFilter, page: PageParams) -> RepoResult<Page<ObligationTemplate>>;
    async fn list_active_for(&self, jurisdiction_id: Uuid, rubric: &str) -> RepoResult<Vec<ObligationTemplate>>;
    async fn list_rubrics(&self, jurisdiction_id: Option<Uuid>) -> RepoResult<Vec<String>>;
}

// ---
// Tenancy
// ---

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Organização + membership Owner numa transação; CUIT duplicado => Conflict.
    async fn create_with_owner(&self, organization: &Organization, owner: &Membership) -> RepoResult<Organization>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Organization>>;
    async fn update(&self, organization: &Organization) -> RepoResult<Organization>;
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<OrganizationWithRole>>;
    async fn list_active(&self) -> RepoResult<Vec<Organization>>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn find(&self, organization_id: Uuid, user_id: Uuid) -> RepoResult<Option<Membership>>;
    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<MemberDetail>>;
    async fn list_with_role(&self, organization_id: Uuid, role: MemberRole) -> RepoResult<Vec<Membership>>;
    async fn count_with_role(&self, organization_id: Uuid, role: MemberRole) -> RepoResult<i64>;
    async fn update_role(&self, organization_id: Uuid, user_id: Uuid, role: MemberRole) -> RepoResult<()>;
    async fn delete(&self, organization_id: Uuid, user_id: Uuid) -> RepoResult<bool>;
}

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn insert(&self, location: &Location) -> RepoResult<Location>;
    async fn update(&self, location: &Location) -> RepoResult<Location>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Location>>;
    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<Location>>;
    /// Existe outro local ativo com o mesmo nome (sem diferenciar maiúsculas)?
    async fn active_name_taken(&self, organization_id: Uuid, name: &str, except: Option<Uuid>) -> RepoResult<bool>;
}

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn insert(&self, invitation: &Invitation) -> RepoResult<Invitation>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Invitation>>;
    async fn find_by_token_hash(&self, token_hash: &str) -> RepoResult<Option<Invitation>>;
    async fn find_pending_for_email(&self, organization_id: Uuid, email: &str) -> RepoResult<Option<Invitation>>;
    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<Invitation>>;
    async fn set_status(&self, id: Uuid, status: InvitationStatus) -> RepoResult<()>;
    /// Cria a membership e marca o convite como aceito numa transação.
    async fn accept(&self, invitation_id: Uuid, membership: &Membership, at: DateTime<Utc>) -> RepoResult<()>;
}

// ---
// Obrigações e tarefas
// ---

/// Tarefa de checklist criada junto com a obrigação.
pub struct NewChecklistTask<'a> {
    pub task: &'a Task,
    pub items: &'a [TaskItem],
}

#[async_trait]
pub trait ObligationRepository: Send + Sync {
    /// Obrigação + tarefa de checklist opcional numa transação.
    async fn insert(&self, obligation: &Obligation, checklist: Option<NewChecklistTask<'_>>) -> RepoResult<Obligation>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Obligation>>;
    /// Ordenado por vencimento ascendente.
    async fn list(&self, organization_id: Uuid, filter: &ObligationFilter, page: PageParams) -> RepoResult<Page<Obligation>>;
    async fn list_all(&self, organization_id: Uuid, filter: &ObligationFilter) -> RepoResult<Vec<Obligation>>;
    async fn update(&self, obligation: &Obligation) -> RepoResult<Obligation>;
    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool>;
    async fn titles(&self, organization_id: Uuid, location_id: Option<Uuid>) -> RepoResult<Vec<String>>;
    /// Pending/InProgress com vencimento antes de `today` viram Overdue.
    async fn mark_overdue(&self, today: NaiveDate, at: DateTime<Utc>) -> RepoResult<u64>;
    /// requires_review, não terminal e sem revisão aprovada.
    async fn list_pending_review(&self, organization_id: Uuid) -> RepoResult<Vec<Obligation>>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &Task, items: &[TaskItem]) -> RepoResult<Task>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Task>>;
    async fn list(&self, organization_id: Uuid, query: &TaskQuery) -> RepoResult<Vec<Task>>;
    async fn update(&self, task: &Task) -> RepoResult<Task>;
    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool>;
    async fn items(&self, task_ids: &[Uuid]) -> RepoResult<Vec<TaskItem>>;
    async fn insert_item(&self, item: &TaskItem) -> RepoResult<TaskItem>;
    async fn find_item(&self, task_id: Uuid, item_id: Uuid) -> RepoResult<Option<TaskItem>>;
    async fn update_item(&self, item: &TaskItem) -> RepoResult<TaskItem>;
    async fn delete_item(&self, task_id: Uuid, item_id: Uuid) -> RepoResult<bool>;
}

// ---
// Evidências, revisões e auditoria
// ---

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: &Document) -> RepoResult<Document>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Document>>;
    async fn list(&self, organization_id: Uuid, query: &DocumentQuery, page: PageParams) -> RepoResult<Page<Document>>;
    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool>;
    async fn count_for_obligation(&self, obligation_id: Uuid) -> RepoResult<i64>;
    /// Quantidade de documentos por obrigação da organização.
    async fn evidence_counts(&self, organization_id: Uuid) -> RepoResult<HashMap<Uuid, i64>>;
    async fn list_created_before(&self, organization_id: Uuid, cutoff: DateTime<Utc>) -> RepoResult<Vec<Document>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(&self, review: &Review) -> RepoResult<Review>;
    /// Mais recentes primeiro.
    async fn list_for_obligation(&self, organization_id: Uuid, obligation_id: Uuid) -> RepoResult<Vec<Review>>;
    async fn has_approved(&self, obligation_id: Uuid) -> RepoResult<bool>;
    async fn latest(&self, obligation_id: Uuid) -> RepoResult<Option<Review>>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert(&self, event: &AuditEvent) -> RepoResult<()>;
    /// Mais recentes primeiro.
    async fn list(&self, organization_id: Uuid, query: &AuditQuery, page: PageParams) -> RepoResult<Page<AuditEvent>>;
}
