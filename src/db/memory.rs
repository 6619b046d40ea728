// src/db/memory.rs

// Implementação em memória de todos os repositórios, usada pelos testes de serviço.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{Page, PageParams},
    },
    db::*,
    models::{
        audit::{AuditEvent, AuditQuery},
        auth::{AuthToken, TokenKind, User},
        document::{Document, DocumentQuery},
        jurisdiction::Jurisdiction,
        obligation::{Obligation, ObligationFilter, ObligationStatus},
        review::{Review, ReviewStatus},
        task::{Task, TaskItem, TaskQuery},
        template::{ObligationTemplate, TemplateChecklistItem, TemplateFilter},
        tenancy::{
            Invitation, InvitationStatus, Location, MemberDetail, MemberRole, Membership,
            Organization, OrganizationWithRole,
        },
    },
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    auth_tokens: Vec<AuthToken>,
    jurisdictions: Vec<Jurisdiction>,
    templates: Vec<ObligationTemplate>,
    checklist_items: Vec<TemplateChecklistItem>,
    organizations: Vec<Organization>,
    memberships: Vec<Membership>,
    locations: Vec<Location>,
    invitations: Vec<Invitation>,
    obligations: Vec<Obligation>,
    tasks: Vec<Task>,
    task_items: Vec<TaskItem>,
    documents: Vec<Document>,
    reviews: Vec<Review>,
    audit: Vec<AuditEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: PageParams) -> Page<T> {
    Page { total: items.len() as i64, items: page.slice(&items) }
}

fn missing(entity: &str) -> AppError {
    AppError::not_found(entity)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> RepoResult<User> {
        let mut s = self.lock();
        if s.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("El e-mail ya está registrado.".into()));
        }
        s.users.push(user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        Ok(self.lock().users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str, at: DateTime<Utc>) -> RepoResult<()> {
        let mut s = self.lock();
        let user = s.users.iter_mut().find(|u| u.id == id).ok_or_else(|| missing("Usuario"))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl AuthTokenRepository for MemoryStore {
    async fn insert(&self, token: &AuthToken) -> RepoResult<()> {
        self.lock().auth_tokens.push(token.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<AuthToken>> {
        Ok(self.lock().auth_tokens.iter().find(|t| t.id == id).cloned())
    }

    async fn mark_used(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<bool> {
        let mut s = self.lock();
        match s.auth_tokens.iter_mut().find(|t| t.id == id && t.used_at.is_none()) {
            Some(token) => {
                token.used_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all(&self, user_id: Uuid, kind: TokenKind, at: DateTime<Utc>) -> RepoResult<u64> {
        let mut s = self.lock();
        let mut count = 0;
        for t in s.auth_tokens.iter_mut().filter(|t| t.user_id == user_id && t.kind == kind && t.used_at.is_none()) {
            t.used_at = Some(at);
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl JurisdictionRepository for MemoryStore {
    async fn insert(&self, j: &Jurisdiction) -> RepoResult<Jurisdiction> {
        let mut s = self.lock();
        if s.jurisdictions.iter().any(|x| x.code == j.code) {
            return Err(AppError::Conflict("Ya existe una jurisdicción con ese código.".into()));
        }
        s.jurisdictions.push(j.clone());
        Ok(j.clone())
    }

    async fn update(&self, j: &Jurisdiction) -> RepoResult<Jurisdiction> {
        let mut s = self.lock();
        let slot = s.jurisdictions.iter_mut().find(|x| x.id == j.id).ok_or_else(|| missing("Jurisdicción"))?;
        *slot = j.clone();
        Ok(j.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Jurisdiction>> {
        Ok(self.lock().jurisdictions.iter().find(|j| j.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> RepoResult<Option<Jurisdiction>> {
        Ok(self.lock().jurisdictions.iter().find(|j| j.code == code).cloned())
    }

    async fn list(&self, include_inactive: bool) -> RepoResult<Vec<Jurisdiction>> {
        let mut list: Vec<Jurisdiction> = self
            .lock()
            .jurisdictions
            .iter()
            .filter(|j| include_inactive || j.is_active)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(list)
    }
}

#[async_trait]
impl TemplateRepository for MemoryStore {
    async fn insert(&self, t: &ObligationTemplate, checklist: &[TemplateChecklistItem]) -> RepoResult<ObligationTemplate> {
        let mut s = self.lock();
        if s.templates.iter().any(|x| x.template_key == t.template_key) {
            return Err(AppError::Conflict("Ya existe un template con esa clave.".into()));
        }
        s.templates.push(t.clone());
        s.checklist_items.extend_from_slice(checklist);
        Ok(t.clone())
    }

    async fn update(&self, t: &ObligationTemplate, checklist: Option<&[TemplateChecklistItem]>) -> RepoResult<ObligationTemplate> {
        let mut s = self.lock();
        let slot = s.templates.iter_mut().find(|x| x.id == t.id).ok_or_else(|| missing("Template"))?;
        *slot = t.clone();
        if let Some(items) = checklist {
            s.checklist_items.retain(|i| i.template_id != t.id);
            s.checklist_items.extend_from_slice(items);
        }
        Ok(t.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ObligationTemplate>> {
        Ok(self.lock().templates.iter().find(|t| t.id == id).cloned())
    }

    async fn checklist(&self, template_id: Uuid) -> RepoResult<Vec<TemplateChecklistItem>> {
        let mut items: Vec<_> = self
            .lock()
            .checklist_items
            .iter()
            .filter(|i| i.template_id == template_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.position);
        Ok(items)
    }

    async fn list(&self, filter: &TemplateFilter, page: PageParams) -> RepoResult<Page<ObligationTemplate>> {
        let mut items: Vec<_> = self.lock().templates.iter().filter(|t| filter.matches(t)).cloned().collect();
        items.sort_by(|a, b| (&a.rubric, &a.title).cmp(&(&b.rubric, &b.title)));
        Ok(page_of(items, page))
    }

    async fn list_active_for(&self, jurisdiction_id: Uuid, rubric: &str) -> RepoResult<Vec<ObligationTemplate>> {
        let mut items: Vec<_> = self
            .lock()
            .templates
            .iter()
            .filter(|t| t.jurisdiction_id == jurisdiction_id && t.rubric == rubric && t.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(items)
    }

    async fn list_rubrics(&self, jurisdiction_id: Option<Uuid>) -> RepoResult<Vec<String>> {
        let mut rubrics: Vec<String> = self
            .lock()
            .templates
            .iter()
            .filter(|t| t.is_active && jurisdiction_id.is_none_or(|j| t.jurisdiction_id == j))
            .map(|t| t.rubric.clone())
            .collect();
        rubrics.sort();
        rubrics.dedup();
        Ok(rubrics)
    }
}

#[async_trait]
impl OrganizationRepository for MemoryStore {
    async fn create_with_owner(&self, org: &Organization, owner: &Membership) -> RepoResult<Organization> {
        let mut s = self.lock();
        if s.organizations.iter().any(|o| o.cuit == org.cuit) {
            return Err(AppError::Conflict("Ya existe una organización con ese CUIT.".into()));
        }
        s.organizations.push(org.clone());
        s.memberships.push(owner.clone());
        Ok(org.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Organization>> {
        Ok(self.lock().organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn update(&self, org: &Organization) -> RepoResult<Organization> {
        let mut s = self.lock();
        let slot = s.organizations.iter_mut().find(|o| o.id == org.id).ok_or_else(|| missing("Organización"))?;
        *slot = org.clone();
        Ok(org.clone())
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<OrganizationWithRole>> {
        let s = self.lock();
        let mut list: Vec<OrganizationWithRole> = s
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                s.organizations
                    .iter()
                    .find(|o| o.id == m.organization_id && o.is_active)
                    .map(|o| OrganizationWithRole { organization: o.clone(), role: m.role })
            })
            .collect();
        list.sort_by(|a, b| a.organization.name.cmp(&b.organization.name));
        Ok(list)
    }

    async fn list_active(&self) -> RepoResult<Vec<Organization>> {
        Ok(self.lock().organizations.iter().filter(|o| o.is_active).cloned().collect())
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn find(&self, organization_id: Uuid, user_id: Uuid) -> RepoResult<Option<Membership>> {
        Ok(self
            .lock()
            .memberships
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<MemberDetail>> {
        let s = self.lock();
        Ok(s.memberships
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .filter_map(|m| {
                s.users.iter().find(|u| u.id == m.user_id).map(|u| MemberDetail {
                    user_id: u.id,
                    email: u.email.clone(),
                    full_name: u.full_name.clone(),
                    role: m.role,
                    joined_at: m.created_at,
                })
            })
            .collect())
    }

    async fn list_with_role(&self, organization_id: Uuid, role: MemberRole) -> RepoResult<Vec<Membership>> {
        Ok(self
            .lock()
            .memberships
            .iter()
            .filter(|m| m.organization_id == organization_id && m.role == role)
            .cloned()
            .collect())
    }

    async fn count_with_role(&self, organization_id: Uuid, role: MemberRole) -> RepoResult<i64> {
        Ok(self
            .lock()
            .memberships
            .iter()
            .filter(|m| m.organization_id == organization_id && m.role == role)
            .count() as i64)
    }

    async fn update_role(&self, organization_id: Uuid, user_id: Uuid, role: MemberRole) -> RepoResult<()> {
        let mut s = self.lock();
        if let Some(m) = s
            .memberships
            .iter_mut()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
        {
            m.role = role;
        }
        Ok(())
    }

    async fn delete(&self, organization_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut s = self.lock();
        let before = s.memberships.len();
        s.memberships.retain(|m| !(m.organization_id == organization_id && m.user_id == user_id));
        Ok(s.memberships.len() < before)
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn insert(&self, l: &Location) -> RepoResult<Location> {
        self.lock().locations.push(l.clone());
        Ok(l.clone())
    }

    async fn update(&self, l: &Location) -> RepoResult<Location> {
        let mut s = self.lock();
        let slot = s
            .locations
            .iter_mut()
            .find(|x| x.id == l.id && x.organization_id == l.organization_id)
            .ok_or_else(|| missing("Local"))?;
        *slot = l.clone();
        Ok(l.clone())
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Location>> {
        Ok(self
            .lock()
            .locations
            .iter()
            .find(|l| l.organization_id == organization_id && l.id == id)
            .cloned())
    }

    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<Location>> {
        Ok(self.lock().locations.iter().filter(|l| l.organization_id == organization_id).cloned().collect())
    }

    async fn active_name_taken(&self, organization_id: Uuid, name: &str, except: Option<Uuid>) -> RepoResult<bool> {
        let name = name.to_lowercase();
        Ok(self.lock().locations.iter().any(|l| {
            l.organization_id == organization_id
                && l.is_active
                && l.name.to_lowercase() == name
                && except != Some(l.id)
        }))
    }
}

#[async_trait]
impl InvitationRepository for MemoryStore {
    async fn insert(&self, i: &Invitation) -> RepoResult<Invitation> {
        self.lock().invitations.push(i.clone());
        Ok(i.clone())
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Invitation>> {
        Ok(self
            .lock()
            .invitations
            .iter()
            .find(|i| i.organization_id == organization_id && i.id == id)
            .cloned())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> RepoResult<Option<Invitation>> {
        Ok(self.lock().invitations.iter().find(|i| i.token_hash == token_hash).cloned())
    }

    async fn find_pending_for_email(&self, organization_id: Uuid, email: &str) -> RepoResult<Option<Invitation>> {
        Ok(self
            .lock()
            .invitations
            .iter()
            .find(|i| i.organization_id == organization_id && i.email == email && i.status == InvitationStatus::Pending)
            .cloned())
    }

    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<Invitation>> {
        Ok(self.lock().invitations.iter().filter(|i| i.organization_id == organization_id).cloned().collect())
    }

    async fn set_status(&self, id: Uuid, status: InvitationStatus) -> RepoResult<()> {
        let mut s = self.lock();
        if let Some(i) = s.invitations.iter_mut().find(|i| i.id == id) {
            i.status = status;
        }
        Ok(())
    }

    async fn accept(&self, invitation_id: Uuid, membership: &Membership, at: DateTime<Utc>) -> RepoResult<()> {
        let mut s = self.lock();
        if s
            .memberships
            .iter()
            .any(|m| m.organization_id == membership.organization_id && m.user_id == membership.user_id)
        {
            return Err(AppError::Conflict("Ya sos miembro de esta organización.".into()));
        }
        s.memberships.push(membership.clone());
        if let Some(i) = s.invitations.iter_mut().find(|i| i.id == invitation_id) {
            i.status = InvitationStatus::Accepted;
            i.accepted_at = Some(at);
        }
        Ok(())
    }
}

fn sort_by_due(items: &mut [Obligation]) {
    items.sort_by(|a, b| (a.due_date, &a.title).cmp(&(b.due_date, &b.title)));
}

#[async_trait]
impl ObligationRepository for MemoryStore {
    async fn insert(&self, o: &Obligation, checklist: Option<NewChecklistTask<'_>>) -> RepoResult<Obligation> {
        let mut s = self.lock();
        s.obligations.push(o.clone());
        if let Some(NewChecklistTask { task, items }) = checklist {
            s.tasks.push(task.clone());
            s.task_items.extend_from_slice(items);
        }
        Ok(o.clone())
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Obligation>> {
        Ok(self
            .lock()
            .obligations
            .iter()
            .find(|o| o.organization_id == organization_id && o.id == id)
            .cloned())
    }

    async fn list(&self, organization_id: Uuid, filter: &ObligationFilter, page: PageParams) -> RepoResult<Page<Obligation>> {
        let mut items = self.list_all(organization_id, filter).await?;
        sort_by_due(&mut items);
        Ok(page_of(items, page))
    }

    async fn list_all(&self, organization_id: Uuid, filter: &ObligationFilter) -> RepoResult<Vec<Obligation>> {
        let mut items: Vec<_> = self
            .lock()
            .obligations
            .iter()
            .filter(|o| o.organization_id == organization_id && filter.matches(o))
            .cloned()
            .collect();
        sort_by_due(&mut items);
        Ok(items)
    }

    async fn update(&self, o: &Obligation) -> RepoResult<Obligation> {
        let mut s = self.lock();
        let slot = s
            .obligations
            .iter_mut()
            .find(|x| x.id == o.id && x.organization_id == o.organization_id)
            .ok_or_else(|| missing("Obligación"))?;
        *slot = o.clone();
        Ok(o.clone())
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let mut s = self.lock();
        let before = s.obligations.len();
        s.obligations.retain(|o| !(o.organization_id == organization_id && o.id == id));
        let removed = s.obligations.len() < before;
        if removed {
            let task_ids: Vec<Uuid> = s.tasks.iter().filter(|t| t.obligation_id == id).map(|t| t.id).collect();
            s.tasks.retain(|t| t.obligation_id != id);
            s.task_items.retain(|i| !task_ids.contains(&i.task_id));
            s.reviews.retain(|r| r.obligation_id != id);
            for d in s.documents.iter_mut().filter(|d| d.obligation_id == Some(id)) {
                d.obligation_id = None;
            }
        }
        Ok(removed)
    }

    async fn titles(&self, organization_id: Uuid, location_id: Option<Uuid>) -> RepoResult<Vec<String>> {
        Ok(self
            .lock()
            .obligations
            .iter()
            .filter(|o| o.organization_id == organization_id && o.location_id == location_id)
            .map(|o| o.title.clone())
            .collect())
    }

    async fn mark_overdue(&self, today: NaiveDate, at: DateTime<Utc>) -> RepoResult<u64> {
        let mut s = self.lock();
        let mut count = 0;
        for o in s.obligations.iter_mut().filter(|o| o.status.is_open() && o.due_date < today) {
            o.status = ObligationStatus::Overdue;
            o.updated_at = at;
            count += 1;
        }
        Ok(count)
    }

    async fn list_pending_review(&self, organization_id: Uuid) -> RepoResult<Vec<Obligation>> {
        let s = self.lock();
        let mut items: Vec<_> = s
            .obligations
            .iter()
            .filter(|o| {
                o.organization_id == organization_id
                    && o.requires_review
                    && !o.status.is_terminal()
                    && !s
                        .reviews
                        .iter()
                        .any(|r| r.obligation_id == o.id && r.status == ReviewStatus::Approved)
            })
            .cloned()
            .collect();
        sort_by_due(&mut items);
        Ok(items)
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn insert(&self, task: &Task, items: &[TaskItem]) -> RepoResult<Task> {
        let mut s = self.lock();
        s.tasks.push(task.clone());
        s.task_items.extend_from_slice(items);
        Ok(task.clone())
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Task>> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .find(|t| t.organization_id == organization_id && t.id == id)
            .cloned())
    }

    async fn list(&self, organization_id: Uuid, query: &TaskQuery) -> RepoResult<Vec<Task>> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.organization_id == organization_id && query.matches(t))
            .cloned()
            .collect())
    }

    async fn update(&self, task: &Task) -> RepoResult<Task> {
        let mut s = self.lock();
        let slot = s
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.organization_id == task.organization_id)
            .ok_or_else(|| missing("Tarea"))?;
        *slot = task.clone();
        Ok(task.clone())
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let mut s = self.lock();
        let before = s.tasks.len();
        s.tasks.retain(|t| !(t.organization_id == organization_id && t.id == id));
        let removed = s.tasks.len() < before;
        if removed {
            s.task_items.retain(|i| i.task_id != id);
        }
        Ok(removed)
    }

    async fn items(&self, task_ids: &[Uuid]) -> RepoResult<Vec<TaskItem>> {
        let mut items: Vec<_> = self
            .lock()
            .task_items
            .iter()
            .filter(|i| task_ids.contains(&i.task_id))
            .cloned()
            .collect();
        items.sort_by_key(|i| i.position);
        Ok(items)
    }

    async fn insert_item(&self, item: &TaskItem) -> RepoResult<TaskItem> {
        self.lock().task_items.push(item.clone());
        Ok(item.clone())
    }

    async fn find_item(&self, task_id: Uuid, item_id: Uuid) -> RepoResult<Option<TaskItem>> {
        Ok(self
            .lock()
            .task_items
            .iter()
            .find(|i| i.task_id == task_id && i.id == item_id)
            .cloned())
    }

    async fn update_item(&self, item: &TaskItem) -> RepoResult<TaskItem> {
        let mut s = self.lock();
        let slot = s
            .task_items
            .iter_mut()
            .find(|i| i.id == item.id && i.task_id == item.task_id)
            .ok_or_else(|| missing("Ítem"))?;
        *slot = item.clone();
        Ok(item.clone())
    }

    async fn delete_item(&self, task_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let mut s = self.lock();
        let before = s.task_items.len();
        s.task_items.retain(|i| !(i.task_id == task_id && i.id == item_id));
        Ok(s.task_items.len() < before)
    }
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn insert(&self, d: &Document) -> RepoResult<Document> {
        let mut s = self.lock();
        if s.documents.iter().any(|x| x.storage_key == d.storage_key) {
            return Err(AppError::Conflict("Este archivo ya fue registrado.".into()));
        }
        s.documents.push(d.clone());
        Ok(d.clone())
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Document>> {
        Ok(self
            .lock()
            .documents
            .iter()
            .find(|d| d.organization_id == organization_id && d.id == id)
            .cloned())
    }

    async fn list(&self, organization_id: Uuid, query: &DocumentQuery, page: PageParams) -> RepoResult<Page<Document>> {
        let mut items: Vec<_> = self
            .lock()
            .documents
            .iter()
            .filter(|d| d.organization_id == organization_id && query.matches(d))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page_of(items, page))
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let mut s = self.lock();
        let before = s.documents.len();
        s.documents.retain(|d| !(d.organization_id == organization_id && d.id == id));
        Ok(s.documents.len() < before)
    }

    async fn count_for_obligation(&self, obligation_id: Uuid) -> RepoResult<i64> {
        Ok(self.lock().documents.iter().filter(|d| d.obligation_id == Some(obligation_id)).count() as i64)
    }

    async fn evidence_counts(&self, organization_id: Uuid) -> RepoResult<HashMap<Uuid, i64>> {
        let mut counts = HashMap::new();
        for d in self.lock().documents.iter().filter(|d| d.organization_id == organization_id) {
            if let Some(obligation_id) = d.obligation_id {
                *counts.entry(obligation_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn list_created_before(&self, organization_id: Uuid, cutoff: DateTime<Utc>) -> RepoResult<Vec<Document>> {
        Ok(self
            .lock()
            .documents
            .iter()
            .filter(|d| d.organization_id == organization_id && d.created_at < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn insert(&self, r: &Review) -> RepoResult<Review> {
        self.lock().reviews.push(r.clone());
        Ok(r.clone())
    }

    async fn list_for_obligation(&self, organization_id: Uuid, obligation_id: Uuid) -> RepoResult<Vec<Review>> {
        let mut list: Vec<_> = self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.organization_id == organization_id && r.obligation_id == obligation_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn has_approved(&self, obligation_id: Uuid) -> RepoResult<bool> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .any(|r| r.obligation_id == obligation_id && r.status == ReviewStatus::Approved))
    }

    // Empate de timestamp: a inserida por último vence
    async fn latest(&self, obligation_id: Uuid) -> RepoResult<Option<Review>> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.obligation_id == obligation_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn insert(&self, e: &AuditEvent) -> RepoResult<()> {
        self.lock().audit.push(e.clone());
        Ok(())
    }

    async fn list(&self, organization_id: Uuid, query: &AuditQuery, page: PageParams) -> RepoResult<Page<AuditEvent>> {
        let mut items: Vec<_> = self
            .lock()
            .audit
            .iter()
            .filter(|e| e.organization_id == Some(organization_id) && query.matches(e))
            .cloned()
            .collect();
        items.reverse();
        Ok(page_of(items, page))
    }
}
