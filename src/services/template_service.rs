// src/services/template_service.rs

use serde_json::json;
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError, response::Page},
    db::{NewChecklistTask, Repositories},
    models::{
        jurisdiction::Jurisdiction,
        obligation::{Obligation, ObligationStatus},
        task::{Task, TaskItem, TaskStatus},
        template::{
            normalize_rubric, ApplyTemplatesPayload, ApplyTemplatesResult, ChecklistItemPayload,
            CreateTemplatePayload, ObligationTemplate, TemplateChecklistItem, TemplateDetail, TemplateQuery,
            UpdateTemplatePayload,
        },
        tenancy::Organization,
    },
    services::{
        audit_service::{AuditEntry, AuditService},
        obligation_service::check_assignment,
    },
};

fn checklist_items(template_id: Uuid, items: &[ChecklistItemPayload]) -> Vec<TemplateChecklistItem> {
    items
        .iter()
        .enumerate()
        .map(|(position, item)| TemplateChecklistItem {
            id: Uuid::new_v4(),
            template_id,
            description: item.description.trim().to_string(),
            is_required: item.is_required,
            position: position as i32,
        })
        .collect()
}

/// Mesmo conteúdo, na mesma ordem (ids são ignorados).
fn same_checklist(current: &[TemplateChecklistItem], incoming: &[TemplateChecklistItem]) -> bool {
    current.len() == incoming.len()
        && current
            .iter()
            .zip(incoming)
            .all(|(a, b)| a.description == b.description && a.is_required == b.is_required)
}

#[derive(Clone)]
pub struct TemplateService {
    repos: Repositories,
    audit: AuditService,
    clock: Arc<dyn Clock>,
    default_jurisdiction_code: String,
}

impl TemplateService {
    pub fn new(
        repos: Repositories,
        audit: AuditService,
        clock: Arc<dyn Clock>,
        default_jurisdiction_code: String,
    ) -> Self {
        Self { repos, audit, clock, default_jurisdiction_code }
    }

    // ---
    // Catálogo
    // ---

    pub async fn list(&self, query: &TemplateQuery) -> Result<Page<ObligationTemplate>, AppError> {
        self.repos.templates.list(&query.filter(), query.page_params()).await
    }

    pub async fn get(&self, id: Uuid) -> Result<TemplateDetail, AppError> {
        let template = self.load(id).await?;
        let checklist = self.repos.templates.checklist(id).await?;
        Ok(TemplateDetail { template, checklist })
    }

    pub async fn list_rubrics(&self, jurisdiction_id: Option<Uuid>) -> Result<Vec<String>, AppError> {
        self.repos.templates.list_rubrics(jurisdiction_id).await
    }

    async fn load(&self, id: Uuid) -> Result<ObligationTemplate, AppError> {
        self.repos
            .templates
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Template"))
    }

    pub async fn create(&self, actor: Uuid, payload: &CreateTemplatePayload) -> Result<TemplateDetail, AppError> {
        self.repos
            .jurisdictions
            .find_by_id(payload.jurisdiction_id)
            .await?
            .ok_or_else(|| AppError::not_found("Jurisdicción"))?;

        let now = self.clock.now();
        let id = Uuid::new_v4();
        let checklist = checklist_items(id, &payload.checklist);
        let template = ObligationTemplate {
            id,
            jurisdiction_id: payload.jurisdiction_id,
            template_key: payload.template_key.trim().to_string(),
            title: payload.title.trim().to_string(),
            description: payload.description.clone(),
            rubric: normalize_rubric(&payload.rubric),
            obligation_type: payload.obligation_type,
            periodicity: payload.periodicity,
            requires_review: payload.requires_review,
            required_evidence_count: payload.required_evidence_count,
            severity: payload.severity,
            references: payload.references.clone(),
            version: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let template = self.repos.templates.insert(&template, &checklist).await?;

        self.audit
            .record(
                AuditEntry::new("template.created")
                    .user(actor)
                    .entity("template", template.id)
                    .meta(json!({ "templateKey": template.template_key })),
            )
            .await;
        Ok(TemplateDetail { template, checklist })
    }

    /// Qualquer mudança de conteúdo (ou do checklist) incrementa a versão;
    /// só ativar/desativar não.
    pub async fn update(
        &self,
        actor: Uuid,
        id: Uuid,
        payload: &UpdateTemplatePayload,
    ) -> Result<TemplateDetail, AppError> {
        let current = self.load(id).await?;
        let mut template = current.clone();

        if let Some(title) = &payload.title {
            template.title = title.trim().to_string();
        }
        if payload.description.is_some() {
            template.description = payload.description.clone();
        }
        if let Some(rubric) = &payload.rubric {
            template.rubric = normalize_rubric(rubric);
        }
        if let Some(obligation_type) = payload.obligation_type {
            template.obligation_type = obligation_type;
        }
        if let Some(periodicity) = payload.periodicity {
            template.periodicity = periodicity;
        }
        if let Some(requires_review) = payload.requires_review {
            template.requires_review = requires_review;
        }
        if let Some(count) = payload.required_evidence_count {
            template.required_evidence_count = count;
        }
        if let Some(severity) = payload.severity {
            template.severity = severity;
        }
        if payload.references.is_some() {
            template.references = payload.references.clone();
        }
        if let Some(active) = payload.is_active {
            template.is_active = active;
        }

        let current_checklist = self.repos.templates.checklist(id).await?;
        let new_checklist = payload.checklist.as_deref().map(|items| checklist_items(id, items));
        let checklist_changed = new_checklist
            .as_deref()
            .is_some_and(|items| !same_checklist(&current_checklist, items));

        let content_changed = template.title != current.title
            || template.description != current.description
            || template.rubric != current.rubric
            || template.obligation_type != current.obligation_type
            || template.periodicity != current.periodicity
            || template.requires_review != current.requires_review
            || template.required_evidence_count != current.required_evidence_count
            || template.severity != current.severity
            || template.references != current.references;

        if content_changed || checklist_changed {
            template.version += 1;
        }
        template.updated_at = self.clock.now();

        // Checklist só é regravado quando de fato mudou
        let replacement = if checklist_changed { new_checklist.as_deref() } else { None };
        let template = self.repos.templates.update(&template, replacement).await?;
        let checklist = match (checklist_changed, new_checklist) {
            (true, Some(items)) => items,
            _ => current_checklist,
        };

        self.audit
            .record(
                AuditEntry::new("template.updated")
                    .user(actor)
                    .entity("template", id)
                    .meta(json!({ "version": template.version })),
            )
            .await;
        Ok(TemplateDetail { template, checklist })
    }

    pub async fn deactivate(&self, actor: Uuid, id: Uuid) -> Result<ObligationTemplate, AppError> {
        let mut template = self.load(id).await?;
        template.is_active = false;
        template.updated_at = self.clock.now();
        let template = self.repos.templates.update(&template, None).await?;

        self.audit
            .record(AuditEntry::new("template.deactivated").user(actor).entity("template", id))
            .await;
        Ok(template)
    }

    // ---
    // Aplicação de rubro
    // ---

    /// Explícita > da organização > padrão do sistema.
    async fn resolve_jurisdiction(&self, org: &Organization, explicit: Option<Uuid>) -> Result<Jurisdiction, AppError> {
        let found = match explicit.or(org.jurisdiction_id) {
            Some(id) => self.repos.jurisdictions.find_by_id(id).await?,
            None => self.repos.jurisdictions.find_by_code(&self.default_jurisdiction_code).await?,
        };
        found.ok_or_else(|| AppError::not_found("Jurisdicción"))
    }

    async fn resolve_templates(
        &self,
        jurisdiction: &Jurisdiction,
        payload: &ApplyTemplatesPayload,
    ) -> Result<Vec<ObligationTemplate>, AppError> {
        let Some(ids) = &payload.template_ids else {
            return self
                .repos
                .templates
                .list_active_for(jurisdiction.id, &normalize_rubric(&payload.rubric))
                .await;
        };

        let mut templates = Vec::with_capacity(ids.len());
        for id in ids {
            match self.repos.templates.find_by_id(*id).await? {
                Some(t) if t.is_active => templates.push(t),
                Some(_) => {
                    return Err(AppError::BadRequest(format!("El template {} está inactivo.", id)));
                }
                None => return Err(AppError::not_found("Template")),
            }
        }
        Ok(templates)
    }

    /// Cria uma obrigação (e a tarefa de checklist) por template. Títulos já
    /// existentes para a organização/local são pulados; falha em um template
    /// não impede os seguintes.
    pub async fn apply_to_organization(
        &self,
        org: &Organization,
        actor: Uuid,
        payload: &ApplyTemplatesPayload,
    ) -> Result<ApplyTemplatesResult, AppError> {
        let jurisdiction = self.resolve_jurisdiction(org, payload.jurisdiction_id).await?;
        let templates = self.resolve_templates(&jurisdiction, payload).await?;
        if templates.is_empty() {
            return Err(AppError::BadRequest(format!(
                "No hay templates activos para el rubro \"{}\" en {}.",
                normalize_rubric(&payload.rubric),
                jurisdiction.name
            )));
        }

        let owner_user_id = payload.owner_user_id.unwrap_or(actor);
        check_assignment(&self.repos, org.id, payload.location_id, owner_user_id).await?;

        let mut seen: HashSet<String> = self
            .repos
            .obligations
            .titles(org.id, payload.location_id)
            .await?
            .into_iter()
            .collect();

        let today = self.clock.today();
        let mut result = ApplyTemplatesResult::default();

        for template in templates {
            if seen.contains(&template.title) {
                result.skipped_titles.push(template.title);
                continue;
            }

            match self.apply_one(org, &template, payload.location_id, owner_user_id, today).await {
                Ok((obligation_id, with_task)) => {
                    seen.insert(template.title.clone());
                    result.obligations_created += 1;
                    result.obligation_ids.push(obligation_id);
                    if with_task {
                        result.tasks_created += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, template_id = %template.id, org_id = %org.id, "Falha ao aplicar template");
                }
            }
        }

        tracing::info!(
            org_id = %org.id,
            created = result.obligations_created,
            skipped = result.skipped_titles.len(),
            "Rubro aplicado"
        );
        self.audit
            .record(
                AuditEntry::new("template.applied")
                    .org(org.id)
                    .user(actor)
                    .entity("jurisdiction", jurisdiction.id)
                    .meta(json!({
                        "rubric": normalize_rubric(&payload.rubric),
                        "obligationsCreated": result.obligations_created,
                        "tasksCreated": result.tasks_created,
                        "skippedTitles": result.skipped_titles,
                    })),
            )
            .await;
        Ok(result)
    }

    /// Devolve o id da obrigação e se uma tarefa de checklist foi criada.
    async fn apply_one(
        &self,
        org: &Organization,
        template: &ObligationTemplate,
        location_id: Option<Uuid>,
        owner_user_id: Uuid,
        today: chrono::NaiveDate,
    ) -> Result<(Uuid, bool), AppError> {
        let now = self.clock.now();
        let obligation = Obligation {
            id: Uuid::new_v4(),
            organization_id: org.id,
            location_id,
            title: template.title.clone(),
            description: template.description.clone(),
            obligation_type: template.obligation_type,
            status: ObligationStatus::Pending,
            due_date: template.periodicity.initial_due_date(today),
            recurrence_rule: template.periodicity.recurrence_rule(),
            requires_review: template.requires_review,
            required_evidence_count: template.required_evidence_count,
            owner_user_id,
            template_id: Some(template.id),
            created_at: now,
            updated_at: now,
        };

        let checklist = self.repos.templates.checklist(template.id).await?;
        if checklist.is_empty() {
            self.repos.obligations.insert(&obligation, None).await?;
            return Ok((obligation.id, false));
        }

        let task = Task {
            id: Uuid::new_v4(),
            organization_id: org.id,
            obligation_id: obligation.id,
            title: format!("Checklist: {}", template.title),
            description: None,
            assignee_user_id: Some(owner_user_id),
            status: TaskStatus::Pending,
            due_date: Some(obligation.due_date),
            created_at: now,
            updated_at: now,
        };
        let items: Vec<TaskItem> = checklist
            .iter()
            .enumerate()
            .map(|(position, item)| TaskItem {
                id: Uuid::new_v4(),
                task_id: task.id,
                description: item.description.clone(),
                done: false,
                position: position as i32,
            })
            .collect();

        self.repos
            .obligations
            .insert(&obligation, Some(NewChecklistTask { task: &task, items: &items }))
            .await?;
        Ok((obligation.id, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, Utc};
    use crate::{
        common::{clock::testing::FixedClock, response::PageParams},
        db::{ObligationRepository, RepoResult},
        models::{
            auth::User,
            obligation::{ObligationFilter, ObligationType},
            task::TaskQuery,
            template::{Periodicity, Severity},
        },
        services::test_support::{self as ts, date},
    };

    struct Fixture {
        repos: Repositories,
        svc: TemplateService,
        org: Organization,
        owner: User,
        rosario: Jurisdiction,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let clock = Arc::new(FixedClock::on(date(2025, 1, 31)));
        let audit = AuditService::new(repos.audit.clone(), clock.clone());
        let svc = TemplateService::new(repos.clone(), audit, clock, "ar-santa-fe-rosario".into());

        let now = chrono::Utc::now();
        let rosario = repos
            .jurisdictions
            .insert(&Jurisdiction {
                id: Uuid::new_v4(),
                code: "ar-santa-fe-rosario".into(),
                name: "Rosario".into(),
                country: "AR".into(),
                province: "Santa Fe".into(),
                city: Some("Rosario".into()),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let owner = ts::user(&repos, "duena@bar.com", "Dueña").await;
        let org = ts::org(&repos, &owner).await;
        Fixture { repos, svc, org, owner, rosario }
    }

    fn template(jurisdiction: Uuid, key: &str, title: &str, periodicity: Periodicity, checklist: &[&str]) -> CreateTemplatePayload {
        CreateTemplatePayload {
            jurisdiction_id: jurisdiction,
            template_key: key.into(),
            title: title.into(),
            description: Some(format!("Descripción de {}", title)),
            rubric: "Gastronomia".into(),
            obligation_type: ObligationType::Permit,
            periodicity,
            requires_review: true,
            required_evidence_count: 1,
            severity: Severity::High,
            references: None,
            checklist: checklist
                .iter()
                .map(|d| ChecklistItemPayload { description: d.to_string(), is_required: true })
                .collect(),
        }
    }

    fn apply(rubric: &str) -> ApplyTemplatesPayload {
        ApplyTemplatesPayload {
            rubric: rubric.into(),
            jurisdiction_id: None,
            template_ids: None,
            location_id: None,
            owner_user_id: None,
        }
    }

    #[tokio::test]
    async fn applying_a_rubric_creates_obligations_and_checklists() {
        let f = fixture().await;
        let admin = Uuid::new_v4();
        f.svc
            .create(admin, &template(f.rosario.id, "ros-hab", "Habilitación comercial", Periodicity::Annual, &["Plano", "Certificado de bomberos"]))
            .await
            .unwrap();
        f.svc
            .create(admin, &template(f.rosario.id, "ros-fum", "Fumigación", Periodicity::Quarterly, &[]))
            .await
            .unwrap();

        let result = f.svc.apply_to_organization(&f.org, f.owner.id, &apply(" GASTRONOMIA ")).await.unwrap();
        assert_eq!(result.obligations_created, 2);
        assert_eq!(result.tasks_created, 1);
        assert!(result.skipped_titles.is_empty());

        let obligations = f.repos.obligations.list_all(f.org.id, &ObligationFilter::default()).await.unwrap();
        let hab = obligations.iter().find(|o| o.title == "Habilitación comercial").unwrap();
        assert_eq!(hab.due_date, date(2026, 1, 31));
        assert_eq!(hab.recurrence_rule.as_deref(), Some("FREQ=YEARLY;INTERVAL=1"));
        assert_eq!(hab.status, ObligationStatus::Pending);
        assert!(hab.requires_review);
        assert_eq!(hab.required_evidence_count, 1);
        assert_eq!(hab.owner_user_id, f.owner.id);
        assert!(hab.template_id.is_some());

        let fum = obligations.iter().find(|o| o.title == "Fumigación").unwrap();
        assert_eq!(fum.due_date, date(2025, 4, 30));

        let tasks = f
            .repos
            .tasks
            .list(f.org.id, &TaskQuery { obligation_id: Some(hab.id), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Checklist: Habilitación comercial");
        let mut items = f.repos.tasks.items(&[tasks[0].id]).await.unwrap();
        items.sort_by_key(|i| i.position);
        let descriptions: Vec<_> = items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(descriptions, ["Plano", "Certificado de bomberos"]);
        assert!(items.iter().all(|i| !i.done));
    }

    #[tokio::test]
    async fn reapplying_skips_existing_titles() {
        let f = fixture().await;
        f.svc
            .create(Uuid::new_v4(), &template(f.rosario.id, "ros-hab", "Habilitación comercial", Periodicity::Annual, &[]))
            .await
            .unwrap();

        f.svc.apply_to_organization(&f.org, f.owner.id, &apply("gastronomia")).await.unwrap();
        let again = f.svc.apply_to_organization(&f.org, f.owner.id, &apply("gastronomia")).await.unwrap();
        assert_eq!(again.obligations_created, 0);
        assert_eq!(again.skipped_titles, ["Habilitación comercial"]);
    }

    #[tokio::test]
    async fn duplicate_titles_in_one_request_apply_once() {
        let f = fixture().await;
        let a = f
            .svc
            .create(Uuid::new_v4(), &template(f.rosario.id, "ros-a", "Seguro", Periodicity::Annual, &[]))
            .await
            .unwrap();
        let b = f
            .svc
            .create(Uuid::new_v4(), &template(f.rosario.id, "ros-b", "Seguro", Periodicity::Monthly, &[]))
            .await
            .unwrap();

        let mut payload = apply("gastronomia");
        payload.template_ids = Some(vec![a.template.id, b.template.id]);
        let result = f.svc.apply_to_organization(&f.org, f.owner.id, &payload).await.unwrap();
        assert_eq!(result.obligations_created, 1);
        assert_eq!(result.skipped_titles, ["Seguro"]);
    }

    // Recusa a gravação das obrigações de um template; o resto passa adiante.
    struct RejectsTemplate {
        inner: Arc<dyn ObligationRepository>,
        template_id: Uuid,
    }

    #[async_trait]
    impl ObligationRepository for RejectsTemplate {
        async fn insert(&self, obligation: &Obligation, checklist: Option<NewChecklistTask<'_>>) -> RepoResult<Obligation> {
            if obligation.template_id == Some(self.template_id) {
                return Err(AppError::InternalServerError(anyhow::anyhow!("falha de escrita")));
            }
            self.inner.insert(obligation, checklist).await
        }
        async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Obligation>> {
            self.inner.find(organization_id, id).await
        }
        async fn list(&self, organization_id: Uuid, filter: &ObligationFilter, page: PageParams) -> RepoResult<Page<Obligation>> {
            self.inner.list(organization_id, filter, page).await
        }
        async fn list_all(&self, organization_id: Uuid, filter: &ObligationFilter) -> RepoResult<Vec<Obligation>> {
            self.inner.list_all(organization_id, filter).await
        }
        async fn update(&self, obligation: &Obligation) -> RepoResult<Obligation> {
            self.inner.update(obligation).await
        }
        async fn delete(&self, organization_id: Uuid, id: Uuid) -> RepoResult<bool> {
            self.inner.delete(organization_id, id).await
        }
        async fn titles(&self, organization_id: Uuid, location_id: Option<Uuid>) -> RepoResult<Vec<String>> {
            self.inner.titles(organization_id, location_id).await
        }
        async fn mark_overdue(&self, today: NaiveDate, at: DateTime<Utc>) -> RepoResult<u64> {
            self.inner.mark_overdue(today, at).await
        }
        async fn list_pending_review(&self, organization_id: Uuid) -> RepoResult<Vec<Obligation>> {
            self.inner.list_pending_review(organization_id).await
        }
    }

    #[tokio::test]
    async fn failed_template_does_not_hide_a_later_one_with_the_same_title() {
        let f = fixture().await;
        let a = f
            .svc
            .create(Uuid::new_v4(), &template(f.rosario.id, "ros-a", "Seguro", Periodicity::Annual, &[]))
            .await
            .unwrap();
        let b = f
            .svc
            .create(Uuid::new_v4(), &template(f.rosario.id, "ros-b", "Seguro", Periodicity::Monthly, &[]))
            .await
            .unwrap();

        let mut repos = f.repos.clone();
        repos.obligations = Arc::new(RejectsTemplate { inner: f.repos.obligations.clone(), template_id: a.template.id });
        let clock = Arc::new(FixedClock::on(date(2025, 1, 31)));
        let audit = AuditService::new(repos.audit.clone(), clock.clone());
        let svc = TemplateService::new(repos, audit, clock, "ar-santa-fe-rosario".into());

        let mut payload = apply("gastronomia");
        payload.template_ids = Some(vec![a.template.id, b.template.id]);
        let result = svc.apply_to_organization(&f.org, f.owner.id, &payload).await.unwrap();
        assert_eq!(result.obligations_created, 1);
        assert!(result.skipped_titles.is_empty());

        let obligations = f.repos.obligations.list_all(f.org.id, &ObligationFilter::default()).await.unwrap();
        assert_eq!(obligations.len(), 1);
        assert_eq!(obligations[0].template_id, Some(b.template.id));
    }

    #[tokio::test]
    async fn unknown_rubric_is_a_bad_request() {
        let f = fixture().await;
        let err = f.svc.apply_to_organization(&f.org, f.owner.id, &apply("mineria")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_default_jurisdiction_is_not_found() {
        let f = fixture().await;
        let svc = TemplateService::new(
            f.repos.clone(),
            AuditService::new(f.repos.audit.clone(), Arc::new(FixedClock::on(date(2025, 1, 1)))),
            Arc::new(FixedClock::on(date(2025, 1, 1))),
            "ar-cordoba-cordoba".into(),
        );
        let err = svc.apply_to_organization(&f.org, f.owner.id, &apply("gastronomia")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn inactive_templates_cannot_be_applied_explicitly() {
        let f = fixture().await;
        let t = f
            .svc
            .create(Uuid::new_v4(), &template(f.rosario.id, "ros-x", "Cartelería", Periodicity::OneTime, &[]))
            .await
            .unwrap();
        f.svc.deactivate(Uuid::new_v4(), t.template.id).await.unwrap();

        let mut payload = apply("gastronomia");
        payload.template_ids = Some(vec![t.template.id]);
        let err = f.svc.apply_to_organization(&f.org, f.owner.id, &payload).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn version_bumps_only_on_content_change() {
        let f = fixture().await;
        let created = f
            .svc
            .create(Uuid::new_v4(), &template(f.rosario.id, "ros-hab", "Habilitación", Periodicity::Annual, &["Plano"]))
            .await
            .unwrap();
        let id = created.template.id;
        assert_eq!(created.template.version, 1);
        assert_eq!(created.template.rubric, "gastronomia");

        // mesmo título e mesmo checklist: nada muda
        let same = UpdateTemplatePayload {
            title: Some("Habilitación".into()),
            checklist: Some(vec![ChecklistItemPayload { description: "Plano".into(), is_required: true }]),
            ..Default::default()
        };
        assert_eq!(f.svc.update(Uuid::new_v4(), id, &same).await.unwrap().template.version, 1);

        let toggled = UpdateTemplatePayload { is_active: Some(false), ..Default::default() };
        assert_eq!(f.svc.update(Uuid::new_v4(), id, &toggled).await.unwrap().template.version, 1);

        let new_list = UpdateTemplatePayload {
            checklist: Some(vec![
                ChecklistItemPayload { description: "Plano".into(), is_required: true },
                ChecklistItemPayload { description: "Matafuegos".into(), is_required: false },
            ]),
            ..Default::default()
        };
        let updated = f.svc.update(Uuid::new_v4(), id, &new_list).await.unwrap();
        assert_eq!(updated.template.version, 2);
        assert_eq!(updated.checklist.len(), 2);
        assert_eq!(f.svc.get(id).await.unwrap().checklist[1].description, "Matafuegos");

        let retitled = UpdateTemplatePayload { title: Some("Habilitación comercial".into()), ..Default::default() };
        assert_eq!(f.svc.update(Uuid::new_v4(), id, &retitled).await.unwrap().template.version, 3);
    }

    #[tokio::test]
    async fn rubrics_are_listed_once() {
        let f = fixture().await;
        f.svc.create(Uuid::new_v4(), &template(f.rosario.id, "a", "A", Periodicity::Annual, &[])).await.unwrap();
        f.svc.create(Uuid::new_v4(), &template(f.rosario.id, "b", "B", Periodicity::Annual, &[])).await.unwrap();
        assert_eq!(f.svc.list_rubrics(None).await.unwrap(), ["gastronomia"]);
    }
}
