// src/services/obligation_service.rs

use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::{
        clock::{add_months, Clock},
        error::AppError,
        response::Page,
    },
    db::Repositories,
    models::{
        dashboard::ObligationDashboard,
        obligation::{
            CalendarQuery, CreateObligationPayload, Obligation, ObligationFilter, ObligationQuery,
            ObligationStatus, ObligationView, UpdateObligationPayload,
        },
        tenancy::Organization,
    },
    services::{
        audit_service::{AuditEntry, AuditService},
        traffic_light::{build_dashboard, enrich, enrich_all, Thresholds},
    },
};

/// O responsável precisa ser membro; o local precisa pertencer à organização.
/// Usado também na aplicação de templates.
pub(crate) async fn check_assignment(
    repos: &Repositories,
    organization_id: Uuid,
    location_id: Option<Uuid>,
    owner_user_id: Uuid,
) -> Result<(), AppError> {
    if let Some(location_id) = location_id {
        repos
            .locations
            .find(organization_id, location_id)
            .await?
            .ok_or_else(|| AppError::not_found("Local"))?;
    }
    if repos.memberships.find(organization_id, owner_user_id).await?.is_none() {
        return Err(AppError::field("ownerUserId", "El responsable debe ser miembro de la organización."));
    }
    Ok(())
}

fn clean_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::field("title", "El título es obligatorio."));
    }
    Ok(title.to_string())
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct ObligationService {
    repos: Repositories,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

impl ObligationService {
    pub fn new(repos: Repositories, audit: AuditService, clock: Arc<dyn Clock>) -> Self {
        Self { repos, audit, clock }
    }

    fn view(&self, org: &Organization, obligation: Obligation) -> ObligationView {
        enrich(obligation, Thresholds::of(org), self.clock.today())
    }

    async fn load(&self, org: &Organization, id: Uuid) -> Result<Obligation, AppError> {
        self.repos
            .obligations
            .find(org.id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Obligación"))
    }

    pub async fn create(
        &self,
        org: &Organization,
        actor: Uuid,
        payload: &CreateObligationPayload,
    ) -> Result<ObligationView, AppError> {
        let title = clean_title(&payload.title)?;
        let owner_user_id = payload.owner_user_id.unwrap_or(actor);
        check_assignment(&self.repos, org.id, payload.location_id, owner_user_id).await?;

        let now = self.clock.now();
        let obligation = Obligation {
            id: Uuid::new_v4(),
            organization_id: org.id,
            location_id: payload.location_id,
            title,
            description: blank_to_none(&payload.description),
            obligation_type: payload.obligation_type,
            status: ObligationStatus::Pending,
            due_date: payload.due_date,
            recurrence_rule: blank_to_none(&payload.recurrence_rule),
            requires_review: payload.requires_review,
            required_evidence_count: payload.required_evidence_count,
            owner_user_id,
            template_id: None,
            created_at: now,
            updated_at: now,
        };
        let obligation = self.repos.obligations.insert(&obligation, None).await?;

        self.audit
            .record(
                AuditEntry::new("obligation.created")
                    .org(org.id)
                    .user(actor)
                    .entity("obligation", obligation.id)
                    .meta(json!({ "title": obligation.title, "dueDate": obligation.due_date })),
            )
            .await;
        Ok(self.view(org, obligation))
    }

    pub async fn get(&self, org: &Organization, id: Uuid) -> Result<ObligationView, AppError> {
        let obligation = self.load(org, id).await?;
        Ok(self.view(org, obligation))
    }

    pub async fn list(&self, org: &Organization, query: &ObligationQuery) -> Result<Page<ObligationView>, AppError> {
        let today = self.clock.today();
        let thresholds = Thresholds::of(org);
        let page = self
            .repos
            .obligations
            .list(org.id, &query.filter(), query.page_params())
            .await?;
        Ok(page.map(|o| enrich(o, thresholds, today)))
    }

    /// Lista completa (sem paginação), usada por relatórios.
    pub async fn list_all(&self, org: &Organization, filter: &ObligationFilter) -> Result<Vec<ObligationView>, AppError> {
        let obligations = self.repos.obligations.list_all(org.id, filter).await?;
        Ok(enrich_all(obligations, Thresholds::of(org), self.clock.today()))
    }

    pub async fn update(
        &self,
        org: &Organization,
        actor: Uuid,
        id: Uuid,
        payload: &UpdateObligationPayload,
    ) -> Result<ObligationView, AppError> {
        let mut obligation = self.load(org, id).await?;

        if let Some(title) = &payload.title {
            obligation.title = clean_title(title)?;
        }
        if payload.description.is_some() {
            obligation.description = blank_to_none(&payload.description);
        }
        if let Some(obligation_type) = payload.obligation_type {
            obligation.obligation_type = obligation_type;
        }
        if let Some(due_date) = payload.due_date {
            obligation.due_date = due_date;
            // Vencida reprogramada para hoje ou depois volta a ficar pendente
            if obligation.status == ObligationStatus::Overdue && due_date >= self.clock.today() {
                obligation.status = ObligationStatus::Pending;
            }
        }
        if payload.recurrence_rule.is_some() {
            obligation.recurrence_rule = blank_to_none(&payload.recurrence_rule);
        }
        if let Some(requires_review) = payload.requires_review {
            obligation.requires_review = requires_review;
        }
        if let Some(count) = payload.required_evidence_count {
            obligation.required_evidence_count = count;
        }
        if payload.location_id.is_some() {
            obligation.location_id = payload.location_id;
        }
        if let Some(owner) = payload.owner_user_id {
            obligation.owner_user_id = owner;
        }
        if payload.location_id.is_some() || payload.owner_user_id.is_some() {
            check_assignment(&self.repos, org.id, obligation.location_id, obligation.owner_user_id).await?;
        }
        obligation.updated_at = self.clock.now();

        let obligation = self.repos.obligations.update(&obligation).await?;
        self.audit
            .record(AuditEntry::new("obligation.updated").org(org.id).user(actor).entity("obligation", id))
            .await;
        Ok(self.view(org, obligation))
    }

    /// Completed exige evidências suficientes e, quando aplicável, uma revisão aprovada.
    pub async fn update_status(
        &self,
        org: &Organization,
        actor: Uuid,
        id: Uuid,
        status: ObligationStatus,
    ) -> Result<ObligationView, AppError> {
        let mut obligation = self.load(org, id).await?;
        let from = obligation.status;
        if from == status {
            return Ok(self.view(org, obligation));
        }

        if status == ObligationStatus::Completed {
            let evidence = self.repos.documents.count_for_obligation(id).await?;
            if evidence < i64::from(obligation.required_evidence_count) {
                return Err(AppError::BadRequest(format!(
                    "Se requieren {} evidencias para completar la obligación (cargadas: {}).",
                    obligation.required_evidence_count, evidence
                )));
            }
            if obligation.requires_review && !self.repos.reviews.has_approved(id).await? {
                return Err(AppError::BadRequest(
                    "La obligación requiere una revisión aprobada antes de completarse.".into(),
                ));
            }
        }

        obligation.status = status;
        obligation.updated_at = self.clock.now();
        let obligation = self.repos.obligations.update(&obligation).await?;

        self.audit
            .record(
                AuditEntry::new("obligation.status_changed")
                    .org(org.id)
                    .user(actor)
                    .entity("obligation", id)
                    .meta(json!({ "from": from.as_str(), "to": status.as_str() })),
            )
            .await;
        Ok(self.view(org, obligation))
    }

    pub async fn delete(&self, org: &Organization, actor: Uuid, id: Uuid) -> Result<(), AppError> {
        let obligation = self.load(org, id).await?;
        if !self.repos.obligations.delete(org.id, id).await? {
            return Err(AppError::not_found("Obligación"));
        }
        self.audit
            .record(
                AuditEntry::new("obligation.deleted")
                    .org(org.id)
                    .user(actor)
                    .entity("obligation", id)
                    .meta(json!({ "title": obligation.title })),
            )
            .await;
        Ok(())
    }

    pub async fn dashboard(&self, org: &Organization) -> Result<ObligationDashboard, AppError> {
        let views = self.list_all(org, &ObligationFilter::default()).await?;
        Ok(build_dashboard(views))
    }

    /// Intervalo fechado `[from, to]`; sem datas, o mês corrente.
    pub async fn calendar(&self, org: &Organization, query: &CalendarQuery) -> Result<Vec<ObligationView>, AppError> {
        let today = self.clock.today();
        let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
        let from = query.from.unwrap_or(month_start);
        let to = query.to.unwrap_or_else(|| add_months(month_start, 1).pred_opt().unwrap_or(month_start));
        if from > to {
            return Err(AppError::field("from", "La fecha inicial debe ser anterior a la final."));
        }

        let filter = ObligationFilter { due_from: Some(from), due_to: Some(to), ..Default::default() };
        self.list_all(org, &filter).await
    }

    /// Varredura diária: abertas com vencimento anterior a hoje viram Overdue.
    pub async fn update_overdue_obligations(&self) -> Result<u64, AppError> {
        let updated = self.repos.obligations.mark_overdue(self.clock.today(), self.clock.now()).await?;
        if updated > 0 {
            tracing::info!(updated, "Obrigações marcadas como vencidas");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::clock::testing::FixedClock,
        models::{
            auth::User,
            document::Document,
            obligation::{ObligationType, TrafficLight},
            review::{Review, ReviewStatus},
            tenancy::MemberRole,
        },
        services::test_support::{self as ts, date},
    };

    struct Fixture {
        repos: Repositories,
        svc: ObligationService,
        clock: Arc<FixedClock>,
        org: Organization,
        owner: User,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let clock = Arc::new(FixedClock::on(date(2025, 6, 10)));
        let audit = AuditService::new(repos.audit.clone(), clock.clone());
        let svc = ObligationService::new(repos.clone(), audit, clock.clone());
        let owner = ts::user(&repos, "duena@bar.com", "Dueña").await;
        let org = ts::org(&repos, &owner).await;
        Fixture { repos, svc, clock, org, owner }
    }

    fn payload(title: &str, due_date: NaiveDate) -> CreateObligationPayload {
        CreateObligationPayload {
            title: title.into(),
            description: None,
            obligation_type: ObligationType::Tax,
            due_date,
            recurrence_rule: None,
            requires_review: false,
            required_evidence_count: 0,
            location_id: None,
            owner_user_id: None,
        }
    }

    async fn attach_document(repos: &Repositories, org: &Organization, obligation: Uuid, by: Uuid) {
        let id = Uuid::new_v4();
        repos
            .documents
            .insert(&Document {
                id,
                organization_id: org.id,
                obligation_id: Some(obligation),
                task_id: None,
                file_name: "comprobante.pdf".into(),
                storage_key: format!("organizations/{}/documents/{}-comprobante.pdf", org.id, id),
                declared_mime_type: "application/pdf".into(),
                detected_mime_type: "application/pdf".into(),
                size_bytes: 10,
                uploaded_by: by,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_defaults_owner_and_enriches() {
        let f = fixture().await;
        let view = f.svc.create(&f.org, f.owner.id, &payload("  IIBB mensual ", date(2025, 6, 15))).await.unwrap();
        assert_eq!(view.obligation.title, "IIBB mensual");
        assert_eq!(view.obligation.owner_user_id, f.owner.id);
        assert_eq!(view.obligation.status, ObligationStatus::Pending);
        assert_eq!(view.days_until_due, 5);
        assert_eq!(view.traffic_light, TrafficLight::Red);
    }

    #[tokio::test]
    async fn owner_must_be_a_member() {
        let f = fixture().await;
        let outsider = ts::user(&f.repos, "otro@x.com", "Otro").await;
        let mut p = payload("Seguro", date(2025, 7, 1));
        p.owner_user_id = Some(outsider.id);
        let err = f.svc.create(&f.org, f.owner.id, &p).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));

        let mut p = payload("Seguro", date(2025, 7, 1));
        p.location_id = Some(Uuid::new_v4());
        let err = f.svc.create(&f.org, f.owner.id, &p).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn completion_requires_evidence() {
        let f = fixture().await;
        let mut p = payload("Habilitación", date(2025, 8, 1));
        p.required_evidence_count = 2;
        let view = f.svc.create(&f.org, f.owner.id, &p).await.unwrap();
        let id = view.obligation.id;

        attach_document(&f.repos, &f.org, id, f.owner.id).await;
        let err = f.svc.update_status(&f.org, f.owner.id, id, ObligationStatus::Completed).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(f.svc.get(&f.org, id).await.unwrap().obligation.status, ObligationStatus::Pending);

        attach_document(&f.repos, &f.org, id, f.owner.id).await;
        let done = f.svc.update_status(&f.org, f.owner.id, id, ObligationStatus::Completed).await.unwrap();
        assert_eq!(done.obligation.status, ObligationStatus::Completed);
        assert_eq!(done.traffic_light, TrafficLight::Green);
        assert_eq!(done.days_until_due, 0);
    }

    #[tokio::test]
    async fn completion_requires_an_approved_review() {
        let f = fixture().await;
        let mut p = payload("Libro de inspección", date(2025, 8, 1));
        p.requires_review = true;
        let id = f.svc.create(&f.org, f.owner.id, &p).await.unwrap().obligation.id;

        assert!(f.svc.update_status(&f.org, f.owner.id, id, ObligationStatus::Completed).await.is_err());

        f.repos
            .reviews
            .insert(&Review {
                id: Uuid::new_v4(),
                organization_id: f.org.id,
                obligation_id: id,
                reviewer_user_id: f.owner.id,
                status: ReviewStatus::Approved,
                comment: None,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        assert!(f.svc.update_status(&f.org, f.owner.id, id, ObligationStatus::Completed).await.is_ok());
    }

    #[tokio::test]
    async fn status_change_is_audited() {
        let f = fixture().await;
        let id = f.svc.create(&f.org, f.owner.id, &payload("DDJJ", date(2025, 8, 1))).await.unwrap().obligation.id;
        f.svc.update_status(&f.org, f.owner.id, id, ObligationStatus::InProgress).await.unwrap();

        let events = f
            .repos
            .audit
            .list(
                f.org.id,
                &crate::models::audit::AuditQuery {
                    action: Some("obligation.status_changed".into()),
                    ..Default::default()
                },
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(events.total, 1);
        assert_eq!(events.items[0].metadata["from"], "PENDING");
        assert_eq!(events.items[0].metadata["to"], "IN_PROGRESS");
    }

    #[tokio::test]
    async fn overdue_sweep_is_idempotent() {
        let f = fixture().await;
        let late = f.svc.create(&f.org, f.owner.id, &payload("Tasa municipal", date(2025, 6, 9))).await.unwrap();
        let done = f.svc.create(&f.org, f.owner.id, &payload("Monotributo", date(2025, 6, 1))).await.unwrap();
        f.svc.update_status(&f.org, f.owner.id, done.obligation.id, ObligationStatus::Completed).await.unwrap();
        f.svc.create(&f.org, f.owner.id, &payload("Seguro", date(2025, 6, 10))).await.unwrap();

        assert_eq!(f.svc.update_overdue_obligations().await.unwrap(), 1);
        assert_eq!(f.svc.update_overdue_obligations().await.unwrap(), 0);
        let late = f.svc.get(&f.org, late.obligation.id).await.unwrap();
        assert_eq!(late.obligation.status, ObligationStatus::Overdue);
        assert_eq!(late.traffic_light, TrafficLight::Red);
        assert_eq!(late.days_until_due, -1);

        // um dia depois, a de hoje também vence
        f.clock.advance_days(1);
        assert_eq!(f.svc.update_overdue_obligations().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rescheduling_an_overdue_obligation_reopens_it() {
        let f = fixture().await;
        let id = f.svc.create(&f.org, f.owner.id, &payload("Tasa", date(2025, 6, 1))).await.unwrap().obligation.id;
        f.svc.update_overdue_obligations().await.unwrap();

        let view = f
            .svc
            .update(&f.org, f.owner.id, id, &UpdateObligationPayload { due_date: Some(date(2025, 7, 1)), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(view.obligation.status, ObligationStatus::Pending);
        assert_eq!(view.traffic_light, TrafficLight::Green);
    }

    #[tokio::test]
    async fn update_checks_new_owner() {
        let f = fixture().await;
        let accountant = ts::user(&f.repos, "contadora@x.com", "Contadora").await;
        ts::member(&f.repos, &f.org, &accountant, MemberRole::Accountant).await;
        let id = f.svc.create(&f.org, f.owner.id, &payload("IVA", date(2025, 7, 1))).await.unwrap().obligation.id;

        let view = f
            .svc
            .update(&f.org, f.owner.id, id, &UpdateObligationPayload { owner_user_id: Some(accountant.id), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(view.obligation.owner_user_id, accountant.id);

        let err = f
            .svc
            .update(&f.org, f.owner.id, id, &UpdateObligationPayload { owner_user_id: Some(Uuid::new_v4()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn calendar_defaults_to_current_month() {
        let f = fixture().await;
        f.svc.create(&f.org, f.owner.id, &payload("Junio 1", date(2025, 6, 1))).await.unwrap();
        f.svc.create(&f.org, f.owner.id, &payload("Junio 30", date(2025, 6, 30))).await.unwrap();
        f.svc.create(&f.org, f.owner.id, &payload("Julio 1", date(2025, 7, 1))).await.unwrap();

        let month = f.svc.calendar(&f.org, &CalendarQuery::default()).await.unwrap();
        let titles: Vec<_> = month.iter().map(|v| v.obligation.title.as_str()).collect();
        assert_eq!(titles, ["Junio 1", "Junio 30"]);

        let bad = CalendarQuery { from: Some(date(2025, 7, 1)), to: Some(date(2025, 6, 1)) };
        assert!(f.svc.calendar(&f.org, &bad).await.is_err());
    }

    #[tokio::test]
    async fn dashboard_counts_open_obligations() {
        let f = fixture().await;
        f.svc.create(&f.org, f.owner.id, &payload("Verde", date(2025, 8, 30))).await.unwrap();
        f.svc.create(&f.org, f.owner.id, &payload("Amarilla", date(2025, 6, 20))).await.unwrap();
        f.svc.create(&f.org, f.owner.id, &payload("Roja", date(2025, 6, 12))).await.unwrap();
        let done = f.svc.create(&f.org, f.owner.id, &payload("Hecha", date(2025, 6, 11))).await.unwrap();
        f.svc.update_status(&f.org, f.owner.id, done.obligation.id, ObligationStatus::Completed).await.unwrap();

        let dash = f.svc.dashboard(&f.org).await.unwrap();
        assert_eq!(dash.total, 4);
        assert_eq!(dash.completed, 1);
        assert_eq!((dash.traffic_light.green, dash.traffic_light.yellow, dash.traffic_light.red), (1, 1, 1));
        assert_eq!(dash.upcoming.len(), 1);
        assert_eq!(dash.upcoming[0].obligation.title, "Roja");
    }

    #[tokio::test]
    async fn delete_removes_the_obligation() {
        let f = fixture().await;
        let id = f.svc.create(&f.org, f.owner.id, &payload("Borrar", date(2025, 7, 1))).await.unwrap().obligation.id;
        f.svc.delete(&f.org, f.owner.id, id).await.unwrap();
        assert!(matches!(f.svc.get(&f.org, id).await.unwrap_err(), AppError::NotFound(_)));
        assert!(f.svc.delete(&f.org, f.owner.id, id).await.is_err());
    }
}
