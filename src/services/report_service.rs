// src/services/report_service.rs

use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, csv::CsvWriter, error::AppError},
    db::Repositories,
    models::{
        dashboard::ComplianceReport,
        obligation::{ObligationFilter, ObligationStatus, ObligationView},
        tenancy::Organization,
    },
    services::traffic_light::{count_lights, count_statuses, enrich_all, Thresholds},
};

const CSV_HEADER: [&str; 11] = [
    "ID",
    "Título",
    "Tipo",
    "Estado",
    "Vencimiento",
    "Días restantes",
    "Semáforo",
    "Local",
    "Responsable",
    "Requiere revisión",
    "Evidencias requeridas",
];

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (f64::from(part) / f64::from(whole) * 1000.0).round() / 10.0
}

#[derive(Clone)]
pub struct ReportService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    pub async fn obligations(&self, org: &Organization, filter: &ObligationFilter) -> Result<Vec<ObligationView>, AppError> {
        let obligations = self.repos.obligations.list_all(org.id, filter).await?;
        Ok(enrich_all(obligations, Thresholds::of(org), self.clock.today()))
    }

    pub async fn compliance(&self, org: &Organization) -> Result<ComplianceReport, AppError> {
        let views = self.obligations(org, &ObligationFilter::default()).await?;
        let by_status = count_statuses(&views);
        let total = views.len() as u32;

        // Cobertura: entre as que exigem evidência (e ainda se aplicam), quantas já têm o suficiente
        let evidence = self.repos.documents.evidence_counts(org.id).await?;
        let requiring: Vec<&ObligationView> = views
            .iter()
            .filter(|v| v.obligation.required_evidence_count > 0 && v.obligation.status != ObligationStatus::NotApplicable)
            .collect();
        let covered = requiring
            .iter()
            .filter(|v| {
                evidence.get(&v.obligation.id).copied().unwrap_or(0) >= i64::from(v.obligation.required_evidence_count)
            })
            .count() as u32;

        Ok(ComplianceReport {
            total,
            by_status,
            by_traffic_light: count_lights(&views),
            compliance_rate: percent(by_status.completed, total - by_status.not_applicable),
            overdue: by_status.overdue,
            evidence_coverage: percent(covered, requiring.len() as u32),
        })
    }

    /// CSV com cabeçalho; campos protegidos contra injeção de fórmulas.
    pub async fn export_csv(&self, org: &Organization, filter: &ObligationFilter) -> Result<String, AppError> {
        let views = self.obligations(org, filter).await?;

        let locations: HashMap<Uuid, String> = self
            .repos
            .locations
            .list(org.id)
            .await?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect();
        let mut owner_ids: Vec<Uuid> = views.iter().map(|v| v.obligation.owner_user_id).collect();
        owner_ids.sort();
        owner_ids.dedup();
        let owners: HashMap<Uuid, String> = self
            .repos
            .users
            .find_many(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name))
            .collect();

        let mut csv = CsvWriter::new();
        csv.write_record(CSV_HEADER);
        for v in &views {
            let o = &v.obligation;
            csv.write_record([
                o.id.to_string(),
                o.title.clone(),
                o.obligation_type.as_str().to_string(),
                o.status.as_str().to_string(),
                o.due_date.format("%Y-%m-%d").to_string(),
                v.days_until_due.to_string(),
                v.traffic_light.as_str().to_string(),
                o.location_id.and_then(|id| locations.get(&id).cloned()).unwrap_or_default(),
                owners.get(&o.owner_user_id).cloned().unwrap_or_default(),
                if o.requires_review { "Sí" } else { "No" }.to_string(),
                o.required_evidence_count.to_string(),
            ]);
        }

        tracing::info!(org_id = %org.id, rows = views.len(), "CSV de obrigações exportado");
        Ok(csv.finish())
    }
}
