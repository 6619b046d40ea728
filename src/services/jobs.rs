// src/services/jobs.rs

// Rotinas agendadas: varredura diária (vencidas, lembretes, alertas) e a
// purga mensal de documentos pela política de retenção.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::task::JoinHandle;

use crate::{
    common::clock::{add_months, Clock},
    config::JobSettings,
    db::Repositories,
    services::{
        document_service::DocumentService, notification_service::NotificationService,
        obligation_service::ObligationService,
    },
};

/// Horário de disparo, sempre no fuso do negócio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Daily { hour: u32 },
    Monthly { day: u32, hour: u32 },
}

fn at_hour(tz: Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    let naive: NaiveDateTime = date.and_hms_opt(hour, 0, 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t.with_timezone(&Utc)),
        // Horário inexistente (salto de verão): uma hora depois
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    }
}

impl Schedule {
    /// Próximo disparo estritamente depois de `now`.
    pub fn next_after(&self, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        let today = now.with_timezone(&tz).date_naive();
        let fallback = now + Duration::days(1);

        match *self {
            Schedule::Daily { hour } => (0..=2)
                .filter_map(|offset| at_hour(tz, today + Duration::days(offset), hour))
                .find(|t| *t > now)
                .unwrap_or(fallback),
            Schedule::Monthly { day, hour } => {
                let month_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
                (0..=2)
                    .filter_map(|offset| {
                        let start = add_months(month_start, offset);
                        let date = NaiveDate::from_ymd_opt(start.year(), start.month(), day)?;
                        at_hour(tz, date, hour)
                    })
                    .find(|t| *t > now)
                    .unwrap_or(fallback)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Daily,
    Monthly,
}

impl JobKind {
    pub fn name(self) -> &'static str {
        match self {
            JobKind::Daily => "daily-compliance",
            JobKind::Monthly => "monthly-retention",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyReport {
    pub overdue_marked: u64,
    pub reminders_sent: u32,
    pub alerts_sent: u32,
}

/// Libera a trava quando a execução termina, mesmo com pânico.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn try_acquire(flag: &Arc<AtomicBool>) -> Option<RunGuard> {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .ok()
        .map(|_| RunGuard(flag.clone()))
}

#[derive(Clone)]
pub struct JobRunner {
    settings: JobSettings,
    repos: Repositories,
    obligations: ObligationService,
    notifications: NotificationService,
    documents: DocumentService,
    clock: Arc<dyn Clock>,
    daily_running: Arc<AtomicBool>,
    monthly_running: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(
        settings: JobSettings,
        repos: Repositories,
        obligations: ObligationService,
        notifications: NotificationService,
        documents: DocumentService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            repos,
            obligations,
            notifications,
            documents,
            clock,
            daily_running: Arc::new(AtomicBool::new(false)),
            monthly_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn schedule(&self, kind: JobKind) -> Schedule {
        match kind {
            JobKind::Daily => Schedule::Daily { hour: self.settings.daily_hour },
            JobKind::Monthly => Schedule::Monthly { day: 1, hour: self.settings.monthly_hour },
        }
    }

    fn enabled(&self, kind: JobKind) -> bool {
        match kind {
            JobKind::Daily => self.settings.daily_enabled,
            JobKind::Monthly => self.settings.monthly_enabled,
        }
    }

    fn flag(&self, kind: JobKind) -> &Arc<AtomicBool> {
        match kind {
            JobKind::Daily => &self.daily_running,
            JobKind::Monthly => &self.monthly_running,
        }
    }

    /// Cada falha parcial é registrada e não interrompe as demais etapas.
    #[tracing::instrument(skip(self))]
    pub async fn run_daily(&self) -> DailyReport {
        let mut report = DailyReport::default();

        match self.obligations.update_overdue_obligations().await {
            Ok(n) => report.overdue_marked = n,
            Err(e) => tracing::error!(error = %e, "Falha na varredura de vencidas"),
        }
        match self.notifications.send_due_reminders().await {
            Ok(n) => report.reminders_sent = n,
            Err(e) => tracing::error!(error = %e, "Falha ao enviar lembretes"),
        }
        match self.notifications.send_overdue_alerts().await {
            Ok(n) => report.alerts_sent = n,
            Err(e) => tracing::error!(error = %e, "Falha ao enviar alertas de vencidas"),
        }

        tracing::info!(
            overdue = report.overdue_marked,
            reminders = report.reminders_sent,
            alerts = report.alerts_sent,
            "Rotina diária concluída"
        );
        report
    }

    #[tracing::instrument(skip(self))]
    pub async fn run_monthly(&self) -> u32 {
        let organizations = match self.repos.organizations.list_active().await {
            Ok(orgs) => orgs,
            Err(e) => {
                tracing::error!(error = %e, "Falha ao listar organizações para a retenção");
                return 0;
            }
        };

        let mut purged = 0;
        for org in organizations.iter().filter(|o| o.retention_months > 0) {
            match self.documents.purge_expired(org).await {
                Ok(n) => purged += n,
                Err(e) => tracing::error!(error = %e, org_id = %org.id, "Falha na purga de documentos"),
            }
        }
        tracing::info!(purged, "Rotina mensal de retenção concluída");
        purged
    }

    /// Executa o job se ele não estiver rodando; `false` quando o disparo foi pulado.
    pub async fn fire(&self, kind: JobKind) -> bool {
        let Some(_guard) = try_acquire(self.flag(kind)) else {
            tracing::warn!(job = kind.name(), "Execução anterior ainda em andamento; disparo ignorado");
            return false;
        };
        match kind {
            JobKind::Daily => {
                self.run_daily().await;
            }
            JobKind::Monthly => {
                self.run_monthly().await;
            }
        }
        true
    }

    /// Um laço por job habilitado. Cada disparo roda numa task própria para que
    /// uma execução longa não atrase o cálculo do próximo horário.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        [JobKind::Daily, JobKind::Monthly]
            .into_iter()
            .filter(|kind| {
                let enabled = self.enabled(*kind);
                if !enabled {
                    tracing::info!(job = kind.name(), "Job desabilitado");
                }
                enabled
            })
            .map(|kind| {
                let runner = self.clone();
                tokio::spawn(async move {
                    let schedule = runner.schedule(kind);
                    loop {
                        let now = runner.clock.now();
                        let next = schedule.next_after(now, runner.clock.timezone());
                        tracing::info!(job = kind.name(), next = %next, "Próximo disparo agendado");

                        let wait = (next - now).to_std().unwrap_or_default();
                        tokio::time::sleep(wait).await;

                        let job = runner.clone();
                        tokio::spawn(async move {
                            job.fire(kind).await;
                        });
                    }
                })
            })
            .collect()
    }
}
