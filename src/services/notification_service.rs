// src/services/notification_service.rs

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::Repositories,
    models::{
        auth::User,
        obligation::{ObligationFilter, ObligationStatus, ObligationView},
        tenancy::{Invitation, MemberRole, Organization},
    },
    services::{
        mailer::{Email, Mailer},
        traffic_light::{enrich_all, Thresholds},
    },
};

#[derive(Clone)]
pub struct NotificationService {
    repos: Repositories,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl NotificationService {
    pub fn new(repos: Repositories, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>, base_url: String) -> Self {
        Self { repos, mailer, clock, base_url: base_url.trim_end_matches('/').to_string() }
    }

    // ---
    // E-mails transacionais
    // ---

    pub async fn send_invitation(
        &self,
        org: &Organization,
        invitation: &Invitation,
        token: &str,
    ) -> Result<(), AppError> {
        let body = format!(
            "Hola,\n\nTe invitaron a colaborar en \"{}\" en CumpliRos con el rol {:?}.\n\n\
             Para aceptar la invitación ingresá a:\n{}/invitations/accept?token={}\n\n\
             La invitación vence el {}.\n",
            org.name,
            invitation.role,
            self.base_url,
            token,
            invitation.expires_at.with_timezone(&self.clock.timezone()).format("%d/%m/%Y %H:%M"),
        );
        self.mailer
            .send(Email {
                to: invitation.email.clone(),
                subject: format!("Invitación a {} en CumpliRos", org.name),
                body,
            })
            .await
    }

    pub async fn send_password_reset(&self, user: &User, token: &str) -> Result<(), AppError> {
        let body = format!(
            "Hola {},\n\nRecibimos un pedido para restablecer tu contraseña.\n\
             Usá el siguiente enlace dentro de la próxima hora:\n{}/reset-password?token={}\n\n\
             Si no fuiste vos, ignorá este mensaje.\n",
            user.full_name, self.base_url, token,
        );
        self.mailer
            .send(Email {
                to: user.email.clone(),
                subject: "Restablecer contraseña de CumpliRos".to_string(),
                body,
            })
            .await
    }

    // ---
    // Lotes diários
    // ---

    /// Um e-mail por responsável com as obrigações abertas que vencem dentro
    /// do limiar amarelo da organização. Devolve quantos e-mails saíram.
    pub async fn send_due_reminders(&self) -> Result<u32, AppError> {
        let mut sent = 0;
        for org in self.repos.organizations.list_active().await? {
            match self.reminders_for(&org).await {
                Ok(n) => sent += n,
                Err(e) => tracing::warn!(error = %e, organization_id = %org.id, "Falha nos lembretes da organização"),
            }
        }
        tracing::info!(emails = sent, "Lembretes de vencimento enviados");
        Ok(sent)
    }

    async fn reminders_for(&self, org: &Organization) -> Result<u32, AppError> {
        let thresholds = Thresholds::of(org);
        let views = self.open_views(org).await?;

        let mut by_owner: BTreeMap<Uuid, Vec<&ObligationView>> = BTreeMap::new();
        let due_soon = views
            .iter()
            .filter(|v| v.obligation.status.is_open())
            .filter(|v| (0..=thresholds.yellow).contains(&v.days_until_due));
        for v in due_soon {
            by_owner.entry(v.obligation.owner_user_id).or_default().push(v);
        }
        if by_owner.is_empty() {
            return Ok(0);
        }

        let owner_ids: Vec<Uuid> = by_owner.keys().copied().collect();
        let users = self.users_by_id(&owner_ids).await?;

        let mut sent = 0;
        for (owner_id, mut items) in by_owner {
            let Some(user) = users.get(&owner_id).filter(|u| u.is_active) else {
                continue;
            };
            items.sort_by_key(|v| v.days_until_due);
            let urgent = items.iter().any(|v| v.days_until_due <= thresholds.red);

            let lines: Vec<String> = items
                .iter()
                .map(|v| {
                    format!(
                        "- {}: vence el {} ({})",
                        v.obligation.title,
                        v.obligation.due_date.format("%d/%m/%Y"),
                        days_label(v.days_until_due)
                    )
                })
                .collect();

            let subject = if urgent {
                format!("[URGENTE] Vencimientos próximos en {}", org.name)
            } else {
                format!("Vencimientos próximos en {}", org.name)
            };
            let body = format!(
                "Hola {},\n\nEstas obligaciones de \"{}\" están por vencer:\n\n{}\n\nIngresá a CumpliRos para gestionarlas:\n{}\n",
                user.full_name,
                org.name,
                lines.join("\n"),
                self.base_url
            );

            match self.mailer.send(Email { to: user.email.clone(), subject, body }).await {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!(error = %e, user_id = %owner_id, "Falha ao enviar lembrete"),
            }
        }
        Ok(sent)
    }

    /// Alerta a todos os Owners com as obrigações vencidas e seus responsáveis.
    pub async fn send_overdue_alerts(&self) -> Result<u32, AppError> {
        let mut sent = 0;
        for org in self.repos.organizations.list_active().await? {
            match self.overdue_alert_for(&org).await {
                Ok(n) => sent += n,
                Err(e) => tracing::warn!(error = %e, organization_id = %org.id, "Falha no alerta de vencidas"),
            }
        }
        tracing::info!(emails = sent, "Alertas de obrigações vencidas enviados");
        Ok(sent)
    }

    async fn overdue_alert_for(&self, org: &Organization) -> Result<u32, AppError> {
        let mut overdue: Vec<ObligationView> = self
            .open_views(org)
            .await?
            .into_iter()
            .filter(|v| v.days_until_due < 0 || v.obligation.status == ObligationStatus::Overdue)
            .collect();
        if overdue.is_empty() {
            return Ok(0);
        }
        overdue.sort_by_key(|v| v.obligation.due_date);

        let owners = self.repos.memberships.list_with_role(org.id, MemberRole::Owner).await?;
        let mut ids: Vec<Uuid> = owners.iter().map(|m| m.user_id).collect();
        ids.extend(overdue.iter().map(|v| v.obligation.owner_user_id));
        ids.sort();
        ids.dedup();
        let users = self.users_by_id(&ids).await?;

        let lines: Vec<String> = overdue
            .iter()
            .map(|v| {
                let responsible = users
                    .get(&v.obligation.owner_user_id)
                    .map(|u| u.full_name.as_str())
                    .unwrap_or("sin responsable");
                format!(
                    "- {} (venció el {}) - Responsable: {}",
                    v.obligation.title,
                    v.obligation.due_date.format("%d/%m/%Y"),
                    responsible
                )
            })
            .collect();
        let subject = format!("[VENCIDAS] {} obligaciones vencidas en {}", overdue.len(), org.name);

        let mut sent = 0;
        for owner in owners {
            let Some(user) = users.get(&owner.user_id).filter(|u| u.is_active) else {
                continue;
            };
            let body = format!(
                "Hola {},\n\n\"{}\" tiene obligaciones vencidas:\n\n{}\n\nRevisalas en {}\n",
                user.full_name,
                org.name,
                lines.join("\n"),
                self.base_url
            );
            match self.mailer.send(Email { to: user.email.clone(), subject: subject.clone(), body }).await {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!(error = %e, user_id = %owner.user_id, "Falha ao enviar alerta de vencidas"),
            }
        }
        Ok(sent)
    }

    // Obrigações não terminais, já com semáforo.
    async fn open_views(&self, org: &Organization) -> Result<Vec<ObligationView>, AppError> {
        let obligations = self.repos.obligations.list_all(org.id, &ObligationFilter::default()).await?;
        let open = obligations.into_iter().filter(|o| !o.status.is_terminal()).collect();
        Ok(enrich_all(open, Thresholds::of(org), self.clock.today()))
    }

    async fn users_by_id(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, AppError> {
        let users = self.repos.users.find_many(ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

fn days_label(days: i64) -> String {
    match days {
        0 => "vence hoy".to_string(),
        1 => "falta 1 día".to_string(),
        n => format!("faltan {} días", n),
    }
}
