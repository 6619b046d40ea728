// src/services/tenancy_service.rs

use chrono::Duration;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::{
        clock::Clock,
        error::AppError,
        tokens::{random_hex, sha256_hex},
    },
    db::Repositories,
    models::{
        auth::User,
        tenancy::{
            normalize_cuit, CreateInvitationPayload, CreateLocationPayload, CreateOrganizationPayload, Invitation,
            InvitationStatus, Location, MemberDetail, MemberRole, Membership, Organization, OrganizationWithRole,
            UpdateLocationPayload, UpdateOrganizationPayload,
        },
    },
    services::{
        audit_service::{AuditEntry, AuditService},
        notification_service::NotificationService,
    },
};

pub const INVITATION_TTL_DAYS: i64 = 7;

/// Amarelo precisa avisar antes do vermelho.
fn check_thresholds(yellow: i32, red: i32) -> Result<(), AppError> {
    if yellow <= red {
        return Err(AppError::field(
            "thresholdYellowDays",
            "El umbral amarillo debe ser mayor que el rojo.",
        ));
    }
    Ok(())
}

fn can_manage(role: MemberRole) -> bool {
    matches!(role, MemberRole::Owner | MemberRole::Admin)
}

#[derive(Clone)]
pub struct TenancyService {
    repos: Repositories,
    audit: AuditService,
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
}

impl TenancyService {
    pub fn new(
        repos: Repositories,
        audit: AuditService,
        notifications: NotificationService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repos, audit, notifications, clock }
    }

    // ---
    // Organizações
    // ---

    /// O criador vira Owner na mesma transação.
    pub async fn create_organization(
        &self,
        user: &User,
        payload: &CreateOrganizationPayload,
    ) -> Result<OrganizationWithRole, AppError> {
        check_thresholds(payload.threshold_yellow_days, payload.threshold_red_days)?;
        if let Some(jurisdiction_id) = payload.jurisdiction_id {
            self.ensure_jurisdiction(jurisdiction_id).await?;
        }

        let now = self.clock.now();
        let org = Organization {
            id: Uuid::new_v4(),
            cuit: normalize_cuit(&payload.cuit),
            name: payload.name.trim().to_string(),
            plan: payload.plan,
            threshold_yellow_days: payload.threshold_yellow_days,
            threshold_red_days: payload.threshold_red_days,
            retention_months: payload.retention_months,
            jurisdiction_id: payload.jurisdiction_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let owner = Membership { organization_id: org.id, user_id: user.id, role: MemberRole::Owner, created_at: now };
        let organization = self.repos.organizations.create_with_owner(&org, &owner).await?;

        tracing::info!(org_id = %organization.id, user_id = %user.id, "Organização criada");
        self.audit
            .record(
                AuditEntry::new("organization.created")
                    .org(organization.id)
                    .user(user.id)
                    .entity("organization", organization.id)
                    .meta(json!({ "cuit": organization.cuit, "name": organization.name })),
            )
            .await;
        Ok(OrganizationWithRole { organization, role: MemberRole::Owner })
    }

    pub async fn list_mine(&self, user_id: Uuid) -> Result<Vec<OrganizationWithRole>, AppError> {
        self.repos.organizations.list_for_user(user_id).await
    }

    /// Organização ativa + membership do usuário; base de toda rota `/organizations/{id}`.
    pub async fn member_context(&self, organization_id: Uuid, user_id: Uuid) -> Result<(Organization, Membership), AppError> {
        let org = self
            .repos
            .organizations
            .find_by_id(organization_id)
            .await?
            .filter(|o| o.is_active)
            .ok_or_else(|| AppError::not_found("Organización"))?;

        let membership = self
            .repos
            .memberships
            .find(organization_id, user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("No sos miembro de esta organización.".into()))?;
        Ok((org, membership))
    }

    pub async fn update_organization(
        &self,
        org: &Organization,
        actor: Uuid,
        payload: &UpdateOrganizationPayload,
    ) -> Result<Organization, AppError> {
        let mut updated = org.clone();
        if let Some(name) = &payload.name {
            updated.name = name.trim().to_string();
        }
        if let Some(plan) = payload.plan {
            updated.plan = plan;
        }
        if let Some(yellow) = payload.threshold_yellow_days {
            updated.threshold_yellow_days = yellow;
        }
        if let Some(red) = payload.threshold_red_days {
            updated.threshold_red_days = red;
        }
        if let Some(months) = payload.retention_months {
            updated.retention_months = months;
        }
        if let Some(jurisdiction_id) = payload.jurisdiction_id {
            self.ensure_jurisdiction(jurisdiction_id).await?;
            updated.jurisdiction_id = Some(jurisdiction_id);
        }
        check_thresholds(updated.threshold_yellow_days, updated.threshold_red_days)?;
        updated.updated_at = self.clock.now();

        let updated = self.repos.organizations.update(&updated).await?;
        self.audit
            .record(AuditEntry::new("organization.updated").org(org.id).user(actor).entity("organization", org.id))
            .await;
        Ok(updated)
    }

    pub async fn deactivate_organization(&self, org: &Organization, actor: Uuid) -> Result<(), AppError> {
        let mut updated = org.clone();
        updated.is_active = false;
        updated.updated_at = self.clock.now();
        self.repos.organizations.update(&updated).await?;

        tracing::info!(org_id = %org.id, "Organização desativada");
        self.audit
            .record(AuditEntry::new("organization.deactivated").org(org.id).user(actor).entity("organization", org.id))
            .await;
        Ok(())
    }

    async fn ensure_jurisdiction(&self, id: Uuid) -> Result<(), AppError> {
        match self.repos.jurisdictions.find_by_id(id).await? {
            Some(j) if j.is_active => Ok(()),
            _ => Err(AppError::not_found("Jurisdicción")),
        }
    }

    // ---
    // Membros
    // ---

    pub async fn list_members(&self, org: &Organization) -> Result<Vec<MemberDetail>, AppError> {
        self.repos.memberships.list(org.id).await
    }

    async fn target_membership(&self, org: &Organization, user_id: Uuid) -> Result<Membership, AppError> {
        self.repos
            .memberships
            .find(org.id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Miembro"))
    }

    async fn ensure_not_last_owner(&self, org: &Organization, target: &Membership) -> Result<(), AppError> {
        if target.role == MemberRole::Owner && self.repos.memberships.count_with_role(org.id, MemberRole::Owner).await? <= 1 {
            return Err(AppError::Forbidden("La organización debe conservar al menos un Owner.".into()));
        }
        Ok(())
    }

    pub async fn change_member_role(
        &self,
        org: &Organization,
        actor: &Membership,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Membership, AppError> {
        if actor.user_id == user_id {
            return Err(AppError::Forbidden("No podés cambiar tu propio rol.".into()));
        }
        let mut target = self.target_membership(org, user_id).await?;
        if (target.role == MemberRole::Owner || role == MemberRole::Owner) && actor.role != MemberRole::Owner {
            return Err(AppError::Forbidden("Solo un Owner puede otorgar o quitar el rol Owner.".into()));
        }
        if target.role == role {
            return Ok(target);
        }
        self.ensure_not_last_owner(org, &target).await?;

        let from = target.role;
        self.repos.memberships.update_role(org.id, user_id, role).await?;
        target.role = role;

        self.audit
            .record(
                AuditEntry::new("member.role_changed")
                    .org(org.id)
                    .user(actor.user_id)
                    .entity("user", user_id)
                    .meta(json!({ "from": from, "to": role })),
            )
            .await;
        Ok(target)
    }

    /// Owner/Admin removem outros; qualquer membro pode sair sozinho.
    pub async fn remove_member(&self, org: &Organization, actor: &Membership, user_id: Uuid) -> Result<(), AppError> {
        let leaving = actor.user_id == user_id;
        if !leaving && !can_manage(actor.role) {
            return Err(AppError::Forbidden("No tenés permisos para quitar miembros.".into()));
        }
        let target = self.target_membership(org, user_id).await?;
        if !leaving && target.role == MemberRole::Owner && actor.role != MemberRole::Owner {
            return Err(AppError::Forbidden("Solo un Owner puede quitar a otro Owner.".into()));
        }
        self.ensure_not_last_owner(org, &target).await?;

        self.repos.memberships.delete(org.id, user_id).await?;
        self.audit
            .record(
                AuditEntry::new(if leaving { "member.left" } else { "member.removed" })
                    .org(org.id)
                    .user(actor.user_id)
                    .entity("user", user_id),
            )
            .await;
        Ok(())
    }

    // ---
    // Locais
    // ---

    pub async fn list_locations(&self, org: &Organization) -> Result<Vec<Location>, AppError> {
        self.repos.locations.list(org.id).await
    }

    pub async fn create_location(
        &self,
        org: &Organization,
        actor: Uuid,
        payload: &CreateLocationPayload,
    ) -> Result<Location, AppError> {
        let name = payload.name.trim().to_string();
        if self.repos.locations.active_name_taken(org.id, &name, None).await? {
            return Err(AppError::Conflict(format!("Ya existe un local activo llamado \"{}\".", name)));
        }

        let now = self.clock.now();
        let location = self
            .repos
            .locations
            .insert(&Location {
                id: Uuid::new_v4(),
                organization_id: org.id,
                name,
                address: payload.address.as_ref().map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.audit
            .record(AuditEntry::new("location.created").org(org.id).user(actor).entity("location", location.id))
            .await;
        Ok(location)
    }

    pub async fn update_location(
        &self,
        org: &Organization,
        actor: Uuid,
        id: Uuid,
        payload: &UpdateLocationPayload,
    ) -> Result<Location, AppError> {
        let mut location = self
            .repos
            .locations
            .find(org.id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Local"))?;

        if let Some(name) = &payload.name {
            location.name = name.trim().to_string();
        }
        if payload.address.is_some() {
            location.address = payload.address.as_ref().map(|a| a.trim().to_string()).filter(|a| !a.is_empty());
        }
        if let Some(active) = payload.is_active {
            location.is_active = active;
        }
        if location.is_active && self.repos.locations.active_name_taken(org.id, &location.name, Some(id)).await? {
            return Err(AppError::Conflict(format!("Ya existe un local activo llamado \"{}\".", location.name)));
        }
        location.updated_at = self.clock.now();

        let location = self.repos.locations.update(&location).await?;
        self.audit
            .record(AuditEntry::new("location.updated").org(org.id).user(actor).entity("location", id))
            .await;
        Ok(location)
    }

    pub async fn deactivate_location(&self, org: &Organization, actor: Uuid, id: Uuid) -> Result<Location, AppError> {
        let payload = UpdateLocationPayload { is_active: Some(false), ..Default::default() };
        self.update_location(org, actor, id, &payload).await
    }

    // ---
    // Convites
    // ---

    pub async fn create_invitation(
        &self,
        org: &Organization,
        actor: &Membership,
        payload: &CreateInvitationPayload,
    ) -> Result<Invitation, AppError> {
        if payload.role == MemberRole::Owner && actor.role != MemberRole::Owner {
            return Err(AppError::Forbidden("Solo un Owner puede invitar a otro Owner.".into()));
        }

        let email = payload.email.trim().to_lowercase();
        if self.repos.invitations.find_pending_for_email(org.id, &email).await?.is_some() {
            return Err(AppError::Conflict("Ya existe una invitación pendiente para ese e-mail.".into()));
        }
        if let Some(user) = self.repos.users.find_by_email(&email).await? {
            if self.repos.memberships.find(org.id, user.id).await?.is_some() {
                return Err(AppError::Conflict("El usuario ya es miembro de la organización.".into()));
            }
        }

        let token = random_hex();
        let now = self.clock.now();
        let invitation = self
            .repos
            .invitations
            .insert(&Invitation {
                id: Uuid::new_v4(),
                organization_id: org.id,
                email,
                role: payload.role,
                token_hash: sha256_hex(&token),
                invited_by: actor.user_id,
                status: InvitationStatus::Pending,
                expires_at: now + Duration::days(INVITATION_TTL_DAYS),
                accepted_at: None,
                created_at: now,
            })
            .await?;

        // O convite vale mesmo se o e-mail falhar; pode ser reenviado cancelando e criando outro
        if let Err(e) = self.notifications.send_invitation(org, &invitation, &token).await {
            tracing::warn!(error = %e, invitation_id = %invitation.id, "Falha ao enviar e-mail de convite");
        }

        self.audit
            .record(
                AuditEntry::new("invitation.created")
                    .org(org.id)
                    .user(actor.user_id)
                    .entity("invitation", invitation.id)
                    .meta(json!({ "email": invitation.email, "role": invitation.role })),
            )
            .await;
        Ok(invitation)
    }

    pub async fn list_invitations(&self, org: &Organization) -> Result<Vec<Invitation>, AppError> {
        self.repos.invitations.list(org.id).await
    }

    pub async fn cancel_invitation(&self, org: &Organization, actor: Uuid, id: Uuid) -> Result<(), AppError> {
        let invitation = self
            .repos
            .invitations
            .find(org.id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Invitación"))?;
        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::BadRequest("Solo se pueden cancelar invitaciones pendientes.".into()));
        }

        self.repos.invitations.set_status(id, InvitationStatus::Cancelled).await?;
        self.audit
            .record(AuditEntry::new("invitation.cancelled").org(org.id).user(actor).entity("invitation", id))
            .await;
        Ok(())
    }

    /// Cria a membership e marca o convite como aceito numa transação.
    pub async fn accept_invitation(&self, user: &User, token: &str) -> Result<Membership, AppError> {
        let invitation = self
            .repos
            .invitations
            .find_by_token_hash(&sha256_hex(token.trim()))
            .await?
            .ok_or_else(|| AppError::BadRequest("La invitación no es válida.".into()))?;

        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::BadRequest("La invitación ya no está disponible.".into()));
        }
        let now = self.clock.now();
        if invitation.expires_at <= now {
            self.repos.invitations.set_status(invitation.id, InvitationStatus::Expired).await?;
            return Err(AppError::BadRequest("La invitación expiró.".into()));
        }
        if invitation.email != user.email.to_lowercase() {
            return Err(AppError::Forbidden("La invitación fue enviada a otro e-mail.".into()));
        }

        let membership = Membership {
            organization_id: invitation.organization_id,
            user_id: user.id,
            role: invitation.role,
            created_at: now,
        };
        self.repos.invitations.accept(invitation.id, &membership, now).await?;

        self.audit
            .record(
                AuditEntry::new("invitation.accepted")
                    .org(invitation.organization_id)
                    .user(user.id)
                    .entity("invitation", invitation.id)
                    .meta(json!({ "role": invitation.role })),
            )
            .await;
        Ok(membership)
    }
}
