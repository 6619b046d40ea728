// src/db/tenancy_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{
        conflict_on_unique, InvitationRepository, LocationRepository, MembershipRepository,
        OrganizationRepository, RepoResult,
    },
    models::tenancy::{
        Invitation, InvitationStatus, Location, MemberDetail, MemberRole, Membership, Organization,
        OrganizationWithRole,
    },
};

// ---
// 1. Organizações
// ---

#[derive(Clone)]
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrganizationRoleRow {
    #[sqlx(flatten)]
    organization: Organization,
    role: MemberRole,
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    /// Cria a organização e, atomicamente, o primeiro Owner.
    async fn create_with_owner(&self, org: &Organization, owner: &Membership) -> RepoResult<Organization> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (
                id, cuit, name, plan, threshold_yellow_days, threshold_red_days,
                retention_months, jurisdiction_id, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(org.id)
        .bind(&org.cuit)
        .bind(&org.name)
        .bind(org.plan)
        .bind(org.threshold_yellow_days)
        .bind(org.threshold_red_days)
        .bind(org.retention_months)
        .bind(org.jurisdiction_id)
        .bind(org.is_active)
        .bind(org.created_at)
        .bind(org.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya existe una organización con ese CUIT."))?;

        sqlx::query(
            "INSERT INTO memberships (organization_id, user_id, role, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(owner.organization_id)
        .bind(owner.user_id)
        .bind(owner.role)
        .bind(owner.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }

    async fn update(&self, org: &Organization) -> RepoResult<Organization> {
        let updated = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2, plan = $3, threshold_yellow_days = $4, threshold_red_days = $5,
                retention_months = $6, jurisdiction_id = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(org.plan)
        .bind(org.threshold_yellow_days)
        .bind(org.threshold_red_days)
        .bind(org.retention_months)
        .bind(org.jurisdiction_id)
        .bind(org.is_active)
        .bind(org.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<OrganizationWithRole>> {
        let rows = sqlx::query_as::<_, OrganizationRoleRow>(
            r#"
            SELECT o.*, m.role
            FROM organizations o
            JOIN memberships m ON m.organization_id = o.id
            WHERE m.user_id = $1 AND o.is_active
            ORDER BY o.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OrganizationWithRole { organization: r.organization, role: r.role })
            .collect())
    }

    async fn list_active(&self) -> RepoResult<Vec<Organization>> {
        let orgs = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE is_active ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(orgs)
    }
}

// ---
// 2. Memberships
// ---

#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    /// Verificação de autorização feita a cada requisição de organização.
    async fn find(&self, organization_id: Uuid, user_id: Uuid) -> RepoResult<Option<Membership>> {
        let m = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(m)
    }

    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<MemberDetail>> {
        let members = sqlx::query_as::<_, MemberDetail>(
            r#"
            SELECT u.id AS user_id, u.email, u.full_name, m.role, m.created_at AS joined_at
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.created_at
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn list_with_role(&self, organization_id: Uuid, role: MemberRole) -> RepoResult<Vec<Membership>> {
        let list = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE organization_id = $1 AND role = $2",
        )
        .bind(organization_id)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }

    async fn count_with_role(&self, organization_id: Uuid, role: MemberRole) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memberships WHERE organization_id = $1 AND role = $2",
        )
        .bind(organization_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_role(&self, organization_id: Uuid, user_id: Uuid, role: MemberRole) -> RepoResult<()> {
        sqlx::query("UPDATE memberships SET role = $3 WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, organization_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM memberships WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---
// 3. Locais
// ---

#[derive(Clone)]
pub struct PgLocationRepository {
    pool: PgPool,
}

impl PgLocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for PgLocationRepository {
    async fn insert(&self, l: &Location) -> RepoResult<Location> {
        sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (id, organization_id, name, address, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(l.id)
        .bind(l.organization_id)
        .bind(&l.name)
        .bind(&l.address)
        .bind(l.is_active)
        .bind(l.created_at)
        .bind(l.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya existe un local activo con ese nombre."))
    }

    async fn update(&self, l: &Location) -> RepoResult<Location> {
        sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations SET name = $3, address = $4, is_active = $5, updated_at = $6
            WHERE organization_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(l.organization_id)
        .bind(l.id)
        .bind(&l.name)
        .bind(&l.address)
        .bind(l.is_active)
        .bind(l.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya existe un local activo con ese nombre."))
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Location>> {
        let l = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(l)
    }

    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<Location>> {
        let list = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE organization_id = $1 ORDER BY name")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(list)
    }

    async fn active_name_taken(&self, organization_id: Uuid, name: &str, except: Option<Uuid>) -> RepoResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM locations
                WHERE organization_id = $1 AND lower(name) = lower($2) AND is_active
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }
}

// ---
// 4. Convites
// ---

#[derive(Clone)]
pub struct PgInvitationRepository {
    pool: PgPool,
}

impl PgInvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationRepository for PgInvitationRepository {
    async fn insert(&self, i: &Invitation) -> RepoResult<Invitation> {
        sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (
                id, organization_id, email, role, token_hash, invited_by, status,
                expires_at, accepted_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(i.id)
        .bind(i.organization_id)
        .bind(&i.email)
        .bind(i.role)
        .bind(&i.token_hash)
        .bind(i.invited_by)
        .bind(i.status)
        .bind(i.expires_at)
        .bind(i.accepted_at)
        .bind(i.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya existe una invitación pendiente para ese e-mail."))
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> RepoResult<Option<Invitation>> {
        let i = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(i)
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> RepoResult<Option<Invitation>> {
        let i = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(i)
    }

    async fn find_pending_for_email(&self, organization_id: Uuid, email: &str) -> RepoResult<Option<Invitation>> {
        let i = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE organization_id = $1 AND email = $2 AND status = 'PENDING'",
        )
        .bind(organization_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(i)
    }

    async fn list(&self, organization_id: Uuid) -> RepoResult<Vec<Invitation>> {
        let list = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE organization_id = $1 ORDER BY created_at DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }

    async fn set_status(&self, id: Uuid, status: InvitationStatus) -> RepoResult<()> {
        sqlx::query("UPDATE invitations SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn accept(&self, invitation_id: Uuid, membership: &Membership, at: DateTime<Utc>) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO memberships (organization_id, user_id, role, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(membership.organization_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya sos miembro de esta organización."))?;

        sqlx::query("UPDATE invitations SET status = 'ACCEPTED', accepted_at = $2 WHERE id = $1")
            .bind(invitation_id)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
