// src/services/test_support.rs

// Sementes comuns dos testes de serviço, sempre sobre `Repositories::in_memory()`.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    db::Repositories,
    models::{
        auth::User,
        obligation::{Obligation, ObligationStatus, ObligationType},
        tenancy::{MemberRole, Membership, Organization, Plan},
    },
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn user(repos: &Repositories, email: &str, name: &str) -> User {
    let now = Utc::now();
    repos
        .users
        .insert(&User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: name.to_string(),
            password_hash: "hash".into(),
            is_platform_admin: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}

pub async fn org(repos: &Repositories, owner: &User) -> Organization {
    let now = Utc::now();
    // CUIT único por teste: 11 dígitos derivados do UUID
    let cuit: String = Uuid::new_v4().as_u128().to_string().chars().take(11).collect();
    let org = Organization {
        id: Uuid::new_v4(),
        cuit,
        name: "Bar La Esquina".into(),
        plan: Plan::Free,
        threshold_yellow_days: 15,
        threshold_red_days: 7,
        retention_months: 0,
        jurisdiction_id: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let membership = Membership { organization_id: org.id, user_id: owner.id, role: MemberRole::Owner, created_at: now };
    repos.organizations.create_with_owner(&org, &membership).await.unwrap()
}

/// Sem convite de verdade: o repositório só cria a membership.
pub async fn member(repos: &Repositories, org: &Organization, user: &User, role: MemberRole) -> Membership {
    let membership = Membership { organization_id: org.id, user_id: user.id, role, created_at: Utc::now() };
    repos.invitations.accept(Uuid::new_v4(), &membership, Utc::now()).await.unwrap();
    membership
}

pub fn obligation(org: &Organization, owner: Uuid, title: &str, due_date: NaiveDate) -> Obligation {
    let now = Utc::now();
    Obligation {
        id: Uuid::new_v4(),
        organization_id: org.id,
        location_id: None,
        title: title.to_string(),
        description: None,
        obligation_type: ObligationType::Permit,
        status: ObligationStatus::Pending,
        due_date,
        recurrence_rule: None,
        requires_review: false,
        required_evidence_count: 0,
        owner_user_id: owner,
        template_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub async fn insert_obligation(repos: &Repositories, o: Obligation) -> Obligation {
    repos.obligations.insert(&o, None).await.unwrap()
}
