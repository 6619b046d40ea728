// src/services/jurisdiction_service.rs

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::Repositories,
    models::jurisdiction::{CreateJurisdictionPayload, Jurisdiction, UpdateJurisdictionPayload},
    services::audit_service::{AuditEntry, AuditService},
};

#[derive(Clone)]
pub struct JurisdictionService {
    repos: Repositories,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

impl JurisdictionService {
    pub fn new(repos: Repositories, audit: AuditService, clock: Arc<dyn Clock>) -> Self {
        Self { repos, audit, clock }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Jurisdiction>, AppError> {
        self.repos.jurisdictions.list(include_inactive).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Jurisdiction, AppError> {
        self.repos
            .jurisdictions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Jurisdicción"))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Jurisdiction, AppError> {
        self.repos
            .jurisdictions
            .find_by_code(&code.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::not_found("Jurisdicción"))
    }

    pub async fn create(&self, actor: Uuid, payload: &CreateJurisdictionPayload) -> Result<Jurisdiction, AppError> {
        let now = self.clock.now();
        let jurisdiction = self
            .repos
            .jurisdictions
            .insert(&Jurisdiction {
                id: Uuid::new_v4(),
                code: payload.code.clone(),
                name: payload.name.trim().to_string(),
                country: payload.country.to_uppercase(),
                province: payload.province.trim().to_string(),
                city: payload.city.as_ref().map(|c| c.trim().to_string()),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.audit
            .record(
                AuditEntry::new("jurisdiction.created")
                    .user(actor)
                    .entity("jurisdiction", jurisdiction.id)
                    .meta(json!({ "code": jurisdiction.code })),
            )
            .await;
        Ok(jurisdiction)
    }

    pub async fn update(
        &self,
        actor: Uuid,
        id: Uuid,
        payload: &UpdateJurisdictionPayload,
    ) -> Result<Jurisdiction, AppError> {
        let mut jurisdiction = self.get(id).await?;

        if let Some(name) = &payload.name {
            jurisdiction.name = name.trim().to_string();
        }
        if let Some(country) = &payload.country {
            jurisdiction.country = country.to_uppercase();
        }
        if let Some(province) = &payload.province {
            jurisdiction.province = province.trim().to_string();
        }
        if let Some(city) = &payload.city {
            jurisdiction.city = Some(city.trim().to_string()).filter(|c| !c.is_empty());
        }
        if let Some(active) = payload.is_active {
            jurisdiction.is_active = active;
        }
        jurisdiction.updated_at = self.clock.now();

        let jurisdiction = self.repos.jurisdictions.update(&jurisdiction).await?;
        self.audit
            .record(AuditEntry::new("jurisdiction.updated").user(actor).entity("jurisdiction", jurisdiction.id))
            .await;
        Ok(jurisdiction)
    }
}
