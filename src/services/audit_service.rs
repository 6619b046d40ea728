// src/services/audit_service.rs

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::{
        clock::Clock,
        error::AppError,
        response::Page,
    },
    db::AuditRepository,
    models::audit::{AuditEvent, AuditQuery},
};

/// Evento a registrar, montado pelos serviços.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    action: &'static str,
    organization_id: Option<Uuid>,
    user_id: Option<Uuid>,
    entity_type: Option<&'static str>,
    entity_id: Option<Uuid>,
    metadata: Value,
}

impl AuditEntry {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            organization_id: None,
            user_id: None,
            entity_type: None,
            entity_id: None,
            metadata: json!({}),
        }
    }

    pub fn org(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn entity(mut self, entity_type: &'static str, entity_id: Uuid) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id);
        self
    }

    pub fn meta(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Clone)]
pub struct AuditService {
    repo: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Falha de auditoria nunca derruba a operação principal.
    pub async fn record(&self, entry: AuditEntry) {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            organization_id: entry.organization_id,
            user_id: entry.user_id,
            entity_type: entry.entity_type.map(str::to_string),
            entity_id: entry.entity_id,
            action: entry.action.to_string(),
            metadata: entry.metadata,
            created_at: self.clock.now(),
        };

        if let Err(e) = self.repo.insert(&event).await {
            tracing::warn!(error = %e, action = %event.action, "Falha ao gravar evento de auditoria");
        }
    }

    pub async fn list(&self, organization_id: Uuid, query: &AuditQuery) -> Result<Page<AuditEvent>, AppError> {
        self.repo.list(organization_id, query, query.page_params()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::clock::testing::FixedClock, db::Repositories};
    use chrono::NaiveDate;

    fn service() -> AuditService {
        let repos = Repositories::in_memory();
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 5, 2).unwrap()));
        AuditService::new(repos.audit, clock)
    }

    #[tokio::test]
    async fn events_are_filtered_and_newest_first() {
        let audit = service();
        let org = Uuid::new_v4();
        let obligation = Uuid::new_v4();

        audit.record(AuditEntry::new("obligation.created").org(org).entity("obligation", obligation)).await;
        audit
            .record(
                AuditEntry::new("obligation.status_changed")
                    .org(org)
                    .entity("obligation", obligation)
                    .meta(json!({ "from": "PENDING", "to": "IN_PROGRESS" })),
            )
            .await;
        audit.record(AuditEntry::new("obligation.created").org(Uuid::new_v4())).await;

        let page = audit.list(org, &AuditQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);

        let changed = audit
            .list(org, &AuditQuery { action: Some("obligation.status_changed".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(changed.total, 1);
        assert_eq!(changed.items[0].metadata["to"], "IN_PROGRESS");
    }
}
