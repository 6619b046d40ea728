// src/services/document_service.rs

use chrono::Months;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError, mime, response::Page},
    config::StorageSettings,
    db::Repositories,
    models::{
        document::{
            Document, DocumentQuery, DocumentView, RegisterDocumentPayload, RequestUploadUrlPayload,
            UploadUrlResponse,
        },
        tenancy::Organization,
    },
    services::{
        audit_service::{AuditEntry, AuditService},
        storage::ObjectStorage,
    },
};

fn key_prefix(organization_id: Uuid) -> String {
    format!("organizations/{}/documents/", organization_id)
}

#[derive(Clone)]
pub struct DocumentService {
    repos: Repositories,
    audit: AuditService,
    storage: Arc<dyn ObjectStorage>,
    clock: Arc<dyn Clock>,
    settings: StorageSettings,
}

impl DocumentService {
    pub fn new(
        repos: Repositories,
        audit: AuditService,
        storage: Arc<dyn ObjectStorage>,
        clock: Arc<dyn Clock>,
        settings: StorageSettings,
    ) -> Self {
        Self { repos, audit, storage, clock, settings }
    }

    fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.settings.presign_ttl_secs)
    }

    fn too_large(&self) -> AppError {
        AppError::field(
            "sizeBytes",
            &format!("El archivo supera el máximo de {} MB.", self.settings.max_upload_bytes / (1024 * 1024)),
        )
    }

    /// Falha ao apagar do storage só gera aviso.
    async fn remove_object(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(error = %e, key = %key, "Não foi possível remover o objeto do storage");
        }
    }

    async fn load(&self, org: &Organization, id: Uuid) -> Result<Document, AppError> {
        self.repos
            .documents
            .find(org.id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Documento"))
    }

    async fn with_url(&self, document: Document) -> Result<DocumentView, AppError> {
        let download_url = self.storage.presign_get(&document.storage_key, self.presign_ttl()).await?;
        Ok(DocumentView { document, download_url: Some(download_url) })
    }

    // ---
    // Upload em duas etapas: URL pré-assinada, depois registro
    // ---

    pub async fn request_upload_url(
        &self,
        org: &Organization,
        payload: &RequestUploadUrlPayload,
    ) -> Result<UploadUrlResponse, AppError> {
        if !mime::is_allowed(&payload.mime_type) {
            return Err(AppError::field("mimeType", "Tipo de archivo no permitido."));
        }
        if payload.size_bytes > self.settings.max_upload_bytes {
            return Err(self.too_large());
        }

        let storage_key = format!(
            "{}{}-{}",
            key_prefix(org.id),
            Uuid::new_v4(),
            mime::sanitize_file_name(&payload.file_name)
        );
        let upload_url = self.storage.presign_put(&storage_key, self.presign_ttl()).await?;

        Ok(UploadUrlResponse { storage_key, upload_url, expires_in: self.settings.presign_ttl_secs })
    }

    /// Confere o objeto já enviado (tamanho real e tipo detectado) antes de gravar os metadados.
    pub async fn register(
        &self,
        org: &Organization,
        actor: Uuid,
        payload: &RegisterDocumentPayload,
    ) -> Result<DocumentView, AppError> {
        let key = payload.storage_key.trim();
        if !key.starts_with(&key_prefix(org.id)) || key.contains("..") {
            return Err(AppError::BadRequest("La clave de almacenamiento no pertenece a la organización.".into()));
        }
        if !mime::is_allowed(&payload.mime_type) {
            return Err(AppError::field("mimeType", "Tipo de archivo no permitido."));
        }
        if let Some(obligation_id) = payload.obligation_id {
            self.repos
                .obligations
                .find(org.id, obligation_id)
                .await?
                .ok_or_else(|| AppError::not_found("Obligación"))?;
        }
        if let Some(task_id) = payload.task_id {
            self.repos
                .tasks
                .find(org.id, task_id)
                .await?
                .ok_or_else(|| AppError::not_found("Tarea"))?;
        }

        let size = self
            .storage
            .head_size(key)
            .await?
            .ok_or_else(|| AppError::BadRequest("El archivo todavía no fue subido.".into()))?;
        if size as i64 > self.settings.max_upload_bytes {
            self.remove_object(key).await;
            return Err(self.too_large());
        }

        let head = self.storage.read_prefix(key, mime::SNIFF_LEN).await?;
        let detected = mime::detect(&head, &payload.mime_type);
        if !mime::is_allowed(detected) {
            tracing::warn!(key = %key, declared = %payload.mime_type, detected, "Conteúdo não confere com o tipo permitido");
            self.remove_object(key).await;
            return Err(AppError::BadRequest("El contenido del archivo no corresponde a un tipo permitido.".into()));
        }

        let document = self
            .repos
            .documents
            .insert(&Document {
                id: Uuid::new_v4(),
                organization_id: org.id,
                obligation_id: payload.obligation_id,
                task_id: payload.task_id,
                file_name: payload.file_name.trim().to_string(),
                storage_key: key.to_string(),
                declared_mime_type: mime::essence(&payload.mime_type),
                detected_mime_type: detected.to_string(),
                size_bytes: size as i64,
                uploaded_by: actor,
                created_at: self.clock.now(),
            })
            .await?;

        self.audit
            .record(
                AuditEntry::new("document.uploaded")
                    .org(org.id)
                    .user(actor)
                    .entity("document", document.id)
                    .meta(json!({
                        "fileName": document.file_name,
                        "obligationId": document.obligation_id,
                        "sizeBytes": document.size_bytes,
                    })),
            )
            .await;
        self.with_url(document).await
    }

    pub async fn list(&self, org: &Organization, query: &DocumentQuery) -> Result<Page<Document>, AppError> {
        self.repos.documents.list(org.id, query, query.page_params()).await
    }

    pub async fn get(&self, org: &Organization, id: Uuid) -> Result<DocumentView, AppError> {
        let document = self.load(org, id).await?;
        self.with_url(document).await
    }

    pub async fn delete(&self, org: &Organization, actor: Uuid, id: Uuid) -> Result<(), AppError> {
        let document = self.load(org, id).await?;
        self.remove_object(&document.storage_key).await;
        self.repos.documents.delete(org.id, id).await?;

        self.audit
            .record(
                AuditEntry::new("document.deleted")
                    .org(org.id)
                    .user(actor)
                    .entity("document", id)
                    .meta(json!({ "fileName": document.file_name })),
            )
            .await;
        Ok(())
    }

    /// Política de retenção: apaga documentos mais antigos que `retention_months`.
    pub async fn purge_expired(&self, org: &Organization) -> Result<u32, AppError> {
        let Ok(months) = u32::try_from(org.retention_months) else {
            return Ok(0);
        };
        if months == 0 {
            return Ok(0);
        }
        let now = self.clock.now();
        let Some(cutoff) = now.checked_sub_months(Months::new(months)) else {
            return Ok(0);
        };

        let mut purged = 0;
        for document in self.repos.documents.list_created_before(org.id, cutoff).await? {
            self.remove_object(&document.storage_key).await;
            if !self.repos.documents.delete(org.id, document.id).await? {
                continue;
            }
            purged += 1;
            self.audit
                .record(
                    AuditEntry::new("document.deleted")
                        .org(org.id)
                        .entity("document", document.id)
                        .meta(json!({ "fileName": document.file_name, "reason": "retention_policy" })),
                )
                .await;
        }

        if purged > 0 {
            tracing::info!(org_id = %org.id, purged, "Documentos removidos pela política de retenção");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::clock::testing::FixedClock,
        config::testing::config,
        models::{audit::AuditQuery, auth::User},
        services::{
            storage::testing::MemoryStorage,
            test_support::{self as ts, date},
        },
    };

    struct Fixture {
        repos: Repositories,
        svc: DocumentService,
        storage: Arc<MemoryStorage>,
        clock: Arc<FixedClock>,
        org: Organization,
        owner: User,
    }

    async fn fixture_with(storage: MemoryStorage) -> Fixture {
        let repos = Repositories::in_memory();
        let clock = Arc::new(FixedClock::on(date(2025, 3, 15)));
        let storage = Arc::new(storage);
        let audit = AuditService::new(repos.audit.clone(), clock.clone());
        let svc = DocumentService::new(repos.clone(), audit, storage.clone(), clock.clone(), config().storage);
        let owner = ts::user(&repos, "duena@bar.com", "Dueña").await;
        let org = ts::org(&repos, &owner).await;
        Fixture { repos, svc, storage, clock, org, owner }
    }

    async fn fixture() -> Fixture {
        fixture_with(MemoryStorage::default()).await
    }

    fn upload(name: &str, mime_type: &str, size: i64) -> RequestUploadUrlPayload {
        RequestUploadUrlPayload { file_name: name.into(), mime_type: mime_type.into(), size_bytes: size }
    }

    fn register(key: &str, mime_type: &str) -> RegisterDocumentPayload {
        RegisterDocumentPayload {
            storage_key: key.into(),
            file_name: "constancia.pdf".into(),
            mime_type: mime_type.into(),
            obligation_id: None,
            task_id: None,
        }
    }

    async fn uploaded_pdf(f: &Fixture) -> DocumentView {
        let url = f.svc.request_upload_url(&f.org, &upload("constancia.pdf", "application/pdf", 100)).await.unwrap();
        f.storage.put(&url.storage_key, b"%PDF-1.7 contenido");
        f.svc.register(&f.org, f.owner.id, &register(&url.storage_key, "application/pdf")).await.unwrap()
    }

    #[tokio::test]
    async fn upload_url_is_scoped_to_the_org() {
        let f = fixture().await;
        let url = f
            .svc
            .request_upload_url(&f.org, &upload("../Factura Marzo.pdf", "application/pdf", 1024))
            .await
            .unwrap();
        assert!(url.storage_key.starts_with(&key_prefix(f.org.id)));
        assert!(url.storage_key.ends_with("-__Factura_Marzo.pdf"));
        assert!(url.upload_url.contains("method=PUT"));
        assert_eq!(url.expires_in, 900);
    }

    #[tokio::test]
    async fn upload_url_rejects_type_and_size() {
        let f = fixture().await;
        let err = f.svc.request_upload_url(&f.org, &upload("x.exe", "application/x-msdownload", 10)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
        let err = f
            .svc
            .request_upload_url(&f.org, &upload("x.pdf", "application/pdf", 21 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn register_checks_the_stored_object() {
        let f = fixture().await;
        let view = uploaded_pdf(&f).await;
        assert_eq!(view.document.detected_mime_type, "application/pdf");
        assert_eq!(view.document.size_bytes, 18);
        assert!(view.download_url.unwrap().contains("method=GET"));
    }

    #[tokio::test]
    async fn foreign_keys_are_rejected() {
        let f = fixture().await;
        let foreign = format!("organizations/{}/documents/x.pdf", Uuid::new_v4());
        let err = f.svc.register(&f.org, f.owner.id, &register(&foreign, "application/pdf")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let sneaky = format!("{}../../otra/x.pdf", key_prefix(f.org.id));
        assert!(f.svc.register(&f.org, f.owner.id, &register(&sneaky, "application/pdf")).await.is_err());
    }

    #[tokio::test]
    async fn missing_object_is_a_bad_request() {
        let f = fixture().await;
        let key = format!("{}nunca-subido.pdf", key_prefix(f.org.id));
        let err = f.svc.register(&f.org, f.owner.id, &register(&key, "application/pdf")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn disguised_executables_are_removed() {
        let f = fixture().await;
        let key = format!("{}falso.pdf", key_prefix(f.org.id));
        f.storage.put(&key, &[0x4D, 0x5A, 0x90, 0x00, 0x03]);

        let err = f.svc.register(&f.org, f.owner.id, &register(&key, "application/pdf")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(!f.storage.contains(&key));
    }

    #[tokio::test]
    async fn obligation_must_belong_to_the_org() {
        let f = fixture().await;
        let key = format!("{}a.pdf", key_prefix(f.org.id));
        f.storage.put(&key, b"%PDF-1.4");
        let mut payload = register(&key, "application/pdf");
        payload.obligation_id = Some(Uuid::new_v4());
        assert!(matches!(
            f.svc.register(&f.org, f.owner.id, &payload).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_survives_storage_failures() {
        let f = fixture_with(MemoryStorage::failing_deletes()).await;
        let view = uploaded_pdf(&f).await;
        f.svc.delete(&f.org, f.owner.id, view.document.id).await.unwrap();
        assert!(matches!(f.svc.get(&f.org, view.document.id).await.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn retention_purges_only_old_documents() {
        let mut f = fixture().await;
        let old = uploaded_pdf(&f).await;
        f.clock.advance_days(200);
        let recent = uploaded_pdf(&f).await;

        // sem política, nada muda
        assert_eq!(f.svc.purge_expired(&f.org).await.unwrap(), 0);

        f.org.retention_months = 6;
        assert_eq!(f.svc.purge_expired(&f.org).await.unwrap(), 1);
        assert!(f.svc.get(&f.org, old.document.id).await.is_err());
        assert!(f.svc.get(&f.org, recent.document.id).await.is_ok());
        assert!(!f.storage.contains(&old.document.storage_key));

        let events = f
            .repos
            .audit
            .list(f.org.id, &AuditQuery { action: Some("document.deleted".into()), ..Default::default() }, Default::default())
            .await
            .unwrap();
        assert_eq!(events.total, 1);
        assert_eq!(events.items[0].metadata["reason"], "retention_policy");
    }
}
