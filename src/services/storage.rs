// src/services/storage.rs

use async_trait::async_trait;
use http::Method;
use object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    path::Path,
    signer::Signer,
    Error as ObjectStoreError, ObjectStoreExt,
};
use std::time::Duration;

use crate::{common::error::AppError, config::StorageSettings};

/// Armazenamento de objetos visto pelos serviços. Os arquivos nunca passam
/// pela API: o cliente sobe e baixa direto com URLs pré-assinadas.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn presign_put(&self, key: &str, ttl: Duration) -> Result<String, AppError>;
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AppError>;
    /// Tamanho real do objeto; `None` se ele não existe.
    async fn head_size(&self, key: &str) -> Result<Option<u64>, AppError>;
    /// Primeiros `len` bytes, usados para detectar o tipo do arquivo.
    async fn read_prefix(&self, key: &str, len: u64) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    pub fn new(settings: &StorageSettings) -> anyhow::Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone());

        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build()?;
        tracing::info!(bucket = %settings.bucket, region = %settings.region, "Storage S3 inicializado");
        Ok(Self { store, bucket: settings.bucket.clone() })
    }

    fn storage_error(&self, key: &str, op: &str, err: ObjectStoreError) -> AppError {
        tracing::error!(error = %err, bucket = %self.bucket, key = %key, op, "Falha no storage");
        AppError::Storage(err.to_string())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn presign_put(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        let location = Path::from(key.to_string());
        let url = self
            .store
            .signed_url(Method::PUT, &location, ttl)
            .await
            .map_err(|e| self.storage_error(key, "presign_put", e))?;
        Ok(url.to_string())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        let location = Path::from(key.to_string());
        let url = self
            .store
            .signed_url(Method::GET, &location, ttl)
            .await
            .map_err(|e| self.storage_error(key, "presign_get", e))?;
        Ok(url.to_string())
    }

    async fn head_size(&self, key: &str) -> Result<Option<u64>, AppError> {
        let location = Path::from(key.to_string());
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(meta.size)),
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(self.storage_error(key, "head", e)),
        }
    }

    async fn read_prefix(&self, key: &str, len: u64) -> Result<Vec<u8>, AppError> {
        let location = Path::from(key.to_string());
        let bytes = self
            .store
            .get_range(&location, 0..len)
            .await
            .map_err(|e| self.storage_error(key, "get_range", e))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let location = Path::from(key.to_string());
        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(bucket = %self.bucket, key = %key, "Objeto removido do storage");
                Ok(())
            }
            Err(e) => Err(self.storage_error(key, "delete", e)),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::{collections::HashMap, sync::Mutex};

    /// Bucket em memória. As URLs são falsas, mas carregam a chave.
    #[derive(Default)]
    pub struct MemoryStorage {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        fail_deletes: bool,
    }

    impl MemoryStorage {
        pub fn failing_deletes() -> Self {
            Self { fail_deletes: true, ..Default::default() }
        }

        pub fn put(&self, key: &str, bytes: &[u8]) {
            self.objects.lock().unwrap().insert(key.to_string(), bytes.to_vec());
        }

        pub fn contains(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn presign_put(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
            Ok(format!("https://storage.test/{}?method=PUT&ttl={}", key, ttl.as_secs()))
        }

        async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
            Ok(format!("https://storage.test/{}?method=GET&ttl={}", key, ttl.as_secs()))
        }

        async fn head_size(&self, key: &str) -> Result<Option<u64>, AppError> {
            Ok(self.objects.lock().unwrap().get(key).map(|b| b.len() as u64))
        }

        async fn read_prefix(&self, key: &str, len: u64) -> Result<Vec<u8>, AppError> {
            let objects = self.objects.lock().unwrap();
            let bytes = objects
                .get(key)
                .ok_or_else(|| AppError::Storage(format!("objeto inexistente: {}", key)))?;
            Ok(bytes.iter().take(len as usize).copied().collect())
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            if self.fail_deletes {
                return Err(AppError::Storage("bucket indisponível".into()));
            }
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
