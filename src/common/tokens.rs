// src/common/tokens.rs

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Um token opaco recém-gerado. `plain` vai para o cliente uma única vez;
/// só `salt` e `hash` são persistidos.
#[derive(Debug, Clone)]
pub struct OpaqueToken {
    pub id: Uuid,
    pub plain: String,
    pub salt: String,
    pub hash: String,
}

impl OpaqueToken {
    pub fn generate() -> Self {
        let id = Uuid::new_v4();
        let secret = random_hex();
        let salt = random_hex();
        let hash = salted_hash(&salt, &secret);
        Self { id, plain: format!("{}.{}", id, secret), salt, hash }
    }
}

pub fn random_hex() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

pub fn salted_hash(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Separa `{id}.{secret}`; `None` para qualquer formato inválido.
pub fn split_token(token: &str) -> Option<(Uuid, &str)> {
    let (id, secret) = token.split_once('.')?;
    if secret.is_empty() {
        return None;
    }
    Uuid::parse_str(id).ok().map(|id| (id, secret))
}
