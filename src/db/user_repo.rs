// src/db/user_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{conflict_on_unique, AuthTokenRepository, RepoResult, UserRepository},
    models::auth::{AuthToken, TokenKind, User},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, full_name, password_hash, is_platform_admin, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.is_platform_admin)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "El e-mail ya está registrado."))
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // E-mails são guardados em minúsculas
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---
// Tokens opacos (refresh e reset de senha)
// ---

#[derive(Clone)]
pub struct PgAuthTokenRepository {
    pool: PgPool,
}

impl PgAuthTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthTokenRepository for PgAuthTokenRepository {
    async fn insert(&self, token: &AuthToken) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (id, user_id, kind, salt, token_hash, expires_at, used_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(token.kind)
        .bind(&token.salt)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> RepoResult<Option<AuthToken>> {
        let token = sqlx::query_as::<_, AuthToken>("SELECT * FROM auth_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }

    // O `used_at IS NULL` no WHERE garante que só uma requisição concorrente vence
    async fn mark_used(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE auth_tokens SET used_at = $2 WHERE id = $1 AND used_at IS NULL")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all(&self, user_id: Uuid, kind: TokenKind, at: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query(
            "UPDATE auth_tokens SET used_at = $3 WHERE user_id = $1 AND kind = $2 AND used_at IS NULL",
        )
        .bind(user_id)
        .bind(kind)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
