// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::{
        clock::Clock,
        error::AppError,
        tokens::{salted_hash, split_token, OpaqueToken},
    },
    config::AuthSettings,
    db::Repositories,
    models::auth::{AuthResponse, AuthToken, Claims, RegisterUserPayload, TokenKind, User},
    services::{
        audit_service::{AuditEntry, AuditService},
        notification_service::NotificationService,
    },
};

const PASSWORD_RESET_TTL_MINUTES: i64 = 60;

#[derive(Clone)]
pub struct AuthService {
    repos: Repositories,
    audit: AuditService,
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_token() -> AppError {
    AppError::Unauthorized("Token inválido o expirado.".into())
}

impl AuthService {
    pub fn new(
        repos: Repositories,
        audit: AuditService,
        notifications: NotificationService,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self { repos, audit, notifications, clock, settings }
    }

    pub async fn register(&self, payload: &RegisterUserPayload) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&payload.email);
        if self.repos.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("El e-mail ya está registrado.".into()));
        }

        let password_hash = self.hash_password(&payload.password).await?;
        let now = self.clock.now();
        let user = self
            .repos
            .users
            .insert(&User {
                id: Uuid::new_v4(),
                email,
                full_name: payload.full_name.trim().to_string(),
                password_hash,
                is_platform_admin: false,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, "Usuário registrado");
        self.audit.record(AuditEntry::new("user.registered").user(user.id).entity("user", user.id)).await;
        self.issue_tokens(user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .repos
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::Unauthorized("La cuenta está desactivada.".into()));
        }

        self.audit.record(AuditEntry::new("user.logged_in").user(user.id).entity("user", user.id)).await;
        self.issue_tokens(user).await
    }

    /// Rotação: o token apresentado é consumido e um par novo é emitido.
    /// Reuso de um token já consumido revoga toda a família do usuário.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AppError> {
        let token = self.verify_opaque(refresh_token, TokenKind::Refresh).await?;
        let now = self.clock.now();

        let consumed = token.used_at.is_none() && self.repos.auth_tokens.mark_used(token.id, now).await?;
        if !consumed {
            let revoked = self.repos.auth_tokens.revoke_all(token.user_id, TokenKind::Refresh, now).await?;
            tracing::warn!(user_id = %token.user_id, revoked, "Reuso de refresh token detectado");
            self.audit
                .record(AuditEntry::new("auth.refresh_reuse_detected").user(token.user_id).entity("user", token.user_id))
                .await;
            return Err(invalid_token());
        }

        let user = self.active_user(token.user_id).await?;
        self.issue_tokens(user).await
    }

    /// Revoga o refresh token do próprio usuário; tokens alheios ou inválidos são ignorados.
    pub async fn logout(&self, user: &User, refresh_token: &str) -> Result<(), AppError> {
        if let Ok(token) = self.verify_opaque(refresh_token, TokenKind::Refresh).await {
            if token.user_id == user.id && token.used_at.is_none() {
                self.repos.auth_tokens.mark_used(token.id, self.clock.now()).await?;
            }
        }
        self.audit.record(AuditEntry::new("user.logged_out").user(user.id).entity("user", user.id)).await;
        Ok(())
    }

    pub async fn change_password(&self, user: &User, current: &str, new_password: &str) -> Result<(), AppError> {
        let stored = self.active_user(user.id).await?;
        if !self.verify_password(current, &stored.password_hash).await? {
            return Err(AppError::field("currentPassword", "La contraseña actual es incorrecta."));
        }

        let password_hash = self.hash_password(new_password).await?;
        let now = self.clock.now();
        self.repos.users.update_password(user.id, &password_hash, now).await?;
        self.repos.auth_tokens.revoke_all(user.id, TokenKind::Refresh, now).await?;

        self.audit.record(AuditEntry::new("user.password_changed").user(user.id).entity("user", user.id)).await;
        Ok(())
    }

    /// Sempre responde Ok para não revelar quais e-mails existem.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.repos.users.find_by_email(&normalize_email(email)).await? else {
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        let token = self
            .store_opaque(user.id, TokenKind::PasswordReset, Duration::minutes(PASSWORD_RESET_TTL_MINUTES))
            .await?;

        if let Err(e) = self.notifications.send_password_reset(&user, &token).await {
            tracing::warn!(error = %e, user_id = %user.id, "Falha ao enviar e-mail de reset de senha");
        }
        self.audit.record(AuditEntry::new("user.password_reset_requested").user(user.id).entity("user", user.id)).await;
        Ok(())
    }

    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), AppError> {
        let token = self.verify_opaque(reset_token, TokenKind::PasswordReset).await?;
        let now = self.clock.now();

        if token.used_at.is_some() || !self.repos.auth_tokens.mark_used(token.id, now).await? {
            return Err(invalid_token());
        }

        let user = self.active_user(token.user_id).await?;
        let password_hash = self.hash_password(new_password).await?;
        self.repos.users.update_password(user.id, &password_hash, now).await?;
        self.repos.auth_tokens.revoke_all(user.id, TokenKind::Refresh, now).await?;

        self.audit.record(AuditEntry::new("user.password_reset").user(user.id).entity("user", user.id)).await;
        Ok(())
    }

    /// Valida o access token (JWT) e devolve o usuário ativo.
    pub async fn validate_access_token(&self, token: &str) -> Result<User, AppError> {
        // `exp` é conferido contra o relógio injetado, não o do sistema
        let mut validation = Validation::default();
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &DecodingKey::from_secret(self.settings.jwt_secret.as_ref()), &validation)
            .map_err(|_| invalid_token())?
            .claims;

        if (claims.exp as i64) <= self.clock.now().timestamp() {
            return Err(invalid_token());
        }

        self.active_user(claims.sub).await
    }

    async fn active_user(&self, id: Uuid) -> Result<User, AppError> {
        match self.repos.users.find_by_id(id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(invalid_token()),
        }
    }

    // ---
    // Tokens
    // ---

    async fn issue_tokens(&self, user: User) -> Result<AuthResponse, AppError> {
        let access_token = self.create_access_token(user.id)?;
        let refresh_token = self
            .store_opaque(user.id, TokenKind::Refresh, Duration::days(self.settings.refresh_token_ttl_days))
            .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.settings.access_token_ttl_minutes * 60,
            user,
        })
    }

    fn create_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = self.clock.now();
        let expires_at = now + Duration::minutes(self.settings.access_token_ttl_minutes);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_ref()),
        )?)
    }

    /// Persiste só sal + hash; devolve o texto `{id}.{segredo}` para o cliente.
    async fn store_opaque(&self, user_id: Uuid, kind: TokenKind, ttl: Duration) -> Result<String, AppError> {
        let generated = OpaqueToken::generate();
        let now = self.clock.now();
        self.repos
            .auth_tokens
            .insert(&AuthToken {
                id: generated.id,
                user_id,
                kind,
                salt: generated.salt,
                token_hash: generated.hash,
                expires_at: now + ttl,
                used_at: None,
                created_at: now,
            })
            .await?;
        Ok(generated.plain)
    }

    /// Formato, tipo, hash e validade. Não olha `used_at`.
    async fn verify_opaque(&self, presented: &str, kind: TokenKind) -> Result<AuthToken, AppError> {
        let (id, secret) = split_token(presented).ok_or_else(invalid_token)?;
        let token = self.repos.auth_tokens.find(id).await?.ok_or_else(invalid_token)?;

        if token.kind != kind
            || salted_hash(&token.salt, secret) != token.token_hash
            || token.expires_at <= self.clock.now()
        {
            return Err(invalid_token());
        }
        Ok(token)
    }

    // ---
    // Senhas (bcrypt fora do runtime assíncrono)
    // ---

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let cost = self.settings.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(valid)
    }
}
