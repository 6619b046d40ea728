// src/db/jurisdiction_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{conflict_on_unique, JurisdictionRepository, RepoResult},
    models::jurisdiction::Jurisdiction,
};

#[derive(Clone)]
pub struct PgJurisdictionRepository {
    pool: PgPool,
}

impl PgJurisdictionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JurisdictionRepository for PgJurisdictionRepository {
    async fn insert(&self, j: &Jurisdiction) -> RepoResult<Jurisdiction> {
        sqlx::query_as::<_, Jurisdiction>(
            r#"
            INSERT INTO jurisdictions (id, code, name, country, province, city, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(j.id)
        .bind(&j.code)
        .bind(&j.name)
        .bind(&j.country)
        .bind(&j.province)
        .bind(&j.city)
        .bind(j.is_active)
        .bind(j.created_at)
        .bind(j.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Ya existe una jurisdicción con ese código."))
    }

    async fn update(&self, j: &Jurisdiction) -> RepoResult<Jurisdiction> {
        let updated = sqlx::query_as::<_, Jurisdiction>(
            r#"
            UPDATE jurisdictions
            SET name = $2, country = $3, province = $4, city = $5, is_active = $6, updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(j.id)
        .bind(&j.name)
        .bind(&j.country)
        .bind(&j.province)
        .bind(&j.city)
        .bind(j.is_active)
        .bind(j.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Jurisdiction>> {
        let j = sqlx::query_as::<_, Jurisdiction>("SELECT * FROM jurisdictions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(j)
    }

    async fn find_by_code(&self, code: &str) -> RepoResult<Option<Jurisdiction>> {
        let j = sqlx::query_as::<_, Jurisdiction>("SELECT * FROM jurisdictions WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(j)
    }

    async fn list(&self, include_inactive: bool) -> RepoResult<Vec<Jurisdiction>> {
        let list = sqlx::query_as::<_, Jurisdiction>(
            "SELECT * FROM jurisdictions WHERE ($1 OR is_active) ORDER BY code",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }
}
