use async_trait::async_trait;
use sqlx::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ApiKeysRepo, CreateApiKeyParams, RepoError};
use crate::domain::api_keys::{ApiKeyRecord, ApiRole};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const API_KEY_COLUMNS: &str =
    "id, name, prefix, hashed_secret, role, expires_at, revoked_at, last_used_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: Uuid,
    name: String,
    prefix: String,
    hashed_secret: Vec<u8>,
    role: ApiRole,
    expires_at: Option<OffsetDateTime>,
    revoked_at: Option<OffsetDateTime>,
    last_used_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<ApiKeyRow> for ApiKeyRecord {
    fn from(row: ApiKeyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            role: row.role,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ApiKeysRepo for PostgresRepositories {
    async fn create_key(&self, params: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError> {
        let sql = format!(
            "INSERT INTO api_keys (id, name, prefix, hashed_secret, role, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {API_KEY_COLUMNS}"
        );
        let row = query_as::<_, ApiKeyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.prefix)
            .bind(params.hashed_secret)
            .bind(params.role)
            .bind(params.expires_at)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
        let sql = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE prefix = $1");
        let row = query_as::<_, ApiKeyRow>(&sql)
            .bind(prefix)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ApiKeyRecord::from))
    }

    async fn revoke_key(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError> {
        let updated = sqlx::query(
            "UPDATE api_keys SET revoked_at = COALESCE(revoked_at, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(revoked_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if updated == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_last_used(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(used_at)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
