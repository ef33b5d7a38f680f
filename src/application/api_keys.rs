use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::access::ApiPrincipal;
use crate::application::repos::{ApiKeysRepo, CreateApiKeyParams, RepoError};
use crate::domain::api_keys::{ApiKeyRecord, ApiRole};

const TOKEN_PREFIX: &str = "bk";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("api key name must not be blank")]
    BlankName,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiAuthError {
    #[error("invalid api key")]
    Invalid,
    #[error("expired api key")]
    Expired,
    #[error("revoked api key")]
    Revoked,
}

#[derive(Debug, Clone)]
pub struct IssueApiKeyCommand {
    pub name: String,
    pub role: ApiRole,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct ApiKeyIssued {
    pub record: ApiKeyRecord,
    /// Plain token. Only the hash is stored, so this is the single chance to show it.
    pub token: String,
}

#[derive(Clone)]
pub struct ApiKeyService {
    repo: Arc<dyn ApiKeysRepo>,
}

impl ApiKeyService {
    pub fn new(repo: Arc<dyn ApiKeysRepo>) -> Self {
        Self { repo }
    }

    pub async fn issue(&self, cmd: IssueApiKeyCommand) -> Result<ApiKeyIssued, ApiKeyError> {
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(ApiKeyError::BlankName);
        }

        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let record = self
            .repo
            .create_key(CreateApiKeyParams {
                name: name.to_string(),
                prefix,
                hashed_secret: Self::hash_secret(&secret),
                role: cmd.role,
                expires_at: cmd.expires_at,
            })
            .await?;

        info!(
            key_id = %record.id,
            prefix = %record.prefix,
            role = %record.role,
            "api key issued"
        );
        Ok(ApiKeyIssued { record, token })
    }

    pub async fn revoke(&self, id: Uuid) -> Result<(), ApiKeyError> {
        self.repo.revoke_key(id, OffsetDateTime::now_utc()).await?;
        Ok(())
    }

    pub async fn authenticate(&self, token: &str) -> Result<ApiPrincipal, ApiAuthError> {
        let parsed = Self::parse_token(token).ok_or(ApiAuthError::Invalid)?;
        let record = self
            .repo
            .find_by_prefix(&parsed.prefix)
            .await
            .map_err(|_| ApiAuthError::Invalid)?
            .ok_or(ApiAuthError::Invalid)?;

        let now = OffsetDateTime::now_utc();
        if record.is_revoked_at(now) {
            return Err(ApiAuthError::Revoked);
        }
        if record.is_expired_at(now) {
            return Err(ApiAuthError::Expired);
        }

        let hashed_input = Self::hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(ApiAuthError::Invalid);
        }

        // best-effort last_used update; do not block auth
        let repo = self.repo.clone();
        let key_id = record.id;
        tokio::spawn(async move {
            if let Err(err) = repo.update_last_used(key_id, now).await {
                debug!(%key_id, error = %err, "failed to record api key usage");
            }
        });

        Ok(ApiPrincipal {
            key_id: record.id,
            name: record.name,
            prefix: record.prefix,
            role: record.role,
        })
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
            return None;
        }
        Some(ParsedToken {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}
