//! Domain types for API keys and the roles they carry.

use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Role granted to an API key. Roles are ordered: `Admin` implies `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "api_role", rename_all = "snake_case")]
pub enum ApiRole {
    User,
    Admin,
}

impl ApiRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Returns true when a key holding `self` satisfies a requirement for `needed`.
    pub fn grants(self, needed: ApiRole) -> bool {
        self >= needed
    }
}

impl Display for ApiRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub name: String,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub role: ApiRole,
    pub expires_at: Option<OffsetDateTime>,
    pub revoked_at: Option<OffsetDateTime>,
    pub last_used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl ApiKeyRecord {
    pub fn is_revoked_at(&self, now: OffsetDateTime) -> bool {
        self.revoked_at.is_some_and(|revoked_at| revoked_at <= now)
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_implies_user() {
        assert!(ApiRole::Admin.grants(ApiRole::User));
        assert!(ApiRole::Admin.grants(ApiRole::Admin));
        assert!(ApiRole::User.grants(ApiRole::User));
        assert!(!ApiRole::User.grants(ApiRole::Admin));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [ApiRole::User, ApiRole::Admin] {
            assert_eq!(role.as_str().parse::<ApiRole>(), Ok(role));
        }
        assert!("root".parse::<ApiRole>().is_err());
    }
}
