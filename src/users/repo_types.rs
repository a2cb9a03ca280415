use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::StoreError;

/// Account role. Registration only ever hands out `User`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "User" => Some(Role::User),
            "Admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Registered account.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// `userinfo` row as read from postgres.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created: OffsetDateTime,
}

impl TryFrom<UserRow> for UserInfo {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&r.role)
            .ok_or_else(|| StoreError::Corrupt(format!("user {} has role {:?}", r.id, r.role)))?;
        Ok(Self {
            id: r.id,
            login: r.login,
            email: r.email,
            password_hash: r.password_hash,
            role,
            created: r.created,
        })
    }
}
