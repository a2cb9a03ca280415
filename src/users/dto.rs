use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Role, UserInfo};

/// Public part of an account returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl From<UserInfo> for PublicUser {
    fn from(u: UserInfo) -> Self {
        Self {
            id: u.id,
            login: u.login,
            email: u.email,
            role: u.role,
            created: u.created,
        }
    }
}
