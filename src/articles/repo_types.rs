use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Stored article plus the author's login resolved at read time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub category: String,
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub owner_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime, // refreshed on every update
    pub author_login: String,    // empty when the owner row is gone
}

/// Mutable fields of an article.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleDraft {
    pub category: String,
    pub title: String,
    pub subtitle: String,
    pub content: String,
}
