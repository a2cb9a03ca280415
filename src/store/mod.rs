//! Persistence contracts for users and articles.
//!
//! Handlers never talk to a backend directly: they go through the services,
//! which hold `Arc<dyn UserStore>` / `Arc<dyn ArticleStore>` from
//! [`AppState`](crate::state::AppState) and wrap each call in [`with_deadline`].
//! Stores perform no ownership checks of their own; the `*_owned` variants
//! only make the guard's decision and the write a single conditional statement.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use uuid::Uuid;

use crate::articles::repo_types::{Article, ArticleDraft};
use crate::users::repo_types::{NewUser, UserInfo};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("login already taken")]
    LoginTaken,
    #[error("owner login does not resolve to a user")]
    UnknownOwner,
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Logins are unique; a duplicate yields `LoginTaken`.
    async fn create_user(&self, user: NewUser) -> Result<UserInfo, StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<UserInfo, StoreError>;
    async fn get_user_by_login(&self, login: &str) -> Result<UserInfo, StoreError>;
    async fn list_users(&self) -> Result<Vec<UserInfo>, StoreError>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Resolve `owner_login` and insert in one step; `UnknownOwner` if it does not resolve.
    async fn create_article(
        &self,
        draft: ArticleDraft,
        owner_login: &str,
    ) -> Result<Article, StoreError>;
    async fn get_article(&self, id: Uuid) -> Result<Article, StoreError>;
    async fn list_articles(&self) -> Result<Vec<Article>, StoreError>;
    async fn list_articles_by_owner(&self, owner_id: Uuid) -> Result<Vec<Article>, StoreError>;
    async fn update_article(&self, id: Uuid, draft: ArticleDraft) -> Result<Article, StoreError>;
    /// Like `update_article`, but only touches the row if `owner_id` still owns it.
    async fn update_owned_article(
        &self,
        id: Uuid,
        owner_id: Uuid,
        draft: ArticleDraft,
    ) -> Result<Article, StoreError>;
    async fn delete_article(&self, id: Uuid) -> Result<(), StoreError>;
    /// Like `delete_article`, but only removes the row if `owner_id` still owns it.
    async fn delete_owned_article(&self, id: Uuid, owner_id: Uuid) -> Result<(), StoreError>;
}

/// Bound a store call; elapsed deadlines surface as `StoreError::Timeout`.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_deadline_passes_results_through() {
        let v = with_deadline(Duration::from_secs(1), async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);

        let err = with_deadline(Duration::from_secs(1), async {
            Err::<(), _>(StoreError::NotFound)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn with_deadline_times_out_slow_calls() {
        let limit = Duration::from_millis(10);
        let err = with_deadline(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(d) if d == limit));
    }
}
