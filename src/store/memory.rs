use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ArticleStore, StoreError, UserStore};
use crate::articles::repo_types::{Article, ArticleDraft};
use crate::users::repo_types::{NewUser, UserInfo};

struct ArticleRecord {
    id: Uuid,
    draft: ArticleDraft,
    owner_id: Uuid,
    created: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserInfo>,
    articles: Vec<ArticleRecord>,
}

impl Tables {
    fn render(&self, rec: &ArticleRecord) -> Article {
        let author_login = self
            .users
            .iter()
            .find(|u| u.id == rec.owner_id)
            .map(|u| u.login.clone())
            .unwrap_or_default();
        Article {
            id: rec.id,
            category: rec.draft.category.clone(),
            title: rec.draft.title.clone(),
            subtitle: rec.draft.subtitle.clone(),
            content: rec.draft.content.clone(),
            owner_id: rec.owner_id,
            created: rec.created,
            author_login,
        }
    }

    fn newest_first(&self, keep: impl Fn(&ArticleRecord) -> bool) -> Vec<Article> {
        let mut out: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| keep(*a))
            .map(|a| self.render(a))
            .collect();
        out.sort_by(|a, b| b.created.cmp(&a.created));
        out
    }

    fn update_where(
        &mut self,
        id: Uuid,
        owner_id: Option<Uuid>,
        draft: ArticleDraft,
    ) -> Result<Article, StoreError> {
        let pos = self
            .articles
            .iter()
            .position(|a| a.id == id && owner_id.map_or(true, |o| a.owner_id == o))
            .ok_or(StoreError::NotFound)?;
        let rec = &mut self.articles[pos];
        rec.draft = draft;
        rec.created = OffsetDateTime::now_utc();
        Ok(self.render(&self.articles[pos]))
    }

    fn delete_where(&mut self, id: Uuid, owner_id: Option<Uuid>) -> Result<(), StoreError> {
        let pos = self
            .articles
            .iter()
            .position(|a| a.id == id && owner_id.map_or(true, |o| a.owner_id == o))
            .ok_or(StoreError::NotFound)?;
        self.articles.remove(pos);
        Ok(())
    }
}

/// Process-local store for development and tests (`STORE_BACKEND=memory`).
/// Every operation takes the lock once, so check-and-write sequences are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<UserInfo, StoreError> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.login == user.login) {
            return Err(StoreError::LoginTaken);
        }
        let info = UserInfo {
            id: Uuid::new_v4(),
            login: user.login,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created: OffsetDateTime::now_utc(),
        };
        t.users.push(info.clone());
        Ok(info)
    }

    async fn get_user(&self, id: Uuid) -> Result<UserInfo, StoreError> {
        let t = self.tables.read().await;
        t.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<UserInfo, StoreError> {
        let t = self.tables.read().await;
        t.users
            .iter()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_users(&self) -> Result<Vec<UserInfo>, StoreError> {
        Ok(self.tables.read().await.users.clone())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn create_article(
        &self,
        draft: ArticleDraft,
        owner_login: &str,
    ) -> Result<Article, StoreError> {
        let mut t = self.tables.write().await;
        let owner_id = t
            .users
            .iter()
            .find(|u| u.login == owner_login)
            .map(|u| u.id)
            .ok_or(StoreError::UnknownOwner)?;
        let rec = ArticleRecord {
            id: Uuid::new_v4(),
            draft,
            owner_id,
            created: OffsetDateTime::now_utc(),
        };
        let article = t.render(&rec);
        t.articles.push(rec);
        Ok(article)
    }

    async fn get_article(&self, id: Uuid) -> Result<Article, StoreError> {
        let t = self.tables.read().await;
        t.articles
            .iter()
            .find(|a| a.id == id)
            .map(|a| t.render(a))
            .ok_or(StoreError::NotFound)
    }

    async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        Ok(self.tables.read().await.newest_first(|_| true))
    }

    async fn list_articles_by_owner(&self, owner_id: Uuid) -> Result<Vec<Article>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .newest_first(|a| a.owner_id == owner_id))
    }

    async fn update_article(&self, id: Uuid, draft: ArticleDraft) -> Result<Article, StoreError> {
        self.tables.write().await.update_where(id, None, draft)
    }

    async fn update_owned_article(
        &self,
        id: Uuid,
        owner_id: Uuid,
        draft: ArticleDraft,
    ) -> Result<Article, StoreError> {
        self.tables.write().await.update_where(id, Some(owner_id), draft)
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.delete_where(id, None)
    }

    async fn delete_owned_article(&self, id: Uuid, owner_id: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.delete_where(id, Some(owner_id))
    }
}
