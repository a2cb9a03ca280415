use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ArticleStore, StoreError, UserStore};
use crate::articles::repo_types::{Article, ArticleDraft};
use crate::config::AppConfig;
use crate::users::repo_types::{NewUser, UserInfo, UserRow};

/// Postgres-backed store. One pool is shared by every request.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL (or DB_USER and DB_NAME) must be set for the postgres store")?;
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.store_timeout)
            .connect(url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            warn!(error = %e, "migration failed; continuing");
        } else {
            info!("migrations applied");
        }
        Ok(Self { db })
    }

    async fn update_where(
        &self,
        id: Uuid,
        owner_id: Option<Uuid>,
        draft: ArticleDraft,
    ) -> Result<Article, StoreError> {
        let article = sqlx::query_as::<_, Article>(
            r#"
            WITH upd AS (
                UPDATE articles
                   SET category = $3, title = $4, subtitle = $5, content = $6, created = now()
                 WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)
                RETURNING id, category, title, subtitle, content, owner_id, created
            )
            SELECT upd.id, upd.category, upd.title, upd.subtitle, upd.content,
                   upd.owner_id, upd.created, COALESCE(u.login, '') AS author_login
              FROM upd
              LEFT JOIN userinfo u ON u.id = upd.owner_id
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(draft.category)
        .bind(draft.title)
        .bind(draft.subtitle)
        .bind(draft.content)
        .fetch_optional(&self.db)
        .await?;
        article.ok_or(StoreError::NotFound)
    }

    async fn delete_where(&self, id: Uuid, owner_id: Option<Uuid>) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            DELETE FROM articles
             WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(article_id = %id, "article row deleted");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<UserInfo, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO userinfo (login, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, login, email, password_hash, role, created
            "#,
        )
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::LoginTaken,
            other => StoreError::Database(other),
        })?;
        row.try_into()
    }

    async fn get_user(&self, id: Uuid) -> Result<UserInfo, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login, email, password_hash, role, created
            FROM userinfo
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn get_user_by_login(&self, login: &str) -> Result<UserInfo, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login, email, password_hash, role, created
            FROM userinfo
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn list_users(&self) -> Result<Vec<UserInfo>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login, email, password_hash, role, created
            FROM userinfo
            ORDER BY created ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(UserInfo::try_from).collect()
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn create_article(
        &self,
        draft: ArticleDraft,
        owner_login: &str,
    ) -> Result<Article, StoreError> {
        // Owner resolution and insert share one statement.
        let article = sqlx::query_as::<_, Article>(
            r#"
            WITH owner AS (
                SELECT id, login FROM userinfo WHERE login = $5
            ), ins AS (
                INSERT INTO articles (category, title, subtitle, content, owner_id)
                SELECT $1, $2, $3, $4, owner.id FROM owner
                RETURNING id, category, title, subtitle, content, owner_id, created
            )
            SELECT ins.id, ins.category, ins.title, ins.subtitle, ins.content,
                   ins.owner_id, ins.created, owner.login AS author_login
              FROM ins
              JOIN owner ON owner.id = ins.owner_id
            "#,
        )
        .bind(draft.category)
        .bind(draft.title)
        .bind(draft.subtitle)
        .bind(draft.content)
        .bind(owner_login)
        .fetch_optional(&self.db)
        .await?;
        article.ok_or(StoreError::UnknownOwner)
    }

    async fn get_article(&self, id: Uuid) -> Result<Article, StoreError> {
        let article = sqlx::query_as::<_, Article>(
            r#"
            SELECT a.id, a.category, a.title, a.subtitle, a.content, a.owner_id, a.created,
                   COALESCE(u.login, '') AS author_login
              FROM articles a
              LEFT JOIN userinfo u ON u.id = a.owner_id
             WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        article.ok_or(StoreError::NotFound)
    }

    async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, Article>(
            r#"
            SELECT a.id, a.category, a.title, a.subtitle, a.content, a.owner_id, a.created,
                   COALESCE(u.login, '') AS author_login
              FROM articles a
              LEFT JOIN userinfo u ON u.id = a.owner_id
             ORDER BY a.created DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_articles_by_owner(&self, owner_id: Uuid) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, Article>(
            r#"
            SELECT a.id, a.category, a.title, a.subtitle, a.content, a.owner_id, a.created,
                   COALESCE(u.login, '') AS author_login
              FROM articles a
              LEFT JOIN userinfo u ON u.id = a.owner_id
             WHERE a.owner_id = $1
             ORDER BY a.created DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_article(&self, id: Uuid, draft: ArticleDraft) -> Result<Article, StoreError> {
        self.update_where(id, None, draft).await
    }

    async fn update_owned_article(
        &self,
        id: Uuid,
        owner_id: Uuid,
        draft: ArticleDraft,
    ) -> Result<Article, StoreError> {
        self.update_where(id, Some(owner_id), draft).await
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete_where(id, None).await
    }

    async fn delete_owned_article(&self, id: Uuid, owner_id: Uuid) -> Result<(), StoreError> {
        self.delete_where(id, Some(owner_id)).await
    }
}
