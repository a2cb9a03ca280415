use tracing::{debug, info};
use uuid::Uuid;

use super::repo_types::{Article, ArticleDraft};
use crate::auth::guard::{authorize_article, may_mutate, resolve_principal};
use crate::auth::session::Identity;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{with_deadline, StoreError};
use crate::users::repo_types::UserInfo;

pub async fn list_articles(st: &AppState) -> Result<Vec<Article>, AppError> {
    Ok(with_deadline(st.store_timeout(), st.articles.list_articles()).await?)
}

/// A user's page: the account (404 if unknown) and its articles.
pub async fn list_user_articles(
    st: &AppState,
    user_id: Uuid,
) -> Result<(UserInfo, Vec<Article>), AppError> {
    let user = with_deadline(st.store_timeout(), st.users.get_user(user_id)).await?;
    let articles =
        with_deadline(st.store_timeout(), st.articles.list_articles_by_owner(user_id)).await?;
    Ok((user, articles))
}

/// An article and whether the caller may edit or delete it.
pub async fn show_article(
    st: &AppState,
    identity: Option<&Identity>,
    id: Uuid,
) -> Result<(Article, bool), AppError> {
    let article = with_deadline(st.store_timeout(), st.articles.get_article(id)).await?;
    let principal = resolve_principal(st, identity).await?;
    let can_modify = may_mutate(principal, &article);
    Ok((article, can_modify))
}

pub async fn create_article(
    st: &AppState,
    identity: Option<&Identity>,
    draft: ArticleDraft,
) -> Result<Article, AppError> {
    let identity = identity.ok_or(AppError::Unauthenticated)?;
    let article = with_deadline(
        st.store_timeout(),
        st.articles.create_article(draft, &identity.login),
    )
    .await?;
    info!(article_id = %article.id, owner = %identity.login, "article created");
    Ok(article)
}

/// The article for its owner's edit form.
pub async fn article_for_edit(
    st: &AppState,
    identity: Option<&Identity>,
    id: Uuid,
) -> Result<Article, AppError> {
    let (_, article) = authorize_article(st, identity, id).await?;
    Ok(article)
}

pub async fn update_article(
    st: &AppState,
    identity: Option<&Identity>,
    id: Uuid,
    draft: ArticleDraft,
) -> Result<Article, AppError> {
    let (principal, _) = authorize_article(st, identity, id).await?;
    // Ownership is re-checked by the write itself.
    match with_deadline(
        st.store_timeout(),
        st.articles.update_owned_article(id, principal.0, draft),
    )
    .await
    {
        Ok(article) => {
            info!(article_id = %id, "article updated");
            Ok(article)
        }
        Err(StoreError::NotFound) => {
            debug!(article_id = %id, "article changed hands or vanished before update");
            Err(AppError::Denied)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_article(
    st: &AppState,
    identity: Option<&Identity>,
    id: Uuid,
) -> Result<(), AppError> {
    let (principal, _) = authorize_article(st, identity, id).await?;
    match with_deadline(
        st.store_timeout(),
        st.articles.delete_owned_article(id, principal.0),
    )
    .await
    {
        Ok(()) => {
            info!(article_id = %id, "article deleted");
            Ok(())
        }
        Err(StoreError::NotFound) => Err(AppError::Denied),
        Err(e) => Err(e.into()),
    }
}
