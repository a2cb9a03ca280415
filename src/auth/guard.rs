//! Ownership checks for mutating requests.
//!
//! "No principal" is `None`, never a reserved id, so an anonymous caller can
//! not collide with a real owner.

use tracing::debug;
use uuid::Uuid;

use super::session::Identity;
use crate::articles::repo_types::Article;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{with_deadline, StoreError};

/// The caller's user id, resolved from a session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal(pub Uuid);

/// A resource with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Article {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// `None` for an absent identity, an empty login, or a login with no account.
pub async fn resolve_principal(
    st: &AppState,
    identity: Option<&Identity>,
) -> Result<Option<Principal>, AppError> {
    let Some(identity) = identity.filter(|i| !i.login.is_empty()) else {
        return Ok(None);
    };
    match with_deadline(st.store_timeout(), st.users.get_user_by_login(&identity.login)).await {
        Ok(user) => Ok(Some(Principal(user.id))),
        Err(StoreError::NotFound) => {
            debug!(login = %identity.login, "session login has no account");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn may_mutate<R: Owned + ?Sized>(principal: Option<Principal>, resource: &R) -> bool {
    matches!(principal, Some(Principal(id)) if id == resource.owner_id())
}

/// The caller's principal and the article, when the caller owns it.
/// Anything else (anonymous, unknown login, other owner, missing article) is `Denied`.
pub async fn authorize_article(
    st: &AppState,
    identity: Option<&Identity>,
    article_id: Uuid,
) -> Result<(Principal, Article), AppError> {
    let principal = resolve_principal(st, identity)
        .await?
        .ok_or(AppError::Denied)?;
    let article = match with_deadline(st.store_timeout(), st.articles.get_article(article_id)).await
    {
        Ok(a) => a,
        Err(StoreError::NotFound) => return Err(AppError::Denied),
        Err(e) => return Err(e.into()),
    };
    if !may_mutate(Some(principal), &article) {
        debug!(article_id = %article_id, "caller does not own article");
        return Err(AppError::Denied);
    }
    Ok((principal, article))
}

/// True iff the identity resolves to the owner of an existing article.
pub async fn may_delete_article(
    st: &AppState,
    identity: Option<&Identity>,
    article_id: Uuid,
) -> Result<bool, AppError> {
    match authorize_article(st, identity, article_id).await {
        Ok(_) => Ok(true),
        Err(AppError::Denied) => Ok(false),
        Err(e) => Err(e),
    }
}
