use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ArticleView, UpdateArticleForm},
    repo_types::{Article, ArticleDraft},
    services,
};
use crate::{
    auth::{extractors::CurrentIdentity, session::Identity},
    error::AppError,
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles))
        .route("/articles", get(list_articles))
        .route("/articles/:id", get(show_article))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/articles/new", get(new_article))
        .route("/create", post(create_article))
        .route("/edit/:id", get(edit_article))
        .route("/update", post(update_article))
        .route("/delete/:id", post(delete_article))
}

/// Malformed ids are answered like ids that do not exist.
pub(crate) fn parse_id(raw: &str, otherwise: AppError) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| otherwise)
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_articles(State(state): State<AppState>) -> Result<Json<Vec<Article>>, AppError> {
    Ok(Json(services::list_articles(&state).await?))
}

#[instrument(skip(state, identity))]
pub async fn show_article(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<ArticleView>, AppError> {
    let id = parse_id(&id, AppError::NotFound)?;
    let (article, can_modify) = services::show_article(&state, identity.as_ref(), id).await?;
    Ok(Json(ArticleView {
        article,
        can_modify,
    }))
}

/// Authoring form prefill; anonymous callers go to the login page.
#[instrument(skip_all)]
pub async fn new_article(
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<Identity>, AppError> {
    identity.map(Json).ok_or(AppError::Unauthenticated)
}

#[instrument(skip(state, identity, draft))]
pub async fn create_article(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Form(draft): Form<ArticleDraft>,
) -> Result<Redirect, AppError> {
    services::create_article(&state, identity.as_ref(), draft).await?;
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, identity))]
pub async fn edit_article(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Json<Article>, AppError> {
    let id = parse_id(&id, AppError::Denied)?;
    Ok(Json(
        services::article_for_edit(&state, identity.as_ref(), id).await?,
    ))
}

#[instrument(skip(state, identity, form), fields(article_id = %form.id))]
pub async fn update_article(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Form(form): Form<UpdateArticleForm>,
) -> Result<Redirect, AppError> {
    let (id, draft) = form.into_parts();
    let id = parse_id(&id, AppError::Denied)?;
    services::update_article(&state, identity.as_ref(), id, draft).await?;
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, identity))]
pub async fn delete_article(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id = parse_id(&id, AppError::Denied)?;
    services::delete_article(&state, identity.as_ref(), id).await?;
    Ok(Redirect::to("/"))
}
