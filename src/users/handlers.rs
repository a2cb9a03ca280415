use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::PublicUser;
use crate::{
    articles::{dto::UserArticles, handlers::parse_id, services as article_services},
    error::AppError,
    state::AppState,
    store::with_deadline,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(user_page))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = with_deadline(state.store_timeout(), state.users.list_users()).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn user_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserArticles>, AppError> {
    let id = parse_id(&id, AppError::NotFound)?;
    let (user, articles) = article_services::list_user_articles(&state, id).await?;
    Ok(Json(UserArticles {
        user: user.into(),
        articles,
    }))
}
