use axum::{
    extract::State,
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument};

use super::{
    dto::{
        AccountView, FormView, LoginForm, RegisterForm, LOGIN_FORM, REGISTER_FORM,
        UNAUTHORIZED_PLACEHOLDER,
    },
    extractors::{clear_session, session_cookie, CurrentIdentity},
    services::{authenticate, register},
};
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form))
        .route("/users/new", get(register_form))
        .route("/createuser", post(create_user))
        .route("/auth", post(login))
        .route("/logout", post(logout))
}

pub fn account_routes() -> Router<AppState> {
    Router::new().route("/account", get(account))
}

pub async fn login_form() -> Json<FormView> {
    Json(LOGIN_FORM)
}

pub async fn register_form() -> Json<FormView> {
    Json(REGISTER_FORM)
}

#[instrument(skip(state, form), fields(login = %form.login))]
pub async fn create_user(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    register(
        &state,
        &form.login,
        &form.email,
        &form.password,
        &form.confirm_password,
    )
    .await?;
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, jar, form), fields(login = %form.login))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let identity = authenticate(&state, &form.login, &form.password).await?;
    let token = state.session.encode(&identity)?;
    let jar = jar.add(session_cookie(token, state.config.session.secure_cookie));
    Ok((jar, Redirect::to("/account")))
}

#[instrument(skip_all)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    info!("session cleared");
    (clear_session(jar), Redirect::to("/"))
}

#[instrument(skip_all)]
pub async fn account(CurrentIdentity(identity): CurrentIdentity) -> Json<AccountView> {
    Json(match identity {
        Some(id) => AccountView {
            login: id.login,
            role: Some(id.role),
        },
        None => AccountView {
            login: UNAUTHORIZED_PLACEHOLDER.to_string(),
            role: None,
        },
    })
}
