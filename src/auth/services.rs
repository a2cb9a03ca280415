use tracing::{info, warn};

use super::password::{spawn_decoy, spawn_hash, spawn_verify};
use super::session::Identity;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{with_deadline, StoreError};
use crate::users::repo_types::{NewUser, Role, UserInfo};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_LOGIN_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password is too short")]
    PasswordTooShort,
    #[error("login is too short")]
    LoginTooShort,
}

/// Every violated rule, in form order. Email is accepted as given.
pub fn validate_registration(
    login: &str,
    _email: &str,
    password: &str,
    confirm_password: &str,
) -> Vec<ValidationError> {
    let mut errs = Vec::new();
    if password != confirm_password {
        errs.push(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errs.push(ValidationError::PasswordTooShort);
    }
    if login.chars().count() < MIN_LOGIN_LEN {
        errs.push(ValidationError::LoginTooShort);
    }
    errs
}

/// Validate, hash and insert a new `User`-role account.
pub async fn register(
    st: &AppState,
    login: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<UserInfo, AppError> {
    let errs = validate_registration(login, email, password, confirm_password);
    if !errs.is_empty() {
        warn!(login, violations = errs.len(), "registration rejected");
        return Err(AppError::Validation(errs));
    }

    let password_hash = spawn_hash(password.to_string()).await?;
    let user = with_deadline(
        st.store_timeout(),
        st.users.create_user(NewUser {
            login: login.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::User,
        }),
    )
    .await?;

    info!(user_id = %user.id, login = %user.login, "user registered");
    Ok(user)
}

/// Check a login/password pair; unknown login and wrong password look the same.
pub async fn authenticate(st: &AppState, login: &str, password: &str) -> Result<Identity, AppError> {
    let user = match with_deadline(st.store_timeout(), st.users.get_user_by_login(login)).await {
        Ok(u) => u,
        Err(StoreError::NotFound) => {
            spawn_decoy(password.to_string()).await?;
            warn!(login, "login for unknown user");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    if !spawn_verify(password.to_string(), user.password_hash.clone()).await? {
        warn!(login, user_id = %user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, login, "user logged in");
    Ok(Identity {
        login: user.login,
        role: user.role,
    })
}
