use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::services::ValidationError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("registration rejected")]
    Validation(Vec<ValidationError>),
    #[error("invalid login or password")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    /// Ownership check failed; rendered as a plain redirect home.
    #[error("action denied")]
    Denied,
    #[error("not found")]
    NotFound,
    #[error("login already taken")]
    LoginTaken,
    #[error("article owner does not exist")]
    UnknownOwner,
    #[error("store failure: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            StoreError::LoginTaken => AppError::LoginTaken,
            StoreError::UnknownOwner => AppError::UnknownOwner,
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(errs) => {
                let errors: Vec<String> = errs.iter().map(ToString::to_string).collect();
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "errors": errors })),
                )
                    .into_response();
            }
            AppError::Unauthenticated => return Redirect::to("/login").into_response(),
            AppError::Denied => return Redirect::to("/").into_response(),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid login or password".to_string(),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            AppError::LoginTaken => (StatusCode::CONFLICT, "login already taken".to_string()),
            AppError::UnknownOwner => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "article owner does not exist".to_string(),
            ),
            AppError::Store(StoreError::Timeout(limit)) => {
                error!(?limit, "store call timed out");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store unavailable".to_string(),
                )
            }
            AppError::Store(e) => {
                error!(error = %e, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;
    use std::time::Duration;

    #[test]
    fn store_errors_map_to_request_errors() {
        assert!(matches!(AppError::from(StoreError::NotFound), AppError::NotFound));
        assert!(matches!(AppError::from(StoreError::LoginTaken), AppError::LoginTaken));
        assert!(matches!(
            AppError::from(StoreError::UnknownOwner),
            AppError::UnknownOwner
        ));
        assert!(matches!(
            AppError::from(StoreError::Timeout(Duration::from_secs(1))),
            AppError::Store(_)
        ));
    }

    #[test]
    fn denial_is_a_redirect_home() {
        let res = AppError::Denied.into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/");
    }

    #[test]
    fn anonymous_is_sent_to_login() {
        let res = AppError::Unauthenticated.into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/login");
    }

    #[test]
    fn statuses() {
        assert_eq!(
            AppError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Validation(vec![ValidationError::LoginTooShort])
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Store(StoreError::Timeout(Duration::from_millis(5)))
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Store(StoreError::Corrupt("x".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
