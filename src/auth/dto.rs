use serde::{Deserialize, Serialize};

use crate::users::repo_types::Role;

/// Shown on the account page when there is no valid session.
pub const UNAUTHORIZED_PLACEHOLDER: &str = "you arent authorized";

/// `POST /createuser` form.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub login: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(rename = "confpassword")]
    pub confirm_password: String,
}

/// `POST /auth` form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub login: String,
    pub role: Option<Role>,
}

/// Describes an HTML form: where it posts and which fields it sends.
#[derive(Debug, Serialize)]
pub struct FormView {
    pub action: &'static str,
    pub fields: &'static [&'static str],
}

pub const LOGIN_FORM: FormView = FormView {
    action: "/auth",
    fields: &["login", "password"],
};

pub const REGISTER_FORM: FormView = FormView {
    action: "/createuser",
    fields: &["login", "email", "password", "confpassword"],
};
