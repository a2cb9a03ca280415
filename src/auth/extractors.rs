use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::session::{Identity, SESSION_COOKIE};
use crate::state::AppState;

/// Identity from the `session` cookie. Missing, forged and expired cookies
/// all extract as `None`; this extractor never rejects.
pub struct CurrentIdentity(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let identity = jar
            .get(SESSION_COOKIE)
            .and_then(|c| state.session.decode(c.value()));
        Ok(CurrentIdentity(identity))
    }
}

/// Session cookie carrying `token`: path `/`, no expiry.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Add an already-expired `session` cookie so the client drops its copy.
/// Added unconditionally; `CookieJar::remove` only emits when the request carried one.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    let mut gone = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build();
    gone.make_removal();
    jar.add(gone)
}
