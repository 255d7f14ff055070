use axum::{
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration as CookieDuration;
use tracing::{debug, error};
use uuid::Uuid;

use crate::web::{
    AppState,
    auth::{SESSION_COOKIE, session_removal_cookie},
    responses::AppError,
    tokens::{CSRF_TTL_MINUTES, TokenPurpose},
};

pub const CSRF_COOKIE: &str = "_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Clone, Debug)]
pub struct AdminSession {
    pub id: Uuid,
    pub username: String,
}

/// Verified session carried by the request cookie, if any.
pub fn session_from_jar(state: &AppState, jar: &CookieJar) -> Option<AdminSession> {
    let cookie = jar.get(SESSION_COOKIE)?;
    match state.tokens().verify(cookie.value(), TokenPurpose::Session) {
        Ok(claims) => Some(AdminSession {
            id: claims.sub,
            username: claims.username,
        }),
        Err(err) => {
            debug!(%err, "rejected session token");
            None
        }
    }
}

/// Guard for HTML admin pages: clears the cookie and sends the browser to the login page.
pub fn require_admin_page(state: &AppState, jar: &CookieJar) -> Result<AdminSession, Response> {
    session_from_jar(state, jar).ok_or_else(|| {
        let jar = jar
            .clone()
            .add(session_removal_cookie(!state.config().is_development()));
        (jar, Redirect::to("/admin/login")).into_response()
    })
}

/// Guard for JSON and download endpoints.
pub fn require_admin_json(state: &AppState, jar: &CookieJar) -> Result<AdminSession, AppError> {
    session_from_jar(state, jar).ok_or(AppError::Unauthorized)
}

/// Mints an anti-forgery token bound to the session and stores it in the `_csrf` cookie.
pub fn issue_csrf(
    state: &AppState,
    session: &AdminSession,
    jar: CookieJar,
) -> Result<(CookieJar, String), AppError> {
    let token = state.tokens().issue_csrf(session.id).map_err(|err| {
        error!(?err, "failed to issue csrf token");
        AppError::Internal(anyhow::anyhow!("failed to issue csrf token: {err}"))
    })?;

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/admin")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(!state.config().is_development())
        .max_age(CookieDuration::minutes(CSRF_TTL_MINUTES))
        .build();

    Ok((jar.add(cookie), token))
}

/// Checks the echoed token (header first, then form field) against the `_csrf` cookie.
pub fn verify_csrf(
    state: &AppState,
    session: &AdminSession,
    jar: &CookieJar,
    headers: &HeaderMap,
    form_token: Option<&str>,
) -> Result<(), AppError> {
    let forbidden = || AppError::Forbidden("Invalid CSRF token".to_string());

    let cookie = jar.get(CSRF_COOKIE).ok_or_else(forbidden)?;
    let echoed = headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .or(form_token)
        .ok_or_else(forbidden)?;

    if echoed != cookie.value() {
        return Err(forbidden());
    }

    let claims = state
        .tokens()
        .verify(echoed, TokenPurpose::Csrf)
        .map_err(|_| forbidden())?;
    if claims.sub != session.id {
        return Err(forbidden());
    }

    Ok(())
}
