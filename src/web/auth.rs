use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{error, info, warn};

use crate::web::{AppState, admin::session_from_jar, render_login_page};

pub const SESSION_COOKIE: &str = "admin_token";
pub const MAX_FAILED_LOGINS: i32 = 5;
pub const LOCKOUT_MINUTES: i64 = 15;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Verified on paths that have no real hash to check, so every rejection costs one argon2 run.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("resume-desk-unmatched-login").ok());

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Outcome of checking a password against the stored hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordCheck {
    Match,
    /// Correct password stored under a legacy bcrypt hash; rewrite it as argon2.
    MatchNeedsRehash,
    Mismatch,
}

pub fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::seconds(ttl.num_seconds()))
        .build()
}

pub fn session_removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::ZERO)
        .build()
}

pub async fn admin_root(State(state): State<AppState>, jar: CookieJar) -> Response {
    match session_from_jar(&state, &jar) {
        Some(_) => Redirect::to("/admin/dashboard").into_response(),
        None => {
            let jar = if jar.get(SESSION_COOKIE).is_some() {
                jar.add(session_removal_cookie(!state.config().is_development()))
            } else {
                jar
            };
            (jar, Redirect::to("/admin/login")).into_response()
        }
    }
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    if session_from_jar(&state, &jar).is_some() {
        return Err(Redirect::to("/admin/dashboard"));
    }

    Ok(Html(render_login_page(None)))
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Option<Form<LoginForm>>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let Some(Form(form)) = form else {
        return Err(invalid_credentials());
    };
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Err(invalid_credentials());
    }

    let admin = match state.admins().find_by_username(username).await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            warn!(username, "login attempt for unknown admin");
            verify_against_dummy(&form.password);
            return Err(invalid_credentials());
        }
        Err(err) => {
            error!(?err, "failed to fetch admin during login");
            return Err(server_error());
        }
    };

    let now = Utc::now();
    if admin.is_locked_at(now) {
        warn!(
            admin_id = %admin.id,
            locked_until = ?admin.locked_until,
            "login attempt on locked admin account"
        );
        verify_against_dummy(&form.password);
        return Err(invalid_credentials());
    }

    let check = verify_password(&form.password, &admin.password_hash);
    if check == PasswordCheck::Mismatch {
        let lock_until = now + Duration::minutes(LOCKOUT_MINUTES);
        match state
            .admins()
            .record_failed_login(admin.id, MAX_FAILED_LOGINS, lock_until, now)
            .await
        {
            Ok(Some(until)) => {
                warn!(admin_id = %admin.id, %until, "admin account locked after repeated failures")
            }
            Ok(None) => {}
            Err(err) => error!(?err, admin_id = %admin.id, "failed to record failed login"),
        }
        return Err(invalid_credentials());
    }

    if check == PasswordCheck::MatchNeedsRehash {
        match hash_password(&form.password) {
            Ok(upgraded) => {
                if let Err(err) = state.admins().update_password_hash(admin.id, &upgraded).await {
                    error!(?err, admin_id = %admin.id, "failed to upgrade legacy password hash");
                } else {
                    info!(admin_id = %admin.id, "upgraded legacy password hash");
                }
            }
            Err(err) => error!(%err, admin_id = %admin.id, "failed to rehash password"),
        }
    }

    if let Err(err) = state.admins().record_successful_login(admin.id).await {
        error!(?err, admin_id = %admin.id, "failed to record successful login");
        return Err(server_error());
    }

    let token = match state.tokens().issue_session(admin.id, &admin.username) {
        Ok(token) => token,
        Err(err) => {
            error!(?err, "failed to issue session token");
            return Err(server_error());
        }
    };

    info!(admin_id = %admin.id, username = %admin.username, "admin logged in");

    let cookie = session_cookie(
        token,
        state.tokens().session_ttl(),
        !state.config().is_development(),
    );
    Ok((jar.add(cookie), Redirect::to("/admin/dashboard")))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(session) = session_from_jar(&state, &jar) {
        info!(admin_id = %session.id, "admin logged out");
    }

    let jar = jar.add(session_removal_cookie(!state.config().is_development()));
    (jar, Redirect::to("/admin/login"))
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> PasswordCheck {
    if password_hash.starts_with("$2") {
        return match bcrypt::verify(password, password_hash) {
            Ok(true) => PasswordCheck::MatchNeedsRehash,
            Ok(false) => PasswordCheck::Mismatch,
            Err(err) => {
                warn!(%err, "stored bcrypt hash could not be parsed");
                PasswordCheck::Mismatch
            }
        };
    }

    match PasswordHash::new(password_hash) {
        Ok(hash) if Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok() =>
        {
            PasswordCheck::Match
        }
        _ => PasswordCheck::Mismatch,
    }
}

fn verify_against_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

fn invalid_credentials() -> (StatusCode, Html<String>) {
    (
        StatusCode::UNAUTHORIZED,
        Html(render_login_page(Some(INVALID_CREDENTIALS))),
    )
}

fn server_error() -> (StatusCode, Html<String>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(render_login_page(Some(
            "Something went wrong. Please try again later.",
        ))),
    )
}
