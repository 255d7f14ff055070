use std::{env, time::Duration};

use anyhow::{Context, Result, anyhow, bail};

const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const DEFAULT_PORT: u16 = 3000;
const MIN_SECRET_LEN: usize = 32;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 15 * 60 * 1000;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;
const DEFAULT_ALLOWED_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub max_file_size: usize,
    pub allowed_file_types: Vec<String>,
    pub environment: Environment,
    pub session_ttl_hours: i64,
    pub port: u16,
    pub default_admin_username: String,
    pub default_admin_password: Option<String>,
    pub rate_limit_window: Duration,
    /// Requests allowed per client IP in each window; zero turns limiting off.
    pub rate_limit_max_requests: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .context("DATABASE_URL env var is missing")?;

        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET env var is missing")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} bytes long");
        }

        let max_file_size = match lookup("MAX_FILE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| anyhow!("MAX_FILE_SIZE must be a positive byte count: {raw}"))?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let allowed_file_types = match lookup("ALLOWED_FILE_TYPES") {
            Some(raw) => parse_allowed_types(&raw)?,
            None => DEFAULT_ALLOWED_TYPES.iter().map(|s| s.to_string()).collect(),
        };

        let environment = match lookup("APP_ENV").as_deref().map(str::trim) {
            Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") | None => Environment::Production,
            Some(other) => bail!("unknown APP_ENV value: {other}"),
        };

        let session_ttl_hours = match lookup("SESSION_TTL_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or_else(|| anyhow!("SESSION_TTL_HOURS must be a positive integer: {raw}"))?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let default_admin_username = lookup("DEFAULT_ADMIN_USERNAME")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "admin".to_string());
        let default_admin_password =
            lookup("DEFAULT_ADMIN_PASSWORD").filter(|password| !password.is_empty());

        let rate_limit_window = match lookup("RATE_LIMIT_WINDOW_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| anyhow!("RATE_LIMIT_WINDOW_MS must be a positive integer: {raw}"))?,
            None => Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
        };

        let rate_limit_max_requests = match lookup("RATE_LIMIT_MAX_REQUESTS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                anyhow!("RATE_LIMIT_MAX_REQUESTS must be a non-negative integer: {raw}")
            })?,
            None => DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            max_file_size,
            allowed_file_types,
            environment,
            session_ttl_hours,
            port,
            default_admin_username,
            default_admin_password,
            rate_limit_window,
            rate_limit_max_requests,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Upper bound for a whole multipart request: the file plus room for the text fields.
    pub fn request_body_limit(&self) -> usize {
        self.max_file_size.saturating_add(1024 * 1024)
    }
}

fn parse_allowed_types(raw: &str) -> Result<Vec<String>> {
    let mut types = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let parsed: mime::Mime = entry
            .parse()
            .map_err(|err| anyhow!("invalid MIME type `{entry}` in ALLOWED_FILE_TYPES: {err}"))?;
        types.push(parsed.essence_str().to_ascii_lowercase());
    }

    if types.is_empty() {
        bail!("ALLOWED_FILE_TYPES must list at least one MIME type");
    }

    Ok(types)
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/resume_desk_test".to_string(),
        jwt_secret: "test-secret-test-secret-test-secret-0123".to_string(),
        max_file_size: 64 * 1024,
        allowed_file_types: DEFAULT_ALLOWED_TYPES.iter().map(|s| s.to_string()).collect(),
        environment: Environment::Production,
        session_ttl_hours: 24,
        port: DEFAULT_PORT,
        default_admin_username: "admin".to_string(),
        default_admin_password: None,
        rate_limit_window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
        rate_limit_max_requests: 1000,
    }
}
