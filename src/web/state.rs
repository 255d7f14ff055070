use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    web::{
        data::{AdminRepository, PgStore, SubmissionRepository},
        rate_limit::RateLimiter,
        storage::{PgResumeBucket, ResumeBucket},
        tokens::TokenSigner,
    },
};

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    submissions: Arc<dyn SubmissionRepository>,
    admins: Arc<dyn AdminRepository>,
    bucket: Arc<dyn ResumeBucket>,
    tokens: TokenSigner,
    rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        let store = Arc::new(PgStore::new(pool.clone()));
        let bucket = Arc::new(PgResumeBucket::new(pool));

        Ok(Self::from_parts(config, store.clone(), store, bucket))
    }

    pub fn from_parts(
        config: AppConfig,
        submissions: Arc<dyn SubmissionRepository>,
        admins: Arc<dyn AdminRepository>,
        bucket: Arc<dyn ResumeBucket>,
    ) -> Self {
        let tokens = TokenSigner::new(&config.jwt_secret, config.session_ttl_hours);
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window,
            config.rate_limit_max_requests,
        ));
        Self {
            config: Arc::new(config),
            submissions,
            admins,
            bucket,
            tokens,
            rate_limiter,
        }
    }

    /// Creates the configured admin account when none exists yet.
    ///
    /// When admins already exist and a seed password is configured, the configured
    /// account is unlocked so a restart recovers it from a lockout.
    pub async fn ensure_seed_admin(&self) -> Result<()> {
        let existing = self
            .admins
            .count()
            .await
            .context("failed to verify admin presence")?;
        if existing > 0 {
            return self.unlock_seed_admin().await;
        }

        let Some(password) = self.config.default_admin_password.as_deref() else {
            warn!("no admin account exists and DEFAULT_ADMIN_PASSWORD is unset; admin panel is unusable");
            return Ok(());
        };

        let password_hash = crate::web::auth::hash_password(password)
            .map_err(|err| anyhow!("failed to hash seed admin password: {err}"))?;
        let username = self.config.default_admin_username.trim();

        self.admins
            .create(username, &password_hash)
            .await
            .context("failed to insert seed admin")?;

        info!(username, "seeded admin account from environment");
        Ok(())
    }

    async fn unlock_seed_admin(&self) -> Result<()> {
        if self.config.default_admin_password.is_none() {
            return Ok(());
        }

        let username = self.config.default_admin_username.trim();
        let Some(admin) = self
            .admins
            .find_by_username(username)
            .await
            .context("failed to look up seed admin")?
        else {
            return Ok(());
        };

        if admin.locked_until.is_some() || admin.failed_attempts > 0 {
            self.admins
                .unlock(admin.id)
                .await
                .context("failed to unlock seed admin")?;
            info!(username, "cleared failed logins on seed admin account");
        }
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn submissions(&self) -> &dyn SubmissionRepository {
        self.submissions.as_ref()
    }

    pub fn admins(&self) -> &dyn AdminRepository {
        self.admins.as_ref()
    }

    pub fn bucket(&self) -> &dyn ResumeBucket {
        self.bucket.as_ref()
    }

    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
