use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use super::{
    models::{
        AdminAccount, DailyCount, NewSubmission, ResumeFileRef, SearchFilter, SkillCount,
        StatusCounts, Submission,
    },
    status::SubmissionStatus,
};

const UNIQUE_VIOLATION: &str = "23505";

const SUBMISSION_COLUMNS: &str = "id, full_name, email, phone, experience, skills, current_title, \
     resume_file_id, resume_filename, resume_content_type, status, created_at";

const ADMIN_COLUMNS: &str =
    "id, username, password_hash, failed_attempts, locked_until, last_login_at";

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the offending field.
    #[error("duplicate value for {0}")]
    Duplicate(String),
    #[error("stored row is invalid: {0}")]
    InvalidRow(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let field = match db_err.constraint() {
                    Some(name) if name.contains("email") => "email",
                    Some(name) if name.contains("username") => "username",
                    _ => "record",
                };
                return StoreError::Duplicate(field.to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn insert(&self, submission: &NewSubmission) -> StoreResult<Submission>;
    async fn find(&self, id: Uuid) -> StoreResult<Option<Submission>>;
    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Submission>>;
    async fn email_exists(&self, email: &str) -> StoreResult<bool>;
    async fn update_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> StoreResult<Option<Submission>>;
    /// Removes the record and returns it so the caller can release its stored file.
    async fn delete(&self, id: Uuid) -> StoreResult<Option<Submission>>;
    /// Newest first, bounded by `filter.limit`.
    async fn search(&self, filter: &SearchFilter) -> StoreResult<Vec<Submission>>;
    async fn list_all(&self) -> StoreResult<Vec<Submission>>;
    async fn count_by_status(&self) -> StoreResult<StatusCounts>;
    async fn count_since(&self, since: DateTime<Utc>) -> StoreResult<i64>;
    async fn daily_counts(&self, since: DateTime<Utc>) -> StoreResult<Vec<DailyCount>>;
    async fn skill_counts(&self, limit: i64) -> StoreResult<Vec<SkillCount>>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<AdminAccount>>;
    /// Bumps the failure counter; reaching `lock_after` locks the account until `lock_until`.
    /// A lock that lapsed before `now` restarts the count. Returns the active lock, if any.
    async fn record_failed_login(
        &self,
        id: Uuid,
        lock_after: i32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>>;
    async fn record_successful_login(&self, id: Uuid) -> StoreResult<()>;
    /// Clears the failure counter and any lock.
    async fn unlock(&self, id: Uuid) -> StoreResult<()>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
    async fn count(&self) -> StoreResult<i64>;
    async fn create(&self, username: &str, password_hash: &str) -> StoreResult<AdminAccount>;
}

#[derive(FromRow)]
struct SubmissionRecord {
    id: Uuid,
    full_name: String,
    email: String,
    phone: String,
    experience: i32,
    skills: Vec<String>,
    #[sqlx(rename = "current_title")]
    current_role: Option<String>,
    resume_file_id: Uuid,
    resume_filename: String,
    resume_content_type: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRecord> for Submission {
    type Error = StoreError;

    fn try_from(row: SubmissionRecord) -> Result<Self, Self::Error> {
        let status = SubmissionStatus::parse(&row.status).ok_or_else(|| {
            StoreError::InvalidRow(format!("submission {} has status `{}`", row.id, row.status))
        })?;

        Ok(Submission {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            experience: row.experience,
            skills: row.skills,
            current_role: row.current_role,
            resume_file: ResumeFileRef {
                file_id: row.resume_file_id,
                filename: row.resume_filename,
                content_type: row.resume_content_type,
            },
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AdminRecord {
    id: Uuid,
    username: String,
    password_hash: String,
    failed_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
}

impl From<AdminRecord> for AdminAccount {
    fn from(row: AdminRecord) -> Self {
        AdminAccount {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            failed_attempts: row.failed_attempts,
            locked_until: row.locked_until,
            last_login_at: row.last_login_at,
        }
    }
}

fn into_submissions(rows: Vec<SubmissionRecord>) -> StoreResult<Vec<Submission>> {
    rows.into_iter().map(Submission::try_from).collect()
}

/// Escapes LIKE metacharacters and wraps the term for a substring match.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Postgres-backed repositories sharing one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for PgStore {
    async fn insert(&self, submission: &NewSubmission) -> StoreResult<Submission> {
        let sql = format!(
            "INSERT INTO submissions (id, full_name, email, phone, experience, skills, current_title,
                 resume_file_id, resume_filename, resume_content_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {SUBMISSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubmissionRecord>(&sql)
            .bind(submission.id)
            .bind(&submission.full_name)
            .bind(&submission.email)
            .bind(&submission.phone)
            .bind(submission.experience)
            .bind(&submission.skills)
            .bind(&submission.current_role)
            .bind(submission.resume_file.file_id)
            .bind(&submission.resume_file.filename)
            .bind(&submission.resume_file.content_type)
            .fetch_one(&self.pool)
            .await?;
        Submission::try_from(row)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1");
        sqlx::query_as::<_, SubmissionRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Submission::try_from)
            .transpose()
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Submission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ANY($1) ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, SubmissionRecord>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        into_submissions(rows)
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM submissions WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> StoreResult<Option<Submission>> {
        let sql =
            format!("UPDATE submissions SET status = $2 WHERE id = $1 RETURNING {SUBMISSION_COLUMNS}");
        sqlx::query_as::<_, SubmissionRecord>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Submission::try_from)
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        let sql = format!("DELETE FROM submissions WHERE id = $1 RETURNING {SUBMISSION_COLUMNS}");
        sqlx::query_as::<_, SubmissionRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Submission::try_from)
            .transpose()
    }

    async fn search(&self, filter: &SearchFilter) -> StoreResult<Vec<Submission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions
             WHERE ($1::text IS NULL
                    OR full_name ILIKE $1
                    OR email ILIKE $1
                    OR EXISTS (SELECT 1 FROM unnest(skills) AS skill WHERE skill ILIKE $1))
               AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC
             LIMIT $3"
        );
        let pattern = filter.query.as_deref().map(like_pattern);
        let rows = sqlx::query_as::<_, SubmissionRecord>(&sql)
            .bind(pattern)
            .bind(filter.status.map(|status| status.as_str()))
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;
        into_submissions(rows)
    }

    async fn list_all(&self) -> StoreResult<Vec<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, SubmissionRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        into_submissions(rows)
    }

    async fn count_by_status(&self) -> StoreResult<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM submissions GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status = SubmissionStatus::parse(&status)
                .ok_or_else(|| StoreError::InvalidRow(format!("unknown status `{status}`")))?;
            counts.add(status, count);
        }
        Ok(counts)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn daily_counts(&self, since: DateTime<Utc>) -> StoreResult<Vec<DailyCount>> {
        let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*)
             FROM submissions
             WHERE created_at >= $1
             GROUP BY day
             ORDER BY day",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(day, count)| DailyCount { day, count })
            .collect())
    }

    async fn skill_counts(&self, limit: i64) -> StoreResult<Vec<SkillCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT skill, COUNT(*) AS uses
             FROM submissions, unnest(skills) AS skill
             GROUP BY skill
             ORDER BY uses DESC, skill
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(skill, count)| SkillCount { skill, count })
            .collect())
    }
}

#[async_trait]
impl AdminRepository for PgStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<AdminAccount>> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE username = $1");
        let row = sqlx::query_as::<_, AdminRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AdminAccount::from))
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        lock_after: i32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let locked: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            "WITH attempt AS (
                 SELECT id,
                        locked_until,
                        CASE WHEN locked_until IS NOT NULL AND locked_until <= $4
                             THEN 1
                             ELSE failed_attempts + 1
                        END AS attempts
                 FROM admins
                 WHERE id = $1
                 FOR UPDATE
             )
             UPDATE admins
             SET failed_attempts = attempt.attempts,
                 locked_until = CASE
                     WHEN attempt.locked_until > $4 THEN attempt.locked_until
                     WHEN attempt.attempts >= $2 THEN $3
                     ELSE NULL
                 END
             FROM attempt
             WHERE admins.id = attempt.id
             RETURNING admins.locked_until",
        )
        .bind(id)
        .bind(lock_after)
        .bind(lock_until)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(locked.flatten())
    }

    async fn record_successful_login(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE admins
             SET failed_attempts = 0, locked_until = NULL, last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unlock(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE admins SET failed_attempts = 0, locked_until = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE admins SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, username: &str, password_hash: &str) -> StoreResult<AdminAccount> {
        let sql = format!(
            "INSERT INTO admins (id, username, password_hash) VALUES ($1, $2, $3)
             RETURNING {ADMIN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AdminRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }
}
