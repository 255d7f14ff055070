//! In-memory repositories and bucket backing the handler tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use uuid::Uuid;

use super::{
    data::{AdminRepository, StoreError, StoreResult, SubmissionRepository},
    models::{
        AdminAccount, DailyCount, NewSubmission, SearchFilter, SkillCount, StatusCounts,
        Submission,
    },
    status::SubmissionStatus,
    storage::{ByteStream, CHUNK_SIZE, ResumeBucket, StorageError, StoredFile, storage_name},
};

#[derive(Default)]
pub struct MemoryStore {
    submissions: Mutex<Vec<Submission>>,
    admins: Mutex<Vec<AdminAccount>>,
    fail_inserts: AtomicBool,
    miss_email_checks: AtomicBool,
}

impl MemoryStore {
    /// Makes every subsequent submission insert fail with a database error.
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn admin(&self, username: &str) -> Option<AdminAccount> {
        self.admins
            .lock()
            .unwrap()
            .iter()
            .find(|admin| admin.username == username)
            .cloned()
    }

    pub fn seed_admin(&self, admin: AdminAccount) {
        self.admins.lock().unwrap().push(admin);
    }

    /// Moves an active lock into the past, as if its lock period had run out.
    pub fn expire_lock(&self, username: &str) {
        let mut guard = self.admins.lock().unwrap();
        if let Some(admin) = guard.iter_mut().find(|admin| admin.username == username) {
            if admin.locked_until.is_some() {
                admin.locked_until = Some(Utc::now() - chrono::Duration::seconds(1));
            }
        }
    }

    /// Makes `email_exists` always answer false so duplicates only surface on insert.
    pub fn miss_email_checks(&self) {
        self.miss_email_checks.store(true, Ordering::SeqCst);
    }

    fn sorted(&self) -> Vec<Submission> {
        let mut all = self.submissions.lock().unwrap().clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}

fn matches_query(submission: &Submission, query: &str) -> bool {
    let needle = query.to_lowercase();
    submission.full_name.to_lowercase().contains(&needle)
        || submission.email.to_lowercase().contains(&needle)
        || submission
            .skills
            .iter()
            .any(|skill| skill.to_lowercase().contains(&needle))
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn insert(&self, submission: &NewSubmission) -> StoreResult<Submission> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut guard = self.submissions.lock().unwrap();
        if guard.iter().any(|existing| existing.email == submission.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let record = Submission {
            id: submission.id,
            full_name: submission.full_name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            experience: submission.experience,
            skills: submission.skills.clone(),
            current_role: submission.current_role.clone(),
            resume_file: submission.resume_file.clone(),
            status: SubmissionStatus::Pending,
            created_at: Utc::now(),
        };
        guard.push(record.clone());
        Ok(record)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Submission>> {
        Ok(self
            .sorted()
            .into_iter()
            .filter(|s| ids.contains(&s.id))
            .collect())
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        if self.miss_email_checks.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.email == email))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> StoreResult<Option<Submission>> {
        let mut guard = self.submissions.lock().unwrap();
        Ok(guard.iter_mut().find(|s| s.id == id).map(|s| {
            s.status = status;
            s.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        let mut guard = self.submissions.lock().unwrap();
        let position = guard.iter().position(|s| s.id == id);
        Ok(position.map(|idx| guard.remove(idx)))
    }

    async fn search(&self, filter: &SearchFilter) -> StoreResult<Vec<Submission>> {
        Ok(self
            .sorted()
            .into_iter()
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .filter(|s| {
                filter
                    .query
                    .as_deref()
                    .is_none_or(|query| matches_query(s, query))
            })
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn list_all(&self) -> StoreResult<Vec<Submission>> {
        Ok(self.sorted())
    }

    async fn count_by_status(&self) -> StoreResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for submission in self.submissions.lock().unwrap().iter() {
            counts.add(submission.status, 1);
        }
        Ok(counts)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.created_at >= since)
            .count() as i64)
    }

    async fn daily_counts(&self, since: DateTime<Utc>) -> StoreResult<Vec<DailyCount>> {
        let mut days: HashMap<NaiveDate, i64> = HashMap::new();
        for submission in self.submissions.lock().unwrap().iter() {
            if submission.created_at >= since {
                *days.entry(submission.created_at.date_naive()).or_default() += 1;
            }
        }
        let mut counts: Vec<DailyCount> = days
            .into_iter()
            .map(|(day, count)| DailyCount { day, count })
            .collect();
        counts.sort_by_key(|entry| entry.day);
        Ok(counts)
    }

    async fn skill_counts(&self, limit: i64) -> StoreResult<Vec<SkillCount>> {
        let mut tally: HashMap<String, i64> = HashMap::new();
        for submission in self.submissions.lock().unwrap().iter() {
            for skill in &submission.skills {
                *tally.entry(skill.clone()).or_default() += 1;
            }
        }
        let mut counts: Vec<SkillCount> = tally
            .into_iter()
            .map(|(skill, count)| SkillCount { skill, count })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
        counts.truncate(limit.max(0) as usize);
        Ok(counts)
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<AdminAccount>> {
        Ok(self.admin(username))
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        lock_after: i32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let mut guard = self.admins.lock().unwrap();
        let Some(admin) = guard.iter_mut().find(|admin| admin.id == id) else {
            return Ok(None);
        };
        if admin.is_locked_at(now) {
            admin.failed_attempts += 1;
            return Ok(admin.locked_until);
        }
        if admin.locked_until.is_some() {
            admin.failed_attempts = 0;
            admin.locked_until = None;
        }
        admin.failed_attempts += 1;
        if admin.failed_attempts >= lock_after {
            admin.locked_until = Some(lock_until);
        }
        Ok(admin.locked_until)
    }

    async fn record_successful_login(&self, id: Uuid) -> StoreResult<()> {
        let mut guard = self.admins.lock().unwrap();
        if let Some(admin) = guard.iter_mut().find(|admin| admin.id == id) {
            admin.failed_attempts = 0;
            admin.locked_until = None;
            admin.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn unlock(&self, id: Uuid) -> StoreResult<()> {
        let mut guard = self.admins.lock().unwrap();
        if let Some(admin) = guard.iter_mut().find(|admin| admin.id == id) {
            admin.failed_attempts = 0;
            admin.locked_until = None;
        }
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut guard = self.admins.lock().unwrap();
        if let Some(admin) = guard.iter_mut().find(|admin| admin.id == id) {
            admin.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.admins.lock().unwrap().len() as i64)
    }

    async fn create(&self, username: &str, password_hash: &str) -> StoreResult<AdminAccount> {
        let mut guard = self.admins.lock().unwrap();
        if guard.iter().any(|admin| admin.username == username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        let admin = AdminAccount {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            failed_attempts: 0,
            locked_until: None,
            last_login_at: None,
        };
        guard.push(admin.clone());
        Ok(admin)
    }
}

#[derive(Default)]
pub struct MemoryBucket {
    files: Mutex<HashMap<Uuid, (StoredFile, Vec<u8>)>>,
}

impl MemoryBucket {
    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.files.lock().unwrap().contains_key(&id)
    }

    /// Drops a file behind the owning submission's back.
    pub fn lose(&self, id: Uuid) {
        self.files.lock().unwrap().remove(&id);
    }
}

#[async_trait]
impl ResumeBucket for MemoryBucket {
    async fn put(
        &self,
        bytes: Bytes,
        original_name: &str,
        content_type: &str,
    ) -> Result<StoredFile, StorageError> {
        let file = StoredFile {
            id: Uuid::new_v4(),
            filename: storage_name(original_name),
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
            length: bytes.len() as i64,
            chunk_size: CHUNK_SIZE as i32,
            uploaded_at: Utc::now(),
        };
        self.files
            .lock()
            .unwrap()
            .insert(file.id, (file.clone(), bytes.to_vec()));
        Ok(file)
    }

    async fn info(&self, id: Uuid) -> Result<Option<StoredFile>, StorageError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&id)
            .map(|(file, _)| file.clone()))
    }

    async fn open(&self, id: Uuid) -> Result<(StoredFile, ByteStream), StorageError> {
        let (file, data) = self
            .files
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound(id))?;

        let chunks: Vec<Result<Bytes, StorageError>> = data
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok((file, futures::stream::iter(chunks).boxed()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        self.files
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound(id))
    }

    async fn count(&self) -> Result<i64, StorageError> {
        Ok(self.len() as i64)
    }
}
