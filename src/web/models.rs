use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::status::SubmissionStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFileRef {
    pub file_id: Uuid,
    pub filename: String,
    pub content_type: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience: i32,
    pub skills: Vec<String>,
    pub current_role: Option<String>,
    pub resume_file: ResumeFileRef,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn summary(&self) -> SubmissionSummary {
        SubmissionSummary {
            id: self.id,
            name: self.full_name.clone(),
            email: self.email.clone(),
            status: self.status,
            skills: self.skills.clone(),
            submitted_date: self.created_at,
        }
    }
}

/// Public view of a submission returned after a successful upload.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: SubmissionStatus,
    pub skills: Vec<String>,
    pub submitted_date: DateTime<Utc>,
}

/// Validated form input, before the resume has been stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience: i32,
    pub skills: Vec<String>,
    pub current_role: Option<String>,
}

impl SubmissionDraft {
    pub fn into_new(self, resume_file: ResumeFileRef) -> NewSubmission {
        NewSubmission {
            id: Uuid::new_v4(),
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            experience: self.experience,
            skills: self.skills,
            current_role: self.current_role,
            resume_file,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience: i32,
    pub skills: Vec<String>,
    pub current_role: Option<String>,
    pub resume_file: ResumeFileRef,
}

#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub failed_attempts: i32,
    /// Set when repeated failures lock the account; the lock lifts on its own once passed.
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AdminAccount {
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub reviewed: i64,
    pub shortlisted: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn get(&self, status: SubmissionStatus) -> i64 {
        match status {
            SubmissionStatus::Pending => self.pending,
            SubmissionStatus::Reviewed => self.reviewed,
            SubmissionStatus::Shortlisted => self.shortlisted,
            SubmissionStatus::Rejected => self.rejected,
        }
    }

    pub fn add(&mut self, status: SubmissionStatus, count: i64) {
        match status {
            SubmissionStatus::Pending => self.pending += count,
            SubmissionStatus::Reviewed => self.reviewed += count,
            SubmissionStatus::Shortlisted => self.shortlisted += count,
            SubmissionStatus::Rejected => self.rejected += count,
        }
        self.total += count;
    }

    /// Rounded share of `status` in the total, 0 when there are no submissions.
    pub fn percentage(&self, status: SubmissionStatus) -> i64 {
        if self.total == 0 {
            return 0;
        }
        ((self.get(status) as f64 / self.total as f64) * 100.0).round() as i64
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: i64,
}

#[derive(Clone, Debug, Default)]
pub struct SearchFilter {
    pub query: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_round_and_handle_empty() {
        let empty = StatusCounts::default();
        assert_eq!(empty.percentage(SubmissionStatus::Pending), 0);

        let mut counts = StatusCounts::default();
        counts.add(SubmissionStatus::Pending, 2);
        counts.add(SubmissionStatus::Rejected, 1);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.percentage(SubmissionStatus::Pending), 67);
        assert_eq!(counts.percentage(SubmissionStatus::Rejected), 33);
        assert_eq!(counts.percentage(SubmissionStatus::Reviewed), 0);
    }

    #[test]
    fn lock_expires_with_time() {
        let now = Utc::now();
        let mut admin = AdminAccount {
            id: uuid::Uuid::new_v4(),
            username: "admin".to_string(),
            password_hash: String::new(),
            failed_attempts: 5,
            locked_until: Some(now + chrono::Duration::minutes(15)),
            last_login_at: None,
        };
        assert!(admin.is_locked_at(now));
        assert!(!admin.is_locked_at(now + chrono::Duration::minutes(16)));

        admin.locked_until = None;
        assert!(!admin.is_locked_at(now));
    }
}
