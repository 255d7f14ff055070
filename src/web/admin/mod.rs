mod auth;
mod dashboard;
mod export;
mod submissions;
mod types;

pub use auth::{require_admin_json, session_from_jar};
pub use dashboard::dashboard;
pub use export::{bulk_download, export_excel};
pub use submissions::{
    admin_download, admin_view, delete_submission, search, submission_detail, update_status,
};
