use serde::{Deserialize, Serialize};

use crate::web::status::SubmissionStatus;

#[derive(Default, Deserialize)]
pub struct DashboardQuery {
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub status: Option<String>,
}

/// Raw status so unknown values surface as a validation error rather than a decode failure.
#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Serialize)]
pub struct StatusUpdated {
    pub success: bool,
    pub message: String,
    pub status: SubmissionStatus,
}

#[derive(Deserialize)]
pub struct BulkDownloadForm {
    /// JSON array of submission ids.
    pub ids: String,
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct CsrfForm {
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}
