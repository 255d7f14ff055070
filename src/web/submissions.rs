use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::web::{
    AppState,
    admin::require_admin_json,
    forms::validate_submission,
    models::{ResumeFileRef, SubmissionSummary},
    responses::AppError,
    storage::{Disposition, stream_file},
    uploads::{FileFieldConfig, read_upload_form},
};

pub const RESUME_FIELD: &str = "resume";

#[derive(Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub submission: SubmissionSummary,
}

/// Accepts the public multipart form: validate, store the resume, then record the submission.
pub async fn submit_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let config = state.config();
    let field_configs = [FileFieldConfig {
        field_name: RESUME_FIELD,
        label: "Resume",
        allowed_types: &config.allowed_file_types,
        max_bytes: config.max_file_size,
    }];

    let mut form = read_upload_form(multipart, &field_configs)
        .await
        .map_err(|err| AppError::validation(err.to_string()))?;

    let (draft, mut errors) = match validate_submission(&form) {
        Ok(draft) => (Some(draft), Vec::new()),
        Err(errors) => (None, errors),
    };
    let resume = form.take_file(RESUME_FIELD);
    if resume.is_none() && form.rejections.is_empty() {
        errors.push("Resume file is required".to_string());
    }
    errors.append(&mut form.rejections);

    let (draft, resume) = match (draft, resume) {
        (Some(draft), Some(resume)) if errors.is_empty() => (draft, resume),
        _ => return Err(AppError::Validation(errors)),
    };

    if state.submissions().email_exists(&draft.email).await? {
        return Err(AppError::Duplicate(
            "A submission with this email address already exists".to_string(),
        ));
    }

    let stored = state
        .bucket()
        .put(resume.bytes, &resume.original_name, &resume.content_type)
        .await?;

    let new_submission = draft.into_new(ResumeFileRef {
        file_id: stored.id,
        filename: resume.original_name,
        content_type: resume.content_type,
    });

    let submission = match state.submissions().insert(&new_submission).await {
        Ok(submission) => submission,
        Err(err) => {
            warn!(?err, file_id = %stored.id, "submission insert failed; removing stored resume");
            if let Err(cleanup_err) = state.bucket().delete(stored.id).await {
                error!(?cleanup_err, file_id = %stored.id, "failed to remove orphaned resume");
            }
            return Err(err.into());
        }
    };

    info!(
        submission_id = %submission.id,
        file_id = %stored.id,
        size = stored.length,
        "submission received"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            message: "Submission received successfully".to_string(),
            submission: submission.summary(),
        }),
    ))
}

pub async fn api_download(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    require_admin_json(&state, &jar)?;
    serve_resume(&state, &id, Disposition::Attachment).await
}

pub async fn api_view(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    require_admin_json(&state, &jar)?;
    serve_resume(&state, &id, Disposition::Inline).await
}

/// Streams the resume attached to a submission using its recorded name and type.
pub async fn serve_resume(
    state: &AppState,
    id: &str,
    disposition: Disposition,
) -> Result<Response, AppError> {
    let id = parse_submission_id(id)?;
    let submission = state
        .submissions()
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Submission not found"))?;

    let file_id = submission.resume_file.file_id;
    let (file, stream) = state.bucket().open(file_id).await.inspect_err(|err| {
        error!(%err, submission_id = %id, %file_id, "resume file unavailable");
    })?;

    info!(submission_id = %id, %file_id, ?disposition, "serving resume");

    Ok(stream_file(
        &file,
        &submission.resume_file.filename,
        &submission.resume_file.content_type,
        disposition,
        stream,
    ))
}

/// Malformed identifiers cannot name a submission, so they are reported as not found.
pub fn parse_submission_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Submission not found"))
}
