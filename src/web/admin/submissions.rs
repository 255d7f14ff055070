use std::borrow::Cow;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info, warn};

use crate::web::{
    AppState,
    admin_utils::{compose_flash_message, skill_chips},
    escape_html,
    models::{SearchFilter, Submission},
    responses::{ApiMessage, AppError},
    status::SubmissionStatus,
    storage::{Disposition, StorageError},
    submissions::{parse_submission_id, serve_resume},
    templates::{AdminPageLayout, render_admin_page, status_options, status_tag},
};

use super::{
    auth::{issue_csrf, require_admin_json, require_admin_page, verify_csrf},
    dashboard::RECENT_LIMIT,
    types::{DashboardQuery, SearchQuery, StatusUpdate, StatusUpdated},
};

pub async fn submission_detail(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
    Query(params): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let session = match require_admin_page(&state, &jar) {
        Ok(session) => session,
        Err(redirect) => return Ok(redirect),
    };

    let Ok(id) = parse_submission_id(&id) else {
        return Ok(Redirect::to("/admin/dashboard?error=not_found").into_response());
    };
    let Some(submission) = state.submissions().find(id).await? else {
        return Ok(Redirect::to("/admin/dashboard?error=not_found").into_response());
    };

    info!(submission_id = %id, admin_id = %session.id, "viewing submission");

    let (jar, csrf_token) = issue_csrf(&state, &session, jar)?;
    let page = render_admin_page(AdminPageLayout {
        meta_title: "Submission · Resume Desk",
        page_heading: &submission.full_name,
        username: &session.username,
        csrf_token: Some(&csrf_token),
        back_link: Some(("/admin/dashboard", "Dashboard")),
        flash_html: Cow::Owned(compose_flash_message(
            params.status.as_deref(),
            params.error.as_deref(),
        )),
        body_html: Cow::Owned(render_detail_body(&submission)),
        body_scripts: vec![Cow::Borrowed(DETAIL_SCRIPT)],
    });

    Ok((jar, Html(page)).into_response())
}

fn render_detail_body(submission: &Submission) -> String {
    let current_role = submission
        .current_role
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| r#"<span class="muted">Not provided</span>"#.to_string());

    format!(
        r#"        <section class="panel" data-submission-id="{id}">
            <dl class="detail-grid">
                <dt>Email</dt><dd>{email}</dd>
                <dt>Phone</dt><dd>{phone}</dd>
                <dt>Experience</dt><dd>{experience} years</dd>
                <dt>Current role</dt><dd>{current_role}</dd>
                <dt>Skills</dt><dd>{skills}</dd>
                <dt>Status</dt><dd>{status}</dd>
                <dt>Submitted</dt><dd>{submitted}</dd>
                <dt>Resume</dt><dd>{filename} ({content_type})</dd>
            </dl>
        </section>
        <section class="panel">
            <div class="toolbar">
                <a class="button" href="/admin/submissions/{id}/view" target="_blank" rel="noopener">View resume</a>
                <a class="button secondary" href="/admin/submissions/{id}/download">Download resume</a>
                <select id="status-select">{options}</select>
                <button type="button" id="status-save">Update status</button>
                <button type="button" class="danger" id="delete-submission">Delete submission</button>
            </div>
        </section>"#,
        id = submission.id,
        email = escape_html(&submission.email),
        phone = escape_html(&submission.phone),
        experience = submission.experience,
        skills = skill_chips(&submission.skills),
        status = status_tag(submission.status),
        submitted = submission.created_at.format("%Y-%m-%d %H:%M UTC"),
        filename = escape_html(&submission.resume_file.filename),
        content_type = escape_html(&submission.resume_file.content_type),
        options = status_options(Some(submission.status)),
    )
}

const DETAIL_SCRIPT: &str = r#"<script>
(function () {
    const csrf = document.querySelector('meta[name="csrf-token"]')?.content || '';
    const id = document.querySelector('[data-submission-id]').dataset.submissionId;

    async function send(method, url, body) {
        const response = await fetch(url, {
            method,
            credentials: 'same-origin',
            headers: { 'Content-Type': 'application/json', 'X-CSRF-Token': csrf },
            body: body ? JSON.stringify(body) : undefined,
        });
        if (response.status === 401) { window.location = '/admin/login'; return null; }
        const payload = await response.json().catch(() => ({}));
        if (!response.ok) {
            alert(payload.error || 'Request failed');
            return null;
        }
        return payload;
    }

    document.getElementById('status-save').addEventListener('click', async () => {
        const status = document.getElementById('status-select').value;
        if (await send('POST', `/admin/submissions/${id}/status`, { status })) {
            window.location = `/admin/submissions/${id}?status=status_updated`;
        }
    });

    document.getElementById('delete-submission').addEventListener('click', async () => {
        if (!confirm('Delete this submission and its resume? This cannot be undone.')) return;
        if (await send('DELETE', `/admin/submissions/${id}`)) {
            window.location = '/admin/dashboard?status=deleted';
        }
    });
})();
</script>"#;

pub async fn admin_download(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    if let Err(redirect) = require_admin_page(&state, &jar) {
        return Ok(redirect);
    }
    serve_resume(&state, &id, Disposition::Attachment).await
}

pub async fn admin_view(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    if let Err(redirect) = require_admin_page(&state, &jar) {
        return Ok(redirect);
    }
    serve_resume(&state, &id, Disposition::Inline).await
}

pub async fn update_status(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<StatusUpdated>, AppError> {
    let session = require_admin_json(&state, &jar)?;
    verify_csrf(&state, &session, &jar, &headers, None)?;

    let id = parse_submission_id(&id)?;
    let status = serde_json::from_slice::<StatusUpdate>(&body)
        .ok()
        .and_then(|update| SubmissionStatus::parse(update.status.trim()))
        .ok_or_else(invalid_status)?;

    let updated = state
        .submissions()
        .update_status(id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Submission not found"))?;

    info!(submission_id = %id, admin_id = %session.id, %status, "submission status updated");

    Ok(Json(StatusUpdated {
        success: true,
        message: "Status updated successfully".to_string(),
        status: updated.status,
    }))
}

fn invalid_status() -> AppError {
    let allowed = SubmissionStatus::ALL
        .iter()
        .map(|status| status.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    AppError::validation(format!("Invalid status. Must be one of: {allowed}"))
}

pub async fn delete_submission(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiMessage>, AppError> {
    let session = require_admin_json(&state, &jar)?;
    verify_csrf(&state, &session, &jar, &headers, None)?;

    let id = parse_submission_id(&id)?;
    let removed = state
        .submissions()
        .delete(id)
        .await?
        .ok_or_else(|| AppError::not_found("Submission not found"))?;

    let file_id = removed.resume_file.file_id;
    match state.bucket().delete(file_id).await {
        Ok(()) => {}
        Err(StorageError::NotFound(_)) => {
            warn!(submission_id = %id, %file_id, "stored resume was already missing");
        }
        Err(err) => {
            error!(?err, submission_id = %id, %file_id, "failed to delete stored resume");
        }
    }

    info!(submission_id = %id, admin_id = %session.id, "submission deleted");
    Ok(Json(ApiMessage::ok("Submission deleted successfully")))
}

pub async fn search(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Submission>>, AppError> {
    require_admin_json(&state, &jar)?;

    let filter = search_filter(&params)?;
    let results = state.submissions().search(&filter).await?;
    Ok(Json(results))
}

/// `all` or an absent status disables the status filter; other unknown values are rejected.
pub fn search_filter(params: &SearchQuery) -> Result<SearchFilter, AppError> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(str::to_string);

    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(SubmissionStatus::parse(raw).ok_or_else(invalid_status)?),
    };

    Ok(SearchFilter {
        query,
        status,
        limit: RECENT_LIMIT,
    })
}
