use std::{
    collections::HashSet,
    io::{Cursor, Write},
    path::Path,
};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Form, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use futures::future::join_all;
use rust_xlsxwriter::{Format, Workbook};
use tracing::{info, warn};
use uuid::Uuid;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::web::{
    AppState,
    models::Submission,
    responses::AppError,
    storage::{Disposition, content_disposition},
};

use super::{
    auth::{require_admin_json, verify_csrf},
    types::{BulkDownloadForm, CsrfForm},
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const EXPORT_HEADERS: [&str; 8] = [
    "Name",
    "Email",
    "Phone",
    "Experience (Years)",
    "Skills",
    "Current Role",
    "Status",
    "Submission Date",
];

const EXPORT_COLUMN_WIDTHS: [f64; 8] = [25.0, 30.0, 15.0, 15.0, 40.0, 25.0, 15.0, 20.0];

/// One resume ready to be written into the archive.
struct ArchiveEntry {
    name: String,
    bytes: Bytes,
}

pub async fn bulk_download(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    form: Option<Form<BulkDownloadForm>>,
) -> Result<Response, AppError> {
    let session = require_admin_json(&state, &jar)?;
    let form = form.map(|Form(form)| form);
    let form_token = form.as_ref().and_then(|form| form.csrf.as_deref());
    verify_csrf(&state, &session, &jar, &headers, form_token)?;

    let ids = form
        .as_ref()
        .map(|form| parse_ids(&form.ids))
        .unwrap_or_default();
    if ids.is_empty() {
        return Err(AppError::validation("No submissions selected"));
    }

    let submissions = state.submissions().find_many(&ids).await?;
    if submissions.is_empty() {
        return Err(AppError::not_found("No submissions found"));
    }

    info!(
        requested = ids.len(),
        found = submissions.len(),
        admin_id = %session.id,
        "starting bulk download"
    );

    // Every fetch settles before the archive is written.
    let bucket = state.bucket();
    let fetched = join_all(submissions.iter().map(|submission| async move {
        let file_id = submission.resume_file.file_id;
        match bucket.read_all(file_id).await {
            Ok(bytes) => Some((submission.resume_file.filename.clone(), bytes)),
            Err(err) => {
                warn!(%err, submission_id = %submission.id, %file_id, "skipping resume in bulk download");
                None
            }
        }
    }))
    .await;

    let mut used_names = HashSet::new();
    let entries: Vec<ArchiveEntry> = fetched
        .into_iter()
        .flatten()
        .map(|(filename, bytes)| ArchiveEntry {
            name: unique_name(archive_name(&filename), &mut used_names),
            bytes,
        })
        .collect();

    if entries.is_empty() {
        return Err(AppError::not_found("No valid files found to download"));
    }

    let file_count = entries.len();
    let archive = tokio::task::spawn_blocking(move || build_archive(entries))
        .await
        .context("archive task panicked")??;

    info!(files = file_count, size = archive.len(), "bulk download ready");

    let filename = format!("resumes-{}.zip", Utc::now().timestamp_millis());
    Ok(attachment(archive, "application/zip", &filename))
}

pub async fn export_excel(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    form: Option<Form<CsrfForm>>,
) -> Result<Response, AppError> {
    let session = require_admin_json(&state, &jar)?;
    let form_token = form.as_ref().and_then(|Form(form)| form.csrf.as_deref());
    verify_csrf(&state, &session, &jar, &headers, form_token)?;

    let submissions = state.submissions().list_all().await?;
    let row_count = submissions.len();
    let workbook = tokio::task::spawn_blocking(move || build_workbook(&submissions))
        .await
        .context("spreadsheet task panicked")??;

    info!(rows = row_count, admin_id = %session.id, "exported submissions spreadsheet");

    let filename = format!("submissions-{}.xlsx", Utc::now().format("%Y-%m-%d"));
    Ok(attachment(workbook, XLSX_CONTENT_TYPE, &filename))
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(Disposition::Attachment, filename),
    );
    (headers, bytes).into_response()
}

/// Parses the JSON id list sent by the dashboard, ignoring entries that are not UUIDs.
fn parse_ids(raw: &str) -> Vec<Uuid> {
    let Ok(values) = serde_json::from_str::<Vec<String>>(raw) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    values
        .iter()
        .filter_map(|value| Uuid::parse_str(value.trim()).ok())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Archive entry name derived from an uploaded filename, stripped of any path.
fn archive_name(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let sanitized = sanitize_filename::sanitize(base);
    if sanitized.is_empty() {
        "resume".to_string()
    } else {
        sanitized
    }
}

fn unique_name(candidate: String, used: &mut HashSet<String>) -> String {
    if used.insert(candidate.clone()) {
        return candidate;
    }

    let (stem, extension) = split_name(&candidate);
    let mut counter = 1usize;
    loop {
        let attempt = if extension.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, extension)
        };
        if used.insert(attempt.clone()) {
            return attempt;
        }
        counter += 1;
    }
}

fn split_name(name: &str) -> (String, String) {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    (stem, extension)
}

fn build_archive(entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, AppError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for entry in entries {
        writer
            .start_file(entry.name.as_str(), options)
            .with_context(|| format!("failed to add {} to archive", entry.name))?;
        writer
            .write_all(&entry.bytes)
            .with_context(|| format!("failed to write {} to archive", entry.name))?;
    }

    let cursor = writer.finish().context("failed to finish archive")?;
    Ok(cursor.into_inner())
}

fn build_workbook(submissions: &[Submission]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Submissions")
        .context("failed to name worksheet")?;

    for (col, (title, width)) in EXPORT_HEADERS
        .iter()
        .zip(EXPORT_COLUMN_WIDTHS)
        .enumerate()
    {
        let col = col as u16;
        sheet
            .write_string_with_format(0, col, *title, &header_format)
            .context("failed to write header row")?;
        sheet
            .set_column_width(col, width)
            .context("failed to size column")?;
    }

    for (index, submission) in submissions.iter().enumerate() {
        let row = index as u32 + 1;
        let current_role = submission.current_role.as_deref().unwrap_or("N/A");
        let cells = [
            submission.full_name.as_str(),
            submission.email.as_str(),
            submission.phone.as_str(),
        ];
        for (col, value) in cells.iter().enumerate() {
            sheet
                .write_string(row, col as u16, *value)
                .context("failed to write submission row")?;
        }
        sheet
            .write_number(row, 3, f64::from(submission.experience))
            .context("failed to write submission row")?;
        sheet
            .write_string(row, 4, submission.skills.join(", "))
            .context("failed to write submission row")?;
        sheet
            .write_string(row, 5, current_role)
            .context("failed to write submission row")?;
        sheet
            .write_string(row, 6, submission.status.label())
            .context("failed to write submission row")?;
        sheet
            .write_string(row, 7, submission.created_at.format("%Y-%m-%d").to_string())
            .context("failed to write submission row")?;
    }

    let buffer = workbook
        .save_to_buffer()
        .context("failed to serialize workbook")?;
    Ok(buffer)
}
