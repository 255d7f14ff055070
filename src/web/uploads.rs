use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use thiserror::Error;

/// Result type used by the shared upload helpers.
pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when the multipart body itself cannot be read.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Request body exceeds the upload limit")]
    BodyTooLarge,
    #[error("Malformed upload: {0}")]
    Malformed(String),
    #[error("Unexpected file field `{0}`")]
    UnexpectedField(String),
    #[error("Only one file may be uploaded in `{0}`")]
    TooManyFiles(String),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::BodyTooLarge
        } else {
            UploadError::Malformed(err.body_text())
        }
    }
}

/// Expectations for a single multipart file field.
#[derive(Debug, Clone, Copy)]
pub struct FileFieldConfig<'a> {
    pub field_name: &'a str,
    pub label: &'a str,
    pub allowed_types: &'a [String],
    pub max_bytes: usize,
}

/// A file part buffered in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Aggregated output of the shared upload processor.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub files: Vec<UploadedFile>,
    pub text_fields: HashMap<String, Vec<String>>,
    /// Files dropped for size or type, described for the submitter.
    pub rejections: Vec<String>,
}

impl UploadOutcome {
    pub fn first_file_for(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.field_name == field_name)
    }

    pub fn take_file(&mut self, field_name: &str) -> Option<UploadedFile> {
        let index = self
            .files
            .iter()
            .position(|file| file.field_name == field_name)?;
        Some(self.files.swap_remove(index))
    }

    pub fn first_text(&self, field_name: &str) -> Option<&str> {
        self.text_fields
            .get(field_name)
            .and_then(|values| values.first().map(|s| s.as_str()))
    }
}

/// Reads a multipart form into memory. File parts are checked against their field's
/// allowed MIME types and size limit; violations are recorded in `rejections` so callers
/// can report them alongside their own field validation.
pub async fn read_upload_form(
    mut multipart: Multipart,
    field_configs: &[FileFieldConfig<'_>],
) -> UploadResult<UploadOutcome> {
    let mut outcome = UploadOutcome::default();

    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            outcome
                .text_fields
                .entry(field_name)
                .or_default()
                .push(value);
            continue;
        };

        let Some(config) = field_configs
            .iter()
            .find(|config| config.field_name == field_name)
        else {
            return Err(UploadError::UnexpectedField(field_name));
        };

        if outcome.first_file_for(config.field_name).is_some() {
            return Err(UploadError::TooManyFiles(field_name));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut buffer = Vec::new();
        let mut too_large = false;
        while let Some(chunk) = field.chunk().await? {
            if buffer.len() + chunk.len() > config.max_bytes {
                too_large = true;
                break;
            }
            buffer.extend_from_slice(&chunk);
        }

        // Browsers send an empty, nameless part when no file was chosen.
        if !too_large && buffer.is_empty() && file_name.trim().is_empty() {
            continue;
        }

        if too_large {
            outcome.rejections.push(format!(
                "{} must be at most {} bytes",
                config.label, config.max_bytes
            ));
            continue;
        }

        if !is_allowed(config.allowed_types, &content_type) {
            outcome.rejections.push(format!(
                "{} has unsupported type `{content_type}`",
                config.label
            ));
            continue;
        }

        outcome.files.push(UploadedFile {
            field_name,
            original_name: file_name,
            content_type,
            bytes: Bytes::from(buffer),
        });
    }

    Ok(outcome)
}

fn is_allowed(allowed_types: &[String], content_type: &str) -> bool {
    let essence = content_type
        .parse::<mime::Mime>()
        .map(|parsed| parsed.essence_str().to_ascii_lowercase())
        .unwrap_or_else(|_| content_type.trim().to_ascii_lowercase());
    allowed_types.iter().any(|allowed| *allowed == essence)
}
