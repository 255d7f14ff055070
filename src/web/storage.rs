use std::path::Path;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Largest chunk written to the bucket, matching the classic 255 KiB GridFS chunk.
pub const CHUNK_SIZE: usize = 255 * 1024;

pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("stored file {0} not found")]
    NotFound(Uuid),
    #[error("stored file {id} is missing chunk {n}")]
    MissingChunk { id: Uuid, n: i32 },
    #[error("storage database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Metadata of an object held in the resume bucket.
#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct StoredFile {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub content_type: String,
    pub length: i64,
    pub chunk_size: i32,
    pub uploaded_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn chunk_count(&self) -> i32 {
        chunk_count(self.length, self.chunk_size)
    }
}

/// Chunked binary storage for uploaded resumes.
#[async_trait]
pub trait ResumeBucket: Send + Sync {
    /// Writes `bytes` as a new object under a generated identifier.
    async fn put(
        &self,
        bytes: Bytes,
        original_name: &str,
        content_type: &str,
    ) -> Result<StoredFile, StorageError>;

    async fn info(&self, id: Uuid) -> Result<Option<StoredFile>, StorageError>;

    /// Opens the object for reading; chunks are produced in order.
    async fn open(&self, id: Uuid) -> Result<(StoredFile, ByteStream), StorageError>;

    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;

    async fn count(&self) -> Result<i64, StorageError>;

    async fn read_all(&self, id: Uuid) -> Result<Bytes, StorageError> {
        let (file, stream) = self.open(id).await?;
        let chunks: Vec<Bytes> = stream.try_collect().await?;
        let mut buffer = Vec::with_capacity(usize::try_from(file.length).unwrap_or_default());
        for chunk in chunks {
            buffer.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffer))
    }
}

#[derive(Clone)]
pub struct PgResumeBucket {
    pool: PgPool,
}

impl PgResumeBucket {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeBucket for PgResumeBucket {
    async fn put(
        &self,
        bytes: Bytes,
        original_name: &str,
        content_type: &str,
    ) -> Result<StoredFile, StorageError> {
        let id = Uuid::new_v4();
        let filename = storage_name(original_name);

        let mut tx = self.pool.begin().await?;

        let file = sqlx::query_as::<_, StoredFile>(
            "INSERT INTO resume_files (id, filename, original_name, content_type, length, chunk_size)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, filename, original_name, content_type, length, chunk_size, uploaded_at",
        )
        .bind(id)
        .bind(&filename)
        .bind(original_name)
        .bind(content_type)
        .bind(bytes.len() as i64)
        .bind(CHUNK_SIZE as i32)
        .fetch_one(&mut *tx)
        .await?;

        for (n, chunk) in bytes.chunks(CHUNK_SIZE).enumerate() {
            sqlx::query("INSERT INTO resume_file_chunks (file_id, n, data) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(n as i32)
                .bind(chunk)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(file_id = %id, %filename, original_name, size = file.length, "stored resume file");
        Ok(file)
    }

    async fn info(&self, id: Uuid) -> Result<Option<StoredFile>, StorageError> {
        let file = sqlx::query_as::<_, StoredFile>(
            "SELECT id, filename, original_name, content_type, length, chunk_size, uploaded_at
             FROM resume_files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn open(&self, id: Uuid) -> Result<(StoredFile, ByteStream), StorageError> {
        let file = self.info(id).await?.ok_or(StorageError::NotFound(id))?;
        let total = file.chunk_count();
        let pool = self.pool.clone();

        let stream = futures::stream::try_unfold(0_i32, move |n| {
            next_chunk(pool.clone(), id, n, total)
        })
        .boxed();

        Ok((file, stream))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM resume_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }

        info!(file_id = %id, "deleted resume file");
        Ok(())
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM resume_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn next_chunk(
    pool: PgPool,
    id: Uuid,
    n: i32,
    total: i32,
) -> Result<Option<(Bytes, i32)>, StorageError> {
    if n >= total {
        return Ok(None);
    }

    let data: Option<Vec<u8>> =
        sqlx::query_scalar("SELECT data FROM resume_file_chunks WHERE file_id = $1 AND n = $2")
            .bind(id)
            .bind(n)
            .fetch_optional(&pool)
            .await?;
    let data = data.ok_or(StorageError::MissingChunk { id, n })?;

    Ok(Some((Bytes::from(data), n + 1)))
}

pub fn chunk_count(length: i64, chunk_size: i32) -> i32 {
    if length <= 0 || chunk_size <= 0 {
        return 0;
    }
    let chunk_size = i64::from(chunk_size);
    ((length + chunk_size - 1) / chunk_size) as i32
}

/// Random storage name that keeps the original extension but none of the original name.
pub fn storage_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| sanitize_filename::sanitize(ext.to_ascii_lowercase()))
        .filter(|ext| !ext.is_empty());

    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4().simple(), ext),
        None => Uuid::new_v4().simple().to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// Streams a stored file with headers taken from its metadata.
///
/// Once headers are out an error can no longer become an error response, so stream
/// failures are only logged.
pub fn stream_file(
    file: &StoredFile,
    display_name: &str,
    content_type: &str,
    disposition: Disposition,
    stream: ByteStream,
) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.length.max(0) as u64));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(disposition, display_name),
    );

    let file_id = file.id;
    let body = Body::from_stream(stream.inspect_err(move |err| {
        error!(?err, %file_id, "resume stream failed after headers were sent");
    }));

    (headers, body).into_response()
}

pub fn content_disposition(disposition: Disposition, filename: &str) -> HeaderValue {
    let value = match disposition {
        Disposition::Inline => "inline".to_string(),
        Disposition::Attachment => {
            let fallback: String = filename
                .chars()
                .map(|c| {
                    if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            if fallback == filename {
                format!("attachment; filename=\"{filename}\"")
            } else {
                format!(
                    "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
                    percent_encode(filename)
                )
            }
        }
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
