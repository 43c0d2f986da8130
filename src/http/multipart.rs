//! `multipart/form-data` decoding.
//!
//! Only file parts (those with a filename) are kept; plain text fields are
//! skipped. The body is consumed as a stream: file parts are held in memory
//! until the per-request memory budget runs out, after which the remainder
//! of each upload goes to an anonymous temporary file.

use std::io::SeekFrom;

use axum::body::Bytes;
use futures_util::Stream;
use multer::{Constraints, SizeLimit};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::http::decode::{DecodeError, DecodeLimits};
use crate::http::request::FileDetail;

/// Accumulates one upload, spilling to disk past `threshold` bytes.
#[derive(Debug)]
pub struct SpillBuffer {
    memory: Vec<u8>,
    disk: Option<tokio::fs::File>,
    len: u64,
    threshold: usize,
}

impl SpillBuffer {
    pub fn new(threshold: usize) -> Self {
        Self {
            memory: Vec::new(),
            disk: None,
            len: 0,
            threshold,
        }
    }

    pub async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.len += chunk.len() as u64;

        if let Some(file) = self.disk.as_mut() {
            return file.write_all(chunk).await;
        }

        if self.memory.len() + chunk.len() <= self.threshold {
            self.memory.extend_from_slice(chunk);
            return Ok(());
        }

        let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
        file.write_all(&self.memory).await?;
        file.write_all(chunk).await?;
        tracing::debug!(bytes = self.len, "Multipart upload spilled to disk");
        self.memory = Vec::new();
        self.disk = Some(file);
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes currently held in memory.
    pub fn in_memory(&self) -> usize {
        self.memory.len()
    }

    pub fn spilled(&self) -> bool {
        self.disk.is_some()
    }

    /// Collect the full upload. The temporary file is removed on drop.
    pub async fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self.disk {
            None => Ok(self.memory),
            Some(mut file) => {
                file.flush().await?;
                file.seek(SeekFrom::Start(0)).await?;
                let mut bytes = Vec::with_capacity(self.len as usize);
                file.read_to_end(&mut bytes).await?;
                Ok(bytes)
            }
        }
    }
}

/// Decode the file parts of a multipart body as it streams in.
///
/// The whole stream is capped at `max_body_bytes`. Files are grouped by
/// field key in order of first appearance, then by part order within each
/// key.
pub async fn decode_files<S, E>(
    content_type: &str,
    body: S,
    limits: &DecodeLimits,
) -> Result<Vec<FileDetail>, DecodeError>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let boundary = multer::parse_boundary(content_type)?;
    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(limits.max_body_bytes as u64));
    let mut multipart = multer::Multipart::with_constraints(body, boundary, constraints);

    let mut groups: Vec<(String, Vec<FileDetail>)> = Vec::new();
    let mut budget = limits.multipart_memory_bytes;

    while let Some(mut field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().filter(|n| !n.is_empty()).map(str::to_string) else {
            continue;
        };
        let field_key = field.name().unwrap_or_default().to_string();
        let file_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_default();

        let mut buffer = SpillBuffer::new(budget);
        while let Some(chunk) = field.chunk().await? {
            buffer.write(&chunk).await?;
        }
        budget = budget.saturating_sub(buffer.in_memory());

        let size_bytes = buffer.len();
        let detail = FileDetail {
            field_key: field_key.clone(),
            file_name,
            file_type,
            size_bytes,
            bytes: buffer.into_bytes().await?,
        };

        match groups.iter_mut().find(|(key, _)| *key == field_key) {
            Some((_, files)) => files.push(detail),
            None => groups.push((field_key, vec![detail])),
        }
    }

    Ok(groups.into_iter().flat_map(|(_, files)| files).collect())
}
