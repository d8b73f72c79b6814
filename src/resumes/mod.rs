//! Resume uploads: validation, fingerprinting, and text extraction.
//!
//! Only the extracted text and metadata are kept. Parsing of binary formats
//! is delegated to a [`TextExtractor`]; the bundled one reads plain text.

pub mod handlers;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::models::Resume;
use crate::db::store::ResumeStore;
use crate::error::AppError;

pub const ALLOWED_FILE_TYPES: &[(&str, &str)] = &[
    ("application/pdf", ".pdf"),
    ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", ".docx"),
    ("application/msword", ".doc"),
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/webp", ".webp"),
    ("text/plain", ".txt"),
];

pub fn is_allowed_file_type(file_type: &str) -> bool {
    ALLOWED_FILE_TYPES.iter().any(|(mime, _)| *mime == file_type)
}

pub trait TextExtractor: Send + Sync {
    /// `None` when the format is unsupported or yields no text.
    fn extract_text(&self, file_type: &str, bytes: &[u8]) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, file_type: &str, bytes: &[u8]) -> Option<String> {
        if file_type != "text/plain" {
            return None;
        }
        let text = String::from_utf8_lossy(bytes).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone)]
pub struct UploadInput {
    pub file_name: String,
    pub file_type: String,
    /// Base64 of the file bytes.
    pub content: String,
}

pub struct ResumeService {
    store: Arc<dyn ResumeStore>,
    extractor: Arc<dyn TextExtractor>,
    clock: Arc<dyn Clock>,
    max_file_size: u64,
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

impl ResumeService {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        extractor: Arc<dyn TextExtractor>,
        clock: Arc<dyn Clock>,
        max_file_size_mb: u64,
    ) -> Self {
        Self {
            store,
            extractor,
            clock,
            max_file_size: max_file_size_mb * 1024 * 1024,
        }
    }

    pub async fn upload(&self, user_id: Uuid, input: UploadInput) -> Result<Resume, AppError> {
        if input.file_name.trim().is_empty() {
            return Err(AppError::ValidationError("File name is required".into()));
        }
        if !is_allowed_file_type(&input.file_type) {
            return Err(AppError::ValidationError(format!(
                "File type {} is not allowed. Allowed types: PDF, DOCX, PNG, JPG, WEBP, TXT",
                input.file_type
            )));
        }

        let bytes = BASE64
            .decode(input.content.trim())
            .map_err(|_| AppError::ValidationError("File content must be base64 encoded".into()))?;
        if bytes.is_empty() {
            return Err(AppError::ValidationError("No file content provided".into()));
        }
        if bytes.len() as u64 > self.max_file_size {
            return Err(AppError::ValidationError(format!(
                "File size exceeds maximum of {}MB",
                self.max_file_size / (1024 * 1024)
            )));
        }

        let extracted_text = self.extractor.extract_text(&input.file_type, &bytes);
        if extracted_text.is_none() {
            warn!("No text extracted from {} upload", input.file_type);
        }

        let resume = Resume {
            id: Uuid::new_v4(),
            user_id,
            file_name: sanitize_file_name(&input.file_name),
            file_type: input.file_type,
            file_size: bytes.len() as i64,
            content_hash: hex_digest(&bytes),
            extracted_text,
            created_at: self.clock.now(),
        };
        let resume = self.store.create_resume(&resume).await?;

        info!("Stored resume {} for user {}", resume.id, user_id);
        Ok(resume)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Resume>, AppError> {
        self.store.list_resumes(user_id).await
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
