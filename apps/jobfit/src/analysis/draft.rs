//! Upload Draft: the pending resume / job-description pair.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use bytes::Bytes;

use crate::errors::AppError;

/// Upload formats the scoring service can extract text from.
const SUPPORTED_EXTENSIONS: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("txt", "text/plain"),
];

/// A document picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self, AppError> {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name)?;
        Ok(Self {
            file_name,
            content_type,
            bytes: bytes.into(),
        })
    }

    /// Reads a document from disk.
    pub async fn from_path(path: &Path) -> Result<Self, AppError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Validation(format!("Not a file: {}", path.display())))?
            .to_string();

        // Reject the extension before touching the disk.
        content_type_for(&file_name)?;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read upload: {}", path.display()))?;

        Self::new(file_name, bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(file_name: &str) -> Result<&'static str, AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Unsupported file format: {file_name}. Use PDF, DOC, DOCX, ODT or TXT"
            ))
        })
}

/// One slot's value: pasted text or an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftInput {
    Text(String),
    File(UploadFile),
}

impl DraftInput {
    pub fn text(value: impl Into<String>) -> Self {
        DraftInput::Text(value.into())
    }

    /// Whitespace-only text and zero-byte files carry nothing to score.
    pub fn is_empty(&self) -> bool {
        match self {
            DraftInput::Text(text) => text.trim().is_empty(),
            DraftInput::File(file) => file.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DraftInput::Text(text) => Some(text),
            DraftInput::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadFile> {
        match self {
            DraftInput::File(file) => Some(file),
            DraftInput::Text(_) => None,
        }
    }
}

impl From<UploadFile> for DraftInput {
    fn from(file: UploadFile) -> Self {
        DraftInput::File(file)
    }
}

/// The user's not-yet-submitted pair of inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadDraft {
    resume: Option<DraftInput>,
    job_description: Option<DraftInput>,
}

impl UploadDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resume(&mut self, value: DraftInput) {
        self.resume = Some(value);
    }

    pub fn set_job_description(&mut self, value: DraftInput) {
        self.job_description = Some(value);
    }

    pub fn clear_resume(&mut self) {
        self.resume = None;
    }

    pub fn clear_job_description(&mut self) {
        self.job_description = None;
    }

    pub fn resume(&self) -> Option<&DraftInput> {
        self.resume.as_ref()
    }

    pub fn job_description(&self) -> Option<&DraftInput> {
        self.job_description.as_ref()
    }

    pub fn has_resume(&self) -> bool {
        slot_filled(&self.resume)
    }

    pub fn has_job_description(&self) -> bool {
        slot_filled(&self.job_description)
    }

    /// True iff both slots hold something to score. Derived from the slots on
    /// every call.
    pub fn is_ready(&self) -> bool {
        self.has_resume() && self.has_job_description()
    }

    /// Both inputs, cloned for dispatch. `None` unless `is_ready()`.
    pub fn submission(&self) -> Option<(DraftInput, DraftInput)> {
        match (&self.resume, &self.job_description) {
            (Some(resume), Some(job)) if self.is_ready() => Some((resume.clone(), job.clone())),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.resume = None;
        self.job_description = None;
    }
}

fn slot_filled(slot: &Option<DraftInput>) -> bool {
    slot.as_ref().is_some_and(|input| !input.is_empty())
}
