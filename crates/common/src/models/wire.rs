//! Request and response bodies of the backend HTTP contract

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::CaseId;
use crate::errors::{AppError, Result};

pub const MISSING_FILE: &str = "Please select a file first.";
pub const MISSING_QUESTION: &str = "Please enter a question for the detective.";
pub const MISSING_DESCRIPTION: &str = "Please provide a description of the suspect.";

/// File captured by the upload control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// A file must carry a name before it can be uploaded
    pub fn validate(&self) -> Result<()> {
        if self.filename.trim().is_empty() {
            return Err(AppError::validation("file", MISSING_FILE));
        }
        Ok(())
    }
}

/// Reply to `POST /upload-case/`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub case_id: Option<CaseId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationResponse {
    pub simulation: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1))]
    pub question: String,
}

impl AskRequest {
    pub fn new(question: &str) -> Result<Self> {
        let request = Self { question: question.trim().to_string() };
        request
            .validate()
            .map_err(|_| AppError::validation("question", MISSING_QUESTION))?;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct SuspectImageRequest {
    #[validate(length(min = 1))]
    pub description: String,
}

impl SuspectImageRequest {
    pub fn new(description: &str) -> Result<Self> {
        let request = Self { description: description.trim().to_string() };
        request
            .validate()
            .map_err(|_| AppError::validation("description", MISSING_DESCRIPTION))?;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuspectImageResponse {
    pub suspect_image_url: String,
}
