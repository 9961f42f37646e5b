//! Suspect composite panel
//!
//! The displayed image is the working copy's `suspect_image`; this panel
//! only validates input and tracks generations in flight.

use casedesk_common::errors::AppError;
use casedesk_common::models::{Case, CasePatch, SuspectImageRequest};

#[derive(Debug, Clone, Default)]
pub struct SuspectPanel {
    generating: usize,
}

impl SuspectPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a description; returns the trimmed text to submit
    pub fn submit(&mut self, description: &str) -> Result<String, AppError> {
        let request = SuspectImageRequest::new(description)?;
        self.generating += 1;
        Ok(request.description)
    }

    /// On success the URL is merged into the working copy; on failure the
    /// prior image stays
    pub fn generated(&mut self, case: &mut Case, result: Result<String, AppError>) -> Result<(), AppError> {
        self.generating = self.generating.saturating_sub(1);
        let url = result?;
        case.merge(&CasePatch::SuspectImage(url));
        Ok(())
    }

    pub fn is_generating(&self) -> bool {
        self.generating > 0
    }
}
