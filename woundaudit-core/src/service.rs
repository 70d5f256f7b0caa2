//! The external text-generation service seam.
//!
//! The pipeline only knows this trait. The CLI supplies an HTTP client for
//! an OpenAI-compatible endpoint; tests supply `StaticTextService`.

use crate::error::{AuditError, Result};
use crate::types::AuditRequest;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A black-box service turning one audit request into one narrative
pub trait TextGenerationService: Send + Sync {
    /// Blocking call. Transport failures are `ServiceUnavailable`;
    /// a missing or blank narrative is `EmptyReport`.
    fn generate(&self, request: &AuditRequest) -> Result<String>;

    fn name(&self) -> &str;
}

/// Reject responses with no usable narrative
pub fn validate_response(content: Option<String>) -> Result<String> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AuditError::EmptyReport),
    }
}

/// Canned responses for tests and offline runs. Counts calls.
pub struct StaticTextService {
    response: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl StaticTextService {
    /// Always answer with `narrative`
    pub fn replying(narrative: impl Into<String>) -> Self {
        Self {
            response: Ok(narrative.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail as unavailable with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerationService for StaticTextService {
    fn generate(&self, _request: &AuditRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(narrative) => validate_response(Some(narrative.clone())),
            Err(reason) => Err(AuditError::ServiceUnavailable(reason.clone())),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
