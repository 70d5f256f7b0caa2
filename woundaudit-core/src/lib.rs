// Wound Audit Core Library
//
// Document ingestion, identifier extraction and clinical metrics for wound
// care documentation audits, with a pluggable text-generation service and
// PDF report rendering.

pub mod composer;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod metrics;
pub mod preprocessors;
pub mod processor;
pub mod render;
pub mod service;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use composer::AuditRequestComposer;
pub use config::{AuditConfig, AuditFramework, DocumentPolicy, RenderConfig, ServiceConfig};
pub use error::{AuditError, Result};
pub use identifiers::{IdentifierExtractor, IdentifierRules};
pub use preprocessors::{DocumentExtractor, PdfPreprocessor, Preprocessor};
pub use processor::{AuditOutcome, AuditProcessor, AuditStages, StepProfiler};
pub use render::{normalize_typography, RenderedReport, ReportRenderer};
pub use service::{validate_response, StaticTextService, TextGenerationService};
