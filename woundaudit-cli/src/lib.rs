// All pipeline functionality is in woundaudit-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod openai;
pub mod output;

// Re-export core types for convenience
pub use woundaudit_core::*;

// Re-export CLI utilities
pub use openai::OpenAiChatService;
pub use output::{save_report_text, save_stages, write_artifact, DEFAULT_REPORT_NAME};
