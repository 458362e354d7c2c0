//! Shared types, error model, and configuration for ContentForge.
//!
//! This crate is the foundation depended on by all other ContentForge crates.
//! It provides:
//! - [`ContentForgeError`]: the unified error type
//! - Domain types ([`GenerationRequest`], [`SourceDocument`], [`LogEvent`], ...)
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractionConfig, GenerationConfig, LlmConfig, PipelineConfig, api_key_from_env,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ContentForgeError, Result};
pub use types::{
    ApiKey, GeneratedDocument, GenerationRequest, LabeledUrls, LogEvent, OutlineSection,
    RelatedContentBundle, Severity, SourceDocument,
};
