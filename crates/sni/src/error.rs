//! CLI error types.

use sni_config::ConfigError;
use sni_markdown::{MetadataError, PipelineError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Metadata(#[from] MetadataError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
