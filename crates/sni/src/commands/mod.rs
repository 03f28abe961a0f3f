//! CLI command implementations.

pub(crate) mod meta;
pub(crate) mod render;
pub(crate) mod tokens;

use std::path::Path;

use sni_config::{CliSettings, Config};
use sni_markdown::MarkdownPipeline;

use crate::error::CliError;

pub(crate) use meta::MetaArgs;
pub(crate) use render::RenderArgs;
pub(crate) use tokens::TokensArgs;

/// Load configuration and build the pipeline it describes.
pub(crate) fn load_pipeline(
    config_path: Option<&Path>,
    cli_settings: &CliSettings,
) -> Result<MarkdownPipeline, CliError> {
    let config = Config::load(config_path, Some(cli_settings))?;
    match &config.config_path {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
        None => tracing::info!("No sni.toml found, using defaults"),
    }
    Ok(MarkdownPipeline::with_options(config.pipeline_options()))
}
