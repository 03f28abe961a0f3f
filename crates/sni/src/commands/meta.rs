//! `sni meta` command implementation.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use sni_config::CliSettings;
use sni_markdown::Metadata;

use super::load_pipeline;
use crate::error::CliError;
use crate::output::{self, Output};

/// Output format of the meta command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum MetaFormat {
    #[default]
    Json,
    Yaml,
}

/// Arguments for the meta command.
#[derive(Args)]
pub(crate) struct MetaArgs {
    /// Markdown file to read.
    file: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    format: MetaFormat,

    /// Path to configuration file (default: auto-discover sni.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl MetaArgs {
    /// Execute the meta command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the file cannot be read.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let pipeline = load_pipeline(self.config.as_deref(), &CliSettings::default())?;
        let doc = pipeline.process_file(&self.file)?;

        if doc.metadata.is_none() {
            output.warning(&format!("No front matter in {}", self.file.display()));
        }
        if let Some(text) = format_metadata(doc.metadata.as_ref(), self.format)? {
            output::print(&text)?;
        }
        Ok(())
    }
}

/// Format metadata for stdout. Absent metadata prints as JSON `null` and as
/// nothing in YAML.
pub(crate) fn format_metadata(
    metadata: Option<&Metadata>,
    format: MetaFormat,
) -> Result<Option<String>, CliError> {
    match (format, metadata) {
        (MetaFormat::Json, metadata) => Ok(Some(serde_json::to_string_pretty(&metadata)?)),
        (MetaFormat::Yaml, Some(metadata)) => Ok(Some(metadata.to_yaml()?)),
        (MetaFormat::Yaml, None) => Ok(None),
    }
}
