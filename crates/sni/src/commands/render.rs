//! `sni render` command implementation.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use sni_config::CliSettings;
use sni_markdown::ProcessedDocument;

use super::load_pipeline;
use crate::error::CliError;
use crate::output;

/// Output format of the render command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum RenderFormat {
    /// Rendered HTML only.
    #[default]
    Html,
    /// JSON object with `metadata` and `html`.
    Json,
}

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    file: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    format: RenderFormat,

    /// Treat raw HTML as text (overrides config).
    #[arg(long)]
    no_html: bool,

    /// Render soft line breaks as <br> (overrides config).
    #[arg(long)]
    breaks: bool,

    /// Path to configuration file (default: auto-discover sni.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the file cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            html: self.no_html.then_some(false),
            breaks: self.breaks.then_some(true),
            ..CliSettings::default()
        };
        let pipeline = load_pipeline(self.config.as_deref(), &cli_settings)?;
        let doc = pipeline.process_file(&self.file)?;
        output::print(&format_document(&doc, self.format)?)?;
        Ok(())
    }
}

/// Format a processed document for stdout.
pub(crate) fn format_document(doc: &ProcessedDocument, format: RenderFormat) -> Result<String, CliError> {
    match format {
        RenderFormat::Html => Ok(doc.html.clone()),
        RenderFormat::Json => Ok(serde_json::to_string_pretty(doc)?),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sni_markdown::MarkdownPipeline;

    use super::*;

    #[test]
    fn test_format_html() {
        let doc = MarkdownPipeline::new().process("---\ntitle: Hi\n---\n*x*\n");
        assert_eq!(format_document(&doc, RenderFormat::Html).unwrap(), "<p><em>x</em></p>");
    }

    #[test]
    fn test_format_json() {
        let doc = MarkdownPipeline::new().process("---\ntitle: Hi\n---\n*x*\n");
        let json: serde_json::Value =
            serde_json::from_str(&format_document(&doc, RenderFormat::Json).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "metadata": { "title": "Hi" }, "html": "<p><em>x</em></p>" })
        );
    }

    #[test]
    fn test_format_json_without_metadata() {
        let doc = MarkdownPipeline::new().process("plain\n");
        let json: serde_json::Value =
            serde_json::from_str(&format_document(&doc, RenderFormat::Json).unwrap()).unwrap();
        assert_eq!(json["metadata"], serde_json::Value::Null);
    }
}
