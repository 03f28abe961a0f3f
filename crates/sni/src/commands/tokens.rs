//! `sni tokens` command implementation.

use std::path::PathBuf;

use clap::Args;
use sni_config::CliSettings;
use sni_markdown::{PipelineError, Token};

use super::load_pipeline;
use crate::error::CliError;
use crate::output;

/// Arguments for the tokens command.
#[derive(Args)]
pub(crate) struct TokensArgs {
    /// Markdown file to tokenize.
    file: PathBuf,

    /// Print JSON on a single line.
    #[arg(long)]
    compact: bool,

    /// Path to configuration file (default: auto-discover sni.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl TokensArgs {
    /// Execute the tokens command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the file cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let pipeline = load_pipeline(self.config.as_deref(), &CliSettings::default())?;
        let source = std::fs::read_to_string(&self.file).map_err(|source| PipelineError::Io {
            path: self.file.clone(),
            source,
        })?;
        let tokens = pipeline.tokenize(&source);
        output::print(&format_tokens(&tokens, self.compact)?)?;
        Ok(())
    }
}

fn format_tokens(tokens: &[Token], compact: bool) -> Result<String, CliError> {
    let json = if compact {
        serde_json::to_string(tokens)?
    } else {
        serde_json::to_string_pretty(tokens)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sni_markdown::MarkdownPipeline;

    use super::*;

    #[test]
    fn test_compact_tokens() {
        let tokens = MarkdownPipeline::new().tokenize("---\na: 1\n---\n");
        let json = format_tokens(&tokens, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["kind"], "front_matter");
        assert_eq!(value[0]["content"], "a: 1");
        assert_eq!(value[0]["nesting"], "self_closing");
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_children_are_nested() {
        let tokens = MarkdownPipeline::new().tokenize("*hi*\n");
        let value: serde_json::Value =
            serde_json::from_str(&format_tokens(&tokens, false).unwrap()).unwrap();
        assert_eq!(value[1]["kind"], "inline");
        assert_eq!(value[1]["children"][0]["kind"], "em_open");
    }
}
