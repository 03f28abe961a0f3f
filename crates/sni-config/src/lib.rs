//! Configuration management for sni.
//!
//! Parses `sni.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. Every section and
//! field is optional; a missing file means defaults.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [markdown]
//! html = true
//! breaks = false
//! xhtml_out = true
//!
//! [extensions]
//! math = false
//!
//! [math]
//! allow_labels = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sni_markdown::ext::MathOptions;
use sni_markdown::{ExtensionSet, ParserOptions, PipelineOptions, RenderOptions};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override raw HTML recognition.
    pub html: Option<bool>,
    /// Override soft break rendering.
    pub breaks: Option<bool>,
    /// Override XHTML-style void tags.
    pub xhtml_out: Option<bool>,
    /// Override the math extension toggle.
    pub math: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "sni.toml";

/// Upper bound accepted for `markdown.max_nesting`.
const MAX_NESTING_LIMIT: usize = 1000;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tokenizer and HTML output settings.
    pub markdown: MarkdownConfig,
    /// Built-in extension toggles.
    pub extensions: ExtensionsConfig,
    /// Math syntax settings.
    pub math: MathConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Markdown configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Recognize raw HTML.
    pub html: bool,
    /// Render soft line breaks as `<br>`.
    pub breaks: bool,
    /// XHTML-style void tags (`<br />`).
    pub xhtml_out: bool,
    /// Class prefix for fenced code languages.
    pub lang_prefix: String,
    /// Maximum nesting depth.
    pub max_nesting: usize,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            html: true,
            breaks: false,
            xhtml_out: true,
            lang_prefix: "language-".to_owned(),
            max_nesting: 100,
        }
    }
}

/// Extension toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtensionsConfig {
    pub front_matter: bool,
    pub footnote: bool,
    pub deflist: bool,
    pub math: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            front_matter: true,
            footnote: true,
            deflist: true,
            math: true,
        }
    }
}

/// Math configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MathConfig {
    /// Allow whitespace inside inline delimiters.
    pub allow_space: bool,
    /// Allow a digit right after a closing `$`.
    pub allow_digits: bool,
    /// Recognize labelled display blocks.
    pub allow_labels: bool,
    /// Recognize `$$...$$` inside paragraphs.
    pub double_inline: bool,
}

impl Default for MathConfig {
    fn default() -> Self {
        let options = MathOptions::default();
        Self {
            allow_space: options.allow_space,
            allow_digits: options.allow_digits,
            allow_labels: options.allow_labels,
            double_inline: options.double_inline,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `sni.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or a value is out of range.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(html) = settings.html {
            self.markdown.html = html;
        }
        if let Some(breaks) = settings.breaks {
            self.markdown.breaks = breaks;
        }
        if let Some(xhtml_out) = settings.xhtml_out {
            self.markdown.xhtml_out = xhtml_out;
        }
        if let Some(math) = settings.math {
            self.extensions.math = math;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_nesting = self.markdown.max_nesting;
        if max_nesting == 0 {
            return Err(ConfigError::Validation(
                "markdown.max_nesting must be greater than 0".to_owned(),
            ));
        }
        if max_nesting > MAX_NESTING_LIMIT {
            return Err(ConfigError::Validation(format!(
                "markdown.max_nesting cannot exceed {MAX_NESTING_LIMIT}"
            )));
        }

        if self
            .markdown
            .lang_prefix
            .contains(|c: char| c.is_whitespace() || c == '"')
        {
            return Err(ConfigError::Validation(
                "markdown.lang_prefix cannot contain whitespace or quotes".to_owned(),
            ));
        }

        Ok(())
    }

    /// Pipeline options described by this configuration.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            parser: ParserOptions {
                html: self.markdown.html,
                max_nesting: self.markdown.max_nesting,
            },
            render: RenderOptions {
                xhtml_out: self.markdown.xhtml_out,
                breaks: self.markdown.breaks,
                lang_prefix: self.markdown.lang_prefix.clone(),
            },
            math: MathOptions {
                allow_space: self.math.allow_space,
                allow_digits: self.math.allow_digits,
                allow_labels: self.math.allow_labels,
                double_inline: self.math.double_inline,
            },
            extensions: ExtensionSet {
                front_matter: self.extensions.front_matter,
                footnote: self.extensions.footnote,
                deflist: self.extensions.deflist,
                math: self.extensions.math,
            },
        }
    }
}
