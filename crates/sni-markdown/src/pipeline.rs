//! Text in, metadata and HTML out.
//!
//! [`MarkdownPipeline`] owns a tokenizer built from the CommonMark grammar
//! plus the enabled extensions, and a renderer whose math rules emit
//! `language-math` markup.
//!
//! # Example
//!
//! ```
//! use sni_markdown::MarkdownPipeline;
//!
//! let pipeline = MarkdownPipeline::new();
//! let doc = pipeline.process("---\ntitle: Hello\n---\n# Hi\n");
//!
//! assert_eq!(doc.html, "<h1>Hi</h1>");
//! assert_eq!(doc.metadata.unwrap().get_str("title"), Some("Hello"));
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::error::PipelineError;
use crate::ext::math::math_content;
use crate::ext::{Deflist, Footnote, FrontMatter, Math, MathOptions};
use crate::grammar::{Extension, GrammarBuilder, ParserOptions};
use crate::metadata::Metadata;
use crate::parser::Tokenizer;
use crate::render::{RenderContext, RenderOptions, RenderRule, Renderer};
use crate::token::Token;

/// Which built-in extensions are registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtensionSet {
    pub front_matter: bool,
    pub footnote: bool,
    pub deflist: bool,
    pub math: bool,
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self {
            front_matter: true,
            footnote: true,
            deflist: true,
            math: true,
        }
    }
}

/// Options for building a [`MarkdownPipeline`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineOptions {
    /// Tokenizer options.
    pub parser: ParserOptions,
    /// HTML output options.
    pub render: RenderOptions,
    /// Math syntax options, used when math is enabled.
    pub math: MathOptions,
    /// Built-in extension toggles.
    pub extensions: ExtensionSet,
}

/// Result of processing one document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessedDocument {
    /// Parsed front matter, absent when the document has none or it is
    /// malformed.
    pub metadata: Option<Metadata>,
    /// Rendered HTML, trimmed.
    pub html: String,
    /// The input text.
    #[serde(skip)]
    pub source: String,
}

/// Markdown to HTML with front matter extraction.
///
/// Immutable once built; share it across threads freely.
#[derive(Clone)]
pub struct MarkdownPipeline {
    tokenizer: Tokenizer,
    renderer: Renderer,
    extensions: Vec<&'static str>,
}

impl MarkdownPipeline {
    /// Create a pipeline with every built-in extension enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a pipeline from options.
    #[must_use]
    pub fn with_options(options: PipelineOptions) -> Self {
        Self::builder().with_options(options).build()
    }

    /// Start building a customized pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Tokenizer used by [`process`](Self::process).
    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Renderer used by [`process`](Self::process).
    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Names of the registered extensions, in registration order.
    #[must_use]
    pub fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    /// Tokenize `source` without rendering.
    pub fn tokenize(&self, source: &str) -> Vec<Token> {
        self.tokenizer.tokenize(source)
    }

    /// Tokenize and render `source`.
    pub fn process(&self, source: &str) -> ProcessedDocument {
        let tokens = self.tokenizer.tokenize(source);
        let output = self.renderer.render(&tokens);
        tracing::debug!(
            tokens = tokens.len(),
            html_len = output.html.len(),
            has_metadata = output.metadata.is_some(),
            "Processed document"
        );
        ProcessedDocument {
            metadata: output.metadata,
            html: output.html.trim().to_owned(),
            source: source.to_owned(),
        }
    }

    /// Read a UTF-8 file and process it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read or is not
    /// valid UTF-8.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<ProcessedDocument, PipelineError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.process(&source))
    }
}

impl Default for MarkdownPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarkdownPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownPipeline")
            .field("extensions", &self.extensions)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MarkdownPipeline`].
pub struct PipelineBuilder {
    options: PipelineOptions,
    extensions: Vec<Box<dyn Extension>>,
    rules: Vec<(String, RenderRule)>,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self {
            options: PipelineOptions::default(),
            extensions: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Replace all options.
    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Set tokenizer options.
    #[must_use]
    pub fn with_parser_options(mut self, options: ParserOptions) -> Self {
        self.options.parser = options;
        self
    }

    /// Set HTML output options.
    #[must_use]
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.options.render = options;
        self
    }

    /// Set math syntax options.
    #[must_use]
    pub fn with_math_options(mut self, options: MathOptions) -> Self {
        self.options.math = options;
        self
    }

    /// Choose the built-in extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.options.extensions = extensions;
        self
    }

    /// Register an extra extension after the built-in ones.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Override the render rule for `kind`.
    ///
    /// Applied last, so it wins over the rules the pipeline installs.
    #[must_use]
    pub fn with_rule(mut self, kind: impl Into<String>, rule: RenderRule) -> Self {
        self.rules.push((kind.into(), rule));
        self
    }

    /// Build the pipeline.
    #[must_use]
    pub fn build(self) -> MarkdownPipeline {
        let Self {
            options,
            extensions,
            rules,
        } = self;
        let enabled = options.extensions;

        let mut grammar = GrammarBuilder::commonmark(options.parser);
        let mut renderer = Renderer::new().with_options(options.render);
        let mut names = Vec::new();

        let mut register = |extension: &dyn Extension| {
            grammar.apply(extension);
            extension.install_rules(renderer.rules_mut());
            names.push(extension.name());
        };
        if enabled.front_matter {
            register(&FrontMatter);
        }
        if enabled.footnote {
            register(&Footnote);
        }
        if enabled.deflist {
            register(&Deflist);
        }
        if enabled.math {
            register(&Math::new(options.math));
        }
        for extension in &extensions {
            register(&**extension);
        }

        if enabled.math {
            let rules = renderer.rules_mut();
            rules.override_rule("math_inline", Arc::new(render_math_inline));
            rules.override_rule("math_block", Arc::new(render_math_display));
        }
        for (kind, rule) in rules {
            renderer.rules_mut().override_rule(kind, rule);
        }

        tracing::debug!(extensions = ?names, "Built markdown pipeline");
        MarkdownPipeline {
            tokenizer: Tokenizer::new(grammar.build()),
            renderer,
            extensions: names,
        }
    }
}

fn render_math_inline(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    format!(
        "<span class='language-math math-inline'>{}</span>",
        math_content(&tokens[idx])
    )
}

fn render_math_display(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    format!(
        "<div class=\"language-math math-display\">\n{}\n</div>\n",
        math_content(&tokens[idx])
    )
}
