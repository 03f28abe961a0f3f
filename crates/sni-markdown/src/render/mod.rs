//! Token stream to HTML.
//!
//! A [`Renderer`] walks a token sequence once and asks its [`RuleTable`] for
//! the rule of every token kind. The table layers per-instance overrides on
//! top of a process-wide default table, and falls back to a generic rule
//! that emits the token's tag, so no kind is ever unrenderable.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use sni_markdown::{RenderContext, Renderer, Token, Tokenizer};
//!
//! let tokens = Tokenizer::default().tokenize("Some `code`\n");
//! let renderer = Renderer::new().with_rule(
//!     "code_inline",
//!     Arc::new(|tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>| {
//!         format!("<kbd>{}</kbd>", tokens[idx].content)
//!     }),
//! );
//! assert_eq!(renderer.render(&tokens).html, "<p>Some <kbd>code</kbd></p>\n");
//! ```

mod html;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::Serialize;

use crate::ext::{self, FRONT_MATTER};
use crate::metadata::Metadata;
use crate::token::Token;

pub use html::{render_attrs, render_inline_as_text, render_token};

/// Render rule: `(tokens, idx, ctx) -> markup` for `tokens[idx]`.
pub type RenderFn = dyn Fn(&[Token], usize, &RenderContext<'_>) -> String + Send + Sync;

/// Shared handle to a render rule.
pub type RenderRule = Arc<RenderFn>;

/// What a rule can see besides the tokens.
pub struct RenderContext<'a> {
    /// Renderer running the rule, for rules that render nested sequences.
    pub renderer: &'a Renderer,
    /// Output options.
    pub options: &'a RenderOptions,
}

/// HTML output options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Close void tags XHTML style (`<br />`).
    pub xhtml_out: bool,
    /// Render soft line breaks as `<br>`.
    pub breaks: bool,
    /// Class prefix for the language of fenced code blocks.
    pub lang_prefix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            xhtml_out: true,
            breaks: false,
            lang_prefix: "language-".to_owned(),
        }
    }
}

type RuleMap = HashMap<&'static str, RenderRule>;

/// Core and built-in extension rules, seeded on first use.
static DEFAULT_RULES: LazyLock<Arc<RuleMap>> = LazyLock::new(|| {
    let rules: RuleMap = html::default_rules()
        .into_iter()
        .chain(ext::default_rules())
        .collect();
    tracing::debug!(rules = rules.len(), "Seeded default render rules");
    Arc::new(rules)
});

/// Mapping from token kind to render rule.
///
/// Lookups go override, then default, then [`render_token`]. Overrides belong
/// to one table; the defaults are shared read-only by every table.
#[derive(Clone)]
pub struct RuleTable {
    defaults: Arc<RuleMap>,
    overrides: HashMap<String, RenderRule>,
}

impl RuleTable {
    /// Create a table with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self {
            defaults: Arc::clone(&DEFAULT_RULES),
            overrides: HashMap::new(),
        }
    }

    /// Rule for `kind`.
    pub fn resolve(&self, kind: &str) -> &RenderFn {
        match self.overrides.get(kind).or_else(|| self.defaults.get(kind)) {
            Some(rule) => rule.as_ref(),
            None => &render_token,
        }
    }

    /// Replace the rule for `kind` on this table only.
    pub fn override_rule(&mut self, kind: impl Into<String>, rule: RenderRule) {
        self.overrides.insert(kind.into(), rule);
    }

    /// Drop the override for `kind`, restoring the default. Returns the
    /// removed rule.
    pub fn remove_override(&mut self, kind: &str) -> Option<RenderRule> {
        self.overrides.remove(kind)
    }

    /// Whether `kind` has a dedicated rule, overridden or default.
    #[must_use]
    pub fn has_rule(&self, kind: &str) -> bool {
        self.overrides.contains_key(kind) || self.defaults.contains_key(kind)
    }

    /// Whether `kind` is overridden on this table.
    #[must_use]
    pub fn is_overridden(&self, kind: &str) -> bool {
        self.overrides.contains_key(kind)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overrides: Vec<_> = self.overrides.keys().collect();
        overrides.sort();
        f.debug_struct("RuleTable")
            .field("defaults", &self.defaults.len())
            .field("overrides", &overrides)
            .finish()
    }
}

/// Result of a render pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RenderOutput {
    /// Rendered HTML.
    pub html: String,
    /// Parsed metadata block, if the tokens carried a well-formed one.
    pub metadata: Option<Metadata>,
}

/// Renders token sequences to HTML.
///
/// Holds no per-document state: metadata found while rendering is returned
/// in the [`RenderOutput`] of that call.
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    rules: RuleTable,
    options: RenderOptions,
}

impl Renderer {
    /// Create a renderer with default options and rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output options.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the rule for `kind`.
    #[must_use]
    pub fn with_rule(mut self, kind: impl Into<String>, rule: RenderRule) -> Self {
        self.rules.override_rule(kind, rule);
        self
    }

    /// Rule table of this renderer.
    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Mutable rule table of this renderer.
    pub fn rules_mut(&mut self) -> &mut RuleTable {
        &mut self.rules
    }

    /// Output options.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render a block-level token sequence.
    ///
    /// The content of a `front_matter` token is parsed into
    /// [`RenderOutput::metadata`]; a block that is not a YAML mapping is
    /// logged and left out.
    pub fn render(&self, tokens: &[Token]) -> RenderOutput {
        let ctx = RenderContext {
            renderer: self,
            options: &self.options,
        };
        let mut output = RenderOutput {
            html: String::with_capacity(tokens.len() * 16),
            metadata: None,
        };

        for (idx, token) in tokens.iter().enumerate() {
            if token.kind == FRONT_MATTER && output.metadata.is_none() {
                output.metadata = match Metadata::from_yaml(&token.content) {
                    Ok(metadata) => Some(metadata),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring malformed front matter");
                        None
                    }
                };
            }
            output.html.push_str(&self.rules.resolve(token.kind)(tokens, idx, &ctx));
        }

        output
    }

    /// Render an inline token sequence (the children of an `inline` token).
    pub fn render_inline(&self, tokens: &[Token]) -> String {
        let ctx = RenderContext {
            renderer: self,
            options: &self.options,
        };
        tokens
            .iter()
            .enumerate()
            .map(|(idx, token)| self.rules.resolve(token.kind)(tokens, idx, &ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ext::FrontMatter;
    use crate::grammar::{GrammarBuilder, ParserOptions};
    use crate::parser::Tokenizer;
    use crate::token::Nesting;

    fn front_matter_tokenizer() -> Tokenizer {
        Tokenizer::new(
            GrammarBuilder::commonmark(ParserOptions::default())
                .with_extension(&FrontMatter)
                .build(),
        )
    }

    #[test]
    fn test_resolve_falls_back_to_generic() {
        let table = RuleTable::new();
        assert!(table.has_rule("text"));
        assert!(!table.has_rule("paragraph_open"));

        let tokens = vec![Token::new("custom", "aside", Nesting::Open)];
        let renderer = Renderer::new();
        let ctx = RenderContext {
            renderer: &renderer,
            options: renderer.options(),
        };
        assert_eq!(table.resolve("custom")(&tokens, 0, &ctx), "<aside>");
    }

    #[test]
    fn test_override_is_per_instance() {
        let tokens = Tokenizer::default().tokenize("`a` and *b*\n");
        let plain = Renderer::new();
        let custom = plain.clone().with_rule(
            "code_inline",
            Arc::new(|tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>| {
                format!("[{}]", tokens[idx].content)
            }),
        );

        assert_eq!(plain.render(&tokens).html, "<p><code>a</code> and <em>b</em></p>\n");
        assert_eq!(custom.render(&tokens).html, "<p>[a] and <em>b</em></p>\n");
        assert!(custom.rules().is_overridden("code_inline"));
        assert!(!plain.rules().is_overridden("code_inline"));
    }

    #[test]
    fn test_override_leaves_other_documents_unchanged() {
        let tokens = Tokenizer::default().tokenize("# Title\n\n- one\n- two\n");
        let custom = Renderer::new().with_rule(
            "code_inline",
            Arc::new(|_: &[Token], _: usize, _: &RenderContext<'_>| String::from("!")),
        );
        assert_eq!(custom.render(&tokens), Renderer::new().render(&tokens));
    }

    #[test]
    fn test_remove_override_restores_default() {
        let tokens = Tokenizer::default().tokenize("`a`\n");
        let mut renderer = Renderer::new().with_rule(
            "code_inline",
            Arc::new(|_: &[Token], _: usize, _: &RenderContext<'_>| String::new()),
        );
        assert_eq!(renderer.render(&tokens).html, "<p></p>\n");
        assert!(renderer.rules_mut().remove_override("code_inline").is_some());
        assert_eq!(renderer.render(&tokens).html, "<p><code>a</code></p>\n");
    }

    #[test]
    fn test_front_matter_becomes_metadata() {
        let tokens = front_matter_tokenizer().tokenize("---\ntitle: Hello\n---\n# Hi\n");
        let output = Renderer::new().render(&tokens);
        assert_eq!(output.html, "<h1>Hi</h1>\n");
        let metadata = output.metadata.unwrap();
        assert_eq!(metadata.get_str("title"), Some("Hello"));
    }

    #[test]
    fn test_malformed_front_matter_is_absent() {
        let tokens = front_matter_tokenizer().tokenize("---\ntitle: [unclosed\n---\nbody\n");
        let output = Renderer::new().render(&tokens);
        assert_eq!(output.metadata, None);
        assert_eq!(output.html, "<p>body</p>\n");
    }

    #[test]
    fn test_scalar_front_matter_is_absent() {
        let tokens = front_matter_tokenizer().tokenize("---\njust a string\n---\nbody\n");
        assert_eq!(Renderer::new().render(&tokens).metadata, None);
    }

    #[test]
    fn test_metadata_is_scoped_to_call() {
        let renderer = Renderer::new();
        let with = front_matter_tokenizer().tokenize("---\na: 1\n---\n");
        let without = front_matter_tokenizer().tokenize("text\n");
        assert!(renderer.render(&with).metadata.is_some());
        assert!(renderer.render(&without).metadata.is_none());
    }

    #[test]
    fn test_inline_rule_can_be_overridden() {
        let tokens = Tokenizer::default().tokenize("# Title\n\nsome *text*\n");
        let renderer = Renderer::new().with_rule(
            "inline",
            Arc::new(|tokens: &[Token], idx: usize, ctx: &RenderContext<'_>| {
                let children = tokens[idx].children.as_deref().unwrap_or_default();
                format!("[{}]", ctx.renderer.render_inline(children))
            }),
        );
        assert_eq!(
            renderer.render(&tokens).html,
            "<h1>[Title]</h1>\n<p>[some <em>text</em>]</p>\n"
        );
        assert!(Renderer::new().rules().has_rule("inline"));
    }

    #[test]
    fn test_rule_table_debug_lists_overrides() {
        let mut table = RuleTable::new();
        table.override_rule("text", Arc::new(|_: &[Token], _: usize, _: &RenderContext<'_>| String::new()));
        assert!(format!("{table:?}").contains("[\"text\"]"));
    }
}
