//! Grammar registry.
//!
//! The base grammar is CommonMark as parsed by `pulldown-cmark`. A
//! [`GrammarBuilder`] holds two named rule chains on top of it:
//!
//! - **event** rules see each parser event before the base conversion and
//!   may claim it, turning it into their own tokens. The first rule that
//!   returns `true` wins.
//! - **core** rules run once per document, in order, around the parse
//!   (`normalize`, `parse`, `text_join`); extensions insert passes by name.
//!
//! Extensions also switch on the `pulldown-cmark` syntax they build on.
//! Once built, the [`Grammar`] is immutable and shared between tokenize calls.
//!
//! # Example
//!
//! ```
//! use sni_markdown::{GrammarBuilder, ParserOptions, Tokenizer};
//! use sni_markdown::ext::Deflist;
//!
//! let grammar = GrammarBuilder::commonmark(ParserOptions::default())
//!     .with_extension(&Deflist)
//!     .build();
//! let tokens = Tokenizer::new(grammar).tokenize("Term\n: Definition\n");
//! assert_eq!(tokens[0].kind, "dl_open");
//! ```

mod ruler;

use std::ops::Range;
use std::sync::Arc;

use pulldown_cmark::{Event, Options};

pub use ruler::{Chain, Ruler};

use crate::parser::{CoreState, EventState, core};
use crate::render::RuleTable;

/// Core rule: runs once per document over the whole state.
pub type CoreRule = Arc<dyn Fn(&mut CoreState<'_>) + Send + Sync>;

/// Event rule: `(state, event, source range) -> claimed`.
///
/// End events are never offered; they close whatever the matching start
/// opened.
pub type EventRule = Arc<dyn Fn(&mut EventState<'_>, &Event<'_>, &Range<usize>) -> bool + Send + Sync>;

/// Tokenizer options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserOptions {
    /// Pass raw HTML blocks and inline tags through. When off they are text.
    pub html: bool,
    /// Maximum nesting of block containers. Deeper containers keep their
    /// content but lose their own open/close tokens.
    pub max_nesting: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            html: true,
            max_nesting: 100,
        }
    }
}

/// A pluggable set of grammar rules.
///
/// Extensions see only the [`GrammarBuilder`]; they locate their insertion
/// point by rule name and never depend on each other.
pub trait Extension: Send + Sync {
    /// Extension name, used in logs.
    fn name(&self) -> &'static str;

    /// Register event and core rules, and enable parser syntax.
    fn register(&self, grammar: &mut GrammarBuilder);

    /// Install render rules for the token kinds this extension emits.
    ///
    /// Built-in extensions ship their rules in the shared default table, so
    /// the default does nothing.
    fn install_rules(&self, _rules: &mut RuleTable) {}
}

/// Mutable grammar under construction.
pub struct GrammarBuilder {
    /// Per-document passes.
    pub core: Ruler<CoreRule>,
    /// Rules offered each parser event ahead of the base conversion.
    pub events: Ruler<EventRule>,
    syntax: Options,
    options: ParserOptions,
}

impl GrammarBuilder {
    /// Create a builder with empty chains.
    #[must_use]
    pub fn empty(options: ParserOptions) -> Self {
        Self {
            core: Ruler::new(),
            events: Ruler::new(),
            syntax: Options::empty(),
            options,
        }
    }

    /// Create a builder seeded with the CommonMark core passes.
    #[must_use]
    pub fn commonmark(options: ParserOptions) -> Self {
        let mut builder = Self::empty(options);
        core::register(&mut builder);
        builder
    }

    /// Parser options the grammar is built with.
    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// Switch on `pulldown-cmark` syntax, e.g. `Options::ENABLE_MATH`.
    pub fn enable_syntax(&mut self, syntax: Options) {
        self.syntax |= syntax;
    }

    /// `pulldown-cmark` syntax enabled so far.
    pub fn syntax(&self) -> Options {
        self.syntax
    }

    /// Apply an extension.
    pub fn apply(&mut self, extension: &dyn Extension) {
        tracing::debug!(extension = extension.name(), "Registering grammar extension");
        extension.register(self);
    }

    /// Apply an extension, builder style.
    #[must_use]
    pub fn with_extension(mut self, extension: &dyn Extension) -> Self {
        self.apply(extension);
        self
    }

    /// Freeze the chains.
    #[must_use]
    pub fn build(self) -> Grammar {
        Grammar {
            options: self.options,
            syntax: self.syntax,
            core: self.core.compile(),
            events: self.events.compile(),
        }
    }
}

/// Immutable compiled grammar.
pub struct Grammar {
    pub(crate) options: ParserOptions,
    pub(crate) syntax: Options,
    pub(crate) core: Chain<CoreRule>,
    pub(crate) events: Chain<EventRule>,
}

impl Grammar {
    /// Parser options the grammar was built with.
    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// `pulldown-cmark` syntax the grammar parses.
    pub fn syntax(&self) -> Options {
        self.syntax
    }
}

impl Default for Grammar {
    fn default() -> Self {
        GrammarBuilder::commonmark(ParserOptions::default()).build()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ext::{Deflist, Footnote, FrontMatter, Math};

    #[test]
    fn test_commonmark_chain_order() {
        let builder = GrammarBuilder::commonmark(ParserOptions::default());
        assert_eq!(builder.core.names(), vec!["normalize", "parse", "text_join"]);
        assert!(builder.events.names().is_empty());
        assert_eq!(builder.syntax(), Options::empty());
    }

    #[test]
    fn test_extensions_extend_chains_in_order() {
        let builder = GrammarBuilder::commonmark(ParserOptions::default())
            .with_extension(&FrontMatter)
            .with_extension(&Footnote)
            .with_extension(&Deflist)
            .with_extension(&Math::default());
        assert_eq!(
            builder.core.names(),
            vec![
                "normalize",
                "front_matter",
                "parse",
                "text_join",
                "math_block",
                "footnote_inline",
                "footnote_tail",
            ]
        );
        assert_eq!(builder.events.names(), vec!["footnote", "deflist", "math"]);
        assert!(builder.syntax().contains(Options::ENABLE_FOOTNOTES | Options::ENABLE_MATH));
        assert!(builder.syntax().contains(Options::ENABLE_DEFINITION_LIST));
    }
}
