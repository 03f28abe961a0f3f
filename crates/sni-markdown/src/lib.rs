//! Markdown to HTML with front matter extraction.
//!
//! This crate provides:
//! - [`Tokenizer`]: CommonMark tokens from `pulldown-cmark` events, shaped by an
//!   extensible [`Grammar`]
//! - [`ext`]: front matter, footnotes, definition lists and dollar math
//! - [`Renderer`]: HTML output through a per-instance [`RuleTable`]
//! - [`MarkdownPipeline`]: text in, [`Metadata`] and HTML out
//!
//! # Quick Start
//!
//! ```
//! use sni_markdown::MarkdownPipeline;
//!
//! let doc = MarkdownPipeline::new().process(
//!     "---\ntitle: Energy\n---\nMass and $E = mc^2$.[^1]\n\n[^1]: Einstein, 1905.\n",
//! );
//!
//! assert_eq!(doc.metadata.unwrap().get_str("title"), Some("Energy"));
//! assert!(doc.html.contains("math-inline"));
//! assert!(doc.html.contains("<section class=\"footnotes\">"));
//! ```
//!
//! # Lower-level use
//!
//! ```
//! use sni_markdown::{GrammarBuilder, ParserOptions, Renderer, Tokenizer};
//! use sni_markdown::ext::{FrontMatter, raw_front_matter};
//!
//! let grammar = GrammarBuilder::commonmark(ParserOptions::default())
//!     .with_extension(&FrontMatter)
//!     .build();
//! let tokens = Tokenizer::new(grammar).tokenize("---\nid: 7\n---\ntext\n");
//! assert_eq!(raw_front_matter(&tokens), Some("id: 7"));
//!
//! let output = Renderer::new().render(&tokens);
//! assert_eq!(output.html, "<p>text</p>\n");
//! assert_eq!(output.metadata.unwrap().len(), 1);
//! ```

mod error;
pub mod ext;
pub mod grammar;
mod metadata;
pub mod parser;
mod pipeline;
pub mod render;
pub mod token;

pub use pulldown_cmark;

pub use error::PipelineError;
pub use grammar::{Extension, Grammar, GrammarBuilder, ParserOptions};
pub use metadata::{Metadata, MetadataError};
pub use parser::{Env, Tokenizer};
pub use parser::helpers::escape_html;
pub use pipeline::{ExtensionSet, MarkdownPipeline, PipelineBuilder, PipelineOptions, ProcessedDocument};
pub use render::{RenderContext, RenderFn, RenderOptions, RenderOutput, RenderRule, Renderer, RuleTable};
pub use token::{Nesting, Token, TokenMeta};
