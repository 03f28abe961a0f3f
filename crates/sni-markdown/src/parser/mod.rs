//! Markdown tokenizer.
//!
//! [`Tokenizer`] runs the core chain of a [`Grammar`] over a document:
//! normalize the source, convert the `pulldown-cmark` events into tokens
//! (offering each event to the grammar's event rules first), then merge
//! text runs. Extensions hook into either chain by rule name.

pub(crate) mod core;
mod env;
mod events;
pub(crate) mod helpers;

use std::sync::Arc;

pub use env::Env;
pub use events::{EventState, text_token};

use crate::grammar::Grammar;
use crate::token::Token;

/// State shared by the core chain for one document.
pub struct CoreState<'a> {
    /// Source text, normalized by the first core rule.
    pub src: String,
    pub tokens: Vec<Token>,
    pub env: &'a mut Env,
    pub grammar: &'a Grammar,
    /// Lines cut from the front of `src`, added to token maps.
    pub line_offset: usize,
}

/// Turns markdown text into a token stream.
///
/// A tokenizer is immutable once built and can be shared between threads;
/// every call gets a fresh [`Env`].
#[derive(Clone)]
pub struct Tokenizer {
    grammar: Arc<Grammar>,
}

impl Tokenizer {
    /// Create a tokenizer for `grammar`.
    #[must_use]
    pub fn new(grammar: Grammar) -> Self {
        Self::from_arc(Arc::new(grammar))
    }

    /// Create a tokenizer sharing an already built grammar.
    #[must_use]
    pub fn from_arc(grammar: Arc<Grammar>) -> Self {
        Self { grammar }
    }

    /// Grammar this tokenizer runs.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Tokenize `src`.
    ///
    /// Never fails: text no rule recognizes becomes plain text.
    pub fn tokenize(&self, src: &str) -> Vec<Token> {
        let mut env = Env::new();
        self.tokenize_with_env(src, &mut env)
    }

    /// Tokenize `src` with a caller-provided environment, for callers that
    /// need extension state afterwards.
    pub fn tokenize_with_env(&self, src: &str, env: &mut Env) -> Vec<Token> {
        let mut state = CoreState {
            src: src.to_owned(),
            tokens: Vec::new(),
            env,
            grammar: &self.grammar,
            line_offset: 0,
        };
        for rule in self.grammar.core.rules() {
            rule(&mut state);
        }
        tracing::trace!(tokens = state.tokens.len(), "Tokenized document");
        state.tokens
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Grammar::default())
    }
}
