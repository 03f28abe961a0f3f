//! Core chain: the per-document passes around the event conversion.

use std::sync::Arc;

use pulldown_cmark::Parser;

use super::{CoreState, EventState};
use crate::grammar::GrammarBuilder;
use crate::token::{INLINE, TEXT, Token};

/// Unify line endings and replace NUL characters.
fn normalize(state: &mut CoreState<'_>) {
    if !state.src.contains(['\r', '\0']) {
        return;
    }
    state.src = state
        .src
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "\u{FFFD}");
}

/// Run `pulldown-cmark` over the source and convert its events.
fn parse(state: &mut CoreState<'_>) {
    let grammar = state.grammar;
    let mut events = EventState::new(&state.src, &mut *state.env, grammar.options, state.line_offset);
    for (event, range) in Parser::new_ext(&state.src, grammar.syntax).into_offset_iter() {
        events.feed(grammar.events.rules(), &event, &range);
    }
    let tokens = events.finish();
    state.tokens.extend(tokens);
}

/// Merge adjacent text runs, which the parser splits at escapes and
/// entities.
fn text_join(state: &mut CoreState<'_>) {
    for token in &mut state.tokens {
        if token.kind != INLINE {
            continue;
        }
        if let Some(children) = token.children.as_mut() {
            join_text(children);
        }
    }
}

pub(crate) fn join_text(children: &mut Vec<Token>) {
    let mut joined: Vec<Token> = Vec::with_capacity(children.len());
    for child in children.drain(..) {
        match joined.last_mut() {
            Some(last) if last.kind == TEXT && child.kind == TEXT => {
                last.content.push_str(&child.content);
            }
            _ => joined.push(child),
        }
    }
    *children = joined;
}

pub(crate) fn register(grammar: &mut GrammarBuilder) {
    let core = &mut grammar.core;
    core.push("normalize", Arc::new(normalize));
    core.push("parse", Arc::new(parse));
    core.push("text_join", Arc::new(text_join));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::parser::Tokenizer;

    #[test]
    fn test_line_endings_are_normalized() {
        let tokenizer = Tokenizer::default();
        assert_eq!(tokenizer.tokenize("a\r\nb\rc\n"), tokenizer.tokenize("a\nb\nc\n"));
    }

    #[test]
    fn test_nul_is_replaced() {
        let tokens = Tokenizer::default().tokenize("a\0b");
        let children = tokens[1].children.as_ref().unwrap();
        assert_eq!(children[0].content, "a\u{FFFD}b");
    }

    #[test]
    fn test_text_join_merges_escapes() {
        let tokens = Tokenizer::default().tokenize("a \\* b &amp; c\n");
        let children = tokens[1].children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind, "text");
        assert_eq!(children[0].content, "a * b & c");
    }
}
