//! Leading `---` delimited metadata block.
//!
//! The block is captured verbatim as a hidden `front_matter` token; parsing
//! it into [`Metadata`](crate::Metadata) is left to the renderer.

use std::sync::Arc;

use crate::grammar::{Extension, GrammarBuilder};
use crate::parser::CoreState;
use crate::render::{RenderContext, RenderRule};
use crate::token::{Nesting, Token};

/// Token kind emitted for the metadata block.
pub const FRONT_MATTER: &str = "front_matter";

const MIN_MARKERS: usize = 3;

/// Registers the `front_matter` core rule, which cuts the block from the
/// source before it is parsed.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrontMatter;

impl Extension for FrontMatter {
    fn name(&self) -> &'static str {
        "front_matter"
    }

    fn register(&self, grammar: &mut GrammarBuilder) {
        grammar
            .core
            .insert_after("normalize", "front_matter", Arc::new(front_matter));
    }
}

/// Length of a line made only of `-` (at least `min` of them), optionally
/// followed by whitespace.
fn marker_len(line: &str, min: usize) -> Option<usize> {
    let count = line.bytes().take_while(|&byte| byte == b'-').count();
    if count < min || !line[count..].trim().is_empty() {
        return None;
    }
    Some(count)
}

fn front_matter(state: &mut CoreState<'_>) {
    let mut lines = state.src.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return;
    };
    let Some(markers) = marker_len(first, MIN_MARKERS) else {
        return;
    };

    let content_start = first.len();
    let mut pos = content_start;
    let mut close = None;
    for (index, line) in lines.enumerate() {
        if marker_len(line, markers).is_some() {
            close = Some((index + 1, pos, pos + line.len()));
            break;
        }
        pos += line.len();
    }
    // Unclosed: the opening line stays a thematic break.
    let Some((close_line, content_end, block_end)) = close else {
        return;
    };

    let content = state.src[content_start..content_end]
        .strip_suffix('\n')
        .unwrap_or(&state.src[content_start..content_end]);
    let mut token = Token::new(FRONT_MATTER, "", Nesting::SelfClosing);
    token.content = content.to_owned();
    token.markup = "-".repeat(markers);
    token.hidden = true;
    token.block = true;
    token.map = Some((0, close_line + 1));
    state.tokens.push(token);

    state.src.drain(..block_end);
    state.line_offset += close_line + 1;
    tracing::debug!(lines = close_line - 1, "Captured front matter block");
}

/// Raw text of the metadata block, if `tokens` start with one.
///
/// For callers that tokenize without rendering.
pub fn raw_front_matter(tokens: &[Token]) -> Option<&str> {
    tokens
        .first()
        .filter(|token| token.kind == FRONT_MATTER)
        .map(|token| token.content.as_str())
}

fn render_front_matter(_tokens: &[Token], _idx: usize, _ctx: &RenderContext<'_>) -> String {
    String::new()
}

/// The metadata block renders to nothing.
pub(crate) fn default_rules() -> Vec<(&'static str, RenderRule)> {
    vec![(FRONT_MATTER, Arc::new(render_front_matter) as RenderRule)]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::grammar::ParserOptions;
    use crate::parser::Tokenizer;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(
            GrammarBuilder::commonmark(ParserOptions::default())
                .with_extension(&FrontMatter)
                .build(),
        )
    }

    #[test]
    fn test_captures_block() {
        let tokens = tokenizer().tokenize("---\ntitle: Hello\ntags: [a, b]\n---\n# Hi\n");
        assert_eq!(tokens[0].kind, "front_matter");
        assert_eq!(tokens[0].content, "title: Hello\ntags: [a, b]");
        assert_eq!(tokens[0].markup, "---");
        assert_eq!(tokens[0].map, Some((0, 4)));
        assert!(tokens[0].hidden);
        assert_eq!(tokens[1].kind, "heading_open");
        assert_eq!(raw_front_matter(&tokens), Some("title: Hello\ntags: [a, b]"));
    }

    #[test]
    fn test_empty_block() {
        let tokens = tokenizer().tokenize("---\n---\ntext\n");
        assert_eq!(tokens[0].kind, "front_matter");
        assert_eq!(tokens[0].content, "");
        assert_eq!(tokens[1].kind, "paragraph_open");
    }

    #[test]
    fn test_unclosed_block_is_thematic_break() {
        let tokens = tokenizer().tokenize("---\ntitle: Hello\n");
        assert_eq!(tokens[0].kind, "hr");
        assert_eq!(raw_front_matter(&tokens), None);
    }

    #[test]
    fn test_closing_line_needs_as_many_markers() {
        let tokens = tokenizer().tokenize("-----\na: 1\n---\nb: 2\n-----  \nbody\n");
        assert_eq!(tokens[0].content, "a: 1\n---\nb: 2");
        assert_eq!(tokens[1].kind, "paragraph_open");
    }

    #[test]
    fn test_only_at_document_start() {
        let tokens = tokenizer().tokenize("text\n\n---\na: 1\n---\n");
        assert!(tokens.iter().all(|token| token.kind != "front_matter"));
    }

    #[test]
    fn test_indented_opening_is_not_front_matter() {
        let tokens = tokenizer().tokenize(" ---\na: 1\n---\n");
        assert!(tokens.iter().all(|token| token.kind != "front_matter"));
    }
}
