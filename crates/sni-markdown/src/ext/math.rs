//! Dollar math: `$inline$`, `$$display$$` blocks and labelled blocks
//! (`$$ e = mc^2 $$ (eq:energy)`).
//!
//! The parser recognizes the delimiters; math content is captured verbatim
//! and no other rule sees it. A paragraph made only of display math (and
//! optionally a label) becomes a math block.

use std::mem;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

use pulldown_cmark::{CowStr, Event, Options};
use regex::Regex;

use crate::grammar::{Extension, GrammarBuilder};
use crate::parser::core::join_text;
use crate::parser::helpers::escape_html;
use crate::parser::{CoreState, EventState, text_token};
use crate::render::{RenderContext, RenderRule};
use crate::token::{INLINE, Nesting, TEXT, Token};

/// Display math seen inside inline content, resolved by `math_block`.
const MATH_DISPLAY: &str = "math_display";

/// Math syntax switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MathOptions {
    /// Allow whitespace right inside inline delimiters (`$ x $`).
    pub allow_space: bool,
    /// Allow a digit right after the closing `$` (`$x$1`).
    pub allow_digits: bool,
    /// Recognize `$$...$$ (label)` blocks.
    pub allow_labels: bool,
    /// Keep `$$...$$` that shares a paragraph with other text as math.
    pub double_inline: bool,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            allow_space: true,
            allow_digits: true,
            allow_labels: true,
            double_inline: false,
        }
    }
}

/// Enables dollar math, maps math events to tokens and registers the
/// `math_block` core rule after `text_join`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Math {
    options: MathOptions,
}

impl Math {
    #[must_use]
    pub fn new(options: MathOptions) -> Self {
        Self { options }
    }
}

impl Extension for Math {
    fn name(&self) -> &'static str {
        "math"
    }

    fn register(&self, grammar: &mut GrammarBuilder) {
        let options = self.options;
        grammar.enable_syntax(Options::ENABLE_MATH);
        grammar.events.push(
            "math",
            Arc::new(move |state: &mut EventState<'_>, event: &Event<'_>, range: &Range<usize>| {
                match event {
                    Event::InlineMath(content) => math_inline(state, content, range, options),
                    Event::DisplayMath(content) => math_display(state, content, range),
                    _ => return false,
                }
                true
            }),
        );
        grammar.core.insert_after(
            "text_join",
            "math_block",
            Arc::new(move |state: &mut CoreState<'_>| math_block(state, options)),
        );
    }
}

fn math_inline(state: &mut EventState<'_>, content: &CowStr<'_>, range: &Range<usize>, options: MathOptions) {
    let edge_space = content.starts_with(char::is_whitespace) || content.ends_with(char::is_whitespace);
    let digit_after = state.src[range.end..].starts_with(|ch: char| ch.is_ascii_digit());
    if (!options.allow_space && edge_space) || (!options.allow_digits && digit_after) {
        let text = state.source(range);
        state.push_inline(text_token(text));
        return;
    }
    let mut token = Token::new("math_inline", "math", Nesting::SelfClosing);
    token.content = content.to_string();
    token.markup = "$".to_owned();
    state.push_inline(token);
}

fn math_display(state: &mut EventState<'_>, content: &CowStr<'_>, range: &Range<usize>) {
    let depth = state.quote_depth();
    let lead = &state.src[state.line_start(range.start)..range.start];
    let indent = strip_quote_markers(lead, depth).len();

    let mut token = Token::new(MATH_DISPLAY, "math", Nesting::SelfClosing);
    token.content = strip_container_prefixes(content, depth, indent);
    token.markup = "$$".to_owned();
    state.push_inline(token);
}

/// Drop up to `depth` block quote markers from the start of `line`.
fn strip_quote_markers(line: &str, depth: usize) -> &str {
    let mut rest = line;
    for _ in 0..depth {
        let Some(after) = rest.trim_start_matches([' ', '\t']).strip_prefix('>') else {
            break;
        };
        rest = after.strip_prefix(' ').unwrap_or(after);
    }
    rest
}

/// Remove quote markers and list indentation from the continuation lines
/// of multi-line math content.
fn strip_container_prefixes(content: &str, depth: usize, indent: usize) -> String {
    if depth == 0 && indent == 0 {
        return content.to_owned();
    }
    let mut lines = content.split_inclusive('\n');
    let mut out = String::with_capacity(content.len());
    out.extend(lines.next());
    for line in lines {
        let line = strip_quote_markers(line, depth);
        let spaces = line.bytes().take(indent).take_while(|&byte| byte == b' ').count();
        out.push_str(&line[spaces..]);
    }
    out
}

/// `(label)` trailing a display math paragraph.
static EQUATION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(([^)$\r\n]+)\)\s*$").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Block token for an inline sequence made only of display math and an
/// optional label.
fn display_block(children: &[Token], options: MathOptions) -> Option<Token> {
    let (math, label) = match children {
        [math] => (math, None),
        [math, text] if options.allow_labels && text.kind == TEXT => {
            let caps = EQUATION_LABEL.captures(&text.content)?;
            (math, Some(WHITESPACE_RUN.replace_all(caps[1].trim(), "-").into_owned()))
        }
        _ => return None,
    };
    if math.kind != MATH_DISPLAY {
        return None;
    }
    let kind = if label.is_some() { "math_block_label" } else { "math_block" };
    let mut token = Token::new(kind, "math", Nesting::SelfClosing);
    token.content.clone_from(&math.content);
    token.markup = "$$".to_owned();
    token.info = label.unwrap_or_default();
    token.block = true;
    Some(token)
}

/// Turn display-math paragraphs into math blocks and resolve the display
/// math left inside other inline content.
fn math_block(state: &mut CoreState<'_>, options: MathOptions) {
    let mut tokens = mem::take(&mut state.tokens);
    let mut out = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        let is_paragraph = tokens[index].kind == "paragraph_open"
            && tokens.get(index + 2).is_some_and(|token| token.kind == "paragraph_close");
        let block = is_paragraph
            .then(|| tokens[index + 1].children.as_deref())
            .flatten()
            .and_then(|children| display_block(children, options));
        if let Some(mut block) = block {
            block.map = tokens[index].map;
            block.level = tokens[index].level;
            out.push(block);
            index += 3;
            continue;
        }

        let mut token = mem::replace(&mut tokens[index], Token::new(TEXT, "", Nesting::SelfClosing));
        if token.kind == INLINE
            && let Some(children) = token.children.as_mut()
        {
            resolve_inline_display(children, options);
        }
        out.push(token);
        index += 1;
    }
    state.tokens = out;
}

fn resolve_inline_display(children: &mut Vec<Token>, options: MathOptions) {
    let mut changed = false;
    for child in children.iter_mut().filter(|child| child.kind == MATH_DISPLAY) {
        if options.double_inline {
            child.kind = "math_inline_double";
        } else {
            child.kind = TEXT;
            child.tag = "";
            child.content = format!("$${}$$", child.content);
            changed = true;
        }
    }
    if changed {
        join_text(children);
    }
}

/// Trimmed, escaped math content of a token.
pub(crate) fn math_content(token: &Token) -> String {
    escape_html(token.content.trim()).into_owned()
}

fn render_inline(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    format!("<span class=\"math inline\">{}</span>", math_content(&tokens[idx]))
}

fn render_inline_double(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    format!("<div class=\"math inline\">{}</div>", math_content(&tokens[idx]))
}

fn render_block(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    format!("<div class=\"math block\">\n{}\n</div>\n", math_content(&tokens[idx]))
}

fn render_block_label(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    let id = escape_html(&token.info);
    format!(
        "<div id=\"{id}\" class=\"math block\">\n\
         <a href=\"#{id}\" class=\"mathlabel\" title=\"Permalink to this equation\">\u{b6}</a>\n\
         {}\n</div>\n",
        math_content(token)
    )
}

/// Default render rules for math tokens.
pub(crate) fn default_rules() -> Vec<(&'static str, RenderRule)> {
    vec![
        ("math_inline", Arc::new(render_inline) as RenderRule),
        ("math_inline_double", Arc::new(render_inline_double) as RenderRule),
        ("math_block", Arc::new(render_block) as RenderRule),
        ("math_block_label", Arc::new(render_block_label) as RenderRule),
    ]
}
