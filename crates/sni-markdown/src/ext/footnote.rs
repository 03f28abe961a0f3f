//! Footnotes: `[^label]` references, `[^label]: ...` definitions and
//! `^[inline]` notes.
//!
//! Definitions stay in place while the document is converted. The
//! `footnote_tail` core rule then numbers references in document order,
//! moves the referenced definitions into a section appended to the
//! document and drops the others. A reference to an undefined label stays
//! text.

use std::collections::{HashMap, HashSet, VecDeque};
use std::mem;
use std::ops::Range;
use std::sync::Arc;

use pulldown_cmark::{Event, Options, Tag};

use crate::grammar::{Extension, GrammarBuilder};
use crate::parser::core::join_text;
use crate::parser::{CoreState, EventState, text_token};
use crate::render::{RenderContext, RenderRule};
use crate::token::{INLINE, Nesting, TEXT, Token, TokenMeta};

/// Registers footnote references and definitions, inline notes and the
/// footnote section.
#[derive(Clone, Copy, Debug, Default)]
pub struct Footnote;

impl Extension for Footnote {
    fn name(&self) -> &'static str {
        "footnote"
    }

    fn register(&self, grammar: &mut GrammarBuilder) {
        grammar.enable_syntax(Options::ENABLE_FOOTNOTES);
        grammar.events.push("footnote", Arc::new(footnote_event));
        grammar
            .core
            .insert_after("text_join", "footnote_inline", Arc::new(footnote_inline));
        grammar
            .core
            .insert_after("footnote_inline", "footnote_tail", Arc::new(footnote_tail));
    }
}

/// Labels match case-insensitively with whitespace runs collapsed.
fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn footnote_event(state: &mut EventState<'_>, event: &Event<'_>, _range: &Range<usize>) -> bool {
    match event {
        Event::FootnoteReference(label) => {
            let mut token = Token::new("footnote_ref", "", Nesting::SelfClosing);
            token.meta = Some(TokenMeta::Footnote {
                id: 0,
                sub_id: 0,
                label: Some(label.to_string()),
            });
            state.push_inline(token);
            true
        }
        Event::Start(Tag::FootnoteDefinition(label)) => {
            let mut open = Token::new("footnote_reference_open", "", Nesting::Open);
            open.meta = Some(TokenMeta::FootnoteDefinition {
                label: label.to_string(),
            });
            state.open_block(open, Token::new("footnote_reference_close", "", Nesting::Close));
            true
        }
        _ => false,
    }
}

/// Bodies of `^[...]` notes, indexed by the `id` of their reference.
#[derive(Debug, Default)]
struct InlineNotes(Vec<Vec<Token>>);

/// Turn `^[...]` runs in inline content into note references.
fn footnote_inline(state: &mut CoreState<'_>) {
    for token in &mut state.tokens {
        if token.kind != INLINE {
            continue;
        }
        let Some(children) = token.children.as_mut() else {
            continue;
        };
        if !children
            .iter()
            .any(|child| child.kind == TEXT && child.content.contains("^["))
        {
            continue;
        }
        let notes = state.env.get_or_default::<InlineNotes>();
        *children = extract_inline_notes(mem::take(children), &mut notes.0);
    }
}

/// Where the `]` closing a note was found: in the text after `^[` itself
/// (`None`) or in a following token, and at which byte.
struct NoteEnd {
    token: Option<usize>,
    at: usize,
}

/// Depth change of `text` starting from `depth`; the byte of the `]` that
/// brings it to zero, if any.
fn scan_brackets(text: &str, depth: &mut usize) -> Option<usize> {
    for (at, byte) in text.bytes().enumerate() {
        match byte {
            b'[' => *depth += 1,
            b']' => {
                *depth -= 1;
                if *depth == 0 {
                    return Some(at);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the bracket closing a note whose body starts with `after`.
///
/// The body may span following tokens but must not cross the edge of an
/// enclosing span.
fn note_end(after: &str, rest: &VecDeque<Token>) -> Option<NoteEnd> {
    let mut depth = 1;
    if let Some(at) = scan_brackets(after, &mut depth) {
        return Some(NoteEnd { token: None, at });
    }
    let mut spans = 0usize;
    for (index, token) in rest.iter().enumerate() {
        match token.nesting {
            Nesting::Open => spans += 1,
            Nesting::Close => spans = spans.checked_sub(1)?,
            Nesting::SelfClosing => {}
        }
        if token.kind != TEXT {
            continue;
        }
        if let Some(at) = scan_brackets(&token.content, &mut depth) {
            return (spans == 0).then_some(NoteEnd {
                token: Some(index),
                at,
            });
        }
    }
    None
}

fn extract_inline_notes(children: Vec<Token>, notes: &mut Vec<Vec<Token>>) -> Vec<Token> {
    let mut out = Vec::with_capacity(children.len());
    let mut rest: VecDeque<Token> = children.into();

    while let Some(token) = rest.pop_front() {
        let start = if token.kind == TEXT {
            token.content.find("^[")
        } else {
            None
        };
        let Some(start) = start else {
            out.push(token);
            continue;
        };
        let before = &token.content[..start];
        let after = &token.content[start + 2..];

        let mut body = Vec::new();
        let remainder = match note_end(after, &rest) {
            Some(NoteEnd { token: None, at }) => {
                body.push(text_token(&after[..at]));
                after[at + 1..].to_owned()
            }
            Some(NoteEnd {
                token: Some(index),
                at,
            }) => {
                body.push(text_token(after));
                body.extend(rest.drain(..index));
                let Some(last) = rest.pop_front() else {
                    break;
                };
                body.push(text_token(&last.content[..at]));
                last.content[at + 1..].to_owned()
            }
            None => {
                out.push(text_token(&token.content[..start + 2]));
                rest.push_front(text_token(after));
                continue;
            }
        };

        body.retain(|token| token.kind != TEXT || !token.content.is_empty());
        if body.is_empty() {
            out.push(text_token(&token.content[..start + 2]));
            rest.push_front(text_token(format!("]{remainder}")));
            continue;
        }

        out.push(text_token(before));
        let id = notes.len();
        notes.push(Vec::new());
        join_text(&mut body);
        let body = extract_inline_notes(body, notes);
        notes[id] = body;

        let mut reference = Token::new("footnote_ref", "", Nesting::SelfClosing);
        reference.meta = Some(TokenMeta::Footnote {
            id,
            sub_id: 0,
            label: None,
        });
        out.push(reference);
        rest.push_front(text_token(remainder));
    }

    out.retain(|token| token.kind != TEXT || !token.content.is_empty());
    join_text(&mut out);
    out
}

/// One numbered footnote.
#[derive(Debug, Default)]
struct Entry {
    label: Option<String>,
    /// References seen so far.
    count: usize,
    /// Body of an inline note.
    inline: Option<Vec<Token>>,
}

/// Footnote ids in order of first reference.
#[derive(Debug, Default)]
struct Numbering {
    ids: HashMap<String, usize>,
    list: Vec<Entry>,
}

impl Numbering {
    /// Number the references in `children`, turning references to undefined
    /// labels back into text.
    fn number(&mut self, children: &mut Vec<Token>, defined: &HashSet<String>, notes: &mut [Vec<Token>]) {
        let mut undefined = false;
        for child in children.iter_mut().filter(|child| child.kind == "footnote_ref") {
            match child.meta.take() {
                Some(TokenMeta::Footnote {
                    label: Some(label), ..
                }) => {
                    let key = normalize_label(&label);
                    if !defined.contains(&key) {
                        *child = text_token(format!("[^{label}]"));
                        undefined = true;
                        continue;
                    }
                    let id = match self.ids.get(&key) {
                        Some(&id) => id,
                        None => {
                            let id = self.list.len();
                            self.list.push(Entry {
                                label: Some(label.clone()),
                                ..Entry::default()
                            });
                            self.ids.insert(key, id);
                            id
                        }
                    };
                    let entry = &mut self.list[id];
                    let sub_id = entry.count;
                    entry.count += 1;
                    child.meta = Some(TokenMeta::Footnote {
                        id,
                        sub_id,
                        label: Some(label),
                    });
                }
                Some(TokenMeta::Footnote { id: note, label: None, .. }) => {
                    let mut body = notes.get_mut(note).map(mem::take).unwrap_or_default();
                    let id = self.list.len();
                    self.list.push(Entry {
                        count: 1,
                        ..Entry::default()
                    });
                    self.number(&mut body, defined, notes);
                    self.list[id].inline = Some(body);
                    child.meta = Some(TokenMeta::Footnote {
                        id,
                        sub_id: 0,
                        label: None,
                    });
                }
                other => child.meta = other,
            }
        }
        if undefined {
            join_text(children);
        }
    }
}

/// Cut every definition out of `tokens`, including definitions nested in
/// other definitions. The first definition of a label wins.
fn extract_definitions(tokens: &mut Vec<Token>) -> HashMap<String, Vec<Token>> {
    let mut definitions: HashMap<String, (usize, Vec<Token>)> = HashMap::new();
    let mut open: Vec<(String, usize, Vec<Token>)> = Vec::new();
    let mut kept = Vec::with_capacity(tokens.len());
    let mut seen = 0;

    for token in mem::take(tokens) {
        match token.kind {
            "footnote_reference_open" => {
                let label = match &token.meta {
                    Some(TokenMeta::FootnoteDefinition { label }) => normalize_label(label),
                    _ => String::new(),
                };
                open.push((label, seen, Vec::new()));
                seen += 1;
            }
            "footnote_reference_close" => {
                let Some((label, order, body)) = open.pop() else {
                    continue;
                };
                if definitions.get(&label).is_none_or(|(first, _)| order < *first) {
                    definitions.insert(label, (order, body));
                }
            }
            _ => match open.last_mut() {
                Some((_, _, body)) => body.push(token),
                None => kept.push(token),
            },
        }
    }
    *tokens = kept;
    definitions
        .into_iter()
        .map(|(label, (_, body))| (label, body))
        .collect()
}

/// Number references, then move definitions to a footnote section at the
/// end of the document.
fn footnote_tail(state: &mut CoreState<'_>) {
    let defined: HashSet<String> = state
        .tokens
        .iter()
        .filter_map(|token| match &token.meta {
            Some(TokenMeta::FootnoteDefinition { label }) => Some(normalize_label(label)),
            _ => None,
        })
        .collect();
    let mut notes = state.env.take::<InlineNotes>().unwrap_or_default().0;

    let mut numbering = Numbering::default();
    for token in &mut state.tokens {
        if token.kind == INLINE
            && let Some(children) = token.children.as_mut()
        {
            numbering.number(children, &defined, &mut notes);
        }
    }
    let mut definitions = extract_definitions(&mut state.tokens);

    if numbering.list.is_empty() {
        return;
    }
    tracing::debug!(footnotes = numbering.list.len(), "Appending footnote section");

    let tokens = &mut state.tokens;
    tokens.push(Token::new("footnote_block_open", "", Nesting::Open));
    for (id, entry) in numbering.list.into_iter().enumerate() {
        let meta = |sub_id| {
            Some(TokenMeta::Footnote {
                id,
                sub_id,
                label: entry.label.clone(),
            })
        };

        let mut open = Token::new("footnote_open", "", Nesting::Open);
        open.meta = meta(0);
        open.level = 1;
        tokens.push(open);

        let body = match &entry.inline {
            Some(children) => inline_paragraph(children),
            None => entry
                .label
                .as_deref()
                .and_then(|label| definitions.remove(&normalize_label(label)))
                .unwrap_or_default(),
        };
        tokens.extend(body);

        let last_paragraph = if tokens.last().is_some_and(|token| token.kind == "paragraph_close") {
            tokens.pop()
        } else {
            None
        };
        for sub_id in 0..entry.count.max(1) {
            let mut anchor = Token::new("footnote_anchor", "", Nesting::SelfClosing);
            anchor.meta = meta(sub_id);
            tokens.push(anchor);
        }
        tokens.extend(last_paragraph);

        let mut close = Token::new("footnote_close", "", Nesting::Close);
        close.level = 1;
        tokens.push(close);
    }
    tokens.push(Token::new("footnote_block_close", "", Nesting::Close));
}

/// Paragraph tokens wrapping the body of an inline note.
fn inline_paragraph(children: &[Token]) -> Vec<Token> {
    let mut open = Token::new("paragraph_open", "p", Nesting::Open);
    open.block = true;
    open.level = 2;

    let mut inline = Token::new(INLINE, "", Nesting::SelfClosing);
    inline.content = children.iter().map(|child| child.content.as_str()).collect();
    inline.children = Some(children.to_vec());
    inline.level = 3;

    let mut close = Token::new("paragraph_close", "p", Nesting::Close);
    close.block = true;
    close.level = 2;

    vec![open, inline, close]
}

/// `1`, `2`, ... from the zero-based id.
fn anchor_name(token: &Token) -> String {
    let (id, _) = token.footnote_meta().unwrap_or_default();
    (id + 1).to_string()
}

/// Anchor name with the `:n` suffix for repeated references.
fn ref_id(token: &Token) -> String {
    let (_, sub_id) = token.footnote_meta().unwrap_or_default();
    let name = anchor_name(token);
    if sub_id > 0 {
        format!("{name}:{sub_id}")
    } else {
        name
    }
}

fn render_ref(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    format!(
        "<sup class=\"footnote-ref\"><a href=\"#fn{}\" id=\"fnref{}\">[{}]</a></sup>",
        anchor_name(token),
        ref_id(token),
        ref_id(token),
    )
}

fn render_block_open(_tokens: &[Token], _idx: usize, ctx: &RenderContext<'_>) -> String {
    let separator = if ctx.options.xhtml_out {
        "<hr class=\"footnotes-sep\" />\n"
    } else {
        "<hr class=\"footnotes-sep\">\n"
    };
    format!("{separator}<section class=\"footnotes\">\n<ol class=\"footnotes-list\">\n")
}

fn render_block_close(_tokens: &[Token], _idx: usize, _ctx: &RenderContext<'_>) -> String {
    "</ol>\n</section>\n".to_owned()
}

fn render_open(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    format!("<li id=\"fn{}\" class=\"footnote-item\">", ref_id(&tokens[idx]))
}

fn render_close(_tokens: &[Token], _idx: usize, _ctx: &RenderContext<'_>) -> String {
    "</li>\n".to_owned()
}

fn render_anchor(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    // U+FE0E keeps the arrow from being shown as an emoji.
    format!(
        " <a href=\"#fnref{}\" class=\"footnote-backref\">\u{21a9}\u{fe0e}</a>",
        ref_id(&tokens[idx])
    )
}

/// Default render rules for footnote tokens.
pub(crate) fn default_rules() -> Vec<(&'static str, RenderRule)> {
    vec![
        ("footnote_ref", Arc::new(render_ref) as RenderRule),
        ("footnote_block_open", Arc::new(render_block_open) as RenderRule),
        ("footnote_block_close", Arc::new(render_block_close) as RenderRule),
        ("footnote_open", Arc::new(render_open) as RenderRule),
        ("footnote_close", Arc::new(render_close) as RenderRule),
        ("footnote_anchor", Arc::new(render_anchor) as RenderRule),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::grammar::ParserOptions;
    use crate::parser::Tokenizer;
    use crate::render::Renderer;
    use crate::token::is_well_bracketed;

    fn tokenize(src: &str) -> Vec<Token> {
        Tokenizer::new(
            GrammarBuilder::commonmark(ParserOptions::default())
                .with_extension(&Footnote)
                .build(),
        )
        .tokenize(src)
    }

    fn render(src: &str) -> String {
        Renderer::new().render(&tokenize(src)).html
    }

    fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens.iter().map(|token| token.kind).collect()
    }

    fn definition(label: &str) -> Token {
        let mut open = Token::new("footnote_reference_open", "", Nesting::Open);
        open.meta = Some(TokenMeta::FootnoteDefinition {
            label: label.to_owned(),
        });
        open
    }

    fn block(kind: &'static str, nesting: Nesting) -> Token {
        Token::new(kind, "", nesting)
    }

    #[test]
    fn test_reference_and_definition() {
        let html = render("Text[^1].\n\n[^1]: note text\n");
        assert_eq!(
            html,
            "<p>Text<sup class=\"footnote-ref\"><a href=\"#fn1\" id=\"fnref1\">[1]</a></sup>.</p>\n\
             <hr class=\"footnotes-sep\" />\n\
             <section class=\"footnotes\">\n\
             <ol class=\"footnotes-list\">\n\
             <li id=\"fn1\" class=\"footnote-item\"><p>note text \
             <a href=\"#fnref1\" class=\"footnote-backref\">\u{21a9}\u{fe0e}</a></p>\n\
             </li>\n\
             </ol>\n\
             </section>\n"
        );
    }

    #[test]
    fn test_numbering_follows_first_reference() {
        let src = "[^b] then [^a] then [^b]\n\n[^a]: A\n\n[^b]: B\n";
        let tokens = tokenize(src);
        let children = tokens[1].children.as_ref().unwrap();
        let refs: Vec<(usize, usize)> = children
            .iter()
            .filter_map(Token::footnote_meta)
            .collect();
        assert_eq!(refs, vec![(0, 0), (1, 0), (0, 1)]);

        let html = render(src);
        assert!(html.contains("id=\"fnref1:1\">[1:1]</a>"));
        assert!(html.contains("<li id=\"fn1\" class=\"footnote-item\"><p>B"));
        assert!(html.contains("href=\"#fnref1:1\" class=\"footnote-backref\""));
    }

    #[test]
    fn test_unreferenced_definition_is_dropped() {
        let tokens = tokenize("Text\n\n[^unused]: gone\n");
        assert_eq!(kinds(&tokens), vec!["paragraph_open", "inline", "paragraph_close"]);
    }

    #[test]
    fn test_undefined_reference_is_text() {
        let tokens = tokenize("see [^missing]\n");
        let children = tokens[1].children.as_ref().unwrap();
        assert_eq!(kinds(children), vec!["text"]);
        assert_eq!(children[0].content, "see [^missing]");
    }

    #[test]
    fn test_first_definition_wins() {
        let html = render("x[^a]\n\n[^a]: first\n\n[^a]: second\n");
        assert!(html.contains("<p>first"));
        assert!(!html.contains("second"));
    }

    #[test]
    fn test_inline_note() {
        let tokens = tokenize("Body^[an *inline* note].\n");
        assert!(is_well_bracketed(&tokens));
        let children = tokens[1].children.as_ref().unwrap();
        assert_eq!(kinds(children), vec!["text", "footnote_ref", "text"]);
        assert_eq!(children[2].content, ".");
        let html = Renderer::new().render(&tokens).html;
        assert!(html.contains("<a href=\"#fn1\" id=\"fnref1\">[1]</a>"));
        assert!(html.contains("<p>an <em>inline</em> note <a href=\"#fnref1\""));
    }

    #[test]
    fn test_inline_note_brackets_balance() {
        let tokens = tokenize("A^[see [x] here] and ^[ unclosed\n");
        let children = tokens[1].children.as_ref().unwrap();
        assert_eq!(kinds(children), vec!["text", "footnote_ref", "text"]);
        assert_eq!(children[2].content, " and ^[ unclosed");
        let html = Renderer::new().render(&tokens).html;
        assert!(html.contains("<p>see [x] here <a"));
    }

    #[test]
    fn test_inline_and_labelled_share_numbering() {
        let tokens = tokenize("^[first] then [^n]\n\n[^n]: second\n");
        let children = tokens[1].children.as_ref().unwrap();
        let ids: Vec<usize> = children
            .iter()
            .filter_map(Token::footnote_meta)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_multi_paragraph_definition() {
        let tokens = tokenize("x[^n]\n\n[^n]: first\n\n    second\n");
        assert!(is_well_bracketed(&tokens));
        let section = tokens
            .iter()
            .skip_while(|token| token.kind != "footnote_open")
            .map(|token| token.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            section,
            vec![
                "footnote_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "paragraph_open",
                "inline",
                "footnote_anchor",
                "paragraph_close",
                "footnote_close",
                "footnote_block_close",
            ]
        );
    }

    #[test]
    fn test_nested_definitions_are_cut_separately() {
        let mut tokens = vec![
            definition("a"),
            block("bullet_list_open", Nesting::Open),
            block("list_item_open", Nesting::Open),
            definition("b"),
            block("paragraph_open", Nesting::Open),
            block("inline", Nesting::SelfClosing),
            block("paragraph_close", Nesting::Close),
            block("footnote_reference_close", Nesting::Close),
            block("list_item_close", Nesting::Close),
            block("bullet_list_close", Nesting::Close),
            block("footnote_reference_close", Nesting::Close),
        ];
        let definitions = extract_definitions(&mut tokens);
        assert!(tokens.is_empty());
        assert_eq!(
            kinds(&definitions["a"]),
            vec!["bullet_list_open", "list_item_open", "list_item_close", "bullet_list_close"]
        );
        assert_eq!(
            kinds(&definitions["b"]),
            vec!["paragraph_open", "inline", "paragraph_close"]
        );
        assert!(definitions.values().all(|body| is_well_bracketed(body)));
    }

    #[test]
    fn test_nested_same_label_keeps_outer() {
        let mut tokens = vec![
            definition("1"),
            block("blockquote_open", Nesting::Open),
            definition("1"),
            block("footnote_reference_close", Nesting::Close),
            block("blockquote_close", Nesting::Close),
            block("footnote_reference_close", Nesting::Close),
        ];
        let definitions = extract_definitions(&mut tokens);
        assert_eq!(definitions.len(), 1);
        assert_eq!(kinds(&definitions["1"]), vec!["blockquote_open", "blockquote_close"]);
    }

    #[test]
    fn test_nested_definitions_render_well_bracketed() {
        for src in [
            "[^1]: >[^1]: ",
            "Ref[^a] [^b]\n\n[^a]: - [^b]: inner\n",
            "Ref[^a]\n\n[^a]: > quoted [^a]\n",
        ] {
            let tokens = tokenize(src);
            assert!(is_well_bracketed(&tokens), "{src:?}");
            assert!(
                tokens.iter().all(|token| !token.kind.starts_with("footnote_reference")),
                "{src:?}"
            );
        }
    }
}
