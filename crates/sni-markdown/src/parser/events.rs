//! `pulldown-cmark` events to tokens.
//!
//! [`EventState`] receives the parser events of one document in order. Each
//! event except `End` is offered to the event rules of the grammar first; if
//! none claims it, the base conversion turns it into tokens. An `End` event
//! always closes the innermost open frame, so a rule that claims a `Start`
//! event must open exactly one frame (or call [`EventState::skip_element`]).
//!
//! Inline content that arrives outside a paragraph (tight list items,
//! definitions) is wrapped in a hidden paragraph.

use std::mem;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag};

use super::Env;
use super::helpers::{normalize_link, validate_link};
use crate::grammar::{EventRule, ParserOptions};
use crate::token::{INLINE, Nesting, TEXT, Token};

enum Frame {
    /// Container block, `None` when its brackets are suppressed.
    Block { close: Option<Token>, quote: bool },
    /// Block holding inline content.
    Inline { inline: Token, close: Token },
    /// Raw content appended to `tokens[index]`.
    Capture(usize),
    /// Inline span closed by the token.
    Span(Token),
    /// Image collecting its alt text children.
    Image(Token),
    /// Element without a token of its own.
    Transparent,
}

/// Hidden paragraph opened for bare inline content.
struct Implicit {
    open: usize,
    start: usize,
    end: usize,
}

/// Conversion state for one document.
pub struct EventState<'a> {
    /// Source text the events refer to.
    pub src: &'a str,
    pub env: &'a mut Env,
    pub options: ParserOptions,
    tokens: Vec<Token>,
    frames: Vec<Frame>,
    buffers: Vec<Vec<Token>>,
    implicit: Option<Implicit>,
    current: Range<usize>,
    skip: usize,
    level: usize,
    line_starts: Vec<usize>,
    line_offset: usize,
}

impl<'a> EventState<'a> {
    pub(crate) fn new(src: &'a str, env: &'a mut Env, options: ParserOptions, line_offset: usize) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        Self {
            src,
            env,
            options,
            tokens: Vec::new(),
            frames: Vec::new(),
            buffers: Vec::new(),
            implicit: None,
            current: 0..0,
            skip: 0,
            level: 0,
            line_starts,
            line_offset,
        }
    }

    /// Offer one event to `rules`, then to the base conversion.
    pub(crate) fn feed(&mut self, rules: &[EventRule], event: &Event<'_>, range: &Range<usize>) {
        if self.skip > 0 {
            match event {
                Event::Start(_) => self.skip += 1,
                Event::End(_) => self.skip -= 1,
                _ => {}
            }
            return;
        }

        self.current = range.clone();
        if matches!(event, Event::End(_)) {
            self.close();
        } else if !rules.iter().any(|rule| rule(self, event, range)) {
            self.convert(event, range);
        }
        if let Some(implicit) = self.implicit.as_mut() {
            implicit.end = implicit.end.max(range.end);
        }
    }

    /// Close whatever is still open and return the tokens.
    pub(crate) fn finish(mut self) -> Vec<Token> {
        while !self.frames.is_empty() {
            self.close();
        }
        self.close_implicit();
        self.tokens
    }

    /// Source text of `range`.
    pub fn source(&self, range: &Range<usize>) -> &'a str {
        self.src.get(range.clone()).unwrap_or_default()
    }

    /// Start of the line holding byte `pos`.
    pub fn line_start(&self, pos: usize) -> usize {
        self.line_starts[self.line_of(pos)]
    }

    /// Document line range `[start, end)` covered by `range`.
    pub fn map(&self, range: &Range<usize>) -> (usize, usize) {
        let first = self.line_of(range.start);
        let last = self.line_of(range.end.saturating_sub(1).max(range.start));
        (first + self.line_offset, last + 1 + self.line_offset)
    }

    /// Number of enclosing block quotes.
    pub fn quote_depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|frame| matches!(frame, Frame::Block { quote: true, .. }))
            .count()
    }

    /// Push a standalone block token.
    pub fn push_block(&mut self, mut token: Token) {
        self.close_implicit();
        token.block = true;
        token.level = self.level;
        if token.map.is_none() {
            token.map = Some(self.map(&self.current));
        }
        self.tokens.push(token);
    }

    /// Push an inline token, opening a hidden paragraph if needed.
    pub fn push_inline(&mut self, token: Token) {
        self.ensure_inline();
        if let Some(buffer) = self.buffers.last_mut() {
            buffer.push(token);
        }
    }

    /// Open a container block closed by the matching `End` event.
    pub fn open_block(&mut self, open: Token, close: Token) {
        self.open_container(open, close, false);
    }

    /// Open a block whose content is inline, collected into an `inline`
    /// token.
    pub fn open_inline_block(&mut self, mut open: Token, mut close: Token) {
        self.close_implicit();
        let map = self.map(&self.current);
        open.block = true;
        open.level = self.level;
        open.map = Some(map);
        close.block = true;

        let mut inline = Token::new(INLINE, "", Nesting::SelfClosing);
        inline.content = self.source(&self.current).trim().to_owned();
        inline.level = self.level + 1;
        inline.map = Some(map);

        self.tokens.push(open);
        self.level += 1;
        self.frames.push(Frame::Inline { inline, close });
        self.buffers.push(Vec::new());
    }

    /// Open an inline span closed by the matching `End` event.
    pub fn open_span(&mut self, open: Token, close: Token) {
        self.push_inline(open);
        self.frames.push(Frame::Span(close));
    }

    /// Drop every event up to and including the `End` of the element just
    /// started.
    pub fn skip_element(&mut self) {
        self.skip = 1;
    }

    fn line_of(&self, pos: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= pos)
            .saturating_sub(1)
    }

    fn open_container(&mut self, mut open: Token, mut close: Token, quote: bool) {
        self.close_implicit();
        if self.level >= self.options.max_nesting {
            tracing::trace!(kind = open.kind, "Nesting limit reached, dropping brackets");
            self.frames.push(Frame::Block { close: None, quote });
            return;
        }
        open.block = true;
        open.level = self.level;
        if open.map.is_none() {
            open.map = Some(self.map(&self.current));
        }
        close.block = true;
        self.tokens.push(open);
        self.level += 1;
        self.frames.push(Frame::Block {
            close: Some(close),
            quote,
        });
    }

    fn open_capture(&mut self, token: Token) {
        self.push_block(token);
        self.frames.push(Frame::Capture(self.tokens.len() - 1));
    }

    fn ensure_inline(&mut self) {
        if !self.buffers.is_empty() {
            return;
        }
        let mut open = Token::new("paragraph_open", "p", Nesting::Open);
        open.block = true;
        open.hidden = true;
        open.level = self.level;
        self.tokens.push(open);
        self.level += 1;
        self.implicit = Some(Implicit {
            open: self.tokens.len() - 1,
            start: self.current.start,
            end: self.current.end,
        });
        self.buffers.push(Vec::new());
    }

    fn close_implicit(&mut self) {
        let Some(implicit) = self.implicit.take() else {
            return;
        };
        let range = implicit.start..implicit.end;
        let map = self.map(&range);
        self.tokens[implicit.open].map = Some(map);

        let mut inline = Token::new(INLINE, "", Nesting::SelfClosing);
        inline.content = self.source(&range).trim().to_owned();
        inline.children = Some(self.buffers.pop().unwrap_or_default());
        inline.level = self.level;
        inline.map = Some(map);
        self.tokens.push(inline);

        self.level -= 1;
        let mut close = Token::new("paragraph_close", "p", Nesting::Close);
        close.block = true;
        close.hidden = true;
        close.level = self.level;
        self.tokens.push(close);
    }

    fn close(&mut self) {
        match self.frames.pop() {
            Some(Frame::Block { close, .. }) => {
                self.close_implicit();
                if let Some(mut close) = close {
                    self.level -= 1;
                    close.level = self.level;
                    self.tokens.push(close);
                }
            }
            Some(Frame::Inline { mut inline, mut close }) => {
                inline.children = Some(self.buffers.pop().unwrap_or_default());
                self.tokens.push(inline);
                self.level -= 1;
                close.level = self.level;
                self.tokens.push(close);
            }
            Some(Frame::Capture(index)) => {
                if self.tokens[index].kind == "html_block" && !self.options.html {
                    self.html_block_as_text(index);
                }
            }
            Some(Frame::Span(close)) => self.push_inline(close),
            Some(Frame::Image(mut image)) => {
                image.children = Some(self.buffers.pop().unwrap_or_default());
                self.push_inline(image);
            }
            Some(Frame::Transparent) | None => {}
        }
    }

    /// Turn a captured HTML block into a paragraph of text.
    fn html_block_as_text(&mut self, index: usize) {
        let block = mem::replace(
            &mut self.tokens[index],
            Token::new("paragraph_open", "p", Nesting::Open),
        );
        let content = block.content.trim_end().to_owned();

        let open = &mut self.tokens[index];
        open.block = true;
        open.level = block.level;
        open.map = block.map;

        let mut inline = Token::new(INLINE, "", Nesting::SelfClosing);
        inline.children = Some(vec![text_token(content.clone())]);
        inline.content = content;
        inline.level = block.level + 1;
        inline.map = block.map;
        self.tokens.push(inline);

        let mut close = Token::new("paragraph_close", "p", Nesting::Close);
        close.block = true;
        close.level = block.level;
        self.tokens.push(close);
    }

    fn convert(&mut self, event: &Event<'_>, range: &Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(_) => self.close(),
            Event::Text(text) => self.text(text),
            Event::Code(code) => {
                let mut token = Token::new("code_inline", "code", Nesting::SelfClosing);
                token.content = code.to_string();
                token.markup = self.source(range).chars().take_while(|&ch| ch == '`').collect();
                self.push_inline(token);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.html(html),
            Event::InlineMath(math) => self.push_inline(text_token(format!("${math}$"))),
            Event::DisplayMath(math) => self.push_inline(text_token(format!("$${math}$$"))),
            Event::FootnoteReference(label) => self.push_inline(text_token(format!("[^{label}]"))),
            Event::SoftBreak => self.push_inline(Token::new("softbreak", "br", Nesting::SelfClosing)),
            Event::HardBreak => self.push_inline(Token::new("hardbreak", "br", Nesting::SelfClosing)),
            Event::Rule => {
                let mut token = Token::new("hr", "hr", Nesting::SelfClosing);
                token.markup = self.source(range).trim().to_owned();
                self.push_block(token);
            }
            Event::TaskListMarker(_) => {}
        }
    }

    fn text(&mut self, text: &CowStr<'_>) {
        if let Some(Frame::Capture(index)) = self.frames.last() {
            let index = *index;
            self.tokens[index].content.push_str(text);
            return;
        }
        self.push_inline(text_token(text.to_string()));
    }

    fn html(&mut self, html: &CowStr<'_>) {
        if let Some(Frame::Capture(index)) = self.frames.last() {
            let index = *index;
            self.tokens[index].content.push_str(html);
            return;
        }
        if self.options.html {
            let mut token = Token::new("html_inline", "", Nesting::SelfClosing);
            token.content = html.to_string();
            self.push_inline(token);
        } else {
            self.push_inline(text_token(html.to_string()));
        }
    }

    fn start(&mut self, tag: &Tag<'_>, range: &Range<usize>) {
        match tag {
            Tag::Paragraph => self.open_inline_block(
                Token::new("paragraph_open", "p", Nesting::Open),
                Token::new("paragraph_close", "p", Nesting::Close),
            ),
            Tag::Heading { level, .. } => {
                let level = heading_level_to_num(*level);
                let tag = HEADING_TAGS[level - 1];
                let markup = heading_markup(self.source(range), level);
                let mut open = Token::new("heading_open", tag, Nesting::Open);
                let mut close = Token::new("heading_close", tag, Nesting::Close);
                open.markup.clone_from(&markup);
                close.markup = markup;
                self.open_inline_block(open, close);
            }
            Tag::BlockQuote(_) => {
                let mut open = Token::new("blockquote_open", "blockquote", Nesting::Open);
                let mut close = Token::new("blockquote_close", "blockquote", Nesting::Close);
                open.markup = ">".to_owned();
                close.markup = ">".to_owned();
                self.open_container(open, close, true);
            }
            Tag::CodeBlock(kind) => {
                let token = match kind {
                    CodeBlockKind::Indented => Token::new("code_block", "code", Nesting::SelfClosing),
                    CodeBlockKind::Fenced(info) => {
                        let mut token = Token::new("fence", "code", Nesting::SelfClosing);
                        token.info = info.to_string();
                        token.markup = fence_markup(self.source(range));
                        token
                    }
                };
                self.open_capture(token);
            }
            Tag::HtmlBlock => self.open_capture(Token::new("html_block", "", Nesting::SelfClosing)),
            Tag::List(None) => {
                let marker = self.source(range).trim_start().chars().next().unwrap_or('-');
                let mut open = Token::new("bullet_list_open", "ul", Nesting::Open);
                let mut close = Token::new("bullet_list_close", "ul", Nesting::Close);
                open.markup = marker.to_string();
                close.markup = marker.to_string();
                self.open_block(open, close);
            }
            Tag::List(Some(start)) => {
                let mut open = Token::new("ordered_list_open", "ol", Nesting::Open);
                if *start != 1 {
                    open.attr_set("start", start.to_string());
                }
                self.open_block(open, Token::new("ordered_list_close", "ol", Nesting::Close));
            }
            Tag::Item => self.open_block(
                Token::new("list_item_open", "li", Nesting::Open),
                Token::new("list_item_close", "li", Nesting::Close),
            ),
            Tag::Emphasis => self.open_marked_span("em", 1, range),
            Tag::Strong => self.open_marked_span("strong", 2, range),
            Tag::Strikethrough => self.open_marked_span("s", 2, range),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = match link_type {
                    LinkType::Email => normalize_link(&format!("mailto:{dest_url}")),
                    _ => normalize_link(dest_url),
                };
                if !validate_link(&href) {
                    let text = self.source(range);
                    self.push_inline(text_token(text));
                    self.skip_element();
                    return;
                }
                let mut open = Token::new("link_open", "a", Nesting::Open);
                open.attr_set("href", href);
                if !title.is_empty() {
                    open.attr_set("title", title.to_string());
                }
                if matches!(link_type, LinkType::Autolink | LinkType::Email) {
                    open.markup = "autolink".to_owned();
                }
                self.open_span(open, Token::new("link_close", "a", Nesting::Close));
            }
            Tag::Image { dest_url, title, .. } => {
                let src = normalize_link(dest_url);
                if !validate_link(&src) {
                    let text = self.source(range);
                    self.push_inline(text_token(text));
                    self.skip_element();
                    return;
                }
                let mut image = Token::new("image", "img", Nesting::SelfClosing);
                image.attr_set("src", src);
                image.attr_set("alt", "");
                if !title.is_empty() {
                    image.attr_set("title", title.to_string());
                }
                self.ensure_inline();
                self.frames.push(Frame::Image(image));
                self.buffers.push(Vec::new());
            }
            _ => self.frames.push(Frame::Transparent),
        }
    }

    fn open_marked_span(&mut self, name: &'static str, width: usize, range: &Range<usize>) {
        let (open_kind, close_kind) = match name {
            "em" => ("em_open", "em_close"),
            "strong" => ("strong_open", "strong_close"),
            _ => ("s_open", "s_close"),
        };
        let markup: String = self.source(range).chars().take(width).collect();
        let mut open = Token::new(open_kind, name, Nesting::Open);
        let mut close = Token::new(close_kind, name, Nesting::Close);
        open.markup.clone_from(&markup);
        close.markup = markup;
        self.open_span(open, close);
    }
}

/// A plain text token.
pub fn text_token(content: impl Into<String>) -> Token {
    let mut token = Token::new(TEXT, "", Nesting::SelfClosing);
    token.content = content.into();
    token
}

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

fn heading_level_to_num(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// `#` run of an ATX heading, `=` or `-` for a setext one.
fn heading_markup(source: &str, level: usize) -> String {
    if source.trim_start().starts_with('#') {
        "#".repeat(level)
    } else if level == 1 {
        "=".to_owned()
    } else {
        "-".to_owned()
    }
}

fn fence_markup(source: &str) -> String {
    let Some(start) = source.find(['`', '~']) else {
        return String::new();
    };
    let fence = &source[start..];
    let marker = fence.as_bytes()[0];
    let len = fence.bytes().take_while(|&byte| byte == marker).count();
    fence[..len].to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::grammar::{GrammarBuilder, ParserOptions};
    use crate::parser::Tokenizer;
    use crate::token::{Token, is_well_bracketed};

    fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens.iter().map(|token| token.kind).collect()
    }

    fn tokenize_with(src: &str, options: ParserOptions) -> Vec<Token> {
        Tokenizer::new(GrammarBuilder::commonmark(options).build()).tokenize(src)
    }

    #[test]
    fn test_paragraph_and_heading() {
        let tokens = Tokenizer::default().tokenize("# Title\n\nSome text\nmore\n");
        assert_eq!(
            kinds(&tokens),
            vec![
                "heading_open",
                "inline",
                "heading_close",
                "paragraph_open",
                "inline",
                "paragraph_close",
            ]
        );
        assert_eq!(tokens[0].tag, "h1");
        assert_eq!(tokens[0].markup, "#");
        assert_eq!(tokens[0].map, Some((0, 1)));
        assert_eq!(tokens[3].map, Some((2, 4)));
        assert_eq!(tokens[4].level, 1);
    }

    #[test]
    fn test_tight_list_gets_hidden_paragraphs() {
        let tokens = Tokenizer::default().tokenize("- a\n- b\n");
        assert_eq!(
            kinds(&tokens),
            vec![
                "bullet_list_open",
                "list_item_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "list_item_close",
                "list_item_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "list_item_close",
                "bullet_list_close",
            ]
        );
        assert!(tokens[2].hidden && tokens[4].hidden);
        assert_eq!(tokens[0].markup, "-");
        assert_eq!(tokens[3].content, "a");
    }

    #[test]
    fn test_nested_tight_list_closes_hidden_paragraph() {
        let tokens = Tokenizer::default().tokenize("- a\n  - b\n");
        assert!(is_well_bracketed(&tokens));
        let item = kinds(&tokens[1..6]);
        assert_eq!(
            item,
            vec![
                "list_item_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "bullet_list_open",
            ]
        );
    }

    #[test]
    fn test_ordered_list_start() {
        let tokens = Tokenizer::default().tokenize("3. x\n4. y\n");
        assert_eq!(tokens[0].kind, "ordered_list_open");
        assert_eq!(tokens[0].attr_get("start"), Some("3"));
    }

    #[test]
    fn test_fence_info_and_markup() {
        let tokens = Tokenizer::default().tokenize("~~~rust\nlet x = 1;\n~~~\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, "fence");
        assert_eq!(tokens[0].info, "rust");
        assert_eq!(tokens[0].markup, "~~~");
        assert_eq!(tokens[0].content, "let x = 1;\n");
    }

    #[test]
    fn test_inline_spans() {
        let tokens = Tokenizer::default().tokenize("*a* __b__ [c](/d \"T\")\n");
        let children = tokens[1].children.as_deref().unwrap_or_default();
        assert_eq!(
            kinds(children),
            vec![
                "em_open",
                "text",
                "em_close",
                "text",
                "strong_open",
                "text",
                "strong_close",
                "text",
                "link_open",
                "text",
                "link_close",
            ]
        );
        assert_eq!(children[0].markup, "*");
        assert_eq!(children[4].markup, "__");
        assert_eq!(children[8].attr_get("href"), Some("/d"));
        assert_eq!(children[8].attr_get("title"), Some("T"));
    }

    #[test]
    fn test_script_link_stays_text() {
        let tokens = Tokenizer::default().tokenize("[x](javascript:alert(1))\n");
        let children = tokens[1].children.as_deref().unwrap_or_default();
        assert_eq!(kinds(children), vec!["text"]);
        assert_eq!(children[0].content, "[x](javascript:alert(1))");
    }

    #[test]
    fn test_email_autolink() {
        let tokens = Tokenizer::default().tokenize("<me@example.com>\n");
        let children = tokens[1].children.as_deref().unwrap_or_default();
        assert_eq!(children[0].attr_get("href"), Some("mailto:me@example.com"));
        assert_eq!(children[0].markup, "autolink");
    }

    #[test]
    fn test_html_disabled_becomes_text() {
        let options = ParserOptions {
            html: false,
            ..ParserOptions::default()
        };
        let tokens = tokenize_with("<div>\nraw\n</div>\n\na <b>x</b>\n", options);
        assert!(tokens.iter().all(|token| !token.kind.starts_with("html")));
        assert_eq!(tokens[1].content, "<div>\nraw\n</div>");
        let children = tokens[4].children.as_deref().unwrap_or_default();
        assert!(children.iter().all(|token| token.kind == "text"));
    }

    #[test]
    fn test_max_nesting_drops_deep_brackets() {
        let options = ParserOptions {
            max_nesting: 2,
            ..ParserOptions::default()
        };
        let tokens = tokenize_with("> > > deep\n", options);
        assert!(is_well_bracketed(&tokens));
        let quotes = tokens.iter().filter(|token| token.kind == "blockquote_open").count();
        assert_eq!(quotes, 2);
        assert!(tokens.iter().any(|token| token.kind == "inline"));
    }
}
