//! CommonMark HTML rules for the core token kinds.

use std::fmt::Write;
use std::sync::Arc;

use super::{RenderContext, RenderRule};
use crate::parser::helpers::escape_html;
use crate::token::{INLINE, Nesting, TEXT, Token};

/// Render `attrs` as ` name="value"` pairs.
pub fn render_attrs(attrs: &[(String, String)]) -> String {
    let mut out = String::new();
    for (name, value) in attrs {
        let _ = write!(out, " {}=\"{}\"", escape_html(name), escape_html(value));
    }
    out
}

/// Opening or closing tag of `tokens[idx]` with the given attributes.
///
/// Block tokens are followed by a newline unless the next token is their
/// inline content, a hidden token, or their own closing tag.
fn render_tag(tokens: &[Token], idx: usize, attrs: &[(String, String)], ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    if token.hidden {
        return String::new();
    }
    let tag = if token.tag.is_empty() { token.kind } else { token.tag };

    let mut out = String::new();
    if token.block && token.nesting != Nesting::Close && idx > 0 && tokens[idx - 1].hidden {
        out.push('\n');
    }
    out.push_str(if token.nesting == Nesting::Close { "</" } else { "<" });
    out.push_str(tag);
    out.push_str(&render_attrs(attrs));
    if token.nesting == Nesting::SelfClosing && ctx.options.xhtml_out {
        out.push_str(" /");
    }

    let mut need_lf = token.block;
    if token.block && token.nesting == Nesting::Open {
        if let Some(next) = tokens.get(idx + 1) {
            if next.kind == INLINE || next.hidden {
                need_lf = false;
            } else if next.nesting == Nesting::Close && next.tag == token.tag {
                need_lf = false;
            }
        }
    }
    out.push_str(if need_lf { ">\n" } else { ">" });
    out
}

/// Generic rule for kinds without a dedicated one.
///
/// Emits the token's tag (its kind when the tag is empty). A self-contained
/// token with content is wrapped as `<tag>content</tag>`.
pub fn render_token(tokens: &[Token], idx: usize, ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    if token.nesting != Nesting::SelfClosing || token.content.is_empty() || token.hidden {
        return render_tag(tokens, idx, &token.attrs, ctx);
    }
    let tag = if token.tag.is_empty() { token.kind } else { token.tag };
    let lf = if token.block { "\n" } else { "" };
    format!(
        "<{tag}{}>{}</{tag}>{lf}",
        render_attrs(&token.attrs),
        escape_html(&token.content)
    )
}

/// Plain text of an inline sequence, used for image `alt` attributes.
pub fn render_inline_as_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token.kind {
            TEXT | "code_inline" | "html_inline" | "html_block" => {
                out.push_str(&token.content);
            }
            "image" => {
                if let Some(children) = &token.children {
                    out.push_str(&render_inline_as_text(children));
                }
            }
            "softbreak" | "hardbreak" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn code_inline(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    format!(
        "<code{}>{}</code>",
        render_attrs(&token.attrs),
        escape_html(&token.content)
    )
}

fn code_block(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    format!(
        "<pre{}><code>{}</code></pre>\n",
        render_attrs(&token.attrs),
        escape_html(&token.content)
    )
}

fn fence(tokens: &[Token], idx: usize, ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    let lang = token.info.split_whitespace().next().unwrap_or_default();
    let code = escape_html(&token.content);

    if lang.is_empty() {
        return format!("<pre><code{}>{code}</code></pre>\n", render_attrs(&token.attrs));
    }

    let mut token = token.clone();
    token.attr_join("class", &format!("{}{lang}", ctx.options.lang_prefix));
    format!("<pre><code{}>{code}</code></pre>\n", render_attrs(&token.attrs))
}

fn image(tokens: &[Token], idx: usize, ctx: &RenderContext<'_>) -> String {
    let token = &tokens[idx];
    let alt = token
        .children
        .as_deref()
        .map(render_inline_as_text)
        .unwrap_or_default();
    let mut attrs = token.attrs.clone();
    match attrs.iter_mut().find(|(name, _)| name == "alt") {
        Some(entry) => entry.1 = alt,
        None => attrs.push(("alt".to_owned(), alt)),
    }
    render_tag(tokens, idx, &attrs, ctx)
}

fn line_break(ctx: &RenderContext<'_>) -> String {
    if ctx.options.xhtml_out {
        "<br />\n".to_owned()
    } else {
        "<br>\n".to_owned()
    }
}

fn hardbreak(_tokens: &[Token], _idx: usize, ctx: &RenderContext<'_>) -> String {
    line_break(ctx)
}

fn softbreak(_tokens: &[Token], _idx: usize, ctx: &RenderContext<'_>) -> String {
    if ctx.options.breaks {
        line_break(ctx)
    } else {
        "\n".to_owned()
    }
}

/// Children of an `inline` token, each through its own rule.
fn inline(tokens: &[Token], idx: usize, ctx: &RenderContext<'_>) -> String {
    tokens[idx]
        .children
        .as_deref()
        .map(|children| ctx.renderer.render_inline(children))
        .unwrap_or_default()
}

fn text(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    escape_html(&tokens[idx].content).into_owned()
}

fn html_raw(tokens: &[Token], idx: usize, _ctx: &RenderContext<'_>) -> String {
    tokens[idx].content.clone()
}

pub(super) fn default_rules() -> Vec<(&'static str, RenderRule)> {
    vec![
        ("code_inline", Arc::new(code_inline) as RenderRule),
        ("code_block", Arc::new(code_block) as RenderRule),
        ("fence", Arc::new(fence) as RenderRule),
        ("image", Arc::new(image) as RenderRule),
        ("hardbreak", Arc::new(hardbreak) as RenderRule),
        ("softbreak", Arc::new(softbreak) as RenderRule),
        (INLINE, Arc::new(inline) as RenderRule),
        (TEXT, Arc::new(text) as RenderRule),
        ("html_block", Arc::new(html_raw) as RenderRule),
        ("html_inline", Arc::new(html_raw) as RenderRule),
    ]
}
