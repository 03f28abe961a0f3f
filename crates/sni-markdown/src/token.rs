//! Token stream produced by the tokenizer.
//!
//! Tokens form a flat, well-bracketed sequence: every [`Nesting::Open`] token
//! is matched by a later [`Nesting::Close`] token of the same construct.
//! Inline content of a block lives in the `children` of an `inline` token.

use serde::Serialize;

/// Kind of the token holding inline content of a block.
pub const INLINE: &str = "inline";

/// Kind of a plain text run.
pub const TEXT: &str = "text";

/// Position of a token in the open/close bracket structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nesting {
    /// Opens a construct (`<p>`).
    Open,
    /// Closes a construct (`</p>`).
    Close,
    /// Stands alone (`<hr />`, text, code).
    SelfClosing,
}

/// Extension-specific payload attached to a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenMeta {
    /// A footnote reference, item or back-reference anchor.
    Footnote {
        /// Zero-based footnote number in order of first reference.
        id: usize,
        /// Index of this reference among references to the same footnote.
        sub_id: usize,
        /// Label from the source (`[^label]`), absent for inline footnotes.
        label: Option<String>,
    },
    /// Start of a footnote definition body (`[^label]: ...`).
    FootnoteDefinition {
        /// Label from the source.
        label: String,
    },
}

/// A unit of parsed structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Construct identifier, e.g. `paragraph_open`, `math_inline`.
    pub kind: &'static str,
    /// HTML tag used by the generic renderer. Empty for tokens with
    /// dedicated rules.
    pub tag: &'static str,
    /// Bracket role of this token.
    pub nesting: Nesting,
    /// Ordered HTML attributes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    /// Source line range `[start, end)`, set on block tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<(usize, usize)>,
    /// Nesting depth.
    pub level: usize,
    /// Inline children (for `inline` and `image` tokens).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Token>>,
    /// Textual payload.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Source marker (`*`, `` ``` ``, `---`, ...).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub markup: String,
    /// Fence info string, escape/entity origin, math label.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub info: String,
    /// Extension payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<TokenMeta>,
    /// Block-level token.
    pub block: bool,
    /// Suppressed in output (paragraphs of tight lists).
    pub hidden: bool,
}

impl Token {
    /// Create an empty token.
    #[must_use]
    pub fn new(kind: &'static str, tag: &'static str, nesting: Nesting) -> Self {
        Self {
            kind,
            tag,
            nesting,
            attrs: Vec::new(),
            map: None,
            level: 0,
            children: None,
            content: String::new(),
            markup: String::new(),
            info: String::new(),
            meta: None,
            block: false,
            hidden: false,
        }
    }

    /// Value of the attribute `name`.
    pub fn attr_get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set `name` to `value`, replacing an existing value.
    pub fn attr_set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Append `value` to `name` separated by a space (used for `class`).
    pub fn attr_join(&mut self, name: impl Into<String>, value: &str) {
        let name = name.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => {
                entry.1.push(' ');
                entry.1.push_str(value);
            }
            None => self.attrs.push((name, value.to_owned())),
        }
    }

    /// Footnote payload, if any.
    pub(crate) fn footnote_meta(&self) -> Option<(usize, usize)> {
        match self.meta {
            Some(TokenMeta::Footnote { id, sub_id, .. }) => Some((id, sub_id)),
            _ => None,
        }
    }
}

/// Check that `tokens` (and every child sequence) is well-bracketed.
///
/// Open tokens are expected to end in `_open` and be closed by the
/// corresponding `_close` kind.
pub fn is_well_bracketed(tokens: &[Token]) -> bool {
    let mut stack: Vec<&str> = Vec::new();
    for token in tokens {
        match token.nesting {
            Nesting::Open => stack.push(token.kind.strip_suffix("_open").unwrap_or(token.kind)),
            Nesting::Close => {
                let name = token.kind.strip_suffix("_close").unwrap_or(token.kind);
                if stack.pop() != Some(name) {
                    return false;
                }
            }
            Nesting::SelfClosing => {}
        }
        if let Some(children) = &token.children
            && !is_well_bracketed(children)
        {
            return false;
        }
    }
    stack.is_empty()
}
