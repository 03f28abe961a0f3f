//! Definition lists.
//!
//! ```text
//! Term
//! : Description, parsed as block content
//! ```

use std::ops::Range;
use std::sync::Arc;

use pulldown_cmark::{Event, Options, Tag};

use crate::grammar::{Extension, GrammarBuilder};
use crate::parser::EventState;
use crate::token::{Nesting, Token};

/// Enables definition list syntax and maps it to `dl`, `dt` and `dd`
/// tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct Deflist;

impl Extension for Deflist {
    fn name(&self) -> &'static str {
        "deflist"
    }

    fn register(&self, grammar: &mut GrammarBuilder) {
        grammar.enable_syntax(Options::ENABLE_DEFINITION_LIST);
        grammar.events.push("deflist", Arc::new(deflist));
    }
}

fn deflist(state: &mut EventState<'_>, event: &Event<'_>, _range: &Range<usize>) -> bool {
    let Event::Start(tag) = event else {
        return false;
    };
    let (name, open, close) = match tag {
        Tag::DefinitionList => ("dl", "dl_open", "dl_close"),
        Tag::DefinitionListTitle => ("dt", "dt_open", "dt_close"),
        Tag::DefinitionListDefinition => ("dd", "dd_open", "dd_close"),
        _ => return false,
    };
    state.open_block(Token::new(open, name, Nesting::Open), Token::new(close, name, Nesting::Close));
    true
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
                .with_extension(&Deflist)
                .build(),
        )
        .tokenize(src)
    }

    fn count(tokens: &[Token], kind: &str) -> usize {
        tokens.iter().filter(|token| token.kind == kind).count()
    }

    #[test]
    fn test_tight_list() {
        let tokens = tokenize("Term\n: Definition\n");
        assert_eq!(
            tokens.iter().map(|token| token.kind).collect::<Vec<_>>(),
            vec![
                "dl_open",
                "dt_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "dt_close",
                "dd_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "dd_close",
                "dl_close",
            ]
        );
        assert!(tokens[2].hidden && tokens[7].hidden);
        assert_eq!(tokens[0].map, Some((0, 2)));
        assert_eq!(
            Renderer::new().render(&tokens).html,
            "<dl>\n<dt>Term</dt>\n<dd>Definition</dd>\n</dl>\n"
        );
    }

    #[test]
    fn test_several_terms() {
        let tokens = tokenize("A\n: a\n\nB\n: b\n");
        assert!(is_well_bracketed(&tokens));
        assert_eq!(count(&tokens, "dt_open"), 2);
        assert_eq!(count(&tokens, "dd_open"), 2);
    }

    #[test]
    fn test_plain_paragraph_untouched() {
        let tokens = tokenize("para\nmore\n");
        assert_eq!(count(&tokens, "dl_open"), 0);
        assert_eq!(tokens[0].kind, "paragraph_open");
    }

    #[test]
    fn test_without_extension_is_paragraph() {
        let tokens = Tokenizer::default().tokenize("Term\n: Definition\n");
        assert_eq!(count(&tokens, "dl_open"), 0);
        assert_eq!(tokens[0].kind, "paragraph_open");
    }
}
