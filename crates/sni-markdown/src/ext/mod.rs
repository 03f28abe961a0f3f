//! Built-in grammar extensions.
//!
//! Each extension is a value implementing [`Extension`](crate::Extension);
//! apply it to a [`GrammarBuilder`](crate::GrammarBuilder) to add its rules.
//! Render rules for the token kinds they emit are part of the default
//! [`RuleTable`](crate::RuleTable).

mod deflist;
mod footnote;
pub(crate) mod front_matter;
pub(crate) mod math;

pub use deflist::Deflist;
pub use footnote::Footnote;
pub use front_matter::{FRONT_MATTER, FrontMatter, raw_front_matter};
pub use math::{Math, MathOptions};

use crate::render::RenderRule;

/// Render rules for every built-in extension.
pub(crate) fn default_rules() -> Vec<(&'static str, RenderRule)> {
    let mut rules = front_matter::default_rules();
    rules.extend(footnote::default_rules());
    rules.extend(math::default_rules());
    rules
}
