//! Ordered, named rule chains.
//!
//! A [`Ruler`] is the mutable form used while extensions register rules.
//! [`Ruler::compile`] freezes it into a [`Chain`], a plain slice of the
//! enabled rules in evaluation order.

struct Entry<R> {
    name: &'static str,
    rule: R,
    enabled: bool,
}

/// Mutable ordered list of named rules.
pub struct Ruler<R> {
    entries: Vec<Entry<R>>,
}

impl<R> Default for Ruler<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R: Clone> Ruler<R> {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule at the end of the chain.
    pub fn push(&mut self, name: &'static str, rule: R) {
        self.entries.push(Self::entry(name, rule));
    }

    /// Insert a rule right before `anchor`.
    ///
    /// An unknown anchor appends the rule at the end of the chain.
    pub fn insert_before(&mut self, anchor: &str, name: &'static str, rule: R) {
        match self.position(anchor) {
            Some(index) => self.entries.insert(index, Self::entry(name, rule)),
            None => {
                tracing::warn!(anchor, rule = name, "Unknown anchor rule, appending");
                self.push(name, rule);
            }
        }
    }

    /// Insert a rule right after `anchor`.
    ///
    /// An unknown anchor appends the rule at the end of the chain.
    pub fn insert_after(&mut self, anchor: &str, name: &'static str, rule: R) {
        match self.position(anchor) {
            Some(index) => self.entries.insert(index + 1, Self::entry(name, rule)),
            None => {
                tracing::warn!(anchor, rule = name, "Unknown anchor rule, appending");
                self.push(name, rule);
            }
        }
    }

    /// Enable a rule by name. Returns `false` if no such rule exists.
    pub fn enable(&mut self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable a rule by name. Returns `false` if no such rule exists.
    pub fn disable(&mut self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    /// Names of enabled rules, in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.name)
            .collect()
    }

    /// Freeze the chain.
    pub(crate) fn compile(&self) -> Chain<R> {
        Chain {
            rules: self
                .entries
                .iter()
                .filter(|entry| entry.enabled)
                .map(|entry| entry.rule.clone())
                .collect(),
        }
    }

    fn entry(name: &'static str, rule: R) -> Entry<R> {
        Entry {
            name,
            rule,
            enabled: true,
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

/// Immutable compiled chain.
pub struct Chain<R> {
    rules: Vec<R>,
}

impl<R> Chain<R> {
    /// All enabled rules in order.
    pub fn rules(&self) -> &[R] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ruler() -> Ruler<u8> {
        let mut ruler = Ruler::new();
        ruler.push("a", 1);
        ruler.push("b", 2);
        ruler.push("c", 3);
        ruler
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut ruler = ruler();
        ruler.insert_before("b", "x", 9);
        ruler.insert_after("c", "y", 8);
        assert_eq!(ruler.names(), vec!["a", "x", "b", "c", "y"]);
        assert_eq!(ruler.compile().rules(), &[1, 9, 2, 3, 8]);
    }

    #[test]
    fn test_unknown_anchor_appends() {
        let mut ruler = ruler();
        ruler.insert_before("missing", "x", 9);
        assert_eq!(ruler.names(), vec!["a", "b", "c", "x"]);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let mut ruler = ruler();
        assert!(ruler.disable("a"));
        assert!(!ruler.disable("missing"));
        assert_eq!(ruler.compile().rules(), &[2, 3]);
        assert!(ruler.enable("a"));
        assert_eq!(ruler.names(), vec!["a", "b", "c"]);
    }
}
