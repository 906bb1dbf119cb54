//! Mixin registry and dead-definition elimination
//!
//! Every mixin definition records the line range it occupies in the
//! emission buffer; every call marks its name used. After the walk, the
//! ranges of unused mixins are blanked. A call whose name is computed
//! disables elimination entirely, since any definition might be reached.

use std::ops::Range;

use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MixinEntry {
    pub used: bool,
    /// `[start, end)` line ranges of each definition
    pub instances: Vec<Range<usize>>,
}

#[derive(Debug, Clone, Default)]
pub struct MixinRegistry {
    entries: IndexMap<String, MixinEntry>,
    dynamic: bool,
}

impl MixinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: &str) -> &mut MixinEntry {
        self.entries.entry(name.to_string()).or_default()
    }

    pub fn mark_used(&mut self, name: &str) {
        self.entry(name).used = true;
    }

    pub fn record_definition(&mut self, name: &str, lines: Range<usize>) {
        self.entry(name).instances.push(lines);
    }

    pub fn mark_dynamic(&mut self) {
        self.dynamic = true;
    }

    pub fn has_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn get(&self, name: &str) -> Option<&MixinEntry> {
        self.entries.get(name)
    }

    /// Line ranges to blank: every definition of an unused mixin, or
    /// nothing once a dynamic call was seen.
    pub fn dead_ranges(&self) -> Vec<Range<usize>> {
        if self.dynamic {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.used)
            .inspect(|(name, _)| log::debug!("dropping unused mixin `{}`", name))
            .flat_map(|(_, entry)| entry.instances.iter().cloned())
            .collect()
    }
}

/// Nim identifier for a mixin: `jade_mixins_` plus the encoded name.
///
/// Nim compares identifiers ignoring underscores and the case of all but
/// the first letter, so the name is encoded into lowercase letters and
/// digits only. `x` is the escape: any other character, `x` included,
/// becomes `x<hex code point>x`. Distinct names give distinct identifiers.
pub fn mixin_identifier(name: &str) -> String {
    let mut ident = String::from("jade_mixins");
    if name.is_empty() {
        return ident;
    }
    ident.push('_');
    for c in name.chars() {
        if (c.is_ascii_lowercase() && c != 'x') || c.is_ascii_digit() {
            ident.push(c);
        } else {
            ident.push_str(&format!("x{:x}x", c as u32));
        }
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_definitions_are_dead() {
        let mut registry = MixinRegistry::new();
        registry.record_definition("a", 0..3);
        registry.record_definition("b", 3..5);
        registry.record_definition("a", 7..9);
        registry.mark_used("b");
        assert_eq!(registry.dead_ranges(), vec![0..3, 7..9]);
    }

    #[test]
    fn test_calls_before_definition_count() {
        let mut registry = MixinRegistry::new();
        registry.mark_used("late");
        registry.record_definition("late", 4..6);
        assert!(registry.dead_ranges().is_empty());
        assert!(registry.get("late").is_some_and(|entry| entry.used));
    }

    #[test]
    fn test_dynamic_call_keeps_everything() {
        let mut registry = MixinRegistry::new();
        registry.record_definition("a", 0..3);
        registry.mark_dynamic();
        assert!(registry.has_dynamic());
        assert!(registry.dead_ranges().is_empty());
    }

    #[test]
    fn test_identifier() {
        assert_eq!(mixin_identifier("card"), "jade_mixins_card");
        assert_eq!(mixin_identifier("list-item"), "jade_mixins_listx2dxitem");
        assert_eq!(mixin_identifier("Box"), "jade_mixins_x42xox78x");
    }

    #[test]
    fn test_identifier_keeps_names_apart() {
        // Nim treats `a_b` and `ab` as one identifier
        let names = ["a-b", "a_b", "a__b", "ab", "aB", "Ab", "x2dx", "a-"];
        let idents: Vec<String> = names.iter().map(|name| mixin_identifier(name)).collect();
        for (i, ident) in idents.iter().enumerate() {
            let suffix = &ident["jade_mixins_".len()..];
            assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            assert!(idents[i + 1..].iter().all(|other| other != ident), "{}", ident);
        }
    }
}
