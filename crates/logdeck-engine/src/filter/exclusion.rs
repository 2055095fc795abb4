//! Exclusion rules: user patterns that hide matching lines.

use regex::Regex;

use logdeck_core::prelude::*;

/// A user-supplied exclusion pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Case-insensitive substring
    Literal(String),
    /// Regular expression, matched case-sensitively unless it says otherwise
    Regex(String),
}

impl ExclusionRule {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self::Literal(pattern.into())
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex(pattern.into())
    }

    pub fn pattern(&self) -> &str {
        match self {
            ExclusionRule::Literal(p) | ExclusionRule::Regex(p) => p,
        }
    }
}

#[derive(Debug, Clone)]
enum CompiledRule {
    Literal(String),
    Regex(Regex),
}

impl CompiledRule {
    fn is_match(&self, text: &str, lowercase: &str) -> bool {
        match self {
            CompiledRule::Literal(needle) => lowercase.contains(needle.as_str()),
            CompiledRule::Regex(regex) => regex.is_match(text),
        }
    }
}

/// Ordered, compiled exclusion rules plus the on/off toggle.
///
/// Rules apply as soon as they are set; the toggle turns them off without
/// discarding them.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    rules: Vec<CompiledRule>,
    enabled: bool,
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            enabled: true,
        }
    }
}

impl ExclusionSet {
    /// Compile `rules`. Patterns that fail to compile, or are empty, are
    /// dropped with a warning.
    pub fn set_rules(&mut self, rules: Vec<ExclusionRule>) {
        self.rules = rules
            .into_iter()
            .filter_map(|rule| match rule {
                ExclusionRule::Literal(pattern) if pattern.is_empty() => None,
                ExclusionRule::Literal(pattern) => {
                    Some(CompiledRule::Literal(pattern.to_lowercase()))
                }
                ExclusionRule::Regex(pattern) => match Regex::new(&pattern) {
                    Ok(regex) => Some(CompiledRule::Regex(regex)),
                    Err(e) => {
                        warn!("Dropping exclusion pattern '{}': {}", pattern, e);
                        None
                    }
                },
            })
            .collect();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of rules that compiled
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.rules.is_empty()
    }

    /// Whether `text` is hidden by any rule
    pub fn excludes(&self, text: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        let lowercase = text.to_lowercase();
        self.rules.iter().any(|rule| rule.is_match(text, &lowercase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rules: Vec<ExclusionRule>) -> ExclusionSet {
        let mut set = ExclusionSet::default();
        set.set_rules(rules);
        set
    }

    #[test]
    fn test_literal_is_case_insensitive() {
        let set = set(vec![ExclusionRule::literal("Heartbeat")]);
        assert!(set.excludes("[net] heartbeat ok"));
        assert!(!set.excludes("[net] request ok"));
    }

    #[test]
    fn test_regex_rule() {
        let set = set(vec![ExclusionRule::regex(r"^GC\(\d+\)")]);
        assert!(set.excludes("GC(12) pause young"));
        assert!(!set.excludes("before GC(12)"));
    }

    #[test]
    fn test_invalid_regex_is_dropped() {
        let set = set(vec![
            ExclusionRule::regex("(unclosed"),
            ExclusionRule::literal("noise"),
        ]);
        assert_eq!(set.rule_count(), 1);
        assert!(set.excludes("some noise"));
        assert!(!set.excludes("(unclosed"));
    }

    #[test]
    fn test_empty_literal_is_dropped() {
        let set = set(vec![ExclusionRule::literal("")]);
        assert_eq!(set.rule_count(), 0);
        assert!(!set.excludes("anything"));
    }

    #[test]
    fn test_rules_apply_without_toggle() {
        let mut set = ExclusionSet::default();
        assert!(set.is_enabled());
        assert!(!set.is_active());
        set.set_rules(vec![ExclusionRule::literal("heartbeat")]);
        assert!(set.is_active());
        assert!(set.excludes("heartbeat"));
    }

    #[test]
    fn test_disabled_set_excludes_nothing() {
        let mut set = set(vec![ExclusionRule::literal("noise")]);
        set.set_enabled(false);
        assert!(!set.excludes("noise"));
    }
}
