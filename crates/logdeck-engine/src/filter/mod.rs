//! Filter composer.
//!
//! Seven independent predicates, each owning one field of
//! [`FilterFlags`]. A record's height is its natural height unless any flag
//! is set, in which case it is 0. Filter changes are applied by one linear
//! pass over the store; appended records go through the same per-record
//! evaluation.

pub mod exclusion;
pub mod search;

pub use exclusion::{ExclusionRule, ExclusionSet};
pub use search::{LineMatcher, SearchMatch, SearchPattern, SearchState};

use std::collections::HashSet;

use logdeck_core::{is_package_path, FilterFlags, Level, LineRecord};

use crate::layout::Layout;
use crate::store::{Group, LineStore};

pub struct FilterComposer {
    hidden_categories: HashSet<String>,
    enabled_levels: HashSet<Level>,
    context_lines: usize,
    hidden_source_tags: HashSet<String>,
    hidden_class_tags: HashSet<String>,
    exclusions: ExclusionSet,
    search_filter: bool,
    matcher: Option<Box<dyn LineMatcher>>,
    app_only: bool,
    app_roots: Vec<String>,
}

impl Default for FilterComposer {
    fn default() -> Self {
        Self {
            hidden_categories: HashSet::new(),
            enabled_levels: Level::ALL.into_iter().collect(),
            context_lines: 0,
            hidden_source_tags: HashSet::new(),
            hidden_class_tags: HashSet::new(),
            exclusions: ExclusionSet::default(),
            search_filter: false,
            matcher: None,
            app_only: false,
            app_roots: Vec::new(),
        }
    }
}

impl std::fmt::Debug for FilterComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterComposer")
            .field("hidden_categories", &self.hidden_categories)
            .field("enabled_levels", &self.enabled_levels)
            .field("context_lines", &self.context_lines)
            .field("hidden_source_tags", &self.hidden_source_tags)
            .field("hidden_class_tags", &self.hidden_class_tags)
            .field("exclusions", &self.exclusions)
            .field("search_filter", &self.search_filter)
            .field("has_matcher", &self.matcher.is_some())
            .field("app_only", &self.app_only)
            .field("app_roots", &self.app_roots)
            .finish()
    }
}

impl FilterComposer {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────

    pub fn set_hidden_categories(&mut self, categories: HashSet<String>) {
        self.hidden_categories = categories;
    }

    pub fn set_enabled_levels(&mut self, levels: HashSet<Level>) {
        self.enabled_levels = levels;
    }

    pub fn set_context_lines(&mut self, lines: usize) {
        self.context_lines = lines;
    }

    pub fn set_hidden_source_tags(&mut self, tags: HashSet<String>) {
        self.hidden_source_tags = tags;
    }

    pub fn set_hidden_class_tags(&mut self, tags: HashSet<String>) {
        self.hidden_class_tags = tags;
    }

    pub fn set_exclusion_rules(&mut self, rules: Vec<ExclusionRule>) {
        self.exclusions.set_rules(rules);
    }

    pub fn set_exclusion_enabled(&mut self, enabled: bool) {
        self.exclusions.set_enabled(enabled);
    }

    pub fn set_search_filter(&mut self, enabled: bool, matcher: Option<Box<dyn LineMatcher>>) {
        self.search_filter = enabled;
        self.matcher = matcher;
    }

    pub fn set_app_only(&mut self, app_only: bool) {
        self.app_only = app_only;
    }

    pub fn set_app_roots(&mut self, roots: Vec<String>) {
        self.app_roots = roots;
    }

    pub fn enabled_levels(&self) -> &HashSet<Level> {
        &self.enabled_levels
    }

    pub fn context_lines(&self) -> usize {
        self.context_lines
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn is_search_filter_enabled(&self) -> bool {
        self.search_filter
    }

    pub fn is_app_only(&self) -> bool {
        self.app_only
    }

    /// Whether any predicate can hide a record
    pub fn is_active(&self) -> bool {
        !self.hidden_categories.is_empty()
            || self.level_filter_active()
            || !self.hidden_source_tags.is_empty()
            || !self.hidden_class_tags.is_empty()
            || self.exclusions.is_active()
            || (self.search_filter && self.matcher.is_some())
            || self.app_only
    }

    fn level_filter_active(&self) -> bool {
        Level::ALL.iter().any(|l| !self.enabled_levels.contains(l))
    }

    // ─────────────────────────────────────────────────────────
    // Predicates
    // ─────────────────────────────────────────────────────────

    pub fn level_matches(&self, record: &LineRecord) -> bool {
        self.enabled_levels.contains(&record.level)
    }

    fn class_hidden(&self, record: &LineRecord) -> bool {
        if self.hidden_class_tags.is_empty() || record.class_tags.is_empty() {
            return false;
        }
        let mut tags = record.class_tags.iter();
        if record.is_header() {
            tags.all(|t| self.hidden_class_tags.contains(t))
        } else {
            tags.any(|t| self.hidden_class_tags.contains(t))
        }
    }

    fn search_hidden(&self, record: &LineRecord) -> bool {
        match (&self.matcher, self.search_filter) {
            (Some(matcher), true) => !matcher.is_match(&record.text),
            _ => false,
        }
    }

    fn out_of_scope(&self, record: &LineRecord) -> bool {
        if !self.app_only {
            return false;
        }
        let Some(path) = record.path.as_deref() else {
            return false;
        };
        if self.app_roots.is_empty() {
            is_package_path(path)
        } else {
            !self.app_roots.iter().any(|root| path.starts_with(root.as_str()))
        }
    }

    /// Evaluate all seven predicates for one record.
    ///
    /// `in_level_context` is true when a level-matching record follows
    /// within `context_lines`.
    pub fn evaluate(&self, record: &LineRecord, in_level_context: bool) -> FilterFlags {
        FilterFlags {
            category: self.hidden_categories.contains(&record.category),
            level: !self.level_matches(record) && !in_level_context,
            source: record
                .source_tag
                .as_ref()
                .is_some_and(|tag| self.hidden_source_tags.contains(tag)),
            class: self.class_hidden(record),
            excluded: self.exclusions.excludes(&record.text),
            search: self.search_hidden(record),
            scope: self.out_of_scope(record),
        }
    }

    fn height(
        &self,
        record: &LineRecord,
        group: Option<&Group>,
        layout: &Layout,
        flags: FilterFlags,
    ) -> u32 {
        if flags.any() {
            0
        } else {
            layout.natural_height(record, group)
        }
    }

    // ─────────────────────────────────────────────────────────
    // Height passes
    // ─────────────────────────────────────────────────────────

    /// One linear pass: flags and height for every record
    pub fn recompute_heights(&self, store: &mut LineStore, layout: &Layout) {
        let context = self.context_mask(store);
        store.refresh_all(|i, record, group| {
            let flags = self.evaluate(record, context.get(i).copied().unwrap_or(false));
            (flags, self.height(record, group, layout, flags))
        });
    }

    /// Re-evaluate a single record
    pub fn refresh(&self, store: &mut LineStore, index: usize, layout: &Layout) {
        let in_context = self.has_match_after(store, index);
        store.refresh(index, |record, group| {
            let flags = self.evaluate(record, in_context);
            (flags, self.height(record, group, layout, flags))
        });
    }

    /// Evaluate a freshly stored record and the context lines it may reveal
    pub fn refresh_appended(&self, store: &mut LineStore, index: usize, layout: &Layout) {
        self.refresh(store, index, layout);

        let reveals_context = self.context_lines > 0
            && self.level_filter_active()
            && store.get(index).is_some_and(|r| self.level_matches(r));
        if reveals_context {
            for i in index.saturating_sub(self.context_lines)..index {
                self.refresh(store, i, layout);
            }
        }
    }

    fn has_match_after(&self, store: &LineStore, index: usize) -> bool {
        if self.context_lines == 0 || !self.level_filter_active() {
            return false;
        }
        (index + 1..=index + self.context_lines)
            .filter_map(|i| store.get(i))
            .any(|r| self.level_matches(r))
    }

    /// Records within `context_lines` before a level match
    fn context_mask(&self, store: &LineStore) -> Vec<bool> {
        if self.context_lines == 0 || !self.level_filter_active() {
            return Vec::new();
        }

        let mut mask = vec![false; store.len()];
        let mut remaining = 0;
        for (i, record) in store.iter().enumerate().rev() {
            if self.level_matches(record) {
                remaining = self.context_lines;
            } else if remaining > 0 {
                mask[i] = true;
                remaining -= 1;
            }
        }
        mask
    }
}
