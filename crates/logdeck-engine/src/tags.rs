//! Shared tag count table.
//!
//! One table per engine. The store registers a record's tags when it is
//! pushed and unregisters them when it is trimmed; the filter menus read the
//! counts. `register` and `unregister` are the only mutators.

use std::collections::HashMap;

use logdeck_core::LineRecord;

/// Occurrence counts of source and class tags across stored records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCounts {
    source: HashMap<String, usize>,
    class: HashMap<String, usize>,
}

impl TagCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every tag carried by `record`
    pub fn register(&mut self, record: &LineRecord) {
        if let Some(tag) = &record.source_tag {
            *self.source.entry(tag.clone()).or_insert(0) += 1;
        }
        for tag in &record.class_tags {
            *self.class.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    /// Remove the counts `register` added for `record`
    pub fn unregister(&mut self, record: &LineRecord) {
        if let Some(tag) = &record.source_tag {
            decrement(&mut self.source, tag);
        }
        for tag in &record.class_tags {
            decrement(&mut self.class, tag);
        }
    }

    pub fn source_count(&self, tag: &str) -> usize {
        self.source.get(tag).copied().unwrap_or(0)
    }

    pub fn class_count(&self, tag: &str) -> usize {
        self.class.get(tag).copied().unwrap_or(0)
    }

    /// Source tags with their counts, sorted by tag
    pub fn source_tags(&self) -> Vec<(String, usize)> {
        sorted(&self.source)
    }

    /// Class tags with their counts, sorted by tag
    pub fn class_tags(&self) -> Vec<(String, usize)> {
        sorted(&self.class)
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.class.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.source.clear();
        self.class.clear();
    }
}

fn decrement(counts: &mut HashMap<String, usize>, tag: &str) {
    if let Some(count) = counts.get_mut(tag) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(tag);
        }
    }
}

fn sorted(counts: &HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut tags: Vec<(String, usize)> = counts.iter().map(|(t, c)| (t.clone(), *c)).collect();
    tags.sort();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::LineKind;

    fn tagged(source: Option<&str>, classes: &[&str]) -> LineRecord {
        let mut record = LineRecord::new(LineKind::Line, "x", "x");
        record.source_tag = source.map(String::from);
        record.class_tags = classes.iter().map(|c| c.to_string()).collect();
        record
    }

    #[test]
    fn test_register_counts_each_tag() {
        let mut tags = TagCounts::new();
        tags.register(&tagged(Some("Network"), &["IOException"]));
        tags.register(&tagged(Some("Network"), &[]));

        assert_eq!(tags.source_count("Network"), 2);
        assert_eq!(tags.class_count("IOException"), 1);
        assert_eq!(tags.source_count("Auth"), 0);
    }

    #[test]
    fn test_unregister_removes_zero_entries() {
        let mut tags = TagCounts::new();
        let record = tagged(Some("Auth"), &["StateError"]);
        tags.register(&record);
        tags.unregister(&record);

        assert!(tags.is_empty());
        assert!(tags.source_tags().is_empty());
    }

    #[test]
    fn test_unregister_unknown_tag_is_ignored() {
        let mut tags = TagCounts::new();
        tags.unregister(&tagged(Some("Ghost"), &["Nope"]));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_listing_is_sorted() {
        let mut tags = TagCounts::new();
        tags.register(&tagged(Some("b"), &[]));
        tags.register(&tagged(Some("a"), &[]));
        tags.register(&tagged(Some("b"), &[]));

        assert_eq!(
            tags.source_tags(),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }
}
