//! Search: the matcher seam used by search-as-filter, and the match list
//! used for next/previous navigation.

use regex::Regex;

use logdeck_core::prelude::*;
use logdeck_core::LineRecord;

/// Decides whether a line's plain text matches a search
pub trait LineMatcher {
    fn is_match(&self, text: &str) -> bool;
}

impl LineMatcher for Regex {
    fn is_match(&self, text: &str) -> bool {
        Regex::is_match(self, text)
    }
}

/// Case-insensitive regex search pattern
#[derive(Debug, Clone)]
pub struct SearchPattern {
    query: String,
    regex: Regex,
}

impl SearchPattern {
    pub fn new(query: &str) -> Result<Self> {
        let regex = Regex::new(&format!("(?i){}", query))
            .map_err(|e| Error::invalid_pattern(query, e.to_string()))?;
        Ok(Self {
            query: query.to_string(),
            regex,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl LineMatcher for SearchPattern {
    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// A single search match within a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Sequence number of the record containing the match
    pub seq: u64,
    /// Byte offset of match start within the record text
    pub start: usize,
    /// Byte offset of match end within the record text
    pub end: usize,
}

impl SearchMatch {
    pub fn new(seq: u64, start: usize, end: usize) -> Self {
        Self { seq, start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State for log search
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// The current search query string
    pub query: String,
    /// Compiled pattern (None if query is empty or invalid)
    pattern: Option<SearchPattern>,
    /// All matches in the store, in record order
    pub matches: Vec<SearchMatch>,
    /// Current match index (for next/prev navigation)
    pub current_match: Option<usize>,
    /// Error message if regex compilation failed
    pub error: Option<String>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear query and matches
    pub fn clear(&mut self) {
        self.query.clear();
        self.pattern = None;
        self.matches.clear();
        self.current_match = None;
        self.error = None;
    }

    /// Set the query and compile it. Invalid patterns keep the error and
    /// produce no matches.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.matches.clear();
        self.current_match = None;

        if query.is_empty() {
            self.pattern = None;
            self.error = None;
            return;
        }

        match SearchPattern::new(query) {
            Ok(pattern) => {
                self.pattern = Some(pattern);
                self.error = None;
            }
            Err(e) => {
                debug!("search query rejected: {}", e);
                self.pattern = None;
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn pattern(&self) -> Option<&SearchPattern> {
        self.pattern.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Current match index (1-based for display)
    pub fn current_match_index(&self) -> Option<usize> {
        self.current_match.map(|i| i + 1)
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.current_match.and_then(|i| self.matches.get(i))
    }

    /// Sequence number of the record holding the current match
    pub fn current_match_seq(&self) -> Option<u64> {
        self.current_match().map(|m| m.seq)
    }

    /// Move to the next match (wraps around)
    pub fn next_match(&mut self) {
        if self.matches.is_empty() {
            self.current_match = None;
            return;
        }

        self.current_match = Some(match self.current_match {
            Some(i) => (i + 1) % self.matches.len(),
            None => 0,
        });
    }

    /// Move to the previous match (wraps around)
    pub fn prev_match(&mut self) {
        if self.matches.is_empty() {
            self.current_match = None;
            return;
        }

        self.current_match = Some(match self.current_match {
            Some(0) | None => self.matches.len() - 1,
            Some(i) => i - 1,
        });
    }

    /// Select the first match at or after `seq`, wrapping to the first match
    pub fn jump_to_match(&mut self, seq: u64) {
        if self.matches.is_empty() {
            self.current_match = None;
            return;
        }
        let index = self.matches.partition_point(|m| m.seq < seq);
        self.current_match = Some(if index < self.matches.len() { index } else { 0 });
    }

    /// Rebuild the match list over `records`. Returns true if it changed.
    pub fn execute<'a>(&mut self, records: impl Iterator<Item = &'a LineRecord>) -> bool {
        let Some(pattern) = self.pattern.as_ref() else {
            let changed = !self.matches.is_empty();
            self.matches.clear();
            self.current_match = None;
            return changed;
        };

        let mut new_matches = Vec::new();
        for record in records {
            collect_matches(pattern, record, &mut new_matches);
        }

        let changed = new_matches != self.matches;
        self.matches = new_matches;
        self.fix_current();
        changed
    }

    /// Add the matches of a newly stored record
    pub fn scan_record(&mut self, record: &LineRecord) {
        if let Some(pattern) = self.pattern.as_ref() {
            collect_matches(pattern, record, &mut self.matches);
        }
    }

    /// Drop matches of records that were trimmed or rewritten
    pub fn forget_records(&mut self, keep: impl Fn(u64) -> bool) {
        let current_seq = self.current_match_seq();
        self.matches.retain(|m| keep(m.seq));
        self.current_match = current_seq
            .and_then(|seq| self.matches.iter().position(|m| m.seq >= seq));
        self.fix_current();
    }

    /// All matches within one record
    pub fn matches_for_seq(&self, seq: u64) -> &[SearchMatch] {
        let start = self.matches.partition_point(|m| m.seq < seq);
        let end = self.matches.partition_point(|m| m.seq <= seq);
        &self.matches[start..end]
    }

    /// Format the search status for display
    pub fn display_status(&self) -> String {
        if self.query.is_empty() {
            return String::new();
        }
        if let Some(error) = &self.error {
            return format!("[{}]", error);
        }
        if self.matches.is_empty() {
            return "[No matches]".to_string();
        }

        match self.current_match {
            Some(i) => format!("[{}/{} matches]", i + 1, self.matches.len()),
            None => format!("[{} matches]", self.matches.len()),
        }
    }

    fn fix_current(&mut self) {
        if self.matches.is_empty() {
            self.current_match = None;
        } else if self.current_match.map_or(true, |i| i >= self.matches.len()) {
            self.current_match = Some(0);
        }
    }
}

fn collect_matches(pattern: &SearchPattern, record: &LineRecord, out: &mut Vec<SearchMatch>) {
    for found in pattern.regex().find_iter(&record.text) {
        out.push(SearchMatch::new(record.seq, found.start(), found.end()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::LineKind;

    fn record(seq: u64, text: &str) -> LineRecord {
        let mut record = LineRecord::new(LineKind::Line, text, text);
        record.seq = seq;
        record
    }

    fn records() -> Vec<LineRecord> {
        vec![
            record(0, "Error: disk full"),
            record(1, "all good"),
            record(2, "error again, ERROR twice"),
        ]
    }

    #[test]
    fn test_search_pattern_is_case_insensitive() {
        let pattern = SearchPattern::new("disk").unwrap();
        assert!(pattern.is_match("DISK full"));
        assert!(!pattern.is_match("memory"));
    }

    #[test]
    fn test_search_pattern_rejects_invalid_regex() {
        let err = SearchPattern::new("[unclosed").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "[unclosed"));
    }

    #[test]
    fn test_execute_collects_all_matches() {
        let mut search = SearchState::new();
        search.set_query("error");
        let records = records();

        assert!(search.execute(records.iter()));
        assert_eq!(search.match_count(), 3);
        assert_eq!(search.current_match_seq(), Some(0));
        assert_eq!(search.matches_for_seq(2).len(), 2);
        assert_eq!(search.display_status(), "[1/3 matches]");
    }

    #[test]
    fn test_invalid_query_has_error_and_no_matches() {
        let mut search = SearchState::new();
        search.set_query("(bad");
        let records = records();
        search.execute(records.iter());

        assert!(!search.is_valid());
        assert!(search.error.is_some());
        assert!(!search.has_matches());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut search = SearchState::new();
        search.set_query("error");
        let records = records();
        search.execute(records.iter());

        search.prev_match();
        assert_eq!(search.current_match_index(), Some(3));
        search.next_match();
        assert_eq!(search.current_match_index(), Some(1));
    }

    #[test]
    fn test_jump_to_match_by_seq() {
        let mut search = SearchState::new();
        search.set_query("error");
        let records = records();
        search.execute(records.iter());

        search.jump_to_match(1);
        assert_eq!(search.current_match_seq(), Some(2));
        search.jump_to_match(9);
        assert_eq!(search.current_match_seq(), Some(0));
    }

    #[test]
    fn test_scan_and_forget_records() {
        let mut search = SearchState::new();
        search.set_query("error");
        let records = records();
        search.execute(records.iter());

        search.scan_record(&record(3, "one more error"));
        assert_eq!(search.match_count(), 4);

        search.forget_records(|seq| seq >= 2);
        assert_eq!(search.match_count(), 3);
        assert_eq!(search.matches[0].seq, 2);
        assert!(search.current_match.is_some());
    }
}
