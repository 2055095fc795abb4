//! Engine facade.
//!
//! [`LogEngine`] owns every component and is the only entry point for the
//! host. Ingestion runs grouping and per-record filter evaluation; every
//! filter, layout or collapse change runs an anchored recompute:
//!
//! 1. capture the scroll anchor (bottom when pinned, else the record at the
//!    scroll offset)
//! 2. apply the mutation
//! 3. recompute heights in one pass
//! 4. rebuild the viewport index
//! 5. update content bounds and restore the anchor
//! 6. recompute the visible window

use std::collections::HashSet;

use logdeck_core::prelude::*;
use logdeck_core::{
    category, Annotation, CollapseMode, GroupId, Level, LineKind, LineRecord, RawLine,
};

use crate::config::{FilterSettings, Settings, ThreadSettings};
use crate::filter::{ExclusionRule, FilterComposer, LineMatcher, SearchState};
use crate::grouping::{
    ClassifiedLine, FrameOutcome, StackTraceGrouper, ThreadDump, ThreadDumpGrouper, ThreadFeed,
};
use crate::layout::Layout;
use crate::repeat::{RepeatCollapser, RepeatDecision};
use crate::scroll::{Anchor, ScrollState};
use crate::store::{Group, GroupKind, LineStore, TrimReport};
use crate::tags::TagCounts;
use crate::viewport::{locate_linear, Location, ViewportIndex, ViewportWindow};


/// Incremental log store with a virtualized viewport
#[derive(Debug)]
pub struct LogEngine {
    layout: Layout,
    default_collapse: CollapseMode,
    thread_settings: ThreadSettings,
    filter_settings: FilterSettings,
    max_lines: usize,

    store: LineStore,
    tags: TagCounts,
    stack: StackTraceGrouper,
    threads: ThreadDumpGrouper,
    repeat: RepeatCollapser,
    filters: FilterComposer,
    index: ViewportIndex,
    scroll: ScrollState,
    search: SearchState,
    /// Search-as-filter uses the current search query as its matcher
    search_filter_follows_query: bool,
    window: ViewportWindow,
}

impl Default for LogEngine {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl LogEngine {
    pub fn new(settings: &Settings) -> Self {
        let mut scroll = ScrollState::new();
        scroll.overscan_rows = settings.layout.overscan_rows;

        Self {
            layout: Layout::from(&settings.layout),
            default_collapse: settings.layout.default_collapse,
            thread_settings: settings.threads.clone(),
            filter_settings: settings.filters.clone(),
            max_lines: settings.store.max_lines,
            store: LineStore::new(),
            tags: TagCounts::new(),
            stack: StackTraceGrouper::new(settings.layout.default_collapse),
            threads: ThreadDumpGrouper::new(),
            repeat: RepeatCollapser::new(&settings.repeat),
            filters: initial_filters(&settings.filters),
            index: ViewportIndex::new(),
            scroll,
            search: SearchState::new(),
            search_filter_follows_query: false,
            window: ViewportWindow::default(),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────

    /// Classify, group and store one line.
    ///
    /// Heights of the new records are evaluated immediately; the viewport
    /// index is left stale until [`recompute_and_index`](Self::recompute_and_index).
    pub fn append_line(&mut self, raw: RawLine) {
        self.index.invalidate();
        self.ingest(ClassifiedLine::new(raw));
        self.enforce_capacity();
    }

    /// Append a batch, then run one anchored recompute
    pub fn append_lines(&mut self, lines: impl IntoIterator<Item = RawLine>) {
        let mut count = 0usize;
        for raw in lines {
            self.append_line(raw);
            count += 1;
        }
        trace!("appended {} lines, {} stored", count, self.store.len());
        self.recompute_and_index();
    }

    /// Flush open stack and thread groups
    pub fn end_of_stream(&mut self) {
        self.index.invalidate();
        self.flush_threads();
        self.finalize_stack();
        self.enforce_capacity();
    }

    /// Recompute every height and rebuild the index, keeping the scroll anchor
    pub fn recompute_and_index(&mut self) {
        self.anchored(|_| {});
    }

    /// Drop all content and reset every component.
    ///
    /// Filters and the search query return to their configured initial
    /// state. Layout and retention settings are kept.
    pub fn clear(&mut self) {
        self.store.clear(&mut self.tags);
        self.stack.reset();
        self.threads.reset();
        self.repeat.reset();
        self.filters = initial_filters(&self.filter_settings);
        self.search.clear();
        self.search_filter_follows_query = false;
        self.scroll.reset();
        self.index.rebuild(&self.store);
        self.scroll.update_content_height(0);
        self.window = ViewportWindow::default();
        debug!("engine cleared");
    }

    fn ingest(&mut self, line: ClassifiedLine) {
        if line.is_marker() {
            self.flush_threads();
            self.finalize_stack();
            self.repeat.reset();
            self.store_line(line, LineKind::Marker);
            return;
        }

        if line.is_thread_header() {
            self.finalize_stack();
        }
        let line = match self.threads.feed(line) {
            ThreadFeed::Buffered => {
                self.repeat.reset();
                return;
            }
            ThreadFeed::NotConsumed(line) => line,
        };
        self.flush_threads();

        if line.is_frame() {
            self.repeat.reset();
            let outcome = self.stack.push_frame(line, &mut self.store, &mut self.tags);
            self.after_frame(outcome);
            return;
        }

        self.finalize_stack();
        self.append_plain(line);
    }

    fn after_frame(&mut self, outcome: FrameOutcome) {
        let Some(last) = self.store.len().checked_sub(1) else {
            return;
        };
        if let FrameOutcome::Opened(id) | FrameOutcome::Attached(id) = outcome {
            // Promotion and new class tags both change the header
            if let Some(header) = self.store.header_index(id) {
                self.filters.refresh(&mut self.store, header, &self.layout);
            }
        }
        self.filters
            .refresh_appended(&mut self.store, last, &self.layout);
        if let Some(record) = self.store.get(last) {
            self.search.scan_record(record);
        }
    }

    fn append_plain(&mut self, line: ClassifiedLine) {
        let last_seq = self.store.last().map(|r| r.seq);
        let timestamp = line.raw.timestamp;
        let decision =
            self.repeat
                .observe(line.classification.level, &line.text, timestamp, last_seq);

        match decision {
            RepeatDecision::Store => {
                self.store_line(line, LineKind::Line);
            }
            RepeatDecision::Notify {
                repeat_count,
                content,
            } => {
                let mut record = line.into_record(LineKind::RepeatNotification);
                record.repeat_count = repeat_count;
                record.text = content.clone();
                record.content = content;
                record.path = None;
                let seq = self.push_record(record);
                self.repeat.set_notification(seq);
            }
            RepeatDecision::Extend {
                seq,
                repeat_count,
                content,
            } => {
                let Some(index) = self.store.index_of(seq) else {
                    debug!("repeat notification #{} no longer stored", seq);
                    return;
                };
                self.store.update(index, &mut self.tags, |record| {
                    record.repeat_count = repeat_count;
                    record.text = content.clone();
                    record.content = content;
                    record.timestamp = timestamp;
                });
                self.filters.refresh(&mut self.store, index, &self.layout);
                self.search.forget_records(|s| s != seq);
                if let Some(record) = self.store.get(index) {
                    self.search.scan_record(record);
                }
            }
        }
    }

    fn store_line(&mut self, line: ClassifiedLine, kind: LineKind) -> u64 {
        self.push_record(line.into_record(kind))
    }

    fn push_record(&mut self, record: LineRecord) -> u64 {
        let seq = self.store.push(record, &mut self.tags);
        let index = self.store.len() - 1;
        self.filters
            .refresh_appended(&mut self.store, index, &self.layout);
        if let Some(record) = self.store.get(index) {
            self.search.scan_record(record);
        }
        seq
    }

    fn finalize_stack(&mut self) {
        let Some(finalized) = self.stack.finalize(&mut self.store) else {
            return;
        };
        if finalized.duplicate_of.is_some() {
            for index in self.store.frame_indices(finalized.group) {
                self.filters.refresh(&mut self.store, index, &self.layout);
            }
        }
    }

    fn flush_threads(&mut self) {
        if let Some(dump) = self.threads.flush(&self.thread_settings) {
            self.emit_thread_dump(dump);
        }
    }

    fn emit_thread_dump(&mut self, dump: ThreadDump) {
        if let Some(summary) = dump.summary {
            let mut marker = LineRecord::new(LineKind::Marker, summary.text.clone(), summary.text);
            marker.category = category::CONSOLE.to_string();
            if summary.contention {
                marker.level = Level::Warning;
                marker.annotation = Some(Annotation::Contention);
            }
            self.push_record(marker);
        }

        for block in dump.blocks {
            let seq = self.store.next_seq();
            let id = GroupId(seq);

            let mut header = block.header.into_record(LineKind::StackHeader);
            header.group_id = Some(id);
            if block.blocker {
                header.annotation = Some(Annotation::Blocker);
            }

            let frames: Vec<LineRecord> = block
                .lines
                .into_iter()
                .enumerate()
                .map(|(frame_index, line)| {
                    let mut frame = line.into_record(LineKind::StackFrame);
                    frame.group_id = Some(id);
                    frame.frame_index = frame_index;
                    frame.level = header.level;
                    frame
                })
                .collect();
            for tag in frames.iter().flat_map(|f| f.class_tags.iter()) {
                if !header.class_tags.contains(tag) {
                    header.class_tags.push(tag.clone());
                }
            }

            let mut group = Group::new(seq, GroupKind::Thread, self.default_collapse);
            group.frame_count = frames.len();
            group.thread = Some(block.thread);
            self.store.insert_group(group);

            self.push_record(header);
            for frame in frames {
                self.push_record(frame);
            }
        }
    }

    fn enforce_capacity(&mut self) {
        if self.store.len() <= self.max_lines {
            return;
        }
        let report = self.store.trim_to_capacity(
            self.max_lines,
            self.stack.open_group(),
            &mut self.tags,
        );
        self.apply_trim(report);
    }

    fn apply_trim(&mut self, report: TrimReport) {
        if report.removed == 0 {
            return;
        }
        self.index.invalidate();
        self.scroll.content_removed_above(report.removed_height);
        let base_seq = self.store.base_seq();
        self.search.forget_records(|seq| seq >= base_seq);
    }

    // ─────────────────────────────────────────────────────────
    // Anchored recompute
    // ─────────────────────────────────────────────────────────

    fn anchored<F>(&mut self, mutate: F)
    where
        F: FnOnce(&mut Self),
    {
        let anchor = self.capture_anchor();
        mutate(self);
        self.filters
            .recompute_heights(&mut self.store, &self.layout);
        self.index.rebuild(&self.store);
        self.scroll
            .update_content_height(self.index.total_height());
        self.restore_anchor(anchor);
        self.update_window();
    }

    fn capture_anchor(&self) -> Anchor {
        if self.scroll.pinned {
            Anchor::Bottom
        } else {
            Anchor::from(self.locate(self.scroll.offset))
        }
    }

    fn restore_anchor(&mut self, anchor: Anchor) {
        match anchor {
            Anchor::Bottom => self.scroll.scroll_to_bottom(),
            Anchor::Line { index, offset } => {
                let index = index.min(self.store.len());
                let top = self.index.offset_of(index);
                let within = offset.min(self.index.height_of(index));
                self.scroll.offset = (top + within).min(self.scroll.max_offset());
            }
            Anchor::Top => self.scroll.offset = 0,
        }
    }

    fn update_window(&mut self) {
        let top = self.scroll.offset;
        let bottom = top + self.scroll.viewport_height.max(1);
        let visible = self.index.query(top, bottom);
        if visible.is_empty() {
            self.window = ViewportWindow::default();
            return;
        }

        let overscan = self.scroll.overscan_rows;
        let start_index = visible.start_index.saturating_sub(overscan);
        self.window = ViewportWindow {
            start_index,
            start_offset: self.index.offset_of(start_index),
            end_index: (visible.end_index + overscan).min(self.store.len()),
        };
    }

    /// Bring the index up to date without moving the anchor
    fn refresh_window(&mut self) {
        if self.index.is_stale(&self.store) {
            self.index.rebuild(&self.store);
            self.scroll
                .update_content_height(self.index.total_height());
        }
        self.update_window();
    }

    // ─────────────────────────────────────────────────────────
    // Filters
    // ─────────────────────────────────────────────────────────

    pub fn set_level_filter(&mut self, levels: HashSet<Level>) {
        debug!("level filter: {:?}", levels);
        self.anchored(move |e| e.filters.set_enabled_levels(levels));
    }

    pub fn set_context_lines(&mut self, lines: usize) {
        self.anchored(move |e| e.filters.set_context_lines(lines));
    }

    pub fn set_category_filter(&mut self, hidden: HashSet<String>) {
        self.anchored(move |e| e.filters.set_hidden_categories(hidden));
    }

    pub fn set_source_tag_filter(&mut self, hidden: HashSet<String>) {
        self.anchored(move |e| e.filters.set_hidden_source_tags(hidden));
    }

    pub fn set_class_tag_filter(&mut self, hidden: HashSet<String>) {
        self.anchored(move |e| e.filters.set_hidden_class_tags(hidden));
    }

    /// Replace the exclusion rules. Patterns that do not compile are dropped.
    pub fn set_exclusion_rules(&mut self, rules: Vec<ExclusionRule>) {
        self.anchored(move |e| e.filters.set_exclusion_rules(rules));
    }

    pub fn set_exclusion_enabled(&mut self, enabled: bool) {
        self.anchored(move |e| e.filters.set_exclusion_enabled(enabled));
    }

    pub fn set_app_only(&mut self, app_only: bool) {
        self.anchored(move |e| e.filters.set_app_only(app_only));
    }

    pub fn set_app_scope(&mut self, roots: Vec<String>) {
        self.anchored(move |e| e.filters.set_app_roots(roots));
    }

    /// Enable or disable search-as-filter.
    ///
    /// Without an explicit matcher the current search query is used and
    /// followed by later [`set_search_query`](Self::set_search_query) calls.
    pub fn set_search_filter_mode(&mut self, enabled: bool, matcher: Option<Box<dyn LineMatcher>>) {
        self.search_filter_follows_query = enabled && matcher.is_none();
        let matcher = match matcher {
            Some(matcher) => Some(matcher),
            None if enabled => self.query_matcher(),
            None => None,
        };
        self.anchored(move |e| e.filters.set_search_filter(enabled, matcher));
    }

    fn query_matcher(&self) -> Option<Box<dyn LineMatcher>> {
        self.search
            .pattern()
            .cloned()
            .map(|pattern| Box::new(pattern) as Box<dyn LineMatcher>)
    }

    pub fn filters(&self) -> &FilterComposer {
        &self.filters
    }

    // ─────────────────────────────────────────────────────────
    // Groups
    // ─────────────────────────────────────────────────────────

    /// Cycle a group through preview → expanded → collapsed
    pub fn toggle_group_collapse(&mut self, id: GroupId) {
        if self.store.group(id).is_none() {
            debug!("toggle of unknown {}", id);
            return;
        }
        self.anchored(move |e| {
            if let Some(group) = e.store.group_mut(id) {
                group.collapse = group.collapse.cycle();
            }
        });
    }

    pub fn collapse_all(&mut self) {
        self.set_all_groups(CollapseMode::Collapsed);
    }

    pub fn expand_all(&mut self) {
        self.set_all_groups(CollapseMode::Expanded);
    }

    fn set_all_groups(&mut self, collapse: CollapseMode) {
        self.anchored(move |e| {
            for group in e.store.groups_mut() {
                group.collapse = collapse;
            }
        });
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.store.group(id)
    }

    // ─────────────────────────────────────────────────────────
    // Viewport
    // ─────────────────────────────────────────────────────────

    /// Records intersecting `[top, bottom)`
    pub fn query_viewport(&self, top: u64, bottom: u64) -> ViewportWindow {
        if self.index.is_stale(&self.store) {
            let mut index = ViewportIndex::new();
            index.rebuild(&self.store);
            return index.query(top, bottom);
        }
        self.index.query(top, bottom)
    }

    /// Record at an absolute offset. Falls back to a linear scan while the
    /// index is stale.
    pub fn locate(&self, offset: u64) -> Option<Location> {
        if self.index.is_stale(&self.store) {
            locate_linear(&self.store, offset)
        } else {
            self.index.locate(offset)
        }
    }

    pub fn is_index_stale(&self) -> bool {
        self.index.is_stale(&self.store)
    }

    pub fn index(&self) -> &ViewportIndex {
        &self.index
    }

    /// Window computed by the last recompute or scroll, overscan included
    pub fn visible_window(&self) -> ViewportWindow {
        self.window
    }

    /// Records of `window` in order
    pub fn window_records(
        &self,
        window: ViewportWindow,
    ) -> impl Iterator<Item = &LineRecord> + '_ {
        self.store
            .iter()
            .skip(window.start_index)
            .take(window.len())
    }

    // ─────────────────────────────────────────────────────────
    // Scrolling
    // ─────────────────────────────────────────────────────────

    pub fn set_viewport_height(&mut self, height: u64) {
        self.scroll.set_viewport_height(height);
        self.refresh_window();
    }

    pub fn scroll_up(&mut self, delta: u64) {
        self.scroll.scroll_up(delta);
        self.refresh_window();
    }

    pub fn scroll_down(&mut self, delta: u64) {
        self.refresh_window();
        self.scroll.scroll_down(delta);
        self.update_window();
    }

    pub fn scroll_to(&mut self, offset: u64) {
        self.refresh_window();
        self.scroll.scroll_to(offset);
        self.update_window();
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll.scroll_to_top();
        self.refresh_window();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.refresh_window();
        self.scroll.scroll_to_bottom();
        self.update_window();
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll.offset
    }

    pub fn is_pinned(&self) -> bool {
        self.scroll.pinned
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    /// Store index of the record at the top of the viewport
    pub fn top_index(&self) -> Option<usize> {
        self.locate(self.scroll.offset).map(|l| l.index)
    }

    /// Scroll so that record `index` is at the top, expanding its group if
    /// collapse hides it
    pub fn reveal(&mut self, index: usize) {
        let hidden_by_collapse = self
            .store
            .get(index)
            .filter(|r| r.is_frame() && r.height == 0 && !r.flags.any())
            .and_then(|r| r.group_id)
            .filter(|id| self.store.group(*id).is_some_and(|g| !g.is_duplicate()));

        if let Some(id) = hidden_by_collapse {
            self.anchored(move |e| {
                if let Some(group) = e.store.group_mut(id) {
                    group.collapse = CollapseMode::Expanded;
                }
            });
        } else {
            self.refresh_window();
        }

        let offset = self.index.offset_of(index);
        self.scroll.scroll_to(offset);
        self.update_window();
    }

    // ─────────────────────────────────────────────────────────
    // Layout and retention
    // ─────────────────────────────────────────────────────────

    pub fn set_layout(&mut self, row_height: u32, marker_height: u32) {
        self.anchored(move |e| {
            e.layout.row_height = row_height;
            e.layout.marker_height = marker_height;
        });
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Change the retention cap, trimming immediately if needed
    pub fn set_max_lines(&mut self, max_lines: usize) {
        self.max_lines = max_lines;
        self.enforce_capacity();
        self.recompute_and_index();
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    // ─────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────

    /// Set the search query and rebuild the match list
    pub fn set_search_query(&mut self, query: &str) {
        self.search.set_query(query);
        self.search.execute(self.store.iter());

        if self.search_filter_follows_query && self.filters.is_search_filter_enabled() {
            let matcher = self.query_matcher();
            self.anchored(move |e| e.filters.set_search_filter(true, matcher));
        }
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    /// Move to the next match and scroll to it
    pub fn next_match(&mut self) -> Option<usize> {
        self.search.next_match();
        self.jump_to_current_match()
    }

    /// Move to the previous match and scroll to it
    pub fn prev_match(&mut self) -> Option<usize> {
        self.search.prev_match();
        self.jump_to_current_match()
    }

    /// Scroll to the record holding the current match
    pub fn jump_to_current_match(&mut self) -> Option<usize> {
        let seq = self.search.current_match_seq()?;
        let index = self.store.index_of(seq)?;
        self.reveal(index);
        Some(index)
    }

    // ─────────────────────────────────────────────────────────
    // Error navigation
    // ─────────────────────────────────────────────────────────

    /// Stored error records (frames excluded)
    pub fn error_count(&self) -> usize {
        self.store.error_count()
    }

    fn is_navigable_error(record: &LineRecord) -> bool {
        record.is_error() && !record.is_frame() && record.is_visible()
    }

    /// First visible error after `from`, wrapping to the first one
    pub fn next_error(&self, from: usize) -> Option<usize> {
        let errors: Vec<usize> = self.visible_errors().collect();
        errors
            .iter()
            .copied()
            .find(|&i| i > from)
            .or_else(|| errors.first().copied())
    }

    /// Last visible error before `from`, wrapping to the last one
    pub fn prev_error(&self, from: usize) -> Option<usize> {
        let errors: Vec<usize> = self.visible_errors().collect();
        errors
            .iter()
            .rev()
            .copied()
            .find(|&i| i < from)
            .or_else(|| errors.last().copied())
    }

    fn visible_errors(&self) -> impl Iterator<Item = usize> + '_ {
        self.store
            .iter()
            .enumerate()
            .filter(|(_, r)| Self::is_navigable_error(r))
            .map(|(i, _)| i)
    }

    /// Scroll to the next error after the top of the viewport
    pub fn jump_to_next_error(&mut self) -> Option<usize> {
        let from = self.top_index().unwrap_or(0);
        let index = self.next_error(from)?;
        self.reveal(index);
        Some(index)
    }

    /// Scroll to the previous error before the top of the viewport
    pub fn jump_to_prev_error(&mut self) -> Option<usize> {
        let from = self.top_index().unwrap_or(0);
        let index = self.prev_error(from)?;
        self.reveal(index);
        Some(index)
    }

    // ─────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────

    pub fn store(&self) -> &LineStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LineRecord> {
        self.store.get(index)
    }

    pub fn records(&self) -> impl Iterator<Item = &LineRecord> + '_ {
        self.store.iter()
    }

    /// Source/class tag counts for filter menus
    pub fn tag_counts(&self) -> &TagCounts {
        &self.tags
    }

    pub fn total_height(&self) -> u64 {
        self.store.total_height()
    }

    /// Thread blocks waiting for the end of their run
    pub fn buffered_threads(&self) -> usize {
        self.threads.buffered_threads()
    }
}

fn initial_filters(settings: &FilterSettings) -> FilterComposer {
    let mut filters = FilterComposer::new();
    filters.set_context_lines(settings.context_lines);
    filters.set_app_roots(settings.app_roots.clone());
    filters
}
