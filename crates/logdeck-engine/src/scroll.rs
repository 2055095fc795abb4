//! Scroll state: offset, viewport bounds and bottom pinning.
//!
//! Offsets and heights are in layout units, the same units as record
//! heights.

use crate::viewport::Location;

/// Default overscan rows for virtualized rendering
const DEFAULT_OVERSCAN_ROWS: usize = 10;

/// Scroll position captured before a mutation and restored after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Follow the newest content
    Bottom,
    /// Keep this record (and the offset within it) at the top
    Line { index: usize, offset: u64 },
    /// Nothing was visible
    Top,
}

impl From<Option<Location>> for Anchor {
    fn from(location: Option<Location>) -> Self {
        match location {
            Some(location) => Anchor::Line {
                index: location.index,
                offset: location.offset,
            },
            None => Anchor::Top,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollState {
    /// Current vertical scroll offset from top
    pub offset: u64,
    /// Whether the view follows new content
    pub pinned: bool,
    /// Total content height
    pub content_height: u64,
    /// Visible height
    pub viewport_height: u64,
    /// Rows rendered above and below the viewport
    pub overscan_rows: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollState {
    pub fn new() -> Self {
        Self {
            offset: 0,
            pinned: true,
            content_height: 0,
            viewport_height: 0,
            overscan_rows: DEFAULT_OVERSCAN_ROWS,
        }
    }

    pub fn max_offset(&self) -> u64 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }

    /// Scroll up; unpins from the bottom
    pub fn scroll_up(&mut self, delta: u64) {
        self.offset = self.offset.saturating_sub(delta);
        self.pinned = false;
    }

    /// Scroll down; re-pins when the bottom is reached
    pub fn scroll_down(&mut self, delta: u64) {
        self.offset = self.offset.saturating_add(delta).min(self.max_offset());
        if self.is_at_bottom() {
            self.pinned = true;
        }
    }

    pub fn scroll_to(&mut self, offset: u64) {
        self.offset = offset.min(self.max_offset());
        self.pinned = offset >= self.max_offset();
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.pinned = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
        self.pinned = true;
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.viewport_height);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.viewport_height);
    }

    pub fn set_viewport_height(&mut self, height: u64) {
        self.viewport_height = height;
        self.clamp();
    }

    /// Update the content bounds; a pinned view jumps to the new bottom
    pub fn update_content_height(&mut self, height: u64) {
        self.content_height = height;
        self.clamp();
    }

    /// Shift the view up by content removed above it
    pub fn content_removed_above(&mut self, height: u64) {
        if !self.pinned {
            self.offset = self.offset.saturating_sub(height);
        }
    }

    fn clamp(&mut self) {
        if self.pinned {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn reset(&mut self) {
        let overscan = self.overscan_rows;
        let viewport = self.viewport_height;
        *self = Self::new();
        self.overscan_rows = overscan;
        self.viewport_height = viewport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(content: u64, viewport: u64) -> ScrollState {
        let mut state = ScrollState::new();
        state.set_viewport_height(viewport);
        state.update_content_height(content);
        state
    }

    #[test]
    fn test_pinned_follows_content() {
        let mut state = state(100, 40);
        assert_eq!(state.offset, 60);
        state.update_content_height(200);
        assert_eq!(state.offset, 160);
    }

    #[test]
    fn test_scroll_up_unpins() {
        let mut state = state(100, 40);
        state.scroll_up(10);
        assert!(!state.pinned);
        assert_eq!(state.offset, 50);

        state.update_content_height(200);
        assert_eq!(state.offset, 50);
    }

    #[test]
    fn test_scroll_down_repins_at_bottom() {
        let mut state = state(100, 40);
        state.scroll_to_top();
        state.scroll_down(30);
        assert!(!state.pinned);
        state.scroll_down(1_000);
        assert_eq!(state.offset, 60);
        assert!(state.pinned);
    }

    #[test]
    fn test_scroll_to_clamps() {
        let mut state = state(100, 40);
        state.scroll_to(20);
        assert_eq!(state.offset, 20);
        assert!(!state.pinned);
        state.scroll_to(500);
        assert_eq!(state.offset, 60);
        assert!(state.pinned);
    }

    #[test]
    fn test_content_removed_above() {
        let mut state = state(1_000, 40);
        state.scroll_to(500);
        state.content_removed_above(120);
        assert_eq!(state.offset, 380);

        state.scroll_to_bottom();
        state.content_removed_above(120);
        assert_eq!(state.offset, 960);
    }

    #[test]
    fn test_content_shrink_clamps_offset() {
        let mut state = state(1_000, 40);
        state.scroll_to(900);
        state.update_content_height(100);
        assert_eq!(state.offset, 60);
    }

    #[test]
    fn test_anchor_from_location() {
        assert_eq!(Anchor::from(None), Anchor::Top);
        assert_eq!(
            Anchor::from(Some(Location { index: 3, offset: 5 })),
            Anchor::Line { index: 3, offset: 5 }
        );
    }
}
