//! Viewport index: prefix sums over record heights.
//!
//! `prefix[i]` is the sum of the heights of records `0..i`, so
//! `prefix[len]` is the total content height. Offsets resolve to records by
//! binary search over the non-decreasing prefix array.

use logdeck_core::prelude::*;

use crate::store::LineStore;

/// A record and the offset within it that an absolute offset falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub index: usize,
    pub offset: u64,
}

/// Records covering a vertical range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportWindow {
    pub start_index: usize,
    /// Absolute offset of the top of `start_index`
    pub start_offset: u64,
    /// Exclusive
    pub end_index: usize,
}

impl ViewportWindow {
    pub fn is_empty(&self) -> bool {
        self.end_index <= self.start_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewportIndex {
    prefix: Vec<u64>,
    /// `(base_seq, next_seq)` of the store at the last rebuild
    covered: Option<(u64, u64)>,
}

impl ViewportIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the current record heights, O(n)
    pub fn rebuild(&mut self, store: &LineStore) {
        self.prefix.clear();
        self.prefix.reserve(store.len() + 1);
        self.covered = Some((store.base_seq(), store.next_seq()));
        let mut sum = 0u64;
        self.prefix.push(sum);
        for record in store.iter() {
            sum += u64::from(record.height);
            self.prefix.push(sum);
        }
    }

    /// Whether the index was never built, was invalidated, or covers a
    /// different record range than `store`.
    ///
    /// A trim followed by an append keeps the length unchanged, so the
    /// covered sequence range is compared as well.
    pub fn is_stale(&self, store: &LineStore) -> bool {
        self.covered != Some((store.base_seq(), store.next_seq()))
            || self.prefix.len() != store.len() + 1
    }

    /// Mark the prefix sums out of date after an in-place height change
    pub fn invalidate(&mut self) {
        self.covered = None;
    }

    /// Number of records covered
    pub fn len(&self) -> usize {
        self.prefix.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_height(&self) -> u64 {
        self.prefix.last().copied().unwrap_or(0)
    }

    /// Absolute offset of the top of record `index` (clamped to the end)
    pub fn offset_of(&self, index: usize) -> u64 {
        let index = index.min(self.len());
        self.prefix.get(index).copied().unwrap_or(0)
    }

    pub fn height_of(&self, index: usize) -> u64 {
        match (self.prefix.get(index), self.prefix.get(index + 1)) {
            (Some(top), Some(bottom)) => bottom - top,
            _ => 0,
        }
    }

    pub fn prefix(&self) -> &[u64] {
        &self.prefix
    }

    /// Find the record at `offset`: the greatest `i` with `prefix[i] <= offset`.
    ///
    /// Offsets at or past the end resolve to the last non-empty record, with
    /// the in-record offset clamped to its height. `None` when nothing is
    /// visible.
    pub fn locate(&self, offset: u64) -> Option<Location> {
        let n = self.len();
        let total = self.total_height();
        if n == 0 || total == 0 {
            return None;
        }

        let starts = &self.prefix[..n];
        if offset >= total {
            let index = starts.partition_point(|&p| p < total) - 1;
            let height = self.height_of(index);
            return Some(Location {
                index,
                offset: (offset - self.prefix[index]).min(height),
            });
        }

        let index = starts.partition_point(|&p| p <= offset) - 1;
        Some(Location {
            index,
            offset: offset - self.prefix[index],
        })
    }

    /// Records intersecting `[top, bottom)`
    pub fn query(&self, top: u64, bottom: u64) -> ViewportWindow {
        let Some(start) = self.locate(top) else {
            return ViewportWindow::default();
        };
        let n = self.len();
        let end_index = if bottom <= top {
            start.index + 1
        } else {
            self.prefix[..n].partition_point(|&p| p < bottom)
        };

        ViewportWindow {
            start_index: start.index,
            start_offset: self.prefix[start.index],
            end_index: end_index.max(start.index + 1),
        }
    }
}

/// O(n) locate over stored heights, used while the index is stale
pub fn locate_linear(store: &LineStore, offset: u64) -> Option<Location> {
    trace!("viewport index stale, linear locate at {}", offset);
    let mut top = 0u64;
    let mut last_visible: Option<(usize, u64, u64)> = None;

    for (index, record) in store.iter().enumerate() {
        let height = u64::from(record.height);
        if height == 0 {
            continue;
        }
        if offset < top + height {
            return Some(Location {
                index,
                offset: offset - top,
            });
        }
        last_visible = Some((index, top, height));
        top += height;
    }

    last_visible.map(|(index, top, height)| Location {
        index,
        offset: (offset - top).min(height),
    })
}
