//! Line store: the record sequence plus the group table.
//!
//! Records keep an absolute `seq`; the store index of a record is
//! `seq - base_seq` and stays valid until the next front trim. Frames point at
//! their header through a [`GroupId`] resolved via the group table, so
//! trimming a header never leaves a dangling reference.

use std::collections::{HashMap, VecDeque};

use logdeck_core::prelude::*;
use logdeck_core::{CollapseMode, FilterFlags, GroupId, LineRecord, ThreadHeader};

use crate::tags::TagCounts;

/// What produced a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    StackTrace,
    Thread,
}

/// Group table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub kind: GroupKind,
    pub header_seq: u64,
    pub frame_count: usize,
    pub collapse: CollapseMode,
    /// Number of groups seen with this signature, this one included
    pub dup_count: usize,
    pub duplicate_of: Option<GroupId>,
    /// Frame-text hash, set once the group is finalized
    pub signature: Option<u64>,
    /// Parsed header of a thread group
    pub thread: Option<ThreadHeader>,
}

impl Group {
    pub fn new(header_seq: u64, kind: GroupKind, collapse: CollapseMode) -> Self {
        Self {
            id: GroupId(header_seq),
            kind,
            header_seq,
            frame_count: 0,
            collapse,
            dup_count: 1,
            duplicate_of: None,
            signature: None,
            thread: None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }
}

/// Outcome of a front trim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimReport {
    pub removed: usize,
    pub removed_height: u64,
}

/// Ordered record storage with O(1) append and front trim
#[derive(Debug, Default)]
pub struct LineStore {
    records: VecDeque<LineRecord>,
    base_seq: u64,
    next_seq: u64,
    groups: HashMap<GroupId, Group>,
    signatures: HashMap<u64, GroupId>,
    total_height: u64,
    error_count: usize,
}

impl LineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, assigning its sequence number. Registers its tags.
    pub fn push(&mut self, mut record: LineRecord, tags: &mut TagCounts) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.records.is_empty() {
            self.base_seq = seq;
        }

        record.seq = seq;
        tags.register(&record);
        self.total_height += u64::from(record.height);
        if counts_as_error(&record) {
            self.error_count += 1;
        }
        self.records.push_back(record);
        seq
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LineRecord> {
        self.records.get(index)
    }

    pub fn last(&self) -> Option<&LineRecord> {
        self.records.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LineRecord> + ExactSizeIterator + '_ {
        self.records.iter()
    }

    /// Sequence number of the front record
    pub fn base_seq(&self) -> u64 {
        self.base_seq
    }

    /// Sequence number the next pushed record will get
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Store index of the record with `seq`, if still stored
    pub fn index_of(&self, seq: u64) -> Option<usize> {
        if seq < self.base_seq || seq >= self.next_seq {
            return None;
        }
        let index = (seq - self.base_seq) as usize;
        (index < self.records.len()).then_some(index)
    }

    pub fn get_by_seq(&self, seq: u64) -> Option<&LineRecord> {
        self.index_of(seq).and_then(|i| self.records.get(i))
    }

    /// Sum of all record heights
    pub fn total_height(&self) -> u64 {
        self.total_height
    }

    /// Stored error-level records, frames excluded
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Modify a record in place.
    ///
    /// Tags are re-registered and the height/error totals adjusted, so the
    /// closure may change any field except `seq`.
    pub fn update<F>(&mut self, index: usize, tags: &mut TagCounts, f: F) -> bool
    where
        F: FnOnce(&mut LineRecord),
    {
        let Some(record) = self.records.get_mut(index) else {
            debug!("update of missing record at index {}", index);
            return false;
        };

        tags.unregister(record);
        let old_height = u64::from(record.height);
        let was_error = counts_as_error(record);
        let seq = record.seq;

        f(record);

        record.seq = seq;
        tags.register(record);
        self.total_height = self.total_height - old_height + u64::from(record.height);
        match (was_error, counts_as_error(record)) {
            (false, true) => self.error_count += 1,
            (true, false) => self.error_count = self.error_count.saturating_sub(1),
            _ => {}
        }
        true
    }

    /// Recompute flags and height of one record
    pub fn refresh<F>(&mut self, index: usize, f: F)
    where
        F: FnOnce(&LineRecord, Option<&Group>) -> (FilterFlags, u32),
    {
        let Some(record) = self.records.get_mut(index) else {
            return;
        };
        let group = record.group_id.and_then(|id| self.groups.get(&id));
        let (flags, height) = f(record, group);
        self.total_height = self.total_height - u64::from(record.height) + u64::from(height);
        record.flags = flags;
        record.height = height;
    }

    /// Recompute flags and height of every record in one pass
    pub fn refresh_all<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, &LineRecord, Option<&Group>) -> (FilterFlags, u32),
    {
        let mut total = 0u64;
        for (i, record) in self.records.iter_mut().enumerate() {
            let group = record.group_id.and_then(|id| self.groups.get(&id));
            let (flags, height) = f(i, record, group);
            record.flags = flags;
            record.height = height;
            total += u64::from(height);
        }
        self.total_height = total;
    }

    // ─────────────────────────────────────────────────────────
    // Group table
    // ─────────────────────────────────────────────────────────

    pub fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.id, group);
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.groups.values()
    }

    pub fn groups_mut(&mut self) -> impl Iterator<Item = &mut Group> + '_ {
        self.groups.values_mut()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Store index of a group's header
    pub fn header_index(&self, id: GroupId) -> Option<usize> {
        self.groups
            .get(&id)
            .and_then(|group| self.index_of(group.header_seq))
    }

    /// Store indices of a group's frames
    pub fn frame_indices(&self, id: GroupId) -> std::ops::Range<usize> {
        match (self.header_index(id), self.groups.get(&id)) {
            (Some(header), Some(group)) => {
                let end = (header + 1 + group.frame_count).min(self.records.len());
                header + 1..end
            }
            _ => 0..0,
        }
    }

    /// Group that first registered `signature`, if it is still stored
    pub fn signature_owner(&self, signature: u64) -> Option<GroupId> {
        self.signatures
            .get(&signature)
            .copied()
            .filter(|id| self.groups.contains_key(id))
    }

    pub fn record_signature(&mut self, signature: u64, id: GroupId) {
        self.signatures.insert(signature, id);
    }

    // ─────────────────────────────────────────────────────────
    // Retention
    // ─────────────────────────────────────────────────────────

    /// Remove records from the front until `len <= max_lines`.
    ///
    /// Frames whose header went with the trim are removed too, so a group is
    /// never split and the store may end up below the cap. The header of the
    /// `open` group stops the trim: a trace still receiving frames stays
    /// whole and the store may exceed the cap until it closes.
    pub fn trim_to_capacity(
        &mut self,
        max_lines: usize,
        open: Option<GroupId>,
        tags: &mut TagCounts,
    ) -> TrimReport {
        let mut report = TrimReport::default();

        while let Some(front) = self.records.front() {
            if front.is_header() && open.is_some() && front.group_id == open {
                break;
            }
            let over_cap = self.records.len() > max_lines;
            let orphan_frame = front.is_frame()
                && front
                    .group_id
                    .map_or(true, |id| !self.groups.contains_key(&id));
            if !over_cap && !orphan_frame {
                break;
            }

            let Some(record) = self.records.pop_front() else {
                break;
            };
            self.forget(&record, tags);
            report.removed += 1;
            report.removed_height += u64::from(record.height);
        }

        self.base_seq = self
            .records
            .front()
            .map_or(self.next_seq, |record| record.seq);

        if report.removed > 0 {
            trace!(
                "trimmed {} records ({} height units), {} remain",
                report.removed,
                report.removed_height,
                self.records.len()
            );
        }
        report
    }

    fn forget(&mut self, record: &LineRecord, tags: &mut TagCounts) {
        tags.unregister(record);
        self.total_height -= u64::from(record.height);
        if counts_as_error(record) {
            self.error_count = self.error_count.saturating_sub(1);
        }

        if record.is_header() {
            if let Some(group) = record.group_id.and_then(|id| self.groups.remove(&id)) {
                if let Some(signature) = group.signature {
                    if self.signatures.get(&signature) == Some(&group.id) {
                        self.signatures.remove(&signature);
                    }
                }
            }
        }
    }

    /// Drop every record and group. Sequence numbers keep increasing.
    pub fn clear(&mut self, tags: &mut TagCounts) {
        self.records.clear();
        self.groups.clear();
        self.signatures.clear();
        self.total_height = 0;
        self.error_count = 0;
        self.base_seq = self.next_seq;
        tags.clear();
    }
}

/// Frames carry their header's level; only the header counts
fn counts_as_error(record: &LineRecord) -> bool {
    record.is_error() && !record.is_frame()
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::{Level, LineKind};

    fn line(text: &str, height: u32) -> LineRecord {
        let mut record = LineRecord::new(LineKind::Line, text, text);
        record.height = height;
        record
    }

    fn push_group(store: &mut LineStore, tags: &mut TagCounts, frames: usize) -> GroupId {
        let mut header = line("Exception", 18);
        header.kind = LineKind::StackHeader;
        let seq = store.next_seq();
        header.group_id = Some(GroupId(seq));
        store.push(header, tags);

        let mut group = Group::new(seq, GroupKind::StackTrace, CollapseMode::Preview);
        group.frame_count = frames;
        store.insert_group(group);

        for i in 0..frames {
            let mut frame = line("at x", 18);
            frame.kind = LineKind::StackFrame;
            frame.group_id = Some(GroupId(seq));
            frame.frame_index = i;
            store.push(frame, tags);
        }
        GroupId(seq)
    }

    #[test]
    fn test_push_assigns_increasing_seq() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        let a = store.push(line("a", 18), &mut tags);
        let b = store.push(line("b", 18), &mut tags);

        assert_eq!((a, b), (0, 1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_height(), 36);
        assert_eq!(store.index_of(1), Some(1));
        assert_eq!(store.index_of(2), None);
    }

    #[test]
    fn test_trim_keeps_seq_stable() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        for i in 0..5 {
            store.push(line(&format!("l{}", i), 18), &mut tags);
        }

        let report = store.trim_to_capacity(3, None, &mut tags);

        assert_eq!(report.removed, 2);
        assert_eq!(report.removed_height, 36);
        assert_eq!(store.base_seq(), 2);
        assert_eq!(store.get(0).unwrap().seq, 2);
        assert_eq!(store.index_of(4), Some(2));
        assert_eq!(store.index_of(1), None);
        assert_eq!(store.total_height(), 54);
    }

    #[test]
    fn test_trim_removes_whole_group() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        let id = push_group(&mut store, &mut tags, 3);
        store.push(line("after", 18), &mut tags);

        // Cap would cut between header and frames
        let report = store.trim_to_capacity(4, None, &mut tags);

        assert_eq!(report.removed, 4);
        assert_eq!(store.len(), 1);
        assert!(store.group(id).is_none());
        assert_eq!(store.get(0).unwrap().text, "after");
    }

    #[test]
    fn test_trim_stops_at_open_group_header() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        store.push(line("before", 18), &mut tags);
        let id = push_group(&mut store, &mut tags, 4);

        let report = store.trim_to_capacity(2, Some(id), &mut tags);

        assert_eq!(report.removed, 1);
        assert_eq!(store.len(), 5);
        assert_eq!(store.header_index(id), Some(0));
        assert_eq!(store.frame_indices(id), 1..5);
    }

    #[test]
    fn test_trim_unregisters_tags_and_signature() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        let mut tagged = line("[Net] boom", 18);
        tagged.source_tag = Some("Net".into());
        store.push(tagged, &mut tags);
        let id = push_group(&mut store, &mut tags, 1);
        store.group_mut(id).unwrap().signature = Some(99);
        store.record_signature(99, id);
        store.push(line("tail", 18), &mut tags);
        assert_eq!(tags.source_count("Net"), 1);

        store.trim_to_capacity(1, None, &mut tags);

        assert_eq!(tags.source_count("Net"), 0);
        assert_eq!(store.signature_owner(99), None);
    }

    #[test]
    fn test_update_tracks_error_count_and_height() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        store.push(line("x", 18), &mut tags);
        assert_eq!(store.error_count(), 0);

        store.update(0, &mut tags, |r| {
            r.level = Level::Error;
            r.height = 0;
            r.class_tags.push("StateError".into());
        });

        assert_eq!(store.error_count(), 1);
        assert_eq!(store.total_height(), 0);
        assert_eq!(tags.class_count("StateError"), 1);
    }

    #[test]
    fn test_frame_indices_and_header_index() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        store.push(line("before", 18), &mut tags);
        let id = push_group(&mut store, &mut tags, 2);

        assert_eq!(store.header_index(id), Some(1));
        assert_eq!(store.frame_indices(id), 2..4);
        assert_eq!(store.frame_indices(GroupId(77)), 0..0);
    }

    #[test]
    fn test_clear_keeps_sequence_advancing() {
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        store.push(line("a", 18), &mut tags);
        push_group(&mut store, &mut tags, 1);

        store.clear(&mut tags);

        assert!(store.is_empty());
        assert_eq!(store.group_count(), 0);
        assert_eq!(store.total_height(), 0);
        let seq = store.push(line("b", 18), &mut tags);
        assert_eq!(seq, 3);
        assert_eq!(store.index_of(3), Some(0));
    }
}
