//! Stack-trace grouper.
//!
//! Two states: `Idle` or `InGroup`. A frame line while idle promotes the
//! previous plain line to a group header; following frames attach to it
//! until any other line finalizes the group. Finalization hashes the frame
//! texts and marks repeats of an earlier trace as duplicates.

use std::hash::{DefaultHasher, Hash, Hasher};

use logdeck_core::prelude::*;
use logdeck_core::{CollapseMode, GroupId, LineKind};

use super::ClassifiedLine;
use crate::store::{Group, GroupKind, LineStore};
use crate::tags::TagCounts;

/// Grouper states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackState {
    #[default]
    Idle,
    InGroup(GroupId),
}

/// What `push_frame` did with a frame line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The previous line became a header and the frame its first child
    Opened(GroupId),
    /// The frame joined the open group
    Attached(GroupId),
    /// No header candidate; the frame was stored as a plain line
    Orphan,
}

/// A group that just closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalized {
    pub group: GroupId,
    pub duplicate_of: Option<GroupId>,
}

#[derive(Debug, Default)]
pub struct StackTraceGrouper {
    state: StackState,
    default_collapse: CollapseMode,
}

impl StackTraceGrouper {
    pub fn new(default_collapse: CollapseMode) -> Self {
        Self {
            state: StackState::Idle,
            default_collapse,
        }
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    pub fn open_group(&self) -> Option<GroupId> {
        match self.state {
            StackState::Idle => None,
            StackState::InGroup(id) => Some(id),
        }
    }

    pub fn set_default_collapse(&mut self, collapse: CollapseMode) {
        self.default_collapse = collapse;
    }

    /// Store a frame line, opening or extending a group
    pub fn push_frame(
        &mut self,
        line: ClassifiedLine,
        store: &mut LineStore,
        tags: &mut TagCounts,
    ) -> FrameOutcome {
        if let StackState::InGroup(id) = self.state {
            if store.group(id).is_none() {
                debug!("open {} was trimmed, grouper back to idle", id);
                self.state = StackState::Idle;
            }
        }

        let (id, opened) = match self.state {
            StackState::InGroup(id) => (id, false),
            StackState::Idle => match self.promote_last(store, tags) {
                Some(id) => (id, true),
                None => {
                    debug!("frame without a header candidate, stored as a plain line");
                    let mut record = line.into_record(LineKind::Line);
                    record.orphan_frame = true;
                    store.push(record, tags);
                    return FrameOutcome::Orphan;
                }
            },
        };

        self.attach(id, line, store, tags);
        if opened {
            FrameOutcome::Opened(id)
        } else {
            FrameOutcome::Attached(id)
        }
    }

    fn promote_last(&mut self, store: &mut LineStore, tags: &mut TagCounts) -> Option<GroupId> {
        let last = store.last().filter(|r| r.can_head_group())?;
        let seq = last.seq;
        let id = GroupId(seq);
        let index = store.len() - 1;

        store.update(index, tags, |record| {
            record.kind = LineKind::StackHeader;
            record.group_id = Some(id);
        });
        store.insert_group(Group::new(seq, GroupKind::StackTrace, self.default_collapse));
        self.state = StackState::InGroup(id);
        Some(id)
    }

    fn attach(
        &mut self,
        id: GroupId,
        line: ClassifiedLine,
        store: &mut LineStore,
        tags: &mut TagCounts,
    ) {
        let (Some(header_index), Some(frame_index)) = (
            store.header_index(id),
            store.group(id).map(|g| g.frame_count),
        ) else {
            return;
        };
        let Some(header) = store.get(header_index) else {
            return;
        };

        let mut record = line.into_record(LineKind::StackFrame);
        record.group_id = Some(id);
        record.frame_index = frame_index;
        record.level = header.level;

        let mut new_tags: Vec<String> = Vec::new();
        for tag in &record.class_tags {
            if !header.class_tags.contains(tag) && !new_tags.contains(tag) {
                new_tags.push(tag.clone());
            }
        }
        if !new_tags.is_empty() {
            store.update(header_index, tags, |header| header.class_tags.extend(new_tags));
        }

        if let Some(group) = store.group_mut(id) {
            group.frame_count += 1;
        }
        store.push(record, tags);
    }

    /// Close the open group and deduplicate it against earlier traces
    pub fn finalize(&mut self, store: &mut LineStore) -> Option<Finalized> {
        let StackState::InGroup(id) = std::mem::take(&mut self.state) else {
            return None;
        };
        let frames = store.frame_indices(id);
        if frames.is_empty() {
            return None;
        }

        let mut hasher = DefaultHasher::new();
        for record in frames.filter_map(|i| store.get(i)) {
            record.text.trim().hash(&mut hasher);
        }
        let signature = hasher.finish();

        let original = store.signature_owner(signature).filter(|o| *o != id);
        if let Some(group) = store.group_mut(id) {
            group.signature = Some(signature);
            group.duplicate_of = original;
        }
        match original {
            Some(original_id) => {
                if let Some(group) = store.group_mut(original_id) {
                    group.dup_count += 1;
                }
                trace!("{} duplicates {}", id, original_id);
            }
            None => store.record_signature(signature, id),
        }

        Some(Finalized {
            group: id,
            duplicate_of: original,
        })
    }

    pub fn reset(&mut self) {
        self.state = StackState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::{Level, RawLine};

    fn feed(
        grouper: &mut StackTraceGrouper,
        store: &mut LineStore,
        tags: &mut TagCounts,
        text: &str,
    ) -> Option<FrameOutcome> {
        let line = ClassifiedLine::new(RawLine::new(text));
        if line.is_frame() {
            Some(grouper.push_frame(line, store, tags))
        } else {
            grouper.finalize(store);
            store.push(line.into_record(LineKind::Line), tags);
            None
        }
    }

    fn trace(grouper: &mut StackTraceGrouper, store: &mut LineStore, tags: &mut TagCounts) {
        feed(grouper, store, tags, "Exception: boom");
        feed(grouper, store, tags, "    at A.run(A.java:1)");
        feed(grouper, store, tags, "    at B.call(B.java:2)");
        grouper.finalize(store);
    }

    #[test]
    fn test_frame_promotes_previous_line() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        feed(&mut grouper, &mut store, &mut tags, "Error: failed to load");
        let outcome = feed(&mut grouper, &mut store, &mut tags, "    at A.run(A.java:1)");

        assert_eq!(outcome, Some(FrameOutcome::Opened(GroupId(0))));
        assert_eq!(store.get(0).unwrap().kind, LineKind::StackHeader);
        assert_eq!(store.get(1).unwrap().kind, LineKind::StackFrame);
        assert_eq!(store.get(1).unwrap().group_id, Some(GroupId(0)));
        assert_eq!(grouper.state(), StackState::InGroup(GroupId(0)));
    }

    #[test]
    fn test_frames_inherit_header_level() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();
        trace(&mut grouper, &mut store, &mut tags);

        assert_eq!(store.get(0).unwrap().level, Level::Error);
        assert_eq!(store.get(1).unwrap().level, Level::Error);
        assert_eq!(store.get(2).unwrap().frame_index, 1);
        assert_eq!(store.group(GroupId(0)).unwrap().frame_count, 2);
    }

    #[test]
    fn test_orphan_frame_stored_as_line() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        let outcome = feed(&mut grouper, &mut store, &mut tags, "    at A.run(A.java:1)");

        assert_eq!(outcome, Some(FrameOutcome::Orphan));
        assert_eq!(store.get(0).unwrap().kind, LineKind::Line);
        assert_eq!(store.group_count(), 0);
        assert_eq!(grouper.state(), StackState::Idle);
    }

    #[test]
    fn test_orphan_frame_never_promoted() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        feed(&mut grouper, &mut store, &mut tags, "    at A.d(A.java:4)");
        let outcome = feed(&mut grouper, &mut store, &mut tags, "    at A.e(A.java:5)");

        assert_eq!(outcome, Some(FrameOutcome::Orphan));
        assert!(store.iter().all(|r| r.kind == LineKind::Line && r.orphan_frame));
        assert_eq!(store.group_count(), 0);
    }

    #[test]
    fn test_non_frame_finalizes_group() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        feed(&mut grouper, &mut store, &mut tags, "Exception: boom");
        feed(&mut grouper, &mut store, &mut tags, "    at A.run(A.java:1)");
        feed(&mut grouper, &mut store, &mut tags, "back to normal");

        assert_eq!(grouper.state(), StackState::Idle);
        assert!(store.group(GroupId(0)).unwrap().signature.is_some());
        assert_eq!(store.get(2).unwrap().kind, LineKind::Line);
    }

    #[test]
    fn test_frame_class_tags_move_to_header() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        feed(&mut grouper, &mut store, &mut tags, "Unhandled failure");
        feed(
            &mut grouper,
            &mut store,
            &mut tags,
            "    at com.acme.NetworkException.raise(NetworkException.java:9)",
        );

        let header = store.get(0).unwrap();
        assert!(header.class_tags.contains(&"com.acme.NetworkException".to_string()));
        assert_eq!(tags.class_count("com.acme.NetworkException"), 2);
    }

    #[test]
    fn test_duplicate_trace_marked_against_original() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        trace(&mut grouper, &mut store, &mut tags);
        feed(&mut grouper, &mut store, &mut tags, "Exception: boom");
        feed(&mut grouper, &mut store, &mut tags, "    at A.run(A.java:1)");
        feed(&mut grouper, &mut store, &mut tags, "    at B.call(B.java:2)");
        let finalized = grouper.finalize(&mut store).unwrap();

        assert_eq!(finalized.group, GroupId(3));
        assert_eq!(finalized.duplicate_of, Some(GroupId(0)));
        assert_eq!(store.group(GroupId(0)).unwrap().dup_count, 2);
        assert!(store.group(GroupId(3)).unwrap().is_duplicate());
    }

    #[test]
    fn test_different_frames_are_not_duplicates() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        trace(&mut grouper, &mut store, &mut tags);
        feed(&mut grouper, &mut store, &mut tags, "Exception: boom");
        feed(&mut grouper, &mut store, &mut tags, "    at C.other(C.java:3)");
        let finalized = grouper.finalize(&mut store).unwrap();

        assert_eq!(finalized.duplicate_of, None);
        assert_eq!(store.group(GroupId(0)).unwrap().dup_count, 1);
    }

    #[test]
    fn test_trimmed_open_group_resets_to_idle() {
        let mut grouper = StackTraceGrouper::default();
        let mut store = LineStore::new();
        let mut tags = TagCounts::new();

        feed(&mut grouper, &mut store, &mut tags, "Exception: boom");
        feed(&mut grouper, &mut store, &mut tags, "    at A.run(A.java:1)");
        store.trim_to_capacity(0, None, &mut tags);

        let outcome = feed(&mut grouper, &mut store, &mut tags, "    at B.call(B.java:2)");
        assert_eq!(outcome, Some(FrameOutcome::Orphan));
    }
}
