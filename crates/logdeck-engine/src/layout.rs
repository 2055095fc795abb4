//! Row geometry and natural record heights.

use logdeck_core::{CollapseMode, LineKind, LineRecord};

use crate::config::LayoutSettings;
use crate::store::Group;

/// Heights used to size records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub row_height: u32,
    pub marker_height: u32,
    pub preview_frames: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self::from(&LayoutSettings::default())
    }
}

impl From<&LayoutSettings> for Layout {
    fn from(settings: &LayoutSettings) -> Self {
        Self {
            row_height: settings.row_height,
            marker_height: settings.marker_height,
            preview_frames: settings.preview_frames,
        }
    }
}

impl Layout {
    /// Height of a record before any filter applies.
    ///
    /// Frames depend on their group: all rows when expanded, the first
    /// `preview_frames` in preview, none when collapsed or duplicated.
    pub fn natural_height(&self, record: &LineRecord, group: Option<&Group>) -> u32 {
        match record.kind {
            LineKind::Line | LineKind::StackHeader | LineKind::RepeatNotification => {
                self.row_height
            }
            LineKind::Marker => self.marker_height,
            LineKind::StackFrame => match group {
                Some(group) if group.is_duplicate() => 0,
                Some(group) => match group.collapse {
                    CollapseMode::Expanded => self.row_height,
                    CollapseMode::Preview if record.frame_index < self.preview_frames => {
                        self.row_height
                    }
                    CollapseMode::Preview | CollapseMode::Collapsed => 0,
                },
                None => self.row_height,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GroupKind;
    use logdeck_core::GroupId;

    fn frame(index: usize) -> LineRecord {
        let mut record = LineRecord::new(LineKind::StackFrame, "at x", "at x");
        record.group_id = Some(GroupId(0));
        record.frame_index = index;
        record
    }

    fn group(collapse: CollapseMode) -> Group {
        Group::new(0, GroupKind::StackTrace, collapse)
    }

    #[test]
    fn test_kind_heights() {
        let layout = Layout::default();
        let line = LineRecord::new(LineKind::Line, "x", "x");
        let marker = LineRecord::new(LineKind::Marker, "--", "--");
        assert_eq!(layout.natural_height(&line, None), 18);
        assert_eq!(layout.natural_height(&marker, None), 24);
    }

    #[test]
    fn test_preview_shows_leading_frames() {
        let layout = Layout::default();
        let preview = group(CollapseMode::Preview);
        assert_eq!(layout.natural_height(&frame(2), Some(&preview)), 18);
        assert_eq!(layout.natural_height(&frame(3), Some(&preview)), 0);
    }

    #[test]
    fn test_expanded_and_collapsed_frames() {
        let layout = Layout::default();
        let expanded = group(CollapseMode::Expanded);
        let collapsed = group(CollapseMode::Collapsed);
        assert_eq!(layout.natural_height(&frame(10), Some(&expanded)), 18);
        assert_eq!(layout.natural_height(&frame(0), Some(&collapsed)), 0);
    }

    #[test]
    fn test_duplicate_group_frames_have_no_height() {
        let layout = Layout::default();
        let mut duplicate = group(CollapseMode::Expanded);
        duplicate.duplicate_of = Some(GroupId(40));
        assert_eq!(layout.natural_height(&frame(0), Some(&duplicate)), 0);
    }
}
