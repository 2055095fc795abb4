//! Repeat collapser.
//!
//! Consecutive identical plain lines (same level and text) arriving within
//! the repeat window are folded into one `RepeatNotification` record that
//! follows the original.

use std::hash::{DefaultHasher, Hash, Hasher};

use logdeck_core::Level;

use crate::config::RepeatSettings;

/// What the engine should do with a plain line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatDecision {
    /// Store the line normally
    Store,
    /// Append a new notification record
    Notify { repeat_count: usize, content: String },
    /// Update the notification record with `seq` in place
    Extend {
        seq: u64,
        repeat_count: usize,
        content: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rolling {
    signature: u64,
    last_timestamp: u64,
    /// Occurrences including the stored original
    count: usize,
    notification_seq: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RepeatCollapser {
    window_ms: u64,
    preview_chars: usize,
    rolling: Option<Rolling>,
}

impl Default for RepeatCollapser {
    fn default() -> Self {
        Self::new(&RepeatSettings::default())
    }
}

impl RepeatCollapser {
    pub fn new(settings: &RepeatSettings) -> Self {
        Self {
            window_ms: settings.window_ms,
            preview_chars: settings.preview_chars,
            rolling: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.window_ms > 0
    }

    /// Decide what to do with a plain line.
    ///
    /// `last_seq` is the sequence number of the last stored record; an
    /// existing notification is only extended while it is still last.
    pub fn observe(
        &mut self,
        level: Level,
        text: &str,
        timestamp: u64,
        last_seq: Option<u64>,
    ) -> RepeatDecision {
        if !self.is_enabled() {
            return RepeatDecision::Store;
        }

        let signature = signature(level, text);
        let window_ms = self.window_ms;
        let repeated = self.rolling.filter(|r| {
            r.signature == signature && elapsed(r.last_timestamp, timestamp) < window_ms
        });

        let Some(mut rolling) = repeated else {
            self.rolling = Some(Rolling {
                signature,
                last_timestamp: timestamp,
                count: 1,
                notification_seq: None,
            });
            return RepeatDecision::Store;
        };
        rolling.count += 1;
        rolling.last_timestamp = timestamp;

        let repeat_count = rolling.count - 1;
        let content = self.notification_text(repeat_count, text);
        let decision = match rolling.notification_seq {
            Some(seq) if last_seq == Some(seq) => RepeatDecision::Extend {
                seq,
                repeat_count,
                content,
            },
            _ => RepeatDecision::Notify {
                repeat_count,
                content,
            },
        };
        self.rolling = Some(rolling);
        decision
    }

    /// Remember where the notification for the current run was stored
    pub fn set_notification(&mut self, seq: u64) {
        if let Some(rolling) = self.rolling.as_mut() {
            rolling.notification_seq = Some(seq);
        }
    }

    /// Forget the current run (non-plain line, clear)
    pub fn reset(&mut self) {
        self.rolling = None;
    }

    /// Occurrences in the current run, original included
    pub fn current_count(&self) -> usize {
        self.rolling.map_or(0, |r| r.count)
    }

    fn notification_text(&self, repeat_count: usize, text: &str) -> String {
        format!(
            "Repeated {} more time(s): {}",
            repeat_count,
            preview(text, self.preview_chars)
        )
    }
}

fn signature(level: Level, text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    level.hash(&mut hasher);
    text.hash(&mut hasher);
    hasher.finish()
}

/// Unknown timestamps (0) count as no time elapsed
fn elapsed(last: u64, now: u64) -> u64 {
    if last == 0 || now == 0 {
        0
    } else {
        now.saturating_sub(last)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collapser(window_ms: u64) -> RepeatCollapser {
        RepeatCollapser::new(&RepeatSettings {
            window_ms,
            ..Default::default()
        })
    }

    #[test]
    fn test_first_line_is_stored() {
        let mut repeat = collapser(1000);
        assert_eq!(
            repeat.observe(Level::Error, "Error: disk full", 100, None),
            RepeatDecision::Store
        );
        assert_eq!(repeat.current_count(), 1);
    }

    #[test]
    fn test_repeats_notify_then_extend() {
        let mut repeat = collapser(1000);
        repeat.observe(Level::Error, "Error: disk full", 100, None);

        let second = repeat.observe(Level::Error, "Error: disk full", 200, Some(0));
        assert_eq!(
            second,
            RepeatDecision::Notify {
                repeat_count: 1,
                content: "Repeated 1 more time(s): Error: disk full".into()
            }
        );
        repeat.set_notification(1);

        let third = repeat.observe(Level::Error, "Error: disk full", 300, Some(1));
        assert_eq!(
            third,
            RepeatDecision::Extend {
                seq: 1,
                repeat_count: 2,
                content: "Repeated 2 more time(s): Error: disk full".into()
            }
        );
    }

    #[test]
    fn test_outside_window_starts_new_run() {
        let mut repeat = collapser(1000);
        repeat.observe(Level::Info, "tick", 100, None);
        assert_eq!(
            repeat.observe(Level::Info, "tick", 1100, Some(0)),
            RepeatDecision::Store
        );
        assert_eq!(repeat.current_count(), 1);
    }

    #[test]
    fn test_window_refreshes_on_each_repeat() {
        let mut repeat = collapser(1000);
        repeat.observe(Level::Info, "tick", 100, None);
        repeat.observe(Level::Info, "tick", 900, Some(0));
        repeat.set_notification(1);
        assert!(matches!(
            repeat.observe(Level::Info, "tick", 1700, Some(1)),
            RepeatDecision::Extend { .. }
        ));
    }

    #[test]
    fn test_unknown_timestamps_are_within_window() {
        let mut repeat = collapser(1000);
        repeat.observe(Level::Info, "tick", 0, None);
        assert!(matches!(
            repeat.observe(Level::Info, "tick", 0, Some(0)),
            RepeatDecision::Notify { .. }
        ));
    }

    #[test]
    fn test_level_is_part_of_signature() {
        let mut repeat = collapser(1000);
        repeat.observe(Level::Info, "same text", 0, None);
        assert_eq!(
            repeat.observe(Level::Error, "same text", 0, Some(0)),
            RepeatDecision::Store
        );
    }

    #[test]
    fn test_zero_window_disables() {
        let mut repeat = collapser(0);
        repeat.observe(Level::Info, "tick", 0, None);
        assert_eq!(
            repeat.observe(Level::Info, "tick", 0, Some(0)),
            RepeatDecision::Store
        );
    }

    #[test]
    fn test_notification_not_last_gets_replaced() {
        let mut repeat = collapser(1000);
        repeat.observe(Level::Info, "tick", 0, None);
        repeat.observe(Level::Info, "tick", 0, Some(0));
        repeat.set_notification(1);

        // Something else was stored after the notification
        assert!(matches!(
            repeat.observe(Level::Info, "tick", 0, Some(5)),
            RepeatDecision::Notify { repeat_count: 2, .. }
        ));
    }

    #[test]
    fn test_reset_forgets_run() {
        let mut repeat = collapser(1000);
        repeat.observe(Level::Info, "tick", 0, None);
        repeat.reset();
        assert_eq!(
            repeat.observe(Level::Info, "tick", 0, Some(0)),
            RepeatDecision::Store
        );
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "x".repeat(200);
        let text = preview(&long, 80);
        assert_eq!(text.chars().count(), 80);
        assert!(text.ends_with("..."));
        assert_eq!(preview("short", 80), "short");
    }
}
