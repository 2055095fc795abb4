//! Thread-dump grouper.
//!
//! Buffers a run of consecutive thread blocks (a thread header followed by
//! its frames and detail lines). The run is flushed by any other line, a
//! marker, or end of stream. A flushed run of two or more threads gets a
//! summary marker, and the main-thread contention heuristic runs over it.

use logdeck_core::prelude::*;
use logdeck_core::{is_thread_detail_line, parse_thread_state_line, ThreadHeader, ThreadState};

use super::ClassifiedLine;
use crate::config::ThreadSettings;

/// Result of feeding a line to the grouper
#[derive(Debug)]
pub enum ThreadFeed {
    /// The line joined the buffered run
    Buffered,
    /// Not part of a thread dump; the caller handles it
    NotConsumed(ClassifiedLine),
}

/// One thread: its header line and the lines that belong to it
#[derive(Debug, Clone)]
pub struct ThreadBlock {
    pub header: ClassifiedLine,
    pub thread: ThreadHeader,
    pub lines: Vec<ClassifiedLine>,
    /// In a blocking state while the main thread runs
    pub blocker: bool,
}

/// Synthetic summary emitted ahead of a multi-thread dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    pub thread_count: usize,
    pub blocked_count: usize,
    pub contention: bool,
    pub text: String,
}

/// A flushed run
#[derive(Debug, Clone)]
pub struct ThreadDump {
    pub summary: Option<DumpSummary>,
    pub blocks: Vec<ThreadBlock>,
}

#[derive(Debug, Default)]
pub struct ThreadDumpGrouper {
    blocks: Vec<ThreadBlock>,
}

impl ThreadDumpGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is being buffered
    pub fn is_active(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn buffered_threads(&self) -> usize {
        self.blocks.len()
    }

    pub fn feed(&mut self, line: ClassifiedLine) -> ThreadFeed {
        if line.is_marker() {
            return ThreadFeed::NotConsumed(line);
        }

        if let Some(thread) = line.thread.clone() {
            self.blocks.push(ThreadBlock {
                header: line,
                thread,
                lines: Vec::new(),
                blocker: false,
            });
            return ThreadFeed::Buffered;
        }

        let Some(block) = self.blocks.last_mut() else {
            return ThreadFeed::NotConsumed(line);
        };
        if !line.is_frame() && !is_thread_detail_line(&line.text) {
            return ThreadFeed::NotConsumed(line);
        }

        // jstack reports the precise state on its own line
        if let Some(state) = parse_thread_state_line(&line.text) {
            block.thread.state = state;
        }
        block.lines.push(line);
        ThreadFeed::Buffered
    }

    /// Emit the buffered run, if any
    pub fn flush(&mut self, settings: &ThreadSettings) -> Option<ThreadDump> {
        if self.blocks.is_empty() {
            return None;
        }
        let mut blocks = std::mem::take(&mut self.blocks);

        if blocks.len() < 2 {
            return Some(ThreadDump {
                summary: None,
                blocks,
            });
        }

        let is_main = |block: &ThreadBlock| settings.is_main_thread(&block.thread.name);
        let main_runnable = blocks
            .iter()
            .any(|b| is_main(b) && b.thread.state == ThreadState::Runnable);
        let blocked: Vec<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| !is_main(b) && settings.is_blocking(&b.thread.state))
            .map(|(i, _)| i)
            .collect();
        let contention = main_runnable && !blocked.is_empty();

        let mut text = format!("Thread dump: {} threads", blocks.len());
        if contention {
            for &i in &blocked {
                blocks[i].blocker = true;
            }
            text.push_str(&format!(
                " (possible ANR: main thread runnable while {} thread(s) blocked)",
                blocked.len()
            ));
            debug!("thread dump contention: {} blocked thread(s)", blocked.len());
        }

        Some(ThreadDump {
            summary: Some(DumpSummary {
                thread_count: blocks.len(),
                blocked_count: blocked.len(),
                contention,
                text,
            }),
            blocks,
        })
    }

    /// Drop the buffered run
    pub fn reset(&mut self) {
        self.blocks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::RawLine;

    fn feed_all(grouper: &mut ThreadDumpGrouper, lines: &[&str]) -> Vec<bool> {
        lines
            .iter()
            .map(|l| {
                matches!(
                    grouper.feed(ClassifiedLine::new(RawLine::new(*l))),
                    ThreadFeed::Buffered
                )
            })
            .collect()
    }

    #[test]
    fn test_run_buffers_headers_and_frames() {
        let mut grouper = ThreadDumpGrouper::new();
        let buffered = feed_all(
            &mut grouper,
            &[
                "\"main\" tid=1 Runnable",
                "    at A.run(A.java:1)",
                "\"worker\" tid=2 Sleeping",
                "    at B.sleep(B.java:2)",
                "done",
            ],
        );

        assert_eq!(buffered, vec![true, true, true, true, false]);
        assert_eq!(grouper.buffered_threads(), 2);
    }

    #[test]
    fn test_flush_without_contention() {
        let mut grouper = ThreadDumpGrouper::new();
        feed_all(
            &mut grouper,
            &[
                "\"main\" tid=1 Runnable",
                "    at A.run(A.java:1)",
                "\"worker\" tid=2 Sleeping",
                "    at B.sleep(B.java:2)",
            ],
        );

        let dump = grouper.flush(&ThreadSettings::default()).unwrap();
        let summary = dump.summary.unwrap();

        assert!(summary.text.contains("2 threads"));
        assert!(!summary.contention);
        assert!(dump.blocks.iter().all(|b| !b.blocker));
        assert!(!grouper.is_active());
    }

    #[test]
    fn test_flush_flags_contention() {
        let mut grouper = ThreadDumpGrouper::new();
        feed_all(
            &mut grouper,
            &[
                "\"main\" tid=1 Runnable",
                "    at A.run(A.java:1)",
                "\"worker\" tid=2 Waiting",
                "    at B.wait(B.java:2)",
            ],
        );

        let dump = grouper.flush(&ThreadSettings::default()).unwrap();
        let summary = dump.summary.unwrap();

        assert!(summary.contention);
        assert!(summary.text.contains("possible ANR"));
        assert!(!dump.blocks[0].blocker);
        assert!(dump.blocks[1].blocker);
    }

    #[test]
    fn test_blocked_main_thread_is_not_contention() {
        let mut grouper = ThreadDumpGrouper::new();
        feed_all(
            &mut grouper,
            &["\"main\" tid=1 Blocked", "\"worker\" tid=2 Waiting"],
        );

        let summary = grouper
            .flush(&ThreadSettings::default())
            .unwrap()
            .summary
            .unwrap();
        assert!(!summary.contention);
    }

    #[test]
    fn test_single_thread_has_no_summary() {
        let mut grouper = ThreadDumpGrouper::new();
        feed_all(&mut grouper, &["\"main\" tid=1 Runnable", "    at A.run(A.java:1)"]);

        let dump = grouper.flush(&ThreadSettings::default()).unwrap();
        assert!(dump.summary.is_none());
        assert_eq!(dump.blocks[0].lines.len(), 1);
    }

    #[test]
    fn test_state_line_overrides_header_state() {
        let mut grouper = ThreadDumpGrouper::new();
        feed_all(
            &mut grouper,
            &[
                "\"main\" #1 prio=5 tid=0x01 nid=0x2 runnable",
                "\"pool-1\" #12 prio=5 tid=0x0a nid=0x1a waiting on condition",
                "   java.lang.Thread.State: BLOCKED (on object monitor)",
                "\t- waiting to lock <0x1> (a java.lang.Object)",
            ],
        );

        let dump = grouper.flush(&ThreadSettings::default()).unwrap();
        assert_eq!(dump.blocks[1].thread.state, ThreadState::Blocked);
        assert_eq!(dump.blocks[1].lines.len(), 2);
        assert!(dump.summary.unwrap().contention);
    }

    #[test]
    fn test_configured_main_thread_names() {
        let settings = ThreadSettings {
            main_thread_names: vec!["ui".into()],
            ..Default::default()
        };
        let mut grouper = ThreadDumpGrouper::new();
        feed_all(&mut grouper, &["\"ui\" tid=1 Runnable", "\"io\" tid=2 Monitor"]);

        let summary = grouper.flush(&settings).unwrap().summary.unwrap();
        assert!(summary.contention);
        assert_eq!(summary.blocked_count, 1);
    }

    #[test]
    fn test_frame_outside_run_not_consumed() {
        let mut grouper = ThreadDumpGrouper::new();
        let buffered = feed_all(&mut grouper, &["    at A.run(A.java:1)"]);
        assert_eq!(buffered, vec![false]);
    }
}
