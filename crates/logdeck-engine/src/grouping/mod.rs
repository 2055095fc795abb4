//! Grouping state machines.
//!
//! Incoming lines are classified once into a [`ClassifiedLine`] and then
//! offered, in order, to the thread-dump grouper, the stack-trace grouper and
//! the repeat collapser.

pub mod stack;
pub mod thread;

pub use stack::{FrameOutcome, Finalized, StackState, StackTraceGrouper};
pub use thread::{DumpSummary, ThreadBlock, ThreadDump, ThreadDumpGrouper, ThreadFeed};

use logdeck_core::{
    classify, parse_frame, parse_thread_header, strip_ansi_codes, Classification, FrameInfo,
    LineKind, LineRecord, RawLine, ThreadHeader,
};

/// A raw line with everything the classifiers derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub raw: RawLine,
    /// Plain text: the producer's text or the ANSI-stripped content
    pub text: String,
    pub classification: Classification,
    pub frame: Option<FrameInfo>,
    pub thread: Option<ThreadHeader>,
}

impl ClassifiedLine {
    pub fn new(raw: RawLine) -> Self {
        let text = raw
            .text
            .clone()
            .unwrap_or_else(|| strip_ansi_codes(&raw.content));
        let classification = classify(&raw, &text);
        let (frame, thread) = if raw.marker {
            (None, None)
        } else {
            (parse_frame(&text), parse_thread_header(&text))
        };

        Self {
            raw,
            text,
            classification,
            frame,
            thread,
        }
    }

    pub fn is_marker(&self) -> bool {
        self.raw.marker
    }

    pub fn is_frame(&self) -> bool {
        self.frame.is_some()
    }

    pub fn is_thread_header(&self) -> bool {
        self.thread.is_some()
    }

    /// Build the record stored for this line. Height and flags are left to
    /// the filter composer.
    pub fn into_record(self, kind: LineKind) -> LineRecord {
        let path = self.frame.as_ref().and_then(FrameInfo::scope_key);
        let mut record = LineRecord::new(kind, self.raw.content, self.text);
        record.category = self.raw.category;
        record.timestamp = self.raw.timestamp;
        record.level = self.classification.level;
        record.source_tag = self.classification.source_tag;
        record.class_tags = self.classification.class_tags;
        record.error_kind = self.classification.error_kind;
        record.path = path;
        record
    }
}
