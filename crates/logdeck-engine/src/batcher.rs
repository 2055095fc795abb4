//! Line batching for hosts - coalesces rapid arrivals into chunks.

use std::time::{Duration, Instant};

use logdeck_core::RawLine;

use crate::config::IngestSettings;

/// Batches incoming lines and says when a chunk should be handed to the
/// engine, by size or by time since the last flush.
#[derive(Debug)]
pub struct LineBatcher {
    pending: Vec<RawLine>,
    last_flush: Instant,
    max_size: usize,
    interval: Duration,
}

impl Default for LineBatcher {
    fn default() -> Self {
        Self::new(&IngestSettings::default())
    }
}

impl LineBatcher {
    pub fn new(settings: &IngestSettings) -> Self {
        let max_size = settings.batch_size.max(1);
        Self {
            pending: Vec::with_capacity(max_size),
            last_flush: Instant::now(),
            max_size,
            interval: Duration::from_millis(settings.flush_interval_ms),
        }
    }

    /// Add a line. Returns true if the batch should be flushed.
    pub fn add(&mut self, line: RawLine) -> bool {
        self.pending.push(line);
        self.should_flush()
    }

    /// Size threshold reached, or pending lines older than the interval
    pub fn should_flush(&self) -> bool {
        self.pending.len() >= self.max_size
            || (!self.pending.is_empty() && self.last_flush.elapsed() >= self.interval)
    }

    /// Take all pending lines and reset the flush timer
    pub fn flush(&mut self) -> Vec<RawLine> {
        self.last_flush = Instant::now();
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Time until the next scheduled flush (for host loop timing)
    pub fn time_until_flush(&self) -> Duration {
        self.interval.saturating_sub(self.last_flush.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batcher(batch_size: usize, flush_interval_ms: u64) -> LineBatcher {
        LineBatcher::new(&IngestSettings {
            batch_size,
            flush_interval_ms,
        })
    }

    #[test]
    fn test_flushes_at_size_threshold() {
        let mut batcher = batcher(3, 60_000);
        assert!(!batcher.add(RawLine::new("a")));
        assert!(!batcher.add(RawLine::new("b")));
        assert!(batcher.add(RawLine::new("c")));

        let lines = batcher.flush();
        assert_eq!(lines.len(), 3);
        assert!(!batcher.has_pending());
    }

    #[test]
    fn test_flushes_after_interval() {
        let mut batcher = batcher(100, 0);
        assert!(batcher.add(RawLine::new("a")));
    }

    #[test]
    fn test_empty_batch_never_flushes() {
        let batcher = batcher(100, 0);
        assert!(!batcher.should_flush());
        assert_eq!(batcher.pending_count(), 0);
    }

    #[test]
    fn test_flush_preserves_order() {
        let mut batcher = batcher(10, 60_000);
        batcher.add(RawLine::new("first"));
        batcher.add(RawLine::new("second"));
        let contents: Vec<String> = batcher.flush().into_iter().map(|l| l.content).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_time_until_flush_bounded_by_interval() {
        let batcher = batcher(10, 50);
        assert!(batcher.time_until_flush() <= Duration::from_millis(50));
    }
}
