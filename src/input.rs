//! Input reading: lines from a file or stdin, fed to the engine in chunks.

use std::io::BufRead;
use std::time::Instant;

use logdeck_core::prelude::*;
use logdeck_core::{category, RawLine};
use logdeck_engine::config::IngestSettings;
use logdeck_engine::{LineBatcher, LogEngine};

/// Session separators as `flutter run` and debug adapters print them
const RESTART_PREFIX: &str = "Restarted application";

/// Turn one input line into a raw line.
///
/// `stderr:` / `[stderr]` prefixes set the category, separator lines become
/// markers. `timestamp` is the capture time in milliseconds.
pub fn parse_line(line: &str, timestamp: u64) -> RawLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if is_marker(line) {
        return RawLine::marker(line).with_timestamp(timestamp);
    }

    for prefix in ["stderr: ", "[stderr] "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return RawLine::new(rest)
                .with_category(category::STDERR)
                .with_timestamp(timestamp);
        }
    }

    RawLine::new(line).with_timestamp(timestamp)
}

fn is_marker(line: &str) -> bool {
    let trimmed = line.trim();
    let fenced = |fence: &str| {
        trimmed.len() > 2 * fence.len()
            && trimmed.starts_with(fence)
            && trimmed.ends_with(fence)
    };
    fenced("---") || fenced("===") || trimmed.starts_with(RESTART_PREFIX)
}

/// Read every line of `reader` into the engine.
///
/// Lines go through a [`LineBatcher`]; each flushed chunk is appended with
/// one anchored recompute. Returns the number of lines read.
pub fn ingest<R: BufRead>(
    reader: R,
    engine: &mut LogEngine,
    settings: &IngestSettings,
) -> Result<usize> {
    let started = Instant::now();
    let mut batcher = LineBatcher::new(settings);
    let mut count = 0usize;

    for line in reader.lines() {
        let line = line?;
        let timestamp = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        count += 1;
        if batcher.add(parse_line(&line, timestamp)) {
            engine.append_lines(batcher.flush());
        }
    }
    if batcher.has_pending() {
        engine.append_lines(batcher.flush());
    }

    debug!("read {} lines, {} records stored", count, engine.len());
    Ok(count)
}
