//! Viewport output: plain text rows or NDJSON events.
//!
//! In JSON mode every visible record becomes one `record` event, followed by
//! one `summary` event:
//!
//! ```json
//! {"event":"record","seq":3,"kind":"stack_header","level":"error","text":"Error: boom","offset":54,"height":18,"group_id":3,"repeat_count":0}
//! {"event":"summary","records":120,"visible":7,"total_height":2160,"errors":2,"scroll_offset":2034,"pinned":true,"timestamp":1704700003000}
//! ```

use std::io::Write;

use chrono::Utc;
use logdeck_core::prelude::*;
use logdeck_core::{Annotation, CollapseMode, Level, LineKind, LineRecord};
use logdeck_engine::{LogEngine, ViewportWindow};
use serde::Serialize;

/// Events emitted in JSON mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewEvent {
    /// One rendered record
    Record {
        seq: u64,
        kind: LineKind,
        level: Level,
        text: String,
        offset: u64,
        height: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        group_id: Option<u64>,
        repeat_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        annotation: Option<Annotation>,
    },

    /// Store and scroll totals after the records
    Summary {
        records: usize,
        visible: usize,
        total_height: u64,
        errors: usize,
        scroll_offset: u64,
        pinned: bool,
        timestamp: i64,
    },
}

impl ViewEvent {
    pub fn record(record: &LineRecord, offset: u64) -> Self {
        Self::Record {
            seq: record.seq,
            kind: record.kind,
            level: record.level,
            text: record.text.clone(),
            offset,
            height: record.height,
            group_id: record.group_id.map(|id| id.0),
            repeat_count: record.repeat_count,
            annotation: record.annotation,
        }
    }

    pub fn summary(engine: &LogEngine) -> Self {
        Self::Summary {
            records: engine.len(),
            visible: engine.records().filter(|r| r.is_visible()).count(),
            total_height: engine.total_height(),
            errors: engine.error_count(),
            scroll_offset: engine.scroll_offset(),
            pinned: engine.is_pinned(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Write this event as one NDJSON line
    pub fn emit(&self, out: &mut impl Write) -> Result<()> {
        let json = serde_json::to_string(self)?;
        writeln!(out, "{}", json)?;
        Ok(())
    }
}

/// Render one record as a text row
pub fn render_text(record: &LineRecord, collapse: Option<CollapseMode>) -> String {
    match record.kind {
        LineKind::Marker => format!("── {} ──", record.text),
        LineKind::StackHeader => {
            let toggle = match collapse {
                Some(CollapseMode::Collapsed) => '▸',
                _ => '▾',
            };
            let blocker = match record.annotation {
                Some(Annotation::Blocker) => " [blocked]",
                _ => "",
            };
            format!(
                "{} {} {}{}",
                record.level.prefix(),
                toggle,
                record.text,
                blocker
            )
        }
        LineKind::StackFrame => format!("      {}", record.text.trim_start()),
        LineKind::RepeatNotification => format!("    ↻ {}", record.text),
        LineKind::Line => format!("{} {}", record.level.prefix(), record.content),
    }
}

fn visible_in<'a>(
    engine: &'a LogEngine,
    window: ViewportWindow,
) -> impl Iterator<Item = (usize, &'a LineRecord)> + 'a {
    engine
        .window_records(window)
        .enumerate()
        .map(move |(i, record)| (window.start_index + i, record))
        .filter(|(_, record)| record.is_visible())
}

/// Write the visible records of `window` as text rows
pub fn write_text(engine: &LogEngine, window: ViewportWindow, out: &mut impl Write) -> Result<()> {
    for (_, record) in visible_in(engine, window) {
        let collapse = record
            .group_id
            .and_then(|id| engine.group(id))
            .map(|g| g.collapse);
        writeln!(out, "{}", render_text(record, collapse))?;
    }
    Ok(())
}

/// Write the visible records of `window` as NDJSON, then a summary event
pub fn write_events(
    engine: &LogEngine,
    window: ViewportWindow,
    out: &mut impl Write,
) -> Result<()> {
    for (index, record) in visible_in(engine, window) {
        ViewEvent::record(record, engine.index().offset_of(index)).emit(out)?;
    }
    ViewEvent::summary(engine).emit(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::RawLine;

    fn engine_with(lines: &[&str]) -> LogEngine {
        let mut engine = LogEngine::default();
        engine.set_viewport_height(1_000);
        engine.append_lines(lines.iter().map(|l| RawLine::new(*l)));
        engine
    }

    #[test]
    fn test_render_text_rows() {
        let engine = engine_with(&["Error: boom", "    at A.a(A.java:1)", "ok"]);
        let rows: Vec<String> = engine
            .records()
            .map(|r| render_text(r, Some(CollapseMode::Preview)))
            .collect();
        assert_eq!(rows[0], "ERR ▾ Error: boom");
        assert_eq!(rows[1], "      at A.a(A.java:1)");
        assert_eq!(rows[2], "INF ok");
    }

    #[test]
    fn test_write_text_skips_hidden_rows() {
        let mut engine = engine_with(&["Error: a", "b", "Error: c"]);
        engine.set_level_filter([Level::Error].into_iter().collect());

        let mut out = Vec::new();
        write_text(&engine, engine.query_viewport(0, 1_000), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains(" b"));
    }

    #[test]
    fn test_write_events_ndjson() {
        let engine = engine_with(&["one", "two"]);
        let mut out = Vec::new();
        write_events(&engine, engine.query_viewport(0, 1_000), &mut out).unwrap();

        let events: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["event"], "record");
        assert_eq!(events[0]["kind"], "line");
        assert_eq!(events[1]["offset"], 18);
        assert_eq!(events[2]["event"], "summary");
        assert_eq!(events[2]["records"], 2);
        assert!(events[0].get("group_id").is_none());
    }
}
