//! Line classifiers.
//!
//! Pure functions run once per incoming line. They derive the level, source
//! tag, class tags and error kind that the filter predicates consume.
//! Producer-supplied values on the [`RawLine`] always win over detection.

use regex::Regex;
use std::sync::LazyLock;

use crate::ansi::contains_word;
use crate::stack_trace::is_frame_line;
use crate::types::{ErrorKind, Level, RawLine};

// ─────────────────────────────────────────────────────────────────────────────
// Pattern Tables
// ─────────────────────────────────────────────────────────────────────────────

/// Android logcat brief format: `E/ActivityManager( 123): message`
/// Captures: 1=priority, 2=tag
static LOGCAT_BRIEF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([VDIWEF])/([^(:]+?)\s*(?:\(\s*\d+\))?:").expect("Invalid LOGCAT_BRIEF_REGEX")
});

/// Android logcat threadtime format: `01-02 03:04:05.678  123  456 E Tag: message`
/// Captures: 1=priority, 2=tag
static LOGCAT_THREADTIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d{3}\s+\d+\s+\d+\s+([VDIWEF])\s+([^:]+?)\s*:")
        .expect("Invalid LOGCAT_THREADTIME_REGEX")
});

/// Leading level word: `ERROR: x`, `[warn] x`, `(debug) x`
/// Captures: 1=level word
static LEVEL_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[\[(]?(fatal|error|err|warning|warn|info|notice|debug|trace|verbose|perf|todo)[\])]?(?::|\s|$)",
    )
    .expect("Invalid LEVEL_PREFIX_REGEX")
});

/// Leading bracketed tags: `[Network] x`, `[info] [Auth] x`
static BRACKET_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([A-Za-z][\w.\-]{0,40})\]\s*(?:\[([A-Za-z][\w.\-]{0,40})\])?")
        .expect("Invalid BRACKET_TAG_REGEX")
});

/// Exception/error class names: `java.lang.IllegalStateException`, `TypeError`
static EXCEPTION_CLASS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:[a-z_][\w$]*\.)*[A-Z][\w$]*(?:Exception|Error|Throwable))\b")
        .expect("Invalid EXCEPTION_CLASS_REGEX")
});

/// Timing reports: `took 320ms`, `elapsed: 1.5 s`, `Skipped 42 frames`
static PERFORMANCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(took|elapsed|duration)\s*[:=]?\s*\d+(\.\d+)?\s*(ms|s|sec|seconds)\b|\bskipped\s+\d+\s+frames\b|\bjank\b",
    )
    .expect("Invalid PERFORMANCE_REGEX")
});

/// `TODO` / `FIXME` markers (upper case only)
static TODO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(TODO|FIXME)\b").expect("Invalid TODO_REGEX"));

const ERROR_KEYWORDS: &[&str] = &["error", "exception", "fatal", "failed", "failure", "panic"];
const WARNING_KEYWORDS: &[&str] = &["warning", "warn", "deprecated", "caution"];
const DEBUG_KEYWORDS: &[&str] = &["debug", "trace", "verbose"];

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Derived fields for one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub level: Level,
    pub source_tag: Option<String>,
    pub class_tags: Vec<String>,
    pub error_kind: Option<ErrorKind>,
}

/// Run every classifier over a line.
///
/// `text` is the plain (ANSI-stripped) text of `raw`.
pub fn classify(raw: &RawLine, text: &str) -> Classification {
    let error_kind = classify_error_kind(text);
    let level = raw
        .level
        .unwrap_or_else(|| classify_level(text, error_kind));
    let source_tag = raw
        .source_tag
        .clone()
        .or_else(|| classify_source_tag(text));

    Classification {
        level,
        source_tag,
        class_tags: classify_class_tags(text),
        error_kind,
    }
}

fn logcat_priority_level(priority: &str) -> Level {
    match priority {
        "E" | "F" => Level::Error,
        "W" => Level::Warning,
        "I" => Level::Info,
        _ => Level::Debug,
    }
}

/// Detect the severity of a line.
///
/// Checked in order: logcat priority, leading level word, error kind,
/// `TODO`/`FIXME`, then content keywords. Stack frame lines skip keyword
/// detection because class names like `ErrorHandler` would misfire.
pub fn classify_level(text: &str, error_kind: Option<ErrorKind>) -> Level {
    let trimmed = text.trim();

    if let Some(caps) = LOGCAT_THREADTIME_REGEX.captures(trimmed) {
        return logcat_priority_level(&caps[1]);
    }
    if let Some(caps) = LOGCAT_BRIEF_REGEX.captures(trimmed) {
        return logcat_priority_level(&caps[1]);
    }

    if let Some(caps) = LEVEL_PREFIX_REGEX.captures(trimmed) {
        if let Some(level) = Level::parse(&caps[1]) {
            return level;
        }
        match caps[1].to_ascii_lowercase().as_str() {
            "fatal" => return Level::Error,
            "trace" => return Level::Debug,
            _ => {}
        }
    }

    if error_kind.is_some() {
        return Level::Error;
    }

    if TODO_REGEX.is_match(trimmed) {
        return Level::Todo;
    }

    if is_frame_line(trimmed) {
        return Level::Info;
    }

    if ERROR_KEYWORDS.iter().any(|kw| contains_word(trimmed, kw)) {
        return Level::Error;
    }
    if WARNING_KEYWORDS.iter().any(|kw| contains_word(trimmed, kw)) {
        return Level::Warning;
    }
    if PERFORMANCE_REGEX.is_match(trimmed) {
        return Level::Performance;
    }
    if DEBUG_KEYWORDS.iter().any(|kw| contains_word(trimmed, kw)) {
        return Level::Debug;
    }
    if contains_word(trimmed, "notice") || trimmed.to_ascii_lowercase().starts_with("note:") {
        return Level::Notice;
    }

    Level::Info
}

/// Detect the source tag of a line (logcat tag or leading `[Tag]`)
pub fn classify_source_tag(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if let Some(caps) = LOGCAT_THREADTIME_REGEX.captures(trimmed) {
        return Some(caps[2].trim().to_string());
    }
    if let Some(caps) = LOGCAT_BRIEF_REGEX.captures(trimmed) {
        return Some(caps[2].trim().to_string());
    }

    let caps = BRACKET_TAG_REGEX.captures(trimmed)?;
    // A leading level word in brackets is not a tag; look at the next bracket
    [caps.get(1), caps.get(2)]
        .into_iter()
        .flatten()
        .map(|m| m.as_str())
        .find(|tag| Level::parse(tag).is_none() && !tag.eq_ignore_ascii_case("fatal"))
        .map(str::to_string)
}

/// Extract exception/error class names mentioned in a line
pub fn classify_class_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in EXCEPTION_CLASS_REGEX.captures_iter(text) {
        let tag = caps[1].to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Detect what kind of error a line reports, if any
pub fn classify_error_kind(text: &str) -> Option<ErrorKind> {
    let lower = text.to_ascii_lowercase();

    if lower.contains("anr in ") || lower.contains("application not responding") {
        return Some(ErrorKind::Anr);
    }
    if lower.contains("outofmemoryerror") || lower.contains("out of memory") {
        return Some(ErrorKind::OutOfMemory);
    }
    if lower.contains("assertionerror")
        || lower.contains("assertion failed")
        || lower.contains("failed assertion")
    {
        return Some(ErrorKind::Assertion);
    }
    if lower.contains("fatal exception")
        || lower.contains("fatal signal")
        || lower.contains("sigsegv")
        || lower.contains("segmentation fault")
        || lower.contains("panicked at")
    {
        return Some(ErrorKind::Crash);
    }
    if lower.contains("unhandled exception")
        || lower.contains("uncaught")
        || lower.starts_with("traceback (most recent call last)")
        || (!is_frame_line(text) && EXCEPTION_CLASS_REGEX.is_match(text))
    {
        return Some(ErrorKind::Exception);
    }

    None
}
