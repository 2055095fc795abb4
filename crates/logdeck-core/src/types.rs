//! Core domain type definitions

use serde::{Deserialize, Serialize};

/// Well-known category labels assigned by the capture layer.
///
/// Categories are free-form strings; these are the ones debug adapters emit.
pub mod category {
    pub const STDOUT: &str = "stdout";
    pub const STDERR: &str = "stderr";
    pub const CONSOLE: &str = "console";
    pub const IMPORTANT: &str = "important";
    pub const TELEMETRY: &str = "telemetry";
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Performance,
    Todo,
    Debug,
    Notice,
    Info,
}

impl Level {
    /// Every level, most severe first
    pub const ALL: [Level; 7] = [
        Level::Error,
        Level::Warning,
        Level::Performance,
        Level::Todo,
        Level::Debug,
        Level::Notice,
        Level::Info,
    ];

    /// Get display prefix for log level
    pub fn prefix(&self) -> &'static str {
        match self {
            Level::Error => "ERR",
            Level::Warning => "WRN",
            Level::Performance => "PRF",
            Level::Todo => "TDO",
            Level::Debug => "DBG",
            Level::Notice => "NTC",
            Level::Info => "INF",
        }
    }

    /// Lower-case name, as used in settings and CLI flags
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Performance => "performance",
            Level::Todo => "todo",
            Level::Debug => "debug",
            Level::Notice => "notice",
            Level::Info => "info",
        }
    }

    /// Parse a level name (accepts a few common aliases)
    pub fn parse(name: &str) -> Option<Level> {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "e" => Some(Level::Error),
            "warning" | "warn" | "w" => Some(Level::Warning),
            "performance" | "perf" => Some(Level::Performance),
            "todo" | "fixme" => Some(Level::Todo),
            "debug" | "dbg" | "d" | "verbose" | "v" => Some(Level::Debug),
            "notice" | "note" => Some(Level::Notice),
            "info" | "inf" | "i" => Some(Level::Info),
            _ => None,
        }
    }

    /// Numeric severity; higher is more severe
    pub fn severity(&self) -> u8 {
        match self {
            Level::Debug => 0,
            Level::Info => 1,
            Level::Notice => 2,
            Level::Todo => 3,
            Level::Performance => 4,
            Level::Warning => 5,
            Level::Error => 6,
        }
    }

    /// Get the more severe of two levels
    pub fn max_severity(self, other: Level) -> Level {
        if self.severity() >= other.severity() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant of a stored line record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Ordinary log line
    Line,
    /// Producer or engine supplied separator (session start, dump summary)
    Marker,
    /// Header of a stack trace or thread block
    StackHeader,
    /// Child frame of a group
    StackFrame,
    /// Counter replacing consecutive identical lines
    RepeatNotification,
}

/// Identifier of a group: the sequence number of its header record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Display state of a group's frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollapseMode {
    /// First few frames visible
    #[default]
    Preview,
    /// All frames visible
    Expanded,
    /// Header only
    Collapsed,
}

impl CollapseMode {
    /// Next state in the preview → expanded → collapsed cycle
    pub fn cycle(self) -> Self {
        match self {
            CollapseMode::Preview => CollapseMode::Expanded,
            CollapseMode::Expanded => CollapseMode::Collapsed,
            CollapseMode::Collapsed => CollapseMode::Preview,
        }
    }
}

/// Kind of error a line reports, derived by the error-kind classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A thrown exception (`FooException`, `Unhandled exception:`)
    Exception,
    /// A failed assertion
    Assertion,
    /// Memory exhaustion
    OutOfMemory,
    /// "Application not responding" report
    Anr,
    /// Fatal signal or crash report
    Crash,
}

/// Visual annotation the engine attaches to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// Thread header in a blocking state during a suspected ANR
    Blocker,
    /// Summary marker of a thread dump with suspected contention
    Contention,
}

/// A line as handed over by the capture/parser collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Rendered payload, stored verbatim
    pub content: String,
    /// Plain text for classification; derived from `content` when absent
    pub text: Option<String>,
    /// Channel label (see [`category`])
    pub category: String,
    /// Monotonic capture time in milliseconds, 0 if unknown
    pub timestamp: u64,
    /// Producer-assigned level, overrides the classifier
    pub level: Option<Level>,
    /// Producer-assigned source tag, overrides the classifier
    pub source_tag: Option<String>,
    /// Whether the producer marks this line as an explicit marker
    pub marker: bool,
}

impl RawLine {
    /// Create a plain stdout line
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            text: None,
            category: category::STDOUT.to_string(),
            timestamp: 0,
            level: None,
            source_tag: None,
            marker: false,
        }
    }

    /// Create an explicit marker line
    pub fn marker(content: impl Into<String>) -> Self {
        Self {
            marker: true,
            category: category::CONSOLE.to_string(),
            ..Self::new(content)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = Some(tag.into());
        self
    }
}

/// Per-record hide flags, one per filter predicate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterFlags {
    pub category: bool,
    pub level: bool,
    pub source: bool,
    pub class: bool,
    pub excluded: bool,
    pub search: bool,
    pub scope: bool,
}

impl FilterFlags {
    /// True if any predicate hides the record
    pub fn any(&self) -> bool {
        self.category
            || self.level
            || self.source
            || self.class
            || self.excluded
            || self.search
            || self.scope
    }
}

/// One stored unit of log content plus derived metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Absolute sequence number, assigned by the store on append
    pub seq: u64,
    pub kind: LineKind,
    /// Opaque rendered payload
    pub content: String,
    /// Plain text used for matching
    pub text: String,
    pub category: String,
    pub timestamp: u64,
    pub level: Level,
    pub group_id: Option<GroupId>,
    /// Ordinal of a frame inside its group
    pub frame_index: usize,
    pub source_tag: Option<String>,
    pub class_tags: Vec<String>,
    /// Scope key for the app-only predicate
    pub path: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub annotation: Option<Annotation>,
    /// Number of repeats folded into a RepeatNotification
    pub repeat_count: usize,
    /// Parsed as a frame but stored as a plain line; never becomes a header
    pub orphan_frame: bool,
    /// Rendered height in layout units; 0 hides the record
    pub height: u32,
    pub flags: FilterFlags,
}

impl LineRecord {
    /// Create a record of the given kind with default derived state
    pub fn new(kind: LineKind, content: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            seq: 0,
            kind,
            content: content.into(),
            text: text.into(),
            category: category::STDOUT.to_string(),
            timestamp: 0,
            level: Level::Info,
            group_id: None,
            frame_index: 0,
            source_tag: None,
            class_tags: Vec::new(),
            path: None,
            error_kind: None,
            annotation: None,
            repeat_count: 0,
            orphan_frame: false,
            height: 0,
            flags: FilterFlags::default(),
        }
    }

    /// Whether the record currently occupies space in the viewport
    pub fn is_visible(&self) -> bool {
        self.height > 0
    }

    pub fn is_frame(&self) -> bool {
        self.kind == LineKind::StackFrame
    }

    pub fn is_header(&self) -> bool {
        self.kind == LineKind::StackHeader
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// A plain line that grouping or repeat collapsing may still act on
    pub fn is_plain_line(&self) -> bool {
        self.kind == LineKind::Line && self.group_id.is_none()
    }

    /// Whether a following frame may promote this record to a header
    pub fn can_head_group(&self) -> bool {
        self.is_plain_line() && !self.orphan_frame
    }
}
