//! Stack frame recognition and parsing.
//!
//! Debug sessions interleave frames from several runtimes. A line is a frame
//! when one of the patterns below matches; the parsed [`FrameInfo`] feeds the
//! class-tag classifier and the app-only scope key of the record.

use regex::Regex;
use std::sync::LazyLock;

// ─────────────────────────────────────────────────────────────────────────────
// Regex Patterns
// ─────────────────────────────────────────────────────────────────────────────

/// Dart VM format: `#0      main (package:app/main.dart:15:3)`
/// Captures: 1=frame_number, 2=function_name, 3=file_path, 4=line, 5=column (optional)
static DART_VM_FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(\d+)\s+(.+?)\s+\((.+?):(\d+)(?::(\d+))?\)\s*$")
        .expect("Invalid DART_VM_FRAME_REGEX")
});

/// JVM format: `at com.example.Foo.bar(Foo.java:42)`, `at A.run(Native Method)`
/// Captures: 1=qualified_class, 2=method, 3=source, 4=line (optional)
static JVM_FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^at\s+([\w$./]+)\.([\w$<>\-]+)\(([^:()]*)(?::(\d+))?\)\s*$")
        .expect("Invalid JVM_FRAME_REGEX")
});

/// V8 format: `at handler (/srv/app/index.js:10:5)` or `at /srv/app/index.js:10:5`
/// Captures: 1=function_name (optional), 2=file_path, 3=line, 4=column
static V8_FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^at\s+(?:(.+?)\s+\()?(.+?):(\d+):(\d+)\)?\s*$").expect("Invalid V8_FRAME_REGEX")
});

/// Python format: `File "/srv/app/x.py", line 3, in handler`
/// Captures: 1=file_path, 2=line, 3=function_name (optional)
static PYTHON_FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^File "(.+?)", line (\d+)(?:, in (.+))?$"#).expect("Invalid PYTHON_FRAME_REGEX")
});

/// JVM elided frames: `... 12 more`
static ELIDED_FRAMES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\.\s+\d+\s+more\s*$").expect("Invalid ELIDED_FRAMES_REGEX"));

/// Dart async suspension marker
static ASYNC_GAP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<asynchronous suspension>$").expect("Invalid ASYNC_GAP_REGEX"));

/// Package/SDK paths that are not part of the debugged application
static PACKAGE_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(dart:|package:flutter/|node:|internal/)|\.pub-cache|node_modules|site-packages|^(java|javax|jdk|sun|android|androidx|kotlin|kotlinx|dalvik)\.",
    )
    .expect("Invalid PACKAGE_PATH_REGEX")
});

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime dialect a frame was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    DartVm,
    Jvm,
    V8,
    Python,
    /// `... N more` and `<asynchronous suspension>`
    #[default]
    Elided,
}

/// A single parsed frame line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameInfo {
    pub format: FrameFormat,

    /// Function/method name (e.g. "run", "State.setState")
    pub function_name: String,

    /// Owning class, when the dialect exposes one
    pub class_name: Option<String>,

    /// File path or source name
    pub file_path: String,

    /// Line number (1-based, 0 if unknown)
    pub line: u32,

    /// Column number (1-based, 0 if unknown)
    pub column: u32,

    /// Whether this frame belongs to a package/SDK rather than the application
    pub is_package_frame: bool,
}

impl FrameInfo {
    fn elided() -> Self {
        Self::default()
    }

    /// Key used by the app-only scope predicate.
    ///
    /// Path-like sources (`package:app/x.dart`, `/srv/app/x.js`) are used as
    /// is. Bare JVM source names (`Foo.java`) carry no location, so the
    /// qualified class is used instead.
    pub fn scope_key(&self) -> Option<String> {
        if self.format == FrameFormat::Elided {
            return None;
        }
        if self.file_path.contains('/') || self.file_path.contains(':') {
            return Some(self.file_path.clone());
        }
        self.class_name
            .clone()
            .or_else(|| (!self.file_path.is_empty()).then(|| self.file_path.clone()))
    }

    /// Returns formatted location string: "file:line:col"
    pub fn display_location(&self) -> String {
        match (self.line, self.column) {
            (0, _) => self.file_path.clone(),
            (line, 0) => format!("{}:{}", self.file_path, line),
            (line, col) => format!("{}:{}:{}", self.file_path, line, col),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a frame line in any supported dialect.
///
/// Leading whitespace and box-drawing gutters (`│ #0 ...`) are ignored.
pub fn parse_frame(line: &str) -> Option<FrameInfo> {
    let trimmed = line
        .trim_start_matches(|c: char| c.is_whitespace() || "│├└┌─┄".contains(c))
        .trim_end();

    if trimmed.is_empty() {
        return None;
    }

    if ASYNC_GAP_REGEX.is_match(trimmed) || ELIDED_FRAMES_REGEX.is_match(trimmed) {
        return Some(FrameInfo::elided());
    }

    if let Some(caps) = DART_VM_FRAME_REGEX.captures(trimmed) {
        let function_name = caps[2].to_string();
        let class_name = function_name
            .rsplit_once('.')
            .map(|(class, _)| class.to_string());
        return Some(FrameInfo {
            format: FrameFormat::DartVm,
            is_package_frame: is_package_path(&caps[3]),
            class_name,
            function_name,
            file_path: caps[3].to_string(),
            line: caps[4].parse().unwrap_or(0),
            column: caps.get(5).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
        });
    }

    if let Some(caps) = JVM_FRAME_REGEX.captures(trimmed) {
        let class_name = caps[1].to_string();
        return Some(FrameInfo {
            format: FrameFormat::Jvm,
            is_package_frame: is_package_path(&class_name),
            function_name: caps[2].to_string(),
            file_path: caps[3].to_string(),
            line: caps.get(4).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
            column: 0,
            class_name: Some(class_name),
        });
    }

    if let Some(caps) = V8_FRAME_REGEX.captures(trimmed) {
        let function_name = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let class_name = function_name
            .rsplit_once('.')
            .map(|(class, _)| class.trim_start_matches("new ").to_string());
        return Some(FrameInfo {
            format: FrameFormat::V8,
            is_package_frame: is_package_path(&caps[2]),
            class_name,
            function_name,
            file_path: caps[2].to_string(),
            line: caps[3].parse().unwrap_or(0),
            column: caps[4].parse().unwrap_or(0),
        });
    }

    if let Some(caps) = PYTHON_FRAME_REGEX.captures(trimmed) {
        return Some(FrameInfo {
            format: FrameFormat::Python,
            is_package_frame: is_package_path(&caps[1]),
            function_name: caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            class_name: None,
            file_path: caps[1].to_string(),
            line: caps[2].parse().unwrap_or(0),
            column: 0,
        });
    }

    None
}

/// Check whether a line is a stack frame in any supported dialect
pub fn is_frame_line(line: &str) -> bool {
    parse_frame(line).is_some()
}

/// Determines if a path (or qualified class name) belongs to a package/SDK.
///
/// Package frames include:
/// - `dart:` and `package:flutter/` (Dart and Flutter SDK)
/// - `node:` / `internal/` (Node core) and anything under `node_modules`
/// - `.pub-cache` and `site-packages` (installed dependencies)
/// - JVM platform classes (`java.`, `kotlin.`, `android.`, ...)
pub fn is_package_path(path: &str) -> bool {
    PACKAGE_PATH_REGEX.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jvm_frame() {
        let frame = parse_frame("    at A.run(A.java:1)").unwrap();
        assert_eq!(frame.format, FrameFormat::Jvm);
        assert_eq!(frame.class_name.as_deref(), Some("A"));
        assert_eq!(frame.function_name, "run");
        assert_eq!(frame.file_path, "A.java");
        assert_eq!(frame.line, 1);
        assert!(!frame.is_package_frame);
    }

    #[test]
    fn test_parse_jvm_native_frame() {
        let frame = parse_frame("\tat java.lang.Object.wait(Native Method)").unwrap();
        assert_eq!(frame.class_name.as_deref(), Some("java.lang.Object"));
        assert_eq!(frame.line, 0);
        assert!(frame.is_package_frame);
    }

    #[test]
    fn test_parse_dart_vm_frame() {
        let frame = parse_frame("#0      Counter.increment (package:app/counter.dart:15:3)").unwrap();
        assert_eq!(frame.format, FrameFormat::DartVm);
        assert_eq!(frame.class_name.as_deref(), Some("Counter"));
        assert_eq!(frame.file_path, "package:app/counter.dart");
        assert_eq!((frame.line, frame.column), (15, 3));
    }

    #[test]
    fn test_parse_dart_frame_without_column() {
        let frame = parse_frame("#3      main (package:app/main.dart:9)").unwrap();
        assert_eq!(frame.line, 9);
        assert_eq!(frame.column, 0);
        assert_eq!(frame.class_name, None);
    }

    #[test]
    fn test_parse_dart_frame_in_box_gutter() {
        assert!(is_frame_line("│ #1   _State.build (package:app/home.dart:40:7)"));
    }

    #[test]
    fn test_parse_v8_frames() {
        let named = parse_frame("    at Server.handle (/srv/app/server.js:10:5)").unwrap();
        assert_eq!(named.format, FrameFormat::V8);
        assert_eq!(named.class_name.as_deref(), Some("Server"));
        assert_eq!(named.file_path, "/srv/app/server.js");

        let anonymous = parse_frame("    at /srv/app/index.js:3:1").unwrap();
        assert_eq!(anonymous.function_name, "");
        assert_eq!(anonymous.line, 3);

        let lib = parse_frame("    at run (/srv/app/node_modules/x/y.js:1:1)").unwrap();
        assert!(lib.is_package_frame);
    }

    #[test]
    fn test_parse_python_frame() {
        let frame = parse_frame(r#"  File "/srv/app/views.py", line 12, in index"#).unwrap();
        assert_eq!(frame.format, FrameFormat::Python);
        assert_eq!(frame.function_name, "index");
        assert_eq!(frame.line, 12);
    }

    #[test]
    fn test_elided_and_async_gap_are_frames() {
        assert!(is_frame_line("\t... 12 more"));
        assert!(is_frame_line("<asynchronous suspension>"));
    }

    #[test]
    fn test_non_frames() {
        assert!(!is_frame_line("Error: disk full"));
        assert!(!is_frame_line("\"main\" tid=1 Runnable"));
        assert!(!is_frame_line("look at this"));
        assert!(!is_frame_line(""));
    }

    #[test]
    fn test_scope_key() {
        let jvm = parse_frame("at com.example.app.Main.run(Main.java:3)").unwrap();
        assert_eq!(jvm.scope_key().as_deref(), Some("com.example.app.Main"));

        let dart = parse_frame("#0 main (package:app/main.dart:1:1)").unwrap();
        assert_eq!(dart.scope_key().as_deref(), Some("package:app/main.dart"));

        assert_eq!(parse_frame("... 3 more").unwrap().scope_key(), None);
    }

    #[test]
    fn test_is_package_path() {
        assert!(is_package_path("dart:async/zone.dart"));
        assert!(is_package_path("package:flutter/src/widgets/framework.dart"));
        assert!(is_package_path("kotlinx.coroutines.DispatchedTask"));
        assert!(!is_package_path("package:app/main.dart"));
        assert!(!is_package_path("com.example.Main"));
    }

    #[test]
    fn test_display_location() {
        let frame = parse_frame("#0 main (package:app/main.dart:15:3)").unwrap();
        assert_eq!(frame.display_location(), "package:app/main.dart:15:3");
    }
}
