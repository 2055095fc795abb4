//! # logdeck-core - Core Domain Types
//!
//! Foundation crate for logdeck. Provides the line data model, the pure
//! classifiers run once per incoming line, stack frame and thread header
//! recognition, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`LineRecord`] - One stored line plus derived metadata
//! - [`RawLine`] - A line as handed over by the capture layer
//! - [`Level`], [`LineKind`], [`GroupId`], [`FilterFlags`]
//!
//! ### Classifiers (`classify`)
//! - [`classify()`] - Level, source tag, class tags and error kind for a line
//!
//! ### Stack Frames (`stack_trace`)
//! - [`parse_frame()`] - Dart VM, JVM, V8 and Python frames
//! - [`FrameInfo`] - Parsed frame with scope key
//!
//! ### Thread Dumps (`thread_dump`)
//! - [`parse_thread_header()`] - `"main" tid=1 Runnable` style headers
//! - [`ThreadState`]
//!
//! ### Error Handling (`error`)
//! - [`Error`], [`Result`], [`ResultExt`]
//!
//! ## Prelude
//!
//! ```rust
//! use logdeck_core::prelude::*;
//! ```

pub mod ansi;
pub mod classify;
pub mod error;
pub mod logging;
pub mod stack_trace;
pub mod thread_dump;
pub mod types;

/// Prelude for common imports used throughout all logdeck crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use ansi::{contains_ansi_codes, contains_word, strip_ansi_codes};
pub use classify::{
    classify, classify_class_tags, classify_error_kind, classify_level, classify_source_tag,
    Classification,
};
pub use error::{Error, Result, ResultExt};
pub use stack_trace::{is_frame_line, is_package_path, parse_frame, FrameFormat, FrameInfo};
pub use thread_dump::{
    is_thread_detail_line, parse_thread_header, parse_thread_state_line, ThreadHeader,
    ThreadState,
};
pub use types::{
    category, Annotation, CollapseMode, ErrorKind, FilterFlags, GroupId, Level, LineKind,
    LineRecord, RawLine,
};
