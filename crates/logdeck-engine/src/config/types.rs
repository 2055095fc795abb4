//! Configuration types for logdeck
//!
//! Defines `Settings`, the project settings file (.logdeck/config.toml), and
//! one sub-type per section.

use logdeck_core::{CollapseMode, ThreadState};
use serde::{Deserialize, Serialize};

/// Project settings (.logdeck/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub layout: LayoutSettings,

    #[serde(default)]
    pub repeat: RepeatSettings,

    #[serde(default)]
    pub threads: ThreadSettings,

    #[serde(default)]
    pub filters: FilterSettings,

    #[serde(default)]
    pub ingest: IngestSettings,
}

/// Retention settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreSettings {
    /// Maximum number of stored records before front trimming
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

fn default_max_lines() -> usize {
    10_000
}

/// Row geometry and group display defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LayoutSettings {
    /// Height of a regular row in layout units
    #[serde(default = "default_row_height")]
    pub row_height: u32,

    /// Height of a marker row
    #[serde(default = "default_marker_height")]
    pub marker_height: u32,

    /// Frames shown while a group is in preview mode
    #[serde(default = "default_preview_frames")]
    pub preview_frames: usize,

    /// Collapse state new groups start in
    #[serde(default)]
    pub default_collapse: CollapseMode,

    /// Extra rows included on each side of the visible window
    #[serde(default = "default_overscan_rows")]
    pub overscan_rows: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            row_height: default_row_height(),
            marker_height: default_marker_height(),
            preview_frames: default_preview_frames(),
            default_collapse: CollapseMode::default(),
            overscan_rows: default_overscan_rows(),
        }
    }
}

fn default_row_height() -> u32 {
    18
}

fn default_marker_height() -> u32 {
    24
}

fn default_preview_frames() -> usize {
    3
}

fn default_overscan_rows() -> usize {
    10
}

/// Repeat collapsing settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RepeatSettings {
    /// Window in milliseconds; 0 disables collapsing
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Characters of the repeated line shown in the notification
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for RepeatSettings {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_window_ms() -> u64 {
    1000
}

fn default_preview_chars() -> usize {
    80
}

/// Thread dump heuristics
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ThreadSettings {
    /// Thread names treated as the main/UI thread
    #[serde(default = "default_main_thread_names")]
    pub main_thread_names: Vec<String>,

    /// State names (snake_case) that count as blocking
    #[serde(default = "default_blocking_states")]
    pub blocking_states: Vec<String>,
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            main_thread_names: default_main_thread_names(),
            blocking_states: default_blocking_states(),
        }
    }
}

impl ThreadSettings {
    pub fn is_main_thread(&self, name: &str) -> bool {
        self.main_thread_names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn is_blocking(&self, state: &ThreadState) -> bool {
        self.blocking_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(state.name()))
    }
}

fn default_main_thread_names() -> Vec<String> {
    vec!["main".to_string()]
}

fn default_blocking_states() -> Vec<String> {
    ["waiting", "blocked", "timed_waiting", "monitor"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Initial filter settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FilterSettings {
    /// Records preceding a level match that stay visible
    #[serde(default)]
    pub context_lines: usize,

    /// Path prefixes that count as application code for the app-only scope
    #[serde(default)]
    pub app_roots: Vec<String>,
}

/// Host-side batching of incoming lines
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IngestSettings {
    /// Lines buffered before a flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum time a line waits in the buffer
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    16
}
