//! logdeck-engine - Line store and virtualized viewport for logdeck
//!
//! The engine takes lines in arrival order, groups stack traces and thread
//! dumps, folds repeats, evaluates seven independent filters into a per-record
//! height and keeps a prefix-sum index so the host can render only the rows
//! that intersect its viewport.
//!
//! Everything is synchronous. The host drives [`LogEngine`] with plain method
//! calls and reads the visible window back.

pub mod batcher;
pub mod config;
pub mod engine;
pub mod filter;
pub mod grouping;
pub mod layout;
pub mod repeat;
pub mod scroll;
pub mod store;
pub mod tags;
pub mod viewport;

// Re-export primary types
pub use batcher::LineBatcher;
pub use config::{load_settings, Settings};
pub use engine::LogEngine;
pub use filter::{ExclusionRule, FilterComposer, LineMatcher, SearchPattern, SearchState};
pub use layout::Layout;
pub use scroll::{Anchor, ScrollState};
pub use store::{Group, GroupKind, LineStore, TrimReport};
pub use tags::TagCounts;
pub use viewport::{Location, ViewportIndex, ViewportWindow};
