//! logdeck library
//!
//! Glue between the `logdeck` binary and the engine: chunked input reading
//! and viewport rendering.

pub mod input;
pub mod output;

pub use input::{ingest, parse_line};
pub use output::{render_text, write_events, write_text, ViewEvent};
