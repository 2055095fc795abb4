//! Thread header recognition for thread dumps.
//!
//! Covers the header shapes emitted by Android ANR traces
//! (`"main" prio=5 tid=1 Runnable`), jstack
//! (`"worker-1" #12 daemon prio=5 tid=0x7f nid=0x1a waiting on condition`)
//! and the compact form debug adapters print (`"main" tid=1 Runnable`).

use regex::Regex;
use std::sync::LazyLock;

/// Quoted thread name followed by attributes
/// Captures: 1=name, 2=attributes
static THREAD_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"([^"]+)"\s*(.*)$"#).expect("Invalid THREAD_HEADER_REGEX"));

/// `tid=` attribute value
static TID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btid=(\S+)").expect("Invalid TID_REGEX"));

/// jstack state line: `   java.lang.Thread.State: TIMED_WAITING (sleeping)`
static THREAD_STATE_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*java\.lang\.Thread\.State:\s*([A-Za-z_]+)")
        .expect("Invalid THREAD_STATE_LINE_REGEX")
});

/// Lock/detail lines inside a thread block: `- locked <0x1>`, `  | sysTid=12`
static THREAD_DETAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-\s+(locked|waiting on|waiting to lock|parking to wait for|sleeping on)\b|\|\s)")
        .expect("Invalid THREAD_DETAIL_REGEX")
});

/// Scheduling state reported in a thread header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadState {
    Runnable,
    Waiting,
    TimedWaiting,
    Blocked,
    Monitor,
    Sleeping,
    Native,
    Other(String),
    Unknown,
}

impl ThreadState {
    /// Map a state token (any case, `-`/space/`_` separated) to a state
    pub fn from_token(token: &str) -> Option<ThreadState> {
        let normalized = token
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
            .to_ascii_lowercase()
            .replace('-', "_");
        let state = match normalized.as_str() {
            "runnable" | "running" => ThreadState::Runnable,
            "waiting" | "wait" | "parked" => ThreadState::Waiting,
            "timed_waiting" | "timedwaiting" => ThreadState::TimedWaiting,
            "blocked" => ThreadState::Blocked,
            "monitor" => ThreadState::Monitor,
            "sleeping" => ThreadState::Sleeping,
            "native" => ThreadState::Native,
            "suspended" | "new" | "terminated" | "vmwait" => ThreadState::Other(normalized),
            _ => return None,
        };
        Some(state)
    }

    /// Normalized snake_case name, compared against configured state sets
    pub fn name(&self) -> &str {
        match self {
            ThreadState::Runnable => "runnable",
            ThreadState::Waiting => "waiting",
            ThreadState::TimedWaiting => "timed_waiting",
            ThreadState::Blocked => "blocked",
            ThreadState::Monitor => "monitor",
            ThreadState::Sleeping => "sleeping",
            ThreadState::Native => "native",
            ThreadState::Other(name) => name,
            ThreadState::Unknown => "unknown",
        }
    }
}

/// A parsed thread header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadHeader {
    pub name: String,
    pub tid: Option<String>,
    pub daemon: bool,
    pub state: ThreadState,
}

/// Parse a thread header line.
///
/// A quoted name alone is not enough (`"quoted" he said` is prose): the
/// attributes must carry a `tid=`/`prio=` attribute, a `#N` thread number or
/// a recognizable state token.
pub fn parse_thread_header(line: &str) -> Option<ThreadHeader> {
    let caps = THREAD_HEADER_REGEX.captures(line.trim())?;
    let name = caps[1].to_string();
    let attributes = caps.get(2).map(|m| m.as_str()).unwrap_or("");

    let tid = TID_REGEX.captures(attributes).map(|c| c[1].to_string());
    let has_attributes = tid.is_some()
        || attributes.contains("prio=")
        || attributes
            .split_whitespace()
            .any(|t| t.len() > 1 && t.starts_with('#') && t[1..].chars().all(|c| c.is_ascii_digit()));

    let state = attributes
        .split_whitespace()
        .filter(|t| !t.contains('='))
        .find_map(ThreadState::from_token);

    if !has_attributes && state.is_none() {
        return None;
    }

    let daemon = attributes.split_whitespace().any(|t| t == "daemon");

    Some(ThreadHeader {
        name,
        tid,
        daemon,
        state: state.unwrap_or(ThreadState::Unknown),
    })
}

/// Parse a jstack `java.lang.Thread.State:` line
pub fn parse_thread_state_line(line: &str) -> Option<ThreadState> {
    THREAD_STATE_LINE_REGEX
        .captures(line)
        .and_then(|caps| ThreadState::from_token(&caps[1]))
}

/// Lines that belong to a thread block without being frames
/// (state lines, lock annotations, Android `| key=value` detail rows)
pub fn is_thread_detail_line(line: &str) -> bool {
    THREAD_STATE_LINE_REGEX.is_match(line) || THREAD_DETAIL_REGEX.is_match(line)
}
