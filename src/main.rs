//! logdeck - Render the viewport of a captured debug-session log
//!
//! This is the binary entry point. Reading and rendering live in the library,
//! the store and viewport in `logdeck-engine`.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use logdeck_core::Level;
use logdeck_engine::{load_settings, ExclusionRule, LogEngine};

/// logdeck - Incremental log viewer for debug-session output
#[derive(Parser, Debug)]
#[command(name = "logdeck")]
#[command(about = "Group, filter and window debug-session logs", long_about = None)]
struct Args {
    /// Log file to read (stdin when omitted)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Project directory holding .logdeck/config.toml
    #[arg(long, value_name = "DIR")]
    config: Option<PathBuf>,

    /// Show only these levels (repeatable)
    #[arg(long = "level", value_name = "LEVEL")]
    levels: Vec<String>,

    /// Hide lines matching this pattern (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// Treat --exclude patterns as regular expressions
    #[arg(long)]
    regex: bool,

    /// Hide lines with this source tag (repeatable)
    #[arg(long = "hide-source", value_name = "TAG")]
    hide_sources: Vec<String>,

    /// Hide lines with this class tag (repeatable)
    #[arg(long = "hide-class", value_name = "TAG")]
    hide_classes: Vec<String>,

    /// Hide frames outside the app's own code
    #[arg(long)]
    app_only: bool,

    /// Search query (case-insensitive regex)
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Show only lines matching --search
    #[arg(long)]
    filter_search: bool,

    /// Retention cap
    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Scroll offset of the viewport top (bottom when omitted)
    #[arg(long, value_name = "PX")]
    top: Option<u64>,

    /// Viewport height
    #[arg(long, value_name = "PX", default_value_t = 720)]
    height: u64,

    /// Print NDJSON events instead of text rows
    #[arg(long)]
    json: bool,

    /// More diagnostics in the log file (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let log_dir =
        logdeck_core::logging::init(args.verbose).wrap_err("failed to initialize logging")?;
    tracing::debug!("logging to {}", log_dir.display());

    let project_dir = match args.config.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let mut settings = load_settings(&project_dir);
    if let Some(max_lines) = args.max_lines {
        settings.store.max_lines = max_lines;
    }

    let mut engine = LogEngine::new(&settings);
    apply_filters(&mut engine, &args)?;
    engine.set_viewport_height(args.height);

    let count = match &args.path {
        Some(path) => {
            let file = File::open(path)
                .wrap_err_with(|| format!("failed to open {}", path.display()))?;
            logdeck::ingest(BufReader::new(file), &mut engine, &settings.ingest)?
        }
        None => logdeck::ingest(io::stdin().lock(), &mut engine, &settings.ingest)?,
    };
    engine.end_of_stream();
    engine.recompute_and_index();
    tracing::info!("ingested {} lines into {} records", count, engine.len());

    if let Some(top) = args.top {
        engine.scroll_to(top);
    }
    let top = engine.scroll_offset();
    let window = engine.query_viewport(top, top + args.height);

    let mut stdout = io::stdout().lock();
    if args.json {
        logdeck::write_events(&engine, window, &mut stdout)?;
    } else {
        logdeck::write_text(&engine, window, &mut stdout)?;
    }
    Ok(())
}

fn apply_filters(engine: &mut LogEngine, args: &Args) -> color_eyre::Result<()> {
    if !args.levels.is_empty() {
        let mut levels = HashSet::new();
        for name in &args.levels {
            let Some(level) = Level::parse(name) else {
                bail!("unknown level '{}'", name);
            };
            levels.insert(level);
        }
        engine.set_level_filter(levels);
    }

    if !args.excludes.is_empty() {
        let rules = args
            .excludes
            .iter()
            .map(|p| {
                if args.regex {
                    ExclusionRule::regex(p.as_str())
                } else {
                    ExclusionRule::literal(p.as_str())
                }
            })
            .collect();
        engine.set_exclusion_rules(rules);
    }

    if !args.hide_sources.is_empty() {
        engine.set_source_tag_filter(args.hide_sources.iter().cloned().collect());
    }
    if !args.hide_classes.is_empty() {
        engine.set_class_tag_filter(args.hide_classes.iter().cloned().collect());
    }
    if args.app_only {
        engine.set_app_only(true);
    }

    if let Some(query) = &args.search {
        engine.set_search_query(query);
        if let Some(error) = &engine.search().error {
            bail!("invalid search query: {}", error);
        }
        if args.filter_search {
            engine.set_search_filter_mode(true, None);
        }
    }
    Ok(())
}
