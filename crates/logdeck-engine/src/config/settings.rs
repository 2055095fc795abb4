//! Settings file loader (.logdeck/config.toml)

use std::path::Path;

use logdeck_core::prelude::*;

use super::types::Settings;

pub const LOGDECK_DIR: &str = ".logdeck";
pub const CONFIG_FILENAME: &str = "config.toml";

/// Load settings from `.logdeck/config.toml` under `project_path`.
///
/// Missing, unreadable or malformed files fall back to defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(LOGDECK_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match read_settings(&config_path) {
        Ok(settings) => {
            debug!("Loaded settings from {:?}", config_path);
            settings
        }
        Err(e) => {
            warn!("{}, using defaults", e);
            Settings::default()
        }
    }
}

/// Read and parse one settings file
pub fn read_settings(config_path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(config_path)?;
    toml::from_str(&content).map_err(|e| Error::config_invalid(config_path, e.message()))
}

/// Create `.logdeck/config.toml` with commented defaults if it does not exist
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let logdeck_dir = project_path.join(LOGDECK_DIR);

    if !logdeck_dir.exists() {
        std::fs::create_dir_all(&logdeck_dir)
            .with_context(|| format!("Failed to create {:?}", logdeck_dir))?;
    }

    let config_path = logdeck_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# logdeck configuration

[store]
max_lines = 10000       # Oldest records are trimmed beyond this

[layout]
row_height = 18
marker_height = 24
preview_frames = 3      # Frames shown for a group in preview mode
default_collapse = "preview"   # preview | expanded | collapsed
overscan_rows = 10

[repeat]
window_ms = 1000        # 0 disables repeat collapsing
preview_chars = 80

[threads]
main_thread_names = ["main"]
blocking_states = ["waiting", "blocked", "timed_waiting", "monitor"]

[filters]
context_lines = 0
app_roots = []          # Empty = anything outside SDK/package paths

[ingest]
batch_size = 100
flush_interval_ms = 16
"#;
        std::fs::write(&config_path, default_content)
            .with_context(|| format!("Failed to write {:?}", config_path))?;
        info!("Created {:?}", config_path);
    }

    Ok(())
}
