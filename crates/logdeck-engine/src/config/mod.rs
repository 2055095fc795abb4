//! Configuration: settings types and the `.logdeck/config.toml` loader

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, read_settings, CONFIG_FILENAME, LOGDECK_DIR};
pub use types::{
    FilterSettings, IngestSettings, LayoutSettings, RepeatSettings, Settings, StoreSettings,
    ThreadSettings,
};
