use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "report_cleaner";
pub const ENV_PREFIX: &str = "REPORT_CLEANER";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Process groups and split-group parts on the rayon pool.
    pub parallel: bool,
    /// Worker threads for the pool; rayon's default when unset.
    pub threads: Option<usize>,
    /// Show the progress bar.
    pub progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            parallel: true,
            threads: None,
            progress: true,
        }
    }
}

impl Settings {
    /// Defaults, then the config file, then `REPORT_CLEANER_*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("parallel", true)?
            .set_default("progress", true)?;
        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

// ── Tests ──
