use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Overrides, SnapshotConfig};
use snap_core::error::{Result, SnapError};

pub const CONFIG_FILE_NAME: &str = ".do_snapshot.yml";
pub const TOKEN_ENV: &str = "DIGITAL_OCEAN_ACCESS_TOKEN";

/// Resolves configuration: defaults, then file, then environment, then flags.
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            home: dirs::home_dir(),
        }
    }

    /// Use `home` instead of the user's home directory when looking for
    /// the default file.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// The file that will be read, if any.
    ///
    /// An explicit path is returned even when missing so loading can report
    /// it; the default file only counts when it exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }
        self.home
            .as_ref()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }

    pub fn load(&self, overrides: Overrides) -> Result<SnapshotConfig> {
        let mut config = match self.config_path() {
            Some(path) => Self::load_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                SnapshotConfig::default()
            }
        };

        if let Some(token) = env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()) {
            debug!("Using access token from {}", TOKEN_ENV);
            config.access_token = Some(token);
        }

        config.apply(overrides);
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<SnapshotConfig> {
        debug!("Loading config from: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            SnapError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if contents.trim().is_empty() {
            return Ok(SnapshotConfig::default());
        }
        SnapshotConfig::from_yaml(&contents).map_err(|e| {
            SnapError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}
