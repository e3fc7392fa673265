use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use snap_core::error::{Result, SnapError};

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_keep() -> usize {
    10
}

fn default_delay() -> u64 {
    10
}

fn default_timeout() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

/// Everything a snapshot run needs to know.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Only these droplet ids; empty means all.
    #[serde(default)]
    pub only: Vec<u64>,

    #[serde(default)]
    pub exclude: Vec<u64>,

    /// Snapshots to retain per droplet.
    #[serde(default = "default_keep")]
    pub keep: usize,

    /// Seconds between status polls.
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Seconds before a power-off or snapshot wait gives up.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Delete snapshots beyond `keep` after a successful snapshot.
    #[serde(default)]
    pub clean: bool,

    /// Skip droplets that already hold `keep` snapshots.
    #[serde(default)]
    pub stop: bool,

    /// Power droplets off before the snapshot.
    #[serde(default = "default_true")]
    pub shutdown: bool,

    #[serde(default)]
    pub stop_by_power: bool,

    #[serde(default)]
    pub log: Option<PathBuf>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_url: default_api_url(),
            only: Vec::new(),
            exclude: Vec::new(),
            keep: default_keep(),
            delay: default_delay(),
            timeout: default_timeout(),
            clean: false,
            stop: false,
            shutdown: true,
            stop_by_power: false,
            log: None,
        }
    }
}

// Keeps the token out of debug output.
impl fmt::Debug for SnapshotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("api_url", &self.api_url)
            .field("only", &self.only)
            .field("exclude", &self.exclude)
            .field("keep", &self.keep)
            .field("delay", &self.delay)
            .field("timeout", &self.timeout)
            .field("clean", &self.clean)
            .field("stop", &self.stop)
            .field("shutdown", &self.shutdown)
            .field("stop_by_power", &self.stop_by_power)
            .field("log", &self.log)
            .finish()
    }
}

/// Command-line values; `None` / empty leaves the loaded value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub access_token: Option<String>,
    pub only: Vec<u64>,
    pub exclude: Vec<u64>,
    pub keep: Option<usize>,
    pub delay: Option<u64>,
    pub timeout: Option<u64>,
    pub clean: bool,
    pub stop: bool,
    pub no_shutdown: bool,
    pub stop_by_power: bool,
    pub log: Option<PathBuf>,
}

impl SnapshotConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(contents)?)
    }

    /// Layer command-line values on top of this configuration.
    ///
    /// Switches can only turn behaviour on; `no_shutdown` turns it off.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(token) = overrides.access_token {
            self.access_token = Some(token);
        }
        if !overrides.only.is_empty() {
            self.only = overrides.only;
        }
        if !overrides.exclude.is_empty() {
            self.exclude = overrides.exclude;
        }
        if let Some(keep) = overrides.keep {
            self.keep = keep;
        }
        if let Some(delay) = overrides.delay {
            self.delay = delay;
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        self.clean |= overrides.clean;
        self.stop |= overrides.stop;
        self.stop_by_power |= overrides.stop_by_power;
        if overrides.no_shutdown {
            self.shutdown = false;
        }
        if overrides.log.is_some() {
            self.log = overrides.log;
        }
    }

    /// The token, or a configuration error explaining how to supply one.
    pub fn token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SnapError::config(
                    "DigitalOcean access token is missing; set DIGITAL_OCEAN_ACCESS_TOKEN or pass --digital-ocean-access-token",
                )
            })
    }

    pub fn validate(&self) -> Result<()> {
        self.token()?;
        if self.stop && self.keep == 0 {
            return Err(SnapError::config(
                "--stop with keep 0 would skip every droplet",
            ));
        }
        if self.delay == 0 || self.timeout == 0 {
            return Err(SnapError::config("delay and timeout must be greater than zero"));
        }
        if self.delay > self.timeout {
            return Err(SnapError::config(format!(
                "delay ({}s) must not exceed timeout ({}s)",
                self.delay, self.timeout
            )));
        }
        if let Some(id) = self.only.iter().find(|id| self.exclude.contains(id)) {
            return Err(SnapError::config(format!(
                "droplet {id} is both selected with --only and excluded with --exclude"
            )));
        }
        Ok(())
    }

    /// Whether a droplet passes the `only` / `exclude` filters.
    pub fn selects(&self, droplet_id: u64) -> bool {
        (self.only.is_empty() || self.only.contains(&droplet_id))
            && !self.exclude.contains(&droplet_id)
    }
}
