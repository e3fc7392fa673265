//! Configuration for do-snapshot.
//!
//! Settings come from `~/.do_snapshot.yml` (or an explicit `--config`
//! file), the `DIGITAL_OCEAN_ACCESS_TOKEN` environment variable and finally
//! command-line flags, in that order of increasing priority.

pub mod config;
pub mod loader;

pub use config::{Overrides, SnapshotConfig, DEFAULT_API_URL};
pub use loader::{ConfigLoader, CONFIG_FILE_NAME, TOKEN_ENV};
