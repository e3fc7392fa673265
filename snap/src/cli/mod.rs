// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use snap_config::Overrides;

#[derive(Debug, Clone, Parser)]
#[command(name = "do_snapshot")]
#[command(about = "Snapshot DigitalOcean droplets and prune old snapshots")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a configuration file (default: ~/.do_snapshot.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output, including every poll
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub trace: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write the log to this file
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// API token (overrides DIGITAL_OCEAN_ACCESS_TOKEN)
    #[arg(long, global = true)]
    pub digital_ocean_access_token: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Snapshot every selected droplet, powering it off first
    Snap(SnapArgs),
    /// List droplets with their snapshot counts
    List,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct SnapArgs {
    /// Only these droplet ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<u64>,

    /// Skip these droplet ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<u64>,

    /// Snapshots to keep per droplet
    #[arg(short, long)]
    pub keep: Option<usize>,

    /// Seconds between status checks
    #[arg(short, long)]
    pub delay: Option<u64>,

    /// Seconds to wait for power-off or a snapshot before giving up
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Delete snapshots beyond --keep afterwards
    #[arg(long)]
    pub clean: bool,

    /// Skip droplets that already hold --keep snapshots
    #[arg(short, long)]
    pub stop: bool,

    /// Cut power instead of a graceful shutdown
    #[arg(long)]
    pub stop_by_power: bool,

    /// Snapshot running droplets without powering them off
    #[arg(long)]
    pub no_shutdown: bool,
}

impl Args {
    /// Flag values to layer over the loaded configuration.
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            access_token: self.digital_ocean_access_token.clone(),
            log: self.log.clone(),
            ..Overrides::default()
        };

        if let Command::Snap(snap) = &self.command {
            overrides.only = snap.only.clone();
            overrides.exclude = snap.exclude.clone();
            overrides.keep = snap.keep;
            overrides.delay = snap.delay;
            overrides.timeout = snap.timeout;
            overrides.clean = snap.clean;
            overrides.stop = snap.stop;
            overrides.stop_by_power = snap.stop_by_power;
            overrides.no_shutdown = snap.no_shutdown;
        }

        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_flags_become_overrides() {
        let args = Args::parse_from([
            "do_snapshot",
            "snap",
            "--only",
            "100823,200",
            "--keep",
            "3",
            "--clean",
            "--no-shutdown",
            "--digital-ocean-access-token",
            "token",
        ]);

        let overrides = args.overrides();

        assert_eq!(overrides.only, vec![100823, 200]);
        assert_eq!(overrides.keep, Some(3));
        assert!(overrides.clean);
        assert!(overrides.no_shutdown);
        assert_eq!(overrides.access_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_list_takes_only_global_flags() {
        let args = Args::parse_from(["do_snapshot", "list", "--trace"]);

        assert!(args.trace);
        assert_eq!(args.overrides(), Overrides::default());
    }

    #[test]
    fn test_trace_and_quiet_conflict() {
        assert!(Args::try_parse_from(["do_snapshot", "list", "--trace", "--quiet"]).is_err());
    }
}
