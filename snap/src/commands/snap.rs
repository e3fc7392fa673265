//! `do_snapshot snap`: power off, snapshot, power back on, prune.
//!
//! Droplets are handled one at a time. A failure is logged against its
//! droplet and the run moves on; only a failed listing aborts the run.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use snap_config::SnapshotConfig;
use snap_core::{snap_success, snap_warning};
use snap_provider::{Adapter, CleanupReport, DigitalOcean, Droplet, DropletApi, ProviderError};

/// Snapshot names are `{droplet name}_{YYYY_MM_DD}`.
pub fn snapshot_name(droplet_name: &str, date: NaiveDate) -> String {
    format!("{}_{}", droplet_name, date.format("%Y_%m_%d"))
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub snapshotted: Vec<u64>,
    pub skipped: Vec<u64>,
    pub failed: Vec<(u64, ProviderError)>,
    pub pruned: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.snapshotted.len() + self.skipped.len() + self.failed.len()
    }
}

enum Outcome {
    Snapshotted(Option<CleanupReport>),
    Skipped,
}

pub fn handle_snap<A: DropletApi>(
    adapter: &DigitalOcean<A>,
    config: &SnapshotConfig,
    today: NaiveDate,
) -> Result<()> {
    let summary = run(adapter, config, today)?;

    if summary.total() == 0 {
        snap_warning!("No droplets matched the selection");
        return Ok(());
    }
    if !summary.snapshotted.is_empty() {
        snap_success!(
            "{} droplet(s) snapshotted, {} old snapshot(s) deleted",
            summary.snapshotted.len(),
            summary.pruned
        );
    }
    if !summary.skipped.is_empty() {
        snap_warning!("{} droplet(s) skipped", summary.skipped.len());
    }
    if !summary.failed.is_empty() {
        for (droplet_id, e) in &summary.failed {
            snap_warning!("Droplet {}: {}", droplet_id, e.user_friendly());
        }
        bail!(
            "{} of {} droplet(s) failed",
            summary.failed.len(),
            summary.total()
        );
    }
    Ok(())
}

/// Snapshot every droplet the configuration selects.
pub fn run<A: DropletApi>(
    adapter: &DigitalOcean<A>,
    config: &SnapshotConfig,
    today: NaiveDate,
) -> snap_provider::Result<RunSummary> {
    let selected: Vec<u64> = adapter
        .list()?
        .iter()
        .map(|droplet| droplet.id)
        .filter(|id| config.selects(*id))
        .collect();
    info!("{} droplet(s) selected", selected.len());

    let mut summary = RunSummary::default();
    for droplet_id in selected {
        match snapshot_droplet(adapter, config, droplet_id, today) {
            Ok(Outcome::Snapshotted(cleanup)) => {
                summary.pruned += cleanup.map_or(0, |report| report.deleted.len());
                summary.snapshotted.push(droplet_id);
            }
            Ok(Outcome::Skipped) => summary.skipped.push(droplet_id),
            Err(e) => {
                error!("Droplet {} failed: {}", droplet_id, e);
                summary.failed.push((droplet_id, e));
            }
        }
    }
    Ok(summary)
}

fn snapshot_droplet<A: DropletApi>(
    adapter: &DigitalOcean<A>,
    config: &SnapshotConfig,
    droplet_id: u64,
    today: NaiveDate,
) -> snap_provider::Result<Outcome> {
    let droplet = adapter.fetch(droplet_id)?;

    if config.stop && droplet.snapshot_count() >= config.keep {
        warn!(
            "Droplet {} ({}) already has {} snapshot(s), skipping",
            droplet.id,
            droplet.name,
            droplet.snapshot_count()
        );
        return Ok(Outcome::Skipped);
    }

    let was_running = droplet.is_active();
    let taken = power_off_and_snapshot(adapter, config, &droplet, today);

    // Bring the droplet back even when shutdown or the snapshot failed.
    let restarted = if was_running {
        adapter.start(droplet_id)
    } else {
        Ok(())
    };
    taken?;
    restarted?;

    if !config.clean {
        return Ok(Outcome::Snapshotted(None));
    }
    let refreshed = adapter.fetch(droplet_id)?;
    let report = adapter.cleanup_snapshots(&refreshed, config.keep);
    if !report.is_clean() {
        warn!(
            "Droplet {}: {} of {} old snapshot(s) could not be deleted",
            droplet_id,
            report.failed.len(),
            report.attempted()
        );
    }
    Ok(Outcome::Snapshotted(Some(report)))
}

fn power_off_and_snapshot<A: DropletApi>(
    adapter: &DigitalOcean<A>,
    config: &SnapshotConfig,
    droplet: &Droplet,
    today: NaiveDate,
) -> snap_provider::Result<()> {
    if config.shutdown && !droplet.is_off() {
        info!("Shutting down droplet {} ({})", droplet.id, droplet.name);
        adapter.stop(droplet.id)?;
        adapter.wait_shutdown(droplet.id)?;
    }

    let name = snapshot_name(&droplet.name, today);
    info!("Creating snapshot {} of droplet {}", name, droplet.id);
    adapter.create_snapshot(droplet.id, &name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snap_core::ManualClock;
    use snap_logging::MemorySink;
    use snap_provider::mock::{sample_droplet, ApiCall, MockDropletApi};
    use snap_provider::{AdapterOptions, ApiFailure, DropletStatus, StopMethod};
    use std::sync::Arc;

    const DROPLET_ID: u64 = 100823;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 7, 22).unwrap()
    }

    fn config() -> SnapshotConfig {
        SnapshotConfig {
            access_token: Some("token".to_string()),
            ..SnapshotConfig::default()
        }
    }

    fn adapter(api: MockDropletApi) -> DigitalOcean<MockDropletApi> {
        DigitalOcean::new(
            api,
            AdapterOptions::new(5, 20),
            Arc::new(ManualClock::new()),
            Arc::new(MemorySink::new()),
        )
        .unwrap()
    }

    fn other_droplet(id: u64, name: &str) -> Droplet {
        Droplet {
            id,
            name: name.to_string(),
            status: DropletStatus::Off,
            snapshot_ids: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    #[test]
    fn test_snapshot_name() {
        assert_eq!(snapshot_name("mrcr.ru", today()), "mrcr.ru_2014_07_22");
    }

    #[test]
    fn test_running_droplet_is_stopped_snapshotted_and_restarted() {
        let adapter = adapter(MockDropletApi::new().with_droplet(sample_droplet(DropletStatus::Active)));

        let summary = run(&adapter, &config(), today()).unwrap();

        assert_eq!(summary.snapshotted, vec![DROPLET_ID]);
        let calls = adapter.api().calls();
        let position = |call: &ApiCall| calls.iter().position(|c| c == call).unwrap();
        let power_off = position(&ApiCall::PowerOff(DROPLET_ID, StopMethod::Shutdown));
        let snapshot = position(&ApiCall::Snapshot(
            DROPLET_ID,
            "mrcr.ru_2014_07_22".to_string(),
        ));
        let power_on = position(&ApiCall::PowerOn(DROPLET_ID));
        assert!(power_off < snapshot);
        assert!(snapshot < power_on);
    }

    #[test]
    fn test_off_droplet_is_left_off() {
        let adapter = adapter(MockDropletApi::new().with_droplet(sample_droplet(DropletStatus::Off)));

        run(&adapter, &config(), today()).unwrap();

        let api = adapter.api();
        assert_eq!(api.count(|c| matches!(c, ApiCall::PowerOff(..))), 0);
        assert_eq!(api.count(|c| matches!(c, ApiCall::PowerOn(_))), 0);
        assert_eq!(api.count(|c| matches!(c, ApiCall::Snapshot(..))), 1);
    }

    #[test]
    fn test_no_shutdown_snapshots_live() {
        let adapter = adapter(MockDropletApi::new().with_droplet(sample_droplet(DropletStatus::Active)));
        let config = SnapshotConfig {
            shutdown: false,
            ..config()
        };

        run(&adapter, &config, today()).unwrap();

        let api = adapter.api();
        assert_eq!(api.count(|c| matches!(c, ApiCall::PowerOff(..))), 0);
        assert_eq!(api.count(|c| matches!(c, ApiCall::PowerOn(_))), 0);
        assert_eq!(api.count(|c| matches!(c, ApiCall::Snapshot(..))), 1);
    }

    #[test]
    fn test_stop_skips_droplet_at_keep() {
        let adapter = adapter(MockDropletApi::new().with_droplet(sample_droplet(DropletStatus::Off)));
        let config = SnapshotConfig {
            stop: true,
            keep: 3,
            ..config()
        };

        let summary = run(&adapter, &config, today()).unwrap();

        assert_eq!(summary.skipped, vec![DROPLET_ID]);
        assert_eq!(adapter.api().count(|c| matches!(c, ApiCall::Snapshot(..))), 0);
    }

    #[test]
    fn test_clean_prunes_beyond_keep() {
        let adapter = adapter(MockDropletApi::new().with_droplet(sample_droplet(DropletStatus::Off)));
        let config = SnapshotConfig {
            clean: true,
            keep: 1,
            ..config()
        };

        let summary = run(&adapter, &config, today()).unwrap();

        assert_eq!(summary.pruned, 2);
        assert_eq!(adapter.api().deleted_images(), vec![5019770, 5019566]);
    }

    #[test]
    fn test_cleanup_failure_does_not_fail_droplet() {
        let api = MockDropletApi::new()
            .with_droplet(sample_droplet(DropletStatus::Off))
            .delete_result(5019770, Err(ApiFailure::with_status(404, "Some Message")));
        let adapter = adapter(api);
        let config = SnapshotConfig {
            clean: true,
            keep: 1,
            ..config()
        };

        let summary = run(&adapter, &config, today()).unwrap();

        assert_eq!(summary.snapshotted, vec![DROPLET_ID]);
        assert_eq!(summary.pruned, 1);
        assert!(summary.failed.is_empty());
    }

    #[test]
    fn test_only_and_exclude_filter_droplets() {
        let api = MockDropletApi::new()
            .with_droplet(sample_droplet(DropletStatus::Off))
            .with_droplet(other_droplet(2, "two"))
            .with_droplet(other_droplet(3, "three"));
        let adapter = adapter(api);
        let config = SnapshotConfig {
            only: vec![DROPLET_ID, 2],
            exclude: vec![2],
            ..config()
        };

        let summary = run(&adapter, &config, today()).unwrap();

        assert_eq!(summary.snapshotted, vec![DROPLET_ID]);
        assert_eq!(adapter.api().count(|c| matches!(c, ApiCall::Snapshot(..))), 1);
    }

    #[test]
    fn test_failed_droplet_does_not_stop_the_run() {
        let api = MockDropletApi::new()
            .with_droplet(sample_droplet(DropletStatus::Active))
            .with_droplet(other_droplet(2, "two"))
            .fail_snapshot(DROPLET_ID, "Some Message");
        let adapter = adapter(api);

        let summary = run(&adapter, &config(), today()).unwrap();

        assert_eq!(summary.snapshotted, vec![2]);
        assert_eq!(summary.failed.len(), 1);
        let (failed_id, e) = &summary.failed[0];
        assert_eq!(*failed_id, DROPLET_ID);
        assert_eq!(e.to_string(), "Some Message");
        // Restarted although its snapshot failed.
        assert_eq!(
            adapter.api().count(|c| *c == ApiCall::PowerOn(DROPLET_ID)),
            1
        );
    }

    #[test]
    fn test_shutdown_timeout_fails_droplet() {
        let api = MockDropletApi::new()
            .with_droplet(sample_droplet(DropletStatus::Active))
            .power_states(DROPLET_ID, &[DropletStatus::Active]);
        let adapter = adapter(api);

        let summary = run(&adapter, &config(), today()).unwrap();

        assert!(summary.failed[0].1.is_timeout());
        assert_eq!(adapter.api().count(|c| matches!(c, ApiCall::Snapshot(..))), 0);
    }

    #[test]
    fn test_running_droplet_restarted_after_shutdown_timeout() {
        let api = MockDropletApi::new()
            .with_droplet(sample_droplet(DropletStatus::Active))
            .power_states(DROPLET_ID, &[DropletStatus::Active]);
        let adapter = adapter(api);

        let summary = run(&adapter, &config(), today()).unwrap();

        assert!(matches!(
            summary.failed[0].1,
            ProviderError::ShutdownTimeout { .. }
        ));
        assert_eq!(
            adapter.api().count(|c| *c == ApiCall::PowerOn(DROPLET_ID)),
            1
        );
    }

    #[test]
    fn test_running_droplet_restarted_after_rejected_stop() {
        let api = MockDropletApi::new()
            .with_droplet(sample_droplet(DropletStatus::Active))
            .fail_power_off(DROPLET_ID, "Some Message");
        let adapter = adapter(api);

        let summary = run(&adapter, &config(), today()).unwrap();

        assert!(matches!(
            summary.failed[0].1,
            ProviderError::DropletShutdown { .. }
        ));
        let api = adapter.api();
        assert_eq!(api.count(|c| matches!(c, ApiCall::Snapshot(..))), 0);
        // Restart looked the droplet up again and found it still running.
        assert_eq!(api.count(|c| *c == ApiCall::Droplet(DROPLET_ID)), 2);
        assert_eq!(api.count(|c| matches!(c, ApiCall::PowerOn(_))), 0);
    }

    #[test]
    fn test_list_failure_aborts() {
        let adapter = adapter(MockDropletApi::new().fail_list("Droplet Listing is failed to retrieve"));

        let err = run(&adapter, &config(), today()).unwrap_err();

        assert!(matches!(err, ProviderError::DropletList { .. }));
    }

    #[test]
    fn test_handle_snap_reports_failures() {
        let api = MockDropletApi::new()
            .with_droplet(sample_droplet(DropletStatus::Off))
            .fail_snapshot(DROPLET_ID, "Some Message");
        let adapter = adapter(api);

        let err = handle_snap(&adapter, &config(), today()).unwrap_err();

        assert_eq!(err.to_string(), "1 of 1 droplet(s) failed");
    }
}
