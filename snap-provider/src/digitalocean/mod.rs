//! DigitalOcean droplet workflow.
//!
//! Sequences the remote calls for start, stop, snapshot and cleanup, and
//! turns every rejection into a logged, typed [`ProviderError`].

pub mod api;
pub mod client;
pub mod models;


use std::sync::Arc;

use snap_core::{Clock, SystemClock};
use snap_logging::{LogSink, TracingSink};

use crate::error::{ProviderError, Result};
use crate::options::AdapterOptions;
use crate::wait::{JobState, Poller};
use crate::Adapter;

pub use api::{ApiFailure, ApiResult, DropletApi, StopMethod};
pub use client::{HttpClient, DEFAULT_API_URL};
pub use models::{Action, ActionStatus, Droplet, DropletStatus, Snapshot};

/// What a cleanup pass did, by image id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<u64>,
    pub failed: Vec<u64>,
}

impl CleanupReport {
    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct DigitalOcean<A> {
    api: A,
    options: AdapterOptions,
    poller: Poller,
    log: Arc<dyn LogSink>,
}

impl<A: DropletApi> DigitalOcean<A> {
    /// Build an adapter; `options` are validated first.
    pub fn new(
        api: A,
        options: AdapterOptions,
        clock: Arc<dyn Clock>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self> {
        options.validate()?;
        let poller = Poller::new(
            options.poll_interval(),
            options.max_wait(),
            clock,
            log.clone(),
        );

        Ok(Self {
            api,
            options,
            poller,
            log,
        })
    }

    /// Real clock, notices go to `tracing`.
    pub fn with_defaults(api: A, options: AdapterOptions) -> Result<Self> {
        Self::new(api, options, Arc::new(SystemClock), Arc::new(TracingSink))
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Log the provider's message at error level and wrap it.
    fn reject(&self, failure: ApiFailure, wrap: impl FnOnce(String) -> ProviderError) -> ProviderError {
        self.log.error(&failure.message);
        wrap(failure.message)
    }

    pub fn fetch(&self, droplet_id: u64) -> Result<Droplet> {
        self.api.droplet(droplet_id).map_err(|failure| {
            self.reject(failure, |message| ProviderError::DropletFind {
                droplet_id,
                message,
            })
        })
    }

    pub fn list(&self) -> Result<Vec<Droplet>> {
        self.api
            .droplets()
            .map_err(|failure| self.reject(failure, |message| ProviderError::DropletList { message }))
    }

    /// Power the droplet on unless it is already running.
    pub fn start(&self, droplet_id: u64) -> Result<()> {
        let droplet = self.fetch(droplet_id)?;
        if droplet.is_active() {
            self.log
                .debug(&format!("Droplet {droplet_id} is still running. Skipping."));
            return Ok(());
        }

        self.api.power_on(droplet_id).map_err(|failure| {
            self.reject(failure, |message| ProviderError::DropletStart {
                droplet_id,
                message,
            })
        })?;
        self.log.info("Power On has been requested.");
        Ok(())
    }

    /// Power the droplet off and wait for the action to finish.
    pub fn stop(&self, droplet_id: u64) -> Result<()> {
        let action = self
            .api
            .power_off(droplet_id, self.options.stop_method())
            .map_err(|failure| {
                self.reject(failure, |message| ProviderError::DropletShutdown {
                    droplet_id,
                    message,
                })
            })?;

        self.wait_event(action.id)
    }

    /// Request a snapshot and wait for it to be taken.
    ///
    /// The droplet should already be off; see [`DigitalOcean::stop`] and
    /// [`Adapter::wait_shutdown`].
    pub fn create_snapshot(&self, droplet_id: u64, name: &str) -> Result<()> {
        let action = self.api.snapshot(droplet_id, name).map_err(|failure| {
            self.reject(failure, |message| ProviderError::SnapshotCreate {
                droplet_id,
                message,
            })
        })?;

        self.wait_event(action.id)
    }

    /// Delete every snapshot of `droplet` except the `keep` newest.
    ///
    /// Best effort: each outcome is logged and the pass always runs to the
    /// end.
    pub fn cleanup_snapshots(&self, droplet: &Droplet, keep: usize) -> CleanupReport {
        let mut report = CleanupReport::default();

        for snapshot in droplet.snapshots.iter().skip(keep) {
            match self.api.delete_image(snapshot.id) {
                Ok(true) => {
                    self.log
                        .debug(&format!("Snapshot name: {} delete requested.", snapshot.name));
                    report.deleted.push(snapshot.id);
                }
                Ok(false) => {
                    self.log.error(&format!(
                        "Destroy of snapshot {} for droplet id: {} name: {} is failed.",
                        snapshot.name, droplet.id, droplet.name
                    ));
                    report.failed.push(snapshot.id);
                }
                Err(failure) => {
                    self.log.error(&failure.message);
                    report.failed.push(snapshot.id);
                }
            }
        }

        report
    }
}

impl<A: DropletApi> Adapter for DigitalOcean<A> {
    fn poller(&self) -> &Poller {
        &self.poller
    }

    fn job_state(&self, job_id: u64) -> Result<JobState> {
        let action = self.api.action(job_id).map_err(|failure| {
            self.reject(failure, |message| ProviderError::EventLookup {
                action_id: job_id,
                message,
            })
        })?;

        Ok(match action.status {
            ActionStatus::Completed => JobState::Done,
            ActionStatus::Errored => JobState::Failed(action.message()),
            ActionStatus::InProgress | ActionStatus::Unknown => JobState::Running,
        })
    }

    fn inactive(&self, droplet_id: u64) -> Result<bool> {
        let status = self.api.power_state(droplet_id).map_err(|failure| {
            self.reject(failure, |message| ProviderError::DropletFind {
                droplet_id,
                message,
            })
        })?;
        Ok(status == DropletStatus::Off)
    }
}
