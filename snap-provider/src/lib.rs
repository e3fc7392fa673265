//! Droplet snapshot adapter library.
//!
//! Two layers: a provider-agnostic polling engine ([`wait`] plus the
//! [`Adapter`] trait, which turns it into "wait for event" and "wait for
//! shutdown"), and the DigitalOcean workflow built on top of it.

// Internal imports
use snap_logging::LogSink;

// Re-export common types for convenience
pub use digitalocean::{
    Action, ActionStatus, ApiFailure, ApiResult, CleanupReport, DigitalOcean, Droplet,
    DropletApi, DropletStatus, HttpClient, Snapshot, StopMethod,
};
pub use error::{ProviderError, Result};
pub use options::AdapterOptions;
pub use wait::{JobState, Poll, Poller, WaitOutcome};

pub mod digitalocean;
pub mod error;
pub mod options;
pub mod wait;

// When the `test-helpers` feature is enabled, include the mock transport.
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

/// Behaviour every provider adapter shares: the two blocking waits.
///
/// Implementors only answer "what state is this job in" and "is this
/// droplet powered off"; the provided methods drive the [`Poller`].
pub trait Adapter {
    fn poller(&self) -> &Poller;

    /// Query the provider once for the state of an asynchronous job.
    fn job_state(&self, job_id: u64) -> Result<JobState>;

    /// Whether the droplet is currently powered off.
    fn inactive(&self, droplet_id: u64) -> Result<bool>;

    fn log(&self) -> &dyn LogSink {
        self.poller().log()
    }

    /// Block until the job completes.
    ///
    /// A job that errors fails with [`ProviderError::Event`]; one that is
    /// still running when the timeout elapses fails with
    /// [`ProviderError::EventTimeout`].
    fn wait_event(&self, event_id: u64) -> Result<()> {
        let poller = self.poller();
        let outcome = poller.wait_for(event_id, &format!("Event Id: {event_id}"), |id, started| {
            if poller.timed_out(started, |secs| {
                format!("Event {id} finished by timeout after {secs}s")
            }) {
                return Ok(Poll::TimedOut);
            }

            match self.job_state(id)? {
                JobState::Running => Ok(Poll::Pending),
                JobState::Done => Ok(Poll::Ready),
                JobState::Failed(message) => {
                    self.log().error(&message);
                    Err(ProviderError::Event {
                        action_id: id,
                        message,
                    })
                }
            }
        })?;

        match outcome {
            WaitOutcome::Completed => Ok(()),
            WaitOutcome::TimedOut => Err(ProviderError::EventTimeout {
                action_id: event_id,
                waited_secs: poller.timeout().as_secs(),
            }),
        }
    }

    /// Block until the droplet is observed powered off.
    ///
    /// Timing out is a hard failure: a snapshot must never be taken of a
    /// droplet whose shutdown could not be confirmed.
    fn wait_shutdown(&self, droplet_id: u64) -> Result<()> {
        let poller = self.poller();
        let message = format!("Droplet Id: {droplet_id} shutting down");
        let outcome = poller.wait_for(droplet_id, &message, |id, started| {
            if poller.timed_out(started, |secs| {
                format!("Droplet id: {id} shutdown event closed by timeout after {secs}s")
            }) {
                return Ok(Poll::TimedOut);
            }

            Ok(if self.inactive(id)? {
                Poll::Ready
            } else {
                Poll::Pending
            })
        })?;

        match outcome {
            WaitOutcome::Completed => Ok(()),
            WaitOutcome::TimedOut => Err(ProviderError::ShutdownTimeout {
                droplet_id,
                waited_secs: poller.timeout().as_secs(),
            }),
        }
    }
}
