//! Generic "wait until done or timed out" primitive.

use std::sync::Arc;
use std::time::{Duration, Instant};

use snap_core::Clock;
use snap_logging::LogSink;

/// Answer of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Pending,
    Ready,
    TimedOut,
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    TimedOut,
}

/// Provider-agnostic state of an asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Running,
    Done,
    Failed(String),
}

/// Sleeps `delay` between checks and gives up after `timeout`.
///
/// The predicate owns timeout detection: it calls [`Poller::timed_out`]
/// before doing any remote work and answers [`Poll::TimedOut`] when it
/// fires. Each iteration blocks the calling thread for `delay`.
pub struct Poller {
    delay: Duration,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    log: Arc<dyn LogSink>,
}

impl Poller {
    pub fn new(
        delay: Duration,
        timeout: Duration,
        clock: Arc<dyn Clock>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            delay,
            timeout,
            clock,
            log,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn log(&self) -> &dyn LogSink {
        self.log.as_ref()
    }

    /// Whether the wait started at `started` has used up its budget.
    ///
    /// Reaching the timeout exactly counts as timed out. When it fires,
    /// `describe` receives the elapsed whole seconds and its text is logged
    /// at debug level.
    pub fn timed_out(&self, started: Instant, describe: impl FnOnce(u64) -> String) -> bool {
        let elapsed = self.clock.elapsed_since(started);
        if elapsed < self.timeout {
            return false;
        }
        self.log.debug(&describe(elapsed.as_secs()));
        true
    }

    /// Evaluate `check` every `delay` until it answers ready or timed out.
    ///
    /// `check` receives `id` and the instant the wait started. Errors from
    /// `check` end the wait immediately.
    pub fn wait_for<Id, E, F>(&self, id: Id, message: &str, mut check: F) -> Result<WaitOutcome, E>
    where
        Id: Copy,
        F: FnMut(Id, Instant) -> Result<Poll, E>,
    {
        let started = self.clock.now();
        self.log.debug(message);

        loop {
            self.clock.sleep(self.delay);
            match check(id, started)? {
                Poll::Pending => continue,
                Poll::Ready => return Ok(WaitOutcome::Completed),
                Poll::TimedOut => return Ok(WaitOutcome::TimedOut),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snap_core::ManualClock;
    use snap_logging::MemorySink;

    fn poller(clock: &Arc<ManualClock>, log: &Arc<MemorySink>) -> Poller {
        Poller::new(
            Duration::from_secs(5),
            Duration::from_secs(20),
            clock.clone(),
            log.clone(),
        )
    }

    #[test]
    fn test_wait_for_sleeps_before_each_check() {
        let clock = Arc::new(ManualClock::new());
        let log = Arc::new(MemorySink::new());
        let poller = poller(&clock, &log);

        let mut checks = 0;
        let outcome = poller
            .wait_for(7u64, "Event Id: 7", |_, _| -> Result<Poll, ()> {
                checks += 1;
                Ok(if checks == 3 { Poll::Ready } else { Poll::Pending })
            })
            .unwrap();

        assert_eq!(outcome, WaitOutcome::Completed);
        assert_eq!(checks, 3);
        assert_eq!(clock.sleep_count(), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(15));
        assert!(log.contains("Event Id: 7"));
    }

    #[test]
    fn test_wait_for_stops_on_timed_out_answer() {
        let clock = Arc::new(ManualClock::new());
        let log = Arc::new(MemorySink::new());
        let poller = poller(&clock, &log);

        let outcome = poller
            .wait_for(1u64, "waiting", |id, started| -> Result<Poll, ()> {
                if poller.timed_out(started, |secs| format!("{id} gave up after {secs}s")) {
                    return Ok(Poll::TimedOut);
                }
                Ok(Poll::Pending)
            })
            .unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert_eq!(clock.elapsed(), Duration::from_secs(20));
        assert!(log.contains("1 gave up after 20s"));
    }

    #[test]
    fn test_wait_for_propagates_check_error() {
        let clock = Arc::new(ManualClock::new());
        let log = Arc::new(MemorySink::new());
        let poller = poller(&clock, &log);

        let result = poller.wait_for(1u64, "waiting", |_, _| Err::<Poll, _>("boom"));

        assert_eq!(result, Err("boom"));
        assert_eq!(clock.sleep_count(), 1);
    }

    #[test]
    fn test_timed_out_is_silent_before_deadline() {
        let clock = Arc::new(ManualClock::new());
        let log = Arc::new(MemorySink::new());
        let poller = poller(&clock, &log);

        let started = clock.now();
        clock.advance(Duration::from_secs(19));
        assert!(!poller.timed_out(started, |_| "timeout".to_string()));
        assert!(log.buffer().is_empty());

        clock.advance(Duration::from_secs(1));
        assert!(poller.timed_out(started, |_| "timeout".to_string()));
        assert!(log.contains("timeout"));
    }
}
