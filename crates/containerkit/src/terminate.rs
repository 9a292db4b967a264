//! Restart containers through forced machine termination.
//!
//! Stopping a container unit does not reliably take its machine down, so a
//! restart stops the units, terminates the machines until the supervisor no
//! longer knows them, and starts the units again.

use crate::backend::{MachineSupervisor, ServiceManager, TerminateOutcome};
use crate::error::{Error, Result};
use crate::types::{ContainerName, RetryConfig, join_names};
use std::thread;
use std::time::Duration;

/// Something that can wait between termination attempts.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by [`std::thread::sleep`].
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Restarts groups of containers.
pub struct Terminator<'a> {
    services: &'a dyn ServiceManager,
    machines: &'a dyn MachineSupervisor,
    retry: RetryConfig,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Terminator<'a> {
    pub fn new(
        services: &'a dyn ServiceManager,
        machines: &'a dyn MachineSupervisor,
        retry: RetryConfig,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            services,
            machines,
            retry,
            sleeper,
        }
    }

    /// Stop, terminate and start `names` as one group.
    ///
    /// Fails with [`Error::TerminationTimeout`] when the machines are still
    /// known after the last attempt; the units are not started again in that
    /// case.
    pub fn restart(&self, names: &[ContainerName]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.services.stop(names) {
            log::warn!("Stopping {} failed: {e}", join_names(names));
        }

        self.terminate(names)?;
        self.services.start(names)
    }

    /// Terminate the machines of `names`, retrying within the configured bound.
    pub fn terminate(&self, names: &[ContainerName]) -> Result<()> {
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            match self.machines.terminate(names) {
                TerminateOutcome::Terminated => {
                    log::debug!("Terminated {} on attempt {attempt}", join_names(names));
                    return Ok(());
                }
                TerminateOutcome::AlreadyGone(gone) => {
                    log::debug!("Machines already gone: {}", gone.join(" "));
                    return Ok(());
                }
                TerminateOutcome::Failed(message) => {
                    log::warn!(
                        "Terminating {} failed (attempt {attempt}/{}): {message}",
                        join_names(names),
                        self.retry.max_attempts
                    );
                    last_error = message;
                }
            }

            if attempt < self.retry.max_attempts {
                self.sleeper.sleep(self.retry.delay);
            }
        }

        Err(Error::TerminationTimeout {
            names: join_names(names),
            attempts: self.retry.max_attempts,
            last_error,
        })
    }
}
