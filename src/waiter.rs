//! Poll-until-target-state primitive.
//!
//! A [`StateChangeConf`] repeatedly calls a refresh function on a fixed
//! cadence until the observed state is one of the target states, an
//! unexpected state shows up, the refresh fails, or the deadline passes.
//!
//! ```ignore
//! let cluster = StateChangeConf::new(
//!     vec![],
//!     vec!["RUNNING".to_string()],
//!     Duration::from_secs(90 * 60),
//!     Duration::from_secs(60),
//!     || async { probe().await },
//! )
//! .wait_for_state()
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Consecutive "object absent" probes tolerated before giving up.
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// Result of a single successful probe.
#[derive(Debug, Clone, PartialEq)]
pub struct Refreshed<T> {
    pub object: Option<T>,
    pub state: String,
}

impl<T> Refreshed<T> {
    pub fn found(object: T, state: impl Into<String>) -> Self {
        Self {
            object: Some(object),
            state: state.into(),
        }
    }

    pub fn absent(state: impl Into<String>) -> Self {
        Self {
            object: None,
            state: state.into(),
        }
    }
}

/// A failed probe, labelled with the status it reports.
#[derive(Debug)]
pub struct RefreshError<E> {
    pub state: String,
    pub source: E,
}

impl<E> RefreshError<E> {
    pub fn new(state: impl Into<String>, source: E) -> Self {
        Self {
            state: state.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError<E>
where
    E: std::error::Error + 'static,
{
    #[error("unexpected state '{state}', wanted target '{}'", .expected.join(", "))]
    UnexpectedState { state: String, expected: Vec<String> },
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{last_state}', timeout: {timeout:?})",
        .expected.join(", ")
    )]
    Timeout {
        last_state: String,
        expected: Vec<String>,
        timeout: Duration,
    },
    #[error("couldn't find resource ({retries} retries)")]
    NotFound { retries: u32 },
    #[error("refreshing state (last state: '{state}'): {source}")]
    Refresh {
        state: String,
        #[source]
        source: E,
    },
}

/// Configuration of one wait.
pub struct StateChangeConf<F> {
    /// States that mean "keep waiting". When empty, any non-target state is tolerated.
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Fixed delay between two probes. The first probe is issued immediately.
    pub delay: Duration,
    pub not_found_checks: u32,
    /// Number of consecutive target observations required before succeeding.
    pub continuous_target_occurrence: u32,
    pub refresh: F,
}

impl<F, Fut, T, E> StateChangeConf<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Refreshed<T>, RefreshError<E>>>,
    E: std::error::Error + 'static,
{
    pub fn new(
        pending: Vec<String>,
        target: Vec<String>,
        timeout: Duration,
        delay: Duration,
        refresh: F,
    ) -> Self {
        Self {
            pending,
            target,
            timeout,
            delay,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurrence: 1,
            refresh,
        }
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn with_continuous_target_occurrence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrence = occurrences.max(1);
        self
    }

    /// Poll until a target state is reached.
    ///
    /// Returns the object observed in the target state, or `None` when the
    /// target set is empty and the object disappeared.
    pub async fn wait_for_state(mut self) -> Result<Option<T>, WaitError<E>> {
        let timeout = self.timeout;
        let mut last_state = String::new();

        let outcome = tokio::time::timeout(timeout, self.poll(&mut last_state)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    last_state = %last_state,
                    timeout_secs = timeout.as_secs(),
                    "Timed out waiting for target state"
                );
                Err(WaitError::Timeout {
                    last_state,
                    expected: self.target,
                    timeout,
                })
            }
        }
    }

    async fn poll(&mut self, last_state: &mut String) -> Result<Option<T>, WaitError<E>> {
        let mut probes = 0u32;
        let mut not_found_ticks = 0u32;
        let mut target_occurrence = 0u32;

        loop {
            probes += 1;
            let Refreshed { object, state } = (self.refresh)().await.map_err(|e| {
                WaitError::Refresh {
                    state: e.state,
                    source: e.source,
                }
            })?;

            debug!(probe = probes, state = %state, "Refreshed state");
            *last_state = state.clone();

            match object {
                None if self.target.is_empty() => return Ok(None),
                None => {
                    not_found_ticks += 1;
                    if not_found_ticks > self.not_found_checks {
                        return Err(WaitError::NotFound {
                            retries: not_found_ticks,
                        });
                    }
                }
                Some(object) => {
                    not_found_ticks = 0;

                    if self.target.contains(&state) {
                        target_occurrence += 1;
                        if target_occurrence >= self.continuous_target_occurrence {
                            return Ok(Some(object));
                        }
                    } else {
                        target_occurrence = 0;
                        let pending = self.pending.contains(&state)
                            || (state.is_empty() && !self.pending.is_empty());

                        if !pending && !self.pending.is_empty() {
                            return Err(WaitError::UnexpectedState {
                                state,
                                expected: self.target.clone(),
                            });
                        }
                    }
                }
            }

            tokio::time::sleep(self.delay).await;
        }
    }
}
