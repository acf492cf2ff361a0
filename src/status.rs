//! Poll status tracking and error substitution
//!
//! A short outage must not leave a hole in the cumulative yield series (a hole
//! reads as zero production), but stretching a stale value forever would
//! invent a trend. [`PollStatus::decide`] bridges up to
//! `max_sustained_errors + 1` consecutive failures with substituted readings
//! and then goes quiet until the inverter answers again.

use crate::reading::{Reading, Totals};
use chrono::{DateTime, Utc};

/// Result of a single poll as seen by the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The page was fetched and all three values extracted
    Measured(Reading),
    /// Fetch or extraction failed at the given instant
    Failed { at: DateTime<Utc> },
}

/// State carried across polls for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollStatus {
    current: Reading,
    last: Totals,
    populated: bool,
    consecutive_errors: u32,
}

impl PollStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record to forward when the last [`decide`](Self::decide) returned `true`
    pub fn current(&self) -> &Reading {
        &self.current
    }

    /// Last successfully measured cumulative counters
    pub fn last(&self) -> Totals {
        self.last
    }

    /// Whether at least one poll has ever succeeded
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Fold one poll outcome into the state; returns whether `current` should
    /// be written.
    ///
    /// The threshold is compared before the error counter is incremented.
    pub fn decide(&mut self, outcome: PollOutcome, max_sustained_errors: u32) -> bool {
        match outcome {
            PollOutcome::Measured(reading) => {
                self.current = reading;
                self.last = self.current.totals;
                self.populated = true;
                self.consecutive_errors = 0;
                true
            }
            PollOutcome::Failed { at } => {
                let substitute = self.populated && self.consecutive_errors <= max_sustained_errors;
                if substitute {
                    self.current = Reading::substituted(self.last, at);
                }
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                substitute
            }
        }
    }
}
