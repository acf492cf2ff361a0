//! Poll scheduler
//!
//! Drives the daily cycle:
//!
//! 1. locate the wall clock against the active window
//! 2. before the window: sleep until it opens, then poll
//! 3. inside the window: poll at a fixed rate until it closes
//! 4. after the window: sleep until tomorrow's start and start over
//!
//! While polling, the ticker and the window-end timer are raced in a biased
//! `select!`. A tick that is already running always finishes; once the end
//! timer has fired no further tick starts. A tick that overruns the interval
//! pushes the next one to the first slot still in the future, so fetches never
//! run back to back.

use crate::config::Config;
use crate::error::Result;
use crate::influx::MetricsSink;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::scraper::StatusSource;
use crate::status::{PollOutcome, PollStatus};
use crate::window::{ActiveWindow, WindowPosition};
use chrono::{DateTime, Local, TimeZone, Utc};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep, sleep_until};

/// Source of wall clock time
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed-rate poller bound to a daily active window
pub struct PollScheduler<S, M> {
    window: ActiveWindow,
    timezone: Option<chrono_tz::Tz>,
    polling_interval: Duration,
    max_sustained_errors: u32,
    source: S,
    sink: M,
    status: PollStatus,
    clock: Box<dyn WallClock>,
    logger: StructuredLogger,
}

impl<S: StatusSource, M: MetricsSink> PollScheduler<S, M> {
    /// Build from a validated configuration
    pub fn new(config: &Config, source: S, sink: M) -> Result<Self> {
        Ok(Self::with_settings(
            config.time.active_window()?,
            config.time.tz()?,
            config.time.polling_interval(),
            config.scraper.sustained_errors,
            source,
            sink,
        ))
    }

    pub fn with_settings(
        window: ActiveWindow,
        timezone: Option<chrono_tz::Tz>,
        polling_interval: Duration,
        max_sustained_errors: u32,
        source: S,
        sink: M,
    ) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("scheduler")
                .with_field("start", window.start())
                .with_field("end", window.end()),
        );
        Self {
            window,
            timezone,
            polling_interval,
            max_sustained_errors,
            source,
            sink,
            status: PollStatus::new(),
            clock: Box::new(SystemClock),
            logger,
        }
    }

    /// Replace the wall clock the window is evaluated against
    pub fn with_clock<C: WallClock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn status(&self) -> &PollStatus {
        &self.status
    }

    /// Run forever. Nothing inside the loop is fatal.
    pub async fn run(&mut self) {
        match self.timezone {
            Some(tz) => self.run_in(tz).await,
            None => self.run_in(Local).await,
        }
    }

    async fn run_in<Tz: TimeZone>(&mut self, tz: Tz) {
        self.logger.info(&format!(
            "Polling every {}s between {} and {}",
            self.polling_interval.as_secs(),
            self.window.start(),
            self.window.end()
        ));

        loop {
            let now = self.clock.now().with_timezone(&tz);
            let end = match self.window.locate(&now) {
                WindowPosition::AfterEnd { next_start } => {
                    self.logger.info(&format!(
                        "Window closed for today, sleeping until {}",
                        next_start.naive_local()
                    ));
                    sleep(self.until(&next_start)).await;
                    continue;
                }
                WindowPosition::BeforeStart { start, end } => {
                    self.logger
                        .info(&format!("Window opens at {}, sleeping", start.naive_local()));
                    sleep(self.until(&start)).await;
                    end
                }
                WindowPosition::Inside { end } => end,
            };

            self.poll_window(&end).await;
            // The monotonic deadline may beat the wall clock; make sure the
            // next locate sees the window as closed
            sleep(self.until(&end) + Duration::from_secs(1)).await;
        }
    }

    async fn poll_window<Tz: TimeZone>(&mut self, end: &DateTime<Tz>) {
        let remaining = self.until(end);
        if remaining.is_zero() {
            return;
        }
        self.logger.info(&format!("Polling until {}", end.naive_local()));
        let deadline = Instant::now() + remaining;
        let ticks = self.poll_until(deadline).await;
        self.logger.info(&format!("Window closed after {} polls", ticks));
    }

    /// Monotonic duration until a wall clock instant
    fn until<Tz: TimeZone>(&self, target: &DateTime<Tz>) -> Duration {
        wall_clock_until(self.clock.now(), target)
    }

    /// Tick at the polling interval until `deadline`; returns the number of
    /// completed ticks. The first tick fires immediately.
    pub async fn poll_until(&mut self, deadline: Instant) -> u64 {
        let mut ticker = interval(self.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let window_end = sleep_until(deadline);
        tokio::pin!(window_end);

        let mut ticks = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut window_end => break,
                scheduled = ticker.tick() => {
                    self.tick().await;
                    ticks += 1;
                    let overrun = next_slot(scheduled, self.polling_interval, Instant::now());
                    if let Some(next) = overrun {
                        ticker.reset_at(next);
                    }
                }
            }
        }
        ticks
    }

    /// One poll: fetch, track, and write when the tracker says so.
    /// Returns whether a record was handed to the sink.
    pub async fn tick(&mut self) -> bool {
        let outcome = match self.source.fetch().await {
            Ok(reading) => PollOutcome::Measured(reading),
            Err(e) => {
                self.logger.error(&format!("Failed to read inverter status: {}", e));
                PollOutcome::Failed {
                    at: self.clock.now(),
                }
            }
        };

        if !self.status.decide(outcome, self.max_sustained_errors) {
            if self.status.is_populated()
                && self.status.consecutive_errors() == self.max_sustained_errors.saturating_add(2)
            {
                self.logger.warn(&format!(
                    "{} consecutive failures, no longer substituting readings",
                    self.status.consecutive_errors()
                ));
            }
            return false;
        }

        let record = self.status.current();
        let line = match self.timezone {
            Some(tz) => record.describe(&tz),
            None => record.describe(&Local),
        };
        self.logger.debug(&line);
        if let Err(e) = self.sink.write(record).await {
            self.logger.error(&format!("Failed to write to InfluxDB: {}", e));
        }
        true
    }
}

/// Distance from `now` to `target`, zero if already past
fn wall_clock_until<Tz: TimeZone>(now: DateTime<Utc>, target: &DateTime<Tz>) -> Duration {
    (target.with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Slot the ticker must move to after a tick scheduled at `scheduled` ran
/// until `now`. `None` while the regular next slot is still ahead; otherwise
/// the first slot on the original grid that lies strictly in the future.
fn next_slot(scheduled: Instant, period: Duration, now: Instant) -> Option<Instant> {
    let mut next = scheduled + period;
    if now <= next || period.is_zero() {
        return None;
    }
    while next <= now {
        next += period;
    }
    Some(next)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
