//! Daily active window
//!
//! Polling only happens between a configured start and end time of day. The
//! window is re-derived from the wall clock every time the scheduler wakes up,
//! so nothing here tracks day boundaries.

use crate::error::{Result, ScraperError};
use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use std::fmt;
use std::str::FromStr;

/// Wall clock time of day, second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
    second: u32,
}

impl TimeOfDay {
    /// Build from components, rejecting out of range values
    pub fn new(hour: u32, minute: u32, second: u32) -> Option<Self> {
        (hour < 24 && minute < 60 && second < 60).then_some(Self {
            hour,
            minute,
            second,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    /// Seconds elapsed since midnight
    pub fn seconds_of_day(&self) -> u32 {
        self.hour * 3600 + self.minute * 60 + self.second
    }

    fn naive(&self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(self.seconds_of_day(), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScraperError;

    /// Parse `HH`, `HH:MM` or `HH:MM:SS`; missing components are zero.
    fn from_str(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() > 3 {
            return Err(ScraperError::TimeFormat {
                input: raw.to_string(),
            });
        }

        let mut values = [0u32; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ScraperError::TimeFormat {
                    input: raw.to_string(),
                });
            }
            *slot = part.parse().map_err(|_| ScraperError::TimeFormat {
                input: raw.to_string(),
            })?;
        }

        let [hour, minute, second] = values;
        let out_of_range = |component| ScraperError::TimeRange {
            input: raw.to_string(),
            component,
        };
        if hour > 23 {
            return Err(out_of_range("hour"));
        }
        if minute > 59 {
            return Err(out_of_range("minute"));
        }
        if second > 59 {
            return Err(out_of_range("second"));
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Where `now` sits relative to today's window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowPosition<Tz: TimeZone> {
    /// Today's window has not begun; wait for `start`, then poll until `end`
    BeforeStart { start: DateTime<Tz>, end: DateTime<Tz> },
    /// Inside today's window; poll until `end`
    Inside { end: DateTime<Tz> },
    /// Today's window is over; wait for tomorrow's start
    AfterEnd { next_start: DateTime<Tz> },
}

/// Configured daily polling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl ActiveWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    /// Length of the window in seconds, negative when end precedes start
    pub fn span_seconds(&self) -> i64 {
        i64::from(self.end.seconds_of_day()) - i64::from(self.start.seconds_of_day())
    }

    /// Locate `now` against the window built from `now`'s calendar date
    pub fn locate<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> WindowPosition<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);

        let start_today = at(&tz, today, self.start);
        let end_today = at(&tz, today, self.end);

        if *now < start_today {
            WindowPosition::BeforeStart {
                start: start_today,
                end: end_today,
            }
        } else if *now > end_today {
            WindowPosition::AfterEnd {
                next_start: at(&tz, tomorrow, self.start),
            }
        } else {
            WindowPosition::Inside { end: end_today }
        }
    }
}

/// Combine a date and a time of day in `tz`.
///
/// Ambiguous local times (clocks going back) resolve to the earlier instant;
/// times skipped by a forward jump resolve to the same wall time an hour later.
fn at<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: TimeOfDay) -> DateTime<Tz> {
    let naive = date.and_time(time.naive());
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}
