//! Telemetry captured from the inverter

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Cumulative yield counters in kWh
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    /// Energy produced since midnight
    pub yield_today: f64,
    /// Energy produced over the inverter's lifetime
    pub yield_total: f64,
}

/// One record destined for the metrics sink.
///
/// `power` is `None` for substituted readings. An absent value means "not
/// measured", never "producing 0 W".
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Instantaneous output in W
    pub power: Option<u64>,
    pub totals: Totals,
    pub captured_at: DateTime<Utc>,
}

impl Reading {
    /// Freshly measured reading
    pub fn measured(power: u64, totals: Totals, captured_at: DateTime<Utc>) -> Self {
        Self {
            power: Some(power),
            totals,
            captured_at,
        }
    }

    /// Reading that carries forward cumulative counters without a power value
    pub fn substituted(totals: Totals, captured_at: DateTime<Utc>) -> Self {
        Self {
            power: None,
            totals,
            captured_at,
        }
    }

    pub fn is_substituted(&self) -> bool {
        self.power.is_none()
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self {
            power: None,
            totals: Totals::default(),
            captured_at: DateTime::<Utc>::default(),
        }
    }
}

impl Reading {
    /// Per-record debug line with the capture time rendered in `tz`
    pub fn describe<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let power = match self.power {
            Some(power) => power.to_string(),
            None => "absent".to_string(),
        };
        format!(
            "Time: {}, CurrentPower: {}, YieldToday: {:.6}, TotalYield: {:.6}",
            self.captured_at.with_timezone(tz).format("%Y%m%d%H%M%S"),
            power,
            self.totals.yield_today,
            self.totals.yield_total
        )
    }
}

/// Same line as [`Reading::describe`] in UTC
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_measured() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 5).unwrap();
        let r = Reading::measured(
            150,
            Totals {
                yield_today: 3.1,
                yield_total: 4756.2,
            },
            at,
        );
        assert_eq!(
            r.to_string(),
            "Time: 20240601123005, CurrentPower: 150, YieldToday: 3.100000, TotalYield: 4756.200000"
        );
    }

    #[test]
    fn display_substituted() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 5).unwrap();
        let r = Reading::substituted(
            Totals {
                yield_today: 20.0,
                yield_total: 200.0,
            },
            at,
        );
        assert!(r.is_substituted());
        assert!(r.to_string().contains("CurrentPower: absent"));
    }

    #[test]
    fn describe_uses_window_timezone() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 5).unwrap();
        let r = Reading::measured(
            150,
            Totals {
                yield_today: 3.1,
                yield_total: 4756.2,
            },
            at,
        );
        // CEST is UTC+2
        assert_eq!(
            r.describe(&chrono_tz::Europe::Amsterdam),
            "Time: 20240601143005, CurrentPower: 150, YieldToday: 3.100000, TotalYield: 4756.200000"
        );
        assert!(r.describe(&Utc).starts_with("Time: 20240601123005,"));
    }
}
