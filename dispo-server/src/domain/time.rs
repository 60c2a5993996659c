//! Simulation clock handling.
//!
//! The simulator reports times of day as "HH:MM" or "HH:MM:SS" strings with
//! no date attached. Delay arithmetic happens in whole minutes, so this
//! module provides a time-of-day type with minute arithmetic that wraps at
//! midnight, plus a helper for comparing times across midnight.

use chrono::{Duration, NaiveTime, Timelike};
use std::fmt;

/// Minutes in a day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day on the simulation clock.
///
/// # Examples
///
/// ```
/// use dispo_server::domain::SimTime;
///
/// let t = SimTime::parse("14:30").unwrap();
/// assert_eq!(t.to_string(), "14:30");
/// assert_eq!(t.minutes(), 14 * 60 + 30);
///
/// // Seconds are accepted and kept
/// let t = SimTime::parse("14:30:45").unwrap();
/// assert_eq!(t.to_string(), "14:30");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimTime(NaiveTime);

impl SimTime {
    /// Create a time from minutes since midnight, wrapping into one day.
    ///
    /// ```
    /// use dispo_server::domain::SimTime;
    ///
    /// assert_eq!(SimTime::from_minutes(61).to_string(), "01:01");
    /// assert_eq!(SimTime::from_minutes(-1).to_string(), "23:59");
    /// assert_eq!(SimTime::from_minutes(1440 + 5).to_string(), "00:05");
    /// ```
    pub fn from_minutes(minutes: i64) -> Self {
        let m = minutes.rem_euclid(MINUTES_PER_DAY) as u32;
        // rem_euclid keeps us inside 0..1440, so this cannot fail
        Self(NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap_or(NaiveTime::MIN))
    }

    /// Parse "HH:MM" or "HH:MM:SS".
    ///
    /// ```
    /// use dispo_server::domain::SimTime;
    ///
    /// assert!(SimTime::parse("00:00").is_ok());
    /// assert!(SimTime::parse("23:59:59").is_ok());
    ///
    /// assert!(SimTime::parse("1430").is_err());
    /// assert!(SimTime::parse("14:3").is_err());
    /// assert!(SimTime::parse("25:00").is_err());
    /// assert!(SimTime::parse("12:00:60").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let s = s.trim();
        let bytes = s.as_bytes();

        if bytes.len() != 5 && bytes.len() != 8 {
            return Err(TimeError::new("expected HH:MM or HH:MM:SS format"));
        }
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let second = if bytes.len() == 8 {
            if bytes[5] != b':' {
                return Err(TimeError::new("expected colon at position 5"));
            }
            let second = parse_two_digits(&bytes[6..8])
                .ok_or_else(|| TimeError::new("invalid second digits"))?;
            if second > 59 {
                return Err(TimeError::new("second must be 0-59"));
            }
            second
        } else {
            0
        };

        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| TimeError::new("invalid time"))?;
        Ok(Self(time))
    }

    /// Returns the underlying chrono time.
    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Whole minutes since midnight (seconds are truncated).
    pub fn minutes(&self) -> i64 {
        i64::from(self.0.hour() * 60 + self.0.minute())
    }

    /// Seconds since midnight.
    pub fn seconds(&self) -> i64 {
        i64::from(self.0.num_seconds_from_midnight())
    }

    /// Minutes since midnight, shifted by whole days so that the result lies
    /// within twelve hours of `anchor`.
    ///
    /// Used to compare two times of day that may straddle midnight.
    ///
    /// ```
    /// use dispo_server::domain::SimTime;
    ///
    /// let late = SimTime::parse("23:50").unwrap();
    /// let early = SimTime::parse("00:10").unwrap();
    ///
    /// assert_eq!(early.minutes_relative_to(late.minutes()), 1440 + 10);
    /// assert_eq!(late.minutes_relative_to(early.minutes()), -10);
    /// ```
    pub fn minutes_relative_to(&self, anchor: i64) -> i64 {
        let half_day = MINUTES_PER_DAY / 2;
        let offset = (self.minutes() - anchor + half_day).rem_euclid(MINUTES_PER_DAY) - half_day;
        anchor + offset
    }

    /// Add a signed number of minutes, wrapping at midnight.
    pub fn add_minutes(&self, minutes: i64) -> Self {
        let (time, _) = self.0.overflowing_add_signed(Duration::minutes(minutes));
        Self(time)
    }

    /// Add a signed number of seconds, wrapping at midnight.
    pub fn add_seconds(&self, seconds: i64) -> Self {
        let (time, _) = self.0.overflowing_add_signed(Duration::seconds(seconds));
        Self(time)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimTime({:02}:{:02}:{:02})",
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// from_minutes and minutes agree inside one day
        #[test]
        fn minutes_roundtrip(m in 0i64..MINUTES_PER_DAY) {
            prop_assert_eq!(SimTime::from_minutes(m).minutes(), m);
        }

        /// relative representation stays within half a day of the anchor
        /// and is congruent to the plain minute value
        #[test]
        fn relative_minutes_bounded(m in 0i64..MINUTES_PER_DAY, anchor in -2000i64..4000) {
            let t = SimTime::from_minutes(m);
            let rel = t.minutes_relative_to(anchor);
            prop_assert!((rel - anchor).abs() <= MINUTES_PER_DAY / 2);
            prop_assert_eq!(rel.rem_euclid(MINUTES_PER_DAY), m);
        }

        /// adding then subtracting minutes is the identity
        #[test]
        fn add_minutes_inverse(m in 0i64..MINUTES_PER_DAY, delta in -3000i64..3000) {
            let t = SimTime::from_minutes(m);
            prop_assert_eq!(t.add_minutes(delta).add_minutes(-delta), t);
        }
    }
}
