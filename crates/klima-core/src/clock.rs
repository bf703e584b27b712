//! Wall-clock time for timestamping log rows.
//!
//! The device has no battery-backed RTC; [`WallClock`] anchors a unix time
//! obtained from a one-shot network sync to the monotonic `embassy-time`
//! instant at which it arrived. Calendar conversion uses Howard Hinnant's
//! O(1) `civil_from_days` algorithm (the same one `<chrono>` uses), so there
//! is no year iteration and leap years are handled exactly.
//!
//! Reference: <http://howardhinnant.github.io/date_algorithms.html>

use core::fmt::Write as _;

use embassy_time::Instant;
use thiserror_no_std::Error;

const SECONDS_PER_DAY: u64 = 86_400;

/// Capacity for `"DD.MM.YYYY HH:MM:SS"` (19 chars).
pub const TIMESTAMP_CAPACITY: usize = 20;

/// Capacity for `"DD_MM_YYYY"` (10 chars).
pub const FILE_DATE_CAPACITY: usize = 12;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The clock was never synchronized. Callers must treat this as a
    /// distinguishable failure and never log a fabricated timestamp.
    #[error("failed to obtain time, clock not synchronized")]
    NotSynced,
}

/// Broken-down local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub day: u8,
    pub month: u8,
    pub year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CalendarTime {
    /// Converts seconds since the unix epoch to a civil date and time of day.
    ///
    /// Valid for 1970..=2105 (u16 year limit).
    pub fn from_unix(unix_secs: u64) -> Self {
        let days_since_epoch = (unix_secs / SECONDS_PER_DAY) as i32;
        let secs_today = unix_secs % SECONDS_PER_DAY;

        let (year, month, day) = civil_from_days(days_since_epoch);

        Self {
            day,
            month,
            year,
            hour: (secs_today / 3600) as u8,
            minute: ((secs_today % 3600) / 60) as u8,
            second: (secs_today % 60) as u8,
        }
    }

    /// Converts back to seconds since the unix epoch.
    pub fn to_unix(&self) -> u64 {
        let days = days_from_civil(self.year, self.month, self.day);
        (days as u64) * SECONDS_PER_DAY
            + (self.hour as u64) * 3600
            + (self.minute as u64) * 60
            + (self.second as u64)
    }

    /// Renders `"DD.MM.YYYY HH:MM:SS"`.
    pub fn timestamp(&self) -> heapless::String<TIMESTAMP_CAPACITY> {
        let mut out = heapless::String::new();
        let _ = write!(
            out,
            "{:02}.{:02}.{:04} {:02}:{:02}:{:02}",
            self.day, self.month, self.year, self.hour, self.minute, self.second
        );
        out
    }

    /// Renders `"DD_MM_YYYY"` for building dated log filenames.
    pub fn file_date(&self) -> heapless::String<FILE_DATE_CAPACITY> {
        let mut out = heapless::String::new();
        let _ = write!(out, "{:02}_{:02}_{:04}", self.day, self.month, self.year);
        out
    }
}

/// Local wall clock, synchronized at most once per boot.
///
/// `set_unix_time` takes UTC seconds; the configured UTC and DST offsets are
/// applied when reading, so stored state stays timezone-free.
pub struct WallClock {
    base_unix: Option<u64>,
    anchor: Option<Instant>,
    local_offset_secs: i64,
}

impl WallClock {
    pub fn new(utc_offset_secs: i32, dst_offset_secs: i32) -> Self {
        Self {
            base_unix: None,
            anchor: None,
            local_offset_secs: utc_offset_secs as i64 + dst_offset_secs as i64,
        }
    }

    /// Anchors the clock to the given UTC unix time, taken "now".
    pub fn set_unix_time(&mut self, unix_secs: u64) {
        self.base_unix = Some(unix_secs);
        self.anchor = Some(Instant::now());
    }

    pub fn is_synced(&self) -> bool {
        self.base_unix.is_some()
    }

    /// Current UTC unix seconds, or [`ClockError::NotSynced`].
    pub fn unix_now(&self) -> Result<u64, ClockError> {
        match (self.base_unix, self.anchor) {
            (Some(base), Some(anchor)) => Ok(base + anchor.elapsed().as_secs()),
            _ => Err(ClockError::NotSynced),
        }
    }

    /// Current local calendar time, or [`ClockError::NotSynced`].
    pub fn now(&self) -> Result<CalendarTime, ClockError> {
        let utc = self.unix_now()?;
        let local = utc.saturating_add_signed(self.local_offset_secs);
        Ok(CalendarTime::from_unix(local))
    }

    /// Renders the current local time as `"DD.MM.YYYY HH:MM:SS"`.
    pub fn format_timestamp(&self) -> Result<heapless::String<TIMESTAMP_CAPACITY>, ClockError> {
        Ok(self.now()?.timestamp())
    }

    /// Renders the current local date as `"DD_MM_YYYY"`.
    pub fn format_file_date(&self) -> Result<heapless::String<FILE_DATE_CAPACITY>, ClockError> {
        Ok(self.now()?.file_date())
    }
}

/// Days since the unix epoch to (year, month, day), Hinnant's civil_from_days.
fn civil_from_days(days_since_epoch: i32) -> (u16, u8, u8) {
    // Shift the epoch from 1970-01-01 to 0000-03-01 so the leap day falls at
    // the end of the shifted year. 719468 = days from 0000-03-01 to 1970-01-01.
    let z = days_since_epoch + 719_468;

    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u32; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // year of era [0, 399]
    let y = (yoe as i32) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year [0, 365]
    let mp = (5 * doy + 2) / 153; // month [0, 11], 0 = March
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = if m <= 2 { y + 1 } else { y };

    (year as u16, m, d)
}

/// (year, month, day) to days since the unix epoch, Hinnant's days_from_civil.
fn days_from_civil(year: u16, month: u8, day: u8) -> i32 {
    let y = year as i32;
    let m = month as i32;
    let d = day as i32;

    let (y, m) = if m <= 2 { (y - 1, m + 9) } else { (y, m - 3) };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32; // year of era [0, 399]
    let doy = (153 * (m as u32) + 2) / 5 + (d as u32) - 1; // day of year [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // day of era [0, 146096]

    era * 146_097 + (doe as i32) - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        let t = CalendarTime::from_unix(0);
        assert_eq!(t.year, 1970);
        assert_eq!(t.month, 1);
        assert_eq!(t.day, 1);
        assert_eq!(t.hour, 0);
        assert_eq!(t.minute, 0);
        assert_eq!(t.second, 0);
    }

    #[test]
    fn test_round_trip_conversion() {
        let test_dates = [
            0u64,          // 1970-01-01 00:00:00
            946_684_800,   // 2000-01-01 00:00:00
            1_609_459_200, // 2021-01-01 00:00:00
            1_653_634_215, // 2022-05-27 06:50:15
            2_147_483_647, // 2038-01-19 03:14:07 (32-bit unix time limit)
            4_102_444_800, // 2100-01-01 00:00:00
        ];

        for &unix_secs in &test_dates {
            let t = CalendarTime::from_unix(unix_secs);
            assert_eq!(
                t.to_unix(),
                unix_secs,
                "round trip failed for timestamp {}",
                unix_secs
            );
        }
    }

    #[test]
    fn test_leap_day_2024() {
        // 2024-02-29 12:30:45
        let t = CalendarTime::from_unix(1_709_209_845);
        assert_eq!(t.year, 2024);
        assert_eq!(t.month, 2);
        assert_eq!(t.day, 29);
    }

    #[test]
    fn test_timestamp_is_zero_padded() {
        // 2022-05-27 06:05:03 UTC
        let t = CalendarTime::from_unix(1_653_631_503);
        assert_eq!(t.timestamp().as_str(), "27.05.2022 06:05:03");
        assert_eq!(t.file_date().as_str(), "27_05_2022");
    }

    #[test]
    fn test_unsynced_clock_reports_failure_not_zero_date() {
        let clock = WallClock::new(3600, 3600);
        assert_eq!(clock.now(), Err(ClockError::NotSynced));
        assert_eq!(clock.format_timestamp(), Err(ClockError::NotSynced));
        assert_eq!(clock.format_file_date(), Err(ClockError::NotSynced));
    }

    #[test]
    fn test_synced_clock_applies_local_offset() {
        let mut clock = WallClock::new(3600, 3600);
        // 2022-05-27 00:00:00 UTC; +2h local offset
        clock.set_unix_time(1_653_609_600);
        let t = clock.now().unwrap();
        assert_eq!(t.day, 27);
        assert_eq!(t.month, 5);
        assert_eq!(t.year, 2022);
        assert_eq!(t.hour, 2);
    }
}
