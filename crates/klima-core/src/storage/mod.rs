//! Append-only daily CSV logbook over a block-storage volume.

pub mod sd_card;

pub use sd_card::{FatClock, SdVolume};

use core::fmt::Write as _;

use log::info;
use thiserror_no_std::Error;

use crate::clock::CalendarTime;
use crate::sample::{ClimateSample, CSV_HEADER};

/// Capacity for `"log_DD_MM_YYYY.csv"`.
pub const LOG_NAME_CAPACITY: usize = 24;

/// The storage seam the logbook writes through.
///
/// Implementations guarantee that every call is self-contained: any
/// underlying handle is acquired and released within the call, on every exit
/// path. `rename` has a provided copy-based implementation because the FAT
/// layer exposes no native rename.
pub trait LogVolume {
    type Error: core::fmt::Debug;

    /// Mounts the device; fails loudly if it is absent or unreadable.
    fn mount(&mut self) -> Result<(), Self::Error>;

    fn exists(&mut self, name: &str) -> Result<bool, Self::Error>;

    /// Creates (or truncates) `name` with the given contents.
    fn create(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Error>;

    /// Appends to `name`, creating it if absent. A durable write attempt.
    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads up to `buf.len()` bytes starting at `offset`; returns the byte
    /// count, 0 at end of file.
    fn read_chunk(&mut self, name: &str, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn delete(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Visits every file in the root directory with its name and size.
    fn list(&mut self, visit: &mut dyn FnMut(&str, u32)) -> Result<(), Self::Error>;

    fn rename(&mut self, from: &str, to: &str) -> Result<(), Self::Error> {
        self.create(to, &[])?;
        let mut offset = 0u32;
        let mut buf = [0u8; 256];
        loop {
            let n = self.read_chunk(from, offset, &mut buf)?;
            if n == 0 {
                break;
            }
            self.append(to, &buf[..n])?;
            offset += n as u32;
        }
        self.delete(from)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LogbookError {
    #[error("storage not mounted")]
    NotMounted,
    #[error("no active log file, open a daily log first")]
    NoActiveFile,
    #[error("log file name overflowed its buffer")]
    NameOverflow,
    #[error("storage backend error: {0}")]
    Backend(heapless::String<64>),
}

/// Wraps a backend error into the logbook taxonomy, keeping its debug text.
fn backend<E: core::fmt::Debug>(e: E) -> LogbookError {
    let mut text = heapless::String::new();
    let _ = write!(text, "{:?}", e);
    LogbookError::Backend(text)
}

/// Builds the dated log filename, `log_DD_MM_YYYY.csv`.
pub fn log_file_name(
    date: &CalendarTime,
) -> Result<heapless::String<LOG_NAME_CAPACITY>, LogbookError> {
    let mut name = heapless::String::new();
    write!(name, "log_{}.csv", date.file_date()).map_err(|_| LogbookError::NameOverflow)?;
    Ok(name)
}

/// Daily CSV log files on a [`LogVolume`].
///
/// One file per calendar day; the header row is written exactly once, when
/// the file is created. Appends are all-or-nothing: the row is fully
/// serialized before the single backend call.
pub struct DailyLogbook<V: LogVolume> {
    volume: V,
    mounted: bool,
    active_file: Option<heapless::String<LOG_NAME_CAPACITY>>,
}

impl<V: LogVolume> DailyLogbook<V> {
    pub fn new(volume: V) -> Self {
        Self {
            volume,
            mounted: false,
            active_file: None,
        }
    }

    /// Mounts the underlying device.
    pub fn initialize(&mut self) -> Result<(), LogbookError> {
        self.volume.mount().map_err(backend)?;
        self.mounted = true;
        info!("storage volume mounted");
        Ok(())
    }

    /// Selects the log file for `date`, creating it with the CSV header if it
    /// does not exist yet. Idempotent: reopening the same date never rewrites
    /// or duplicates the header.
    pub fn open_or_create_daily_log(&mut self, date: &CalendarTime) -> Result<(), LogbookError> {
        if !self.mounted {
            return Err(LogbookError::NotMounted);
        }
        let name = log_file_name(date)?;
        if !self.volume.exists(&name).map_err(backend)? {
            self.volume
                .create(&name, CSV_HEADER.as_bytes())
                .map_err(backend)?;
            info!("created daily log {}", name);
        }
        self.active_file = Some(name);
        Ok(())
    }

    /// Name of the currently selected log file, if any.
    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    /// Appends one sample row to the active log file.
    pub fn append_sample(&mut self, sample: &ClimateSample) -> Result<(), LogbookError> {
        let name = self.active_file.as_ref().ok_or(LogbookError::NoActiveFile)?;
        let row = sample.to_csv_row();
        self.volume.append(name, row.as_bytes()).map_err(backend)
    }

    /// Reads raw bytes back out of a log file.
    pub fn read_log(
        &mut self,
        name: &str,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, LogbookError> {
        self.volume.read_chunk(name, offset, buf).map_err(backend)
    }

    /// Visits every file on the volume.
    pub fn list_logs(&mut self, visit: &mut dyn FnMut(&str, u32)) -> Result<(), LogbookError> {
        self.volume.list(visit).map_err(backend)
    }

    pub fn rename_log(&mut self, from: &str, to: &str) -> Result<(), LogbookError> {
        self.volume.rename(from, to).map_err(backend)
    }

    pub fn delete_log(&mut self, name: &str) -> Result<(), LogbookError> {
        self.volume.delete(name).map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MemoryVolume;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::str::FromStr;

    fn date() -> CalendarTime {
        CalendarTime {
            day: 27,
            month: 5,
            year: 2022,
            hour: 9,
            minute: 15,
            second: 0,
        }
    }

    fn sample(timestamp: &str, temperature_c: f32) -> ClimateSample {
        ClimateSample {
            timestamp: heapless::String::from_str(timestamp).unwrap(),
            temperature_c,
            humidity_pct: 48.25,
            pressure_hpa: 1003.1,
            sea_level_pressure_hpa: 1013.25,
            altitude_m: 84.0,
        }
    }

    fn open_logbook() -> DailyLogbook<MemoryVolume> {
        let mut logbook = DailyLogbook::new(MemoryVolume::default());
        logbook.initialize().unwrap();
        logbook
    }

    fn contents(logbook: &mut DailyLogbook<MemoryVolume>, name: &str) -> String {
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        let mut offset = 0;
        loop {
            let n = logbook.read_log(name, offset, &mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            offset += n as u32;
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_daily_log_name() {
        assert_eq!(log_file_name(&date()).unwrap().as_str(), "log_27_05_2022.csv");
    }

    #[test]
    fn test_open_is_idempotent_header_written_once() {
        let mut logbook = open_logbook();
        logbook.open_or_create_daily_log(&date()).unwrap();
        logbook.open_or_create_daily_log(&date()).unwrap();

        let text = contents(&mut logbook, "log_27_05_2022.csv");
        assert_eq!(text.matches("time,temperature").count(), 1);
        assert_eq!(text, CSV_HEADER);
    }

    #[test]
    fn test_append_round_trip() {
        let mut logbook = open_logbook();
        logbook.open_or_create_daily_log(&date()).unwrap();
        logbook
            .append_sample(&sample("27.05.2022 09:15:00", 21.5))
            .unwrap();

        let text = contents(&mut logbook, "log_27_05_2022.csv");
        let row = text.strip_prefix(CSV_HEADER).unwrap();
        assert_eq!(row, "27.05.2022 09:15:00,21.50,48.25,1003.10,1013.25,84.00\n");
    }

    #[test]
    fn test_three_samples_make_four_lines_in_order() {
        let mut logbook = open_logbook();
        logbook.open_or_create_daily_log(&date()).unwrap();
        logbook.append_sample(&sample("27.05.2022 09:15:00", 20.0)).unwrap();
        logbook.append_sample(&sample("27.05.2022 09:16:00", 21.0)).unwrap();
        logbook.append_sample(&sample("27.05.2022 09:17:00", 22.0)).unwrap();

        let text = contents(&mut logbook, "log_27_05_2022.csv");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("27.05.2022 09:15:00,20.00"));
        assert!(lines[2].starts_with("27.05.2022 09:16:00,21.00"));
        assert!(lines[3].starts_with("27.05.2022 09:17:00,22.00"));
    }

    #[test]
    fn test_append_without_active_file_fails() {
        let mut logbook = open_logbook();
        assert_eq!(
            logbook.append_sample(&sample("27.05.2022 09:15:00", 20.0)),
            Err(LogbookError::NoActiveFile)
        );
    }

    #[test]
    fn test_open_without_mount_fails() {
        let mut logbook = DailyLogbook::new(MemoryVolume::default());
        assert_eq!(
            logbook.open_or_create_daily_log(&date()),
            Err(LogbookError::NotMounted)
        );
    }

    #[test]
    fn test_rename_preserves_content_and_delete_removes() {
        let mut logbook = open_logbook();
        logbook.open_or_create_daily_log(&date()).unwrap();
        logbook.append_sample(&sample("27.05.2022 09:15:00", 20.0)).unwrap();
        let original = contents(&mut logbook, "log_27_05_2022.csv");

        logbook.rename_log("log_27_05_2022.csv", "archive.csv").unwrap();
        assert_eq!(contents(&mut logbook, "archive.csv"), original);

        let mut names = Vec::new();
        logbook
            .list_logs(&mut |name, _size| names.push(String::from(name)))
            .unwrap();
        assert_eq!(names, ["archive.csv"]);

        logbook.delete_log("archive.csv").unwrap();
        assert!(logbook.delete_log("archive.csv").is_err());
    }
}
