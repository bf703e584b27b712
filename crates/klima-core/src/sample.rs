//! The per-tick measurement record and its CSV serialization.

use core::fmt::Write as _;

use crate::clock::TIMESTAMP_CAPACITY;

/// Fixed CSV header, written exactly once when a daily log file is created.
///
/// The text (including the spacing quirk after the first comma) is a
/// compatibility surface with existing log files and must not change.
pub const CSV_HEADER: &str = "time,temperature, humidity, pressure, pressureAtSealevel, height\n";

/// Capacity for one serialized CSV row.
pub const ROW_CAPACITY: usize = 128;

/// One fully-read set of climate quantities, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateSample {
    pub timestamp: heapless::String<TIMESTAMP_CAPACITY>,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
    pub sea_level_pressure_hpa: f32,
    pub altitude_m: f32,
}

impl ClimateSample {
    /// Serializes the sample as one newline-terminated CSV row.
    ///
    /// Column order matches [`CSV_HEADER`]; floats print with two decimals,
    /// matching the log format of earlier firmware revisions.
    pub fn to_csv_row(&self) -> heapless::String<ROW_CAPACITY> {
        let mut row = heapless::String::new();
        let _ = write!(
            row,
            "{},{:.2},{:.2},{:.2},{:.2},{:.2}\n",
            self.timestamp,
            self.temperature_c,
            self.humidity_pct,
            self.pressure_hpa,
            self.sea_level_pressure_hpa,
            self.altitude_m
        );
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn test_header_column_order() {
        assert_eq!(
            CSV_HEADER,
            "time,temperature, humidity, pressure, pressureAtSealevel, height\n"
        );
    }

    #[test]
    fn test_row_format() {
        let sample = ClimateSample {
            timestamp: heapless::String::from_str("27.05.2022 09:15:00").unwrap(),
            temperature_c: 21.5,
            humidity_pct: 48.25,
            pressure_hpa: 1003.1,
            sea_level_pressure_hpa: 1013.25,
            altitude_m: 84.0,
        };
        assert_eq!(
            sample.to_csv_row().as_str(),
            "27.05.2022 09:15:00,21.50,48.25,1003.10,1013.25,84.00\n"
        );
    }
}
