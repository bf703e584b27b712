//! The top-level logging pipeline: sensors → derived quantities → CSV row.

use core::fmt::Write as _;

use log::info;
use thiserror_no_std::Error;

use crate::clock::{ClockError, WallClock};
use crate::sample::ClimateSample;
use crate::sensors::{Barometer, ClimateSensors, Hygrometer, SensorError};
use crate::storage::{DailyLogbook, LogVolume, LogbookError};

/// Produces UTC unix seconds, typically by joining a network, querying a
/// time server once and releasing the network again. Stubbed in tests.
pub trait TimeSyncSource {
    type Error: core::fmt::Debug;

    fn sync(&mut self) -> impl Future<Output = Result<u64, Self::Error>>;
}

/// Process-lifetime state of the logger.
///
/// `Uninitialized → TimeSyncing → Ready`, with `TimeSyncing` skipped when
/// the clock was carried across a low-power reset. Deep sleep or reboot
/// resets everything except the explicitly persisted boot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    TimeSyncing,
    Ready,
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),
    #[error("storage error: {0}")]
    Storage(#[from] LogbookError),
    #[error("time sync failed: {0}")]
    TimeSync(heapless::String<64>),
}

/// Composes the fused sensors, the daily logbook and the wall clock into the
/// sample-per-tick pipeline.
pub struct ClimateLogger<H, B, V: LogVolume> {
    sensors: ClimateSensors<H, B>,
    logbook: DailyLogbook<V>,
    clock: WallClock,
    state: RunState,
}

impl<H: Hygrometer, B: Barometer, V: LogVolume> ClimateLogger<H, B, V> {
    pub fn new(sensors: ClimateSensors<H, B>, logbook: DailyLogbook<V>, clock: WallClock) -> Self {
        Self {
            sensors,
            logbook,
            clock,
            state: RunState::Uninitialized,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn clock(&self) -> &WallClock {
        &self.clock
    }

    /// The wall clock, for seeding from state carried across a reset.
    pub fn clock_mut(&mut self) -> &mut WallClock {
        &mut self.clock
    }

    /// Starts both sensor devices. Callers retry this in a loop with status
    /// feedback until it succeeds; no quantity is read before it does.
    pub async fn initialize_sensors(&mut self) -> Result<(), LoggerError> {
        self.sensors.initialize().await?;
        Ok(())
    }

    /// Calibrates the altitude baseline from the known site elevation.
    pub async fn calibrate_reference_elevation(
        &mut self,
        elevation_m: f32,
    ) -> Result<(), LoggerError> {
        self.sensors.set_reference_elevation(elevation_m).await?;
        Ok(())
    }

    /// Mounts storage, synchronizes the clock unless it was already
    /// established (e.g. carried across a deep-sleep reset), and opens the
    /// dated log file for today.
    pub async fn initialize<S: TimeSyncSource>(
        &mut self,
        sync_source: &mut S,
        clock_already_synced: bool,
    ) -> Result<(), LoggerError> {
        self.logbook.initialize()?;

        if !clock_already_synced {
            self.state = RunState::TimeSyncing;
            let unix_secs = sync_source.sync().await.map_err(|e| {
                let mut text = heapless::String::new();
                let _ = write!(text, "{:?}", e);
                LoggerError::TimeSync(text)
            })?;
            self.clock.set_unix_time(unix_secs);
            info!("clock synchronized at {} unix", unix_secs);
        }

        let today = self.clock.now()?;
        self.logbook.open_or_create_daily_log(&today)?;
        self.state = RunState::Ready;
        Ok(())
    }

    /// One logging tick: read every quantity, stamp it, append one row.
    ///
    /// The timestamp is taken first so a never-synced clock aborts the tick
    /// before anything is written; the row itself is fully serialized before
    /// the single append call, so no partial row can ever reach the file.
    pub async fn record_sample(&mut self) -> Result<ClimateSample, LoggerError> {
        let timestamp = self.clock.format_timestamp()?;

        let temperature_c = self.sensors.temperature_c().await?;
        let humidity_pct = self.sensors.humidity_pct().await?;
        let pressure_hpa = self.sensors.pressure_hpa().await?;
        let altitude_m = self.sensors.altitude_m().await?;
        let sea_level_pressure_hpa = self.sensors.sea_level_pressure_hpa(altitude_m).await?;

        let sample = ClimateSample {
            timestamp,
            temperature_c,
            humidity_pct,
            pressure_hpa,
            sea_level_pressure_hpa,
            altitude_m,
        };

        self.logbook.append_sample(&sample)?;
        Ok(sample)
    }

    /// Access to logbook maintenance (list/rename/delete/read).
    pub fn logbook_mut(&mut self) -> &mut DailyLogbook<V> {
        &mut self.logbook
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::CSV_HEADER;
    use crate::test_util::{block_on, MemoryVolume, StubBarometer, StubHygrometer};
    use alloc::vec::Vec;

    struct StubSync {
        unix_secs: u64,
    }

    impl TimeSyncSource for StubSync {
        type Error = &'static str;

        async fn sync(&mut self) -> Result<u64, Self::Error> {
            Ok(self.unix_secs)
        }
    }

    struct FailingSync;

    impl TimeSyncSource for FailingSync {
        type Error = &'static str;

        async fn sync(&mut self) -> Result<u64, Self::Error> {
            Err("no network")
        }
    }

    fn logger() -> ClimateLogger<StubHygrometer, StubBarometer, MemoryVolume> {
        ClimateLogger::new(
            ClimateSensors::new(
                StubHygrometer::steady(20.0, 50.0),
                StubBarometer::steady(24.0, 100_000.0),
            ),
            DailyLogbook::new(MemoryVolume::default()),
            WallClock::new(0, 0),
        )
    }

    #[test]
    fn test_full_tick_writes_header_and_rows() {
        let mut logger = logger();
        // 2022-05-27 09:15:00 UTC
        let mut sync = StubSync { unix_secs: 1_653_642_900 };

        block_on(logger.initialize_sensors()).unwrap();
        block_on(logger.initialize(&mut sync, false)).unwrap();
        assert_eq!(logger.state(), RunState::Ready);

        block_on(logger.record_sample()).unwrap();
        block_on(logger.record_sample()).unwrap();

        let mut buf = [0u8; 512];
        let n = logger
            .logbook_mut()
            .read_log("log_27_05_2022.csv", 0, &mut buf)
            .unwrap();
        let text = core::str::from_utf8(&buf[..n]).unwrap();
        assert!(text.starts_with(CSV_HEADER));
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("27.05.2022 09:15:0"));
        // 22.00 is the mean of the stub devices' 20.0 and 24.0.
        assert!(rows[0].contains(",22.00,50.00,1000.00,"));
    }

    #[test]
    fn test_record_sample_with_unsynced_clock_writes_nothing() {
        let mut logger = logger();
        let err = block_on(logger.record_sample()).unwrap_err();
        assert!(matches!(err, LoggerError::Clock(ClockError::NotSynced)));
    }

    #[test]
    fn test_initialize_surfaces_sync_failure() {
        let mut logger = logger();
        let err = block_on(logger.initialize(&mut FailingSync, false)).unwrap_err();
        assert!(matches!(err, LoggerError::TimeSync(_)));
        assert_eq!(logger.state(), RunState::TimeSyncing);
    }

    #[test]
    fn test_clock_already_synced_skips_the_network() {
        let mut logger = logger();
        // 2022-05-28 00:00:00 UTC, seeded as if carried across deep sleep.
        logger.clock_mut().set_unix_time(1_653_696_000);
        // FailingSync proves the sync source is never consulted.
        block_on(logger.initialize(&mut FailingSync, true)).unwrap();
        assert_eq!(logger.logbook_mut().active_file(), Some("log_28_05_2022.csv"));
    }

    #[test]
    fn test_sensor_init_failure_propagates() {
        let mut logger = ClimateLogger::new(
            ClimateSensors::new(
                StubHygrometer::failing_init(),
                StubBarometer::steady(24.0, 100_000.0),
            ),
            DailyLogbook::new(MemoryVolume::default()),
            WallClock::new(0, 0),
        );
        assert!(matches!(
            block_on(logger.initialize_sensors()),
            Err(LoggerError::Sensor(_))
        ));
    }
}
