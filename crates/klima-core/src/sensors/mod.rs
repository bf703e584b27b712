//! Sensor traits and the two-device fusion layer.
//!
//! The device carries two independent I2C sensors: a hygrometer (temperature
//! + relative humidity) and a barometer (temperature + pressure).
//! [`ClimateSensors`] fuses them into the quantity set the logger records.

#[cfg(feature = "sensor-bme680")]
mod bme680;
#[cfg(feature = "sensor-sht40")]
mod sht40;

#[cfg(feature = "sensor-bme680")]
pub use bme680::Bme680Sensor;
#[cfg(feature = "sensor-sht40")]
pub use sht40::Sht40Sensor;

use thiserror_no_std::Error;

/// Sea-level pressure of the standard atmosphere, in pascals.
pub const STANDARD_SEA_LEVEL_PA: f32 = 101_325.0;

/// Scale height of the international barometric formula, in meters.
const SCALE_HEIGHT_M: f32 = 44_330.0;

/// Exponent of the international barometric formula.
const PRESSURE_EXPONENT: f32 = 5.255;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} failed to {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor} timed out waiting to {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// One hygrometer measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HygrometerReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// One barometer measurement. Pressure is in pascals, the barometer's native
/// unit; unit normalization happens in [`ClimateSensors`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometerReading {
    pub temperature_c: f32,
    pub pressure_pa: f32,
}

/// Temperature + humidity device.
pub trait Hygrometer {
    fn initialize(&mut self) -> impl Future<Output = Result<(), SensorError>>;
    fn measure(&mut self) -> impl Future<Output = Result<HygrometerReading, SensorError>>;
    /// Soft-resets the device.
    fn reset(&mut self) -> impl Future<Output = Result<(), SensorError>>;
}

/// Temperature + pressure device.
pub trait Barometer {
    fn initialize(&mut self) -> impl Future<Output = Result<(), SensorError>>;
    fn measure(&mut self) -> impl Future<Output = Result<BarometerReading, SensorError>>;
}

/// Both physical sensors plus the derived-quantity arithmetic.
///
/// Holds the cached reference pressure that anchors altitude computation;
/// until [`Self::set_reference_elevation`] is called the standard atmosphere
/// (1013.25 hPa) is assumed.
pub struct ClimateSensors<H, B> {
    hygrometer: H,
    barometer: B,
    reference_pressure_pa: f32,
}

impl<H: Hygrometer, B: Barometer> ClimateSensors<H, B> {
    pub fn new(hygrometer: H, barometer: B) -> Self {
        Self {
            hygrometer,
            barometer,
            reference_pressure_pa: STANDARD_SEA_LEVEL_PA,
        }
    }

    /// Starts both devices. Succeeds only if both initialize; on failure no
    /// quantity read is meaningful and callers are expected to retry.
    pub async fn initialize(&mut self) -> Result<(), SensorError> {
        self.hygrometer.initialize().await?;
        self.barometer.initialize().await
    }

    /// Approximates the true temperature as the mean of both devices'
    /// readings. Cheap fusion against single-sensor bias; no outlier
    /// rejection.
    pub async fn temperature_c(&mut self) -> Result<f32, SensorError> {
        let h = self.hygrometer.measure().await?;
        let b = self.barometer.measure().await?;
        Ok((h.temperature_c + b.temperature_c) / 2.0)
    }

    /// Temperature as seen by the hygrometer alone.
    pub async fn hygrometer_temperature_c(&mut self) -> Result<f32, SensorError> {
        Ok(self.hygrometer.measure().await?.temperature_c)
    }

    /// Temperature as seen by the barometer alone.
    pub async fn barometer_temperature_c(&mut self) -> Result<f32, SensorError> {
        Ok(self.barometer.measure().await?.temperature_c)
    }

    /// Relative humidity in percent.
    pub async fn humidity_pct(&mut self) -> Result<f32, SensorError> {
        Ok(self.hygrometer.measure().await?.humidity_pct)
    }

    /// Station pressure in hectopascals.
    pub async fn pressure_hpa(&mut self) -> Result<f32, SensorError> {
        Ok(self.barometer.measure().await?.pressure_pa / 100.0)
    }

    /// The equivalent sea-level pressure for the current reading, assuming
    /// the station sits at `altitude_m`, in hectopascals.
    pub async fn sea_level_pressure_hpa(&mut self, altitude_m: f32) -> Result<f32, SensorError> {
        let pressure_pa = self.barometer.measure().await?.pressure_pa;
        Ok(sea_level_pressure_pa(pressure_pa, altitude_m) / 100.0)
    }

    /// Calibrates the altitude baseline from a known elevation: the sea-level
    /// pressure computed for `elevation_m` becomes the new reference, so
    /// subsequent [`Self::altitude_m`] calls report absolute elevation
    /// without a manual reference constant.
    pub async fn set_reference_elevation(&mut self, elevation_m: f32) -> Result<(), SensorError> {
        let pressure_pa = self.barometer.measure().await?.pressure_pa;
        self.reference_pressure_pa = sea_level_pressure_pa(pressure_pa, elevation_m);
        Ok(())
    }

    /// Elevation above sea level derived from the current pressure and the
    /// cached reference pressure.
    pub async fn altitude_m(&mut self) -> Result<f32, SensorError> {
        let pressure_pa = self.barometer.measure().await?.pressure_pa;
        let ratio = pressure_pa / self.reference_pressure_pa;
        Ok(SCALE_HEIGHT_M * (1.0 - libm::powf(ratio, 1.0 / PRESSURE_EXPONENT)))
    }

    /// Soft-resets the hygrometer.
    pub async fn reset_hygrometer(&mut self) -> Result<(), SensorError> {
        self.hygrometer.reset().await
    }
}

/// International barometric formula: station pressure at `altitude_m` mapped
/// to its sea-level equivalent, both in pascals.
fn sea_level_pressure_pa(pressure_pa: f32, altitude_m: f32) -> f32 {
    pressure_pa / libm::powf(1.0 - altitude_m / SCALE_HEIGHT_M, PRESSURE_EXPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{block_on, StubBarometer, StubHygrometer};

    #[test]
    fn test_fused_temperature_is_exact_mean() {
        let mut sensors = ClimateSensors::new(
            StubHygrometer::steady(20.0, 50.0),
            StubBarometer::steady(24.0, 100_000.0),
        );
        let fused = block_on(sensors.temperature_c()).unwrap();
        assert_eq!(fused, (20.0 + 24.0) / 2.0);
    }

    #[test]
    fn test_pressure_is_normalized_to_hectopascals() {
        let mut sensors = ClimateSensors::new(
            StubHygrometer::steady(20.0, 50.0),
            StubBarometer::steady(20.0, 100_310.0),
        );
        let hpa = block_on(sensors.pressure_hpa()).unwrap();
        assert!((hpa - 1003.1).abs() < 1e-3);
    }

    #[test]
    fn test_default_reference_is_standard_atmosphere() {
        let mut sensors = ClimateSensors::new(
            StubHygrometer::steady(20.0, 50.0),
            StubBarometer::steady(20.0, STANDARD_SEA_LEVEL_PA),
        );
        // At exactly standard pressure the derived altitude is sea level.
        let altitude = block_on(sensors.altitude_m()).unwrap();
        assert!(altitude.abs() < 0.5);
    }

    #[test]
    fn test_reference_elevation_round_trips_through_altitude() {
        let mut sensors = ClimateSensors::new(
            StubHygrometer::steady(20.0, 50.0),
            StubBarometer::steady(20.0, 96_500.0),
        );
        block_on(sensors.set_reference_elevation(412.0)).unwrap();
        // Ambient pressure unchanged, so the altitude must read back the
        // calibrated elevation.
        let altitude = block_on(sensors.altitude_m()).unwrap();
        assert!(
            (altitude - 412.0).abs() < 1.0,
            "altitude {} not within tolerance of reference",
            altitude
        );
    }

    #[test]
    fn test_initialize_fails_if_either_device_fails() {
        let mut sensors = ClimateSensors::new(
            StubHygrometer::failing_init(),
            StubBarometer::steady(20.0, 100_000.0),
        );
        assert!(block_on(sensors.initialize()).is_err());

        let mut sensors = ClimateSensors::new(
            StubHygrometer::steady(20.0, 50.0),
            StubBarometer::failing_init(),
        );
        assert!(block_on(sensors.initialize()).is_err());
    }
}
