use embedded_hal_async::i2c::I2c;
use log::error;
use sht4x::Sht4xAsync;

use super::{Hygrometer, HygrometerReading, SensorError};

/// SHT40 temperature/humidity sensor in the hygrometer role.
pub struct Sht40Sensor<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
}

impl<I: I2c> Sht40Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
        }
    }
}

impl<I: I2c> Hygrometer for Sht40Sensor<I> {
    /// The serial-number read doubles as a presence probe; the SHT40 needs no
    /// further configuration.
    async fn initialize(&mut self) -> Result<(), SensorError> {
        self.sensor
            .serial_number(&mut embassy_time::Delay)
            .await
            .map_err(|e| {
                error!("SHT40 probe failed: {:?}", e);
                SensorError::InitializationFailed {
                    sensor: "SHT40",
                    details: "serial number read failed, sensor absent or not responding",
                }
            })?;
        Ok(())
    }

    async fn measure(&mut self) -> Result<HygrometerReading, SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "SHT40",
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok(HygrometerReading {
            temperature_c: measurement.temperature_celsius().to_num::<f32>(),
            humidity_pct: measurement.humidity_percent().to_num::<f32>(),
        })
    }

    async fn reset(&mut self) -> Result<(), SensorError> {
        self.sensor
            .soft_reset(&mut embassy_time::Delay)
            .await
            .map_err(|e| {
                error!("SHT40 soft reset failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "SHT40",
                    operation: "soft reset",
                    details: "I2C communication error",
                }
            })
    }
}
