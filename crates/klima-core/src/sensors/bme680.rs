use bosch_bme680::{AsyncBme680, Configuration, DeviceAddress};
use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{Barometer, BarometerReading, SensorError};

/// BME680 environmental sensor in the barometer role.
///
/// The chip sits at the secondary address (0x77), the same address the
/// board's earlier barometer occupied.
pub struct Bme680Sensor<I> {
    sensor: AsyncBme680<I, embassy_time::Delay>,
    initialized: bool,
}

impl<I: I2c> Bme680Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            // 20 is the initial ambient temperature hint for the Bosch
            // compensation code, in °C.
            sensor: AsyncBme680::new(i2c, DeviceAddress::Secondary, embassy_time::Delay, 20),
            initialized: false,
        }
    }
}

impl<I: I2c> Barometer for Bme680Sensor<I> {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        let config = Configuration::default();
        self.sensor.initialize(&config).await.map_err(|e| {
            error!("BME680 initialization failed: {:?}", e);
            SensorError::InitializationFailed {
                sensor: "BME680",
                details: "chip probe or configuration failed",
            }
        })?;
        self.initialized = true;
        info!("BME680 configured");
        Ok(())
    }

    async fn measure(&mut self) -> Result<BarometerReading, SensorError> {
        if !self.initialized {
            return Err(SensorError::ReadFailed {
                sensor: "BME680",
                operation: "measure temperature/pressure",
                details: "sensor not initialized",
            });
        }

        let data = self.sensor.measure().await.map_err(|e| {
            error!("BME680 measurement failed: {:?}", e);
            SensorError::ReadFailed {
                sensor: "BME680",
                operation: "measure temperature/pressure",
                details: "I2C communication error",
            }
        })?;

        // The driver reports hectopascals; the trait contract is pascals.
        Ok(BarometerReading {
            temperature_c: data.temperature,
            pressure_pa: data.pressure * 100.0,
        })
    }
}
