//! Sharing one async I2C bus between the hygrometer and the barometer.
//!
//! Both sensors sit on the same bus; each gets its own [`SharedI2cDevice`]
//! over an embassy async mutex, so a transaction in flight yields to the
//! executor instead of blocking in a critical section.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// One device's handle onto a shared async I2C bus.
///
/// ```ignore
/// use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
/// use embassy_sync::mutex::Mutex;
/// use static_cell::StaticCell;
///
/// static I2C_BUS: StaticCell<Mutex<CriticalSectionRawMutex, esp_hal::i2c::master::I2c<'static, esp_hal::Async>>> = StaticCell::new();
///
/// let i2c = /* ... create async I2C ... */;
/// let i2c_bus = I2C_BUS.init(Mutex::new(i2c));
///
/// let hygrometer_i2c = SharedI2cDevice::new(i2c_bus);
/// let barometer_i2c = SharedI2cDevice::new(i2c_bus);
/// ```
pub struct SharedI2cDevice<'a, T> {
    bus: &'a Mutex<CriticalSectionRawMutex, T>,
}

impl<'a, T> SharedI2cDevice<'a, T> {
    #[inline]
    pub const fn new(bus: &'a Mutex<CriticalSectionRawMutex, T>) -> Self {
        Self { bus }
    }
}

impl<T> ErrorType for SharedI2cDevice<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for SharedI2cDevice<'_, T>
where
    T: I2c,
{
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(address, write).await
    }

    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write_read(address, write, read).await
    }

    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.transaction(address, operations).await
    }
}
