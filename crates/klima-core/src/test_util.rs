//! Shared test doubles: an in-memory storage volume, fixed-value sensor
//! stubs, and a minimal executor for futures that never pend.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::task::{Context, Poll, Waker};

use crate::sensors::{
    Barometer, BarometerReading, Hygrometer, HygrometerReading, SensorError,
};
use crate::storage::LogVolume;

/// Drives a future to completion on the current thread. The futures under
/// test never yield, so a poll loop with a no-op waker suffices.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = core::pin::pin!(fut);
    let waker = Waker::noop();
    let mut cx = Context::from_waker(waker);
    loop {
        if let Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
            return out;
        }
    }
}

/// RAM-backed [`LogVolume`].
#[derive(Default)]
pub struct MemoryVolume {
    files: BTreeMap<String, Vec<u8>>,
}

impl LogVolume for MemoryVolume {
    type Error = &'static str;

    fn mount(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, Self::Error> {
        Ok(self.files.contains_key(name))
    }

    fn create(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Error> {
        self.files.insert(String::from(name), Vec::from(contents));
        Ok(())
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.files
            .entry(String::from(name))
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn read_chunk(&mut self, name: &str, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let file = self.files.get(name).ok_or("file not found")?;
        let start = (offset as usize).min(file.len());
        let n = (file.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&file[start..start + n]);
        Ok(n)
    }

    fn delete(&mut self, name: &str) -> Result<(), Self::Error> {
        self.files.remove(name).map(|_| ()).ok_or("file not found")
    }

    fn list(&mut self, visit: &mut dyn FnMut(&str, u32)) -> Result<(), Self::Error> {
        for (name, contents) in &self.files {
            visit(name, contents.len() as u32);
        }
        Ok(())
    }
}

pub struct StubHygrometer {
    temperature_c: f32,
    humidity_pct: f32,
    fail_init: bool,
}

impl StubHygrometer {
    pub fn steady(temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            temperature_c,
            humidity_pct,
            fail_init: false,
        }
    }

    pub fn failing_init() -> Self {
        Self {
            temperature_c: 0.0,
            humidity_pct: 0.0,
            fail_init: true,
        }
    }
}

impl Hygrometer for StubHygrometer {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        if self.fail_init {
            return Err(SensorError::InitializationFailed {
                sensor: "stub hygrometer",
                details: "configured to fail",
            });
        }
        Ok(())
    }

    async fn measure(&mut self) -> Result<HygrometerReading, SensorError> {
        Ok(HygrometerReading {
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
        })
    }

    async fn reset(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
}

pub struct StubBarometer {
    temperature_c: f32,
    pressure_pa: f32,
    fail_init: bool,
}

impl StubBarometer {
    pub fn steady(temperature_c: f32, pressure_pa: f32) -> Self {
        Self {
            temperature_c,
            pressure_pa,
            fail_init: false,
        }
    }

    pub fn failing_init() -> Self {
        Self {
            temperature_c: 0.0,
            pressure_pa: 0.0,
            fail_init: true,
        }
    }
}

impl Barometer for StubBarometer {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        if self.fail_init {
            return Err(SensorError::InitializationFailed {
                sensor: "stub barometer",
                details: "configured to fail",
            });
        }
        Ok(())
    }

    async fn measure(&mut self) -> Result<BarometerReading, SensorError> {
        Ok(BarometerReading {
            temperature_c: self.temperature_c,
            pressure_pa: self.pressure_pa,
        })
    }
}
