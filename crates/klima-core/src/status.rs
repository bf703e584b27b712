//! Device status model for the RGB indicator.

/// What the device is currently doing, as shown on the status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Peripherals coming up.
    Booting,
    /// Joining WiFi / querying the time server.
    TimeSyncing,
    /// Logging normally.
    Sampling,
    /// A sensor failed to initialize or read.
    SensorFault,
    /// The SD card is absent or a write failed.
    StorageFault,
    /// About to enter deep sleep.
    Sleeping,
}

impl DeviceStatus {
    /// 8-bit RGB color for this status.
    pub const fn color(self) -> (u8, u8, u8) {
        match self {
            Self::Booting => (0, 0, 255),
            Self::TimeSyncing => (0, 255, 255),
            Self::Sampling => (0, 255, 0),
            Self::SensorFault => (255, 0, 0),
            Self::StorageFault => (255, 0, 255),
            Self::Sleeping => (0, 0, 0),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Booting => "booting",
            Self::TimeSyncing => "time sync",
            Self::Sampling => "sampling",
            Self::SensorFault => "sensor fault",
            Self::StorageFault => "storage fault",
            Self::Sleeping => "sleeping",
        }
    }
}
