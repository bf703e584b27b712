//! Device configuration.
//!
//! The firmware materializes one static [`Config`] from compile-time
//! environment variables; nothing here touches hardware.

use serde::{Deserialize, Serialize};

/// Default NTP server (PTB Braunschweig, the original deployment's choice).
pub const DEFAULT_NTP_SERVER: &str = "ptbtime1.ptb.de";

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub network: NetworkConfig<'a>,
    pub time: TimeConfig<'a>,
    pub logging: LoggingConfig,
}

/// Credentials for the one-shot WiFi join used by time synchronization.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct NetworkConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TimeConfig<'a> {
    pub ntp_server: &'a str,
    /// Offset from UTC in seconds.
    pub utc_offset_secs: i32,
    /// Additional daylight-saving offset in seconds, usually 3600.
    pub dst_offset_secs: i32,
}

impl Default for TimeConfig<'_> {
    fn default() -> Self {
        Self {
            ntp_server: DEFAULT_NTP_SERVER,
            utc_offset_secs: 3600,
            dst_offset_secs: 3600,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoggingConfig {
    /// Seconds between samples in continuous mode.
    pub sample_interval_secs: u32,
    /// When non-zero, log a single sample per wakeup and deep-sleep for this
    /// many minutes instead of looping.
    pub deep_sleep_minutes: u32,
    /// Known elevation of the deployment site, used to calibrate the altitude
    /// baseline at startup.
    pub reference_elevation_m: Option<f32>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 60,
            deep_sleep_minutes: 0,
            reference_elevation_m: None,
        }
    }
}
