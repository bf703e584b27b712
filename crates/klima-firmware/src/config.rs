//! Build-time device configuration.
//!
//! Credentials and the time server come from environment variables at
//! compile time; cadence and site constants are edited here.

use klima_core::config::{Config, LoggingConfig, NetworkConfig, TimeConfig, DEFAULT_NTP_SERVER};

const fn env_or(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(v) => v,
        None => default,
    }
}

/// Global configuration instance.
pub static CONFIG: Config<'static> = Config {
    network: NetworkConfig {
        ssid: env_or(option_env!("KLIMA_WIFI_SSID"), ""),
        password: env_or(option_env!("KLIMA_WIFI_PASSWORD"), ""),
    },
    time: TimeConfig {
        ntp_server: env_or(option_env!("KLIMA_NTP_SERVER"), DEFAULT_NTP_SERVER),
        utc_offset_secs: 3600,
        dst_offset_secs: 3600,
    },
    logging: LoggingConfig {
        sample_interval_secs: 60,
        // Non-zero switches to single-sample-then-sleep operation.
        deep_sleep_minutes: 0,
        reference_elevation_m: None,
    },
};
