//! Timer-based deep sleep.
//!
//! One named function per unit; earlier firmware revisions overloaded a
//! single integer parameter for seconds, minutes and hours, which is an easy
//! way to sleep 60x too long.

use core::time::Duration;

use esp_hal::rtc_cntl::{sleep::TimerWakeupSource, Rtc};
use log::info;

/// Park the processor; execution resumes at boot after `seconds`.
pub fn deep_sleep_for_seconds(rtc: &mut Rtc<'_>, seconds: u64) -> ! {
    info!("entering deep sleep for {} s", seconds);
    let timer = TimerWakeupSource::new(Duration::from_secs(seconds));
    rtc.sleep_deep(&[&timer])
}

pub fn deep_sleep_for_minutes(rtc: &mut Rtc<'_>, minutes: u64) -> ! {
    deep_sleep_for_seconds(rtc, minutes * 60)
}

pub fn deep_sleep_for_hours(rtc: &mut Rtc<'_>, hours: u64) -> ! {
    deep_sleep_for_seconds(rtc, hours * 3600)
}
