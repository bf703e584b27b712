//! RGB status LED on three LEDC PWM channels (5 kHz, 8-bit).

use embassy_time::{Duration, Timer};
use esp_hal::ledc::channel::{Channel, ChannelIFace};
use esp_hal::ledc::LowSpeed;
use klima_core::status::DeviceStatus;
use log::warn;

pub struct RgbLed<'d> {
    red: Channel<'d, LowSpeed>,
    green: Channel<'d, LowSpeed>,
    blue: Channel<'d, LowSpeed>,
}

impl<'d> RgbLed<'d> {
    /// Takes three configured channels, one per color.
    pub fn new(
        red: Channel<'d, LowSpeed>,
        green: Channel<'d, LowSpeed>,
        blue: Channel<'d, LowSpeed>,
    ) -> Self {
        let mut led = Self { red, green, blue };
        led.clear();
        led
    }

    /// Set the LED color from 8-bit components.
    pub fn set_color(&mut self, red: u8, green: u8, blue: u8) {
        set_duty(&mut self.red, red);
        set_duty(&mut self.green, green);
        set_duty(&mut self.blue, blue);
    }

    /// Turn the LED off.
    pub fn clear(&mut self) {
        self.set_color(0, 0, 0);
    }

    /// Show the color assigned to a device status.
    pub fn show(&mut self, status: DeviceStatus) {
        let (r, g, b) = status.color();
        self.set_color(r, g, b);
    }

    /// Cycle red, green and blue for wiring checks.
    pub async fn test_cycle(&mut self, cycles: usize) {
        for _ in 0..cycles {
            self.set_color(255, 0, 0);
            Timer::after(Duration::from_millis(1000)).await;
            self.set_color(0, 255, 0);
            Timer::after(Duration::from_millis(1000)).await;
            self.set_color(0, 0, 255);
            Timer::after(Duration::from_millis(1000)).await;
        }
        self.clear();
    }
}

fn set_duty(channel: &mut Channel<'_, LowSpeed>, value: u8) {
    // LEDC duty is set in percent.
    let pct = (value as u32 * 100 / 255) as u8;
    if let Err(e) = channel.set_duty(pct) {
        warn!("led: set_duty failed: {:?}", e);
    }
}
