#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};
use static_cell::StaticCell;

use klima_core::clock::WallClock;
use klima_core::logger::{ClimateLogger, LoggerError};
use klima_core::sensors::{Bme680Sensor, ClimateSensors, Sht40Sensor};
use klima_core::shared_i2c::SharedI2cDevice;
use klima_core::status::DeviceStatus;
use klima_core::storage::{DailyLogbook, FatClock, SdVolume};

use klima_firmware::config::CONFIG;
use klima_firmware::time_sync::NtpTimeSource;
use klima_firmware::{hardware, rgb_led::RgbLed, sleep, wifi};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

// Boot state carried across deep sleep in RTC fast RAM. Contents are
// arbitrary after a cold boot and are explicitly reset below.
#[esp_hal::ram(rtc_fast, persistent)]
static BOOT_COUNT: AtomicU32 = AtomicU32::new(0);
#[esp_hal::ram(rtc_fast, persistent)]
static CLOCK_SYNCED: AtomicBool = AtomicBool::new(false);
#[esp_hal::ram(rtc_fast, persistent)]
static WAKE_UNIX_SECS: AtomicU32 = AtomicU32::new(0);

/// Interval between retries while peripherals refuse to come up.
const INIT_RETRY_MS: u64 = 500;

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);
    esp_alloc::heap_allocator!(size: 48 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Cold boots invalidate whatever the RTC RAM held.
    let woke_from_sleep = matches!(
        esp_hal::system::wakeup_cause(),
        esp_hal::system::SleepSource::Timer
    );
    if !woke_from_sleep {
        BOOT_COUNT.store(0, Ordering::Relaxed);
        CLOCK_SYNCED.store(false, Ordering::Relaxed);
        WAKE_UNIX_SECS.store(0, Ordering::Relaxed);
    }
    let boot_count = BOOT_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    info!(
        "boot #{} ({})",
        boot_count,
        if woke_from_sleep { "timer wakeup" } else { "cold boot" }
    );

    // Status LED: three LEDC channels at 5 kHz / 8-bit.
    static LEDC: StaticCell<Ledc<'static>> = StaticCell::new();
    static LED_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

    let ledc = LEDC.init(Ledc::new(peripherals.LEDC));
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
    let ledc: &'static Ledc<'static> = ledc;

    let led_timer = LED_TIMER.init(ledc.timer::<LowSpeed>(timer::Number::Timer0));
    led_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty8Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_khz(5),
        })
        .unwrap();
    let led_timer: &'static timer::Timer<'static, LowSpeed> = led_timer;

    let mut red = ledc.channel(channel::Number::Channel0, peripherals.GPIO25);
    let mut green = ledc.channel(channel::Number::Channel1, peripherals.GPIO26);
    let mut blue = ledc.channel(channel::Number::Channel2, peripherals.GPIO27);
    for ch in [&mut red, &mut green, &mut blue] {
        ch.configure(channel::config::Config {
            timer: led_timer,
            duty_pct: 0,
            pin_config: channel::config::PinConfig::PushPull,
        })
        .unwrap();
    }
    let mut led = RgbLed::new(red, green, blue);
    led.show(DeviceStatus::Booting);

    // Radio + network stack; the radio stays off until time sync needs it.
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio_init = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi controller"));
    let (wifi_controller, stack) =
        wifi::start_stack(radio_init, peripherals.WIFI, Rng::new(), &spawner);

    // Both climate sensors share the I2C bus.
    static I2C_BUS: StaticCell<
        Mutex<CriticalSectionRawMutex, esp_hal::i2c::master::I2c<'static, esp_hal::Async>>,
    > = StaticCell::new();
    let i2c_bus = I2C_BUS.init(Mutex::new(hardware::create_i2c_bus(
        peripherals.I2C0,
        peripherals.GPIO21,
        peripherals.GPIO22,
    )));
    let hygrometer = Sht40Sensor::new(SharedI2cDevice::new(i2c_bus));
    let barometer = Bme680Sensor::new(SharedI2cDevice::new(i2c_bus));

    // SD card on VSPI, chip select on GPIO5.
    let spi_bus = Spi::new(peripherals.SPI2, SpiConfig::default())
        .unwrap()
        .with_sck(peripherals.GPIO18)
        .with_miso(peripherals.GPIO19)
        .with_mosi(peripherals.GPIO23);
    let sd_cs = Output::new(peripherals.GPIO5, Level::High, OutputConfig::default());
    let sd_spi = ExclusiveDevice::new(spi_bus, sd_cs, embassy_time::Delay).unwrap();
    let sd_card = hardware::init_sd_card(sd_spi, embassy_time::Delay);

    let mut logger = ClimateLogger::new(
        ClimateSensors::new(hygrometer, barometer),
        DailyLogbook::new(SdVolume::new(sd_card, FatClock)),
        WallClock::new(CONFIG.time.utc_offset_secs, CONFIG.time.dst_offset_secs),
    );

    // Re-seed the wall clock from the state saved before deep sleep.
    let clock_carried = woke_from_sleep && CLOCK_SYNCED.load(Ordering::Relaxed);
    if clock_carried {
        let wake_unix = WAKE_UNIX_SECS.load(Ordering::Relaxed) as u64;
        logger.clock_mut().set_unix_time(wake_unix);
        info!("clock carried across deep sleep: {} unix", wake_unix);
    }

    // Sensors must come up before anything is read.
    loop {
        match logger.initialize_sensors().await {
            Ok(()) => break,
            Err(e) => {
                warn!("sensor init failed: {}", e);
                led.show(DeviceStatus::SensorFault);
                Timer::after(Duration::from_millis(INIT_RETRY_MS)).await;
            }
        }
    }

    if let Some(elevation_m) = CONFIG.logging.reference_elevation_m {
        match logger.calibrate_reference_elevation(elevation_m).await {
            Ok(()) => info!("altitude baseline calibrated to {} m", elevation_m),
            Err(e) => warn!("altitude calibration failed: {}", e),
        }
    }

    // Storage mount, clock sync (unless carried) and daily log selection.
    led.show(DeviceStatus::TimeSyncing);
    let mut time_source = NtpTimeSource::new(
        wifi_controller,
        stack,
        &CONFIG.network,
        CONFIG.time.ntp_server,
    );
    if let Err(e) = logger.initialize(&mut time_source, clock_carried).await {
        error!("initialization failed: {}", e);
        led.show(match e {
            LoggerError::Storage(_) => DeviceStatus::StorageFault,
            _ => DeviceStatus::SensorFault,
        });
        // Nothing to log without storage and time; back off and retry from
        // a clean boot.
        Timer::after(Duration::from_secs(10)).await;
        led.show(DeviceStatus::Sleeping);
        let mut rtc = Rtc::new(peripherals.LPWR);
        sleep::deep_sleep_for_seconds(&mut rtc, CONFIG.logging.sample_interval_secs as u64);
    }
    CLOCK_SYNCED.store(true, Ordering::Relaxed);
    led.show(DeviceStatus::Sampling);

    // Single-shot mode: one sample per wakeup, then park the processor.
    if CONFIG.logging.deep_sleep_minutes > 0 {
        match logger.record_sample().await {
            Ok(sample) => info!("logged {}", sample.timestamp),
            Err(e) => {
                error!("sample failed: {}", e);
                led.show(match e {
                    LoggerError::Sensor(_) => DeviceStatus::SensorFault,
                    _ => DeviceStatus::StorageFault,
                });
            }
        }

        let sleep_secs = CONFIG.logging.deep_sleep_minutes as u64 * 60;
        if let Ok(unix_now) = logger.clock().unix_now() {
            WAKE_UNIX_SECS.store((unix_now + sleep_secs) as u32, Ordering::Relaxed);
        }
        led.show(DeviceStatus::Sleeping);
        let mut rtc = Rtc::new(peripherals.LPWR);
        sleep::deep_sleep_for_minutes(&mut rtc, CONFIG.logging.deep_sleep_minutes as u64);
    }

    // Continuous mode: best-effort tick loop, errors never abort it.
    loop {
        match logger.record_sample().await {
            Ok(sample) => {
                info!(
                    "logged {}: {:.2} C, {:.2} %, {:.2} hPa",
                    sample.timestamp,
                    sample.temperature_c,
                    sample.humidity_pct,
                    sample.pressure_hpa
                );
                led.show(DeviceStatus::Sampling);
            }
            Err(e) => {
                error!("sample failed: {}", e);
                led.show(match e {
                    LoggerError::Sensor(_) => DeviceStatus::SensorFault,
                    _ => DeviceStatus::StorageFault,
                });
            }
        }
        Timer::after(Duration::from_secs(CONFIG.logging.sample_interval_secs as u64)).await;
    }
}
