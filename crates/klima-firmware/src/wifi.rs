//! One-shot WiFi station management.
//!
//! The network exists only to synchronize the clock: join, let the caller
//! run its query, then stop the radio to conserve power. There is no
//! reconnect task.

use embassy_executor::Spawner;
use embassy_net::{DhcpConfig, Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use esp_hal::rng::Rng;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiError};
use log::{info, warn};
use static_cell::StaticCell;

const STACK_RESOURCES_SIZE: usize = 4;

/// Fixed poll interval while waiting for association.
const JOIN_POLL_MS: u64 = 500;

/// Upper bound on association attempts before reporting a join timeout.
const MAX_JOIN_ATTEMPTS: u32 = 60;

#[derive(Debug)]
pub enum WifiJoinError {
    Controller(WifiError),
    JoinTimeout,
}

impl From<WifiError> for WifiJoinError {
    fn from(e: WifiError) -> Self {
        Self::Controller(e)
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Create the WiFi controller and network stack and spawn the net runner.
/// The radio stays stopped until [`connect`] is called.
pub fn start_stack(
    radio_init: &'static esp_radio::Controller<'static>,
    wifi: esp_hal::peripherals::WIFI<'static>,
    rng: Rng,
    spawner: &Spawner,
) -> (WifiController<'static>, Stack<'static>) {
    let (controller, interfaces) = esp_radio::wifi::new(radio_init, wifi, Default::default())
        .expect("Failed to initialize Wi-Fi controller");

    let net_seed = rng.random() as u64 | ((rng.random() as u64) << 32);

    static RESOURCES: StaticCell<StackResources<STACK_RESOURCES_SIZE>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(DhcpConfig::default()),
        RESOURCES.init(StackResources::new()),
        net_seed,
    );

    spawner.spawn(net_task(runner)).ok();

    (controller, stack)
}

/// Join the configured network, polling at a fixed backoff until association
/// succeeds and a DHCP lease arrives.
pub async fn connect(
    controller: &mut WifiController<'static>,
    stack: &Stack<'static>,
    ssid: &str,
    password: &str,
) -> Result<(), WifiJoinError> {
    let mut client_config = ClientConfig::default().with_ssid(ssid.into());
    if !password.is_empty() {
        client_config = client_config.with_password(password.into());
    }
    controller.set_config(&ModeConfig::Client(client_config))?;

    info!("wifi: joining {}", ssid);
    controller.start_async().await?;

    let mut attempts = 0;
    while let Err(e) = controller.connect_async().await {
        attempts += 1;
        if attempts >= MAX_JOIN_ATTEMPTS {
            warn!("wifi: giving up after {} attempts", attempts);
            return Err(WifiJoinError::JoinTimeout);
        }
        warn!("wifi: association failed ({:?}), retrying", e);
        Timer::after(Duration::from_millis(JOIN_POLL_MS)).await;
    }

    info!("wifi: associated, waiting for DHCP");
    stack.wait_link_up().await;
    stack.wait_config_up().await;

    if let Some(config) = stack.config_v4() {
        info!("wifi: got IP {}", config.address);
    }

    Ok(())
}

/// Release the network; the clock keeps running without it.
pub async fn shutdown(controller: &mut WifiController<'static>) {
    if let Err(e) = controller.stop_async().await {
        warn!("wifi: radio stop failed: {:?}", e);
    } else {
        info!("wifi: radio stopped");
    }
}
