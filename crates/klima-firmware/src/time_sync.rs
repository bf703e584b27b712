//! The firmware's [`TimeSyncSource`]: join WiFi, query SNTP once, radio off.

use embassy_net::Stack;
use esp_radio::wifi::WifiController;
use klima_core::config::NetworkConfig;
use klima_core::logger::TimeSyncSource;

use crate::sntp::{self, SntpError};
use crate::wifi::{self, WifiJoinError};

#[derive(Debug)]
pub enum TimeSyncError {
    Join(WifiJoinError),
    Sntp(SntpError),
}

pub struct NtpTimeSource<'a> {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    network: &'a NetworkConfig<'static>,
    server: &'a str,
}

impl<'a> NtpTimeSource<'a> {
    pub fn new(
        controller: WifiController<'static>,
        stack: Stack<'static>,
        network: &'a NetworkConfig<'static>,
        server: &'a str,
    ) -> Self {
        Self {
            controller,
            stack,
            network,
            server,
        }
    }
}

impl TimeSyncSource for NtpTimeSource<'_> {
    type Error = TimeSyncError;

    async fn sync(&mut self) -> Result<u64, TimeSyncError> {
        wifi::connect(
            &mut self.controller,
            &self.stack,
            self.network.ssid,
            self.network.password,
        )
        .await
        .map_err(TimeSyncError::Join)?;

        let result = sntp::sync(&self.stack, self.server).await;

        // Release the network even when the query failed.
        wifi::shutdown(&mut self.controller).await;

        result.map_err(TimeSyncError::Sntp)
    }
}
