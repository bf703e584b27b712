//! Minimal SNTP client: one UDP round trip to the configured server.

use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Timer};
use log::{info, warn};

/// SNTP port (UDP 123).
const SNTP_PORT: u16 = 123;

/// Response timeout per request.
const SNTP_TIMEOUT_MS: u64 = 5000;

/// Attempts against the server before giving up.
const SNTP_RETRY_COUNT: usize = 3;

/// Backoff between attempts.
const SNTP_RETRY_BACKOFF_MS: u64 = 2000;

/// Seconds between the NTP era origin (1900) and the unix epoch (1970).
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Highest acceptable stratum; 16 means unsynchronized.
const MAX_STRATUM: u8 = 3;

#[derive(Debug, Clone, Copy)]
pub enum SntpError {
    /// DNS resolution failed.
    Dns,
    /// Socket bind/send/receive failed.
    Network,
    /// No response within the timeout.
    Timeout,
    /// Response too short or from the wrong host.
    InvalidResponse,
    /// Server stratum invalid or too high.
    InvalidStratum,
    /// Every attempt failed.
    AllAttemptsFailed,
}

/// Query `server` for the current time, with bounded retries.
///
/// Returns UTC unix seconds.
pub async fn sync(stack: &Stack<'static>, server: &str) -> Result<u64, SntpError> {
    for attempt in 0..SNTP_RETRY_COUNT {
        match request(stack, server).await {
            Ok(unix_secs) => {
                info!("sntp: {} reports {} unix", server, unix_secs);
                return Ok(unix_secs);
            }
            Err(e) => {
                warn!("sntp: attempt {} failed: {:?}", attempt + 1, e);
                Timer::after(Duration::from_millis(SNTP_RETRY_BACKOFF_MS)).await;
            }
        }
    }
    Err(SntpError::AllAttemptsFailed)
}

/// Send one 48-byte SNTPv3 client request and parse the reply.
async fn request(stack: &Stack<'static>, server: &str) -> Result<u64, SntpError> {
    let server_ip = match stack
        .dns_query(server, DnsQueryType::A)
        .await
        .map_err(|_| SntpError::Dns)?
        .first()
    {
        Some(ip) => *ip,
        None => return Err(SntpError::Dns),
    };
    let server_endpoint = IpEndpoint::new(server_ip, SNTP_PORT);

    // NTP packets are 48 bytes; the buffers stay small.
    let mut rx_meta = [PacketMetadata::EMPTY; 2];
    let mut rx_buffer = [0u8; 64];
    let mut tx_meta = [PacketMetadata::EMPTY; 2];
    let mut tx_buffer = [0u8; 64];
    let mut socket = UdpSocket::new(
        *stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(0).map_err(|_| SntpError::Network)?;

    // LI=0, VN=3, Mode=3 (client).
    let mut ntp_packet = [0u8; 48];
    ntp_packet[0] = 0x1B;

    socket
        .send_to(&ntp_packet, server_endpoint)
        .await
        .map_err(|_| SntpError::Network)?;

    let mut response = [0u8; 48];
    let timeout_future = Timer::after(Duration::from_millis(SNTP_TIMEOUT_MS));
    let recv_future = socket.recv_from(&mut response);
    let (recv_len, from_addr) =
        match embassy_futures::select::select(timeout_future, recv_future).await {
            embassy_futures::select::Either::First(_) => return Err(SntpError::Timeout),
            embassy_futures::select::Either::Second(result) => {
                result.map_err(|_| SntpError::Network)?
            }
        };

    if recv_len < 48 || from_addr.endpoint.addr != server_ip {
        return Err(SntpError::InvalidResponse);
    }

    let stratum = response[1];
    if stratum == 0 || stratum > MAX_STRATUM {
        warn!("sntp: invalid stratum {} (max {})", stratum, MAX_STRATUM);
        return Err(SntpError::InvalidStratum);
    }

    // Transmit timestamp seconds, bytes 40..44.
    let ntp_secs =
        u32::from_be_bytes([response[40], response[41], response[42], response[43]]) as u64;
    if ntp_secs < NTP_UNIX_OFFSET {
        return Err(SntpError::InvalidResponse);
    }

    Ok(ntp_secs - NTP_UNIX_OFFSET)
}
