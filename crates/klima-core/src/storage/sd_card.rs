use embedded_sdmmc::{Mode, SdCard, SdCardError, TimeSource, Timestamp, VolumeIdx, VolumeManager};
use log::info;

use super::LogVolume;

/// Fixed FAT timestamp source.
///
/// FAT mtimes are metadata only; the log's time contract lives in the CSV
/// rows themselves, stamped by the wall clock.
#[derive(Default)]
pub struct FatClock;

impl TimeSource for FatClock {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 52,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// SD card SPI operations are blocking, as are all other users of the bus in
/// this firmware, so the volume is claimed exclusively for the duration of
/// each call and released before the next one begins.
///
/// Every operation opens volume, root directory and file and explicitly
/// closes all three; an early error return releases them through RAII.
pub struct SdVolume<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdVolume<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(sd_card, ts),
        }
    }
}

impl<S, D, T> LogVolume for SdVolume<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    type Error = embedded_sdmmc::Error<SdCardError>;

    /// Probes the card by opening the first FAT volume. Fails when the card
    /// is absent, unformatted or unreadable.
    fn mount(&mut self) -> Result<(), Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        volume0.close()?;
        info!("SD card volume 0 opened");
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let found = match root_dir.find_directory_entry(name) {
            Ok(_) => true,
            Err(embedded_sdmmc::Error::NotFound) => false,
            Err(e) => return Err(e),
        };

        root_dir.close()?;
        volume0.close()?;

        Ok(found)
    }

    fn create(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let file = root_dir.open_file_in_dir(name, Mode::ReadWriteCreateOrTruncate)?;
        file.write(contents)?;

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let file = root_dir.open_file_in_dir(name, Mode::ReadWriteCreateOrAppend)?;
        file.write(data)?;

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }

    fn read_chunk(&mut self, name: &str, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let file = root_dir.open_file_in_dir(name, Mode::ReadOnly)?;
        if offset > 0 {
            file.seek_from_start(offset)?;
        }
        let mut read = 0;
        while read < buf.len() {
            let n = file.read(&mut buf[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(read)
    }

    fn delete(&mut self, name: &str) -> Result<(), Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        root_dir.delete_file_in_dir(name)?;

        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }

    fn list(&mut self, visit: &mut dyn FnMut(&str, u32)) -> Result<(), Self::Error> {
        use core::fmt::Write as _;

        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        root_dir.iterate_dir(|entry| {
            if entry.attributes.is_directory() {
                return;
            }
            // 8.3 names fit comfortably.
            let mut name = heapless::String::<16>::new();
            let _ = write!(name, "{}", entry.name);
            visit(&name, entry.size);
        })?;

        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }
}
