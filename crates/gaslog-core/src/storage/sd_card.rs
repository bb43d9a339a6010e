use embedded_sdmmc::{
    BlockDevice, Mode, RawDirectory, RawFile, RawVolume, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};
use log::{error, info, warn};

use super::{LogStorage, LogStream, StorageError};

const MAX_DIRS: usize = 4;
const MAX_FILES: usize = 4;
const MAX_VOLUMES: usize = 1;

pub type SdVolumeManager<D, T> = VolumeManager<D, T, MAX_DIRS, MAX_FILES, MAX_VOLUMES>;

/// The logger has no RTC; file timestamps are pinned to a fixed date and the
/// CSV rows carry elapsed milliseconds instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 54,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// Log storage on the first FAT volume of an SD card.
///
/// These operations are blocking (as are the display operations on the same
/// SPI bus). Each open log holds one volume, one directory and one file
/// handle for as long as the session is active. The handles are kept raw and
/// driven through the shared `VolumeManager`, so the stream does not borrow
/// from a local volume.
pub struct SdCardStorage<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: &'a SdVolumeManager<D, T>,
}

impl<'a, D, T> SdCardStorage<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    pub fn new(volume_mgr: &'a SdVolumeManager<D, T>) -> Self {
        Self { volume_mgr }
    }
}

impl<'a, D, T> LogStorage for SdCardStorage<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    type Stream = SdLogFile<'a, D, T>;

    fn mount(&mut self) -> Result<(), StorageError> {
        let volume = self
            .volume_mgr
            .open_raw_volume(VolumeIdx(0))
            .map_err(|e| {
                error!("SD card volume unavailable: {:?}", e);
                StorageError::MountFailed {
                    details: "no readable FAT volume",
                }
            })?;

        self.volume_mgr.close_volume(volume).map_err(|e| {
            error!("SD card volume close failed: {:?}", e);
            StorageError::MountFailed {
                details: "volume close failed",
            }
        })?;

        info!("SD card mounted");
        Ok(())
    }

    fn open_append(&mut self, path: &str) -> Result<SdLogFile<'a, D, T>, StorageError> {
        let volume_mgr = self.volume_mgr;

        let volume = volume_mgr.open_raw_volume(VolumeIdx(0)).map_err(|e| {
            error!("Failed to open volume for {}: {:?}", path, e);
            StorageError::OpenFailed {
                details: "volume unavailable",
            }
        })?;

        let dir = match volume_mgr.open_root_dir(volume) {
            Ok(dir) => dir,
            Err(e) => {
                error!("Failed to open root directory: {:?}", e);
                release_volume(volume_mgr, volume);
                return Err(StorageError::OpenFailed {
                    details: "root directory unavailable",
                });
            }
        };

        let file = match volume_mgr.open_file_in_dir(dir, path, Mode::ReadWriteCreateOrAppend) {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to open {} for append: {:?}", path, e);
                release_dir(volume_mgr, dir);
                release_volume(volume_mgr, volume);
                return Err(StorageError::OpenFailed {
                    details: "file could not be opened for append",
                });
            }
        };

        info!("Opened {} for append", path);

        Ok(SdLogFile {
            volume_mgr,
            file,
            dir,
            volume,
        })
    }
}

fn release_dir<D, T>(volume_mgr: &SdVolumeManager<D, T>, dir: RawDirectory)
where
    D: BlockDevice,
    T: TimeSource,
{
    if let Err(e) = volume_mgr.close_dir(dir) {
        warn!("SD card directory close failed: {:?}", e);
    }
}

fn release_volume<D, T>(volume_mgr: &SdVolumeManager<D, T>, volume: RawVolume)
where
    D: BlockDevice,
    T: TimeSource,
{
    if let Err(e) = volume_mgr.close_volume(volume) {
        warn!("SD card volume close failed: {:?}", e);
    }
}

/// Open log file on the SD card
pub struct SdLogFile<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: &'a SdVolumeManager<D, T>,
    file: RawFile,
    dir: RawDirectory,
    volume: RawVolume,
}

impl<D, T> LogStream for SdLogFile<'_, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    fn write_line(&mut self, line: &str) -> Result<(), StorageError> {
        self.volume_mgr
            .write(self.file, line.as_bytes())
            .and_then(|()| self.volume_mgr.write(self.file, b"\n"))
            .map_err(|e| {
                error!("SD card write failed: {:?}", e);
                StorageError::WriteFailed {
                    details: "block device error",
                }
            })
    }

    fn close(self) -> Result<(), StorageError> {
        // Closing the file writes back its directory entry and size. The
        // directory and volume are released even if that fails.
        let file_closed = self.volume_mgr.close_file(self.file).map_err(|e| {
            error!("SD card file close failed: {:?}", e);
            StorageError::CloseFailed {
                details: "file close failed",
            }
        });

        release_dir(self.volume_mgr, self.dir);
        release_volume(self.volume_mgr, self.volume);

        file_closed
    }
}
