use crate::display::DisplayError;
use embedded_hal::spi::{Error as _, SpiDevice};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::SpidevDevice;
use tracing::info;

/// Largest single transfer handed to the bus; spidev rejects anything
/// bigger than its bufsiz (4096 on stock kernels).
pub const SPI_CHUNK_SIZE: usize = 4096;

pub const SPI_SPEED_HZ: u32 = 16_000_000;

/// Opens and configures a spidev node: mode 0, 16 MHz, 8 bits per word.
pub fn open_spidev(path: &str) -> Result<SpidevDevice, DisplayError> {
    let mut spi = SpidevDevice::open(path)?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(SPI_SPEED_HZ)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options)?;
    info!("spi open: {path} mode 0, {SPI_SPEED_HZ} Hz, 8 bpw");
    Ok(spi)
}

/// Byte transport over a SPI bus. One logical write is split into
/// back-to-back transfers of at most [`SPI_CHUNK_SIZE`] bytes; the first
/// failed chunk aborts the remainder, no retry.
#[derive(Debug)]
pub struct SpiTransport<SPI>
where
    SPI: SpiDevice,
{
    spi: SPI,
}

impl<SPI> SpiTransport<SPI>
where
    SPI: SpiDevice,
{
    pub fn new(spi: SPI) -> SpiTransport<SPI> {
        SpiTransport { spi }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        for chunk in bytes.chunks(SPI_CHUNK_SIZE) {
            self.spi
                .write(chunk)
                .map_err(|e| DisplayError::Transfer(e.kind()))?;
        }
        Ok(())
    }
}
