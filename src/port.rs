use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Level {
    Low = 0x00,
    High = 0x01,
}

impl From<Level> for u8 {
    fn from(value: Level) -> Self {
        value as u8
    }
}

/// A digital output line. Setting a level never fails at this surface;
/// implementations log the failure and carry on.
pub trait DigitalOutput {
    fn set(&mut self, level: Level);
}

/// One output line on a gpiochip character device, held for process lifetime.
#[derive(Debug)]
pub struct LinePort {
    handle: LineHandle,
    offset: u32,
}

impl LinePort {
    /// Requests `offset` on `chip_path` as an output, driven low.
    /// Acquisition failure is the caller's problem; it is fatal to the unit
    /// that needed the line.
    pub fn request<P: AsRef<Path>>(
        chip_path: P,
        offset: u32,
        consumer: &str,
    ) -> Result<LinePort, gpio_cdev::Error> {
        let mut chip = Chip::new(chip_path)?;
        let handle = chip
            .get_line(offset)?
            .request(LineRequestFlags::OUTPUT, Level::Low.into(), consumer)?;
        debug!("requested gpio line {offset} as {consumer}");
        Ok(LinePort { handle, offset })
    }
}

impl DigitalOutput for LinePort {
    fn set(&mut self, level: Level) {
        if let Err(e) = self.handle.set_value(level.into()) {
            warn!("gpio line {} set failed: {e}", self.offset);
        }
    }
}
