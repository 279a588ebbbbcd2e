pub mod command_code;

use crate::bus::{open_spidev, SpiTransport};
use crate::display::command_code::CommandCode;
use crate::framebuffer::{color, FrameBuffer};
use crate::port::{DigitalOutput, Level, LinePort};
use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::{SPIError, SpidevDevice};
use std::io;
use std::thread::sleep;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("spi transfer failed: {0:?}")]
    Transfer(embedded_hal::spi::ErrorKind),
    #[error(transparent)]
    Spi(#[from] SPIError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Gpio(#[from] gpio_cdev::Error),
    #[error("display handle is closed")]
    Closed,
    #[error("framebuffer is {got_w}x{got_h}, panel is {WIDTH}x{HEIGHT}")]
    BufferSize { got_w: usize, got_h: usize },
}

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 160;

// The glass is mounted offset from the controller's RAM origin.
const X_OFFSET: u16 = 2;
const Y_OFFSET: u16 = 1;

/// Hardware reset: hold the line low, release, let the controller settle.
pub fn reset_pulse(reset: &mut impl DigitalOutput) {
    reset.set(Level::Low);
    sleep(Duration::from_millis(20));
    reset.set(Level::High);
    sleep(Duration::from_millis(20));
}

/// ST7735S panel driver. Owns the bus and the data/command and reset lines;
/// every drawing operation re-issues the addressing window, the controller
/// keeps no window state between unrelated writes.
#[derive(Debug)]
pub struct St7735<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: DigitalOutput,
    RST: DigitalOutput,
{
    bus: Option<SpiTransport<SPI>>,
    dc: DC,
    reset: RST,
}

impl St7735<SpidevDevice, LinePort, LinePort> {
    /// Acquires both control lines, pulses reset, opens the spidev node and
    /// brings the controller up. Nothing is left half-open on failure: the
    /// bus handle drops on the error path.
    pub fn open(
        spi_path: &str,
        chip_path: &str,
        dc_line: u32,
        reset_line: u32,
    ) -> Result<St7735<SpidevDevice, LinePort, LinePort>, DisplayError> {
        let dc = LinePort::request(chip_path, dc_line, "navball-dc")?;
        let mut reset = LinePort::request(chip_path, reset_line, "navball-reset")?;
        reset_pulse(&mut reset);
        let spi = open_spidev(spi_path)?;
        St7735::new(spi, dc, reset)
    }
}

impl<SPI, DC, RST> St7735<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: DigitalOutput,
    RST: DigitalOutput,
{
    /// Plays the controller bring-up sequence and clears the panel to black.
    /// Assumes the panel has already been hardware-reset.
    pub fn new(spi: SPI, dc: DC, reset: RST) -> Result<St7735<SPI, DC, RST>, DisplayError> {
        let mut lcd = St7735 {
            bus: Some(SpiTransport::new(spi)),
            dc,
            reset,
        };
        info!("st7735s bring-up");
        let boot_sequence = [
            CommandCode::SwReset,
            CommandCode::SleepOut,
            CommandCode::ColMod,
            CommandCode::MadCtl,
            CommandCode::DisplayOn,
        ];
        for command in boot_sequence {
            lcd.send_command(command)?;
        }
        lcd.fill_screen(color::BLACK)?;
        Ok(lcd)
    }

    #[cfg(test)]
    fn from_parts(spi: SPI, dc: DC, reset: RST) -> St7735<SPI, DC, RST> {
        St7735 {
            bus: Some(SpiTransport::new(spi)),
            dc,
            reset,
        }
    }

    /// Releases the bus handle. Idempotent; drawing on a closed handle
    /// returns [`DisplayError::Closed`].
    pub fn close(&mut self) {
        self.bus = None;
    }

    fn bus(&mut self) -> Result<&mut SpiTransport<SPI>, DisplayError> {
        self.bus.as_mut().ok_or(DisplayError::Closed)
    }

    fn send_command(&mut self, command: CommandCode) -> Result<(), DisplayError> {
        self.dc.set(Level::Low);
        self.bus()?.write(&[command.cmd()])?;
        if let Some(data) = command.data() {
            self.dc.set(Level::High);
            self.bus()?.write(data)?;
        }
        if let Some(settle) = command.settle() {
            sleep(settle);
        }
        Ok(())
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.dc.set(Level::High);
        self.bus()?.write(data)
    }

    /// CASET + RASET with big-endian start/end pairs (panel mounting offsets
    /// applied), then RAMWR priming the controller for exactly
    /// `(x1-x0+1)*(y1-y0+1)` pixels of data.
    pub fn set_addr_window(
        &mut self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), DisplayError> {
        let (cx0, cx1) = (x0 + X_OFFSET, x1 + X_OFFSET);
        let (ry0, ry1) = (y0 + Y_OFFSET, y1 + Y_OFFSET);
        self.send_command(CommandCode::CaSet)?;
        self.send_data(&[(cx0 >> 8) as u8, cx0 as u8, (cx1 >> 8) as u8, cx1 as u8])?;
        self.send_command(CommandCode::RaSet)?;
        self.send_data(&[(ry0 >> 8) as u8, ry0 as u8, (ry1 >> 8) as u8, ry1 as u8])?;
        self.send_command(CommandCode::RamWr)
    }

    /// Coordinates off the panel are dropped silently; the line and circle
    /// rasterizers rely on that for clipping.
    pub fn write_pixel(&mut self, x: i32, y: i32, color: u16) -> Result<(), DisplayError> {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return Ok(());
        }
        self.set_addr_window(x as u16, y as u16, x as u16, y as u16)?;
        self.send_data(&color.to_be_bytes())
    }

    pub fn fill_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: u16,
    ) -> Result<(), DisplayError> {
        if w <= 0 || h <= 0 {
            return Ok(());
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w - 1).min(WIDTH as i32 - 1);
        let y1 = y.saturating_add(h - 1).min(HEIGHT as i32 - 1);
        if x1 < x0 || y1 < y0 {
            return Ok(());
        }
        self.set_addr_window(x0 as u16, y0 as u16, x1 as u16, y1 as u16)?;
        let pixels = ((x1 - x0 + 1) * (y1 - y0 + 1)) as usize;
        let be = color.to_be_bytes();
        let mut run = Vec::with_capacity(pixels * 2);
        for _ in 0..pixels {
            run.extend_from_slice(&be);
        }
        self.send_data(&run)
    }

    pub fn fill_screen(&mut self, color: u16) -> Result<(), DisplayError> {
        self.fill_rect(0, 0, WIDTH as i32, HEIGHT as i32, color)
    }

    /// A negative length draws in the opposite direction from the origin.
    pub fn draw_hline(&mut self, x: i32, y: i32, len: i32, color: u16) -> Result<(), DisplayError> {
        let (x, len) = if len < 0 { (x + len + 1, -len) } else { (x, len) };
        self.fill_rect(x, y, len, 1, color)
    }

    pub fn draw_vline(&mut self, x: i32, y: i32, len: i32, color: u16) -> Result<(), DisplayError> {
        let (y, len) = if len < 0 { (y + len + 1, -len) } else { (y, len) };
        self.fill_rect(x, y, 1, len, color)
    }

    /// Integer Bresenham.
    pub fn draw_line(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: u16,
    ) -> Result<(), DisplayError> {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        loop {
            self.write_pixel(x, y, color)?;
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        Ok(())
    }

    /// Midpoint circle, 8-way symmetric. Each point goes out as its own
    /// window + pixel write; no batching assumption for this primitive.
    pub fn draw_circle(
        &mut self,
        cx: i32,
        cy: i32,
        radius: i32,
        color: u16,
    ) -> Result<(), DisplayError> {
        if radius < 0 {
            return Ok(());
        }
        let mut x = 0;
        let mut y = radius;
        let mut d = 3 - 2 * radius;
        while x <= y {
            for (px, py) in [
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx + x, cy - y),
                (cx - x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx + y, cy - x),
                (cx - y, cy - x),
            ] {
                self.write_pixel(px, py, color)?;
            }
            if d < 0 {
                d += 4 * x + 6;
            } else {
                d += 4 * (x - y) + 10;
                y -= 1;
            }
            x += 1;
        }
        Ok(())
    }

    /// Streams a full frame as one chunked transfer, no per-pixel
    /// addressing overhead.
    pub fn push_framebuffer(&mut self, frame: &FrameBuffer) -> Result<(), DisplayError> {
        if frame.width() != WIDTH || frame.height() != HEIGHT {
            return Err(DisplayError::BufferSize {
                got_w: frame.width(),
                got_h: frame.height(),
            });
        }
        self.set_addr_window(0, 0, WIDTH as u16 - 1, HEIGHT as u16 - 1)?;
        self.send_data(&frame.to_be_bytes())
    }
}

impl<SPI, DC, RST> Drop for St7735<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: DigitalOutput,
    RST: DigitalOutput,
{
    fn drop(&mut self) {
        self.dc.set(Level::Low);
        self.reset.set(Level::Low);
    }
}
