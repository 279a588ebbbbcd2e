//! The render path: latest sample in, full frame out to the panel, as fast
//! as the renderer and the bus allow.

use crate::display::{DisplayError, St7735};
use crate::framebuffer::FrameBuffer;
use crate::port::DigitalOutput;
use crate::store::AttitudeStore;
use embedded_hal::spi::SpiDevice;
use tracing::warn;

/// The navball renderer proper. A pure function of the three angles; the
/// returned buffer must match the panel's dimensions.
pub trait NavballRenderer {
    fn render(&mut self, pitch: i32, roll: i32, yaw: i32) -> &FrameBuffer;
}

/// One read → render → blit step.
pub fn cycle<SPI, DC, RST, R>(
    store: &AttitudeStore,
    renderer: &mut R,
    display: &mut St7735<SPI, DC, RST>,
) -> Result<(), DisplayError>
where
    SPI: SpiDevice,
    DC: DigitalOutput,
    RST: DigitalOutput,
    R: NavballRenderer,
{
    let sample = store.read();
    let frame = renderer.render(sample.pitch, sample.roll, sample.yaw);
    display.push_framebuffer(frame)
}

/// Runs indefinitely. A failed transfer loses that frame and is logged; the
/// display handle stays valid for the next cycle. No frame-rate limiting.
pub fn run<SPI, DC, RST, R>(
    store: &AttitudeStore,
    renderer: &mut R,
    display: &mut St7735<SPI, DC, RST>,
) -> !
where
    SPI: SpiDevice,
    DC: DigitalOutput,
    RST: DigitalOutput,
    R: NavballRenderer,
{
    loop {
        if let Err(e) = cycle(store, renderer, display) {
            warn!("frame push failed: {e}");
        }
    }
}
