pub mod bus;
pub mod display;
pub mod framebuffer;
pub mod port;
pub mod render;
pub mod store;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod mock;

pub use display::{DisplayError, St7735, HEIGHT, WIDTH};
pub use framebuffer::FrameBuffer;
pub use render::NavballRenderer;
pub use store::AttitudeStore;
pub use telemetry::{AttitudeSample, FieldWidth, FrameDecoder};
