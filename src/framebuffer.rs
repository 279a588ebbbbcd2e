//! Row-major RGB565 frame buffer and the big-endian wire serialization the
//! panel controller expects.

pub mod color {
    pub const BLACK: u16 = 0x0000;
    pub const WHITE: u16 = 0xFFFF;
    pub const GREEN: u16 = 0x07E0;
    pub const SKY_BLUE: u16 = 0x34BF;
    pub const GROUND_BROWN: u16 = 0x8A42;
}

/// Packs 8-bit channels into RGB565.
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> FrameBuffer {
        FrameBuffer {
            width,
            height,
            pixels: vec![color::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
    }

    /// Out-of-bounds coordinates are dropped silently.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u16) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.pixels[y as usize * self.width + x as usize] = color;
    }

    /// Serializes the buffer for the bus: each pixel as a big-endian 16-bit
    /// word, row-major. This is the only place pixel data becomes bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 2);
        for px in &self.pixels {
            out.extend_from_slice(&px.to_be_bytes());
        }
        out
    }
}
