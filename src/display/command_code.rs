use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    SwReset = 0x01,
    SleepOut = 0x11,
    DisplayOn = 0x29,
    CaSet = 0x2A,
    RaSet = 0x2B,
    RamWr = 0x2C,
    MadCtl = 0x36,
    ColMod = 0x3A,
}

// 16-bit RGB565 pixels
const COLMOD_DATA: [u8; 1] = [0x05];
// row/column order + RGB order for the mounted glass
const MADCTL_DATA: [u8; 1] = [0xC8];

impl CommandCode {
    pub fn cmd(self) -> u8 {
        self as u8
    }

    /// Fixed parameter bytes, where the command has any. Commands with
    /// caller-supplied parameters (CASET/RASET) or a trailing pixel stream
    /// (RAMWR) carry none here.
    pub fn data<'a>(&self) -> Option<&'a [u8]> {
        match self {
            CommandCode::ColMod => Some(&COLMOD_DATA),
            CommandCode::MadCtl => Some(&MADCTL_DATA),
            _ => None,
        }
    }

    /// Settle time the controller needs after the command.
    pub fn settle(&self) -> Option<Duration> {
        match self {
            CommandCode::SwReset | CommandCode::SleepOut => Some(Duration::from_millis(150)),
            CommandCode::DisplayOn => Some(Duration::from_millis(100)),
            _ => None,
        }
    }
}
