//! Framing and validation of the attitude stream: one sync byte, three
//! little-endian signed angle fields, one additive checksum byte.

use crate::store::AttitudeStore;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, ErrorKind, Read};
use std::time::Duration;
use tracing::{debug, warn};

pub const SYNC_BYTE: u8 = 0xAA;

const MAX_FRAME_LEN: usize = 14;

/// One validated attitude reading. Angle unit is whatever the sender uses
/// (degrees, centidegrees, raw device units); the decoder does not care.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AttitudeSample {
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
}

/// Payload encoding, fixed when the decoder is built.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldWidth {
    /// Three 16-bit fields, 8-byte frame.
    Narrow,
    /// Three 32-bit fields, 14-byte frame.
    Wide,
}

impl FieldWidth {
    pub fn frame_len(self) -> usize {
        1 + self.payload_len() + 1
    }

    fn payload_len(self) -> usize {
        match self {
            FieldWidth::Narrow => 6,
            FieldWidth::Wide => 12,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    AwaitingSync,
    Collecting,
}

/// Byte-at-a-time framing state machine. Non-sentinel bytes are dropped one
/// at a time while hunting for sync; once collecting, a sentinel inside the
/// payload is ordinary payload — there is no mid-frame resynchronization, so
/// a dropped byte upstream costs at most one frame length before the decoder
/// self-corrects.
#[derive(Debug)]
pub struct FrameDecoder {
    width: FieldWidth,
    state: State,
    buf: [u8; MAX_FRAME_LEN],
    idx: usize,
    bad_frames: u64,
}

impl FrameDecoder {
    pub fn new(width: FieldWidth) -> FrameDecoder {
        FrameDecoder {
            width,
            state: State::AwaitingSync,
            buf: [0; MAX_FRAME_LEN],
            idx: 0,
            bad_frames: 0,
        }
    }

    /// Frames dropped on checksum mismatch since construction.
    pub fn bad_frames(&self) -> u64 {
        self.bad_frames
    }

    pub fn push_byte(&mut self, byte: u8) -> Option<AttitudeSample> {
        match self.state {
            State::AwaitingSync => {
                if byte == SYNC_BYTE {
                    self.buf[0] = byte;
                    self.idx = 1;
                    self.state = State::Collecting;
                }
                None
            }
            State::Collecting => {
                self.buf[self.idx] = byte;
                self.idx += 1;
                if self.idx < self.width.frame_len() {
                    return None;
                }
                self.state = State::AwaitingSync;
                self.validate()
            }
        }
    }

    fn validate(&mut self) -> Option<AttitudeSample> {
        let payload = &self.buf[1..1 + self.width.payload_len()];
        let expected = payload.iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
        let received = self.buf[self.width.frame_len() - 1];
        if expected != received {
            self.bad_frames += 1;
            warn!(
                "telemetry frame dropped: checksum {received:#04x} != {expected:#04x} \
                 ({} dropped so far)",
                self.bad_frames
            );
            return None;
        }
        let mut fields = [0i32; 3];
        match self.width {
            FieldWidth::Narrow => {
                for (i, pair) in payload.chunks_exact(2).enumerate() {
                    fields[i] = i16::from_le_bytes([pair[0], pair[1]]) as i32;
                }
            }
            FieldWidth::Wide => {
                for (i, quad) in payload.chunks_exact(4).enumerate() {
                    fields[i] = i32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                }
            }
        }
        Some(AttitudeSample {
            pitch: fields[0],
            roll: fields[1],
            yaw: fields[2],
        })
    }
}

/// Opens the telemetry serial port raw: 8 data bits, no parity, no flow
/// control, short read timeout so a silent sender keeps the loop honest.
pub fn open_serial(path: &str, baud: u32) -> serialport::Result<Box<dyn SerialPort>> {
    serialport::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(100))
        .open()
}

/// Blocking ingest loop: one byte per read, one decode step per byte, every
/// validated sample published to the store. Read timeouts keep looping; EOF
/// ends the loop; any other read error is fatal to the caller's thread.
pub fn run_ingest<R: Read>(
    mut reader: R,
    mut decoder: FrameDecoder,
    store: &AttitudeStore,
) -> io::Result<()> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                debug!("telemetry stream ended");
                return Ok(());
            }
            Ok(_) => {
                if let Some(sample) = decoder.push_byte(byte[0]) {
                    store.publish(sample);
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn narrow_frame(pitch: i16, roll: i16, yaw: i16) -> Vec<u8> {
        let mut frame = vec![SYNC_BYTE];
        frame.extend_from_slice(&pitch.to_le_bytes());
        frame.extend_from_slice(&roll.to_le_bytes());
        frame.extend_from_slice(&yaw.to_le_bytes());
        let sum = frame[1..].iter().fold(0u8, |a, b| a.wrapping_add(*b));
        frame.push(sum);
        frame
    }

    fn feed(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<AttitudeSample> {
        bytes.iter().filter_map(|b| decoder.push_byte(*b)).collect()
    }

    #[test]
    fn decodes_reference_narrow_frame() {
        // pitch=300, roll=0, yaw=1000, little-endian
        let frame = [0xAA, 0x2C, 0x01, 0x00, 0x00, 0xE8, 0x03, 0x18];
        let mut decoder = FrameDecoder::new(FieldWidth::Narrow);
        let samples = feed(&mut decoder, &frame);
        assert_eq!(
            samples,
            vec![AttitudeSample {
                pitch: 300,
                roll: 0,
                yaw: 1000
            }]
        );
    }

    #[test]
    fn garbage_before_sync_is_dropped() {
        let mut bytes = vec![0x00, 0xFF, 0x13, 0x37];
        bytes.extend(narrow_frame(-45, 90, 180));
        let mut decoder = FrameDecoder::new(FieldWidth::Narrow);
        let samples = feed(&mut decoder, &bytes);
        assert_eq!(
            samples,
            vec![AttitudeSample {
                pitch: -45,
                roll: 90,
                yaw: 180
            }]
        );
    }

    #[test]
    fn checksum_mismatch_drops_frame_and_rearms() {
        let mut frame = narrow_frame(1, 2, 3);
        *frame.last_mut().unwrap() ^= 0xFF;
        let mut decoder = FrameDecoder::new(FieldWidth::Narrow);
        assert!(feed(&mut decoder, &frame).is_empty());
        assert_eq!(decoder.bad_frames(), 1);
        // next valid frame decodes normally
        let samples = feed(&mut decoder, &narrow_frame(4, 5, 6));
        assert_eq!(
            samples,
            vec![AttitudeSample {
                pitch: 4,
                roll: 5,
                yaw: 6
            }]
        );
    }

    #[test]
    fn back_to_back_frames_all_decode_in_order() {
        let mut bytes = Vec::new();
        for n in 0..5i16 {
            bytes.extend(narrow_frame(n, n + 1, n + 2));
        }
        let mut decoder = FrameDecoder::new(FieldWidth::Narrow);
        let samples = feed(&mut decoder, &bytes);
        assert_eq!(samples.len(), 5);
        for (n, sample) in samples.iter().enumerate() {
            assert_eq!(sample.pitch, n as i32);
        }
    }

    #[test]
    fn sentinel_inside_payload_is_ordinary_payload() {
        // -86 = 0xAA 0xFF little-endian: sentinel value as a payload byte
        let frame = narrow_frame(-86, -86, -86);
        assert_eq!(frame.iter().filter(|&&b| b == SYNC_BYTE).count(), 4);
        let mut decoder = FrameDecoder::new(FieldWidth::Narrow);
        let samples = feed(&mut decoder, &frame);
        assert_eq!(
            samples,
            vec![AttitudeSample {
                pitch: -86,
                roll: -86,
                yaw: -86
            }]
        );
    }

    #[test]
    fn wide_frames_carry_32_bit_fields() {
        let mut frame = vec![SYNC_BYTE];
        for v in [300_000i32, -2, 1_000_000] {
            frame.extend_from_slice(&v.to_le_bytes());
        }
        let sum = frame[1..].iter().fold(0u8, |a, b| a.wrapping_add(*b));
        frame.push(sum);
        assert_eq!(frame.len(), FieldWidth::Wide.frame_len());
        let mut decoder = FrameDecoder::new(FieldWidth::Wide);
        let samples = feed(&mut decoder, &frame);
        assert_eq!(
            samples,
            vec![AttitudeSample {
                pitch: 300_000,
                roll: -2,
                yaw: 1_000_000
            }]
        );
    }

    #[test]
    fn ingest_publishes_latest_sample() {
        let mut bytes = narrow_frame(10, 20, 30);
        bytes.extend(narrow_frame(11, 21, 31));
        let store = AttitudeStore::new();
        let decoder = FrameDecoder::new(FieldWidth::Narrow);
        run_ingest(Cursor::new(bytes), decoder, &store).unwrap();
        assert_eq!(
            store.read(),
            AttitudeSample {
                pitch: 11,
                roll: 21,
                yaw: 31
            }
        );
    }
}
