//! Measurement data frame layout and decoding.
//!
//! During a run the device streams fixed-layout frames, one per channel
//! group per excitation:
//!
//! ```text
//! start_tag(1) | channel_group(1) | excitation(2) | frequency_row(2) |
//! timestamp_ms(4) | 16 x (re_f32 + im_f32) | end_tag(1)
//! ```
//!
//! All multi-byte fields are big-endian. A frame is valid when its start and
//! end tag match and its channel group lies inside the configured range.

use num_complex::Complex32;

use crate::error::{EitError, Result};
use crate::scalar::decode_f32;

/// Channels carried by one frame.
pub const FRAME_CHANNELS: usize = 16;

/// Excitation settings field width (`[ES_out, ES_in]`).
const EXCITATION_LEN: usize = 2;

/// Frequency-stack row field width.
const FREQUENCY_ROW_LEN: usize = 2;

/// Millisecond timestamp field width.
const TIMESTAMP_LEN: usize = 4;

/// Complex channel block width: 16 pairs of f32.
const CHANNEL_BLOCK_LEN: usize = FRAME_CHANNELS * 8;

/// Total length of one data frame in bytes.
pub const FRAME_LEN: usize =
    1 + 1 + EXCITATION_LEN + FREQUENCY_ROW_LEN + TIMESTAMP_LEN + CHANNEL_BLOCK_LEN + 1;

/// One decoded protocol record for a single channel group.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementFrame {
    /// Tag byte delimiting the frame (identical at start and end).
    pub tag: u8,
    /// Channel group, 1-based; group 1 covers electrodes 1-16.
    pub channel_group: u8,
    /// Excitation settings `[ES_out, ES_in]`.
    pub excitation: [u8; 2],
    /// Current row in the frequency stack.
    pub frequency_row: u16,
    /// Device timestamp in milliseconds.
    pub timestamp_ms: u32,
    /// Complex electrode readings, channel 1 first.
    pub channels: [Complex32; FRAME_CHANNELS],
}

impl MeasurementFrame {
    /// Decode a single frame.
    ///
    /// `max_group` is the number of channel groups in the active setup; a
    /// group outside `1..=max_group` is treated the same as a tag mismatch
    /// so the decoder can drop the frame and continue.
    pub fn decode(bytes: &[u8], max_group: u8) -> Result<Self> {
        if bytes.len() != FRAME_LEN {
            return Err(EitError::FramingLengthMismatch {
                actual: bytes.len(),
                expected: FRAME_LEN,
                bursts: 1,
                frames: 1,
                frame_len: FRAME_LEN,
            });
        }

        let start = bytes[0];
        let end = bytes[FRAME_LEN - 1];
        if start != end {
            return Err(EitError::FrameCorruption(format!(
                "tag mismatch: start {start:#04x}, end {end:#04x}"
            )));
        }

        let channel_group = bytes[1];
        if channel_group == 0 || channel_group > max_group {
            return Err(EitError::FrameCorruption(format!(
                "channel group {channel_group} outside 1..={max_group}"
            )));
        }

        let excitation = [bytes[2], bytes[3]];
        let frequency_row = u16::from_be_bytes([bytes[4], bytes[5]]);
        let timestamp_ms = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);

        let mut channels = [Complex32::new(0.0, 0.0); FRAME_CHANNELS];
        let mut offset = 10;
        for channel in &mut channels {
            let re = decode_f32([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
            let im = decode_f32([
                bytes[offset + 4],
                bytes[offset + 5],
                bytes[offset + 6],
                bytes[offset + 7],
            ]);
            *channel = Complex32::new(re, im);
            offset += 8;
        }

        Ok(Self {
            tag: start,
            channel_group,
            excitation,
            frequency_row,
            timestamp_ms,
            channels,
        })
    }
}
