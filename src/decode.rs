//! Splitting a captured measurement stream into bursts and frames.
//!
//! A run's capture is one contiguous byte stream: `burst_count` bursts, each
//! holding one frame per channel group. The stream length is validated
//! against the active setup before any splitting; a mismatch means the
//! capture is truncated and nothing inside it can be trusted.
//!
//! A frame that fails validation is dropped and the rest of the burst is
//! still decoded. The run only fails when the dropped fraction exceeds the
//! configured threshold.
//!
//! The decoder consumes raw bytes. A capture that was carried around in its
//! rendered `0x..` token form converts back via
//! [`crate::response::bytes_from_hex_tokens`] first.

use crate::error::{EitError, Result};
use crate::frame::{MeasurementFrame, FRAME_LEN};
use crate::setup::MeasurementSetup;

/// Fraction of dropped frames tolerated across one decode run.
pub const DEFAULT_CORRUPTION_THRESHOLD: f64 = 0.10;

/// Decoder for one measurement run, parametrized by the active setup.
#[derive(Debug, Clone)]
pub struct BurstDecoder<'a> {
    setup: &'a MeasurementSetup,
    corruption_threshold: f64,
}

impl<'a> BurstDecoder<'a> {
    /// Decoder with the default corruption threshold.
    pub fn new(setup: &'a MeasurementSetup) -> Self {
        Self {
            setup,
            corruption_threshold: DEFAULT_CORRUPTION_THRESHOLD,
        }
    }

    /// Override the tolerated dropped-frame fraction.
    pub fn with_corruption_threshold(mut self, threshold: f64) -> Self {
        self.corruption_threshold = threshold;
        self
    }

    /// Stream length the active setup requires.
    pub fn expected_len(&self) -> usize {
        usize::from(self.setup.burst_count) * self.setup.channel_groups() * FRAME_LEN
    }

    /// Split a raw capture into bursts of decoded frames.
    ///
    /// Bursts keep stream order. Dropped frames leave gaps inside their
    /// burst; the assembler tolerates those as long as the run-wide drop
    /// fraction stays under the threshold.
    pub fn decode(&self, stream: &[u8]) -> Result<Vec<Vec<MeasurementFrame>>> {
        let groups = self.setup.channel_groups();
        let bursts = usize::from(self.setup.burst_count);
        let expected = self.expected_len();

        if stream.len() != expected {
            return Err(EitError::FramingLengthMismatch {
                actual: stream.len(),
                expected,
                bursts,
                frames: groups,
                frame_len: FRAME_LEN,
            });
        }

        let max_group = groups as u8;
        let total_frames = bursts * groups;
        let mut dropped = 0usize;

        let mut decoded = Vec::with_capacity(bursts);
        for (burst_idx, burst_bytes) in stream.chunks_exact(groups * FRAME_LEN).enumerate() {
            let mut frames = Vec::with_capacity(groups);
            for (frame_idx, frame_bytes) in burst_bytes.chunks_exact(FRAME_LEN).enumerate() {
                match MeasurementFrame::decode(frame_bytes, max_group) {
                    Ok(frame) => frames.push(frame),
                    Err(EitError::FrameCorruption(reason)) => {
                        dropped += 1;
                        tracing::warn!(
                            burst = burst_idx,
                            frame = frame_idx,
                            %reason,
                            "dropping corrupt frame"
                        );
                    }
                    Err(other) => return Err(other),
                }
            }
            decoded.push(frames);
        }

        let ratio = dropped as f64 / total_frames as f64;
        if ratio > self.corruption_threshold {
            return Err(EitError::ExcessiveFrameCorruption {
                dropped,
                total: total_frames,
                threshold: self.corruption_threshold,
            });
        }

        Ok(decoded)
    }
}
