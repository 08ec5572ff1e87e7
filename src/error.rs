//! Custom error types for the driver.
//!
//! This module defines the primary error type, [`EitError`], for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures that can occur,
//! from transport I/O to protocol framing and measurement-stream decoding.
//!
//! ## Propagation policy
//!
//! Protocol and framing errors are returned to the caller as typed results.
//! Only transport errors are fatal to the whole session. Two conditions are
//! deliberately *not* errors:
//!
//! - An unknown status byte after the message marker is reported as data
//!   (see [`crate::response::ResolvedStatus::Unknown`]).
//! - An out-of-range excitation amplitude is clamped with a warning (see
//!   [`crate::setup::MeasurementSetup::clamped_amplitude`]).

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, EitError>;

/// Error type for ScioSpec EIT protocol and decoding failures.
#[derive(Error, Debug)]
pub enum EitError {
    /// I/O failure on the underlying transport. Fatal for the session.
    #[error("transport I/O error: {0}")]
    Transport(#[from] std::io::Error),

    /// Command payload does not fit the single-byte length field.
    #[error("command payload of {len} bytes does not fit the one-byte length field")]
    PayloadTooLarge {
        /// Offending payload length in bytes.
        len: usize,
    },

    /// Measurement stream length disagrees with the active setup. The
    /// capture is truncated or misaligned; nothing can be recovered.
    #[error(
        "measurement stream is {actual} bytes, expected {expected} \
         ({bursts} bursts x {frames} frames x {frame_len} bytes)"
    )]
    FramingLengthMismatch {
        /// Bytes actually captured.
        actual: usize,
        /// Bytes required by the setup.
        expected: usize,
        /// Configured burst count.
        bursts: usize,
        /// Frames per burst.
        frames: usize,
        /// Length of one data frame.
        frame_len: usize,
    },

    /// A single data frame failed validation. Recovered by dropping the
    /// frame; counted toward the corruption ratio.
    #[error("corrupt data frame: {0}")]
    FrameCorruption(String),

    /// Too many frames were dropped across the decode run.
    #[error(
        "{dropped} of {total} frames dropped, above the allowed fraction {threshold}"
    )]
    ExcessiveFrameCorruption {
        /// Frames dropped across the run.
        dropped: usize,
        /// Total frames in the run.
        total: usize,
        /// Configured drop-fraction threshold.
        threshold: f64,
    },

    /// A burst produced the wrong number of excitation rounds. Fatal for
    /// that burst only; sibling bursts are unaffected.
    #[error("burst {burst} produced {rounds} excitation rounds, expected {expected}")]
    IncompleteBurst {
        /// Index of the offending burst in the run.
        burst: usize,
        /// Excitation rounds observed.
        rounds: usize,
        /// Excitation rounds required.
        expected: usize,
    },

    /// A rendered hex token could not be mapped back to a byte.
    #[error("malformed hex token {0:?} in rendered capture")]
    MalformedHexToken(String),

    /// Semantically invalid measurement setup (bad electrode count, gain or
    /// ADC range outside the device tables).
    #[error("invalid measurement setup: {0}")]
    InvalidSetup(String),
}
