//! Measurement setup parameters.
//!
//! [`MeasurementSetup`] carries everything the device needs to run a
//! measurement and everything the decoding pipeline needs to know the
//! expected stream shape. It is created by the caller, validated once, and
//! treated as read-only after it has been transmitted to the device.

use serde::{Deserialize, Serialize};

use crate::error::{EitError, Result};

/// Electrode counts supported by the device family.
pub const SUPPORTED_ELECTRODE_COUNTS: [u16; 5] = [16, 32, 48, 64, 128];

/// Electrodes measured together in one channel group.
pub const CHANNELS_PER_GROUP: u16 = 16;

/// Maximum excitation amplitude in ampere accepted by the front end.
pub const MAX_AMPLITUDE_A: f64 = 0.01;

/// Configuration of one EIT measurement run.
///
/// Immutable once transmitted: the same value that configured the device
/// must be handed to the decoder, otherwise the stream shape checks are
/// meaningless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSetup {
    /// Number of measurement bursts between start and stop.
    pub burst_count: u16,
    /// Total electrode count; one of [`SUPPORTED_ELECTRODE_COUNTS`].
    pub n_el: u16,
    /// Excitation frequency in Hz.
    pub exc_freq: f32,
    /// Frame rate in Hz.
    pub framerate: f32,
    /// Excitation current amplitude in A; at most [`MAX_AMPLITUDE_A`].
    pub amplitude: f64,
    /// Electrodes skipped between injection and ground electrode.
    pub inj_skip: u16,
    /// Amplifier gain; one of 1, 10, 100, 1000.
    pub gain: u16,
    /// ADC range in volt; one of 1, 5, 10 (symmetric).
    pub adc_range: u8,
}

impl MeasurementSetup {
    /// Check the setup against the device parameter tables.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_ELECTRODE_COUNTS.contains(&self.n_el) {
            return Err(EitError::InvalidSetup(format!(
                "unsupported electrode count {}, expected one of {:?}",
                self.n_el, SUPPORTED_ELECTRODE_COUNTS
            )));
        }
        if ![1, 10, 100, 1000].contains(&self.gain) {
            return Err(EitError::InvalidSetup(format!(
                "unsupported gain {}, expected 1, 10, 100 or 1000",
                self.gain
            )));
        }
        if ![1, 5, 10].contains(&self.adc_range) {
            return Err(EitError::InvalidSetup(format!(
                "unsupported ADC range +/-{} V, expected 1, 5 or 10",
                self.adc_range
            )));
        }
        if self.burst_count == 0 {
            return Err(EitError::InvalidSetup("burst count must be at least 1".into()));
        }
        Ok(())
    }

    /// Number of 16-channel groups covering all electrodes.
    pub fn channel_groups(&self) -> usize {
        usize::from(self.n_el / CHANNELS_PER_GROUP)
    }

    /// Excitation amplitude limited to the device maximum.
    ///
    /// Values above [`MAX_AMPLITUDE_A`] are clamped with a warning instead of
    /// rejected, matching the device's own permissive behavior.
    pub fn clamped_amplitude(&self) -> f64 {
        if self.amplitude > MAX_AMPLITUDE_A {
            tracing::warn!(
                amplitude = self.amplitude,
                "excitation amplitude out of range, clamping to 10 mA"
            );
            MAX_AMPLITUDE_A
        } else {
            self.amplitude
        }
    }

    /// Injection pairs `(source, sink)` for every electrode, 1-based.
    ///
    /// The sink electrode is the injection index array rotated left by
    /// `inj_skip + 1`, so skip 0 drives adjacent pairs.
    pub fn injection_pairs(&self) -> Vec<(u8, u8)> {
        let n = usize::from(self.n_el);
        let shift = usize::from(self.inj_skip) + 1;
        (0..n)
            .map(|i| (i as u8 + 1, ((i + shift) % n) as u8 + 1))
            .collect()
    }
}
