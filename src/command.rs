//! Tag-delimited command frames.
//!
//! Every command on the wire has the shape `[TAG, LEN, SUBCMD, PARAMS.., TAG]`
//! where `LEN` counts the subcommand byte plus the parameter bytes and the
//! tag byte closes the frame. The device silently ignores frames whose tags
//! do not match, so all frames are produced through [`build`].
//!
//! A full measurement configuration is not a single command but a fixed
//! ordered sequence of frames; the device applies each one against the state
//! left by its predecessors. [`setup_sequence`] is the only way this crate
//! exposes that sequence, so callers cannot reorder it.

use crate::error::{EitError, Result};
use crate::scalar::{encode_f32, encode_f64};
use crate::setup::MeasurementSetup;

/// Command group tags understood by the device.
pub mod tag {
    /// Software reset of the whole device.
    pub const SOFT_RESET: u8 = 0xA1;
    /// Save current settings to device flash.
    pub const SAVE_SETTINGS: u8 = 0x90;
    /// Write one measurement-setup field.
    pub const SET_SETUP: u8 = 0xB0;
    /// Read back one measurement-setup field.
    pub const GET_SETUP: u8 = 0xB1;
    /// Enable or disable one optional data-frame field.
    pub const SET_OUTPUT: u8 = 0xB2;
    /// Read back one optional data-frame field setting.
    pub const GET_OUTPUT: u8 = 0xB3;
    /// Start or stop a measurement run.
    pub const START_STOP: u8 = 0xB4;
    /// Query device information.
    pub const DEVICE_INFO: u8 = 0xD1;
    /// Query firmware identifiers.
    pub const FIRMWARE_IDS: u8 = 0xD2;
    /// Query power-plug presence.
    pub const POWER_PLUG: u8 = 0xCC;
}

// Setup subcommand ids, shared by the 0xB0 writers and the 0xB1 readers.
const SETUP_RESET: u8 = 0x01;
const SETUP_BURST_COUNT: u8 = 0x02;
const SETUP_FRAME_RATE: u8 = 0x03;
const SETUP_FREQUENCIES: u8 = 0x04;
const SETUP_AMPLITUDE: u8 = 0x05;
const SETUP_INJECTION: u8 = 0x06;
const SETUP_MEASURE_MODE: u8 = 0x08;
const SETUP_GAIN: u8 = 0x09;
const SETUP_SWITCH_TYPE: u8 = 0x0C;
const SETUP_ADC_RANGE: u8 = 0x0D;

/// Largest payload (subcommand + params) that fits the length byte.
pub const MAX_PAYLOAD: usize = 254;

/// Build a tag-delimited command frame from a tag and payload.
///
/// The payload is the subcommand byte followed by its parameters; an empty
/// payload is valid for parameterless commands such as the software reset.
pub fn build(cmd_tag: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(EitError::PayloadTooLarge { len: payload.len() });
    }
    Ok(frame(cmd_tag, payload))
}

fn frame(cmd_tag: u8, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= MAX_PAYLOAD);
    let mut out = Vec::with_capacity(payload.len() + 3);
    out.push(cmd_tag);
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
    out.push(cmd_tag);
    out
}

/// Fields of the measurement setup that can be read back individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupQuery {
    /// Configured burst count.
    BurstCount,
    /// Configured frame rate.
    FrameRate,
    /// Excitation frequency block.
    ExcitationFrequencies,
    /// Excitation amplitude.
    ExcitationAmplitude,
    /// Injection electrode sequence.
    ExcitationSequence,
    /// Single-ended or differential measure mode.
    MeasureMode,
    /// Amplifier gain setting.
    Gain,
    /// Excitation switch type.
    SwitchType,
}

impl SetupQuery {
    /// Subcommand id used on the wire.
    pub fn id(self) -> u8 {
        match self {
            SetupQuery::BurstCount => SETUP_BURST_COUNT,
            SetupQuery::FrameRate => SETUP_FRAME_RATE,
            SetupQuery::ExcitationFrequencies => SETUP_FREQUENCIES,
            SetupQuery::ExcitationAmplitude => SETUP_AMPLITUDE,
            SetupQuery::ExcitationSequence => SETUP_INJECTION,
            SetupQuery::MeasureMode => SETUP_MEASURE_MODE,
            SetupQuery::Gain => SETUP_GAIN,
            SetupQuery::SwitchType => SETUP_SWITCH_TYPE,
        }
    }
}

/// Optional fields the device can include in every data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOption {
    /// Active excitation electrode pair.
    ExcitationSetting = 0x01,
    /// Current row in the frequency stack.
    FrequencyRow = 0x02,
    /// Millisecond timestamp.
    Timestamp = 0x03,
}

/// Software reset: `A1 00 A1`.
pub fn software_reset() -> Vec<u8> {
    frame(tag::SOFT_RESET, &[])
}

/// Reset the measurement setup to device defaults: `B0 01 01 B0`.
pub fn reset_setup() -> Vec<u8> {
    frame(tag::SET_SETUP, &[SETUP_RESET])
}

/// Set the number of bursts per run.
pub fn burst_count(count: u16) -> Vec<u8> {
    let be = count.to_be_bytes();
    frame(tag::SET_SETUP, &[SETUP_BURST_COUNT, be[0], be[1]])
}

/// Set the frame rate in Hz.
pub fn frame_rate(hz: f32) -> Vec<u8> {
    let mut payload = vec![SETUP_FRAME_RATE];
    payload.extend_from_slice(&encode_f32(hz));
    frame(tag::SET_SETUP, &payload)
}

/// Start a measurement run: `B4 01 01 B4`.
pub fn start_measurement() -> Vec<u8> {
    frame(tag::START_STOP, &[0x01])
}

/// Stop a measurement run: `B4 01 00 B4`.
pub fn stop_measurement() -> Vec<u8> {
    frame(tag::START_STOP, &[0x00])
}

/// Persist the current settings: `90 00 90`.
pub fn save_settings() -> Vec<u8> {
    frame(tag::SAVE_SETTINGS, &[])
}

/// Query device information: `D1 00 D1`.
pub fn device_info() -> Vec<u8> {
    frame(tag::DEVICE_INFO, &[])
}

/// Query firmware identifiers: `D2 00 D2`.
pub fn firmware_ids() -> Vec<u8> {
    frame(tag::FIRMWARE_IDS, &[])
}

/// Query power-plug presence: `CC 01 81 CC`.
pub fn power_plug_detect() -> Vec<u8> {
    frame(tag::POWER_PLUG, &[0x81])
}

/// Read back one measurement-setup field.
pub fn get_setup(query: SetupQuery) -> Vec<u8> {
    frame(tag::GET_SETUP, &[query.id()])
}

/// Enable or disable one optional data-frame field.
pub fn set_output(option: OutputOption, enable: bool) -> Vec<u8> {
    frame(tag::SET_OUTPUT, &[option as u8, u8::from(enable)])
}

/// Read back one optional data-frame field setting.
pub fn get_output(option: OutputOption) -> Vec<u8> {
    frame(tag::GET_OUTPUT, &[option as u8])
}

fn adc_range_code(range: u8) -> Result<u8> {
    match range {
        1 => Ok(0x01),
        5 => Ok(0x02),
        10 => Ok(0x03),
        other => Err(EitError::InvalidSetup(format!(
            "unsupported ADC range +/-{other} V"
        ))),
    }
}

fn gain_code(gain: u16) -> Result<u8> {
    match gain {
        1 => Ok(0x00),
        10 => Ok(0x01),
        100 => Ok(0x02),
        1000 => Ok(0x03),
        other => Err(EitError::InvalidSetup(format!("unsupported gain {other}"))),
    }
}

/// Build the full ordered configuration sequence for one measurement setup.
///
/// The order is a protocol contract: every frame assumes the ones before it
/// have already been applied by the device. Frames must be written and
/// acknowledged one at a time, strictly in the returned order:
///
/// 1. setup reset
/// 2. burst count
/// 3. excitation amplitude (f64, clamped to the device maximum)
/// 4. ADC range
/// 5. gain
/// 6. single-ended measure mode
/// 7. excitation switch type
/// 8. frame rate (f32)
/// 9. frequency block (`f_min`, `f_max`, count 1, linear scale)
/// 10. one injection pair per electrode
/// 11. output enables: excitation setting, frequency row, timestamp
pub fn setup_sequence(setup: &MeasurementSetup) -> Result<Vec<Vec<u8>>> {
    setup.validate()?;

    let mut frames = Vec::with_capacity(12 + usize::from(setup.n_el));
    frames.push(reset_setup());
    frames.push(burst_count(setup.burst_count));

    let mut amplitude = vec![SETUP_AMPLITUDE];
    amplitude.extend_from_slice(&encode_f64(setup.clamped_amplitude()));
    frames.push(frame(tag::SET_SETUP, &amplitude));

    frames.push(frame(tag::SET_SETUP, &[SETUP_ADC_RANGE, adc_range_code(setup.adc_range)?]));
    frames.push(frame(tag::SET_SETUP, &[SETUP_GAIN, 0x01, gain_code(setup.gain)?]));
    frames.push(frame(tag::SET_SETUP, &[SETUP_MEASURE_MODE, 0x01, 0x01]));
    frames.push(frame(tag::SET_SETUP, &[SETUP_SWITCH_TYPE, 0x01]));
    frames.push(frame_rate(setup.framerate));

    // Single-frequency block: f_min == f_max, one step, linear scale.
    let mut freq = vec![SETUP_FREQUENCIES];
    freq.extend_from_slice(&encode_f32(setup.exc_freq));
    freq.extend_from_slice(&encode_f32(setup.exc_freq));
    freq.extend_from_slice(&[0x00, 0x01]);
    freq.push(0x00);
    frames.push(frame(tag::SET_SETUP, &freq));

    for (source, sink) in setup.injection_pairs() {
        frames.push(frame(tag::SET_SETUP, &[SETUP_INJECTION, source, sink]));
    }

    frames.push(set_output(OutputOption::ExcitationSetting, true));
    frames.push(set_output(OutputOption::FrequencyRow, true));
    frames.push(set_output(OutputOption::Timestamp, true));

    Ok(frames)
}
