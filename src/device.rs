//! ScioSpec EIT device session.
//!
//! One [`EitDevice`] owns one transport for the duration of a session and
//! drives the strictly half-duplex exchange pattern: every command frame is
//! written and its response collected before the next frame goes out. The
//! 16, 32, 48, 64 and 128 electrode variants are one capability set; the
//! electrode count is a validated construction parameter rather than a
//! separate type per variant.
//!
//! # Example
//!
//! ```rust,ignore
//! use sciospec_eit::{EitDevice, EitDeviceConfig, MeasurementSetup};
//!
//! let config = EitDeviceConfig {
//!     port: "/dev/ttyUSB0".into(),
//!     n_el: 16,
//!     ..Default::default()
//! };
//! let device = config.connect().await?;
//! device.set_measurement_setup(&setup).await?;
//! let matrices = device.run_measurement(&setup).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::command::{self, OutputOption, SetupQuery};
use crate::decode::BurstDecoder;
use crate::error::EitError;
use crate::matrix::{self, PotentialMatrix};
use crate::response::{OutputFormat, ResponseReader, StatusReport};
use crate::setup::{MeasurementSetup, SUPPORTED_ELECTRODE_COUNTS};
use crate::transport::{MockTransport, SerialTransport, Transport};

/// Default baud rate for the full-speed serial interface.
const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-read idle timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Configuration for an EIT device session.
#[derive(Debug, Clone, Deserialize)]
pub struct EitDeviceConfig {
    /// Serial port path (e.g. "/dev/ttyUSB0", "COM3").
    pub port: String,

    /// Total electrode count of the connected frontend.
    pub n_el: u16,

    /// Baud rate (default: 9600).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-read idle timeout in milliseconds (default: 1000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Use an in-memory mock transport instead of hardware.
    #[serde(default)]
    pub mock: bool,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for EitDeviceConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            n_el: 16,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            mock: false,
        }
    }
}

impl EitDeviceConfig {
    /// Parse and validate a configuration from a TOML value.
    pub fn from_toml(value: &toml::Value) -> Result<Self> {
        let cfg: Self = value
            .clone()
            .try_into()
            .context("Invalid EIT device config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the configuration before opening hardware.
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() && !self.mock {
            anyhow::bail!("'port' field cannot be empty");
        }
        if !SUPPORTED_ELECTRODE_COUNTS.contains(&self.n_el) {
            anyhow::bail!(
                "'n_el' must be one of {:?}, got {}",
                SUPPORTED_ELECTRODE_COUNTS,
                self.n_el
            );
        }
        Ok(())
    }

    /// Open the transport and build a device session.
    pub async fn connect(&self) -> Result<EitDevice> {
        self.validate()?;
        let transport: Arc<dyn Transport> = if self.mock {
            tracing::info!("creating mock EIT device session");
            Arc::new(MockTransport::new())
        } else {
            Arc::new(
                SerialTransport::open(
                    &self.port,
                    self.baud_rate,
                    Duration::from_millis(self.timeout_ms),
                )
                .await?,
            )
        };
        EitDevice::new(transport, self.n_el)
    }
}

/// Session handle for one ScioSpec EIT device.
pub struct EitDevice {
    transport: Arc<dyn Transport>,
    reader: ResponseReader,
    n_el: u16,
}

impl EitDevice {
    /// Create a session over an already-open transport.
    ///
    /// `n_el` must be one of the supported electrode counts; it selects the
    /// channel-group layout the device variant reports.
    pub fn new(transport: Arc<dyn Transport>, n_el: u16) -> Result<Self> {
        if !SUPPORTED_ELECTRODE_COUNTS.contains(&n_el) {
            anyhow::bail!(
                "unsupported electrode count {}, expected one of {:?}",
                n_el,
                SUPPORTED_ELECTRODE_COUNTS
            );
        }
        Ok(Self {
            transport,
            reader: ResponseReader::new(),
            n_el,
        })
    }

    /// Electrode count this session was opened for.
    pub fn n_el(&self) -> u16 {
        self.n_el
    }

    /// Write one command frame and collect its response.
    ///
    /// This is the half-duplex primitive every operation goes through; the
    /// response is always drained before the method returns.
    pub async fn exchange(&self, frame: &[u8], format: OutputFormat) -> Result<StatusReport> {
        self.transport.write(frame).await?;
        let report = self.reader.collect(self.transport.as_ref(), format).await?;
        Ok(report)
    }

    /// Perform a software reset of the device.
    pub async fn software_reset(&self) -> Result<StatusReport> {
        self.exchange(&command::software_reset(), OutputFormat::None)
            .await
    }

    /// Reset the measurement setup to device defaults.
    pub async fn reset_measurement_setup(&self) -> Result<StatusReport> {
        self.exchange(&command::reset_setup(), OutputFormat::None)
            .await
    }

    /// Transmit a complete measurement setup.
    ///
    /// The configuration frames are written strictly in sequence order, each
    /// one acknowledged before the next. Returns the report of the last
    /// frame in the sequence.
    pub async fn set_measurement_setup(&self, setup: &MeasurementSetup) -> Result<StatusReport> {
        if setup.n_el != self.n_el {
            anyhow::bail!(
                "setup is for {} electrodes but the session was opened for {}",
                setup.n_el,
                self.n_el
            );
        }

        let frames = command::setup_sequence(setup)?;
        let mut last = None;
        for frame in &frames {
            let report = self.exchange(frame, OutputFormat::None).await?;
            if !report.is_ack() {
                tracing::debug!(status = ?report.status, "setup frame not acknowledged");
            }
            last = Some(report);
        }
        last.context("setup sequence produced no frames")
    }

    /// Update only the burst count.
    pub async fn update_burst_count(&self, count: u16) -> Result<StatusReport> {
        self.exchange(&command::burst_count(count), OutputFormat::None)
            .await
    }

    /// Update only the frame rate.
    pub async fn update_frame_rate(&self, hz: f32) -> Result<StatusReport> {
        self.exchange(&command::frame_rate(hz), OutputFormat::None)
            .await
    }

    /// Read back one measurement-setup field.
    pub async fn get_measurement_setup(&self, query: SetupQuery) -> Result<StatusReport> {
        self.exchange(&command::get_setup(query), OutputFormat::Both)
            .await
    }

    /// Enable or disable one optional data-frame field.
    pub async fn set_output_configuration(
        &self,
        option: OutputOption,
        enable: bool,
    ) -> Result<StatusReport> {
        self.exchange(&command::set_output(option, enable), OutputFormat::None)
            .await
    }

    /// Read back all three optional data-frame field settings.
    pub async fn get_output_configuration(&self) -> Result<Vec<StatusReport>> {
        let mut reports = Vec::with_capacity(3);
        for option in [
            OutputOption::ExcitationSetting,
            OutputOption::FrequencyRow,
            OutputOption::Timestamp,
        ] {
            reports.push(
                self.exchange(&command::get_output(option), OutputFormat::Both)
                    .await?,
            );
        }
        Ok(reports)
    }

    /// Persist the current settings to device flash.
    pub async fn save_settings(&self) -> Result<StatusReport> {
        self.exchange(&command::save_settings(), OutputFormat::None)
            .await
    }

    /// Query device information.
    pub async fn get_device_info(&self) -> Result<StatusReport> {
        self.exchange(&command::device_info(), OutputFormat::Both)
            .await
    }

    /// Query firmware identifiers.
    pub async fn get_firmware_ids(&self) -> Result<StatusReport> {
        self.exchange(&command::firmware_ids(), OutputFormat::Both)
            .await
    }

    /// Query power-plug presence.
    pub async fn power_plug_detect(&self) -> Result<StatusReport> {
        self.exchange(&command::power_plug_detect(), OutputFormat::None)
            .await
    }

    /// Start a run, capture the raw stream, and stop the device again.
    ///
    /// The returned bytes are the unvalidated capture; most callers want
    /// [`Self::run_measurement`] instead.
    pub async fn capture_raw(&self) -> Result<Vec<u8>> {
        let report = self
            .exchange(&command::start_measurement(), OutputFormat::RawBytes)
            .await?;
        let stop = self
            .exchange(&command::stop_measurement(), OutputFormat::None)
            .await?;
        tracing::debug!(
            captured = report.bytes_read,
            stop_status = ?stop.status,
            "measurement capture finished"
        );
        report.raw.context("raw capture missing from report")
    }

    /// Run one measurement and reconstruct per-burst potential matrices.
    ///
    /// `setup` must be the value previously transmitted via
    /// [`Self::set_measurement_setup`]; it determines the expected stream
    /// shape. Each burst reconstructs independently, so a single bad burst
    /// shows up as an error in its slot without discarding its siblings.
    pub async fn run_measurement(
        &self,
        setup: &MeasurementSetup,
    ) -> Result<Vec<std::result::Result<PotentialMatrix, EitError>>> {
        if setup.n_el != self.n_el {
            anyhow::bail!(
                "setup is for {} electrodes but the session was opened for {}",
                setup.n_el,
                self.n_el
            );
        }

        let stream = self.capture_raw().await?;
        let bursts = BurstDecoder::new(setup).decode(&stream)?;
        Ok(matrix::assemble(setup, &bursts))
    }
}
