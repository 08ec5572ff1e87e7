//! ScioSpec EIT device communication and measurement reconstruction.
//!
//! This crate drives the ScioSpec electrical impedance tomography device
//! family (16 to 128 electrodes) over its tag-delimited binary serial
//! protocol and reconstructs the raw measurement stream into complex-valued
//! potential matrices.
//!
//! # Architecture
//!
//! - [`scalar`]: big-endian IEEE-754 encoding for command parameters
//! - [`command`]: tag-delimited command frames and the ordered setup sequence
//! - [`response`]: timeout-driven response collection and status resolution
//! - [`frame`] / [`decode`]: measurement stream splitting and frame decoding
//! - [`matrix`]: per-burst potential matrix assembly
//! - [`transport`]: byte-level transport seam (serial hardware or mock)
//! - [`device`]: half-duplex session combining the pieces
//!
//! The protocol engine never owns the transport handle; it only relies on
//! the write/poll contract in [`transport::Transport`], so tests run against
//! a scripted mock and production runs against `tokio-serial`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sciospec_eit::{EitDevice, MeasurementSetup, MockTransport};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let setup = MeasurementSetup {
//!     burst_count: 10,
//!     n_el: 16,
//!     exc_freq: 10_000.0,
//!     framerate: 10.0,
//!     amplitude: 0.001,
//!     inj_skip: 0,
//!     gain: 1,
//!     adc_range: 5,
//! };
//!
//! let device = EitDevice::new(Arc::new(MockTransport::new()), setup.n_el)?;
//! device.set_measurement_setup(&setup).await?;
//! let matrices = device.run_measurement(&setup).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod decode;
pub mod device;
pub mod error;
pub mod frame;
pub mod matrix;
pub mod response;
pub mod scalar;
pub mod setup;
pub mod transport;

pub use command::{OutputOption, SetupQuery};
pub use decode::BurstDecoder;
pub use device::{EitDevice, EitDeviceConfig};
pub use error::{EitError, Result};
pub use frame::MeasurementFrame;
pub use matrix::{assemble, is_unmeasured, PotentialMatrix, UNMEASURED};
pub use response::{OutputFormat, ResolvedStatus, ResponseReader, StatusReport, SystemStatus};
pub use setup::MeasurementSetup;
pub use transport::{MockTransport, SerialTransport, Transport};
