//! Timeout-driven response collection and status resolution.
//!
//! After every command the device answers with an acknowledgement frame, and
//! after a measurement run it streams data until the line goes quiet. Both
//! cases are read the same way: poll the transport, append whatever arrives,
//! and stop once a poll comes back empty. The reader then scans the buffer
//! for the message marker `0x18` and resolves the status byte two positions
//! behind it against the device code table.
//!
//! A buffer without a marker is the common "no message inside the message
//! buffer" outcome, not an error, and a status byte outside the table is
//! reported as [`ResolvedStatus::Unknown`] rather than aborting the read.

use crate::error::{EitError, Result};
use crate::transport::Transport;

/// Marker byte preceding a status message in the receive buffer.
pub const MESSAGE_MARKER: u8 = 0x18;

/// Offset of the status byte behind the marker.
const STATUS_OFFSET: usize = 2;

/// Empty polls tolerated before the read loop stops.
///
/// The stop-after-one-empty-poll policy is intentionally aggressive and
/// matches validated device timing; do not raise it without hardware
/// validation.
const EMPTY_POLL_LIMIT: u32 = 1;

/// Status codes the device reports behind the message marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// No message inside the message buffer.
    NoMessage,
    /// Communication timeout, less data than expected.
    CommunicationTimeout,
    /// Wake-up message, system boot ready.
    BootReady,
    /// Valid TCP client-socket connection.
    TcpSocketValid,
    /// Not-acknowledge: command has not been executed.
    NotExecuted,
    /// Not-acknowledge: command could not be recognized.
    NotRecognized,
    /// Command-acknowledge: command executed successfully.
    Executed,
    /// System is operational and ready to receive data.
    SystemReady,
    /// Measurement data could not be sent via the master interface.
    DataHoldup,
}

impl SystemStatus {
    /// Map a wire code to a known status.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::NoMessage),
            0x02 => Some(Self::CommunicationTimeout),
            0x04 => Some(Self::BootReady),
            0x11 => Some(Self::TcpSocketValid),
            0x81 => Some(Self::NotExecuted),
            0x82 => Some(Self::NotRecognized),
            0x83 => Some(Self::Executed),
            0x84 => Some(Self::SystemReady),
            0x92 => Some(Self::DataHoldup),
            _ => None,
        }
    }

    /// Wire code of this status.
    pub fn code(self) -> u8 {
        match self {
            Self::NoMessage => 0x01,
            Self::CommunicationTimeout => 0x02,
            Self::BootReady => 0x04,
            Self::TcpSocketValid => 0x11,
            Self::NotExecuted => 0x81,
            Self::NotRecognized => 0x82,
            Self::Executed => 0x83,
            Self::SystemReady => 0x84,
            Self::DataHoldup => 0x92,
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NoMessage => "No message inside the message buffer",
            Self::CommunicationTimeout => {
                "Timeout: Communication-timeout (less data than expected)"
            }
            Self::BootReady => "Wake-Up Message: System boot ready",
            Self::TcpSocketValid => "TCP-Socket: Valid TCP client-socket connection",
            Self::NotExecuted => "Not-Acknowledge: Command has not been executed",
            Self::NotRecognized => "Not-Acknowledge: Command could not be recognized",
            Self::Executed => "Command-Acknowledge: Command has been executed successfully",
            Self::SystemReady => {
                "System-Ready Message: System is operational and ready to receive data"
            }
            Self::DataHoldup => {
                "Data holdup: Measurement data could not be sent via the master interface"
            }
        };
        f.write_str(text)
    }
}

/// Status byte found behind the message marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedStatus {
    /// Code present in the device table.
    Known(SystemStatus),
    /// Code missing from the table; reported as data, never a crash.
    Unknown(u8),
}

impl ResolvedStatus {
    fn from_code(code: u8) -> Self {
        SystemStatus::from_code(code).map_or(Self::Unknown(code), Self::Known)
    }

    /// True when the device acknowledged successful execution.
    pub fn is_ack(self) -> bool {
        self == Self::Known(SystemStatus::Executed)
    }
}

/// Which representations of the receive buffer a report should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Status resolution only, buffer discarded.
    #[default]
    None,
    /// Keep the raw bytes.
    RawBytes,
    /// Keep the rendered hex tokens.
    HexTokens,
    /// Keep both representations.
    Both,
}

/// Outcome of one read cycle.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Raw buffer, when requested via [`OutputFormat`].
    pub raw: Option<Vec<u8>>,
    /// Hex-token rendering, when requested via [`OutputFormat`].
    pub hex: Option<Vec<String>>,
    /// Resolved status; `None` when no marker was present in the buffer.
    pub status: Option<ResolvedStatus>,
    /// Total bytes collected in this cycle.
    pub bytes_read: usize,
}

impl StatusReport {
    /// True when the device acknowledged successful execution.
    pub fn is_ack(&self) -> bool {
        self.status.is_some_and(ResolvedStatus::is_ack)
    }
}

/// Render a byte buffer as `0x..` tokens.
pub fn hex_tokens(bytes: &[u8]) -> Vec<String> {
    bytes.iter().map(|b| format!("{b:#04x}")).collect()
}

/// Convert `0x..` tokens back into bytes.
///
/// Inverse of [`hex_tokens`]; used when a capture was carried around in its
/// rendered form before decoding.
pub fn bytes_from_hex_tokens(tokens: &[String]) -> Result<Vec<u8>> {
    tokens
        .iter()
        .map(|t| {
            u8::from_str_radix(t.trim_start_matches("0x"), 16)
                .map_err(|_| EitError::MalformedHexToken(t.clone()))
        })
        .collect()
}

/// Collects device responses from a transport, one read cycle at a time.
///
/// The read cycle is a two-state machine: while bytes keep arriving it stays
/// in the reading state; the first empty poll moves it to done (see
/// [`EMPTY_POLL_LIMIT`]). There is no shared formatting state; the caller
/// picks the output representation per call.
#[derive(Debug, Clone)]
pub struct ResponseReader {
    empty_poll_limit: u32,
}

impl Default for ResponseReader {
    fn default() -> Self {
        Self {
            empty_poll_limit: EMPTY_POLL_LIMIT,
        }
    }
}

impl ResponseReader {
    /// Reader with the standard single-empty-poll policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one read cycle and resolve the buffered status message.
    pub async fn collect<T: Transport + ?Sized>(
        &self,
        transport: &T,
        format: OutputFormat,
    ) -> Result<StatusReport> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut empty_polls = 0u32;

        loop {
            let chunk = transport.read_chunk().await?;
            if chunk.is_empty() {
                empty_polls += 1;
                if empty_polls >= self.empty_poll_limit {
                    break;
                }
            } else {
                buffer.extend_from_slice(&chunk);
                empty_polls = 0;
            }
        }

        let status = resolve_status(&buffer);
        match status {
            Some(resolved) => tracing::debug!(?resolved, "device status"),
            None => tracing::debug!("no message in receive buffer"),
        }

        let bytes_read = buffer.len();
        let (raw, hex) = match format {
            OutputFormat::None => (None, None),
            OutputFormat::RawBytes => (Some(buffer), None),
            OutputFormat::HexTokens => (None, Some(hex_tokens(&buffer))),
            OutputFormat::Both => {
                let hex = hex_tokens(&buffer);
                (Some(buffer), Some(hex))
            }
        };

        Ok(StatusReport {
            raw,
            hex,
            status,
            bytes_read,
        })
    }
}

fn resolve_status(buffer: &[u8]) -> Option<ResolvedStatus> {
    let marker = buffer.iter().position(|&b| b == MESSAGE_MARKER)?;
    let code = *buffer.get(marker + STATUS_OFFSET)?;
    Some(ResolvedStatus::from_code(code))
}
