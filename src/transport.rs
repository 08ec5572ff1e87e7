//! Transport abstraction for device communication.
//!
//! The protocol engine only depends on a byte-level write/read contract and
//! never on how the handle was obtained. [`Transport`] is that contract:
//! write a full command frame, or poll for whatever bytes arrived within the
//! transport's own idle timeout. An empty poll result means the line was
//! quiet, not that the connection failed.
//!
//! Exchanges are strictly half-duplex: one write is followed by reading the
//! response before the next command. [`SerialTransport`] serializes access
//! with a `tokio::sync::Mutex`, so a transport shared between tasks cannot
//! interleave exchanges.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::Result;

/// Read chunk size per poll.
const POLL_BUF_LEN: usize = 1024;

/// Byte-level device transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write a complete command frame.
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Poll for available bytes within the per-read idle timeout.
    ///
    /// Returns an empty vector when the timeout elapsed with nothing on the
    /// line; that is the normal end-of-response signal.
    async fn read_chunk(&self) -> Result<Vec<u8>>;
}

/// Serial transport backed by `tokio-serial`.
pub struct SerialTransport {
    port: Mutex<tokio_serial::SerialStream>,
    idle_timeout: Duration,
}

impl SerialTransport {
    /// Open a serial port with standard device settings (8N1, no flow
    /// control) and the given per-read idle timeout.
    pub async fn open(
        port_path: &str,
        baud_rate: u32,
        idle_timeout: Duration,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;
        use tokio::task::spawn_blocking;
        use tokio_serial::SerialPortBuilderExt;

        let path = port_path.to_string();
        let stream = spawn_blocking(move || {
            tokio_serial::new(&path, baud_rate)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .flow_control(tokio_serial::FlowControl::None)
                .open_native_async()
                .with_context(|| format!("Failed to open serial port: {path}"))
        })
        .await
        .context("spawn_blocking for serial port opening failed")??;

        tracing::info!(port = port_path, baud_rate, "serial port opened");

        Ok(Self {
            port: Mutex::new(stream),
            idle_timeout,
        })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut port = self.port.lock().await;
        tracing::debug!(len = bytes.len(), "serial write");
        port.write_all(bytes).await?;
        port.flush().await?;
        Ok(())
    }

    async fn read_chunk(&self) -> Result<Vec<u8>> {
        let mut port = self.port.lock().await;
        let mut buf = [0u8; POLL_BUF_LEN];
        match tokio::time::timeout(self.idle_timeout, port.read(&mut buf)).await {
            Ok(Ok(0)) => Ok(Vec::new()),
            Ok(Ok(n)) => Ok(buf[..n].to_vec()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Ok(Err(e)) => Err(e.into()),
            // Idle timeout: the line is quiet.
            Err(_) => Ok(Vec::new()),
        }
    }
}

/// Scripted in-memory transport for tests.
///
/// Queued responses are handed out one per poll; an exhausted queue reads as
/// a quiet line. All written frames are recorded for assertions.
#[derive(Default)]
pub struct MockTransport {
    written: Mutex<Vec<Vec<u8>>>,
    responses: Mutex<std::collections::VecDeque<Vec<u8>>>,
}

impl MockTransport {
    /// Create a mock with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that will serve the given response chunks in order.
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            written: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    /// Queue another response chunk.
    pub async fn push_response(&self, chunk: Vec<u8>) {
        self.responses.lock().await.push_back(chunk);
    }

    /// Frames written so far, in order.
    pub async fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().await.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&self, bytes: &[u8]) -> Result<()> {
        self.written.lock().await.push(bytes.to_vec());
        Ok(())
    }

    async fn read_chunk(&self) -> Result<Vec<u8>> {
        Ok(self.responses.lock().await.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_writes() {
        let mock = MockTransport::new();
        mock.write(&[0xA1, 0x00, 0xA1]).await.unwrap();
        mock.write(&[0xD1, 0x00, 0xD1]).await.unwrap();
        let written = mock.written().await;
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], vec![0xA1, 0x00, 0xA1]);
    }

    #[tokio::test]
    async fn mock_serves_responses_then_goes_quiet() {
        let mock = MockTransport::with_responses([vec![0x18, 0x01], vec![0x83, 0x18]]);
        assert_eq!(mock.read_chunk().await.unwrap(), vec![0x18, 0x01]);
        assert_eq!(mock.read_chunk().await.unwrap(), vec![0x83, 0x18]);
        assert!(mock.read_chunk().await.unwrap().is_empty());
    }
}
