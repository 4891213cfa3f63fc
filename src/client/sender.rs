//! TCP client for submitting records and collecting the echoed journal

use crate::config::ClientConfig;
use crate::types::DELIMITER;
use crate::{EchoLogError, Result};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

/// Client for the record-submission protocol.
///
/// The server's echo carries no length framing: it is simply the whole
/// journal, written back on the same connection, which then stays open for
/// further submissions. The client therefore reads until the stream goes
/// quiet for a configured window (or the server closes) and treats
/// whatever arrived by then as the response. An empty response is valid;
/// it is what a server whose journal storage is unavailable sends.
pub struct RecordClient {
    config: ClientConfig,
    stream: TcpStream,
}

impl RecordClient {
    /// Connect to the server at `addr` with default settings.
    pub async fn connect(addr: &str) -> Result<Self> {
        let config = ClientConfig {
            server_address: addr.to_string(),
            ..Default::default()
        };

        Self::with_config(config).await
    }

    /// Connect using an explicit configuration.
    pub async fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let connect_future = TcpStream::connect(&config.server_address);
        let stream = timeout(Duration::from_secs(config.timeout_seconds), connect_future)
            .await
            .map_err(|_| EchoLogError::Connection("Connection timeout".to_string()))?
            .map_err(|e| EchoLogError::Connection(format!("Failed to connect: {}", e)))?;

        Ok(Self { config, stream })
    }

    /// Submit one record and return the server's echo of the journal.
    ///
    /// A trailing delimiter is appended to `payload` if it is missing.
    pub async fn send_record(&mut self, payload: &[u8]) -> Result<Bytes> {
        if payload.last() == Some(&DELIMITER) {
            self.stream.write_all(payload).await?;
        } else {
            // One write, so no peer ever sees the record without its
            // delimiter.
            let mut framed = BytesMut::with_capacity(payload.len() + 1);
            framed.extend_from_slice(payload);
            framed.extend_from_slice(&[DELIMITER]);
            self.stream.write_all(&framed).await?;
        }
        self.stream.flush().await?;

        self.read_response().await
    }

    async fn read_response(&mut self) -> Result<Bytes> {
        let mut response = BytesMut::new();
        let quiet = Duration::from_millis(self.config.response_quiet_ms);

        loop {
            // The first read waits out the full timeout; once bytes have
            // arrived only the quiet window applies.
            let wait = if response.is_empty() {
                Duration::from_secs(self.config.timeout_seconds)
            } else {
                quiet
            };

            match timeout(wait, self.stream.read_buf(&mut response)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(EchoLogError::Io(e)),
                Err(_) => break,
            }
        }

        Ok(response.freeze())
    }

    /// Shut the connection down.
    pub async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(EchoLogError::Io)?;
        Ok(())
    }
}
