//! Trapper sender protocol
//!
//! Frames are `ZBXD`, a flags byte, a little-endian u64 payload length and a
//! JSON payload. The server answers with a frame of the same shape whose
//! `info` member summarises how many values were processed.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};
use zbxutil_core::{Error, Result};

/// Default trapper port
pub const DEFAULT_SENDER_PORT: u16 = 10051;

const MAGIC: &[u8; 4] = b"ZBXD";
const FLAG_PLAIN: u8 = 0x01;
const HEADER_LEN: usize = 13;
const MAX_RESPONSE_LEN: u64 = 16 * 1024 * 1024;

/// One item value to push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub host: String,
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<i64>,
}

impl Metric {
    /// Value without a timestamp; the server stamps it on receipt
    pub fn new(host: impl Into<String>, key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            host: host.into(),
            key: key.into(),
            value: value.to_string(),
            clock: None,
        }
    }

    /// Stamp with the current Unix time
    pub fn now(host: impl Into<String>, key: impl Into<String>, value: impl ToString) -> Self {
        Self::new(host, key, value).with_clock(chrono::Utc::now().timestamp())
    }

    pub fn with_clock(mut self, clock: i64) -> Self {
        self.clock = Some(clock);
        self
    }
}

/// Parsed server summary
#[derive(Debug, Clone, PartialEq)]
pub struct SenderResponse {
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub seconds_spent: f64,
}

impl SenderResponse {
    /// Parse `processed: 1; failed: 0; total: 1; seconds spent: 0.000055`
    pub fn parse_info(info: &str) -> Result<Self> {
        let mut response = SenderResponse {
            processed: 0,
            failed: 0,
            total: 0,
            seconds_spent: 0.0,
        };

        for part in info.split(';') {
            let Some((name, value)) = part.split_once(':') else {
                continue;
            };
            let value = value.trim();
            let bad = |_| Error::SenderError(format!("Malformed sender info: {}", info));
            match name.trim() {
                "processed" => response.processed = value.parse().map_err(bad)?,
                "failed" => response.failed = value.parse().map_err(bad)?,
                "total" => response.total = value.parse().map_err(bad)?,
                "seconds spent" => {
                    response.seconds_spent = value
                        .parse()
                        .map_err(|_| Error::SenderError(format!("Malformed sender info: {}", info)))?
                }
                _ => {}
            }
        }

        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct SenderReply {
    response: String,
    #[serde(default)]
    info: String,
}

/// Pushes item values to a trapper port
#[derive(Debug, Clone)]
pub struct ZabbixSender {
    server: String,
    port: u16,
}

impl ZabbixSender {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Send all `metrics` in one frame
    #[instrument(skip(self, metrics), fields(server = %self.server, port = self.port, count = metrics.len()))]
    pub async fn send(&self, metrics: &[Metric]) -> Result<SenderResponse> {
        let payload = serde_json::to_vec(&json!({
            "request": "sender data",
            "data": metrics,
        }))?;

        let mut stream = TcpStream::connect((self.server.as_str(), self.port))
            .await
            .map_err(|e| {
                Error::SenderError(format!(
                    "Failed to connect to {}:{}: {}",
                    self.server, self.port, e
                ))
            })?;

        debug!(bytes = payload.len(), "Writing sender frame");
        stream.write_all(&encode_frame(&payload)).await?;
        stream.flush().await?;

        let body = read_frame(&mut stream).await?;
        let reply: SenderReply = serde_json::from_slice(&body)?;

        if reply.response != "success" {
            return Err(Error::SenderError(format!(
                "Server rejected data: {} {}",
                reply.response, reply.info
            )));
        }

        let response = SenderResponse::parse_info(&reply.info)?;
        info!(
            processed = response.processed,
            failed = response.failed,
            total = response.total,
            "Sender data accepted"
        );
        Ok(response)
    }
}

/// Wrap `payload` in a protocol header
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.push(FLAG_PLAIN);
    frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Read one frame and return its payload
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    if &header[..4] != MAGIC {
        return Err(Error::SenderError("Invalid response header".to_string()));
    }
    if header[4] != FLAG_PLAIN {
        return Err(Error::SenderError(format!(
            "Unsupported frame flags: {:#04x}",
            header[4]
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&header[5..]);
    let len = u64::from_le_bytes(len_bytes);
    if len > MAX_RESPONSE_LEN {
        return Err(Error::SenderError(format!("Response too large: {} bytes", len)));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
