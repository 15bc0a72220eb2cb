//! Length-prefixed message framing over a byte stream
//!
//! A frame is a `u32` little-endian payload length followed by the payload.
//! Payloads are bincode-encoded `Request`/`Reply` values; the raw helpers are
//! public so the server can answer an undecodable payload instead of dropping
//! the connection.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const DEFAULT_MAX_PAYLOAD: u32 = 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    pub max_payload: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { size: u64, max: u32 },
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

fn closed_or_io(e: std::io::Error) -> FrameError {
    if e.kind() == ErrorKind::UnexpectedEof {
        FrameError::ConnectionClosed
    } else {
        FrameError::Io(e)
    }
}

/// Reads one frame and returns its payload.
pub async fn read_frame<R>(reader: &mut R, config: &FrameConfig) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).await.map_err(closed_or_io)?;

    let len = u32::from_le_bytes(prefix);
    if len > config.max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len as u64,
            max: config.max_payload,
        });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(closed_or_io)?;
    Ok(payload)
}

pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
    config: &FrameConfig,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() as u64 > config.max_payload as u64 {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len() as u64,
            max: config.max_payload,
        });
    }

    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Encodes `message` with bincode and writes it as one frame.
pub async fn send_message<W, T>(
    writer: &mut W,
    message: &T,
    config: &FrameConfig,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(message)?;
    write_frame(writer, &payload, config).await
}

/// Reads one frame and decodes it with bincode.
pub async fn recv_message<R, T>(reader: &mut R, config: &FrameConfig) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = read_frame(reader, config).await?;
    Ok(bincode::deserialize(&payload)?)
}
