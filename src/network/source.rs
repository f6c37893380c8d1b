//! Inbound byte stream seam
//!
//! The engine consumes audio bytes through [`ByteSource`] so the socket
//! stays a thin, replaceable edge: production uses [`TcpByteSource`],
//! tests inject a channel-backed source.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::info;

use crate::constants::CONNECT_TIMEOUT_SECS;
use crate::error::NetworkError;

/// Read buffer size for the TCP source
const READ_BUF_SIZE: usize = 4096;

/// A source of raw audio bytes
///
/// `Ok(Some(bytes))` delivers the next chunk, `Ok(None)` signals a clean
/// end of stream, `Err` a transport failure.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>>;
}

/// TCP-backed byte source
pub struct TcpByteSource {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl TcpByteSource {
    /// Connect to `addr`, enforcing the handshake timeout. A handshake
    /// that never completes fails with [`NetworkError::ConnectTimeout`].
    pub async fn connect(addr: &str) -> Result<Self, NetworkError> {
        let timeout = Duration::from_secs(CONNECT_TIMEOUT_SECS);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetworkError::ConnectTimeout(CONNECT_TIMEOUT_SECS))?
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        info!(addr, "connected to audio stream");
        Ok(Self {
            stream,
            buf: vec![0u8; READ_BUF_SIZE],
        })
    }
}

#[async_trait]
impl ByteSource for TcpByteSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let n = self.stream.read(&mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(Bytes::copy_from_slice(&self.buf[..n])))
    }
}

/// Channel-backed byte source for tests and local feeding
pub struct ChannelByteSource {
    rx: tokio::sync::mpsc::Receiver<io::Result<Bytes>>,
}

impl ChannelByteSource {
    /// Create a source and the sender half that feeds it. Dropping the
    /// sender ends the stream cleanly.
    pub fn new(capacity: usize) -> (tokio::sync::mpsc::Sender<io::Result<Bytes>>, Self) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl ByteSource for ChannelByteSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        match self.rx.recv().await {
            Some(Ok(bytes)) => Ok(Some(bytes)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_delivers_then_ends() {
        let (tx, mut source) = ChannelByteSource::new(4);
        tx.send(Ok(Bytes::from_static(&[1, 2, 3]))).await.unwrap();
        drop(tx);

        let chunk = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(&chunk[..], &[1, 2, 3]);
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_channel_source_propagates_error() {
        let (tx, mut source) = ChannelByteSource::new(4);
        tx.send(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
            .await
            .unwrap();
        assert!(source.next_chunk().await.is_err());
    }

    #[tokio::test]
    async fn test_tcp_connect_refused() {
        // Port 1 is almost certainly closed; expect a connection failure,
        // not a hang.
        let result = TcpByteSource::connect("127.0.0.1:1").await;
        assert!(result.is_err());
    }
}
