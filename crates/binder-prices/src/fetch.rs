//! HTTP transport for the upstream price authority documents.
//!
//! The fetcher performs one GET per document with a single overall deadline
//! covering connect through the last body byte. It never retries: the
//! refresh cadence is the retry policy, and a failed fetch simply leaves the
//! previous indices in place.
//!
//! Bodies are far too large to buffer, so [`DocumentStream::pump`] forwards
//! chunks into a bounded channel that the parser thread drains through
//! [`ChannelReader`]. The bound keeps at most a handful of chunks in flight
//! regardless of document size.

use std::io::{self, Read};
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::sync::mpsc;

use crate::error::PriceError;

/// Depth of the chunk channel between the network task and the parser thread.
const CHANNEL_DEPTH: usize = 8;

pub(crate) struct DocumentFetcher {
    client: Client,
}

impl DocumentFetcher {
    /// Builds the shared client: no default timeout (deadlines are
    /// per-request), 10 s connect timeout, gzip transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub(crate) fn new(user_agent: &str) -> Result<Self, PriceError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Opens a GET against `url` with `timeout` as the overall deadline.
    ///
    /// # Errors
    ///
    /// - [`PriceError::Http`] on transport failure (connect, TLS, deadline).
    /// - [`PriceError::UnexpectedStatus`] on any non-2xx response.
    pub(crate) async fn open(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<DocumentStream, PriceError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(DocumentStream { response })
    }
}

/// An open response body being relayed to the parser thread.
pub(crate) struct DocumentStream {
    response: reqwest::Response,
}

impl DocumentStream {
    /// Drains the body into `tx` chunk by chunk.
    ///
    /// A transport error mid-body is forwarded into the channel — so the
    /// parser aborts with an I/O error instead of mistaking truncation for
    /// end of input — and also returned here. The response is dropped on
    /// every exit path, which closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Http`] if the transfer fails before the body
    /// completes. A receiver hang-up (the parser gave up) is not an error.
    pub(crate) async fn pump(
        mut self,
        tx: mpsc::Sender<io::Result<Vec<u8>>>,
    ) -> Result<(), PriceError> {
        loop {
            match self.response.chunk().await {
                Ok(Some(bytes)) => {
                    if tx.send(Ok(bytes.to_vec())).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(None) => return Ok(()),
                Err(err) => {
                    let _ = tx.send(Err(io::Error::other(err.to_string()))).await;
                    return Err(PriceError::Http(err));
                }
            }
        }
    }
}

/// Creates the bounded chunk channel and its reading half.
pub(crate) fn chunk_channel() -> (mpsc::Sender<io::Result<Vec<u8>>>, ChannelReader) {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    (tx, ChannelReader::new(rx))
}

/// Blocking [`Read`] over the chunk channel, for use on a `spawn_blocking`
/// parser thread. Channel hang-up reads as EOF.
pub(crate) struct ChannelReader {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    pub(crate) fn new(rx: mpsc::Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.chunk.len() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Some(Err(err)) => return Err(err),
                None => return Ok(0),
            }
        }
        let n = (self.chunk.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_reader_reassembles_chunks() {
        let (tx, mut reader) = chunk_channel();
        tx.blocking_send(Ok(b"hello ".to_vec())).unwrap();
        tx.blocking_send(Ok(Vec::new())).unwrap();
        tx.blocking_send(Ok(b"world".to_vec())).unwrap();
        drop(tx);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn channel_reader_reads_across_small_buffers() {
        let (tx, mut reader) = chunk_channel();
        tx.blocking_send(Ok(b"abcdef".to_vec())).unwrap();
        drop(tx);

        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn channel_reader_surfaces_forwarded_errors() {
        let (tx, mut reader) = chunk_channel();
        tx.blocking_send(Ok(b"partial".to_vec())).unwrap();
        tx.blocking_send(Err(io::Error::other("connection reset")))
            .unwrap();
        drop(tx);

        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 7);
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }
}
