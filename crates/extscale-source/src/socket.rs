//! Socket feed transport.
//!
//! The producer accepts a TCP connection, writes exactly one JSON object
//! followed by `\n`, and is free to close. A fresh connection is opened
//! for every fetch and dropped on every return path.

use std::io;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use extscale_core::{FetchError, Reading};

use crate::{DataSource, FetchFuture};

/// Longest line accepted from the feed, terminator included.
const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Wire shape of one feed message.
#[derive(Debug, Deserialize)]
struct FeedMessage {
    value: f64,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Reads one newline-terminated reading per connection from `host:port`.
#[derive(Debug, Clone)]
pub struct SocketSource {
    address: String,
    timeout: Duration,
}

impl SocketSource {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn fetch_once(&self) -> Result<Reading, FetchError> {
        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(FetchError::connect(&self.address, e)),
            Err(_) => {
                return Err(FetchError::connect(
                    &self.address,
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        let mut reader = BufReader::new(stream).take(MAX_LINE_BYTES);
        let mut line = String::new();

        match tokio::time::timeout(self.timeout, reader.read_line(&mut line)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(FetchError::decode(&self.address, e));
            }
            Ok(Err(e)) => return Err(FetchError::read(&self.address, e)),
            Err(_) => {
                return Err(FetchError::read(
                    &self.address,
                    format!("no message within {:?}", self.timeout),
                ));
            }
        }

        if !line.ends_with('\n') {
            let reason = if line.len() as u64 >= MAX_LINE_BYTES {
                format!("no newline within {MAX_LINE_BYTES} bytes")
            } else {
                "connection closed before newline".to_string()
            };
            return Err(FetchError::read(&self.address, reason));
        }

        let reading = decode_line(&self.address, &line)?;
        debug!(
            source = %self.address,
            value = %reading.value,
            timestamp = reading.timestamp.as_deref().unwrap_or(""),
            "received reading"
        );
        Ok(reading)
    }
}

impl DataSource for SocketSource {
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(self.fetch_once())
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

/// Decode one feed line (terminator optional).
pub(crate) fn decode_line(address: &str, line: &str) -> Result<Reading, FetchError> {
    let msg: FeedMessage =
        serde_json::from_str(line.trim_end()).map_err(|e| FetchError::decode(address, e))?;

    let reading = Reading::float(msg.value);
    Ok(match msg.timestamp {
        Some(ts) => reading.with_timestamp(ts),
        None => reading,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use extscale_core::ReadingValue;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Accept one connection, write `payload`, then close.
    async fn serve_once(payload: &'static [u8]) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(payload).await;
            }
        });
        addr
    }

    fn source(addr: SocketAddr) -> SocketSource {
        SocketSource::new(addr.to_string(), Duration::from_secs(2))
    }

    #[test]
    fn decode_line_reads_value_and_timestamp() {
        let r = decode_line("feed", "{\"timestamp\":\"t1\",\"value\":301}\n").unwrap();
        assert_eq!(r.value, ReadingValue::Float(301.0));
        assert_eq!(r.timestamp.as_deref(), Some("t1"));
    }

    #[test]
    fn decode_line_timestamp_is_optional() {
        let r = decode_line("feed", "{\"value\": 12.5}").unwrap();
        assert_eq!(r.value, ReadingValue::Float(12.5));
        assert!(r.timestamp.is_none());
    }

    #[test]
    fn decode_line_rejects_garbage() {
        let err = decode_line("feed", "not-json\n").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));

        let err = decode_line("feed", "{\"timestamp\":\"t1\"}\n").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));

        let err = decode_line("feed", "{\"value\":\"high\"}\n").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn fetches_one_line() {
        let addr = serve_once(b"{\"timestamp\":\"t1\",\"value\":301}\n").await;
        let reading = source(addr).fetch().await.unwrap();
        assert_eq!(reading.value, ReadingValue::Float(301.0));
        assert_eq!(reading.timestamp.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn ignores_data_after_first_line() {
        let addr = serve_once(b"{\"value\":1}\n{\"value\":2}\n").await;
        let reading = source(addr).fetch().await.unwrap();
        assert_eq!(reading.value, ReadingValue::Float(1.0));
    }

    #[tokio::test]
    async fn unreachable_feed_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = source(addr).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Connect { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_newline_is_read_error() {
        let addr = serve_once(b"{\"value\":301}").await;
        let err = source(addr).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Read { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_payload_is_decode_error() {
        let addr = serve_once(b"not-json\n").await;
        let err = source(addr).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn silent_feed_times_out_as_read_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let src = SocketSource::new(addr.to_string(), Duration::from_millis(100));
        let err = src.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Read { .. }), "got {err:?}");
        hold.abort();
    }

    #[test]
    fn describe_uses_tcp_scheme() {
        let src = SocketSource::new("10.0.0.1:8082", Duration::from_secs(1));
        assert_eq!(src.describe(), "tcp://10.0.0.1:8082");
        assert_eq!(src.address(), "10.0.0.1:8082");
    }
}
