//! Low-level TCP transport: one connection per exchange.
//!
//! The controller accepts one request line per connection and answers with
//! one response line, so there is nothing to keep alive between calls.

use crate::error::{LinkError, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Bound on connection establishment for every socket the crate opens
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Open a TCP connection to `host:port` within [`CONNECT_TIMEOUT`]
pub(crate) async fn open(host: &str, port: u16) -> Result<TcpStream> {
    match timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(LinkError::Timeout),
    }
}

/// Perform one request/response exchange.
///
/// Opens a fresh connection, writes `line` terminated by a newline, reads
/// exactly one response line and closes the connection. The trailing line
/// terminator is stripped from the response.
///
/// Only connection establishment is bounded by a timeout; the response
/// read will wait as long as the peer keeps the connection open.
pub(crate) async fn exchange(host: &str, port: u16, line: &str) -> Result<String> {
    let stream = open(host, port).await?;
    let (read_half, mut write_half) = stream.into_split();

    tracing::debug!("{}:{} <- {}", host, port, line);
    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\n").await?;
    write_half.flush().await?;

    let mut reader = BufReader::new(read_half);
    let mut response = String::new();
    let n = reader.read_line(&mut response).await?;
    if n == 0 {
        return Err(LinkError::ConnectionClosed);
    }

    let response = response.trim_end_matches(['\r', '\n']).to_string();
    tracing::debug!("{}:{} -> {}", host, port, response);
    Ok(response)
}
