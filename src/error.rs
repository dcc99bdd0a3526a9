use thiserror::Error;

/// Result type for ledlink operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur when discovering or talking to LED controllers
#[derive(Error, Debug)]
pub enum LinkError {
    /// Connection establishment exceeded the connect timeout
    #[error("connection timed out")]
    Timeout,

    /// Socket-level I/O error (connect, write, read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection before sending a response line
    #[error("connection closed")]
    ConnectionClosed,

    /// Response was present but malformed, or a SET was not acknowledged
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An operation was attempted before any device was ever connected
    #[error("no device selected")]
    NoDeviceSelected,

    /// mDNS daemon error
    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),

    /// Channel send/receive error
    #[error("channel error: {0}")]
    ChannelError(String),
}

impl LinkError {
    /// Whether this failure is a connectivity failure (as opposed to a
    /// protocol failure).
    ///
    /// Connectivity failures flip the session's `connected` flag; protocol
    /// failures surface as user-visible error text instead.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            LinkError::Timeout | LinkError::Io(_) | LinkError::ConnectionClosed
        )
    }
}
