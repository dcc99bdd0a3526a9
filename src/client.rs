use crate::connection;
use crate::error::Result;
use crate::protocol::{self, Key, Request};
use crate::types::Rgb;

/// Client for one LED controller at a fixed address
///
/// A `DeviceLink` performs one protocol exchange per call; every call opens
/// its own TCP connection, so the link itself holds no socket state and is
/// cheap to construct.
///
/// # Example
///
/// ```no_run
/// use ledlink::DeviceLink;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let link = DeviceLink::new("192.168.1.50");
///     if link.test_connection().await {
///         let color = link.get_color().await?;
///         println!("strip is {color}");
///     }
///     Ok(())
/// }
/// ```
pub struct DeviceLink {
    host: String,
    port: u16,
}

impl DeviceLink {
    /// Port the controller firmware listens on
    pub const DEFAULT_PORT: u16 = 10000;

    /// Create a link to `host` on the default port
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_port(host, Self::DEFAULT_PORT)
    }

    /// Create a link to `host:port`
    pub fn with_port(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The controller's host address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The controller's port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Check whether the controller is reachable.
    ///
    /// Opens and immediately closes a connection within the 1 second
    /// connect timeout. Never errors; any failure reports `false`.
    pub async fn test_connection(&self) -> bool {
        connection::open(&self.host, self.port).await.is_ok()
    }

    /// Query the current strip color
    pub async fn get_color(&self) -> Result<Rgb> {
        let response = self.get(Key::Color).await?;
        protocol::parse_color(&response)
    }

    /// Set the strip color
    pub async fn set_color(&self, color: Rgb) -> Result<()> {
        self.set(Key::Color, color.to_string()).await
    }

    /// Query the power state
    pub async fn get_on(&self) -> Result<bool> {
        let response = self.get(Key::Power).await?;
        Ok(protocol::parse_bool(&response))
    }

    /// Set the power state
    pub async fn set_on(&self, on: bool) -> Result<()> {
        self.set(Key::Power, on.to_string()).await
    }

    async fn get(&self, key: Key) -> Result<String> {
        let line = Request::get(key).to_line();
        connection::exchange(&self.host, self.port, &line).await
    }

    async fn set(&self, key: Key, value: String) -> Result<()> {
        let line = Request::set(key, value).to_line();
        let response = connection::exchange(&self.host, self.port, &line).await?;
        protocol::expect_ok(&response)
    }
}
